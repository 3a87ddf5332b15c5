use clap::{Parser, Subcommand};
use deploy::deployments::{DeploymentRegistry, FileDeploymentRegistry};
use deploy::network::{NetworkEntry, NetworkRegistry, NetworksFile};
use dotenvy::dotenv;
use std::path::PathBuf;
use std::process::ExitCode;

/// Inspects the network table and recorded deployments.
#[derive(Debug, Parser)]
struct Args {
    #[clap(long, env = "NETWORKS_FILE")]
    networks_file: Option<PathBuf>,

    #[clap(long, env = "DEPLOYMENTS_DIR", default_value = "deployments")]
    deployments_dir: PathBuf,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Prints the effective network table as a networks file.
    Networks,
    /// Prints the deployments recorded for a network.
    Deployments {
        #[clap(long, env = "NETWORK_ID")]
        network_id: u64,
    },
}

fn run(args: Args) -> anyhow::Result<()> {
    match args.command {
        Command::Networks => {
            let networks = NetworkRegistry::load(args.networks_file.as_deref())?;
            let file = NetworksFile {
                networks: networks.iter().map(NetworkEntry::from).collect(),
            };
            println!("{}", serde_json::to_string_pretty(&file)?);
        }
        Command::Deployments { network_id } => {
            let registry = FileDeploymentRegistry::new(&args.deployments_dir);
            let records = registry.list(network_id)?;
            if records.is_empty() {
                println!("No deployments recorded for network {network_id}");
            }
            for record in records {
                println!(
                    "{}: {:#x} (block {}, {} confirmations, {})",
                    record.contract_name,
                    record.deployed_address,
                    record.block_height,
                    record.confirmations_waited,
                    record.deployed_at.to_rfc3339(),
                );
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    dotenv().ok();
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
