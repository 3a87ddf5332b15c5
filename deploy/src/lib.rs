pub mod deployer;
pub mod deployments;
pub mod error;
pub mod mock;
pub mod network;
pub mod orchestrator;
pub mod resolver;
pub mod shared;
pub mod verify;
