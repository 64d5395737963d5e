// Service module - the operations exposed to transports
#![allow(unused_imports)]

pub mod error;
pub mod handler;
pub mod sysinfo;
pub mod types;

pub use error::ServiceError;
pub use handler::{ShellService, parse_id};
pub use types::{ApiRequest, CommandList, DeletedEntry, SystemInfo, ValidationReport};
