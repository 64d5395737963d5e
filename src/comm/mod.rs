// Comm module - UDP transport between clients and the gate
#![allow(unused_imports)]

pub mod config;
pub mod error;
pub mod protocol;
pub mod server;
pub mod types;

pub use config::CommConfig;
pub use server::Comm;
pub use types::{ResponsePayload, UserRequest, UserResponse};
