// Policy module - decides whether a raw command line may run
#![allow(unused_imports)]

pub mod defaults;
pub mod error;
pub mod loader;
pub mod rules;
pub mod types;

pub use error::PolicyError;
pub use loader::{load_policy, parse_policy};
pub use rules::{CommandPolicy, tokenize};
pub use types::{CommandInfo, CommandRule, ValidationResult};
