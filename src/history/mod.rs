// History module - bounded log of execution attempts
#![allow(unused_imports)]

pub mod error;
pub mod store;
pub mod types;

pub use error::HistoryError;
pub use store::{DEFAULT_HISTORY_CAPACITY, DEFAULT_PAGE_SIZE, HistoryStore};
pub use types::{ANONYMOUS_USER, ExecutionResult, HistoryPage, Pagination};
