pub mod config;
pub mod error;
pub mod journal;
pub mod scheduler;
pub mod script;
pub mod shutdown;
pub mod status;
pub mod worker;

pub use error::{OrderlineError, Result};
