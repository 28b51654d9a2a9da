// Dispatch Core - Domain Logic, Ports & the Bounded Dispatcher
// NO runtime adapters here (executors and system probes live in infra crates)

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
