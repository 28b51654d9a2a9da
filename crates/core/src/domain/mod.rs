// Domain Layer - Pure logic and entities

pub mod error;
pub mod job;
pub mod primality;
pub mod serde_decimal;
pub mod window;

// Re-exports
pub use error::DomainError;
pub use job::{JobHandle, JobId, JobStatus, WorkItem};
pub use primality::{PrimalityOracle, PrimalityTest, SemiPrime, DEFAULT_TRIALS};
pub use window::WindowConfig;
