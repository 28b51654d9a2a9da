// Port Layer - Interfaces for external dependencies

pub mod executor;
pub mod system_probe;
pub mod time_provider; // For deterministic testing
pub mod workload;

// Re-exports
pub use executor::{CompletionNotifier, CompletionSink, ExecutionError, JobExecutor};
pub use system_probe::SystemProbe;
pub use time_provider::TimeProvider;
pub use workload::Workload;
