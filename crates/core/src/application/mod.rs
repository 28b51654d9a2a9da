// Application Layer - Dispatcher, aggregation and search workflows

pub mod aggregator;
pub mod config;
pub mod constants;
pub mod dispatcher;
pub mod workloads;

// Re-exports
pub use aggregator::{SearchAggregator, SessionReport};
pub use config::{configure, DispatchConfig};
pub use dispatcher::{BoundedJobDispatcher, CancelHandle, CompletionHandler, DispatchError, DispatchReport, Flow};
