// Bounded Dispatch Infrastructure - System Adapters
// Implements: SystemProbe, JobExecutor

pub mod local_executor;
pub mod system_probe_impl;

pub use local_executor::LocalExecutor;
pub use system_probe_impl::SystemProbeImpl;
