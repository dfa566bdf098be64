//! Teams: workers, capability routing and the goal orchestrator

pub mod delegator;
pub mod executor;
pub mod factory;
pub mod orchestrator;
pub mod registry;
pub mod status;
mod store;
pub mod worker;

pub use delegator::Delegator;
pub use executor::Executor;
pub use factory::{PlaybookCtor, TeamFactory, WorkerCtor};
pub use orchestrator::Orchestrator;
pub use registry::{CapabilityRegistry, WorkerEntry};
pub use status::{TaskCounts, TeamStatus, WorkerStatus};
pub use worker::{EchoWorker, FailingWorker, Worker};
