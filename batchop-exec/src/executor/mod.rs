pub mod action;
mod composite;
mod context;
mod engine;
pub mod events;
mod leaf;
pub mod metrics;
mod operation;
pub mod pool;
mod types;

pub use action::{action_fn, Action, FnAction};
pub use composite::CompositeOperation;
pub use context::ExecutionContext;
pub use engine::Engine;
pub use events::{
    CollectingEventSink, CompositeEventSink, Event, EventSink, NoOpEventSink, StdoutEventSink,
    TracingEventSink,
};
pub use leaf::LeafOperation;
pub use metrics::{BatchMetrics, MetricsCollector, MetricsEventSink};
pub use operation::Operation;
pub use pool::{PoolPermit, WorkerPool};
pub use types::EngineConfig;
