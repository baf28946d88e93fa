// crates/worker/src/lib.rs
//! Worker Pool (§4.1): claims jobs from the Job Store and dispatches them to
//! the Import Dependency Extractor, History Miner + Churn Aggregator, or
//! Code-Intelligence Ingester.

pub mod dispatch;
pub mod pool;

pub use pool::WorkerPool;
