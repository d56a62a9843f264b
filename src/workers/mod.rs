//! Worker pool, tasks and result fan-in
//!
//! Upstream calls are the only work that leaves the request's own task: each
//! one is wrapped in a [`Job`], queued on the [`WorkerPool`] and its result
//! collected through [`fan_in`].

mod merge;
mod pool;
mod task;

pub use merge::fan_in;
pub use pool::WorkerPool;
pub use task::{DetailTask, Job, JobResult, JobValue, SearchTask, Task, TaskParams};
