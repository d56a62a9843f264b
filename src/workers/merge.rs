//! Fan-in of task result conduits

use super::task::JobResult;
use crate::error::TaskError;
use futures::stream::{FuturesUnordered, Stream};
use futures::FutureExt;
use tokio::sync::oneshot;

/// Combine result conduits into one stream in completion order.
///
/// Each conduit carries a caller-chosen tag that comes back with its result.
/// Every conduit yields exactly one item. A conduit whose sender was dropped
/// without writing yields [`TaskError::Dropped`]. No conduits gives a stream
/// that is already finished.
pub fn fan_in<T>(
    conduits: Vec<(T, oneshot::Receiver<JobResult>)>,
) -> impl Stream<Item = (T, JobResult)> + Unpin + Send
where
    T: Send + 'static,
{
    conduits
        .into_iter()
        .map(|(tag, rx)| {
            rx.map(move |result| (tag, result.unwrap_or_else(|_| Err(TaskError::Dropped))))
        })
        .collect::<FuturesUnordered<_>>()
}
