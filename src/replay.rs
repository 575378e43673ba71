//! Lazily started, memoized futures shared by every consumer.

use std::fmt;
use std::future::Future;

use futures::FutureExt;
use futures::future::Shared;

use crate::errors::Error;
use crate::runtime::BoxFuture;

type Result<T> = std::result::Result<T, Error>;

/// A value produced by running a future at most once.
///
/// Nothing runs until the first [`Replay::get`]. Concurrent callers wait on the
/// same run and callers arriving after completion get the cached outcome,
/// success or failure, without running the work again.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use hue_command_rs::Replay;
///
/// # futures::executor::block_on(async {
/// let runs = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&runs);
/// let replay = Replay::new(async move {
///     counter.fetch_add(1, Ordering::SeqCst);
///     Ok("192.168.1.2".to_string())
/// });
///
/// assert_eq!(runs.load(Ordering::SeqCst), 0);
/// assert_eq!(replay.get().await.unwrap(), "192.168.1.2");
/// assert_eq!(replay.clone().get().await.unwrap(), "192.168.1.2");
/// assert_eq!(runs.load(Ordering::SeqCst), 1);
/// # });
/// ```
pub struct Replay<T: Clone> {
    inner: Shared<BoxFuture<'static, Result<T>>>,
}

impl<T> Replay<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let boxed: BoxFuture<'static, Result<T>> = Box::pin(future);
        Replay {
            inner: boxed.shared(),
        }
    }

    /// A replay that is already resolved to `value`.
    pub fn ready(value: T) -> Self {
        Self::new(futures::future::ready(Ok(value)))
    }

    /// Wait for the shared outcome, starting the work if nobody has yet.
    pub async fn get(&self) -> Result<T> {
        self.inner.clone().await
    }

    /// The cached outcome, if the work already finished.
    pub fn peek(&self) -> Option<Result<T>> {
        self.inner.peek().cloned()
    }
}

impl<T: Clone> Clone for Replay<T> {
    fn clone(&self) -> Self {
        Replay {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone> fmt::Debug for Replay<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.inner.peek().is_some() {
            "resolved"
        } else {
            "pending"
        };
        f.debug_struct("Replay").field("state", &state).finish()
    }
}
