//! Async callbacks and failure isolation at dispatch boundaries.
//!
//! Subscribers of the event store and the event bus are plain async closures.
//! A callback that returns an error or panics must not abort the surrounding
//! append/publish, so every invocation goes through [`deliver`] (or
//! [`isolate`] for trait-object handlers), which turns both outcomes into a
//! [`DeliveryFailure`] the dispatcher can log and count.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use thiserror::Error;

/// Error type returned by subscriber callbacks and event handlers.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Result type returned by subscriber callbacks and event handlers.
pub type CallbackResult = Result<(), CallbackError>;

/// A shareable async callback receiving an owned `T`.
pub type Callback<T> = Arc<dyn Fn(T) -> BoxFuture<'static, CallbackResult> + Send + Sync>;

/// Boxes an async closure into a [`Callback`].
///
/// ```
/// use arcade_core::callback::{Callback, callback};
///
/// let cb: Callback<u32> = callback(|n: u32| async move {
///     if n == 0 { Err("zero".into()) } else { Ok(()) }
/// });
/// # let _ = cb;
/// ```
pub fn callback<T, F, Fut>(f: F) -> Callback<T>
where
    T: 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CallbackResult> + Send + 'static,
{
    Arc::new(move |arg| f(arg).boxed())
}

/// Why a single delivery failed.
#[derive(Debug, Error)]
pub enum DeliveryFailure {
    /// The callback returned an error.
    #[error("callback failed: {0}")]
    Failed(CallbackError),

    /// The callback panicked.
    #[error("callback panicked: {0}")]
    Panicked(String),
}

/// Invokes `callback` with `arg`, awaiting completion and capturing errors
/// and panics.
///
/// # Errors
///
/// Returns `DeliveryFailure` if the callback returned an error or panicked,
/// whether while building its future or while it was polled.
pub async fn deliver<T>(callback: &Callback<T>, arg: T) -> Result<(), DeliveryFailure> {
    let future = std::panic::catch_unwind(AssertUnwindSafe(|| callback(arg)))
        .map_err(|panic| DeliveryFailure::Panicked(panic_message(panic.as_ref())))?;
    isolate(future).await
}

/// Awaits `future`, capturing its error or panic.
///
/// # Errors
///
/// Returns `DeliveryFailure` if the future resolved to an error or panicked.
pub async fn isolate<Fut>(future: Fut) -> Result<(), DeliveryFailure>
where
    Fut: Future<Output = CallbackResult>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(DeliveryFailure::Failed(err)),
        Err(panic) => Err(DeliveryFailure::Panicked(panic_message(panic.as_ref()))),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
