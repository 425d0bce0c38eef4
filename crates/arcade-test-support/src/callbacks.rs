//! Test callbacks — async subscriber closures that record, fail or panic.

use std::sync::{Arc, Mutex};

use arcade_core::callback::{Callback, CallbackResult, callback};

/// Shared log of values seen by a recording callback.
#[derive(Debug)]
pub struct Recorder<T> {
    items: Arc<Mutex<Vec<T>>>,
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
        }
    }
}

impl<T> Default for Recorder<T> {
    fn default() -> Self {
        Self {
            items: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T: Clone> Recorder<T> {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn push(&self, item: T) {
        self.items.lock().unwrap().push(item);
    }

    /// Returns a copy of everything recorded so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn items(&self) -> Vec<T> {
        self.items.lock().unwrap().clone()
    }

    /// Returns the number of recorded values.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A callback that records every value it receives and always succeeds.
#[must_use]
pub fn recording_callback<T: Clone + Send + 'static>() -> (Callback<T>, Recorder<T>) {
    let recorder = Recorder::new();
    let sink = recorder.clone();
    let cb = callback(move |item: T| {
        sink.push(item);
        async { Ok(()) }
    });
    (cb, recorder)
}

/// A callback that pushes `label` into `log` on every call, for asserting
/// delivery order across several subscribers.
#[must_use]
pub fn labelled_callback<T: Send + 'static>(
    label: &'static str,
    log: &Recorder<&'static str>,
) -> Callback<T> {
    let sink = log.clone();
    callback(move |_item: T| {
        sink.push(label);
        async { Ok(()) }
    })
}

/// A callback that always returns an error with `message`.
#[must_use]
pub fn failing_callback<T: Send + 'static>(message: &'static str) -> Callback<T> {
    callback(move |_item: T| async move { Err(message.into()) })
}

/// A callback that panics with `message` when polled.
#[must_use]
pub fn panicking_callback<T: Send + 'static>(message: &'static str) -> Callback<T> {
    callback(move |_item: T| async move { panic_with(message) })
}

fn panic_with(message: &str) -> CallbackResult {
    panic!("{message}")
}
