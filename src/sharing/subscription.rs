use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Receives values pushed by a [`SharedKey`](super::SharedKey) subscription.
pub struct Subscriber<T> {
    push: Arc<dyn Fn(T) + Send + Sync>,
}

impl<T> Subscriber<T> {
    /// Wraps a callback invoked once per delivered value, in order.
    pub fn new(push: impl Fn(T) + Send + Sync + 'static) -> Self {
        Self {
            push: Arc::new(push),
        }
    }

    /// Delivers a value.
    pub fn push(&self, value: T) {
        (self.push)(value)
    }
}

impl<T> Clone for Subscriber<T> {
    fn clone(&self) -> Self {
        Self {
            push: Arc::clone(&self.push),
        }
    }
}

impl<T> fmt::Debug for Subscriber<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber").finish_non_exhaustive()
    }
}

/// Cancellation shared by a subscription handle and its delivery task.
///
/// Pushes made through [`deliver`](Self::deliver) and [`cancel`](Self::cancel)
/// exclude each other, so once `cancel` returns no further value reaches the
/// subscriber.
#[derive(Clone, Default)]
pub struct DeliveryGate {
    token: CancellationToken,
    lock: Arc<Mutex<()>>,
}

impl DeliveryGate {
    /// Creates an open gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes `value` unless the gate is cancelled. Returns `false` if it was.
    pub fn deliver<T>(&self, subscriber: &Subscriber<T>, value: T) -> bool {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self.token.is_cancelled() {
            return false;
        }
        subscriber.push(value);
        true
    }

    /// Closes the gate, waiting for an in-flight push to complete.
    pub fn cancel(&self) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.token.cancel();
    }

    /// Returns `true` once the gate is closed.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the gate is closed.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

impl fmt::Debug for DeliveryGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeliveryGate")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Handle to an active subscription.
///
/// Delivery stops once the subscription is cancelled, either explicitly or
/// by dropping the handle.
pub struct Subscription {
    gate: DeliveryGate,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Ties a delivery task to the gate it pushes through.
    pub fn new(gate: DeliveryGate, task: JoinHandle<()>) -> Self {
        Self {
            gate,
            task: Some(task),
        }
    }

    /// Stops delivery. No value is pushed after this returns.
    ///
    /// Must not be called from inside the subscriber's own callback.
    pub fn cancel(&self) {
        self.gate.cancel();
    }

    /// Returns `true` if [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.gate.is_cancelled()
    }

    /// Returns `true` once the delivery task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Waits for the delivery task to exit without cancelling it.
    ///
    /// Resolves when the underlying change stream ends or fails.
    pub async fn finished(mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.gate.cancel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("cancelled", &self.is_cancelled())
            .field("finished", &self.is_finished())
            .finish()
    }
}
