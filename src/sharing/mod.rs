//! Minimal reactive runtime that bindings plug into.

mod property;
mod reader;
mod subscription;


use std::{fmt::Debug, hash::Hash};

use async_trait::async_trait;

pub use property::Property;
pub use reader::SharedReader;
pub use subscription::{DeliveryGate, Subscriber, Subscription};

/// A read source that a [`SharedReader`] can load from and subscribe to.
#[async_trait]
pub trait SharedKey: Send + Sync + 'static {
    /// Type of value the key produces.
    type Value: Clone + PartialEq + Send + Sync + 'static;

    /// Identity of the key; equal ids must refer to the same source.
    type Id: Clone + Eq + Hash + Debug + Send + Sync + 'static;

    /// Identity of this key.
    fn id(&self) -> Self::Id;

    /// Loads the current value once, falling back to `default`.
    async fn load(&self, default: Self::Value) -> Self::Value;

    /// Pushes every subsequent value to `subscriber` until cancelled.
    fn subscribe(&self, subscriber: Subscriber<Self::Value>) -> Subscription;

    /// Writes a value back to the source, if the key supports it.
    fn set(&self, value: Self::Value);
}
