use std::fmt;

use futures::Stream;

use super::{Property, SharedKey, Subscriber, Subscription};

/// A value kept in sync with a [`SharedKey`].
///
/// The key is loaded once on construction and then subscribed to, so the
/// value follows the source for as long as the reader is alive. Dropping
/// the reader cancels the subscription.
pub struct SharedReader<K: SharedKey> {
    key_id: K::Id,
    property: Property<K::Value>,
    subscription: Subscription,
}

impl<K: SharedKey> SharedReader<K> {
    /// Loads `key`, falling back to `default`, and subscribes to its updates.
    pub async fn new(key: K, default: K::Value) -> Self {
        let initial = key.load(default).await;
        let property = Property::new(initial);

        let subscription = {
            let property = property.clone();
            key.subscribe(Subscriber::new(move |value| property.set(value)))
        };

        Self {
            key_id: key.id(),
            property,
            subscription,
        }
    }

    /// The current value.
    pub fn get(&self) -> K::Value {
        self.property.get()
    }

    /// Stream of the current value followed by every change.
    pub fn watch(&self) -> impl Stream<Item = K::Value> + Send + use<K> {
        self.property.watch()
    }

    /// Identity of the key this reader follows.
    pub fn key_id(&self) -> &K::Id {
        &self.key_id
    }

    /// Returns `true` while updates can still arrive.
    pub fn is_live(&self) -> bool {
        !self.subscription.is_cancelled() && !self.subscription.is_finished()
    }
}

impl<K> fmt::Debug for SharedReader<K>
where
    K: SharedKey,
    K::Value: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedReader")
            .field("key", &self.key_id)
            .field("value", &self.get())
            .finish()
    }
}
