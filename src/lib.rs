//! Config Bindings - Reactive bindings from configuration paths to typed values.
//!
//! A binding key names a dot-separated configuration path and the kind of
//! value expected there. Keys load the current value once, falling back to a
//! default, or subscribe to every subsequent change. The main features are:
//!
//! - A lazily initialized, single-flight cache of the configuration reader
//! - Background services (such as file watchers) started once alongside it
//! - Five value kinds: string, integer, double, boolean and string list
//! - In-memory and TOML file providers
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use config_bindings::{
//!     BindingContext, BoxError, ConfigReader, ReaderFactory, ReaderSetup, SharedReader,
//!     providers::InMemoryProvider,
//! };
//!
//! # async fn example() {
//! let provider = InMemoryProvider::default();
//! provider.set("t.v", "hello").expect("valid path");
//! let reader = ConfigReader::new(provider.clone());
//!
//! let context = BindingContext::new(ReaderFactory::new(move || {
//!     let reader = reader.clone();
//!     async move { Ok::<_, BoxError>(ReaderSetup::new(reader)) }
//! }));
//!
//! let greeting = context.key::<String>("t.v").load("x".to_string()).await;
//! assert_eq!(greeting, "hello");
//!
//! let live = SharedReader::new(context.key::<String>("t.v"), "x".to_string()).await;
//! println!("current value: {}", live.get());
//! # }
//! ```

/// Lazily initialized, shared configuration reader.
pub mod cache;

/// Core error types and result aliases.
pub mod core;

/// Configuration binding keys.
pub mod key;

/// Long-running background services and their supervision.
pub mod lifecycle;

/// Configuration providers backed by memory or TOML files.
pub mod providers;

/// Minimal reactive runtime that bindings plug into.
pub mod sharing;

/// Immutable configuration snapshots.
pub mod snapshot;

/// Logging setup for binaries built on this crate.
pub mod tracing_config;

/// Value kinds and typed extraction.
pub mod value;

mod context;
mod factory;
mod reader;

/// Re-exported core types for convenience.
pub use cache::{FactoryFn, FactoryFuture, ReaderCache, ReaderSetup};
pub use context::BindingContext;
pub use core::{BoxError, ConfigError, Result};
pub use factory::ReaderFactory;
pub use key::{ConfigKey, ConfigKeyId};
pub use reader::{ConfigProvider, ConfigReader, ReaderId, SnapshotStream};
pub use sharing::{DeliveryGate, SharedKey, SharedReader, Subscriber, Subscription};
pub use snapshot::Snapshot;
pub use value::{Bindable, TypedValue, ValueKind, extract};
