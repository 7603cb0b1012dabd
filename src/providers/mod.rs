//! Configuration providers: where snapshots come from.

mod file;
mod file_watcher;
mod memory;


pub use file::{FileProviderOptions, TomlFileProvider};
pub use memory::InMemoryProvider;
