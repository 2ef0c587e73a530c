//! Action configuration adapters.
//!
//! - **load** - reads a JSON or YAML configuration file from disk
//! - **ConfigWatcher** - polls the file and rebuilds the live registries on change

mod loader;
mod watcher;

pub use loader::{load, ConfigFormat};
pub use watcher::{ConfigWatcher, ReloadError};
