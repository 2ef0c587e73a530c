//! Storage Adapters
//!
//! - **FilePreferenceStore** - Stores assistant preferences as a YAML file

mod file_preference_store;

pub use file_preference_store::FilePreferenceStore;
