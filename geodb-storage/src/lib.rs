//! Record store boundary for geodb.
//!
//! The container layer reads and writes whole tables through the
//! [`RecordStore`] trait. [`FileRecordStore`] is the shipped backend: one
//! JSON file per table plus a regenerated catalog system table that the
//! catalog scanner can rediscover datasets from.
//!
//! # Modules
//!
//! - [`traits`]: `RecordStore` and `WriteOptions`
//! - [`file`]: directory-backed implementation
//! - [`system_table`]: catalog system table layout and XML definitions
//! - [`config`]: `FileStoreConfig`
//! - [`error`]: error types

pub mod config;
pub mod error;
pub mod file;
pub mod system_table;
pub mod traits;

pub use config::{FileStoreConfig, SYSTEM_FILE_NAME};
pub use error::{Result, StorageError};
pub use file::FileRecordStore;
pub use traits::{RecordStore, WriteOptions};
