pub mod config;
pub mod manager;
pub mod platform;
pub mod session;

pub use manager::{Created, FileEntry, FileManager, FileManagerError};
