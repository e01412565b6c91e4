pub mod error;
pub mod logger;

pub use error::{SyncError, SyncResult};
