//! Error taxonomy.
//!
//! Each concern has its own error enum next to the code that raises it.
//! [`Error`] collects them for hosts that want a single error type.

use thiserror::Error;

pub use crate::clipboard::{ClipboardError, ClipboardResult};
pub use crate::config::ConfigError;
pub use crate::store::{StoreError, StoreResult};

/// Any error the canvas core can report.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Clipboard(#[from] ClipboardError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for hosts that mix concerns.
pub type Result<T> = std::result::Result<T, Error>;
