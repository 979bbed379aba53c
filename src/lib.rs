//! everything-ipc - Typed client for the Everything search engine IPC SDK.
//!
//! This library wraps the voidtools Everything SDK (a DLL that talks to the
//! running Everything daemon over IPC) behind a small typed API:
//! configure a [`QuerySession`], evaluate it, then read results through a
//! borrowed [`ResultView`] of index-addressed [`Record`]s.

pub mod config;
pub mod output;
pub mod query;
pub mod sdk;

pub use config::SdkConfig;
pub use query::{QuerySession, Record, RecordKind, ResultIter, ResultView};
pub use sdk::{DateField, Engine, ErrorCode, FieldFlags, LibraryEngine, StubEngine};

use thiserror::Error;

/// Error types covering all failure modes of the client.
///
/// Missing per-record data is not an error; accessors return `None` for it.
#[derive(Error, Debug)]
pub enum EverythingError {
    /// SDK library could not be loaded
    #[error("Library error: {0}")]
    Library(String),

    /// An `Everything_*` entry point was not exported by the loaded library
    #[error("Missing SDK entry point: {0}")]
    MissingSymbol(String),

    /// Record index outside `[0, count)`
    #[error("Index {index} out of range for {count} results")]
    IndexOutOfRange {
        /// Requested index (signed so negative inputs can be reported)
        index: i64,
        /// Number of results in the view
        count: usize,
    },

    /// Engine reported a result as both a file and a folder
    #[error("Result {0} is reported as both a file and a folder")]
    ClassificationConflict(usize),

    /// Engine returned a last-error value outside the known taxonomy
    #[error("Unknown engine error code: {0}")]
    UnknownErrorCode(u32),

    /// Raw entry point invocation failed before reaching the engine
    #[error("Invoke error: {0}")]
    Invoke(String),

    /// Configuration file errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors (config file access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using EverythingError
pub type Result<T> = std::result::Result<T, EverythingError>;
