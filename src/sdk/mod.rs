//! Everything SDK boundary.
//!
//! Defines the numeric contract of the SDK (field flags, error codes,
//! limits), the [`Engine`] trait that models the DLL's function-call surface,
//! and two implementations of it:
//! - [`LibraryEngine`] binds the real `Everything{32,64}.dll` (Windows only)
//! - [`StubEngine`] is a deterministic in-memory engine for tests and development

pub mod engine;
pub mod flags;
pub mod library;
pub mod stub;

pub use engine::Engine;
pub use flags::*;
pub use library::LibraryEngine;
pub use stub::{StubEngine, StubEntry};
