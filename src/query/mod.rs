//! Query module - session state, result access, and timestamp conversion.
//!
//! Typical use:
//!
//! ```
//! use everything_ipc::{QuerySession, StubEngine};
//! use everything_ipc::sdk::StubEntry;
//!
//! let engine = StubEngine::new(vec![StubEntry::file(r"C:\notes.txt")]);
//! let mut session = QuerySession::new(engine);
//! session.set_search("*.txt");
//! assert!(session.evaluate(true));
//!
//! for record in &session.results() {
//!     println!("{:?}", record.filename());
//! }
//! ```

pub mod filetime;
pub mod results;
pub mod session;

pub use filetime::{filetime_to_local, filetime_to_unix_seconds, filetime_to_utc};
pub use results::{Record, RecordKind, ResultIter, ResultView};
pub use session::QuerySession;
