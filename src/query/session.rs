//! Query state and evaluation.
//!
//! [`QuerySession`] owns the engine connection and the search state. Setters
//! only record state locally; [`QuerySession::evaluate`] pushes the whole
//! state to the engine and runs the query, so evaluating twice with the same
//! state sends the same request twice.

use crate::config::SdkConfig;
use crate::query::results::ResultView;
use crate::sdk::{Engine, ErrorCode, FieldFlags};
use crate::Result;

/// Mutable query state bound to one engine connection.
pub struct QuerySession<E: Engine> {
    engine: E,
    search: String,
    regex: bool,
    match_case: bool,
    match_whole_word: bool,
    match_path: bool,
    max_results: Option<u32>,
    offset: u32,
    requested: FieldFlags,
    /// Requested fields as of the last successful evaluation
    evaluated_request: FieldFlags,
}

impl<E: Engine> QuerySession<E> {
    /// Create a session with an empty search and default requested fields.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            search: String::new(),
            regex: false,
            match_case: false,
            match_whole_word: false,
            match_path: false,
            max_results: None,
            offset: 0,
            requested: FieldFlags::default(),
            evaluated_request: FieldFlags::empty(),
        }
    }

    /// Create a session with defaults taken from configuration.
    pub fn with_config(engine: E, config: &SdkConfig) -> Self {
        let mut session = Self::new(engine);
        session.set_requested_fields(config.request_fields);
        session.set_regex_enabled(config.regex);
        session.set_match_case(config.match_case);
        session.set_max_results(config.max_results);
        session
    }

    /// Store the search expression verbatim. It is not parsed or validated
    /// here; a malformed expression shows up as a failed or empty query.
    pub fn set_search(&mut self, expression: impl Into<String>) {
        self.search = expression.into();
    }

    /// Interpret the search expression as a regular expression.
    pub fn set_regex_enabled(&mut self, enabled: bool) {
        self.regex = enabled;
    }

    pub fn set_match_case(&mut self, enabled: bool) {
        self.match_case = enabled;
    }

    pub fn set_match_whole_word(&mut self, enabled: bool) {
        self.match_whole_word = enabled;
    }

    /// Match search terms against full paths instead of file names.
    pub fn set_match_path(&mut self, enabled: bool) {
        self.match_path = enabled;
    }

    /// Cap the number of visible results. `None` means no limit.
    pub fn set_max_results(&mut self, max: Option<u32>) {
        self.max_results = max;
    }

    /// Skip the first `offset` matches.
    pub fn set_offset(&mut self, offset: u32) {
        self.offset = offset;
    }

    /// Declare which fields results should carry. The engine may populate
    /// fewer; see [`available_fields`](Self::available_fields).
    pub fn set_requested_fields(&mut self, flags: FieldFlags) {
        self.requested = flags;
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn regex_enabled(&self) -> bool {
        self.regex
    }

    pub fn requested_fields(&self) -> FieldFlags {
        self.requested
    }

    /// Send the current state to the engine and run the query.
    ///
    /// With `wait == true` this blocks until the result set is ready. With
    /// `wait == false` it returns once the query is sent and the result set
    /// may still be empty.
    ///
    /// Returns false on failure. The reason is only available through
    /// [`last_error`](Self::last_error).
    ///
    /// Taking `&mut self` means no [`ResultView`] or
    /// [`Record`](crate::Record) from a previous evaluation can still be
    /// alive when this runs.
    pub fn evaluate(&mut self, wait: bool) -> bool {
        tracing::debug!(
            search = %self.search,
            regex = self.regex,
            requested = ?self.requested,
            wait,
            "Evaluating query"
        );

        self.engine.set_search(&self.search);
        self.engine.set_regex(self.regex);
        self.engine.set_match_case(self.match_case);
        self.engine.set_match_whole_word(self.match_whole_word);
        self.engine.set_match_path(self.match_path);
        self.engine.set_max(self.max_results.unwrap_or(u32::MAX));
        self.engine.set_offset(self.offset);
        self.engine.set_request_flags(self.requested.bits());

        let ok = self.engine.query(wait);
        if ok {
            self.evaluated_request = self.requested;
            tracing::debug!("Query accepted, {} visible results", self.engine.num_results());
        } else {
            self.evaluated_request = FieldFlags::empty();
            tracing::warn!("Query {:?} failed", self.search);
        }
        ok
    }

    /// Fields actually populated in the current result set.
    ///
    /// Always a subset of the fields requested for the evaluation that
    /// produced it; anything else the engine reports is dropped.
    pub fn available_fields(&self) -> FieldFlags {
        let reported = FieldFlags::from_bits_truncate(self.engine.result_list_request_flags());
        let available = reported & self.evaluated_request;
        if available != reported {
            tracing::debug!(
                "Engine reported unrequested fields {:?}",
                reported - self.evaluated_request
            );
        }
        available
    }

    /// Number of visible results in the current result set.
    pub fn result_count(&self) -> usize {
        self.engine.num_results() as usize
    }

    /// Engine-wide last error.
    ///
    /// This reflects the most recent engine-level operation by any consumer
    /// of the same SDK instance, not necessarily a call made through this
    /// session.
    ///
    /// # Errors
    /// Returns `UnknownErrorCode` if the engine reports a value outside the
    /// SDK's documented codes.
    pub fn last_error(&self) -> Result<ErrorCode> {
        ErrorCode::try_from(self.engine.last_error())
    }

    /// Read-only view over the current result set.
    ///
    /// The count and available fields are captured now; the view borrows
    /// the session so it cannot outlive the next [`evaluate`](Self::evaluate).
    pub fn results(&self) -> ResultView<'_, E> {
        ResultView::new(&self.engine, self.result_count(), self.available_fields())
    }

    /// Invoke the SDK export `Everything_<name>` directly.
    ///
    /// Reaches entry points this typed API does not cover, for example
    /// `GetMajorVersion` or `RebuildDB`. Arguments and the return value are
    /// raw machine words.
    ///
    /// # Safety
    ///
    /// `args` must match the export's prototype exactly; pointer arguments
    /// must be valid for the duration of the call.
    pub unsafe fn invoke_raw(&mut self, name: &str, args: &[usize]) -> Result<usize> {
        unsafe { self.engine.invoke_raw(name, args) }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Consume the session and return its engine.
    pub fn into_engine(self) -> E {
        self.engine
    }
}
