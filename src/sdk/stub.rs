//! In-memory engine for tests and development.
//!
//! [`StubEngine`] holds a fixed list of entries and evaluates searches
//! against them with Everything-like rules: whitespace-separated terms are
//! ANDed, a term with `*` or `?` is a whole-name wildcard, any other term is
//! a substring, and matching is case-insensitive unless match case is on.
//! It can also simulate the behaviours a real daemon exhibits: deferred
//! (non-waiting) queries, query failures, and fields it cannot compute.

use std::cell::Cell;
use std::collections::HashMap;

use regex::{Regex, RegexBuilder};

use super::engine::Engine;
use super::flags::{DateField, ErrorCode, FieldFlags};
use crate::{EverythingError, Result};

/// One file or folder known to a [`StubEngine`].
#[derive(Debug, Clone, Default)]
pub struct StubEntry {
    /// Full path and file name
    pub path: String,
    /// Size in bytes
    pub size: Option<u64>,
    /// FILETIME ticks per date field
    pub dates: HashMap<DateField, u64>,
    /// Win32 file attribute bits
    pub attributes: Option<u32>,
    /// Run count
    pub run_count: Option<u32>,
    /// Reported by `is_file_result`
    pub is_file: bool,
    /// Reported by `is_folder_result`
    pub is_folder: bool,
}

impl StubEntry {
    /// A file entry.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_file: true,
            ..Default::default()
        }
    }

    /// A folder entry.
    pub fn folder(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_folder: true,
            ..Default::default()
        }
    }

    /// An entry the engine cannot classify as file or folder.
    pub fn unclassified(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_date(mut self, field: DateField, ticks: u64) -> Self {
        self.dates.insert(field, ticks);
        self
    }

    pub fn with_attributes(mut self, attributes: u32) -> Self {
        self.attributes = Some(attributes);
        self
    }

    pub fn with_run_count(mut self, run_count: u32) -> Self {
        self.run_count = Some(run_count);
        self
    }

    /// Report this entry as both file and folder, which a well-behaved
    /// engine never does.
    pub fn with_conflicting_kind(mut self) -> Self {
        self.is_file = true;
        self.is_folder = true;
        self
    }

    /// Last path component.
    fn name(&self) -> &str {
        self.path
            .rsplit(&['\\', '/'][..])
            .next()
            .unwrap_or(&self.path)
    }
}

/// Deterministic in-memory [`Engine`].
pub struct StubEngine {
    entries: Vec<StubEntry>,
    capabilities: FieldFlags,

    search: String,
    regex: bool,
    match_case: bool,
    match_whole_word: bool,
    match_path: bool,
    max: u32,
    offset: u32,
    request_flags: u32,

    results: Vec<usize>,
    available: u32,
    deferred: bool,
    pending: Option<Vec<usize>>,
    failure: Option<ErrorCode>,
    last_error: Cell<u32>,
    query_count: usize,
    raw_handlers: HashMap<String, Box<dyn FnMut(&[usize]) -> usize>>,
}

impl StubEngine {
    /// Create an engine over `entries` that can compute every field.
    pub fn new(entries: Vec<StubEntry>) -> Self {
        Self {
            entries,
            capabilities: FieldFlags::ALL,
            search: String::new(),
            regex: false,
            match_case: false,
            match_whole_word: false,
            match_path: false,
            max: u32::MAX,
            offset: 0,
            request_flags: FieldFlags::default().bits(),
            results: Vec::new(),
            available: 0,
            deferred: false,
            pending: None,
            failure: None,
            last_error: Cell::new(ErrorCode::Ok.as_raw()),
            query_count: 0,
            raw_handlers: HashMap::new(),
        }
    }

    /// Limit the fields this engine will populate, regardless of request.
    pub fn with_capabilities(mut self, capabilities: FieldFlags) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// When set, `query(false)` returns before results are ready; they
    /// become visible on [`complete_pending`](Self::complete_pending).
    pub fn set_deferred(&mut self, deferred: bool) {
        self.deferred = deferred;
    }

    /// Publish the results of an in-flight non-waiting query.
    ///
    /// Returns false if no query was in flight.
    pub fn complete_pending(&mut self) -> bool {
        match self.pending.take() {
            Some(results) => {
                self.results = results;
                true
            }
            None => false,
        }
    }

    /// Make every subsequent query fail with `code`, or succeed again with `None`.
    pub fn fail_queries_with(&mut self, code: Option<ErrorCode>) {
        self.failure = code;
    }

    /// Overwrite the global last-error value, as another SDK consumer would.
    pub fn set_last_error(&self, code: ErrorCode) {
        self.last_error.set(code.as_raw());
    }

    /// Overwrite the last-error value with a raw number, including values
    /// outside the documented codes.
    pub fn set_raw_last_error(&self, raw: u32) {
        self.last_error.set(raw);
    }

    /// Register a handler for `invoke_raw("<name>", ..)`.
    pub fn register_raw<F>(&mut self, name: &str, handler: F)
    where
        F: FnMut(&[usize]) -> usize + 'static,
    {
        self.raw_handlers.insert(name.to_string(), Box::new(handler));
    }

    /// Number of `query` calls so far.
    pub fn query_count(&self) -> usize {
        self.query_count
    }

    /// Search string most recently pushed by the client.
    pub fn search(&self) -> &str {
        &self.search
    }

    /// Regex flag most recently pushed by the client.
    pub fn regex_enabled(&self) -> bool {
        self.regex
    }

    /// Request flags most recently pushed by the client.
    pub fn request_flags(&self) -> u32 {
        self.request_flags
    }

    /// Whether a non-waiting query is still in flight.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn evaluate_search(&self) -> Vec<usize> {
        let matchers = match self.build_matchers() {
            Some(matchers) => matchers,
            None => return Vec::new(),
        };

        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| {
                let subject = if self.match_path { entry.path.as_str() } else { entry.name() };
                matchers.iter().all(|m| m.is_match(subject))
            })
            .map(|(i, _)| i)
            .skip(self.offset as usize)
            .take(self.max as usize)
            .collect()
    }

    /// One regex per search term. `None` means the search cannot match
    /// anything (an invalid regular expression).
    fn build_matchers(&self) -> Option<Vec<Regex>> {
        let patterns: Vec<String> = if self.regex {
            vec![self.search.clone()]
        } else {
            self.search.split_whitespace().map(|term| self.term_pattern(term)).collect()
        };

        let mut matchers = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            match RegexBuilder::new(&pattern)
                .case_insensitive(!self.match_case)
                .build()
            {
                Ok(re) => matchers.push(re),
                Err(e) => {
                    tracing::debug!("Stub engine rejected pattern {:?}: {}", pattern, e);
                    return None;
                }
            }
        }
        Some(matchers)
    }

    fn term_pattern(&self, term: &str) -> String {
        if term.contains(&['*', '?'][..]) {
            let mut pattern = String::from("^");
            for c in term.chars() {
                match c {
                    '*' => pattern.push_str(".*"),
                    '?' => pattern.push('.'),
                    _ => pattern.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
                }
            }
            pattern.push('$');
            pattern
        } else if self.match_whole_word {
            format!(r"\b{}\b", regex::escape(term))
        } else {
            regex::escape(term)
        }
    }

    fn has(&self, flag: FieldFlags) -> bool {
        self.available & flag.bits() != 0
    }

    /// Entry at visible `index`, recording `InvalidIndex` when there is none.
    fn entry(&self, index: u32) -> Option<&StubEntry> {
        let entry = self
            .results
            .get(index as usize)
            .and_then(|&i| self.entries.get(i));
        if entry.is_none() {
            self.last_error.set(ErrorCode::InvalidIndex.as_raw());
        }
        entry
    }

    /// Field value at `index`, recording `InvalidCall` when the field was
    /// not computed for the current result list.
    fn field<T>(
        &self,
        flag: FieldFlags,
        index: u32,
        get: impl Fn(&StubEntry) -> Option<T>,
    ) -> Option<T> {
        let entry = self.entry(index)?;
        if !self.has(flag) {
            self.last_error.set(ErrorCode::InvalidCall.as_raw());
            return None;
        }
        get(entry)
    }
}

impl Default for StubEngine {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Engine for StubEngine {
    fn query(&mut self, wait: bool) -> bool {
        self.query_count += 1;

        if let Some(code) = self.failure {
            self.results.clear();
            self.pending = None;
            self.available = 0;
            self.last_error.set(code.as_raw());
            return false;
        }

        let matches = self.evaluate_search();
        self.available = self.request_flags & self.capabilities.bits();
        self.last_error.set(ErrorCode::Ok.as_raw());

        if self.deferred && !wait {
            self.results.clear();
            self.pending = Some(matches);
        } else {
            self.results = matches;
            self.pending = None;
        }
        true
    }

    fn set_search(&mut self, search: &str) {
        self.search = search.to_string();
    }

    fn set_regex(&mut self, enabled: bool) {
        self.regex = enabled;
    }

    fn set_match_case(&mut self, enabled: bool) {
        self.match_case = enabled;
    }

    fn set_match_whole_word(&mut self, enabled: bool) {
        self.match_whole_word = enabled;
    }

    fn set_match_path(&mut self, enabled: bool) {
        self.match_path = enabled;
    }

    fn set_max(&mut self, max: u32) {
        self.max = max;
    }

    fn set_offset(&mut self, offset: u32) {
        self.offset = offset;
    }

    fn set_request_flags(&mut self, flags: u32) {
        self.request_flags = flags;
    }

    fn result_list_request_flags(&self) -> u32 {
        self.available
    }

    fn num_results(&self) -> u32 {
        u32::try_from(self.results.len()).unwrap_or(u32::MAX)
    }

    fn result_full_path_name(&self, index: u32, buf: &mut [u16]) -> u32 {
        let Some(entry) = self.entry(index) else {
            return 0;
        };
        let wide: Vec<u16> = entry.path.encode_utf16().collect();
        if wide.len() + 1 > buf.len() {
            self.last_error.set(ErrorCode::InvalidCall.as_raw());
            return 0;
        }
        buf[..wide.len()].copy_from_slice(&wide);
        buf[wide.len()] = 0;
        wide.len() as u32
    }

    fn result_size(&self, index: u32) -> Option<u64> {
        self.field(FieldFlags::SIZE, index, |e| e.size)
    }

    fn result_date(&self, field: DateField, index: u32) -> Option<u64> {
        self.field(field.flag(), index, |e| e.dates.get(&field).copied())
    }

    fn result_attributes(&self, index: u32) -> Option<u32> {
        self.field(FieldFlags::ATTRIBUTES, index, |e| e.attributes)
    }

    fn result_run_count(&self, index: u32) -> Option<u32> {
        self.field(FieldFlags::RUN_COUNT, index, |e| e.run_count)
    }

    fn is_file_result(&self, index: u32) -> bool {
        self.entry(index).map(|e| e.is_file).unwrap_or(false)
    }

    fn is_folder_result(&self, index: u32) -> bool {
        self.entry(index).map(|e| e.is_folder).unwrap_or(false)
    }

    fn last_error(&self) -> u32 {
        self.last_error.get()
    }

    unsafe fn invoke_raw(&mut self, name: &str, args: &[usize]) -> Result<usize> {
        match self.raw_handlers.get_mut(name) {
            Some(handler) => Ok((*handler)(args)),
            None => Err(EverythingError::MissingSymbol(format!("Everything_{}", name))),
        }
    }
}
