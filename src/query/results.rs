//! Typed access to the result set of the last evaluation.
//!
//! A [`ResultView`] captures the result count and available fields at the
//! moment it is created. A [`Record`] is a cursor: an index plus a borrow of
//! its view. Nothing is copied out of the engine; every accessor queries the
//! engine by index when it is called.
//!
//! Accessors return `None` when the engine has no data for a field (not
//! requested, not available, or an engine-side failure). Only indexing
//! outside `[0, count)` is an error.

use std::cell::RefCell;
use std::fmt;
use std::iter::FusedIterator;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::query::filetime::filetime_to_local;
use crate::sdk::{DateField, Engine, FieldFlags, EVERYTHING_MAX_PATH};
use crate::{EverythingError, Result};

/// File-vs-folder classification of a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    File,
    Folder,
    /// The engine classified the result as neither
    Unknown,
}

/// Read-only, index-addressed view over the current result set.
///
/// Borrows the owning session's engine, so the session cannot re-evaluate
/// while the view (or any record or iterator from it) is alive.
pub struct ResultView<'s, E: Engine> {
    engine: &'s E,
    count: usize,
    available: FieldFlags,
    /// Reused buffer for full path reads, allocated on first use
    path_buf: RefCell<Vec<u16>>,
}

impl<'s, E: Engine> ResultView<'s, E> {
    pub(crate) fn new(engine: &'s E, count: usize, available: FieldFlags) -> Self {
        Self {
            engine,
            count,
            available,
            path_buf: RefCell::new(Vec::new()),
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Fields populated for this result set.
    pub fn available_fields(&self) -> FieldFlags {
        self.available
    }

    /// Record at `index`.
    ///
    /// # Errors
    /// Returns `IndexOutOfRange` unless `index < len()`.
    pub fn get(&self, index: usize) -> Result<Record<'_, E>> {
        if index >= self.count {
            return Err(EverythingError::IndexOutOfRange {
                index: i64::try_from(index).unwrap_or(i64::MAX),
                count: self.count,
            });
        }
        Ok(Record { view: self, index })
    }

    /// Record at a signed `index`, for indices that come from user input.
    ///
    /// # Errors
    /// Returns `IndexOutOfRange` for negative indices and for `index >= len()`.
    pub fn get_signed(&self, index: i64) -> Result<Record<'_, E>> {
        let out_of_range = || EverythingError::IndexOutOfRange {
            index,
            count: self.count,
        };
        let index = usize::try_from(index).map_err(|_| out_of_range())?;
        self.get(index).map_err(|_| out_of_range())
    }

    /// Iterate over all records in ascending index order.
    ///
    /// The length is fixed when the iterator is created. Each call starts
    /// a fresh pass.
    pub fn iter(&self) -> ResultIter<'_, E> {
        ResultIter {
            view: self,
            front: 0,
            back: self.count,
        }
    }
}

/// Engine-side index. Counts come from a `u32`, so every valid index fits.
fn engine_index(index: usize) -> u32 {
    index as u32
}

impl<E: Engine> fmt::Debug for ResultView<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultView")
            .field("count", &self.count)
            .field("available", &self.available)
            .finish()
    }
}

impl<'v, 's, E: Engine> IntoIterator for &'v ResultView<'s, E> {
    type Item = Record<'v, E>;
    type IntoIter = ResultIter<'v, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// One result, addressed by index.
pub struct Record<'v, E: Engine> {
    view: &'v ResultView<'v, E>,
    index: usize,
}

impl<E: Engine> Clone for Record<'_, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E: Engine> Copy for Record<'_, E> {}

impl<'v, E: Engine> Record<'v, E> {
    /// Zero-based index of this record in its view.
    pub fn index(&self) -> usize {
        self.index
    }

    fn engine(&self) -> &'v E {
        self.view.engine
    }

    fn raw_index(&self) -> u32 {
        engine_index(self.index)
    }

    fn has(&self, flag: FieldFlags) -> bool {
        self.view.available.contains(flag)
    }

    /// Full path and file name.
    pub fn filename(&self) -> Option<String> {
        let mut buf = self.view.path_buf.borrow_mut();
        if buf.len() < EVERYTHING_MAX_PATH {
            buf.resize(EVERYTHING_MAX_PATH, 0);
        }

        let len = self.engine().result_full_path_name(self.raw_index(), &mut buf) as usize;
        if len == 0 {
            return None;
        }
        Some(String::from_utf16_lossy(&buf[..len.min(buf.len())]))
    }

    /// Size in bytes.
    pub fn size(&self) -> Option<u64> {
        if !self.has(FieldFlags::SIZE) {
            return None;
        }
        self.engine().result_size(self.raw_index())
    }

    /// Any of the five date fields, as local time.
    pub fn date(&self, field: DateField) -> Option<DateTime<Local>> {
        if !self.has(field.flag()) {
            return None;
        }
        self.engine()
            .result_date(field, self.raw_index())
            .and_then(filetime_to_local)
    }

    pub fn date_accessed(&self) -> Option<DateTime<Local>> {
        self.date(DateField::Accessed)
    }

    pub fn date_created(&self) -> Option<DateTime<Local>> {
        self.date(DateField::Created)
    }

    pub fn date_modified(&self) -> Option<DateTime<Local>> {
        self.date(DateField::Modified)
    }

    pub fn date_recently_changed(&self) -> Option<DateTime<Local>> {
        self.date(DateField::RecentlyChanged)
    }

    pub fn date_run(&self) -> Option<DateTime<Local>> {
        self.date(DateField::Run)
    }

    /// Win32 file attribute bits.
    pub fn attributes(&self) -> Option<u32> {
        if !self.has(FieldFlags::ATTRIBUTES) {
            return None;
        }
        self.engine().result_attributes(self.raw_index())
    }

    /// Number of times the result was opened from Everything.
    pub fn run_count(&self) -> Option<u32> {
        if !self.has(FieldFlags::RUN_COUNT) {
            return None;
        }
        self.engine().result_run_count(self.raw_index())
    }

    pub fn is_file(&self) -> bool {
        self.engine().is_file_result(self.raw_index())
    }

    pub fn is_folder(&self) -> bool {
        self.engine().is_folder_result(self.raw_index())
    }

    /// File/folder classification.
    ///
    /// # Errors
    /// Returns `ClassificationConflict` if the engine reports the result as
    /// both a file and a folder.
    pub fn kind(&self) -> Result<RecordKind> {
        match (self.is_file(), self.is_folder()) {
            (true, true) => {
                tracing::error!("Result {} reported as both file and folder", self.index);
                Err(EverythingError::ClassificationConflict(self.index))
            }
            (true, false) => Ok(RecordKind::File),
            (false, true) => Ok(RecordKind::Folder),
            (false, false) => Ok(RecordKind::Unknown),
        }
    }
}

impl<E: Engine> fmt::Debug for Record<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record").field("index", &self.index).finish()
    }
}

/// Iterator over the records of a [`ResultView`].
pub struct ResultIter<'v, E: Engine> {
    view: &'v ResultView<'v, E>,
    front: usize,
    back: usize,
}

impl<'v, E: Engine> Iterator for ResultIter<'v, E> {
    type Item = Record<'v, E>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let record = Record {
            view: self.view,
            index: self.front,
        };
        self.front += 1;
        Some(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl<E: Engine> DoubleEndedIterator for ResultIter<'_, E> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        Some(Record {
            view: self.view,
            index: self.back,
        })
    }
}

impl<E: Engine> ExactSizeIterator for ResultIter<'_, E> {}

impl<E: Engine> FusedIterator for ResultIter<'_, E> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::filetime::FILETIME_UNIX_EPOCH;
    use crate::query::QuerySession;
    use crate::sdk::{StubEngine, StubEntry};
    use chrono::{TimeZone, Utc};

    fn session_with(entries: Vec<StubEntry>, fields: FieldFlags) -> QuerySession<StubEngine> {
        let mut session = QuerySession::new(StubEngine::new(entries));
        session.set_requested_fields(fields);
        assert!(session.evaluate(true));
        session
    }

    fn mixed_entries() -> Vec<StubEntry> {
        vec![
            StubEntry::file(r"C:\docs\a.txt")
                .with_size(1024)
                .with_date(DateField::Modified, FILETIME_UNIX_EPOCH),
            StubEntry::folder(r"C:\docs"),
            StubEntry::unclassified(r"C:\pagefile.sys"),
        ]
    }

    #[test]
    fn test_txt_names_in_order() {
        let mut session = QuerySession::new(StubEngine::new(vec![
            StubEntry::file("a.txt"),
            StubEntry::file("b.txt"),
            StubEntry::file("c.txt"),
        ]));
        session.set_search("*.txt");
        session.set_regex_enabled(false);
        assert!(session.evaluate(true));
        assert_eq!(session.result_count(), 3);

        let names: Vec<String> = session
            .results()
            .iter()
            .filter_map(|r| r.filename())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);
    }

    #[test]
    fn test_iteration_yields_count_records_in_order() {
        let session = session_with(mixed_entries(), FieldFlags::ALL);
        let view = session.results();

        let indices: Vec<usize> = view.iter().map(|r| r.index()).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(view.iter().len(), view.len());
    }

    #[test]
    fn test_iteration_is_restartable() {
        let session = session_with(mixed_entries(), FieldFlags::ALL);
        let view = session.results();

        let first: Vec<Option<String>> = view.iter().map(|r| r.filename()).collect();
        let second: Vec<Option<String>> = (&view).into_iter().map(|r| r.filename()).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn test_reverse_iteration() {
        let session = session_with(mixed_entries(), FieldFlags::ALL);
        let view = session.results();
        let indices: Vec<usize> = view.iter().rev().map(|r| r.index()).collect();
        assert_eq!(indices, vec![2, 1, 0]);
    }

    #[test]
    fn test_index_equal_to_count_is_out_of_range() {
        let session = session_with(mixed_entries(), FieldFlags::ALL);
        let view = session.results();

        assert!(view.get(2).is_ok());
        assert!(matches!(
            view.get(3),
            Err(EverythingError::IndexOutOfRange { index: 3, count: 3 })
        ));
        assert!(matches!(
            view.get_signed(3),
            Err(EverythingError::IndexOutOfRange { index: 3, count: 3 })
        ));
    }

    #[test]
    fn test_negative_index_is_out_of_range() {
        let session = session_with(mixed_entries(), FieldFlags::ALL);
        let view = session.results();
        assert!(matches!(
            view.get_signed(-1),
            Err(EverythingError::IndexOutOfRange { index: -1, count: 3 })
        ));
        assert!(view.get_signed(0).is_ok());
    }

    #[test]
    fn test_empty_view_rejects_every_index() {
        let session = session_with(Vec::new(), FieldFlags::ALL);
        let view = session.results();
        assert!(view.is_empty());
        assert!(view.get(0).is_err());
        assert!(view.get_signed(-1).is_err());
        assert_eq!(view.iter().next().map(|r| r.index()), None);
    }

    #[test]
    fn test_file_and_folder_never_both_true() {
        let session = session_with(mixed_entries(), FieldFlags::ALL);
        for record in &session.results() {
            assert!(!(record.is_file() && record.is_folder()));
        }

        let view = session.results();
        assert_eq!(view.get(0).unwrap().kind().unwrap(), RecordKind::File);
        assert_eq!(view.get(1).unwrap().kind().unwrap(), RecordKind::Folder);
        assert_eq!(view.get(2).unwrap().kind().unwrap(), RecordKind::Unknown);
    }

    #[test]
    fn test_classification_conflict_is_reported() {
        let session = session_with(
            vec![StubEntry::file("broken").with_conflicting_kind()],
            FieldFlags::ALL,
        );
        let view = session.results();
        assert!(matches!(
            view.get(0).unwrap().kind(),
            Err(EverythingError::ClassificationConflict(0))
        ));
    }

    #[test]
    fn test_epoch_ticks_convert_to_1970() {
        let session = session_with(mixed_entries(), FieldFlags::DATE_MODIFIED);
        let view = session.results();
        let modified = view.get(0).unwrap().date_modified().unwrap();
        assert_eq!(
            modified.with_timezone(&Utc),
            Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_all_date_fields_behave_alike() {
        let ticks = FILETIME_UNIX_EPOCH + 86_400 * 10_000_000;
        let entry = DateField::ALL
            .iter()
            .fold(StubEntry::file("dated.txt"), |e, &field| e.with_date(field, ticks));
        let session = session_with(vec![entry], FieldFlags::ALL);
        let view = session.results();
        let record = view.get(0).unwrap();

        let expected = Utc.with_ymd_and_hms(1970, 1, 2, 0, 0, 0).unwrap();
        for value in [
            record.date_accessed(),
            record.date_created(),
            record.date_modified(),
            record.date_recently_changed(),
            record.date_run(),
        ] {
            assert_eq!(value.map(|d| d.with_timezone(&Utc)), Some(expected));
        }
    }

    #[test]
    fn test_unrequested_fields_are_absent() {
        let session = session_with(mixed_entries(), FieldFlags::FULL_PATH_AND_FILE_NAME);
        let view = session.results();
        let record = view.get(0).unwrap();

        assert_eq!(record.filename().as_deref(), Some(r"C:\docs\a.txt"));
        assert_eq!(record.size(), None);
        assert_eq!(record.date_modified(), None);
    }

    #[test]
    fn test_unavailable_fields_are_absent() {
        let mut session = QuerySession::new(
            StubEngine::new(mixed_entries()).with_capabilities(FieldFlags::FULL_PATH_AND_FILE_NAME),
        );
        session.set_requested_fields(FieldFlags::ALL);
        session.evaluate(true);

        let view = session.results();
        assert_eq!(view.available_fields(), FieldFlags::FULL_PATH_AND_FILE_NAME);
        assert_eq!(view.get(0).unwrap().size(), None);
    }

    #[test]
    fn test_missing_values_are_absent() {
        let session = session_with(mixed_entries(), FieldFlags::ALL);
        let view = session.results();
        let folder = view.get(1).unwrap();
        assert_eq!(folder.size(), None);
        assert_eq!(folder.date_created(), None);
        assert_eq!(folder.attributes(), None);
        assert_eq!(folder.run_count(), None);
    }

    #[test]
    fn test_size_attributes_and_run_count() {
        let session = session_with(
            vec![StubEntry::file("tool.exe")
                .with_size(4096)
                .with_attributes(0x20)
                .with_run_count(7)],
            FieldFlags::SIZE | FieldFlags::ATTRIBUTES | FieldFlags::RUN_COUNT,
        );
        let view = session.results();
        let record = view.get(0).unwrap();
        assert_eq!(record.size(), Some(4096));
        assert_eq!(record.attributes(), Some(0x20));
        assert_eq!(record.run_count(), Some(7));
    }

    #[test]
    fn test_filename_absent_when_engine_fails() {
        let too_long = "x".repeat(EVERYTHING_MAX_PATH);
        let session = session_with(vec![StubEntry::file(too_long)], FieldFlags::ALL);
        let view = session.results();
        assert_eq!(view.get(0).unwrap().filename(), None);
    }

    #[test]
    fn test_filename_handles_non_ascii() {
        let session = session_with(vec![StubEntry::file(r"D:\音乐\曲.mp3")], FieldFlags::ALL);
        let view = session.results();
        assert_eq!(view.get(0).unwrap().filename().as_deref(), Some(r"D:\音乐\曲.mp3"));
    }

    #[test]
    fn test_iterator_length_fixed_at_start() {
        let session = session_with(mixed_entries(), FieldFlags::ALL);
        let view = session.results();
        let mut iter = view.iter();
        assert_eq!(iter.len(), 3);
        iter.next();
        assert_eq!(iter.len(), 2);
        assert_eq!(iter.by_ref().count(), 2);
        assert!(iter.next().is_none());
    }
}
