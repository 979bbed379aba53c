//! The function-call boundary exposed by the Everything SDK.
//!
//! Each method corresponds to one `Everything_*` export. Raw numeric types
//! (`u32` flags and error codes) are kept at this level; the typed API lives
//! in [`crate::query`]. Getters that the SDK models as "success flag plus
//! out-parameter" return `Option`.

use super::flags::DateField;
use crate::Result;

/// A connection to an Everything engine.
///
/// The SDK keeps one global query state per loaded library, so setters take
/// `&mut self` and implementations are not expected to be shared across
/// threads without external serialization.
pub trait Engine {
    /// `Everything_QueryW`: execute a query with the current search state.
    ///
    /// With `wait == false` the call returns as soon as the query has been
    /// sent; results arrive later and are not visible until they do.
    fn query(&mut self, wait: bool) -> bool;

    /// `Everything_SetSearchW`
    fn set_search(&mut self, search: &str);

    /// `Everything_SetRegex`
    fn set_regex(&mut self, enabled: bool);

    /// `Everything_SetMatchCase`
    fn set_match_case(&mut self, enabled: bool);

    /// `Everything_SetMatchWholeWord`
    fn set_match_whole_word(&mut self, enabled: bool);

    /// `Everything_SetMatchPath`
    fn set_match_path(&mut self, enabled: bool);

    /// `Everything_SetMax`: maximum number of results (`u32::MAX` for no limit)
    fn set_max(&mut self, max: u32);

    /// `Everything_SetOffset`: index of the first visible result
    fn set_offset(&mut self, offset: u32);

    /// `Everything_SetRequestFlags`
    fn set_request_flags(&mut self, flags: u32);

    /// `Everything_GetResultListRequestFlags`: fields actually available
    fn result_list_request_flags(&self) -> u32;

    /// `Everything_GetNumResults`: number of visible results
    fn num_results(&self) -> u32;

    /// `Everything_GetResultFullPathNameW`
    ///
    /// Copies the NUL-terminated full path of result `index` into `buf` and
    /// returns the number of code units copied, excluding the terminator.
    /// Returns 0 on failure.
    fn result_full_path_name(&self, index: u32, buf: &mut [u16]) -> u32;

    /// `Everything_GetResultSize`
    fn result_size(&self, index: u32) -> Option<u64>;

    /// `Everything_GetResultDate{Accessed,Created,Modified,RecentlyChanged,Run}`
    ///
    /// Returns the raw FILETIME tick count.
    fn result_date(&self, field: DateField, index: u32) -> Option<u64>;

    /// `Everything_GetResultAttributes`
    fn result_attributes(&self, index: u32) -> Option<u32>;

    /// `Everything_GetResultRunCount`
    fn result_run_count(&self, index: u32) -> Option<u32>;

    /// `Everything_IsFileResult`
    fn is_file_result(&self, index: u32) -> bool;

    /// `Everything_IsFolderResult`
    fn is_folder_result(&self, index: u32) -> bool;

    /// `Everything_GetLastError`
    fn last_error(&self) -> u32;

    /// Invoke the export `Everything_<name>` with machine-word arguments.
    ///
    /// # Safety
    ///
    /// The caller must pass exactly the arguments the named entry point
    /// expects, with pointers valid for the duration of the call. Nothing
    /// about the signature can be checked.
    unsafe fn invoke_raw(&mut self, name: &str, args: &[usize]) -> Result<usize>;
}
