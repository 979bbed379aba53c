//! Binding to the Everything SDK DLL.
//!
//! Loads `Everything32.dll` / `Everything64.dll` with `LoadLibraryW` and
//! resolves every `Everything_*` export the [`Engine`] trait needs up front,
//! so a missing entry point is reported at load time rather than on first use.
//!
//! On non-Windows platforms [`LibraryEngine`] cannot be constructed.

#[cfg(windows)]
pub use imp::LibraryEngine;

#[cfg(not(windows))]
pub use stub::LibraryEngine;

#[cfg(windows)]
mod imp {
    use std::ffi::CString;
    use std::os::windows::ffi::OsStrExt;
    use std::path::{Path, PathBuf};

    use windows::core::{PCSTR, PCWSTR};
    use windows::Win32::Foundation::{FreeLibrary, HMODULE};
    use windows::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryW};

    use crate::sdk::engine::Engine;
    use crate::sdk::flags::DateField;
    use crate::{EverythingError, Result};

    /// Returned by `Everything_GetResultAttributes` on failure.
    const INVALID_FILE_ATTRIBUTES: u32 = 0xFFFF_FFFF;

    type Farproc = unsafe extern "system" fn() -> isize;

    type QueryFn = unsafe extern "system" fn(i32) -> i32;
    type SetWideFn = unsafe extern "system" fn(*const u16);
    type SetBoolFn = unsafe extern "system" fn(i32);
    type SetDwordFn = unsafe extern "system" fn(u32);
    type GetDwordFn = unsafe extern "system" fn() -> u32;
    type FullPathFn = unsafe extern "system" fn(u32, *mut u16, u32) -> u32;
    type IndexU64Fn = unsafe extern "system" fn(u32, *mut u64) -> i32;
    type IndexDwordFn = unsafe extern "system" fn(u32) -> u32;
    type IndexBoolFn = unsafe extern "system" fn(u32) -> i32;

    type Raw0 = unsafe extern "system" fn() -> usize;
    type Raw1 = unsafe extern "system" fn(usize) -> usize;
    type Raw2 = unsafe extern "system" fn(usize, usize) -> usize;
    type Raw3 = unsafe extern "system" fn(usize, usize, usize) -> usize;
    type Raw4 = unsafe extern "system" fn(usize, usize, usize, usize) -> usize;

    /// Resolve an export and cast it to the function pointer type expected
    /// at the use site. Returns `MissingSymbol` from the enclosing function
    /// if the export does not exist.
    macro_rules! bind {
        ($module:expr, $name:literal) => {{
            // SAFETY: the module handle is live and the name is NUL-terminated.
            let proc = unsafe {
                GetProcAddress($module, PCSTR::from_raw(concat!($name, "\0").as_ptr()))
            };
            match proc {
                // SAFETY: the target type mirrors the SDK header prototype.
                Some(proc) => unsafe { std::mem::transmute::<Farproc, _>(proc) },
                None => return Err(EverythingError::MissingSymbol($name.to_string())),
            }
        }};
    }

    /// Resolved SDK entry points.
    struct Api {
        query: QueryFn,
        set_search: SetWideFn,
        set_regex: SetBoolFn,
        set_match_case: SetBoolFn,
        set_match_whole_word: SetBoolFn,
        set_match_path: SetBoolFn,
        set_max: SetDwordFn,
        set_offset: SetDwordFn,
        set_request_flags: SetDwordFn,
        result_list_request_flags: GetDwordFn,
        num_results: GetDwordFn,
        full_path_name: FullPathFn,
        size: IndexU64Fn,
        date_accessed: IndexU64Fn,
        date_created: IndexU64Fn,
        date_modified: IndexU64Fn,
        date_recently_changed: IndexU64Fn,
        date_run: IndexU64Fn,
        attributes: IndexDwordFn,
        run_count: IndexDwordFn,
        is_file: IndexBoolFn,
        is_folder: IndexBoolFn,
        last_error: GetDwordFn,
    }

    impl Api {
        fn bind(module: HMODULE) -> Result<Self> {
            Ok(Self {
                query: bind!(module, "Everything_QueryW"),
                set_search: bind!(module, "Everything_SetSearchW"),
                set_regex: bind!(module, "Everything_SetRegex"),
                set_match_case: bind!(module, "Everything_SetMatchCase"),
                set_match_whole_word: bind!(module, "Everything_SetMatchWholeWord"),
                set_match_path: bind!(module, "Everything_SetMatchPath"),
                set_max: bind!(module, "Everything_SetMax"),
                set_offset: bind!(module, "Everything_SetOffset"),
                set_request_flags: bind!(module, "Everything_SetRequestFlags"),
                result_list_request_flags: bind!(module, "Everything_GetResultListRequestFlags"),
                num_results: bind!(module, "Everything_GetNumResults"),
                full_path_name: bind!(module, "Everything_GetResultFullPathNameW"),
                size: bind!(module, "Everything_GetResultSize"),
                date_accessed: bind!(module, "Everything_GetResultDateAccessed"),
                date_created: bind!(module, "Everything_GetResultDateCreated"),
                date_modified: bind!(module, "Everything_GetResultDateModified"),
                date_recently_changed: bind!(module, "Everything_GetResultDateRecentlyChanged"),
                date_run: bind!(module, "Everything_GetResultDateRun"),
                attributes: bind!(module, "Everything_GetResultAttributes"),
                run_count: bind!(module, "Everything_GetResultRunCount"),
                is_file: bind!(module, "Everything_IsFileResult"),
                is_folder: bind!(module, "Everything_IsFolderResult"),
                last_error: bind!(module, "Everything_GetLastError"),
            })
        }

        fn date(&self, field: DateField) -> IndexU64Fn {
            match field {
                DateField::Accessed => self.date_accessed,
                DateField::Created => self.date_created,
                DateField::Modified => self.date_modified,
                DateField::RecentlyChanged => self.date_recently_changed,
                DateField::Run => self.date_run,
            }
        }
    }

    /// Engine backed by the Everything SDK DLL.
    ///
    /// The library stays loaded until this value is dropped. The SDK keeps
    /// its query state in process-wide globals, so two `LibraryEngine`s
    /// loading the same DLL share that state.
    pub struct LibraryEngine {
        module: HMODULE,
        path: PathBuf,
        api: Api,
    }

    impl LibraryEngine {
        /// Load the SDK DLL at `path` and resolve its entry points.
        ///
        /// # Errors
        /// Returns `Library` if the DLL cannot be loaded and `MissingSymbol`
        /// if it lacks an export this binding needs (an SDK older than v2).
        pub fn load(path: &Path) -> Result<Self> {
            let wide: Vec<u16> = path
                .as_os_str()
                .encode_wide()
                .chain(std::iter::once(0))
                .collect();

            let module = unsafe { LoadLibraryW(PCWSTR::from_raw(wide.as_ptr())) }.map_err(|e| {
                EverythingError::Library(format!("Failed to load {}: {}", path.display(), e))
            })?;

            let api = match Api::bind(module) {
                Ok(api) => api,
                Err(e) => {
                    // SAFETY: module was returned by LoadLibraryW above and is not used again.
                    let _ = unsafe { FreeLibrary(module) };
                    return Err(e);
                }
            };

            tracing::info!("Loaded Everything SDK from {:?}", path);

            Ok(Self {
                module,
                path: path.to_path_buf(),
                api,
            })
        }

        /// Path the library was loaded from.
        pub fn path(&self) -> &Path {
            &self.path
        }
    }

    impl Drop for LibraryEngine {
        fn drop(&mut self) {
            // SAFETY: no function pointer from `api` outlives self.
            if let Err(e) = unsafe { FreeLibrary(self.module) } {
                tracing::warn!("Failed to unload {:?}: {}", self.path, e);
            } else {
                tracing::debug!("Unloaded Everything SDK {:?}", self.path);
            }
        }
    }

    // SAFETY (all calls below): every pointer comes from an export resolved
    // in `Api::bind` against a module that stays loaded for the lifetime of
    // `self`, and the argument types follow the SDK header.
    impl Engine for LibraryEngine {
        fn query(&mut self, wait: bool) -> bool {
            unsafe { (self.api.query)(wait as i32) != 0 }
        }

        fn set_search(&mut self, search: &str) {
            let wide: Vec<u16> = search.encode_utf16().chain(std::iter::once(0)).collect();
            // The SDK copies the string before returning.
            unsafe { (self.api.set_search)(wide.as_ptr()) }
        }

        fn set_regex(&mut self, enabled: bool) {
            unsafe { (self.api.set_regex)(enabled as i32) }
        }

        fn set_match_case(&mut self, enabled: bool) {
            unsafe { (self.api.set_match_case)(enabled as i32) }
        }

        fn set_match_whole_word(&mut self, enabled: bool) {
            unsafe { (self.api.set_match_whole_word)(enabled as i32) }
        }

        fn set_match_path(&mut self, enabled: bool) {
            unsafe { (self.api.set_match_path)(enabled as i32) }
        }

        fn set_max(&mut self, max: u32) {
            unsafe { (self.api.set_max)(max) }
        }

        fn set_offset(&mut self, offset: u32) {
            unsafe { (self.api.set_offset)(offset) }
        }

        fn set_request_flags(&mut self, flags: u32) {
            unsafe { (self.api.set_request_flags)(flags) }
        }

        fn result_list_request_flags(&self) -> u32 {
            unsafe { (self.api.result_list_request_flags)() }
        }

        fn num_results(&self) -> u32 {
            unsafe { (self.api.num_results)() }
        }

        fn result_full_path_name(&self, index: u32, buf: &mut [u16]) -> u32 {
            let capacity = u32::try_from(buf.len()).unwrap_or(u32::MAX);
            unsafe { (self.api.full_path_name)(index, buf.as_mut_ptr(), capacity) }
        }

        fn result_size(&self, index: u32) -> Option<u64> {
            let mut size = 0u64;
            let ok = unsafe { (self.api.size)(index, &mut size) };
            (ok != 0).then_some(size)
        }

        fn result_date(&self, field: DateField, index: u32) -> Option<u64> {
            let mut ticks = 0u64;
            let ok = unsafe { (self.api.date(field))(index, &mut ticks) };
            (ok != 0).then_some(ticks)
        }

        fn result_attributes(&self, index: u32) -> Option<u32> {
            let attributes = unsafe { (self.api.attributes)(index) };
            (attributes != INVALID_FILE_ATTRIBUTES).then_some(attributes)
        }

        fn result_run_count(&self, index: u32) -> Option<u32> {
            Some(unsafe { (self.api.run_count)(index) })
        }

        fn is_file_result(&self, index: u32) -> bool {
            unsafe { (self.api.is_file)(index) != 0 }
        }

        fn is_folder_result(&self, index: u32) -> bool {
            unsafe { (self.api.is_folder)(index) != 0 }
        }

        fn last_error(&self) -> u32 {
            unsafe { (self.api.last_error)() }
        }

        unsafe fn invoke_raw(&mut self, name: &str, args: &[usize]) -> Result<usize> {
            let symbol = CString::new(format!("Everything_{}", name))
                .map_err(|_| EverythingError::Invoke(format!("Invalid entry point name {:?}", name)))?;

            let proc = unsafe { GetProcAddress(self.module, PCSTR::from_raw(symbol.as_ptr().cast())) }
                .ok_or_else(|| EverythingError::MissingSymbol(format!("Everything_{}", name)))?;

            tracing::debug!("Invoking Everything_{} with {} argument(s)", name, args.len());

            // SAFETY: the caller guarantees `args` matches the export's prototype.
            let value = unsafe {
                match *args {
                    [] => std::mem::transmute::<Farproc, Raw0>(proc)(),
                    [a] => std::mem::transmute::<Farproc, Raw1>(proc)(a),
                    [a, b] => std::mem::transmute::<Farproc, Raw2>(proc)(a, b),
                    [a, b, c] => std::mem::transmute::<Farproc, Raw3>(proc)(a, b, c),
                    [a, b, c, d] => std::mem::transmute::<Farproc, Raw4>(proc)(a, b, c, d),
                    _ => {
                        return Err(EverythingError::Invoke(format!(
                            "Everything_{} called with {} arguments (max 4)",
                            name,
                            args.len()
                        )))
                    }
                }
            };

            Ok(value)
        }
    }
}

#[cfg(not(windows))]
mod stub {
    use std::path::Path;

    use crate::sdk::engine::Engine;
    use crate::sdk::flags::DateField;
    use crate::{EverythingError, Result};

    /// Stub for non-Windows platforms - cannot be constructed.
    pub enum LibraryEngine {}

    impl LibraryEngine {
        /// Always fails: the Everything SDK is a Windows DLL.
        pub fn load(path: &Path) -> Result<Self> {
            tracing::warn!("Everything SDK is only available on Windows");
            Err(EverythingError::Library(format!(
                "Cannot load {}: the Everything SDK requires Windows",
                path.display()
            )))
        }

        /// Path the library was loaded from.
        pub fn path(&self) -> &Path {
            match *self {}
        }
    }

    impl Engine for LibraryEngine {
        fn query(&mut self, _wait: bool) -> bool {
            match *self {}
        }

        fn set_search(&mut self, _search: &str) {
            match *self {}
        }

        fn set_regex(&mut self, _enabled: bool) {
            match *self {}
        }

        fn set_match_case(&mut self, _enabled: bool) {
            match *self {}
        }

        fn set_match_whole_word(&mut self, _enabled: bool) {
            match *self {}
        }

        fn set_match_path(&mut self, _enabled: bool) {
            match *self {}
        }

        fn set_max(&mut self, _max: u32) {
            match *self {}
        }

        fn set_offset(&mut self, _offset: u32) {
            match *self {}
        }

        fn set_request_flags(&mut self, _flags: u32) {
            match *self {}
        }

        fn result_list_request_flags(&self) -> u32 {
            match *self {}
        }

        fn num_results(&self) -> u32 {
            match *self {}
        }

        fn result_full_path_name(&self, _index: u32, _buf: &mut [u16]) -> u32 {
            match *self {}
        }

        fn result_size(&self, _index: u32) -> Option<u64> {
            match *self {}
        }

        fn result_date(&self, _field: DateField, _index: u32) -> Option<u64> {
            match *self {}
        }

        fn result_attributes(&self, _index: u32) -> Option<u32> {
            match *self {}
        }

        fn result_run_count(&self, _index: u32) -> Option<u32> {
            match *self {}
        }

        fn is_file_result(&self, _index: u32) -> bool {
            match *self {}
        }

        fn is_folder_result(&self, _index: u32) -> bool {
            match *self {}
        }

        fn last_error(&self) -> u32 {
            match *self {}
        }

        unsafe fn invoke_raw(&mut self, _name: &str, _args: &[usize]) -> Result<usize> {
            match *self {}
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_load_fails_off_windows() {
            let result = LibraryEngine::load(Path::new("Everything64.dll"));
            assert!(matches!(result, Err(EverythingError::Library(_))));
        }
    }
}
