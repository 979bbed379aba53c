//! Numeric contract of the Everything SDK.
//!
//! Field request bits, error codes and limits exactly as the SDK header
//! defines them. These values cross the DLL boundary unchanged.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::EverythingError;

/// Maximum path length, in UTF-16 code units, of a full path result.
pub const EVERYTHING_MAX_PATH: usize = 32767;

bitflags! {
    /// Result data a query asks the engine to compute.
    ///
    /// The engine may populate fewer fields than requested; check
    /// `QuerySession::available_fields` after evaluation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct FieldFlags: u32 {
        const FILE_NAME                           = 0x0000_0001;
        const PATH                                = 0x0000_0002;
        const FULL_PATH_AND_FILE_NAME             = 0x0000_0004;
        const EXTENSION                           = 0x0000_0008;
        const SIZE                                = 0x0000_0010;
        const DATE_CREATED                        = 0x0000_0020;
        const DATE_MODIFIED                       = 0x0000_0040;
        const DATE_ACCESSED                       = 0x0000_0080;
        const ATTRIBUTES                          = 0x0000_0100;
        const FILE_LIST_FILE_NAME                 = 0x0000_0200;
        const RUN_COUNT                           = 0x0000_0400;
        const DATE_RUN                            = 0x0000_0800;
        const DATE_RECENTLY_CHANGED               = 0x0000_1000;
        const HIGHLIGHTED_FILE_NAME               = 0x0000_2000;
        const HIGHLIGHTED_PATH                    = 0x0000_4000;
        const HIGHLIGHTED_FULL_PATH_AND_FILE_NAME = 0x0000_8000;
        const ALL                                 = 0x0000_FFFF;
    }
}

impl Default for FieldFlags {
    fn default() -> Self {
        FieldFlags::FULL_PATH_AND_FILE_NAME | FieldFlags::SIZE | FieldFlags::DATE_MODIFIED
    }
}

/// Last-error values reported by `Everything_GetLastError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum ErrorCode {
    /// The operation completed successfully
    Ok = 0,
    /// Failed to allocate memory for the search query
    Memory = 1,
    /// IPC is not available (Everything is not running)
    Ipc = 2,
    /// Failed to register the search query window class
    RegisterClassEx = 3,
    /// Failed to create the search query window
    CreateWindow = 4,
    /// Failed to create the search query thread
    CreateThread = 5,
    /// Index outside the visible result range
    InvalidIndex = 6,
    /// Invalid call
    InvalidCall = 7,
}

impl ErrorCode {
    /// Raw value as returned by the SDK.
    pub fn as_raw(self) -> u32 {
        self as u32
    }

    /// Human-readable description of the error.
    pub fn description(self) -> &'static str {
        match self {
            ErrorCode::Ok => "the operation completed successfully",
            ErrorCode::Memory => "failed to allocate memory for the search query",
            ErrorCode::Ipc => "IPC is not available; is Everything running?",
            ErrorCode::RegisterClassEx => "failed to register the search query window class",
            ErrorCode::CreateWindow => "failed to create the search query window",
            ErrorCode::CreateThread => "failed to create the search query thread",
            ErrorCode::InvalidIndex => {
                "invalid index; it must be at least 0 and less than the number of visible results"
            }
            ErrorCode::InvalidCall => "invalid call",
        }
    }

    /// Whether the engine itself failed to set up (window class, window or
    /// thread creation). These do not clear up by retrying.
    pub fn is_setup_failure(self) -> bool {
        matches!(
            self,
            ErrorCode::RegisterClassEx | ErrorCode::CreateWindow | ErrorCode::CreateThread
        )
    }
}

impl TryFrom<u32> for ErrorCode {
    type Error = EverythingError;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        Ok(match raw {
            0 => ErrorCode::Ok,
            1 => ErrorCode::Memory,
            2 => ErrorCode::Ipc,
            3 => ErrorCode::RegisterClassEx,
            4 => ErrorCode::CreateWindow,
            5 => ErrorCode::CreateThread,
            6 => ErrorCode::InvalidIndex,
            7 => ErrorCode::InvalidCall,
            other => return Err(EverythingError::UnknownErrorCode(other)),
        })
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({}): {}", self, self.as_raw(), self.description())
    }
}

/// The five FILETIME-valued result fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateField {
    Accessed,
    Created,
    Modified,
    RecentlyChanged,
    Run,
}

impl DateField {
    /// All date fields, in SDK declaration order.
    pub const ALL: [DateField; 5] = [
        DateField::Accessed,
        DateField::Created,
        DateField::Modified,
        DateField::RecentlyChanged,
        DateField::Run,
    ];

    /// Request flag that populates this field.
    pub fn flag(self) -> FieldFlags {
        match self {
            DateField::Accessed => FieldFlags::DATE_ACCESSED,
            DateField::Created => FieldFlags::DATE_CREATED,
            DateField::Modified => FieldFlags::DATE_MODIFIED,
            DateField::RecentlyChanged => FieldFlags::DATE_RECENTLY_CHANGED,
            DateField::Run => FieldFlags::DATE_RUN,
        }
    }

    /// Exported symbol of the per-index getter for this field.
    pub fn entry_point(self) -> &'static str {
        match self {
            DateField::Accessed => "Everything_GetResultDateAccessed",
            DateField::Created => "Everything_GetResultDateCreated",
            DateField::Modified => "Everything_GetResultDateModified",
            DateField::RecentlyChanged => "Everything_GetResultDateRecentlyChanged",
            DateField::Run => "Everything_GetResultDateRun",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitflags::Flags;

    #[test]
    fn test_single_flags_are_powers_of_two() {
        for flag in FieldFlags::FLAGS.iter().filter(|f| f.name() != "ALL") {
            assert!(
                flag.value().bits().is_power_of_two(),
                "{} is not a single bit",
                flag.name()
            );
        }
    }

    #[test]
    fn test_all_is_union_of_single_flags() {
        let union = FieldFlags::FLAGS
            .iter()
            .filter(|f| f.name() != "ALL")
            .fold(FieldFlags::empty(), |acc, f| acc | *f.value());
        assert_eq!(union, FieldFlags::ALL);
        assert_eq!(FieldFlags::ALL.bits(), 0xFFFF);
    }

    #[test]
    fn test_flag_values_match_sdk() {
        assert_eq!(FieldFlags::SIZE.bits(), 0x10);
        assert_eq!(FieldFlags::DATE_RUN.bits(), 0x800);
        assert_eq!(FieldFlags::DATE_RECENTLY_CHANGED.bits(), 0x1000);
        assert_eq!(FieldFlags::HIGHLIGHTED_FULL_PATH_AND_FILE_NAME.bits(), 0x8000);
    }

    #[test]
    fn test_error_code_from_raw() {
        assert_eq!(ErrorCode::try_from(0).unwrap(), ErrorCode::Ok);
        assert_eq!(ErrorCode::try_from(2).unwrap(), ErrorCode::Ipc);
        assert_eq!(ErrorCode::try_from(7).unwrap(), ErrorCode::InvalidCall);
        assert!(matches!(
            ErrorCode::try_from(8),
            Err(EverythingError::UnknownErrorCode(8))
        ));
    }

    #[test]
    fn test_error_code_raw_values() {
        for raw in 0..=7u32 {
            assert_eq!(ErrorCode::try_from(raw).unwrap().as_raw(), raw);
        }
    }

    #[test]
    fn test_setup_failures() {
        assert!(ErrorCode::CreateWindow.is_setup_failure());
        assert!(!ErrorCode::Ipc.is_setup_failure());
        assert!(!ErrorCode::InvalidIndex.is_setup_failure());
    }

    #[test]
    fn test_date_field_flags_are_distinct() {
        let union = DateField::ALL
            .iter()
            .fold(FieldFlags::empty(), |acc, field| acc | field.flag());
        assert_eq!(union.bits().count_ones(), 5);
    }

    #[test]
    fn test_date_entry_points_follow_one_pattern() {
        for field in DateField::ALL {
            assert!(field.entry_point().starts_with("Everything_GetResultDate"));
        }
        assert_eq!(
            DateField::Modified.entry_point(),
            "Everything_GetResultDateModified"
        );
    }
}
