//! Client configuration loading.
//!
//! Configuration lives in `config.toml` under the platform config directory
//! (for example `%APPDATA%\voidtools\everything-ipc\config\config.toml`).
//! Every key is optional:
//!
//! ```toml
//! dll_path = 'C:\Program Files\Everything\SDK\DLL\Everything64.dll'
//! request_fields = "FULL_PATH_AND_FILE_NAME | SIZE | DATE_MODIFIED"
//! regex = false
//! match_case = false
//! max_results = 500
//! wait = true
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::sdk::FieldFlags;
use crate::{EverythingError, Result};

/// Environment variable that overrides the SDK DLL location.
pub const DLL_ENV_VAR: &str = "EVERYTHING_SDK_DLL";

/// Client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkConfig {
    /// Explicit path to `Everything32.dll` / `Everything64.dll`
    pub dll_path: Option<PathBuf>,
    /// Fields requested from the engine by default
    pub request_fields: FieldFlags,
    /// Interpret searches as regular expressions
    pub regex: bool,
    /// Case-sensitive matching
    pub match_case: bool,
    /// Maximum number of results (no limit when absent)
    pub max_results: Option<u32>,
    /// Block until results are ready
    pub wait: bool,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            dll_path: None,
            request_fields: FieldFlags::default(),
            regex: false,
            match_case: false,
            max_results: None,
            wait: true,
        }
    }
}

impl SdkConfig {
    /// Location of the per-user configuration file.
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "voidtools", "everything-ipc")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load the per-user configuration, or defaults if there is none.
    ///
    /// A configuration file that exists but cannot be parsed is logged and
    /// ignored.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            tracing::debug!("No configuration at {:?}, using defaults", path);
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => {
                tracing::info!("Loaded configuration from {:?}", path);
                config
            }
            Err(e) => {
                tracing::warn!("Ignoring configuration {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    /// Returns `Io` if the file cannot be read and `Config` if it is not
    /// valid TOML for this structure.
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| {
            EverythingError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// SDK DLL file name for the bitness of this process.
    pub fn default_dll_name() -> String {
        format!("Everything{}.dll", usize::BITS)
    }

    /// Resolve which SDK DLL to load.
    ///
    /// Order: `dll_path` from configuration, then the `EVERYTHING_SDK_DLL`
    /// environment variable, then the SDK's install location under
    /// `%ProgramFiles%\Everything\SDK\DLL`.
    ///
    /// # Errors
    /// Returns `Config` if none of these is set.
    pub fn resolve_dll_path(&self) -> Result<PathBuf> {
        self.resolve_dll_path_with(|key| std::env::var_os(key))
    }

    fn resolve_dll_path_with(&self, env: impl Fn(&str) -> Option<OsString>) -> Result<PathBuf> {
        if let Some(path) = &self.dll_path {
            return Ok(path.clone());
        }
        if let Some(path) = env(DLL_ENV_VAR).filter(|p| !p.is_empty()) {
            return Ok(PathBuf::from(path));
        }
        if let Some(program_files) = env("ProgramFiles").filter(|p| !p.is_empty()) {
            return Ok(PathBuf::from(program_files)
                .join("Everything")
                .join("SDK")
                .join("DLL")
                .join(Self::default_dll_name()));
        }
        Err(EverythingError::Config(format!(
            "Cannot locate the Everything SDK: set dll_path or {}",
            DLL_ENV_VAR
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn no_env(_: &str) -> Option<OsString> {
        None
    }

    #[test]
    fn test_defaults() {
        let config = SdkConfig::default();
        assert_eq!(config.dll_path, None);
        assert_eq!(config.request_fields, FieldFlags::default());
        assert!(config.wait);
        assert!(!config.regex);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
dll_path = 'C:\SDK\Everything64.dll'
request_fields = "SIZE | DATE_CREATED"
regex = true
max_results = 50
"#
        )
        .unwrap();

        let config = SdkConfig::load_from(file.path()).unwrap();
        assert_eq!(config.dll_path, Some(PathBuf::from(r"C:\SDK\Everything64.dll")));
        assert_eq!(config.request_fields, FieldFlags::SIZE | FieldFlags::DATE_CREATED);
        assert!(config.regex);
        assert_eq!(config.max_results, Some(50));
        // Unset keys keep their defaults
        assert!(config.wait);
        assert!(!config.match_case);
    }

    #[test]
    fn test_load_from_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "regex = \"not a bool\"").unwrap();
        assert!(matches!(
            SdkConfig::load_from(file.path()),
            Err(EverythingError::Config(_))
        ));
    }

    #[test]
    fn test_load_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = SdkConfig::load_from(&dir.path().join("missing.toml"));
        assert!(matches!(result, Err(EverythingError::Io(_))));
    }

    #[test]
    fn test_explicit_dll_path_wins() {
        let config = SdkConfig {
            dll_path: Some(PathBuf::from(r"D:\custom.dll")),
            ..Default::default()
        };
        let path = config
            .resolve_dll_path_with(|_| Some(OsString::from(r"E:\env.dll")))
            .unwrap();
        assert_eq!(path, PathBuf::from(r"D:\custom.dll"));
    }

    #[test]
    fn test_env_override() {
        let config = SdkConfig::default();
        let path = config
            .resolve_dll_path_with(|key| (key == DLL_ENV_VAR).then(|| OsString::from(r"E:\env.dll")))
            .unwrap();
        assert_eq!(path, PathBuf::from(r"E:\env.dll"));
    }

    #[test]
    fn test_program_files_fallback() {
        let config = SdkConfig::default();
        let path = config
            .resolve_dll_path_with(|key| (key == "ProgramFiles").then(|| OsString::from("PF")))
            .unwrap();
        let expected = PathBuf::from("PF")
            .join("Everything")
            .join("SDK")
            .join("DLL")
            .join(SdkConfig::default_dll_name());
        assert_eq!(path, expected);
    }

    #[test]
    fn test_unresolvable_dll_path() {
        let config = SdkConfig::default();
        assert!(matches!(
            config.resolve_dll_path_with(no_env),
            Err(EverythingError::Config(_))
        ));
    }

    #[test]
    fn test_default_dll_name_matches_pointer_width() {
        let name = SdkConfig::default_dll_name();
        assert!(name == "Everything64.dll" || name == "Everything32.dll");
    }
}
