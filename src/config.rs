//! Document-level configuration.

use crate::error::{Error, Result};
use crate::parser_config::ParserOptions;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Environment variable holding extra resource directories, in the
/// platform's path-list syntax (`:` on Unix, `;` on Windows).
pub const RESOURCE_PATH_ENV: &str = "PDF_FORMS_RESOURCE_PATH";

/// Configuration used when loading and saving a [`crate::document::PdfDocument`].
///
/// # Example
///
/// ```
/// use pdf_forms::config::DocumentConfig;
///
/// let config = DocumentConfig::new()
///     .with_resource_dir("assets/forms")
///     .with_pad_shorter_values(false);
/// assert!(!config.pad_shorter_values);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Parser limits and recovery mode.
    pub parser: ParserOptions,

    /// Directories searched by `PdfDocument::from_resource`, in order.
    pub resource_dirs: Vec<PathBuf>,

    /// Pad a spliced value with spaces when it is shorter than the text it
    /// replaces, so byte offsets after it stay valid.
    pub pad_shorter_values: bool,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentConfig {
    /// Create new configuration with defaults.
    ///
    /// The resource search path is the current directory followed by every
    /// entry of `PDF_FORMS_RESOURCE_PATH`.
    pub fn new() -> Self {
        Self {
            parser: ParserOptions::default(),
            resource_dirs: resource_dirs_from(std::env::var_os(RESOURCE_PATH_ENV).as_deref()),
            pad_shorter_values: true,
        }
    }

    /// Replace the parser options.
    pub fn with_parser_options(mut self, parser: ParserOptions) -> Self {
        self.parser = parser;
        self
    }

    /// Append a resource directory to the search path.
    pub fn with_resource_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.resource_dirs.push(dir.into());
        self
    }

    /// Enable or disable padding of shorter spliced values.
    pub fn with_pad_shorter_values(mut self, enable: bool) -> Self {
        self.pad_shorter_values = enable;
        self
    }

    /// Parse configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Find a bundled resource by name on the search path.
    ///
    /// Tries `name` as given, then with a `.pdf` extension, in every directory.
    pub fn locate_resource(&self, name: &str) -> Result<PathBuf> {
        for dir in &self.resource_dirs {
            for candidate in [dir.join(name), dir.join(format!("{}.pdf", name))] {
                if candidate.is_file() {
                    log::debug!("Resource '{}' found at {}", name, candidate.display());
                    return Ok(candidate);
                }
            }
        }
        Err(Error::ResourceNotFound(name.to_string()))
    }

    fn validate(&self) -> Result<()> {
        if self.parser.max_recursion_depth == 0 {
            return Err(Error::Config("parser.max_recursion_depth must be at least 1".to_string()));
        }
        if self.parser.max_nesting == 0 {
            return Err(Error::Config("parser.max_nesting must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// The current directory followed by every non-empty entry of `extra`.
fn resource_dirs_from(extra: Option<&OsStr>) -> Vec<PathBuf> {
    let mut dirs = vec![PathBuf::from(".")];
    if let Some(extra) = extra {
        dirs.extend(std::env::split_paths(extra).filter(|p| !p.as_os_str().is_empty()));
    }
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DocumentConfig::new();
        assert!(config.pad_shorter_values);
        assert_eq!(config.resource_dirs.first(), Some(&PathBuf::from(".")));
    }

    #[test]
    fn test_resource_path_uses_platform_separator() {
        let joined = std::env::join_paths(["first/forms", "", "second"]).unwrap();
        assert_eq!(
            resource_dirs_from(Some(joined.as_os_str())),
            vec![PathBuf::from("."), PathBuf::from("first/forms"), PathBuf::from("second")]
        );
        assert_eq!(resource_dirs_from(None), vec![PathBuf::from(".")]);
    }

    #[test]
    fn test_from_json_partial() {
        let config = DocumentConfig::from_json_str(r#"{"pad_shorter_values": false}"#).unwrap();
        assert!(!config.pad_shorter_values);
        assert_eq!(config.parser, ParserOptions::default());
    }

    #[test]
    fn test_from_json_rejects_zero_depth() {
        let err = DocumentConfig::from_json_str(r#"{"parser": {"max_recursion_depth": 0}}"#)
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_locate_resource_with_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("invoice.pdf"), b"%PDF-1.4\n").unwrap();
        let config = DocumentConfig::new().with_resource_dir(dir.path());

        let found = config.locate_resource("invoice").unwrap();
        assert_eq!(found, dir.path().join("invoice.pdf"));
        assert!(matches!(
            config.locate_resource("missing"),
            Err(Error::ResourceNotFound(_))
        ));
    }
}
