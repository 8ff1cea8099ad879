//! Output export - the downloadable-file counterpart of the output pane

use crate::error::{self, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// A piece of output ready to be written somewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub content_type: &'static str,
    pub body: String,
}

impl ExportArtifact {
    pub const DEFAULT_FILE_NAME: &'static str = "terraform_output.tf";
    pub const CONTENT_TYPE: &'static str = "text/plain";

    pub fn new(body: impl Into<String>) -> Self {
        Self {
            file_name: Self::DEFAULT_FILE_NAME.to_string(),
            content_type: Self::CONTENT_TYPE,
            body: body.into(),
        }
    }

    /// Write the artifact. A directory target gets the artifact's file name
    /// appended; anything else is used as the file path.
    pub fn write_to(&self, target: impl AsRef<Path>) -> Result<PathBuf> {
        let target = target.as_ref();
        let path = if target.is_dir() {
            target.join(&self.file_name)
        } else {
            target.to_path_buf()
        };

        std::fs::write(&path, &self.body).map_err(|e| {
            error::io_error(path.display().to_string(), e).with_operation("export::write_to")
        })?;
        info!(path = %path.display(), bytes = self.body.len(), "output exported");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let artifact = ExportArtifact::new("resource {}");
        assert_eq!(artifact.file_name, "terraform_output.tf");
        assert_eq!(artifact.content_type, "text/plain");
    }

    #[test]
    fn test_write_into_directory_uses_default_name() {
        let dir = TempDir::new().unwrap();
        let path = ExportArtifact::new("resource {}").write_to(dir.path()).unwrap();

        assert_eq!(path, dir.path().join("terraform_output.tf"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "resource {}");
    }

    #[test]
    fn test_write_to_explicit_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("report.md");
        let path = ExportArtifact::new("# Report").write_to(&target).unwrap();
        assert_eq!(path, target);
        assert_eq!(std::fs::read_to_string(target).unwrap(), "# Report");
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let err = ExportArtifact::new("x")
            .write_to(dir.path().join("missing/out.tf"))
            .unwrap_err();
        assert_eq!(err.operation(), "export::write_to");
    }
}
