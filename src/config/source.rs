// Copyright 2026 The Delta Relay Project
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use super::error::ConfigError;

/// Where the relay's YAML config comes from.
pub trait ConfigSource {
    fn load(&self) -> Result<String, ConfigError>;
}

/// A `delta-relay.yaml` on disk.
pub struct FileSource {
    pub path: PathBuf,
}

impl ConfigSource for FileSource {
    fn load(&self) -> Result<String, ConfigError> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| ConfigError::Read {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!(path = %self.path.display(), bytes = content.len(), "config file read");
        Ok(content)
    }
}

/// In-memory config, for tests and embedding.
pub struct StringSource {
    pub content: String,
}

impl ConfigSource for StringSource {
    fn load(&self) -> Result<String, ConfigError> {
        Ok(self.content.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn file_source_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "delta_relay: v1").unwrap();
        let source = FileSource {
            path: file.path().to_path_buf(),
        };
        assert_eq!(source.load().unwrap(), "delta_relay: v1");
    }

    #[test]
    fn missing_file_error_names_path() {
        let source = FileSource {
            path: PathBuf::from("/nonexistent/delta-relay.yaml"),
        };
        let err = source.load().unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/delta-relay.yaml"));
    }
}
