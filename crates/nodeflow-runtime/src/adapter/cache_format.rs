//! Persisted cache formats.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use derive_more::Debug;
use nodeflow_core::{BoxedError, Value};

/// Format of nodes memoized through `cache_all` without a `cache` tag.
pub const DEFAULT_CACHE_FORMAT: &str = "json";

/// Writes a node value to a cache file.
pub type CacheWriter =
    Arc<dyn Fn(&Value, &Path) -> std::result::Result<(), BoxedError> + Send + Sync>;

/// Reads a node value back from a cache file.
pub type CacheReader = Arc<dyn Fn(&Path) -> std::result::Result<Value, BoxedError> + Send + Sync>;

/// A writer and reader pair registered under a `cache` tag value.
#[derive(Debug, Clone)]
pub struct CacheFormat {
    #[debug(skip)]
    pub(super) writer: CacheWriter,
    #[debug(skip)]
    pub(super) reader: CacheReader,
}

impl CacheFormat {
    /// Creates a format from its writer and reader.
    pub fn new<W, R>(writer: W, reader: R) -> Self
    where
        W: Fn(&Value, &Path) -> std::result::Result<(), BoxedError> + Send + Sync + 'static,
        R: Fn(&Path) -> std::result::Result<Value, BoxedError> + Send + Sync + 'static,
    {
        Self {
            writer: Arc::new(writer),
            reader: Arc::new(reader),
        }
    }

    /// JSON documents written with `serde_json`.
    pub fn json() -> Self {
        Self::new(write_json, read_json)
    }
}

fn write_json(value: &Value, path: &Path) -> std::result::Result<(), BoxedError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

fn read_json(path: &Path) -> std::result::Result<Value, BoxedError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn json_files_hold_one_value() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("a.json");
        let format = CacheFormat::json();

        (format.writer)(&json!({"rows": [1, 2]}), path.as_path()).unwrap();
        assert_eq!((format.reader)(path.as_path()).unwrap(), json!({"rows": [1, 2]}));
    }

    #[test]
    fn missing_files_fail_to_read() {
        let dir = tempfile::TempDir::new().unwrap();
        let format = CacheFormat::json();
        assert!((format.reader)(dir.path().join("absent.json").as_path()).is_err());
    }
}
