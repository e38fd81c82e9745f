use std::fs;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::{Result, StoreError};

/// Reads an optional JSON document. Missing, empty or unparseable files yield
/// `None`; parse failures are logged.
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to read json file");
            return None;
        }
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "ignoring unparseable json file");
            None
        }
    }
}

/// Writes `contents` to a sibling `*.tmp` file and renames it into place.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| StoreError::io(parent, err))?;
    }
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = Path::new(&tmp_name);
    {
        let mut file = fs::File::create(tmp).map_err(|err| StoreError::io(tmp, err))?;
        file.write_all(contents)
            .map_err(|err| StoreError::io(tmp, err))?;
        file.sync_all().map_err(|err| StoreError::io(tmp, err))?;
    }
    fs::rename(tmp, path).map_err(|err| {
        let _ = fs::remove_file(tmp);
        StoreError::io(path, err)
    })
}

pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut body = serde_json::to_vec_pretty(value)?;
    body.push(b'\n');
    write_atomic(path, &body)
}
