use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CheckError;

/// Per-file mutex map. `compile --out-dir` writes from rayon workers, and two
/// inputs with the same stem target the same output path.
static FILE_LOCKS: LazyLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Write bytes to `path` through a `.tmp` sibling and a rename, so readers
/// never observe a half-written file.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<(), CheckError> {
    let lock = FILE_LOCKS
        .lock()
        .entry(path.to_path_buf())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone();
    let guard = lock.lock();
    let result = write_and_rename(path, data);

    // Entries are only cloned and released under the map lock, so a count of
    // two (map and this call) means no other writer holds the path.
    let mut locks = FILE_LOCKS.lock();
    drop(guard);
    if Arc::strong_count(&lock) == 2 {
        locks.remove(path);
    }
    drop(lock);
    drop(locks);
    result
}

fn write_and_rename(path: &Path, data: &[u8]) -> Result<(), CheckError> {
    let mut tmp_name = OsString::from(path.file_name().unwrap_or_default());
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(&tmp_name);

    let mut file = fs::File::create(&tmp_path)?;
    file.write_all(data)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp_path, path)?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), CheckError> {
    let json = serde_json::to_string_pretty(value)?;
    atomic_write(path, json.as_bytes())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CheckError> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_replaces_contents() {
        let dir = std::env::temp_dir().join("fluxcheck_test_atomic_write");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("out.flux");

        atomic_write(&path, b"first").unwrap();
        atomic_write(&path, b"second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        assert!(!dir.join("out.flux.tmp").exists());
        assert!(!FILE_LOCKS.lock().contains_key(&path));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn concurrent_writes_release_their_locks() {
        let dir = std::env::temp_dir().join("fluxcheck_test_atomic_write_concurrent");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("shared.flux");

        std::thread::scope(|scope| {
            for i in 0..8 {
                let path = &path;
                scope.spawn(move || atomic_write(path, format!("run {i}").as_bytes()).unwrap());
            }
        });
        assert!(fs::read_to_string(&path).unwrap().starts_with("run "));
        assert!(!FILE_LOCKS.lock().contains_key(&path));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn read_json_reports_malformed_input() {
        let dir = std::env::temp_dir().join("fluxcheck_test_read_json");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.json");
        fs::write(&path, "{not json").unwrap();

        let err = read_json::<serde_json::Value>(&path).unwrap_err();
        assert_eq!(err.code(), "json");

        let err = read_json::<serde_json::Value>(&dir.join("missing.json")).unwrap_err();
        assert_eq!(err.code(), "io");

        let _ = fs::remove_dir_all(&dir);
    }
}
