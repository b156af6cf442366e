use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

use fs2::FileExt;
use log::debug;

use crate::{
    error::{FabricNetError, FabricNetResult},
    wrap,
};

use super::KeyValueStore;

/// File layout looks like this
/// $config/
///        - store.lock -> held while writing
///        - $encoded_key -> value of the key
///        - .$encoded_key.tmp -> value while it is written

const LOCK_FILE: &str = "store.lock";
const TMP_SUFFIX: &str = ".tmp";

/// macro to quickly wrap the IO error with useful context
/// First argument is the function, second the path, third the extra error message.
/// The full error is "$msg $path: $org_error"
macro_rules! fs_err {
    ($func:expr, $path:expr, $msg:expr) => {
        $func($path).map_err(|err| {
            FabricNetError::wrap(format!("{} {:?}", $msg, $path.display()), err.into())
        })
    };
}

macro_rules! ignore_enoent {
    ($call:expr, $action:expr) => {
        match $call {
            Ok(ok) => Ok(ok),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => $action,
            Err(e) => Err(e),
        }
    };
}

/// Keys are stored one file per key in a single directory, the key is
/// escaped so it forms a valid file name.
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for (i, c) in key.chars().enumerate() {
        match c {
            '%' => out.push_str("%25"),
            '/' => out.push_str("%2F"),
            // leading dots are reserved for temporary files
            '.' if i == 0 => out.push_str("%2E"),
            c => out.push(c),
        }
    }
    out
}

fn decode_key(name: &str) -> String {
    name.replace("%2F", "/")
        .replace("%2E", ".")
        .replace("%25", "%")
}

pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> FabricNetResult<FileStore> {
        let dir = dir.as_ref().to_path_buf();
        fs_err!(fs::create_dir_all, &dir, "create store dir")?;
        Ok(FileStore { dir })
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(encode_key(key))
    }

    fn tmp_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!(".{}{}", encode_key(key), TMP_SUFFIX))
    }

    /// The file is returned locked, it does not need
    /// to be unlocked as rust does it automatically on drop.
    fn lock(&self) -> FabricNetResult<File> {
        let path = self.dir.join(LOCK_FILE);
        let lock_file = fs_err!(File::create, &path, "create store lock file")?;
        wrap!(lock_file.lock_exclusive(), "lock store lock file")?;
        Ok(lock_file)
    }

    /// Write the value to a temporary file first and rename it into place so
    /// readers never see a partially written value.
    fn write_atomic(&self, key: &str, value: &str) -> FabricNetResult<()> {
        let tmp = self.tmp_path(key);
        let mut f = fs_err!(File::create, &tmp, "create temporary file")?;
        wrap!(f.write_all(value.as_bytes()), format!("write {:?}", tmp.display()))?;
        wrap!(f.sync_all(), format!("sync {:?}", tmp.display()))?;
        let path = self.key_path(key);
        wrap!(
            fs::rename(&tmp, &path),
            format!("rename {:?} to {:?}", tmp.display(), path.display())
        )
    }

    fn read(&self, key: &str) -> FabricNetResult<Option<String>> {
        let path = self.key_path(key);
        let value = wrap!(
            ignore_enoent!(fs::read_to_string(&path), return Ok(None)),
            format!("read {:?}", path.display())
        )?;
        Ok(Some(value))
    }

    fn remove(&self, key: &str) -> FabricNetResult<bool> {
        let path = self.key_path(key);
        match fs::remove_file(&path) {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(FabricNetError::wrap(
                format!("remove {:?}", path.display()),
                err.into(),
            )),
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> FabricNetResult<Option<String>> {
        self.read(key)
    }

    fn put(&self, key: &str, value: &str) -> FabricNetResult<()> {
        let _lock = self.lock()?;
        debug!("store put {}", key);
        self.write_atomic(key, value)
    }

    fn create(&self, key: &str, value: &str) -> FabricNetResult<()> {
        let _lock = self.lock()?;
        if self.key_path(key).exists() {
            return Err(FabricNetError::AlreadyExists(key.to_string()));
        }
        debug!("store create {}", key);
        self.write_atomic(key, value)
    }

    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<String>) -> FabricNetResult<Option<String>>,
    ) -> FabricNetResult<()> {
        // other processes block on the lock file until the new value is in place
        let _lock = self.lock()?;
        match f(self.read(key)?)? {
            Some(value) => self.write_atomic(key, &value),
            None => self.remove(key).map(|_| ()),
        }
    }

    fn delete(&self, key: &str) -> FabricNetResult<bool> {
        let _lock = self.lock()?;
        let removed = self.remove(key)?;
        debug!("store delete {} (existed: {})", key, removed);
        Ok(removed)
    }

    fn list(&self, prefix: &str) -> FabricNetResult<Vec<(String, String)>> {
        let mut entries = Vec::new();
        for entry in fs_err!(fs::read_dir, &self.dir, "read store dir")? {
            let entry = ignore_enoent!(entry, continue)?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name == LOCK_FILE || name.starts_with('.') {
                continue;
            }
            let key = decode_key(&name);
            if !key.starts_with(prefix) {
                continue;
            }
            let path = entry.path();
            // the key may have been removed since we read the directory
            let value = wrap!(
                ignore_enoent!(fs::read_to_string(&path), continue),
                format!("read {:?}", path.display())
            )?;
            entries.push((key, value));
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }
}
