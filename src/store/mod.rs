//! Keyed storage shared by every fabricnet process on a host.
//!
//! Values are opaque strings, typed records are stored as JSON through the
//! helpers below. `put` is last write wins, `create` and `update` are
//! atomic against every other writer of the same store.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{FabricNetError, FabricNetResult};

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

pub trait KeyValueStore: Send + Sync {
    /// get the value of key, None when the key does not exist
    fn get(&self, key: &str) -> FabricNetResult<Option<String>>;
    /// set key to value, replacing any previous value
    fn put(&self, key: &str, value: &str) -> FabricNetResult<()>;
    /// set key to value, fails with AlreadyExists if the key exists
    fn create(&self, key: &str, value: &str) -> FabricNetResult<()>;
    /// Read-modify-write of a single key. `f` gets the current value and
    /// returns the new one, None removes the key. No other write to the store
    /// happens between the read and the write. An error from `f` aborts the
    /// update and leaves the key unchanged.
    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<String>) -> FabricNetResult<Option<String>>,
    ) -> FabricNetResult<()>;
    /// remove the key, returns false if it did not exist
    fn delete(&self, key: &str) -> FabricNetResult<bool>;
    /// all keys and values where the key starts with prefix, ordered by key
    fn list(&self, prefix: &str) -> FabricNetResult<Vec<(String, String)>>;
}

fn decode<T: DeserializeOwned>(key: &str, value: &str) -> FabricNetResult<T> {
    serde_json::from_str(value)
        .map_err(|e| FabricNetError::wrap(format!("decode {}", key), e.into()))
}

pub fn get_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> FabricNetResult<Option<T>> {
    match store.get(key)? {
        Some(value) => Ok(Some(decode(key, &value)?)),
        None => Ok(None),
    }
}

pub fn put_json<T: Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    record: &T,
) -> FabricNetResult<()> {
    store.put(key, &serde_json::to_string(record)?)
}

pub fn create_json<T: Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    record: &T,
) -> FabricNetResult<()> {
    store.create(key, &serde_json::to_string(record)?)
}

/// Typed `update`, the record is decoded before and encoded after `f`.
pub fn update_json<T, F>(store: &dyn KeyValueStore, key: &str, mut f: F) -> FabricNetResult<()>
where
    T: Serialize + DeserializeOwned,
    F: FnMut(Option<T>) -> FabricNetResult<Option<T>>,
{
    store.update(key, &mut |value| {
        let current = match value {
            Some(value) => Some(decode(key, &value)?),
            None => None,
        };
        match f(current)? {
            Some(record) => Ok(Some(serde_json::to_string(&record)?)),
            None => Ok(None),
        }
    })
}

pub fn list_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    prefix: &str,
) -> FabricNetResult<Vec<T>> {
    let mut records = Vec::new();
    for (key, value) in store.list(prefix)? {
        records.push(decode(&key, &value)?);
    }
    Ok(records)
}
