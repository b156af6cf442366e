use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::error::{FabricNetError, FabricNetResult};

use super::KeyValueStore;

/// In process store, used when fabricnet is embedded and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    mem: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> FabricNetResult<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.mem
            .lock()
            .map_err(|e| FabricNetError::msg(format!("memory store lock poisoned: {}", e)))
    }

    pub fn len(&self) -> usize {
        self.locked().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> FabricNetResult<Option<String>> {
        Ok(self.locked()?.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> FabricNetResult<()> {
        self.locked()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn create(&self, key: &str, value: &str) -> FabricNetResult<()> {
        let mut mem = self.locked()?;
        if mem.contains_key(key) {
            return Err(FabricNetError::AlreadyExists(key.to_string()));
        }
        mem.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<String>) -> FabricNetResult<Option<String>>,
    ) -> FabricNetResult<()> {
        let mut mem = self.locked()?;
        match f(mem.get(key).cloned())? {
            Some(value) => {
                mem.insert(key.to_string(), value);
            }
            None => {
                mem.remove(key);
            }
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> FabricNetResult<bool> {
        Ok(self.locked()?.remove(key).is_some())
    }

    fn list(&self, prefix: &str) -> FabricNetResult<Vec<(String, String)>> {
        Ok(self
            .locked()?
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert!(store.is_empty());

        store.put("net/a", "1").unwrap();
        store.create("net/b", "2").unwrap();
        store.put("pool/a", "3").unwrap();
        assert!(store.create("net/a", "x").unwrap_err().is_already_exists());

        let list = store.list("net/").unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0], ("net/a".to_string(), "1".to_string()));

        assert!(store.delete("net/a").unwrap());
        assert!(!store.delete("net/a").unwrap());
        assert_eq!(store.len(), 2);

        store
            .update("net/b", &mut |v| Ok(v.map(|v| format!("{}0", v))))
            .unwrap();
        assert_eq!(store.get("net/b").unwrap().as_deref(), Some("20"));
        store.update("net/b", &mut |_| Ok(None)).unwrap();
        assert_eq!(store.get("net/b").unwrap(), None);
    }
}
