use super::{KeyValueStore, StoreError};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Default)]
struct Inner {
    values: HashMap<String, String>,
    sets: HashMap<String, HashSet<String>>,
    expiry: HashMap<String, Instant>,
}

impl Inner {
    /// Lazily drop `key` if its deadline has passed.
    fn evict_if_expired(&mut self, key: &str) {
        let expired = self
            .expiry
            .get(key)
            .map(|deadline| *deadline <= Instant::now())
            .unwrap_or(false);

        if expired {
            self.values.remove(key);
            self.sets.remove(key);
            self.expiry.remove(key);
        }
    }

    fn evict_all_expired(&mut self) {
        let now = Instant::now();
        let expired: Vec<String> = self
            .expiry
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();

        for key in expired {
            self.values.remove(&key);
            self.sets.remove(&key);
            self.expiry.remove(&key);
        }
    }
}

/// Process-local store with per-key expiry.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(pattern: &str, key: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => key == pattern,
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.evict_if_expired(key);
        Ok(inner.values.get(key).cloned())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.values.insert(key.to_string(), value.to_string());
        inner.expiry.insert(key.to_string(), Instant::now() + ttl);
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.values.remove(key);
        inner.sets.remove(key);
        inner.expiry.remove(key);
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.evict_if_expired(key);
        if inner.values.contains_key(key) || inner.sets.contains_key(key) {
            inner.expiry.insert(key.to_string(), Instant::now() + ttl);
        }
        Ok(())
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.evict_if_expired(key);
        inner
            .sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.evict_if_expired(key);
        let now_empty = match inner.sets.get_mut(key) {
            Some(set) => {
                set.remove(member);
                set.is_empty()
            }
            None => false,
        };
        // Redis drops empty sets
        if now_empty {
            inner.sets.remove(key);
            inner.expiry.remove(key);
        }
        Ok(())
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.evict_if_expired(key);
        Ok(inner
            .sets
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.evict_all_expired();
        Ok(inner
            .values
            .keys()
            .chain(inner.sets.keys())
            .filter(|key| matches(pattern, key))
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn values_expire_after_ttl() {
        let store = MemoryStore::new();
        store
            .set_ex("stream:a", "{}", Duration::from_millis(30))
            .await
            .unwrap();
        assert_eq!(store.get("stream:a").await.unwrap().as_deref(), Some("{}"));

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(store.get("stream:a").await.unwrap(), None);
        assert!(store.scan("stream:*").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn expire_refreshes_deadline() {
        let store = MemoryStore::new();
        store
            .set_ex("k", "v", Duration::from_millis(40))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(25)).await;
        store.expire("k", Duration::from_secs(5)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn sets_add_remove_members() {
        let store = MemoryStore::new();
        store.set_add("user_streams:u1", "a").await.unwrap();
        store.set_add("user_streams:u1", "b").await.unwrap();
        store.set_remove("user_streams:u1", "a").await.unwrap();

        assert_eq!(
            store.set_members("user_streams:u1").await.unwrap(),
            vec!["b".to_string()]
        );

        store.set_remove("user_streams:u1", "b").await.unwrap();
        assert!(store.scan("user_streams:*").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn scan_matches_prefix_only() {
        let store = MemoryStore::new();
        let ttl = Duration::from_secs(60);
        store.set_ex("stream:1", "x", ttl).await.unwrap();
        store.set_ex("stream:2", "x", ttl).await.unwrap();
        store.set_ex("usage:u1:2026-10", "x", ttl).await.unwrap();

        let mut keys = store.scan("stream:*").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["stream:1".to_string(), "stream:2".to_string()]);
    }
}
