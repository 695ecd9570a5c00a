use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Maps temp file names to the session that owns them.
///
/// Entries are cleared to an empty id rather than removed when a session
/// ends, so a late watch event for a just-closed file resolves to "not live"
/// instead of racing a map deletion.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    files: RwLock<HashMap<String, String>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `filename` as owned by session `id`.
    pub async fn register(&self, filename: &str, id: &str) {
        debug!(file = %filename, session = %id, "registering temp file");
        self.files
            .write()
            .await
            .insert(filename.to_string(), id.to_string());
    }

    /// The owning session id, if the file is live.
    pub async fn lookup(&self, filename: &str) -> Option<String> {
        self.files
            .read()
            .await
            .get(filename)
            .filter(|id| !id.is_empty())
            .cloned()
    }

    /// Mark `filename` as no longer owned by any session.
    pub async fn clear(&self, filename: &str) {
        debug!(file = %filename, "clearing temp file");
        if let Some(id) = self.files.write().await.get_mut(filename) {
            id.clear();
        }
    }

    /// Whether `filename` was ever registered, live or cleared.
    #[cfg(test)]
    pub(crate) async fn is_known(&self, filename: &str) -> bool {
        self.files.read().await.contains_key(filename)
    }

    /// Number of live entries.
    #[cfg(test)]
    pub(crate) async fn live_count(&self) -> usize {
        self.files
            .read()
            .await
            .values()
            .filter(|id| !id.is_empty())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_then_lookup() {
        let registry = SessionRegistry::new();
        registry.register("a-1.txt", "tab_1").await;
        assert_eq!(registry.lookup("a-1.txt").await.as_deref(), Some("tab_1"));
    }

    #[tokio::test]
    async fn unknown_file_has_no_owner() {
        let registry = SessionRegistry::new();
        assert!(registry.lookup("nope.txt").await.is_none());
        assert!(!registry.is_known("nope.txt").await);
    }

    #[tokio::test]
    async fn cleared_entry_stays_known_but_not_live() {
        let registry = SessionRegistry::new();
        registry.register("a-1.txt", "tab_1").await;
        registry.clear("a-1.txt").await;

        assert!(registry.lookup("a-1.txt").await.is_none());
        assert!(registry.is_known("a-1.txt").await);
        assert_eq!(registry.live_count().await, 0);
    }

    #[tokio::test]
    async fn clearing_unknown_file_does_not_create_entry() {
        let registry = SessionRegistry::new();
        registry.clear("ghost.txt").await;
        assert!(!registry.is_known("ghost.txt").await);
    }

    #[tokio::test]
    async fn concurrent_registrations() {
        let registry = std::sync::Arc::new(SessionRegistry::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry
                    .register(&format!("f{i}.txt"), &format!("s{i}"))
                    .await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(registry.live_count().await, 16);
        assert_eq!(registry.lookup("f7.txt").await.as_deref(), Some("s7"));
    }
}
