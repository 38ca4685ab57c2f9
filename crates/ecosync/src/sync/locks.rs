//! Keyed async locks serializing work on one repository.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type RepoKey = (String, String);

/// One async lock per `(organization, repo)`.
///
/// Clones share the same lock table.
#[derive(Debug, Clone, Default)]
pub struct RepoLocks {
    table: Arc<Mutex<HashMap<RepoKey, Arc<AsyncMutex<()>>>>>,
}

impl RepoLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a repository.
    pub async fn lock(&self, organization: &str, repo: &str) -> OwnedMutexGuard<()> {
        let entry = {
            let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(
                table
                    .entry((organization.to_string(), repo.to_string()))
                    .or_default(),
            )
        };
        entry.lock_owned().await
    }

    /// Number of repositories that have been locked at least once.
    pub fn len(&self) -> usize {
        self.table.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn same_key_is_exclusive() {
        let locks = RepoLocks::new();
        let guard = locks.lock("o", "r").await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock("o", "r").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
        assert_eq!(locks.len(), 1);
    }

    #[tokio::test]
    async fn different_keys_do_not_block() {
        let locks = RepoLocks::new();
        let _a = locks.lock("o", "a").await;
        let _b = locks.lock("o", "b").await;
        assert_eq!(locks.len(), 2);
    }
}
