use std::collections::HashSet;
use tokio::sync::Mutex;

/// URLs already claimed for processing.
///
/// `claim` is a single test-and-set under the lock, so two workers racing on
/// the same URL can never both win.
#[derive(Debug, Default)]
pub struct VisitedSet {
    inner: Mutex<HashSet<String>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the caller is the first to claim `url`.
    pub async fn claim(&self, url: &str) -> bool {
        let mut visited = self.inner.lock().await;
        visited.insert(url.to_string())
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}
