//! Identity store seam consumed by the enricher.
//!
//! Persistent storage of anonymous/user/group/advertising IDs is out of
//! scope for this crate; the trait below is the interface the enricher
//! reads through, with a non-persistent in-memory default so the
//! pipeline can run standalone.

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Read-only (from the enricher's point of view) identity source.
/// Implementations are expected to be thread-safe and cheap to clone or
/// share via `Arc`.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Guaranteed non-empty; generated and persisted on first access by
    /// implementations backed by durable storage.
    async fn anonymous_id(&self) -> String;
    async fn user_id(&self) -> Option<String>;
    async fn group_id(&self) -> Option<String>;
    async fn advertising_id(&self) -> Option<String>;
}

/// In-memory identity store. `anonymous_id` is generated once, at
/// construction, and never regenerated — matching the durable store's
/// "generated once, then persisted" contract without actually persisting
/// anything to disk.
pub struct InMemoryIdentityStore {
    anonymous_id: String,
    user_id: RwLock<Option<String>>,
    group_id: RwLock<Option<String>>,
    advertising_id: RwLock<Option<String>>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self {
            anonymous_id: Uuid::new_v4().to_string(),
            user_id: RwLock::new(None),
            group_id: RwLock::new(None),
            advertising_id: RwLock::new(None),
        }
    }

    pub async fn set_user_id(&self, id: Option<String>) {
        *self.user_id.write().await = id;
    }

    pub async fn set_group_id(&self, id: Option<String>) {
        *self.group_id.write().await = id;
    }

    pub async fn set_advertising_id(&self, id: Option<String>) {
        *self.advertising_id.write().await = id;
    }
}

impl Default for InMemoryIdentityStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn anonymous_id(&self) -> String {
        self.anonymous_id.clone()
    }

    async fn user_id(&self) -> Option<String> {
        self.user_id.read().await.clone()
    }

    async fn group_id(&self) -> Option<String> {
        self.group_id.read().await.clone()
    }

    async fn advertising_id(&self) -> Option<String> {
        self.advertising_id.read().await.clone()
    }
}
