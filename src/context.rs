//! Environmental context snapshot and the provider seam that collects it.
//!
//! Collecting the real device/OS/app/network metadata is explicitly out of
//! scope for this crate; what lives here is the wire shape the enricher
//! attaches to every event, plus a trait a host application implements to
//! supply real values, with a non-persistent in-memory default so the
//! pipeline is runnable standalone.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppContext {
    pub name: String,
    pub version: String,
    pub build: String,
    pub namespace: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceContext {
    pub manufacturer: String,
    pub model: String,
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: String,
    #[serde(rename = "advertisingId", skip_serializing_if = "Option::is_none")]
    pub advertising_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryContext {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkContext {
    pub wifi: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsContext {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenContext {
    pub width: i32,
    pub height: i32,
    pub density: f32,
}

/// Snapshot of environmental metadata attached to every enriched event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app: Option<AppContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceContext>,
    pub library: LibraryContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<OsContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen: Option<ScreenContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl Context {
    /// A context carrying only the mandatory `library` field, used when no
    /// richer environment snapshot is available.
    pub fn library_only(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            app: None,
            device: None,
            library: LibraryContext {
                name: name.into(),
                version: version.into(),
            },
            locale: None,
            network: None,
            os: None,
            screen: None,
            timezone: None,
        }
    }
}

/// External collaborator that snapshots environmental metadata, consumed
/// by the enricher. Memoised keyed on advertising id; invalidation is
/// triggered externally (by calling `invalidate`, e.g. on ad-id rotation).
#[async_trait]
pub trait ContextProvider: Send + Sync {
    async fn snapshot(&self, advertising_id: Option<&str>) -> Context;

    /// Drop any memoised snapshot. Default no-op for providers that don't
    /// cache.
    async fn invalidate(&self) {}
}

/// Default in-memory provider: returns a fixed library context and caches
/// it keyed by the advertising id it was built for.
pub struct StaticContextProvider {
    library_name: String,
    library_version: String,
    cache: Mutex<HashMap<Option<String>, Context>>,
}

impl StaticContextProvider {
    pub fn new(library_name: impl Into<String>, library_version: impl Into<String>) -> Self {
        Self {
            library_name: library_name.into(),
            library_version: library_version.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl ContextProvider for StaticContextProvider {
    async fn snapshot(&self, advertising_id: Option<&str>) -> Context {
        let key = advertising_id.map(str::to_string);
        let mut cache = self.cache.lock().await;
        if let Some(ctx) = cache.get(&key) {
            return ctx.clone();
        }
        let mut ctx = Context::library_only(self.library_name.clone(), self.library_version.clone());
        if let Some(id) = advertising_id {
            ctx.device = Some(DeviceContext {
                manufacturer: String::new(),
                model: String::new(),
                name: String::new(),
                device_type: String::new(),
                advertising_id: Some(id.to_string()),
            });
        }
        cache.insert(key, ctx.clone());
        ctx
    }

    async fn invalidate(&self) {
        self.cache.lock().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn caches_snapshot_per_advertising_id() {
        let provider = StaticContextProvider::new("sdk", "1.0.0");
        let a = provider.snapshot(Some("ad-1")).await;
        let b = provider.snapshot(Some("ad-1")).await;
        assert_eq!(a, b);

        let c = provider.snapshot(Some("ad-2")).await;
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn invalidate_clears_cache() {
        let provider = StaticContextProvider::new("sdk", "1.0.0");
        let _ = provider.snapshot(Some("ad-1")).await;
        provider.invalidate().await;
        assert!(provider.cache.lock().await.is_empty());
    }
}
