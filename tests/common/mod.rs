//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use content_packs::transport::{FetchError, Transport};

/// Serves canned URL bodies, failing the first N requests per URL, and
/// counts every call. Local reads go to the real filesystem.
#[derive(Default)]
pub struct ScriptedTransport {
    bodies: Mutex<HashMap<String, String>>,
    failures: Mutex<HashMap<String, usize>>,
    network_calls: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, url: &str, body: &str) {
        self.bodies
            .lock()
            .unwrap()
            .insert(url.to_string(), body.to_string());
    }

    pub fn fail_first(&self, url: &str, times: usize) {
        self.failures.lock().unwrap().insert(url.to_string(), times);
    }

    pub fn network_calls(&self) -> usize {
        self.network_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    async fn read_file(&self, path: &Path) -> Result<Vec<u8>, FetchError> {
        std::fs::read(path).map_err(|_| FetchError::NotFound(path.display().to_string()))
    }

    async fn get_text(&self, url: &str, _timeout: Duration) -> Result<String, FetchError> {
        self.network_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(remaining) = self.failures.lock().unwrap().get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(FetchError::Unavailable("connection reset".into()));
            }
        }
        self.bodies
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Unavailable(format!("no route to {}", url)))
    }
}

/// Fixed "now" used across specs: 2025-06-15T12:00:00Z.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
}

/// A manifest body with one pack released the day before [`now`] and one
/// released the following year.
pub fn two_pack_manifest() -> String {
    r#"{
        "version": 3,
        "packs": [
            {"id": "core", "title": "Core", "releaseUtc": "2025-06-14T12:00:00Z", "catalogFile": "catalog_core.json"},
            {"id": "winter", "title": "Winter", "releaseUtc": "2026-06-15T12:00:00Z", "catalogFile": "catalog_winter.json"}
        ]
    }"#
    .to_string()
}
