//! Manifest acquisition and pack eligibility.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::Environment;
use crate::error::{BootstrapError, Result};
use crate::models::{Manifest, PackDescriptor};
use crate::transport::{self, RetryError, RetryPolicy, Route, Transport};

/// File name of the manifest under every base.
pub const MANIFEST_FILE: &str = "packs.json";

/// Loads `packs.json` from a base location.
pub struct ManifestResolver {
    transport: Arc<dyn Transport>,
    environment: Environment,
    policy: RetryPolicy,
}

impl ManifestResolver {
    pub fn new(transport: Arc<dyn Transport>, environment: Environment, policy: RetryPolicy) -> Self {
        Self {
            transport,
            environment,
            policy,
        }
    }

    /// Fetch and parse the manifest under `base`.
    ///
    /// The transport policy is checked first; an insecure base fails before
    /// any read or request.
    pub async fn load_manifest(&self, base: &str) -> Result<Manifest> {
        let location = transport::join(base, MANIFEST_FILE);
        let bytes = match transport::route(base, self.environment)? {
            Route::LocalFile => self.read_local(&location).await?,
            Route::Network => self.fetch_remote(&location).await?,
        };
        let manifest = Manifest::parse(&bytes, &location)?;
        tracing::info!(
            location = %location,
            version = manifest.version,
            packs = manifest.packs.len(),
            "Manifest loaded"
        );
        Ok(manifest)
    }

    /// Load the manifest and keep the packs released at `now`.
    ///
    /// Fails with `NoEligiblePacks` when the manifest is valid but nothing is
    /// released yet.
    pub async fn load_eligible(&self, base: &str, now: DateTime<Utc>) -> Result<Vec<PackDescriptor>> {
        let manifest = self.load_manifest(base).await?;
        let eligible = manifest.eligible_packs(now);
        if eligible.is_empty() {
            tracing::info!(packs = manifest.packs.len(), "No pack released yet");
            return Err(BootstrapError::NoEligiblePacks);
        }
        tracing::info!(
            eligible = eligible.len(),
            total = manifest.packs.len(),
            "Selected eligible packs"
        );
        Ok(eligible)
    }

    async fn read_local(&self, location: &str) -> Result<Vec<u8>> {
        tracing::debug!(path = %location, "Reading manifest from disk");
        self.transport
            .read_file(Path::new(location))
            .await
            .map_err(|e| BootstrapError::from_fetch(location, e))
    }

    async fn fetch_remote(&self, url: &str) -> Result<Vec<u8>> {
        let timeout = self.policy.timeout;
        let text = self
            .policy
            .run("manifest", |attempt| {
                tracing::debug!(url, attempt, "Fetching manifest");
                self.transport.get_text(url, timeout)
            })
            .await
            .map_err(|e| match e {
                RetryError::Fatal(e) => BootstrapError::from_fetch(url, e),
                exhausted => BootstrapError::transport(url, exhausted),
            })?;
        Ok(text.into_bytes())
    }
}
