use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BootstrapError, Result};

/// Extension catalogs carry at design time.
pub const DESIGN_CATALOG_EXT: &str = ".json";
/// Extension the build pipeline compiles catalogs to.
pub const RUNTIME_CATALOG_EXT: &str = ".bin";

/// One releasable pack as listed in `packs.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PackDescriptor {
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// ISO-8601 release instant; read as UTC when it carries no offset.
    #[serde(rename = "releaseUtc")]
    pub release_timestamp: String,
    pub catalog_file: String,
}

impl PackDescriptor {
    /// The parsed release instant, or `None` if the timestamp is unreadable.
    pub fn release_at(&self) -> Option<DateTime<Utc>> {
        parse_release_timestamp(&self.release_timestamp)
    }

    /// Released at or before `now`. Unreadable timestamps never release.
    pub fn is_released(&self, now: DateTime<Utc>) -> bool {
        self.release_at().is_some_and(|at| at <= now)
    }

    /// Catalog file name with the design-time extension swapped for the
    /// runtime one.
    pub fn runtime_catalog_file(&self) -> String {
        runtime_catalog_name(&self.catalog_file)
    }
}

/// `packs.json`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Manifest {
    pub version: i64,
    pub packs: Vec<PackDescriptor>,
}

#[derive(Deserialize)]
struct RawManifest {
    #[serde(default)]
    version: i64,
    #[serde(default)]
    packs: Option<Vec<PackDescriptor>>,
}

impl Manifest {
    /// Parse manifest bytes read from `location`.
    ///
    /// Fails with `Format` when the JSON does not have the manifest shape and
    /// with `EmptyManifest` when `packs` is missing, null or empty.
    pub fn parse(bytes: &[u8], location: &str) -> Result<Self> {
        let raw: RawManifest =
            serde_json::from_slice(bytes).map_err(|e| BootstrapError::format(location, e))?;
        match raw.packs {
            Some(packs) if !packs.is_empty() => Ok(Self {
                version: raw.version,
                packs,
            }),
            _ => Err(BootstrapError::EmptyManifest {
                location: location.to_string(),
            }),
        }
    }

    /// Packs released at `now`, in manifest order.
    pub fn eligible_packs(&self, now: DateTime<Utc>) -> Vec<PackDescriptor> {
        eligible_packs(&self.packs, now)
    }
}

/// The subsequence of `packs` whose release instant is at or before `now`.
pub fn eligible_packs(packs: &[PackDescriptor], now: DateTime<Utc>) -> Vec<PackDescriptor> {
    packs
        .iter()
        .filter(|pack| {
            if pack.release_at().is_none() {
                tracing::warn!(
                    pack = %pack.id,
                    release = %pack.release_timestamp,
                    "Unreadable release timestamp, pack skipped"
                );
            }
            pack.is_released(now)
        })
        .cloned()
        .collect()
}

pub fn runtime_catalog_name(file: &str) -> String {
    let split = file.len().saturating_sub(DESIGN_CATALOG_EXT.len());
    match (file.get(..split), file.get(split..)) {
        (Some(stem), Some(ext)) if ext.eq_ignore_ascii_case(DESIGN_CATALOG_EXT) => {
            format!("{}{}", stem, RUNTIME_CATALOG_EXT)
        }
        _ => file.to_string(),
    }
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// RFC 3339 when an offset is present, otherwise a naive date-time or bare
/// date taken as UTC.
pub fn parse_release_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
