//! Error taxonomy for a bootstrap run.
//!
//! Manifest and catalog failures abort the run and surface as a single
//! [`BootstrapError`]. Population-time problems never reach this type; they
//! are logged and counted in the [`PopulationReport`](crate::models::PopulationReport).

use thiserror::Error;

use crate::engine::EngineError;
use crate::transport::FetchError;

pub type Result<T, E = BootstrapError> = std::result::Result<T, E>;

/// Bootstrap errors.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Base location is empty")]
    InvalidBase,

    #[error("Transport failed for {location}: {detail}")]
    Transport { location: String, detail: String },

    #[error("Not found: {path}")]
    NotFound { path: String },

    #[error("Malformed content at {location}: {detail}")]
    Format { location: String, detail: String },

    #[error("Secure transport required, refusing {location}")]
    InsecureTransport { location: String },

    #[error("Manifest at {location} lists no packs")]
    EmptyManifest { location: String },

    #[error("No pack is released yet")]
    NoEligiblePacks,

    #[error("Content not found: {what}")]
    ContentNotFound { what: String },

    #[error("Catalog for pack '{pack_id}' failed: {source}")]
    Catalog {
        pack_id: String,
        #[source]
        source: Box<BootstrapError>,
    },
}

impl BootstrapError {
    pub(crate) fn transport(location: impl Into<String>, detail: impl ToString) -> Self {
        Self::Transport {
            location: location.into(),
            detail: detail.to_string(),
        }
    }

    pub(crate) fn format(location: impl Into<String>, detail: impl ToString) -> Self {
        Self::Format {
            location: location.into(),
            detail: detail.to_string(),
        }
    }

    /// Map a transport failure on `location` into the bootstrap taxonomy.
    pub(crate) fn from_fetch(location: &str, err: FetchError) -> Self {
        match err {
            FetchError::NotFound(path) => Self::NotFound { path },
            other => Self::transport(location, other),
        }
    }

    /// Map an engine failure on `location` into the bootstrap taxonomy.
    pub(crate) fn from_engine(location: &str, err: EngineError) -> Self {
        match err {
            EngineError::Malformed(detail) => Self::format(location, detail),
            EngineError::Missing(key) => Self::NotFound { path: key },
            other => Self::transport(location, other),
        }
    }

    /// Whether this error ends the run without content but is not a failure.
    pub fn is_terminal_notice(&self) -> bool {
        matches!(self, Self::NoEligiblePacks)
    }
}
