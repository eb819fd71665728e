//! Error types for the dispersion core.
//!
//! Almost every degenerate input is recovered locally (empty feature sets,
//! zero wind, failed lookups). Only an irreparable site polygon or a broken
//! configuration file surfaces as an `Err`.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type PlumeResult<T> = Result<T, PlumeError>;

/// Errors produced by the dispersion core and its collaborators.
#[derive(Debug, Error)]
pub enum PlumeError {
    /// Site polygon is still invalid after repair.
    #[error("invalid site polygon: {reason}")]
    InvalidPolygon {
        /// Why the ring could not be repaired.
        reason: String,
    },

    /// Configuration value outside its allowed range.
    #[error("invalid configuration: {field} {reason}")]
    InvalidConfig {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Description of the constraint that failed.
        reason: String,
    },

    /// Configuration (or feature) JSON could not be parsed.
    #[error("failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Configuration (or feature) file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path that was being read.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// An external collaborator failed or timed out.
    ///
    /// The scenario pipeline always recovers from this with a fallback value;
    /// it is only returned directly by provider implementations.
    #[error("external service '{service}' unavailable: {reason}")]
    ExternalService {
        /// Collaborator name (population, background, features).
        service: &'static str,
        /// Failure description.
        reason: String,
    },
}

impl PlumeError {
    pub(crate) fn invalid_polygon(reason: impl Into<String>) -> Self {
        Self::InvalidPolygon {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }

    /// Build an external-service failure; public so provider implementations
    /// outside this crate can report failures the same way.
    pub fn external(service: &'static str, reason: impl Into<String>) -> Self {
        Self::ExternalService {
            service,
            reason: reason.into(),
        }
    }
}
