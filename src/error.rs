//! Error types for catalog access and cache maintenance.

use std::path::PathBuf;
use thiserror::Error;

use crate::cache::LoadTicket;

/// Errors raised by a [`MetadataGateway`](crate::MetadataGateway).
#[derive(Debug, Error)]
pub enum GatewayError {
    // IO errors (exit code 3)
    #[error("catalog file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Catalog errors (exit code 2)
    #[error("invalid catalog JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("unknown container '{container}'")]
    UnknownContainer { container: String },

    #[error("unknown object '{object}'")]
    UnknownObject { object: String },

    #[error("unknown field '{field}' on object '{object}'")]
    UnknownField { object: String, field: String },
}

impl GatewayError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            GatewayError::FileNotFound { .. } | GatewayError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            GatewayError::Network { .. } => 3,
            _ => 2,
        }
    }
}

/// Errors surfaced by [`MetadataCache`](crate::MetadataCache) operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("gateway unavailable while {operation}: {source}")]
    GatewayUnavailable {
        operation: &'static str,
        #[source]
        source: GatewayError,
    },

    #[error("no object '{identifier}' in the cache")]
    UnknownObject { identifier: String },

    #[error("no field '{field}' under object '{object}'")]
    UnknownField { object: String, field: String },

    #[error("handle refers to a catalog tree that has since been reloaded")]
    StaleHandle,

    #[error("load {ticket} was cancelled before its result was applied")]
    Cancelled { ticket: LoadTicket },

    #[error("load {ticket} finished against a catalog tree that has since been reloaded")]
    Discarded { ticket: LoadTicket },

    #[error("no pending load {ticket}")]
    UnknownTicket { ticket: LoadTicket },

    #[error("{what} has not been loaded")]
    NotLoaded { what: String },
}

impl CatalogError {
    pub(crate) fn gateway(operation: &'static str, source: GatewayError) -> Self {
        CatalogError::GatewayUnavailable { operation, source }
    }

    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            CatalogError::GatewayUnavailable { source, .. } => source.exit_code(),
            CatalogError::Cancelled { .. } | CatalogError::Discarded { .. } => 3,
            _ => 2,
        }
    }
}
