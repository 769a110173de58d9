//! Access to the remote metadata catalog.
//!
//! The cache only ever talks to a [`MetadataGateway`]. Two implementations
//! ship with the crate: a JSON catalog file on disk and, with the `remote`
//! feature, an HTTP service.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::types::{FieldSummary, ObjectSummary, ValueSetDescriptor};

/// Default timeout for HTTP requests (10 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Blocking query interface over the schema catalog.
///
/// Implementations are called from background work, hence `Send + Sync`.
/// They must not retry on their own behalf unless that is their documented
/// transport policy; the cache never retries.
pub trait MetadataGateway: Send + Sync {
    /// Domain objects in `container`, or every object when `container` is `None`.
    fn list_objects(&self, container: Option<&str>) -> Result<Vec<ObjectSummary>, GatewayError>;

    /// All fields of an object, unfiltered.
    fn list_fields(&self, object: &str) -> Result<Vec<FieldSummary>, GatewayError>;

    /// Value-set metadata and options for one field.
    fn describe_value_set(&self, object: &str, field: &str) -> Result<ValueSetDescriptor, GatewayError>;
}

/// Settings for opening a gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Per-request timeout for HTTP sources.
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl GatewayConfig {
    /// Set the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Open a gateway for a catalog file path or an HTTP base URL.
///
/// URL sources require the `remote` feature.
pub fn open_gateway(source: &str, config: &GatewayConfig) -> Result<Arc<dyn MetadataGateway>, GatewayError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            Ok(Arc::new(HttpGateway::new(source, config)?))
        }
        #[cfg(not(feature = "remote"))]
        {
            let _ = config;
            Err(GatewayError::InvalidUrl {
                url: source.to_string(),
                message: "HTTP catalogs require the `remote` feature".to_string(),
            })
        }
    } else {
        Ok(Arc::new(CatalogFileGateway::load(Path::new(source))?))
    }
}

// --- Catalog file ---

/// On-disk catalog snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    /// Container name to the identifiers of the objects it holds.
    #[serde(default)]
    pub containers: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub objects: Vec<CatalogObject>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogObject {
    #[serde(flatten)]
    pub summary: ObjectSummary,
    #[serde(default)]
    pub fields: Vec<CatalogField>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogField {
    #[serde(flatten)]
    pub summary: FieldSummary,
    #[serde(default)]
    pub value_set: Option<ValueSetDescriptor>,
}

/// Gateway backed by a [`CatalogFile`] held in memory.
#[derive(Debug, Clone)]
pub struct CatalogFileGateway {
    catalog: CatalogFile,
}

impl CatalogFileGateway {
    pub fn new(catalog: CatalogFile) -> Self {
        Self { catalog }
    }

    /// Load a catalog from a file path.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::FileNotFound` if the file doesn't exist,
    /// or `GatewayError::InvalidJson` if the file isn't a valid catalog.
    pub fn load(path: &Path) -> Result<Self, GatewayError> {
        if !path.exists() {
            return Err(GatewayError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|source| GatewayError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_json(&content)
    }

    /// Parse a catalog from a JSON string.
    pub fn from_json(content: &str) -> Result<Self, GatewayError> {
        let catalog = serde_json::from_str(content).map_err(|source| GatewayError::InvalidJson { source })?;
        Ok(Self::new(catalog))
    }

    pub fn catalog(&self) -> &CatalogFile {
        &self.catalog
    }

    fn object(&self, object: &str) -> Result<&CatalogObject, GatewayError> {
        self.catalog
            .objects
            .iter()
            .find(|o| o.summary.identifier == object)
            .ok_or_else(|| GatewayError::UnknownObject {
                object: object.to_string(),
            })
    }
}

impl MetadataGateway for CatalogFileGateway {
    fn list_objects(&self, container: Option<&str>) -> Result<Vec<ObjectSummary>, GatewayError> {
        let Some(container) = container else {
            return Ok(self.catalog.objects.iter().map(|o| o.summary.clone()).collect());
        };

        let members = self
            .catalog
            .containers
            .get(container)
            .ok_or_else(|| GatewayError::UnknownContainer {
                container: container.to_string(),
            })?;

        // Catalog order, not container order.
        Ok(self
            .catalog
            .objects
            .iter()
            .filter(|o| members.iter().any(|m| *m == o.summary.identifier))
            .map(|o| o.summary.clone())
            .collect())
    }

    fn list_fields(&self, object: &str) -> Result<Vec<FieldSummary>, GatewayError> {
        Ok(self.object(object)?.fields.iter().map(|f| f.summary.clone()).collect())
    }

    fn describe_value_set(&self, object: &str, field: &str) -> Result<ValueSetDescriptor, GatewayError> {
        let entry = self
            .object(object)?
            .fields
            .iter()
            .find(|f| f.summary.identifier == field)
            .ok_or_else(|| GatewayError::UnknownField {
                object: object.to_string(),
                field: field.to_string(),
            })?;
        Ok(entry.value_set.clone().unwrap_or_default())
    }
}

// --- HTTP ---

/// Gateway talking to a catalog service over HTTP.
///
/// Endpoints, relative to the base URL:
/// - `GET objects[?container=NAME]`
/// - `GET objects/{object}/fields`
/// - `GET objects/{object}/fields/{field}/value-set`
#[cfg(feature = "remote")]
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::blocking::Client,
    base: reqwest::Url,
}

#[cfg(feature = "remote")]
impl HttpGateway {
    /// Build a gateway for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::InvalidUrl` if the URL cannot be parsed or
    /// cannot carry path segments, or `GatewayError::Network` if the HTTP
    /// client cannot be built.
    pub fn new(base_url: &str, config: &GatewayConfig) -> Result<Self, GatewayError> {
        let base = reqwest::Url::parse(base_url).map_err(|e| GatewayError::InvalidUrl {
            url: base_url.to_string(),
            message: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(GatewayError::InvalidUrl {
                url: base_url.to_string(),
                message: "URL cannot be used as a base".to_string(),
            });
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| GatewayError::Network {
                url: base_url.to_string(),
                source,
            })?;

        Ok(Self { client, base })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<reqwest::Url, GatewayError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| GatewayError::InvalidUrl {
                url: self.base.to_string(),
                message: "URL cannot be used as a base".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, url: reqwest::Url) -> Result<T, GatewayError> {
        let url_text = url.to_string();
        tracing::debug!(url = %url_text, "catalog request");

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|source| GatewayError::Network {
                url: url_text.clone(),
                source,
            })?;

        // Check for HTTP errors before parsing
        let response = response
            .error_for_status()
            .map_err(|source| GatewayError::Network {
                url: url_text.clone(),
                source,
            })?;

        response.json().map_err(|source| GatewayError::Network {
            url: url_text,
            source,
        })
    }
}

#[cfg(feature = "remote")]
impl MetadataGateway for HttpGateway {
    fn list_objects(&self, container: Option<&str>) -> Result<Vec<ObjectSummary>, GatewayError> {
        let mut url = self.endpoint(&["objects"])?;
        if let Some(container) = container {
            url.query_pairs_mut().append_pair("container", container);
        }
        self.get_json(url)
    }

    fn list_fields(&self, object: &str) -> Result<Vec<FieldSummary>, GatewayError> {
        let url = self.endpoint(&["objects", object, "fields"])?;
        self.get_json(url)
    }

    fn describe_value_set(&self, object: &str, field: &str) -> Result<ValueSetDescriptor, GatewayError> {
        let url = self.endpoint(&["objects", object, "fields", field, "value-set"])?;
        self.get_json(url)
    }
}
