//! Option-set catalog browser
//!
//! Lazy, in-memory cache over a remote schema catalog: domain objects, their
//! enumerated (picklist) fields, and the value sets of those fields.
//!
//! The catalog is read through a [`MetadataGateway`]. Objects and fields are
//! fetched as background work on a [`WorkExecutor`] and applied to the tree
//! on the thread owning the [`MetadataCache`]; options are fetched on demand.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use optionset_catalog::{CatalogFileGateway, InlineExecutor, MetadataCache};
//!
//! let gateway = CatalogFileGateway::from_json(r#"{
//!     "containers": { "sales": ["account"] },
//!     "objects": [
//!         { "identifier": "account", "display_label": "Account", "fields": [
//!             { "identifier": "industrycode", "display_label": "Industry",
//!               "value_type": "picklist",
//!               "value_set": { "values": [{ "value": 1, "label": "Tech" }] } } ] },
//!         { "identifier": "systemjob", "display_label": "System Job",
//!           "is_managed": true, "is_customizable": false }
//!     ]
//! }"#).unwrap();
//!
//! let mut cache = MetadataCache::new(Arc::new(gateway), InlineExecutor);
//! let objects = cache.load_objects(Some("sales")).unwrap();
//! assert_eq!(objects.len(), 1);
//!
//! let account = cache.require_object("account").unwrap();
//! let industry = cache.load_fields(account).unwrap()[0].id();
//! assert_eq!(cache.load_options(industry).unwrap()[0].label(), "Tech");
//! ```
//!
//! # Filtering
//!
//! | Tier | Kept |
//! |------|------|
//! | objects | labelled, and either unmanaged or still customizable |
//! | fields | labelled single-select picklists |
//! | options | labelled values |

mod cache;
mod error;
mod executor;
mod export;
mod gateway;
mod node;
mod types;

pub use cache::{CacheEvent, CacheStats, LoadTicket, MetadataCache};
pub use error::{CatalogError, GatewayError};
pub use executor::{CancelToken, InlineExecutor, ThreadExecutor, Work, WorkExecutor};
pub use export::{FieldMapping, MappingStats, ObjectMapping, OptionMapping, ValueSetMapping};
pub use gateway::{
    is_url, open_gateway, CatalogField, CatalogFile, CatalogFileGateway, CatalogObject,
    GatewayConfig, MetadataGateway, DEFAULT_TIMEOUT,
};
pub use node::{same_options, FieldId, FieldNode, ObjectId, ObjectNode, OptionNode};
pub use types::{
    resolvable_label, FieldSummary, FieldValueType, ObjectSummary, OptionValue, ValueSetDescriptor,
};

#[cfg(feature = "remote")]
pub use gateway::HttpGateway;
