//! The in-memory metadata cache.
//!
//! The cache owns a three-tier tree (objects → fields → options) that is
//! filled lazily from a [`MetadataGateway`]. Object and field loads are handed
//! to a [`WorkExecutor`]; their results come back over a channel and are only
//! applied to the tree on the thread that owns the cache, in
//! [`MetadataCache::apply_completed`] or [`MetadataCache::wait_for`]. Option
//! loads run synchronously.
//!
//! # Global value sets
//!
//! A value set flagged global is shared by name between fields of different
//! objects. When such a field is loaded, the cache first looks for another
//! loaded field referencing the same global set (a donor) and copies the
//! donor's options instead of taking the freshly described ones. Every field
//! referencing one global set therefore shows the same options for the whole
//! session, even if the remote copy changes in between.
//!
//! ```
//! use std::sync::Arc;
//! use optionset_catalog::{CatalogFileGateway, InlineExecutor, MetadataCache};
//!
//! let gateway = CatalogFileGateway::from_json(r#"{
//!     "objects": [
//!         { "identifier": "account", "display_label": "Account", "fields": [
//!             { "identifier": "industrycode", "display_label": "Industry", "value_type": "picklist",
//!               "value_set": { "is_global": true, "global_name": "industry_g",
//!                              "values": [{ "value": 1, "label": "Tech" }] } } ] }
//!     ]
//! }"#).unwrap();
//!
//! let mut cache = MetadataCache::new(Arc::new(gateway), InlineExecutor);
//! let account = cache.load_objects(None).unwrap()[0].id();
//! let industry = cache.load_fields(account).unwrap()[0].id();
//! let options = cache.load_options(industry).unwrap();
//! assert_eq!(options[0].label(), "Tech");
//! ```

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::error::{CatalogError, GatewayError};
use crate::executor::{CancelToken, WorkExecutor};
use crate::gateway::MetadataGateway;
use crate::node::{FieldId, FieldNode, ObjectId, ObjectNode, OptionNode};
use crate::types::{resolvable_label, FieldSummary, ObjectSummary, ValueSetDescriptor};

/// Identifies one submitted background load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoadTicket(u64);

impl fmt::Display for LoadTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "load#{}", self.0)
    }
}

/// Outcome of a background load, reported once it has been applied.
#[derive(Debug)]
pub enum CacheEvent {
    /// The object list was replaced.
    ObjectsLoaded { ticket: LoadTicket, count: usize },
    /// An object's fields became available.
    FieldsAvailable {
        ticket: LoadTicket,
        object: ObjectId,
        count: usize,
    },
    /// The gateway failed; the tree was left untouched.
    LoadFailed { ticket: LoadTicket, error: CatalogError },
    /// The load was cancelled or dropped by the executor.
    Cancelled { ticket: LoadTicket },
    /// The result arrived for a tree that has been reloaded since.
    Discarded { ticket: LoadTicket },
}

impl CacheEvent {
    pub fn ticket(&self) -> LoadTicket {
        match self {
            CacheEvent::ObjectsLoaded { ticket, .. }
            | CacheEvent::FieldsAvailable { ticket, .. }
            | CacheEvent::LoadFailed { ticket, .. }
            | CacheEvent::Cancelled { ticket }
            | CacheEvent::Discarded { ticket } => *ticket,
        }
    }

    /// Turn failure events into errors.
    pub fn into_result(self) -> Result<CacheEvent, CatalogError> {
        match self {
            CacheEvent::LoadFailed { error, .. } => Err(error),
            CacheEvent::Cancelled { ticket } => Err(CatalogError::Cancelled { ticket }),
            CacheEvent::Discarded { ticket } => Err(CatalogError::Discarded { ticket }),
            event => Ok(event),
        }
    }
}

/// Counters describing the work the cache has done.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Object lists applied.
    pub object_loads: u64,
    /// Field lists applied.
    pub field_loads: u64,
    /// Value-set descriptors requested from the gateway.
    pub value_set_requests: u64,
    /// Option loads satisfied by copying a donor's options.
    pub value_sets_reused: u64,
}

enum Fetched {
    Objects(Result<Vec<ObjectSummary>, GatewayError>),
    Fields(Result<Vec<FieldSummary>, GatewayError>),
}

struct Completion {
    ticket: LoadTicket,
    // None when the work was cancelled or dropped before fetching.
    fetched: Option<Fetched>,
}

/// Sends exactly one completion per ticket, even if the work never runs.
struct CompletionGuard {
    ticket: LoadTicket,
    tx: Option<Sender<Completion>>,
}

impl CompletionGuard {
    fn new(ticket: LoadTicket, tx: Sender<Completion>) -> Self {
        Self { ticket, tx: Some(tx) }
    }

    fn finish(mut self, fetched: Fetched) {
        self.send(Some(fetched));
    }

    fn send(&mut self, fetched: Option<Fetched>) {
        if let Some(tx) = self.tx.take() {
            // The receiver only disappears with the cache itself.
            let _ = tx.send(Completion {
                ticket: self.ticket,
                fetched,
            });
        }
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.send(None);
    }
}

enum PendingLoad {
    Objects {
        container: Option<String>,
        cancel: CancelToken,
    },
    Fields {
        object: ObjectId,
        cancel: CancelToken,
    },
}

impl PendingLoad {
    fn cancel_token(&self) -> &CancelToken {
        match self {
            PendingLoad::Objects { cancel, .. } | PendingLoad::Fields { cancel, .. } => cancel,
        }
    }
}

/// Events kept for [`MetadataCache::apply_completed`] beyond this are dropped,
/// oldest first.
const MAX_READY_EVENTS: usize = 256;

/// Lazily populated, deduplicating cache over a metadata catalog.
///
/// All mutation happens through `&mut self` on the owning thread; there is no
/// internal locking. Callers must not issue a second load for a node whose
/// previous load is still pending.
pub struct MetadataCache {
    gateway: Arc<dyn MetadataGateway>,
    executor: Box<dyn WorkExecutor>,
    objects: Vec<ObjectNode>,
    objects_loaded: bool,
    container: Option<String>,
    generation: u64,
    // Newest object-tier ticket submitted so far; older ones are stale.
    latest_objects: Option<LoadTicket>,
    next_ticket: u64,
    pending: HashMap<LoadTicket, PendingLoad>,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
    ready: VecDeque<CacheEvent>,
    stats: CacheStats,
}

impl fmt::Debug for MetadataCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataCache")
            .field("objects", &self.objects.len())
            .field("objects_loaded", &self.objects_loaded)
            .field("container", &self.container)
            .field("generation", &self.generation)
            .field("pending", &self.pending.len())
            .field("stats", &self.stats)
            .finish()
    }
}

impl MetadataCache {
    pub fn new(gateway: Arc<dyn MetadataGateway>, executor: impl WorkExecutor + 'static) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            gateway,
            executor: Box::new(executor),
            objects: Vec::new(),
            objects_loaded: false,
            container: None,
            generation: 0,
            latest_objects: None,
            next_ticket: 0,
            pending: HashMap::new(),
            tx,
            rx,
            ready: VecDeque::new(),
            stats: CacheStats::default(),
        }
    }

    // --- Object tier ---

    /// Start loading the objects of `container` (all objects when `None`).
    ///
    /// The current object list stays visible until the result is applied,
    /// then is replaced as a whole. Replacing it invalidates every handle
    /// issued for the previous list.
    pub fn submit_objects(&mut self, container: Option<&str>) -> LoadTicket {
        let ticket = self.issue_ticket();
        self.latest_objects = Some(ticket);
        let cancel = CancelToken::new();
        self.pending.insert(
            ticket,
            PendingLoad::Objects {
                container: container.map(str::to_owned),
                cancel: cancel.clone(),
            },
        );

        let gateway = Arc::clone(&self.gateway);
        let container = container.map(str::to_owned);
        let guard = CompletionGuard::new(ticket, self.tx.clone());
        debug!(%ticket, container = ?container, "submitting object load");
        self.executor.submit(Box::new(move || {
            if cancel.is_cancelled() {
                return;
            }
            let result = gateway.list_objects(container.as_deref());
            guard.finish(Fetched::Objects(result));
        }));
        ticket
    }

    /// Load the object list and wait for it to be applied.
    pub fn load_objects(&mut self, container: Option<&str>) -> Result<&[ObjectNode], CatalogError> {
        let ticket = self.submit_objects(container);
        self.wait_for(ticket)?;
        Ok(&self.objects)
    }

    // --- Field tier ---

    /// Start loading the fields of `object`.
    ///
    /// Always fetches, even if the object is already loaded; on success the
    /// field list is replaced wholesale.
    pub fn submit_fields(&mut self, object: ObjectId) -> Result<LoadTicket, CatalogError> {
        let identifier = self.object(object)?.identifier.clone();
        let ticket = self.issue_ticket();
        let cancel = CancelToken::new();
        self.pending.insert(
            ticket,
            PendingLoad::Fields {
                object,
                cancel: cancel.clone(),
            },
        );

        let gateway = Arc::clone(&self.gateway);
        let guard = CompletionGuard::new(ticket, self.tx.clone());
        debug!(%ticket, object = %identifier, "submitting field load");
        self.executor.submit(Box::new(move || {
            if cancel.is_cancelled() {
                return;
            }
            let result = gateway.list_fields(&identifier);
            guard.finish(Fetched::Fields(result));
        }));
        Ok(ticket)
    }

    /// Fields of `object`, loading them first if necessary.
    pub fn load_fields(&mut self, object: ObjectId) -> Result<&[FieldNode], CatalogError> {
        if self.object(object)?.loaded {
            return Ok(&self.object(object)?.children);
        }
        let ticket = self.submit_fields(object)?;
        self.wait_for(ticket)?;
        Ok(&self.object(object)?.children)
    }

    // --- Option tier ---

    /// Options of `field`, loading them first if necessary.
    ///
    /// Runs on the calling thread. A load always asks the gateway for the
    /// value-set descriptor; if the set is global and another loaded field of
    /// a different object already holds it, that field's options are copied
    /// instead of using the described ones.
    pub fn load_options(&mut self, field: FieldId) -> Result<&[OptionNode], CatalogError> {
        if self.field(field)?.loaded {
            trace!(%field, "options already loaded");
            return Ok(&self.field(field)?.children);
        }

        let object_identifier = self.object(field.object)?.identifier.clone();
        let field_identifier = self.field(field)?.identifier.clone();

        self.stats.value_set_requests += 1;
        let descriptor = self
            .gateway
            .describe_value_set(&object_identifier, &field_identifier)
            .map_err(|e| {
                warn!(object = %object_identifier, field = %field_identifier, error = %e, "value set load failed");
                CatalogError::gateway("describing value set", e)
            })?;

        let global_set_name = descriptor.global_set_name().map(str::to_owned);
        let donor = global_set_name
            .as_deref()
            .and_then(|name| self.find_donor(field, name));

        let options = match donor {
            Some(donor) => {
                debug!(
                    object = %object_identifier,
                    field = %field_identifier,
                    global_set = ?global_set_name,
                    donor = %donor,
                    "reusing loaded global value set"
                );
                self.stats.value_sets_reused += 1;
                self.field(donor)?
                    .children
                    .iter()
                    .map(|o| o.reparented(field))
                    .collect()
            }
            None => build_options(field, &descriptor),
        };

        let node = self.field_mut(field)?;
        node.global_set_name = global_set_name;
        node.children = options;
        node.loaded = true;
        Ok(&node.children)
    }

    /// First loaded field, in tree order, that can lend its options to `target`.
    ///
    /// A donor references the same global set, has a different identifier
    /// and belongs to an object with a different identifier.
    fn find_donor(&self, target: FieldId, global_set_name: &str) -> Option<FieldId> {
        let target_node = self.field(target).ok()?;
        let parent_identifier = &self.object(target.object).ok()?.identifier;

        self.objects
            .iter()
            .filter(|object| object.identifier != *parent_identifier)
            .flat_map(|object| object.children.iter())
            .find(|candidate| {
                candidate.id != target
                    && candidate.loaded
                    && candidate.identifier != target_node.identifier
                    && candidate.global_set_name.as_deref() == Some(global_set_name)
            })
            .map(|candidate| candidate.id)
    }

    // --- Completion handling ---

    /// Apply every finished background load and return the resulting events,
    /// including events collected while waiting on other tickets.
    ///
    /// Callers that only use the blocking `load_*` methods never need this;
    /// only the newest 256 unclaimed events are kept.
    pub fn apply_completed(&mut self) -> Vec<CacheEvent> {
        let mut events: Vec<CacheEvent> = self.ready.drain(..).collect();
        while let Ok(completion) = self.rx.try_recv() {
            events.push(self.apply(completion));
        }
        events
    }

    fn keep_ready(&mut self, event: CacheEvent) {
        if self.ready.len() == MAX_READY_EVENTS {
            if let Some(dropped) = self.ready.pop_front() {
                trace!(ticket = %dropped.ticket(), "dropping unclaimed load event");
            }
        }
        self.ready.push_back(event);
    }

    /// Block until `ticket` has been applied and return its event.
    ///
    /// Failed, cancelled and discarded loads come back as errors. Events for
    /// other tickets applied meanwhile are kept for [`apply_completed`](Self::apply_completed).
    pub fn wait_for(&mut self, ticket: LoadTicket) -> Result<CacheEvent, CatalogError> {
        if let Some(pos) = self.ready.iter().position(|e| e.ticket() == ticket) {
            if let Some(event) = self.ready.remove(pos) {
                return event.into_result();
            }
        }
        if !self.pending.contains_key(&ticket) {
            return Err(CatalogError::UnknownTicket { ticket });
        }
        loop {
            // The cache keeps a sender alive, so this only fails if the
            // channel is torn down, which cannot happen while `self` exists.
            let completion = self
                .rx
                .recv()
                .map_err(|_| CatalogError::Cancelled { ticket })?;
            let event = self.apply(completion);
            if event.ticket() == ticket {
                return event.into_result();
            }
            self.keep_ready(event);
        }
    }

    /// Request cancellation of a pending load.
    ///
    /// Returns false if the ticket is not pending. A cancelled load never
    /// changes the tree.
    pub fn cancel(&mut self, ticket: LoadTicket) -> bool {
        match self.pending.get(&ticket) {
            Some(load) => {
                debug!(%ticket, "cancelling load");
                load.cancel_token().cancel();
                true
            }
            None => false,
        }
    }

    /// Number of submitted loads whose results have not been applied yet.
    pub fn pending_loads(&self) -> usize {
        self.pending.len()
    }

    fn apply(&mut self, completion: Completion) -> CacheEvent {
        let Completion { ticket, fetched } = completion;
        let Some(load) = self.pending.remove(&ticket) else {
            warn!(%ticket, "completion for unknown load");
            return CacheEvent::Discarded { ticket };
        };

        let fetched = match fetched {
            Some(fetched) if !load.cancel_token().is_cancelled() => fetched,
            _ => {
                debug!(%ticket, "load cancelled");
                return CacheEvent::Cancelled { ticket };
            }
        };

        match (load, fetched) {
            (PendingLoad::Objects { container, .. }, Fetched::Objects(result)) => {
                self.apply_objects(ticket, container, result)
            }
            (PendingLoad::Fields { object, .. }, Fetched::Fields(result)) => {
                self.apply_fields(ticket, object, result)
            }
            _ => {
                warn!(%ticket, "completion does not match the submitted load");
                CacheEvent::Discarded { ticket }
            }
        }
    }

    fn apply_objects(
        &mut self,
        ticket: LoadTicket,
        container: Option<String>,
        result: Result<Vec<ObjectSummary>, GatewayError>,
    ) -> CacheEvent {
        // Superseded whatever became of the newer load.
        if self.latest_objects.is_some_and(|latest| latest > ticket) {
            debug!(%ticket, "object list superseded by a newer load");
            return CacheEvent::Discarded { ticket };
        }

        let summaries = match result {
            Ok(summaries) => summaries,
            Err(e) => {
                warn!(%ticket, error = %e, "object load failed");
                return CacheEvent::LoadFailed {
                    ticket,
                    error: CatalogError::gateway("listing objects", e),
                };
            }
        };

        let generation = self.generation + 1;
        let objects: Vec<ObjectNode> = summaries
            .into_iter()
            .filter(|summary| {
                let keep = summary.is_listable();
                if !keep {
                    trace!(object = %summary.identifier, "skipping unlisted object");
                }
                keep
            })
            .enumerate()
            .map(|(index, summary)| {
                let label = resolvable_label(&summary.display_label)
                    .unwrap_or_default()
                    .to_string();
                ObjectNode::new(ObjectId { generation, index }, summary.identifier, label)
            })
            .collect();

        let count = objects.len();
        self.generation = generation;
        self.objects = objects;
        self.objects_loaded = true;
        self.container = container;
        self.stats.object_loads += 1;
        debug!(%ticket, count, container = ?self.container, "object list applied");
        CacheEvent::ObjectsLoaded { ticket, count }
    }

    fn apply_fields(
        &mut self,
        ticket: LoadTicket,
        object: ObjectId,
        result: Result<Vec<FieldSummary>, GatewayError>,
    ) -> CacheEvent {
        let Ok(node) = self.object_mut(object) else {
            debug!(%ticket, %object, "field list for a replaced object list");
            return CacheEvent::Discarded { ticket };
        };

        let summaries = match result {
            Ok(summaries) => summaries,
            Err(e) => {
                warn!(%ticket, object = %node.identifier, error = %e, "field load failed");
                return CacheEvent::LoadFailed {
                    ticket,
                    error: CatalogError::gateway("listing fields", e),
                };
            }
        };

        let fields: Vec<FieldNode> = summaries
            .into_iter()
            .filter(|summary| {
                let keep = summary.is_enumerated();
                if !keep {
                    trace!(field = %summary.identifier, "skipping non-enumerated field");
                }
                keep
            })
            .enumerate()
            .map(|(index, summary)| {
                let label = resolvable_label(&summary.display_label)
                    .unwrap_or_default()
                    .to_string();
                FieldNode::new(node.next_field_id(index), summary.identifier, label)
            })
            .collect();

        let count = fields.len();
        node.replace_fields(fields);
        debug!(%ticket, object = %node.identifier, count, "fields available");
        self.stats.field_loads += 1;
        CacheEvent::FieldsAvailable {
            ticket,
            object,
            count,
        }
    }

    fn issue_ticket(&mut self) -> LoadTicket {
        self.next_ticket += 1;
        LoadTicket(self.next_ticket)
    }

    // --- Navigation ---

    /// The current object list. Empty until the first object load is applied.
    pub fn objects(&self) -> &[ObjectNode] {
        &self.objects
    }

    /// Whether an object list has been applied.
    pub fn objects_loaded(&self) -> bool {
        self.objects_loaded
    }

    /// Container filter of the current object list.
    pub fn container(&self) -> Option<&str> {
        self.container.as_deref()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn object(&self, id: ObjectId) -> Result<&ObjectNode, CatalogError> {
        if id.generation != self.generation {
            return Err(CatalogError::StaleHandle);
        }
        self.objects.get(id.index).ok_or(CatalogError::StaleHandle)
    }

    fn object_mut(&mut self, id: ObjectId) -> Result<&mut ObjectNode, CatalogError> {
        if id.generation != self.generation {
            return Err(CatalogError::StaleHandle);
        }
        self.objects.get_mut(id.index).ok_or(CatalogError::StaleHandle)
    }

    pub fn field(&self, id: FieldId) -> Result<&FieldNode, CatalogError> {
        let object = self.object(id.object)?;
        if id.revision != object.revision {
            return Err(CatalogError::StaleHandle);
        }
        object.children.get(id.index).ok_or(CatalogError::StaleHandle)
    }

    fn field_mut(&mut self, id: FieldId) -> Result<&mut FieldNode, CatalogError> {
        let object = self.object_mut(id.object)?;
        if id.revision != object.revision {
            return Err(CatalogError::StaleHandle);
        }
        object.children.get_mut(id.index).ok_or(CatalogError::StaleHandle)
    }

    /// Find an object of the current list by identifier.
    pub fn find_object(&self, identifier: &str) -> Option<ObjectId> {
        self.objects
            .iter()
            .find(|o| o.identifier == identifier)
            .map(|o| o.id)
    }

    /// Find a loaded field of `object` by identifier.
    pub fn find_field(&self, object: ObjectId, identifier: &str) -> Option<FieldId> {
        self.object(object).ok()?.field(identifier).map(|f| f.id)
    }

    /// Like [`find_object`](Self::find_object), erroring when the object is unknown.
    pub fn require_object(&self, identifier: &str) -> Result<ObjectId, CatalogError> {
        self.find_object(identifier)
            .ok_or_else(|| CatalogError::UnknownObject {
                identifier: identifier.to_string(),
            })
    }

    /// Like [`find_field`](Self::find_field), erroring when the field is unknown.
    pub fn require_field(&self, object: ObjectId, identifier: &str) -> Result<FieldId, CatalogError> {
        self.find_field(object, identifier)
            .ok_or_else(|| CatalogError::UnknownField {
                object: self
                    .object(object)
                    .map(|o| o.identifier.clone())
                    .unwrap_or_default(),
                field: identifier.to_string(),
            })
    }

    // --- Editing and invalidation ---

    /// Mutable access to a loaded field's options.
    ///
    /// Edits stay local to this field, including for fields that obtained
    /// their options from a donor.
    pub fn options_mut(&mut self, field: FieldId) -> Result<&mut Vec<OptionNode>, CatalogError> {
        let node = self.field_mut(field)?;
        if !node.loaded {
            return Err(CatalogError::NotLoaded {
                what: format!("options of field '{}'", node.identifier),
            });
        }
        Ok(&mut node.children)
    }

    /// Forget an object's fields so the next load fetches them again.
    ///
    /// Handles to the object's fields become stale.
    pub fn invalidate_object(&mut self, object: ObjectId) -> Result<(), CatalogError> {
        let node = self.object_mut(object)?;
        debug!(object = %node.identifier, "invalidating fields");
        node.reset();
        Ok(())
    }

    /// Forget a field's options so the next load fetches them again.
    pub fn invalidate_field(&mut self, field: FieldId) -> Result<(), CatalogError> {
        let node = self.field_mut(field)?;
        debug!(field = %node.identifier, "invalidating options");
        node.reset();
        Ok(())
    }
}

fn build_options(field: FieldId, descriptor: &ValueSetDescriptor) -> Vec<OptionNode> {
    descriptor
        .values
        .iter()
        .filter_map(|value| match resolvable_label(&value.label) {
            Some(label) => Some(OptionNode::new(
                value.value,
                label,
                value.description.clone(),
                field,
            )),
            None => {
                trace!(value = value.value, "skipping unlabelled option");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::InlineExecutor;
    use crate::gateway::CatalogFileGateway;

    const CATALOG: &str = r#"{
        "objects": [
            { "identifier": "account", "display_label": "Account", "fields": [
                { "identifier": "industrycode", "display_label": "Industry", "value_type": "picklist",
                  "value_set": { "is_global": true, "global_name": "industry_g",
                                 "values": [{ "value": 1, "label": "Tech" }, { "value": 2 }] } },
                { "identifier": "statuscode", "display_label": "Status", "value_type": "picklist",
                  "value_set": { "is_global": true, "global_name": "industry_g",
                                 "values": [{ "value": 9, "label": "Other" }] } }
            ] },
            { "identifier": "contact", "display_label": "Contact", "fields": [
                { "identifier": "industrycode", "display_label": "Industry", "value_type": "picklist",
                  "value_set": { "is_global": true, "global_name": "industry_g",
                                 "values": [{ "value": 5, "label": "Changed" }] } }
            ] }
        ]
    }"#;

    fn cache() -> MetadataCache {
        let gateway = CatalogFileGateway::from_json(CATALOG).unwrap();
        MetadataCache::new(Arc::new(gateway), InlineExecutor)
    }

    fn field(cache: &mut MetadataCache, object: &str, field: &str) -> FieldId {
        let object = cache.require_object(object).unwrap();
        cache.load_fields(object).unwrap();
        cache.require_field(object, field).unwrap()
    }

    #[test]
    fn unlabelled_options_are_skipped() {
        let mut cache = cache();
        cache.load_objects(None).unwrap();
        let industry = field(&mut cache, "account", "industrycode");

        let options = cache.load_options(industry).unwrap();
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].content(), (1, "Tech", None));
    }

    #[test]
    fn donor_must_live_on_another_object() {
        let mut cache = cache();
        cache.load_objects(None).unwrap();
        let industry = field(&mut cache, "account", "industrycode");
        let status = field(&mut cache, "account", "statuscode");

        cache.load_options(industry).unwrap();
        let options = cache.load_options(status).unwrap();

        // Same object: no reuse, the described options are taken.
        assert_eq!(options[0].content(), (9, "Other", None));
        assert_eq!(cache.stats().value_sets_reused, 0);
    }

    #[test]
    fn donor_must_have_another_identifier() {
        let mut cache = cache();
        cache.load_objects(None).unwrap();
        let account_industry = field(&mut cache, "account", "industrycode");
        let contact_industry = field(&mut cache, "contact", "industrycode");

        cache.load_options(account_industry).unwrap();
        let options = cache.load_options(contact_industry).unwrap();

        assert_eq!(options[0].content(), (5, "Changed", None));
        assert_eq!(cache.stats().value_sets_reused, 0);
    }

    #[test]
    fn stale_object_handle_after_reload() {
        let mut cache = cache();
        let account = cache.load_objects(None).unwrap()[0].id();
        cache.load_objects(None).unwrap();
        assert!(matches!(cache.object(account), Err(CatalogError::StaleHandle)));
        assert!(matches!(cache.load_fields(account), Err(CatalogError::StaleHandle)));
    }

    #[test]
    fn stale_field_handle_after_invalidation() {
        let mut cache = cache();
        cache.load_objects(None).unwrap();
        let industry = field(&mut cache, "account", "industrycode");
        let account = industry.object();

        cache.invalidate_object(account).unwrap();
        assert!(matches!(cache.field(industry), Err(CatalogError::StaleHandle)));

        let reloaded = field(&mut cache, "account", "industrycode");
        assert_ne!(reloaded, industry);
        assert!(cache.field(reloaded).is_ok());
    }

    #[test]
    fn wait_for_unknown_ticket() {
        let mut cache = cache();
        let err = cache.wait_for(LoadTicket(42)).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownTicket { ticket } if ticket == LoadTicket(42)));
        assert_eq!(err.to_string(), "no pending load load#42");
    }

    #[test]
    fn unclaimed_events_are_bounded() {
        let mut cache = cache();
        let tickets: Vec<_> = (0..MAX_READY_EVENTS + 10)
            .map(|_| cache.submit_objects(None))
            .collect();
        let last = tickets[tickets.len() - 1];

        // Every other load completes while waiting on the last one.
        cache.wait_for(last).unwrap();
        let events = cache.apply_completed();
        assert_eq!(events.len(), MAX_READY_EVENTS);
        assert!(events.iter().all(|e| matches!(e, CacheEvent::Discarded { .. })));
        // Oldest are dropped first.
        assert_eq!(events[0].ticket(), tickets[9]);
        assert_eq!(events[MAX_READY_EVENTS - 1].ticket(), tickets[tickets.len() - 2]);
        assert!(cache.apply_completed().is_empty());
    }

    #[test]
    fn options_mut_requires_loaded_field() {
        let mut cache = cache();
        cache.load_objects(None).unwrap();
        let industry = field(&mut cache, "account", "industrycode");
        assert!(matches!(cache.options_mut(industry), Err(CatalogError::NotLoaded { .. })));
    }

    #[test]
    fn ticket_display() {
        assert_eq!(LoadTicket(3).to_string(), "load#3");
    }
}
