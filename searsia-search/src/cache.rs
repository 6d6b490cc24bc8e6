//! Persistent per-resource metadata, namespaced by federation.
//!
//! Session-level fields live under `<prefix>-<field>` (`searsia-id`,
//! `searsia-name`, ...). Resources live under `<federationId>/<resourceId>`
//! as JSON, where the federation id is the mother's own id.
//!
//! Every operation is best-effort: a failing [`KeyValueStore`] is logged
//! at debug level and reads as "absent".

use crate::error::StoreError;
use crate::store::KeyValueStore;
use crate::types::{DisplayType, Resource};

/// Default prefix of session-level keys.
pub const DEFAULT_PREFIX: &str = "searsia";

/// Session-level field holding the federation id.
const FIELD_ID: &str = "id";

/// Resource metadata cache over a [`KeyValueStore`].
#[derive(Debug, Clone)]
pub struct ResourceCache<S> {
    store: S,
    prefix: String,
}

impl<S: KeyValueStore> ResourceCache<S> {
    /// Cache using the [`DEFAULT_PREFIX`] for session-level keys.
    pub fn new(store: S) -> Self {
        Self::with_prefix(store, DEFAULT_PREFIX)
    }

    /// Cache using a custom prefix for session-level keys.
    pub fn with_prefix(store: S, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read a session-level field.
    pub fn meta(&self, field: &str) -> Option<String> {
        let key = self.meta_key(field);
        absorb(self.store.get(&key), &key).flatten()
    }

    /// Write a session-level field.
    pub fn set_meta(&self, field: &str, value: &str) {
        let key = self.meta_key(field);
        absorb(self.store.set(&key, value), &key);
    }

    /// Id of the federation whose resources are cached, if known.
    pub fn federation_id(&self) -> Option<String> {
        self.meta(FIELD_ID)
    }

    /// Switch to federation `id`. When it differs from the current one,
    /// every resource of the old federation is removed first.
    pub fn set_federation(&self, id: &str) {
        match self.federation_id() {
            Some(current) if current == id => return,
            Some(current) => {
                tracing::info!(old = %current, new = %id, "federation changed, clearing cached resources");
                self.clear_namespace(&current);
            }
            None => tracing::info!(federation = %id, "federation set"),
        }
        self.set_meta(FIELD_ID, id);
    }

    /// Forget the federation, its resources and every session-level field.
    pub fn reset(&self) {
        if let Some(current) = self.federation_id() {
            self.clear_namespace(&current);
        }
        let meta_prefix = format!("{}-", self.prefix);
        for key in self.keys() {
            if key.starts_with(&meta_prefix) {
                absorb(self.store.delete(&key), &key);
            }
        }
    }

    /// Persist `resource` in the current federation. Without a federation
    /// id nothing is stored.
    pub fn put(&self, resource: &Resource) {
        let Some(key) = self.resource_key(&resource.id) else {
            tracing::debug!(resource = %resource.id, "no federation id, resource not cached");
            return;
        };
        match serde_json::to_string(resource) {
            Ok(json) => {
                absorb(self.store.set(&key, &json), &key);
            }
            Err(e) => {
                absorb::<()>(Err(StoreError::Serialization(e.to_string())), &key);
            }
        }
    }

    /// Cached resource `id`, if present and readable.
    pub fn get(&self, id: &str) -> Option<Resource> {
        let key = self.resource_key(id)?;
        let json = absorb(self.store.get(&key), &key).flatten()?;
        match serde_json::from_str(&json) {
            Ok(resource) => Some(resource),
            Err(e) => {
                absorb::<()>(Err(StoreError::Serialization(e.to_string())), &key);
                None
            }
        }
    }

    /// Whether resource `id` is cached.
    pub fn exists(&self, id: &str) -> bool {
        match self.resource_key(id) {
            Some(key) => absorb(self.store.exists(&key), &key).unwrap_or(false),
            None => false,
        }
    }

    /// Evict resource `id`.
    pub fn delete(&self, id: &str) {
        if let Some(key) = self.resource_key(id) {
            absorb(self.store.delete(&key), &key);
        }
    }

    /// Ids of all resources cached for the current federation, sorted.
    pub fn resource_ids(&self) -> Vec<String> {
        let Some(federation) = self.federation_id() else {
            return Vec::new();
        };
        let namespace = format!("{federation}/");
        let mut ids: Vec<String> = self
            .keys()
            .into_iter()
            .filter_map(|key| key.strip_prefix(&namespace).map(str::to_owned))
            .collect();
        ids.sort();
        ids
    }

    /// Record the mother: it becomes the federation, is cached with
    /// display type `mother`, and its presentation fields are copied to
    /// the session-level keys.
    pub fn store_mother(&self, mother: &Resource) {
        if mother.id.is_empty() {
            return;
        }
        self.set_federation(&mother.id);
        let mut marked = mother.clone();
        marked.display_type = Some(DisplayType::Mother);
        self.put(&marked);

        let fields = [
            ("apitemplate", &mother.api_template),
            ("name", &mother.name),
            ("icon", &mother.favicon),
            ("banner", &mother.banner),
            ("suggesttemplate", &mother.suggest_template),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                self.set_meta(field, value);
            }
        }
    }

    /// The cached mother resource, if the federation is known.
    pub fn mother(&self) -> Option<Resource> {
        let id = self.federation_id()?;
        self.get(&id)
    }

    /// Remember the last transport error of a cached resource. Resources
    /// that are not cached are left alone.
    pub fn record_error(&self, id: &str, message: &str) {
        if let Some(mut resource) = self.get(id) {
            resource.error = Some(message.to_owned());
            self.put(&resource);
        }
    }

    fn meta_key(&self, field: &str) -> String {
        format!("{}-{field}", self.prefix)
    }

    fn resource_key(&self, id: &str) -> Option<String> {
        self.federation_id()
            .map(|federation| format!("{federation}/{id}"))
    }

    fn keys(&self) -> Vec<String> {
        absorb(self.store.keys(), "*").unwrap_or_default()
    }

    fn clear_namespace(&self, federation: &str) {
        let namespace = format!("{federation}/");
        for key in self.keys() {
            if key.starts_with(&namespace) {
                absorb(self.store.delete(&key), &key);
            }
        }
    }
}

/// Swallow a store failure, logging it.
fn absorb<T>(result: Result<T, StoreError>, key: &str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(key, error = %e, "resource cache store operation failed");
            None
        }
    }
}
