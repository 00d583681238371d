use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use musicconnect_schema::{ActivityDetail, SavedActivity};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::KeyValueStore;

/// Key under which the whole saved collection is stored.
pub const STORAGE_KEY: &str = "musicconnect_saved_activities";

/// Saved proposals, newest first, mirrored to a [`KeyValueStore`] after every change.
///
/// Titles are the identity key: the collection never holds two entries with the
/// same title.
pub struct ProposalStore {
    backend: Arc<dyn KeyValueStore>,
    key: String,
    items: Vec<SavedActivity>,
}

impl ProposalStore {
    /// Loads the collection; unreadable or corrupt storage starts empty.
    pub fn load(backend: Arc<dyn KeyValueStore>) -> Self {
        Self::load_with_key(backend, STORAGE_KEY)
    }

    pub fn load_with_key(backend: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        let key = key.into();
        let items = match backend.read(&key) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<SavedActivity>>(&raw) {
                Ok(items) => Some(items),
                Err(err) => {
                    warn!(key = %key, error = %err, "saved proposals are corrupt, starting empty");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!(key = %key, error = %err, "failed to read saved proposals, starting empty");
                None
            }
        };
        let (items, dropped) = match items {
            Some(items) => dedupe(items),
            None => (Vec::new(), 0),
        };
        debug!(key = %key, count = items.len(), "loaded saved proposals");
        let mut store = Self {
            backend,
            key,
            items: Vec::new(),
        };
        if dropped > 0 {
            warn!(dropped, "dropped duplicate saved proposals");
            if let Err(err) = store.commit(items.clone()) {
                warn!(error = %format!("{err:#}"), "failed to rewrite deduplicated saved proposals");
            }
        }
        store.items = items;
        store
    }

    pub fn list(&self) -> &[SavedActivity] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&SavedActivity> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn find_by_title(&self, title: &str) -> Option<&SavedActivity> {
        self.items.iter().find(|item| item.detail.title == title)
    }

    pub fn is_saved(&self, title: &str) -> bool {
        self.find_by_title(title).is_some()
    }

    /// Saves `detail` at the front of the collection.
    ///
    /// Returns `None` without touching storage when the title is already saved.
    pub fn add(
        &mut self,
        detail: ActivityDetail,
        origin_label: Option<String>,
    ) -> Result<Option<SavedActivity>> {
        if self.is_saved(&detail.title) {
            debug!(title = %detail.title, "proposal already saved");
            return Ok(None);
        }

        let mut id = Uuid::new_v4().to_string();
        while self.get(&id).is_some() {
            id = Uuid::new_v4().to_string();
        }
        let saved = SavedActivity {
            detail,
            id,
            saved_at: Utc::now().timestamp_millis(),
            target_group_label: origin_label,
        };

        let mut next = Vec::with_capacity(self.items.len() + 1);
        next.push(saved.clone());
        next.extend(self.items.iter().cloned());
        self.commit(next)?;
        debug!(id = %saved.id, title = %saved.detail.title, "saved proposal");
        Ok(Some(saved))
    }

    /// Removes the entry with `id`; returns whether anything was removed.
    pub fn remove(&mut self, id: &str) -> Result<bool> {
        if self.get(id).is_none() {
            return Ok(false);
        }
        let next: Vec<SavedActivity> = self
            .items
            .iter()
            .filter(|item| item.id != id)
            .cloned()
            .collect();
        self.commit(next)?;
        debug!(id = %id, "removed proposal");
        Ok(true)
    }

    /// Replaces the content of the entry titled like `detail`, keeping its id,
    /// timestamp and origin label. Unsaved titles are left alone.
    pub fn update_by_title(&mut self, detail: &ActivityDetail) -> Result<bool> {
        let Some(position) = self
            .items
            .iter()
            .position(|item| item.detail.title == detail.title)
        else {
            return Ok(false);
        };
        let mut next = self.items.clone();
        next[position].detail = detail.clone();
        self.commit(next)?;
        debug!(title = %detail.title, "updated saved proposal");
        Ok(true)
    }

    /// Persists `next` in full, then adopts it. A failed write leaves memory unchanged.
    fn commit(&mut self, next: Vec<SavedActivity>) -> Result<()> {
        let raw = serde_json::to_string(&next).context("failed to encode saved proposals")?;
        self.backend
            .write(&self.key, &raw)
            .with_context(|| format!("failed to persist saved proposals under {}", self.key))?;
        self.items = next;
        Ok(())
    }
}

/// Keeps the first entry for every id and title; returns the kept entries and
/// how many were dropped.
fn dedupe(items: Vec<SavedActivity>) -> (Vec<SavedActivity>, usize) {
    let mut ids = HashSet::new();
    let mut titles = HashSet::new();
    let total = items.len();
    let mut kept = Vec::with_capacity(total);
    for item in items {
        if ids.contains(&item.id) || titles.contains(&item.detail.title) {
            continue;
        }
        ids.insert(item.id.clone());
        titles.insert(item.detail.title.clone());
        kept.push(item);
    }
    let dropped = total - kept.len();
    (kept, dropped)
}
