//! Group Registry
//!
//! Owns every group in the process, by name.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use tracing::info;

use crate::error::{CacheError, Result};
use crate::group::{Group, Loader};

// == Group Registry ==
/// Name -> group map. Groups are only added through [`new_group`](Self::new_group)
/// and are never removed.
#[derive(Default)]
pub struct GroupRegistry {
    groups: RwLock<HashMap<String, Group>>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates and registers a group with a local cache of `cache_bytes`
    /// bytes (0 = unbounded).
    ///
    /// Fails if a group with the same name already exists.
    pub fn new_group<L>(&self, name: &str, cache_bytes: usize, loader: L) -> Result<Group>
    where
        L: Loader + 'static,
    {
        let mut groups = self.groups.write().unwrap_or_else(PoisonError::into_inner);
        if groups.contains_key(name) {
            return Err(CacheError::Configuration(format!(
                "group {} already exists",
                name
            )));
        }

        let group = Group::new(name, cache_bytes, Box::new(loader));
        groups.insert(name.to_string(), group.clone());
        info!(group = name, cache_bytes, "Group created");
        Ok(group)
    }

    /// Looks up a group by name.
    pub fn get_group(&self, name: &str) -> Option<Group> {
        self.groups
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Names of all registered groups, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .groups
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}
