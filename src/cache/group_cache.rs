//! Mirror of configuration group metadata.
//!
//! Same delta pattern as the release cache without active slots: a group is
//! present or absent. One revision is kept per namespace.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;
use tracing::trace;

use super::revision::revision_of_tokens;
use super::BaseCache;
use super::FetchOutcome;
use super::Refreshable;
use crate::constants::GROUP_CACHE_NAME;
use crate::utils::pattern::match_metadata;
use crate::utils::pattern::match_name;
use crate::utils::pattern::paginate;
use crate::ConfigGroup;
use crate::ConfigGroupRow;
use crate::GroupFilter;
use crate::GroupSortField;
use crate::GroupStore;
use crate::Result;
use crate::SortOrder;

pub struct GroupCache {
    base: BaseCache,
    store: Arc<dyn GroupStore>,
    by_id: DashMap<u64, Arc<ConfigGroup>>,
    groups: DashMap<String, DashMap<String, Arc<ConfigGroup>>>,
    revisions: DashMap<String, String>,
}

impl std::fmt::Debug for GroupCache {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("GroupCache")
            .field("base", &self.base)
            .field("groups", &self.by_id.len())
            .finish()
    }
}

impl GroupCache {
    pub fn new(store: Arc<dyn GroupStore>) -> Self {
        Self {
            base: BaseCache::new(GROUP_CACHE_NAME),
            store,
            by_id: DashMap::new(),
            groups: DashMap::new(),
            revisions: DashMap::new(),
        }
    }

    pub fn base(&self) -> &BaseCache {
        &self.base
    }

    async fn fetch_and_apply(
        &self,
        first_load: bool,
        since: u64,
    ) -> Result<FetchOutcome> {
        let rows = self.store.fetch_group_deltas(first_load, since).await?;
        if rows.is_empty() {
            return Ok(FetchOutcome::empty());
        }

        let total = rows.len();
        let mut affected = HashSet::new();
        let mut max_modify_time = 0;
        for row in rows {
            max_modify_time = max_modify_time.max(row.modify_time);
            self.apply_row(row, &mut affected);
        }
        self.reload_revisions(&affected);

        Ok(FetchOutcome {
            rows: total,
            max_modify_time: Some(max_modify_time),
        })
    }

    fn apply_row(
        &self,
        row: ConfigGroupRow,
        affected: &mut HashSet<String>,
    ) {
        trace!(id = row.id, namespace = %row.namespace, name = %row.name, valid = row.valid, "apply group row");
        affected.insert(row.namespace.clone());

        if !row.valid {
            if let Some((_, prior)) = self.by_id.remove(&row.id) {
                affected.insert(prior.namespace.clone());
                self.unlink(&prior);
            }
            return;
        }

        // Replaced in place; readers see the old or the new group, never neither
        let group = Arc::new(ConfigGroup::from(row));
        let prior = self.by_id.insert(group.id, group.clone());
        self.groups
            .entry(group.namespace.clone())
            .or_default()
            .insert(group.name.clone(), group.clone());

        // A renamed or moved group leaves its old position afterwards
        if let Some(prior) = prior {
            if prior.namespace != group.namespace || prior.name != group.name {
                affected.insert(prior.namespace.clone());
                self.unlink(&prior);
            }
        }
    }

    fn unlink(
        &self,
        group: &ConfigGroup,
    ) {
        let emptied = match self.groups.get(&group.namespace) {
            Some(names) => {
                names.remove_if(&group.name, |_, g| g.id == group.id);
                names.is_empty()
            }
            None => false,
        };
        if emptied {
            self.groups.remove_if(&group.namespace, |_, names| names.is_empty());
        }
    }

    fn reload_revisions(
        &self,
        affected: &HashSet<String>,
    ) {
        for namespace in affected {
            let tokens: Vec<String> = match self.groups.get(namespace) {
                Some(names) => names
                    .iter()
                    .map(|g| format!("{}:{}:{}", g.name, g.id, g.modify_time))
                    .collect(),
                None => Vec::new(),
            };
            if tokens.is_empty() {
                self.revisions.remove(namespace);
            } else {
                let revision = revision_of_tokens(tokens);
                debug!(%namespace, %revision, "namespace group revision reloaded");
                self.revisions.insert(namespace.clone(), revision);
            }
        }
    }

    /// Groups of one namespace sorted by name, with the namespace revision.
    pub fn list_groups(
        &self,
        namespace: &str,
    ) -> (Vec<Arc<ConfigGroup>>, String) {
        let mut groups: Vec<Arc<ConfigGroup>> = match self.groups.get(namespace) {
            Some(names) => names.iter().map(|g| g.value().clone()).collect(),
            None => Vec::new(),
        };
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        (groups, self.revision(namespace))
    }

    pub fn revision(
        &self,
        namespace: &str,
    ) -> String {
        self.revisions
            .get(namespace)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    pub fn get_group(
        &self,
        namespace: &str,
        name: &str,
    ) -> Option<Arc<ConfigGroup>> {
        let names = self.groups.get(namespace)?;
        let found = names.get(name).map(|g| g.value().clone());
        found
    }

    pub fn get_group_by_id(
        &self,
        id: u64,
    ) -> Option<Arc<ConfigGroup>> {
        self.by_id.get(&id).map(|g| g.value().clone())
    }

    /// Filtered, sorted and paginated scan. Forces a consistent refresh first.
    pub async fn query(
        &self,
        filter: &GroupFilter,
    ) -> Result<(u32, Vec<Arc<ConfigGroup>>)> {
        self.update_consistent().await?;

        let mut found: Vec<Arc<ConfigGroup>> = Vec::new();
        for names in self.groups.iter() {
            if !match_name(&filter.namespace, names.key()) {
                continue;
            }
            found.extend(
                names
                    .value()
                    .iter()
                    .filter(|g| {
                        match_name(&filter.name, &g.name)
                            && match_name(&filter.business, &g.business)
                            && match_name(&filter.department, &g.department)
                            && match_metadata(&filter.metadata, &g.metadata)
                    })
                    .map(|g| g.value().clone()),
            );
        }

        found.sort_by(|a, b| {
            let ord = match filter.order_field {
                GroupSortField::Name => a.name.cmp(&b.name),
                GroupSortField::ModifyTime => a.modify_time.cmp(&b.modify_time),
            }
            .then(a.id.cmp(&b.id));
            match filter.order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });

        let total = found.len() as u32;
        Ok((total, paginate(&found, filter.offset, filter.limit)))
    }

    pub fn group_count(&self) -> usize {
        self.by_id.len()
    }

    /// Group count per namespace.
    pub fn namespace_sizes(&self) -> Vec<(String, usize)> {
        self.groups
            .iter()
            .map(|n| (n.key().clone(), n.value().len()))
            .collect()
    }
}

#[async_trait]
impl Refreshable for GroupCache {
    fn name(&self) -> &'static str {
        self.base.name()
    }

    async fn update(&self) -> Result<bool> {
        self.base
            .update(|first_load, since| self.fetch_and_apply(first_load, since))
            .await
    }

    fn clear(&self) -> Result<()> {
        self.by_id.clear();
        self.groups.clear();
        self.revisions.clear();
        self.base.reset();
        Ok(())
    }
}
