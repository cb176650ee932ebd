use std::collections::HashMap;

use serde::Deserialize;
use serde::Serialize;

/// One row of a group delta batch as reported by the backing store.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfigGroupRow {
    pub id: u64,
    pub namespace: String,
    pub name: String,
    pub comment: String,
    pub owner: String,
    pub business: String,
    pub department: String,
    pub metadata: HashMap<String, String>,
    pub revision: String,
    pub valid: bool,
    pub modify_time: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigGroup {
    pub id: u64,
    pub namespace: String,
    pub name: String,
    pub comment: String,
    pub owner: String,
    pub business: String,
    pub department: String,
    pub metadata: HashMap<String, String>,
    pub revision: String,
    pub modify_time: u64,
}

impl From<ConfigGroupRow> for ConfigGroup {
    fn from(row: ConfigGroupRow) -> Self {
        ConfigGroup {
            id: row.id,
            namespace: row.namespace,
            name: row.name,
            comment: row.comment,
            owner: row.owner,
            business: row.business,
            department: row.department,
            metadata: row.metadata,
            revision: row.revision,
            modify_time: row.modify_time,
        }
    }
}
