use std::collections::HashMap;

use crate::ConfigGroupRow;
use crate::ReleaseRow;
use crate::ReleaseType;

/// Builds valid, active, full release rows unless told otherwise.
pub struct ReleaseRowBuilder {
    row: ReleaseRow,
}

impl ReleaseRowBuilder {
    pub fn new(
        id: u64,
        namespace: &str,
        group: &str,
        file_name: &str,
    ) -> Self {
        Self {
            row: ReleaseRow {
                id,
                namespace: namespace.to_string(),
                group: group.to_string(),
                file_name: file_name.to_string(),
                name: format!("release-{}", id),
                version: 1,
                content: format!("{}#{}", file_name, id),
                content_hash: String::new(),
                release_type: ReleaseType::Full,
                active: true,
                valid: true,
                modify_time: 1,
                metadata: HashMap::new(),
            },
        }
    }

    pub fn name(
        mut self,
        name: &str,
    ) -> Self {
        self.row.name = name.to_string();
        self
    }

    pub fn version(
        mut self,
        version: u64,
    ) -> Self {
        self.row.version = version;
        self
    }

    pub fn modify_time(
        mut self,
        modify_time: u64,
    ) -> Self {
        self.row.modify_time = modify_time;
        self
    }

    pub fn content(
        mut self,
        content: &str,
    ) -> Self {
        self.row.content = content.to_string();
        self
    }

    pub fn gray(mut self) -> Self {
        self.row.release_type = ReleaseType::Gray;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.row.active = false;
        self
    }

    pub fn invalid(mut self) -> Self {
        self.row.valid = false;
        self
    }

    pub fn metadata(
        mut self,
        key: &str,
        value: &str,
    ) -> Self {
        self.row.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> ReleaseRow {
        self.row
    }
}

pub fn group_row(
    id: u64,
    namespace: &str,
    name: &str,
    modify_time: u64,
) -> ConfigGroupRow {
    ConfigGroupRow {
        id,
        namespace: namespace.to_string(),
        name: name.to_string(),
        comment: String::new(),
        owner: "admin".to_string(),
        business: String::new(),
        department: String::new(),
        metadata: HashMap::new(),
        revision: String::new(),
        valid: true,
        modify_time,
    }
}
