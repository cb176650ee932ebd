use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReleaseSortField {
    #[default]
    Name,
    ModifyTime,
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupSortField {
    #[default]
    Name,
    ModifyTime,
}

/// Filter for `query_releases`. Empty name fields match everything and a
/// trailing `*` turns a field into a prefix match.
#[derive(Debug, Clone, Default)]
pub struct ReleaseFilter {
    pub namespace: String,
    pub group: String,
    pub file_name: String,
    pub name: String,
    /// Gray releases are left out unless this is set
    pub include_gray: bool,
    pub only_active: bool,
    pub metadata: HashMap<String, String>,
    pub order_field: ReleaseSortField,
    pub order: SortOrder,
    pub offset: u32,
    pub limit: u32,
}

/// Filter for group `query`.
#[derive(Debug, Clone, Default)]
pub struct GroupFilter {
    pub namespace: String,
    pub name: String,
    pub business: String,
    pub department: String,
    pub metadata: HashMap<String, String>,
    pub order_field: GroupSortField,
    pub order: SortOrder,
    pub offset: u32,
    pub limit: u32,
}
