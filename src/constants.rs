// -
// Database namespaces

/// Sled database tree holding externalized release content
pub(crate) const CONTENT_TREE: &str = "_config_release_content";

/// Directory under the configured root for the content database
pub(crate) const CONTENT_DB_DIR: &str = "release_content";

/// Separator between owner key and slot key in content store keys
pub(crate) const CONTENT_KEY_SEPARATOR: u8 = 0;

/// Bounded retries when an active slot changes between metadata and content reads
pub(crate) const CONTENT_READ_ATTEMPTS: usize = 3;

/// Cache names, used as log fields and metric labels
pub const RELEASE_CACHE_NAME: &str = "config_release";
pub const GROUP_CACHE_NAME: &str = "config_group";
