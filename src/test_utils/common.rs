use std::sync::Arc;

use crate::ContentStore;
use crate::MemContentStore;

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    env_logger::init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
    println!("setup logger for unit test.");
}

pub fn mem_content_store() -> Arc<dyn ContentStore> {
    Arc::new(MemContentStore::new())
}
