//! Link configuration store.
//!
//! The store is the authoritative copy of every link configuration. The
//! resolver only needs point lookups by short code; the API needs the rest.

mod memory;
mod sqlite;

pub use memory::MemoryLinkStore;
pub use sqlite::SqliteLinkStore;

use async_trait::async_trait;

use crate::{
    error::StoreError,
    models::{LinkConfig, LinkFields},
    shortcode,
};

pub type Result<T> = std::result::Result<T, StoreError>;

/// How many fresh short codes are tried before a collision is reported.
pub const MAX_CODE_ATTEMPTS: usize = 3;

#[async_trait]
pub trait LinkStore: Send + Sync + 'static {
    /// Fetch a single link by its short code.
    async fn find_by_code(&self, short_code: &str) -> Result<Option<LinkConfig>>;

    /// Fetch a single link by its store-assigned id.
    async fn find_by_id(&self, id: i64) -> Result<Option<LinkConfig>>;

    /// Insert a new link under `short_code`. Returns
    /// [`StoreError::Duplicate`] when the code is already taken.
    async fn insert(&self, short_code: &str, fields: &LinkFields) -> Result<LinkConfig>;

    /// Replace the mutable fields of an existing link. The short code is
    /// never changed. Returns `None` when no link has this id.
    async fn update(&self, id: i64, fields: &LinkFields) -> Result<Option<LinkConfig>>;

    /// All links, newest first.
    async fn list(&self) -> Result<Vec<LinkConfig>>;
}

/// Insert a link under a freshly generated short code, regenerating on
/// collision up to [`MAX_CODE_ATTEMPTS`] times.
pub async fn create_link(store: &dyn LinkStore, fields: &LinkFields) -> Result<LinkConfig> {
    create_link_with(store, fields, shortcode::generate).await
}

async fn create_link_with(
    store: &dyn LinkStore,
    fields: &LinkFields,
    mut next_code: impl FnMut() -> String + Send,
) -> Result<LinkConfig> {
    let mut last_err = None;
    for attempt in 1..=MAX_CODE_ATTEMPTS {
        let code = next_code();
        match store.insert(&code, fields).await {
            Ok(link) => return Ok(link),
            Err(StoreError::Duplicate(code)) => {
                tracing::warn!(attempt, short_code = %code, "Short code collision, regenerating");
                last_err = Some(StoreError::Duplicate(code));
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| StoreError::Duplicate(String::new())))
}
