//! Favorites: item model, storage port and backends, and the persisted store.

pub(crate) mod favorite_item;
pub(crate) mod favorites_store;
pub(crate) mod storage;
