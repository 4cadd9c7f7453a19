//! Null Store Module
//!
//! Always-miss store used when caching is disabled.

use std::time::Duration;

use async_trait::async_trait;

use crate::cache::{Store, StoreKind};

/// Store that keeps nothing: reads miss, writes report failure.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

impl NullStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Store for NullStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Null
    }

    async fn get(&self, _key: &str) -> Option<String> {
        None
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Option<Duration>) -> bool {
        false
    }

    async fn delete(&self, _key: &str) -> bool {
        false
    }

    async fn exists(&self, _key: &str) -> bool {
        false
    }

    async fn clear(&self) -> bool {
        true
    }

    async fn size(&self) -> usize {
        0
    }
}
