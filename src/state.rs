//! Shared application state for all routes.

use crate::config::PagingConfig;
use crate::store::LibraryStore;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LibraryStore>,
    /// Bearer tokens accepted on resource routes.
    pub api_tokens: Arc<HashSet<String>>,
    pub paging: PagingConfig,
}

impl AppState {
    pub fn new(store: Arc<dyn LibraryStore>, api_tokens: impl IntoIterator<Item = String>, paging: PagingConfig) -> Self {
        AppState {
            store,
            api_tokens: Arc::new(api_tokens.into_iter().collect()),
            paging,
        }
    }
}
