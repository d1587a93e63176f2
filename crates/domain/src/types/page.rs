//! Pagination for list endpoints
//!
//! The service returns one page of items in the body and the total number of
//! matching items in a response header.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub offset: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { offset: 0, limit: DEFAULT_PAGE_LIMIT }
    }
}

impl PageRequest {
    /// Limit is clamped to `1..=MAX_PAGE_LIMIT`
    pub fn new(offset: u32, limit: u32) -> Self {
        Self { offset, limit: limit.clamp(1, MAX_PAGE_LIMIT) }
    }

    pub fn next(&self) -> Self {
        Self { offset: self.offset.saturating_add(self.limit), limit: self.limit }
    }

    pub fn query_pairs(&self) -> Vec<(String, String)> {
        vec![
            ("offset".to_string(), self.offset.to_string()),
            ("limit".to_string(), self.limit.to_string()),
        ]
    }
}

/// One page of a list result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total matching items across all pages
    pub total: u64,
    pub offset: u32,
}

impl<T> Page<T> {
    pub fn has_more(&self) -> bool {
        u64::from(self.offset) + (self.items.len() as u64) < self.total
    }
}
