//! Shapes that cross the `Module` boundary in both directions: what a
//! caller supplies on write, and what `process_metadata` hands back to the
//! write pipeline for CMI indexing.

use crate::models::Metadata;

/// What `process_metadata` produces from `(content, user_metadata)`, per a
/// module's `ProcessingPolicy`. `metadata` is what gets persisted on the
/// memory row; `title`/`summary`/`keywords`/`categories`/`importance` are
/// exactly the fields CMI's `indexMemory` needs and nothing more.
#[derive(Debug, Clone)]
pub struct ProcessedMetadata {
    pub metadata: Metadata,
    pub title: String,
    pub summary: String,
    pub keywords: Vec<String>,
    pub categories: Vec<String>,
    pub importance: f32,
}

/// Caller-supplied update request. `None` fields are left untouched by the
/// module; `Some` fields replace (metadata is never merged).
#[derive(Debug, Clone, Default)]
pub struct UpdateRequest {
    pub content: Option<String>,
    pub metadata: Option<Metadata>,
}

impl UpdateRequest {
    pub fn is_noop(&self) -> bool {
        self.content.is_none() && self.metadata.is_none()
    }
}
