use crate::llm::AnalysisOutcome;
use crate::types::{DocumentType, ParsedDocument};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// One uploaded document and its parse result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: Uuid,
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
    pub file_size: u64,
    pub content_hash: String,
    pub parsed: ParsedDocument,
}

/// Listing row; omits the parsed content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub id: Uuid,
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
    pub document_type: DocumentType,
    pub confidence_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAnalysis {
    pub id: Uuid,
    pub document_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub outcome: AnalysisOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub documents: usize,
    pub analyses: usize,
}

/// Keyed store for parsed documents and their analyses.
///
/// No eviction or persistence; implementations only guarantee that each
/// call sees a consistent snapshot.
pub trait DocumentStore: Send + Sync {
    fn insert_document(&self, filename: &str, content: &[u8], parsed: ParsedDocument) -> StoredDocument;
    fn get_document(&self, id: &Uuid) -> Option<StoredDocument>;
    /// Earliest upload first
    fn list_documents(&self) -> Vec<DocumentEntry>;
    fn find_by_hash(&self, content_hash: &str) -> Option<StoredDocument>;
    /// Removes the document and every analysis of it. Returns whether it existed.
    fn delete_document(&self, id: &Uuid) -> bool;

    /// `None` when `document_id` is not stored
    fn insert_analysis(&self, document_id: &Uuid, outcome: AnalysisOutcome) -> Option<StoredAnalysis>;
    fn get_analysis(&self, id: &Uuid) -> Option<StoredAnalysis>;
    fn analyses_for(&self, document_id: &Uuid) -> Vec<StoredAnalysis>;

    fn stats(&self) -> StoreStats;
}

#[derive(Default)]
struct StoreState {
    documents: HashMap<Uuid, StoredDocument>,
    analyses: HashMap<Uuid, StoredAnalysis>,
}

/// `RwLock`-guarded in-memory implementation.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the maps half-updated,
    // so a poisoned lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DocumentStore for InMemoryStore {
    fn insert_document(&self, filename: &str, content: &[u8], parsed: ParsedDocument) -> StoredDocument {
        let stored = StoredDocument {
            id: Uuid::new_v4(),
            filename: filename.to_string(),
            uploaded_at: Utc::now(),
            file_size: content.len() as u64,
            content_hash: calculate_content_hash(content),
            parsed,
        };
        self.write().documents.insert(stored.id, stored.clone());
        tracing::debug!(document_id = %stored.id, filename, "document stored");
        stored
    }

    fn get_document(&self, id: &Uuid) -> Option<StoredDocument> {
        self.read().documents.get(id).cloned()
    }

    fn list_documents(&self) -> Vec<DocumentEntry> {
        let mut entries: Vec<DocumentEntry> = self
            .read()
            .documents
            .values()
            .map(|doc| DocumentEntry {
                id: doc.id,
                filename: doc.filename.clone(),
                uploaded_at: doc.uploaded_at,
                document_type: doc.parsed.document_type,
                confidence_score: doc.parsed.confidence_score,
            })
            .collect();
        entries.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at).then(a.id.cmp(&b.id)));
        entries
    }

    fn find_by_hash(&self, content_hash: &str) -> Option<StoredDocument> {
        self.read()
            .documents
            .values()
            .find(|doc| doc.content_hash == content_hash)
            .cloned()
    }

    fn delete_document(&self, id: &Uuid) -> bool {
        let mut state = self.write();
        let existed = state.documents.remove(id).is_some();
        if existed {
            state.analyses.retain(|_, analysis| analysis.document_id != *id);
        }
        existed
    }

    fn insert_analysis(&self, document_id: &Uuid, outcome: AnalysisOutcome) -> Option<StoredAnalysis> {
        let mut state = self.write();
        if !state.documents.contains_key(document_id) {
            return None;
        }
        let stored = StoredAnalysis {
            id: Uuid::new_v4(),
            document_id: *document_id,
            created_at: Utc::now(),
            outcome,
        };
        state.analyses.insert(stored.id, stored.clone());
        Some(stored)
    }

    fn get_analysis(&self, id: &Uuid) -> Option<StoredAnalysis> {
        self.read().analyses.get(id).cloned()
    }

    fn analyses_for(&self, document_id: &Uuid) -> Vec<StoredAnalysis> {
        let mut analyses: Vec<StoredAnalysis> = self
            .read()
            .analyses
            .values()
            .filter(|analysis| analysis.document_id == *document_id)
            .cloned()
            .collect();
        analyses.sort_by_key(|analysis| analysis.created_at);
        analyses
    }

    fn stats(&self) -> StoreStats {
        let state = self.read();
        StoreStats {
            documents: state.documents.len(),
            analyses: state.analyses.len(),
        }
    }
}

/// SHA-256 over the whole upload, hex encoded
pub fn calculate_content_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}
