use crate::models::{ChatTurn, DocumentRecord};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Uploaded documents keyed by filename.
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    records: BTreeMap<String, DocumentRecord>,
}

impl DocumentStore {
    /// Stores `record`, returning the one it replaced under the same filename.
    pub fn insert(&mut self, record: DocumentRecord) -> Option<DocumentRecord> {
        self.records.insert(record.filename.clone(), record)
    }

    pub fn remove(&mut self, filename: &str) -> Option<DocumentRecord> {
        self.records.remove(filename)
    }

    pub fn get(&self, filename: &str) -> Option<&DocumentRecord> {
        self.records.get(filename)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DocumentRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Per-user conversation and uploads; lives only in process memory.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    created_at: DateTime<Utc>,
    turns: Vec<ChatTurn>,
    documents: DocumentStore,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            turns: Vec::new(),
            documents: DocumentStore::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn push_turn(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
    }

    /// Empties the conversation. Uploaded documents are kept.
    pub fn clear_conversation(&mut self) {
        self.turns.clear();
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    pub fn insert_document(&mut self, record: DocumentRecord) -> Option<DocumentRecord> {
        self.documents.insert(record)
    }

    pub fn remove_document(&mut self, filename: &str) -> Option<DocumentRecord> {
        self.documents.remove(filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentFormat;

    fn record(filename: &str) -> DocumentRecord {
        DocumentRecord {
            filename: filename.to_string(),
            format: DocumentFormat::PlainText,
            text: "content".to_string(),
            checksum: "00".to_string(),
            size_bytes: 7,
            uploaded_at: Utc::now(),
        }
    }

    #[test]
    fn clearing_keeps_documents() {
        let mut session = Session::new();
        session.insert_document(record("notes.txt"));
        session.push_turn(ChatTurn::user("hi"));
        session.push_turn(ChatTurn::assistant("hello"));

        session.clear_conversation();

        assert!(session.turns().is_empty());
        assert_eq!(session.documents().len(), 1);
        assert!(session.documents().get("notes.txt").is_some());
    }

    #[test]
    fn reupload_replaces_record_with_same_name() {
        let mut session = Session::new();
        assert!(session.insert_document(record("a.txt")).is_none());
        assert!(session.insert_document(record("a.txt")).is_some());
        assert_eq!(session.documents().len(), 1);

        assert!(session.remove_document("a.txt").is_some());
        assert!(session.documents().is_empty());
        assert!(session.remove_document("a.txt").is_none());
    }

    #[test]
    fn sessions_do_not_share_identity() {
        assert_ne!(Session::new().id(), Session::new().id());
    }
}
