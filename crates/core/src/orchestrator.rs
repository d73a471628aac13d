use crate::context::build_messages;
use crate::error::ExtractError;
use crate::extractor::DocumentExtractor;
use crate::ingest::{digest_bytes, persist_upload, upload_file_name};
use crate::models::{ChatTurn, DocumentFormat, DocumentRecord};
use crate::session::Session;
use crate::traits::ChatBackend;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Runs one interaction at a time against a caller-owned [`Session`].
pub struct ChatCoordinator<B>
where
    B: ChatBackend,
{
    backend: B,
    extractor: DocumentExtractor,
    workdir: PathBuf,
    system_prompt: String,
}

impl<B> ChatCoordinator<B>
where
    B: ChatBackend + Send + Sync,
{
    pub fn new(
        backend: B,
        extractor: DocumentExtractor,
        workdir: impl Into<PathBuf>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            extractor,
            workdir: workdir.into(),
            system_prompt: system_prompt.into(),
        }
    }

    /// Persists an upload, extracts its text and records it in the session.
    ///
    /// Extraction failures do not fail the upload: the record holds the
    /// diagnostic text instead. Only an unusable name or a failed write to
    /// the working directory is an error.
    pub async fn upload(
        &self,
        session: &mut Session,
        raw_name: &str,
        bytes: &[u8],
    ) -> Result<DocumentRecord, ExtractError> {
        let filename = upload_file_name(raw_name)?;
        let format = DocumentFormat::from_path(Path::new(&filename));
        let stored_at = persist_upload(&self.workdir, &filename, bytes).await?;

        let extension = Path::new(&filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        let text = self.extractor.extract_text(&stored_at, extension).await;

        let record = DocumentRecord {
            filename,
            format,
            text,
            checksum: digest_bytes(bytes),
            size_bytes: bytes.len() as u64,
            uploaded_at: Utc::now(),
        };

        info!(
            session_id = %session.id(),
            filename = %record.filename,
            format = %record.format,
            size_bytes = record.size_bytes,
            chars = record.text.chars().count(),
            "document uploaded"
        );

        if session.insert_document(record.clone()).is_some() {
            warn!(filename = %record.filename, "replaced previously uploaded document");
        }
        Ok(record)
    }

    pub async fn upload_path(
        &self,
        session: &mut Session,
        path: &Path,
    ) -> Result<DocumentRecord, ExtractError> {
        let bytes = tokio::fs::read(path).await?;
        let raw_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| ExtractError::MissingFileName(path.display().to_string()))?;
        self.upload(session, raw_name, &bytes).await
    }

    /// Sends `user_message` with the session's history and documents, records
    /// both turns and returns the reply. Endpoint failures become the reply text.
    pub async fn send(&self, session: &mut Session, user_message: &str) -> String {
        let messages = build_messages(
            session.turns(),
            session.documents().iter(),
            user_message,
            &self.system_prompt,
        );

        let reply = match self.backend.complete(&messages).await {
            Ok(reply) => reply,
            Err(error) => {
                warn!(
                    session_id = %session.id(),
                    error = %error,
                    "reply replaced by error message"
                );
                error.user_message()
            }
        };

        session.push_turn(ChatTurn::user(user_message));
        session.push_turn(ChatTurn::assistant(reply.clone()));
        reply
    }

    pub fn clear(&self, session: &mut Session) {
        info!(session_id = %session.id(), turns = session.turns().len(), "conversation cleared");
        session.clear_conversation();
    }

    /// Forgets the record and deletes the upload persisted for it.
    pub async fn remove_document(
        &self,
        session: &mut Session,
        filename: &str,
    ) -> Option<DocumentRecord> {
        let removed = session.remove_document(filename)?;

        let stored_at = self.workdir.join(&removed.filename);
        match tokio::fs::remove_file(&stored_at).await {
            Ok(()) => {}
            Err(error) if error.kind() == ErrorKind::NotFound => {}
            Err(error) => {
                warn!(path = %stored_at.display(), error = %error, "stored upload not deleted")
            }
        }

        info!(session_id = %session.id(), %filename, "document removed");
        Some(removed)
    }
}
