pub mod cleaning;
pub mod completion;
pub mod config;
pub mod context;
pub mod docx;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod models;
pub mod ocr;
pub mod orchestrator;
pub mod session;
pub mod traits;

pub use cleaning::{clean_text, normalize_whitespace, snippet};
pub use completion::ChatCompletionClient;
pub use config::{
    AppConfig, CompletionConfig, ExtractorConfig, API_KEY_VAR, DEFAULT_SYSTEM_PROMPT,
};
pub use context::{build_messages, CATALOG_SNIPPET_CHARS, MENTION_SNIPPET_CHARS};
pub use error::{CompletionError, ConfigError, ExtractError};
pub use extractor::{decode_text, DocumentExtractor, LopdfExtractor, PageText, PdfExtractor};
pub use ingest::{digest_bytes, persist_upload, upload_file_name};
pub use models::{ChatRole, ChatTurn, CompletionOptions, DocumentFormat, DocumentRecord};
pub use ocr::OcrEngine;
pub use orchestrator::ChatCoordinator;
pub use session::{DocumentStore, Session};
pub use traits::ChatBackend;
