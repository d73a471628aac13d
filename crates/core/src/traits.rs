use crate::error::CompletionError;
use crate::models::ChatTurn;
use async_trait::async_trait;

/// A remote model that answers an ordered list of conversation turns.
#[async_trait]
pub trait ChatBackend {
    async fn complete(&self, messages: &[ChatTurn]) -> Result<String, CompletionError>;
}
