use crate::{
    ChatMessage, ChatProvider, LookupOutcome, MediaKind, MetadataLookup, ProviderError,
    ToolDefinition,
};

#[derive(Debug, Default)]
pub struct NoopProvider;

#[async_trait::async_trait]
impl ChatProvider for NoopProvider {
    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _tools: &[ToolDefinition],
    ) -> Result<ChatMessage, ProviderError> {
        Err(ProviderError::NotImplemented)
    }
}

#[async_trait::async_trait]
impl MetadataLookup for NoopProvider {
    async fn search(&self, _query: &str, _kind: MediaKind) -> Result<LookupOutcome, ProviderError> {
        Ok(LookupOutcome::NotFound)
    }
}
