//! services/api/src/adapters/insight_llm.rs
//!
//! This module contains the adapter for the spending-insight LLM.
//! It implements the `InsightService` port from the `core` crate against any
//! OpenAI-compatible chat-completion endpoint.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use subtrack_core::{
    domain::SpendingItem,
    ports::{InsightService, PortError, PortResult},
};

const PROMPT_TEMPLATE: &str = r#"Analyze my following subscription data and provide:
1. A summary of total monthly and yearly spending.
2. 3 specific suggestions to save money (e.g., duplicate services, high-cost items).
3. An assessment of whether the spending is balanced across categories.

Data: {data}

Please provide the response in a structured Markdown format."#;

/// Builds the user prompt for a set of active subscriptions.
pub fn build_prompt(items: &[SpendingItem]) -> PortResult<String> {
    let data = serde_json::to_string(items).map_err(|e| PortError::Unexpected(e.to_string()))?;
    Ok(PROMPT_TEMPLATE.replace("{data}", &data))
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `InsightService`. The API key comes with each
/// request, so a client is built per call.
#[derive(Clone)]
pub struct OpenAiInsightAdapter {
    api_base: String,
    model: String,
}

impl OpenAiInsightAdapter {
    /// Creates a new `OpenAiInsightAdapter`.
    pub fn new(api_base: String, model: String) -> Self {
        Self { api_base, model }
    }

    fn client(&self, api_key: &str) -> Client<OpenAIConfig> {
        let config = OpenAIConfig::new()
            .with_api_base(self.api_base.clone())
            .with_api_key(api_key);
        Client::with_config(config)
    }
}

//=========================================================================================
// `InsightService` Trait Implementation
//=========================================================================================

#[async_trait]
impl InsightService for OpenAiInsightAdapter {
    /// Returns the model's answer verbatim, or an empty string if it sent none.
    async fn analyze_spending(&self, api_key: &str, items: &[SpendingItem]) -> PortResult<String> {
        let messages = vec![ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content(build_prompt(items)?)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?,
        )];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client(api_key)
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_projected_records() {
        let items = vec![SpendingItem {
            name: "Netflix".into(),
            price: "₹499".into(),
            cycle: "Monthly".into(),
            category: "Entertainment".into(),
        }];
        let prompt = build_prompt(&items).unwrap();
        assert!(prompt.contains(
            r#"Data: [{"name":"Netflix","price":"₹499","cycle":"Monthly","category":"Entertainment"}]"#
        ));
        assert!(prompt.starts_with("Analyze my following subscription data"));
    }
}
