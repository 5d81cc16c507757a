use std::sync::Arc;

use async_openai::{
    error::OpenAIError,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use common::{
    error::AppError,
    storage::types::chatbot_config::{BotStatus, ChatbotConfig},
    utils::{config::AppConfig, embedding::EmbeddingClient},
};
use serde::{Deserialize, Serialize};
use tokio_retry::{
    strategy::{jitter, ExponentialBackoff},
    RetryIf,
};
use tracing::{error, warn};

use crate::vector_index::{ScoredRecord, VectorIndex};

/// Hard ceiling on a single visitor message, in characters.
pub const MAX_MESSAGE_CHARS: usize = 1000;
/// Only the most recent turns of the conversation are replayed to the model.
pub const MAX_HISTORY_TURNS: usize = 20;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One prior exchange turn, as submitted by the widget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

/// Runs the retrieval-augmented chat flow: validate the message, ground it in
/// the vector index, and hand persona plus context to the completion model.
#[derive(Clone)]
pub struct ChatOrchestrator {
    embedding: Arc<EmbeddingClient>,
    vector_index: VectorIndex,
    openai_client: Arc<Client<async_openai::config::OpenAIConfig>>,
    chat_model: String,
    top_k: usize,
}

impl ChatOrchestrator {
    pub fn new(
        embedding: Arc<EmbeddingClient>,
        vector_index: VectorIndex,
        openai_client: Arc<Client<async_openai::config::OpenAIConfig>>,
        config: &AppConfig,
    ) -> Self {
        Self {
            embedding,
            vector_index,
            openai_client,
            chat_model: config.chat_model.clone(),
            top_k: config.retrieval_top_k,
        }
    }

    pub async fn respond(
        &self,
        message: &str,
        history: &[ChatTurn],
        bot: &ChatbotConfig,
    ) -> Result<String, AppError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AppError::Validation("Message cannot be empty".to_string()));
        }
        if message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(AppError::Validation(format!(
                "Message exceeds the {MAX_MESSAGE_CHARS} character limit"
            )));
        }

        // A bot that is not live answers every message with its fallback
        // text instead of reaching the model.
        if bot.status != BotStatus::Active {
            return Ok(bot.fallback_response.clone());
        }

        let context = self.retrieve_context(message).await;
        let system_prompt = build_system_prompt(bot, &context);

        let mut messages: Vec<ChatCompletionRequestMessage> =
            vec![ChatCompletionRequestSystemMessageArgs::default()
                .content(system_prompt)
                .build()?
                .into()];

        let recent_turns = history
            .iter()
            .skip(history.len().saturating_sub(MAX_HISTORY_TURNS));
        for turn in recent_turns {
            let message: ChatCompletionRequestMessage = match turn.role {
                ChatRole::User => ChatCompletionRequestUserMessageArgs::default()
                    .content(turn.content.clone())
                    .build()?
                    .into(),
                ChatRole::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(turn.content.clone())
                    .build()?
                    .into(),
            };
            messages.push(message);
        }

        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(message.to_string())
                .build()?
                .into(),
        );

        let request = CreateChatCompletionRequestArgs::default()
            .model(self.chat_model.clone())
            .messages(messages)
            .temperature(bot.temperature())
            .max_tokens(bot.max_response_length.max_tokens())
            .build()?;

        let retry_strategy = ExponentialBackoff::from_millis(250).map(jitter).take(3);
        let response = RetryIf::spawn(
            retry_strategy,
            || async {
                self.openai_client
                    .chat()
                    .create(request.clone())
                    .await
            },
            is_rate_limited,
        )
        .await
        .map_err(map_provider_error)?;

        let answer = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or(AppError::Provider(
                "I'm sorry, I wasn't able to produce an answer. Please try again.".into(),
            ))?;

        Ok(answer)
    }

    /// Best-effort retrieval. Chat keeps working without context when the
    /// index or embedding provider is down; the prompt then steers the model
    /// toward its fallback behavior.
    async fn retrieve_context(&self, message: &str) -> Vec<ScoredRecord> {
        let query_vector = match self.embedding.embed(message).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!("Failed to embed chat message, answering without context: {e}");
                return Vec::new();
            }
        };

        match self.vector_index.query(query_vector, self.top_k, None).await {
            Ok(records) => records,
            Err(e) => {
                warn!("Vector query failed, answering without context: {e}");
                Vec::new()
            }
        }
    }
}

/// Assembles the persona, grounding rules, and retrieved context into the
/// system message.
pub fn build_system_prompt(bot: &ChatbotConfig, context: &[ScoredRecord]) -> String {
    let mut prompt = format!("You are {}, a {}.", bot.name, bot.role);

    if !bot.personality.trim().is_empty() {
        prompt.push_str(&format!(" Personality: {}", bot.personality.trim()));
    }
    if !bot.custom_instructions.trim().is_empty() {
        prompt.push('\n');
        prompt.push_str(bot.custom_instructions.trim());
    }

    prompt.push('\n');
    prompt.push_str(bot.response_style.tone_instruction());
    prompt.push(' ');
    prompt.push_str(bot.max_response_length.guidance());

    prompt.push_str(
        "\n\nOnly answer questions that can be answered from the knowledge base \
         excerpts below. If the question falls outside them, reply with: \"",
    );
    prompt.push_str(&bot.fallback_response);
    prompt.push_str("\" and invite the visitor to ask about covered topics instead.");

    if context.is_empty() {
        prompt.push_str(
            "\n\nNo knowledge base excerpts matched this question. Use the fallback reply.",
        );
    } else {
        prompt.push_str("\n\nKnowledge base excerpts:\n");
        for record in context {
            prompt.push_str(&format!(
                "\n[Source: {} (relevance {:.2})]\n{}\n",
                record.metadata.document_name, record.score, record.metadata.content
            ));
        }
        if bot.include_citations {
            prompt.push_str(
                "\nWhen you use an excerpt, cite its source document name in your answer.",
            );
        }
    }

    prompt
}

fn is_rate_limited(error: &OpenAIError) -> bool {
    match error {
        OpenAIError::ApiError(api) => {
            api.code.as_deref() == Some("rate_limit_exceeded")
                || api.message.to_lowercase().contains("rate limit")
        }
        _ => false,
    }
}

/// Maps provider failures to messages fit for the widget. The raw error goes
/// to the log, never to the visitor.
fn map_provider_error(error: OpenAIError) -> AppError {
    error!("Chat completion failed: {error}");

    let message = match &error {
        OpenAIError::ApiError(api) => {
            let code = api.code.as_deref().unwrap_or("");
            let lowered = api.message.to_lowercase();
            if code == "rate_limit_exceeded" || lowered.contains("rate limit") {
                "The assistant is handling a lot of questions right now. Please try again in a moment."
            } else if code == "context_length_exceeded" || lowered.contains("context length") {
                "That conversation has grown too long for me to follow. Please start a new chat."
            } else if code == "model_not_found" || lowered.contains("does not exist") {
                "The assistant is temporarily unavailable. Please try again later."
            } else {
                "I'm sorry, something went wrong while answering. Please try again."
            }
        }
        _ => "I'm sorry, something went wrong while answering. Please try again.",
    };

    AppError::Provider(message.to_string())
}
