use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::types::document_chunk::deserialize_flexible_id;
use crate::{error::AppError, storage::db::SurrealDbClient};

pub const MAX_CREATIVITY_LEVEL: u8 = 100;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStyle {
    #[default]
    Professional,
    Friendly,
    Casual,
    Technical,
}

impl ResponseStyle {
    pub const fn tone_instruction(self) -> &'static str {
        match self {
            Self::Professional => "Answer in a professional, courteous tone.",
            Self::Friendly => "Answer in a warm, friendly tone.",
            Self::Casual => "Answer in a relaxed, conversational tone.",
            Self::Technical => "Answer precisely, using technical vocabulary where appropriate.",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResponseLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl ResponseLength {
    /// Completion token budget per length setting. This is a policy table,
    /// not a formula; the exact values are load-bearing for consistent
    /// behavior across deployments.
    pub const fn max_tokens(self) -> u32 {
        match self {
            Self::Short => 60,
            Self::Medium => 300,
            Self::Long => 800,
        }
    }

    pub const fn guidance(self) -> &'static str {
        match self {
            Self::Short => "Keep answers to one or two sentences.",
            Self::Medium => "Keep answers to a short paragraph.",
            Self::Long => "Answers may span several paragraphs when the material calls for it.",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BotStatus {
    Active,
    Paused,
    #[default]
    Draft,
}

/// Singleton chatbot configuration, stored under a fixed record id so the
/// "earliest created wins" rule holds trivially. The chat orchestrator
/// requires this record; there is no hardcoded fallback persona.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatbotConfig {
    #[serde(deserialize_with = "deserialize_flexible_id")]
    pub id: String,
    pub name: String,
    pub description: String,
    pub personality: String,
    pub role: String,
    pub custom_instructions: String,
    pub response_style: ResponseStyle,
    pub max_response_length: ResponseLength,
    pub creativity_level: u8,
    pub fallback_response: String,
    pub include_citations: bool,
    pub status: BotStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<String>,
}

/// Partial update accepted by the configuration endpoint. Absent fields keep
/// their current values.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct ChatbotConfigPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub personality: Option<String>,
    pub role: Option<String>,
    pub custom_instructions: Option<String>,
    pub response_style: Option<ResponseStyle>,
    pub max_response_length: Option<ResponseLength>,
    pub creativity_level: Option<u8>,
    pub fallback_response: Option<String>,
    pub include_citations: Option<bool>,
    pub status: Option<BotStatus>,
}

/// Public projection served by the unauthenticated status endpoint. Never
/// expose the full configuration here.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PublicStatus {
    pub current_status: BotStatus,
    pub chatbot_name: String,
    pub description: String,
}

impl Default for ChatbotConfig {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: "current".to_string(),
            name: "Assistant".to_string(),
            description: String::new(),
            personality: String::new(),
            role: "support assistant".to_string(),
            custom_instructions: String::new(),
            response_style: ResponseStyle::default(),
            max_response_length: ResponseLength::default(),
            creativity_level: 50,
            fallback_response: "I'm sorry, I can only help with questions about our documentation."
                .to_string(),
            include_citations: false,
            status: BotStatus::default(),
            created_at: now,
            updated_at: now,
            updated_by: None,
        }
    }
}

impl ChatbotConfig {
    /// Temperature handed to the completion provider, derived directly from
    /// the 0-100 creativity slider.
    pub fn temperature(&self) -> f32 {
        f32::from(self.creativity_level.min(MAX_CREATIVITY_LEVEL)) / 100.0
    }

    pub fn public_status(&self) -> PublicStatus {
        PublicStatus {
            current_status: self.status,
            chatbot_name: self.name.clone(),
            description: self.description.clone(),
        }
    }

    pub async fn get_current(db: &SurrealDbClient) -> Result<Self, AppError> {
        let config: Option<Self> = db
            .client
            .query("SELECT * FROM type::thing('chatbot_config', 'current')")
            .await?
            .take(0)?;

        config.ok_or(AppError::NotFound("Chatbot is not configured yet".into()))
    }

    /// Merges a partial update into the singleton row, creating it on first
    /// write. Stamps the updater identity and timestamp.
    pub async fn update(
        db: &SurrealDbClient,
        patch: ChatbotConfigPatch,
        updated_by: &str,
    ) -> Result<Self, AppError> {
        let mut config = match Self::get_current(db).await {
            Ok(existing) => existing,
            Err(AppError::NotFound(_)) => Self::default(),
            Err(err) => return Err(err),
        };

        config.apply(patch)?;
        config.updated_at = Utc::now();
        config.updated_by = Some(updated_by.to_string());

        let updated: Option<Self> = db
            .client
            .query("UPSERT type::thing('chatbot_config', 'current') CONTENT $config RETURN AFTER")
            .bind(("config", config))
            .await?
            .take(0)?;

        updated.ok_or(AppError::Internal(
            "Something went wrong updating the chatbot configuration".into(),
        ))
    }

    fn apply(&mut self, patch: ChatbotConfigPatch) -> Result<(), AppError> {
        if let Some(level) = patch.creativity_level {
            if level > MAX_CREATIVITY_LEVEL {
                return Err(AppError::Validation(format!(
                    "creativity_level must be between 0 and {MAX_CREATIVITY_LEVEL}"
                )));
            }
            self.creativity_level = level;
        }
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(personality) = patch.personality {
            self.personality = personality;
        }
        if let Some(role) = patch.role {
            self.role = role;
        }
        if let Some(custom_instructions) = patch.custom_instructions {
            self.custom_instructions = custom_instructions;
        }
        if let Some(response_style) = patch.response_style {
            self.response_style = response_style;
        }
        if let Some(max_response_length) = patch.max_response_length {
            self.max_response_length = max_response_length;
        }
        if let Some(fallback_response) = patch.fallback_response {
            self.fallback_response = fallback_response;
        }
        if let Some(include_citations) = patch.include_citations {
            self.include_citations = include_citations;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_max_tokens_policy_table() {
        assert_eq!(ResponseLength::Short.max_tokens(), 60);
        assert_eq!(ResponseLength::Medium.max_tokens(), 300);
        assert_eq!(ResponseLength::Long.max_tokens(), 800);
    }

    #[test]
    fn test_temperature_derivation() {
        let mut config = ChatbotConfig::default();
        config.creativity_level = 0;
        assert!((config.temperature() - 0.0).abs() < f32::EPSILON);
        config.creativity_level = 100;
        assert!((config.temperature() - 1.0).abs() < f32::EPSILON);
        config.creativity_level = 35;
        assert!((config.temperature() - 0.35).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_get_current_without_config_is_not_found() {
        let db = SurrealDbClient::memory("test_ns", &Uuid::new_v4().to_string())
            .await
            .expect("Failed to start in-memory surrealdb");

        let result = ChatbotConfig::get_current(&db).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_creates_then_merges_singleton() {
        let db = SurrealDbClient::memory("test_ns", &Uuid::new_v4().to_string())
            .await
            .expect("Failed to start in-memory surrealdb");

        let patch = ChatbotConfigPatch {
            name: Some("Docsy".to_string()),
            status: Some(BotStatus::Active),
            ..Default::default()
        };
        let created = ChatbotConfig::update(&db, patch, "owner")
            .await
            .expect("Failed to create config");
        assert_eq!(created.name, "Docsy");
        assert_eq!(created.status, BotStatus::Active);
        assert_eq!(created.updated_by.as_deref(), Some("owner"));

        // A second partial update must keep untouched fields.
        let patch = ChatbotConfigPatch {
            creativity_level: Some(80),
            ..Default::default()
        };
        let merged = ChatbotConfig::update(&db, patch, "owner")
            .await
            .expect("Failed to merge config");
        assert_eq!(merged.name, "Docsy");
        assert_eq!(merged.creativity_level, 80);

        let current = ChatbotConfig::get_current(&db)
            .await
            .expect("Failed to read config");
        assert_eq!(current.creativity_level, 80);
    }

    #[tokio::test]
    async fn test_update_rejects_out_of_range_creativity() {
        let db = SurrealDbClient::memory("test_ns", &Uuid::new_v4().to_string())
            .await
            .expect("Failed to start in-memory surrealdb");

        let patch = ChatbotConfigPatch {
            creativity_level: Some(140),
            ..Default::default()
        };
        let result = ChatbotConfig::update(&db, patch, "owner").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_public_status_is_a_narrow_projection() {
        let config = ChatbotConfig {
            name: "Docsy".to_string(),
            description: "Answers product questions".to_string(),
            status: BotStatus::Active,
            ..Default::default()
        };

        let status = config.public_status();
        assert_eq!(status.chatbot_name, "Docsy");
        assert_eq!(status.current_status, BotStatus::Active);

        let as_json = serde_json::to_value(&status).expect("serialization failed");
        let object = as_json.as_object().expect("expected object");
        assert_eq!(object.len(), 3, "status payload must stay minimal");
        assert!(!object.contains_key("custom_instructions"));
    }
}
