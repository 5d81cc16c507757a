use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    sync::Arc,
};

use async_openai::{types::CreateEmbeddingRequestArgs, Client};
use tracing::debug;

use crate::{error::AppError, utils::config::AppConfig};

/// Client for turning text into fixed-dimension vectors.
///
/// The OpenAI backend talks to the configured embedding model; the hashed
/// backend is deterministic and offline, used by tests and local smoke runs.
#[derive(Clone)]
pub struct EmbeddingClient {
    inner: EmbeddingInner,
}

#[derive(Clone)]
enum EmbeddingInner {
    OpenAI {
        client: Arc<Client<async_openai::config::OpenAIConfig>>,
        model: String,
        dimensions: u32,
    },
    Hashed {
        dimension: usize,
    },
}

impl EmbeddingClient {
    pub fn new_openai(
        client: Arc<Client<async_openai::config::OpenAIConfig>>,
        config: &AppConfig,
    ) -> Result<Self, AppError> {
        if config.openai_api_key.trim().is_empty() {
            return Err(AppError::Config(
                "openai_api_key is not set; embeddings cannot be generated".into(),
            ));
        }

        Ok(EmbeddingClient {
            inner: EmbeddingInner::OpenAI {
                client,
                model: config.embedding_model.clone(),
                dimensions: config.embedding_dimensions,
            },
        })
    }

    pub fn new_hashed(dimension: usize) -> Self {
        EmbeddingClient {
            inner: EmbeddingInner::Hashed {
                dimension: dimension.max(1),
            },
        }
    }

    pub fn backend_label(&self) -> &'static str {
        match self.inner {
            EmbeddingInner::Hashed { .. } => "hashed",
            EmbeddingInner::OpenAI { .. } => "openai",
        }
    }

    pub fn dimension(&self) -> usize {
        match &self.inner {
            EmbeddingInner::Hashed { dimension } => *dimension,
            EmbeddingInner::OpenAI { dimensions, .. } => *dimensions as usize,
        }
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, AppError> {
        let mut vectors = self.embed_batch(vec![text.to_owned()]).await?;
        vectors
            .pop()
            .ok_or(AppError::Provider("No embedding data received".into()))
    }

    /// Embeds a batch of texts, preserving order 1:1 with the input.
    ///
    /// Callers zip the result back onto its source chunks by position, so the
    /// positional coupling here is load-bearing.
    pub async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, AppError> {
        match &self.inner {
            EmbeddingInner::Hashed { dimension } => Ok(texts
                .into_iter()
                .map(|text| hashed_embedding(&text, *dimension))
                .collect()),
            EmbeddingInner::OpenAI {
                client,
                model,
                dimensions,
            } => {
                if texts.is_empty() {
                    return Ok(Vec::new());
                }
                let expected = texts.len();

                let request = CreateEmbeddingRequestArgs::default()
                    .model(model.clone())
                    .input(texts)
                    .dimensions(*dimensions)
                    .build()?;

                let response = client.embeddings().create(request).await?;

                // The provider tags each embedding with its input index; sort
                // on it rather than trusting response ordering.
                let mut data = response.data;
                data.sort_by_key(|item| item.index);
                if data.len() != expected {
                    return Err(AppError::Provider(format!(
                        "Embedding response had {} vectors for {expected} inputs",
                        data.len()
                    )));
                }

                let embeddings: Vec<Vec<f32>> =
                    data.into_iter().map(|item| item.embedding).collect();

                debug!(
                    batch_size = expected,
                    dimension = embeddings.first().map_or(0, Vec::len),
                    "Generated embedding batch"
                );

                Ok(embeddings)
            }
        }
    }
}

// Helper functions for hashed embeddings
fn hashed_embedding(text: &str, dimension: usize) -> Vec<f32> {
    let dim = dimension.max(1);
    let mut vector = vec![0.0f32; dim];
    if text.is_empty() {
        return vector;
    }

    for token in tokens(text) {
        let idx = bucket(&token, dim);
        vector[idx] += 1.0;
    }

    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in &mut vector {
            *value /= norm;
        }
    }

    vector
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_ascii_lowercase())
}

fn bucket(token: &str, dimension: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    token.hash(&mut hasher);
    (hasher.finish() as usize) % dimension
}
