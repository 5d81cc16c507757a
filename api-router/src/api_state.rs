use std::sync::Arc;

use common::{
    storage::db::SurrealDbClient,
    utils::{config::AppConfig, embedding::EmbeddingClient},
};
use ingestion_pipeline::IngestionPipeline;
use retrieval_pipeline::{ChatOrchestrator, VectorIndex};

#[derive(Clone)]
pub struct ApiState {
    pub db: Arc<SurrealDbClient>,
    pub config: AppConfig,
    pub embedding: Arc<EmbeddingClient>,
    pub vector_index: VectorIndex,
    pub ingestion: Arc<IngestionPipeline>,
    pub chat: Arc<ChatOrchestrator>,
}

impl ApiState {
    pub async fn new(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let db = Arc::new(
            SurrealDbClient::new(
                &config.surrealdb_address,
                &config.surrealdb_username,
                &config.surrealdb_password,
                &config.surrealdb_namespace,
                &config.surrealdb_database,
            )
            .await?,
        );

        let dimension = config.embedding_dimensions as usize;
        db.ensure_initialized(dimension).await?;

        let openai_config = async_openai::config::OpenAIConfig::new()
            .with_api_key(config.openai_api_key.clone())
            .with_api_base(config.openai_base_url.clone());
        let openai_client = Arc::new(async_openai::Client::with_config(openai_config));

        let embedding = Arc::new(EmbeddingClient::new_openai(
            Arc::clone(&openai_client),
            &config,
        )?);
        let vector_index = VectorIndex::new(Arc::clone(&db), dimension);
        let ingestion = Arc::new(IngestionPipeline::new(
            Arc::clone(&db),
            Arc::clone(&embedding),
            vector_index.clone(),
            &config,
        ));
        let chat = Arc::new(ChatOrchestrator::new(
            Arc::clone(&embedding),
            vector_index.clone(),
            openai_client,
            &config,
        ));

        Ok(ApiState {
            db,
            config,
            embedding,
            vector_index,
            ingestion,
            chat,
        })
    }
}
