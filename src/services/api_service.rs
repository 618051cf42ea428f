use crate::{api::{create_router, ApiState}, config::Config, database::Database};
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

pub struct ApiService {
    config: Config,
    database: Arc<Database>,
}

impl ApiService {
    pub async fn new(config: Config, database: Option<Arc<Database>>) -> Result<Self> {
        let database = match database {
            Some(database) => database,
            None => Arc::new(
                Database::connect(&config.database.url, config.database.max_connections).await?,
            ),
        };

        Ok(Self { config, database })
    }

    pub async fn start(&self) -> Result<()> {
        info!("🚀 启动API服务...");

        let api_state = ApiState::new(Arc::clone(&self.database));

        let app = create_router(api_state);
        let listener = tokio::net::TcpListener::bind(format!("{}:{}", self.config.server.host, self.config.server.port)).await?;

        info!("API Server starting on {}:{}", self.config.server.host, self.config.server.port);
        axum::serve(listener, app).await?;

        Ok(())
    }
}
