use std::sync::Arc;

use crate::api_client::ApiClient;
use crate::auth::jwt::JwtKeys;
use crate::config::AppConfig;
use crate::db::{self, Db};
use crate::logging::obfuscate_email;
use crate::tasks::{JobContext, TaskRunner};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn Db>,
    pub config: Arc<AppConfig>,
    pub jwt: JwtKeys,
    pub tasks: TaskRunner,
}

impl AppState {
    pub async fn init(config: Arc<AppConfig>) -> anyhow::Result<Self> {
        let db = db::connect(&config).await?;
        Self::from_parts(Arc::new(db), config)
    }

    /// Wires the token keys, outbound client and task runner around a store.
    pub fn from_parts(db: Arc<dyn Db>, config: Arc<AppConfig>) -> anyhow::Result<Self> {
        let api = ApiClient::new(&config)?;
        let tasks = TaskRunner::start(
            JobContext {
                db: db.clone(),
                api,
                log_email_chars: config.log_email_visible_chars(),
            },
            &config.tasks,
        );

        Ok(Self {
            jwt: JwtKeys::new(&config.jwt),
            db,
            config,
            tasks,
        })
    }

    /// Email as it may appear in logs for this environment.
    pub fn masked_email(&self, email: &str) -> String {
        obfuscate_email(email, self.config.log_email_visible_chars())
    }

    /// In-memory store, providers pointed at `api_base`.
    #[cfg(test)]
    pub fn fake(api_base: &str) -> Self {
        let config = Arc::new(AppConfig::for_tests(api_base));
        Self::from_parts(Arc::new(db::memory::MemoryDb::default()), config)
            .expect("fake state")
    }
}
