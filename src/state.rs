use std::sync::Arc;

use campus_config::{CalendarConfig, CorsConfig, RepositoryBackend, ServerConfig};
use campus_db::{DbConfig, init_db_pool};

use crate::modules::academic_calendar::repository::{
    AcademicEventRepository, InMemoryAcademicEventRepository, PgAcademicEventRepository,
};
use crate::modules::program_tree::repository::{
    InMemoryProgramTreeRepository, PgProgramTreeRepository, ProgramTreeRepository,
};

#[derive(Clone)]
pub struct AppState {
    pub calendars: Arc<dyn AcademicEventRepository>,
    pub program_tree: Arc<dyn ProgramTreeRepository>,
    pub cors_config: CorsConfig,
    pub calendar_config: CalendarConfig,
}

impl AppState {
    /// State backed by process-local repositories.
    pub fn in_memory(cors_config: CorsConfig, calendar_config: CalendarConfig) -> Self {
        Self {
            calendars: Arc::new(InMemoryAcademicEventRepository::new()),
            program_tree: Arc::new(InMemoryProgramTreeRepository::new()),
            cors_config,
            calendar_config,
        }
    }
}

pub async fn init_app_state(server_config: &ServerConfig) -> anyhow::Result<AppState> {
    let cors_config = CorsConfig::from_env();
    let calendar_config = CalendarConfig::from_env();

    match server_config.backend {
        RepositoryBackend::Memory => {
            tracing::warn!("Using in-memory repositories, data is lost on restart");
            Ok(AppState::in_memory(cors_config, calendar_config))
        }
        RepositoryBackend::Postgres => {
            let db_config = DbConfig::from_env()
                .map_err(|e| anyhow::anyhow!("DATABASE_URL must be set: {e}"))?;
            let db = init_db_pool(&db_config).await?;
            sqlx::migrate!("./migrations").run(&db).await?;

            Ok(AppState {
                calendars: Arc::new(PgAcademicEventRepository::new(db.clone())),
                program_tree: Arc::new(PgProgramTreeRepository::new(db)),
                cors_config,
                calendar_config,
            })
        }
    }
}
