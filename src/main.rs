use chrono::Local;
use dotenvy::dotenv;
use tracing::{error, info};

use campus::campus_config::ServerConfig;
use campus::logging::{init_tracing, shutdown_tracer};
use campus::metrics::init_metrics;
use campus::modules::academic_calendar::consistency::{default_definitions, ensure_all};
use campus::router::init_router;
use campus::scheduler::Scheduler;
use campus::state::{AppState, init_app_state};

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_tracing();

    if let Err(e) = run().await {
        error!(error = %e, "Server stopped");
        shutdown_tracer();
        std::process::exit(1);
    }

    shutdown_tracer();
}

async fn run() -> anyhow::Result<()> {
    let server_config = ServerConfig::from_env();
    let state = init_app_state(&server_config).await?;

    let jobs = if state.calendar_config.scheduler_enabled {
        calendar_scheduler(&state).start()
    } else {
        info!("Scheduler disabled");
        Vec::new()
    };

    let app = init_router(state, init_metrics());

    let address = server_config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Server running on http://{}", address);
    info!("Swagger UI available at http://{}/swagger-ui", address);
    info!("Scalar UI available at http://{}/scalar", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    for job in jobs {
        job.abort();
    }
    Ok(())
}

fn calendar_scheduler(state: &AppState) -> Scheduler {
    let repo = state.calendars.clone();
    let config = state.calendar_config.clone();
    let every = config.consistency_interval;

    Scheduler::new().register("calendar_consistency", every, move || {
        let repo = repo.clone();
        let config = config.clone();
        async move {
            let current_year = config.current_academic_year(Local::now().date_naive());
            ensure_all(
                repo.as_ref(),
                &default_definitions(),
                current_year,
                config.horizon_years,
            )
            .await
            .map_err(|e| e.error)
        }
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}
