use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use uuid::Uuid;

use campus::campus_config::CalendarConfig;
use campus::campus_db::{DbConfig, PgPool, init_db_pool};
use campus::campus_models::EducationGroupYearId;
use campus::modules::academic_calendar::consistency::{default_definitions, ensure_all};
use campus::modules::academic_calendar::repository::PgAcademicEventRepository;
use campus::modules::program_tree::repository::PgProgramTreeRepository;
use campus::modules::program_tree::service::ProgramTreeService;

#[derive(Parser)]
#[command(name = "campus-cli")]
#[command(about = "Campus CLI - Administrative tools for the Campus rules service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the missing recurring calendar windows
    EnsureCalendars {
        /// First academic year to cover (defaults to the current one)
        #[arg(short = 'y', long)]
        year: Option<i32>,

        /// Years generated ahead of the first one
        #[arg(long)]
        horizon: Option<i32>,
    },
    /// Run the database migrations
    Migrate,
    /// Print the adjacency list below the given roots
    CheckTree {
        /// Root group ids
        #[arg(short = 'r', long = "root", required = true)]
        roots: Vec<Uuid>,
    },
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let cli = Cli::parse();

    if let Err(e) = run(cli.command).await {
        eprintln!("\n❌ {:#}", e);
        std::process::exit(1);
    }
}

async fn run(command: Commands) -> anyhow::Result<()> {
    let db_config = DbConfig::from_env().context("DATABASE_URL must be set")?;
    let pool = init_db_pool(&db_config)
        .await
        .context("Failed to connect to database")?;

    match command {
        Commands::EnsureCalendars { year, horizon } => {
            handle_ensure_calendars(pool, year, horizon).await
        }
        Commands::Migrate => handle_migrate(&pool).await,
        Commands::CheckTree { roots } => handle_check_tree(pool, roots).await,
    }
}

async fn handle_ensure_calendars(
    pool: PgPool,
    year: Option<i32>,
    horizon: Option<i32>,
) -> anyhow::Result<()> {
    let config = CalendarConfig::from_env();
    let current_year =
        year.unwrap_or_else(|| config.current_academic_year(Local::now().date_naive()));
    let horizon = horizon.unwrap_or(config.horizon_years);
    let repo = PgAcademicEventRepository::new(pool);

    let created = ensure_all(&repo, &default_definitions(), current_year, horizon)
        .await
        .map_err(|e| e.error)?;

    println!(
        "✅ Calendars consistent for {}..={} ({} events created)",
        current_year,
        current_year + horizon,
        created
    );
    Ok(())
}

async fn handle_migrate(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    println!("✅ Migrations applied");
    Ok(())
}

async fn handle_check_tree(pool: PgPool, roots: Vec<Uuid>) -> anyhow::Result<()> {
    let repo = PgProgramTreeRepository::new(pool);
    let root_ids: Vec<EducationGroupYearId> = roots.into_iter().map(Into::into).collect();

    let rows = ProgramTreeService::adjacency_list(&repo, &root_ids)
        .await
        .map_err(|e| e.error)?;

    for row in &rows {
        let block = row.block.map(|block| block.block_repr()).unwrap_or_default();
        println!(
            "{:>2} {:<4} {:<13} {}{}",
            row.level,
            row.order,
            block,
            "  ".repeat(row.level as usize),
            row.path
        );
    }
    println!("\n{} links below {} root(s)", rows.len(), root_ids.len());
    Ok(())
}
