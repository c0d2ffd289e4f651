//! Periodic background jobs.
//!
//! Jobs are registered once by the composition root and each runs on its own
//! tokio task. Every job must be idempotent: runs never overlap for a given
//! job, and a failed run is logged and retried on the next tick.
//!
//! ```ignore
//! let handles = Scheduler::new()
//!     .register("calendar_consistency", Duration::from_secs(86_400), move || {
//!         let repo = repo.clone();
//!         async move { ensure_all(repo.as_ref(), &definitions, year, 6).await.map_err(|e| e.error) }
//!     })
//!     .start();
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::metrics;

type JobFuture = Pin<Box<dyn Future<Output = anyhow::Result<usize>> + Send>>;
type JobFn = Arc<dyn Fn() -> JobFuture + Send + Sync>;

struct Job {
    name: &'static str,
    every: Duration,
    run: JobFn,
}

#[derive(Default)]
pub struct Scheduler {
    jobs: Vec<Job>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a job whose first run happens immediately on `start`.
    ///
    /// The job's output is the number of items it touched, for logging.
    pub fn register<F, Fut>(mut self, name: &'static str, every: Duration, job: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<usize>> + Send + 'static,
    {
        self.jobs.push(Job {
            name,
            every,
            run: Arc::new(move || Box::pin(job()) as JobFuture),
        });
        self
    }

    pub fn job_names(&self) -> Vec<&'static str> {
        self.jobs.iter().map(|job| job.name).collect()
    }

    /// Spawns one task per job. Abort the handles to stop them.
    pub fn start(self) -> Vec<JoinHandle<()>> {
        self.jobs
            .into_iter()
            .map(|job| tokio::spawn(run_job(job)))
            .collect()
    }
}

async fn run_job(job: Job) {
    info!(job = job.name, every_secs = job.every.as_secs(), "Starting scheduled job");

    let mut tick = interval(job.every);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tick.tick().await;
        debug!(job = job.name, "Running scheduled job");

        match (job.run)().await {
            Ok(count) => {
                metrics::track_scheduled_job_run(job.name, true);
                info!(job = job.name, count, "Scheduled job completed");
            }
            Err(e) => {
                metrics::track_scheduled_job_run(job.name, false);
                warn!(job = job.name, error = %e, "Scheduled job failed");
            }
        }
    }
}
