use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::*;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Settings;
use crate::database::entities::story_jobs;
use crate::errors::{GenerationError, StoryError};
use crate::generation::StoryGenerator;
use crate::services::StoryService;
use crate::story::JobStatus;

/// Hooks for job lifecycle events
#[async_trait]
pub trait JobObserver: Send + Sync {
    async fn job_queued(&self, job_id: &str, theme: &str);
    async fn job_started(&self, job_id: &str);
    async fn job_completed(&self, job_id: &str, story_id: i32);
    async fn job_failed(&self, job_id: &str, error: &str);
}

/// Default observer that logs to the tracing subscriber
pub struct LoggingJobObserver;

#[async_trait]
impl JobObserver for LoggingJobObserver {
    async fn job_queued(&self, job_id: &str, theme: &str) {
        info!("[{}] Job queued for theme '{}'", job_id, theme);
    }

    async fn job_started(&self, job_id: &str) {
        info!("[{}] Generating story", job_id);
    }

    async fn job_completed(&self, job_id: &str, story_id: i32) {
        info!("[{}] ✓ Story {} ready", job_id, story_id);
    }

    async fn job_failed(&self, job_id: &str, error: &str) {
        error!("[{}] ✗ Story generation failed: {}", job_id, error);
    }
}

/// Work item handed from the HTTP side to the worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueuedJob {
    pub job_id: String,
    pub session_id: String,
    pub theme: String,
}

/// What `submit` gives back: the freshly created job row.
#[derive(Clone, Debug)]
pub struct JobHandle {
    pub job: story_jobs::Model,
}

impl JobHandle {
    pub fn job_id(&self) -> &str {
        &self.job.job_id
    }
}

/// Sending side of the job queue.
#[derive(Clone)]
pub struct JobQueue {
    sender: mpsc::UnboundedSender<QueuedJob>,
}

/// Receiving side of the job queue, consumed by exactly one [`JobWorker`].
pub struct JobReceiver {
    receiver: mpsc::UnboundedReceiver<QueuedJob>,
}

pub fn job_queue() -> (JobQueue, JobReceiver) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (JobQueue { sender }, JobReceiver { receiver })
}

impl JobQueue {
    fn push(&self, job: QueuedJob) -> Result<(), QueuedJob> {
        self.sender.send(job).map_err(|err| err.0)
    }
}

/// Creates jobs and answers status queries. Never waits for generation.
#[derive(Clone)]
pub struct StoryJobService {
    db: DatabaseConnection,
    queue: JobQueue,
    observer: Arc<dyn JobObserver>,
}

impl StoryJobService {
    pub fn new(db: DatabaseConnection, queue: JobQueue) -> Self {
        Self::with_observer(db, queue, Arc::new(LoggingJobObserver))
    }

    pub fn with_observer(
        db: DatabaseConnection,
        queue: JobQueue,
        observer: Arc<dyn JobObserver>,
    ) -> Self {
        Self {
            db,
            queue,
            observer,
        }
    }

    /// Creates the queue and spawns its worker.
    pub fn start(
        db: DatabaseConnection,
        generator: Arc<dyn StoryGenerator>,
        settings: &Settings,
    ) -> (Self, JoinHandle<()>) {
        let (queue, receiver) = job_queue();
        let observer: Arc<dyn JobObserver> = Arc::new(LoggingJobObserver);
        let worker = JobWorker::new(
            db.clone(),
            generator,
            observer.clone(),
            settings.generation_timeout,
            settings.max_concurrent_jobs,
        );
        let handle = worker.spawn(receiver);
        (Self::with_observer(db, queue, observer), handle)
    }

    /// Records a pending job and enqueues it.
    pub async fn submit(&self, session_id: &str, theme: &str) -> Result<JobHandle, StoryError> {
        let job_id = Uuid::new_v4().to_string();

        let job = story_jobs::ActiveModel {
            job_id: Set(job_id.clone()),
            session_id: Set(session_id.to_string()),
            theme: Set(theme.to_string()),
            status: Set(JobStatus::Pending.into()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        self.observer.job_queued(&job_id, theme).await;

        let queued = QueuedJob {
            job_id: job_id.clone(),
            session_id: session_id.to_string(),
            theme: theme.to_string(),
        };

        if self.queue.push(queued).is_err() {
            // No worker left to run it; fail now rather than leave it pending forever.
            let message = "job queue is closed";
            mark_failed(&self.db, &job_id, JobStatus::Pending, message).await?;
            self.observer.job_failed(&job_id, message).await;
            let job = self.get_job(&job_id).await?;
            return Ok(JobHandle { job });
        }

        Ok(JobHandle { job })
    }

    pub async fn get_job(&self, job_id: &str) -> Result<story_jobs::Model, StoryError> {
        story_jobs::Entity::find()
            .filter(story_jobs::Column::JobId.eq(job_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| StoryError::JobNotFound(job_id.to_string()))
    }

    pub async fn list_session_jobs(
        &self,
        session_id: &str,
    ) -> Result<Vec<story_jobs::Model>, StoryError> {
        story_jobs::Entity::find()
            .filter(story_jobs::Column::SessionId.eq(session_id))
            .order_by_desc(story_jobs::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }
}

/// Consumes queued jobs and runs each exactly once.
#[derive(Clone)]
pub struct JobWorker {
    db: DatabaseConnection,
    stories: StoryService,
    generator: Arc<dyn StoryGenerator>,
    observer: Arc<dyn JobObserver>,
    timeout: Duration,
    permits: Arc<Semaphore>,
}

impl JobWorker {
    pub fn new(
        db: DatabaseConnection,
        generator: Arc<dyn StoryGenerator>,
        observer: Arc<dyn JobObserver>,
        timeout: Duration,
        max_concurrent_jobs: usize,
    ) -> Self {
        Self {
            stories: StoryService::new(db.clone()),
            db,
            generator,
            observer,
            timeout,
            permits: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
        }
    }

    /// Spawns the dispatch loop. It ends once every [`JobQueue`] is dropped.
    pub fn spawn(self, receiver: JobReceiver) -> JoinHandle<()> {
        tokio::spawn(self.run(receiver))
    }

    pub async fn run(self, mut receiver: JobReceiver) {
        info!(
            "Story job worker started ({} generator, {} concurrent jobs, {}s timeout)",
            self.generator.name(),
            self.permits.available_permits(),
            self.timeout.as_secs()
        );

        while let Some(job) = receiver.receiver.recv().await {
            let permit = match self.permits.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            let worker = self.clone();
            tokio::spawn(async move {
                let _permit = permit;
                let job_id = job.job_id.clone();

                let execution = tokio::spawn({
                    let worker = worker.clone();
                    async move { worker.execute(job).await }
                });

                match execution.await {
                    Ok(Ok(status)) => debug!("[{}] Finished with status {}", job_id, status),
                    Ok(Err(e)) => error!("[{}] Could not record job outcome: {}", job_id, e),
                    Err(join_err) => {
                        let message = format!("story generation aborted: {}", join_err);
                        worker.fail_current(&job_id, &message).await;
                    }
                }
            });
        }

        info!("Story job worker stopped");
    }

    /// Runs one job through `processing` into a terminal state.
    pub async fn execute(&self, job: QueuedJob) -> Result<JobStatus, StoryError> {
        if !mark_processing(&self.db, &job.job_id).await? {
            warn!("[{}] Job is no longer pending, skipping", job.job_id);
            return self.current_status(&job.job_id).await;
        }
        self.observer.job_started(&job.job_id).await;

        match self.generate_and_store(&job).await {
            Ok(story_id) => {
                if !mark_completed(&self.db, &job.job_id, story_id).await? {
                    // Nothing will ever reference the story; drop it.
                    match self.stories.delete_story(story_id).await {
                        Ok(_) => warn!(
                            "[{}] Job left processing before story {} was attached; story deleted",
                            job.job_id, story_id
                        ),
                        Err(e) => warn!(
                            "[{}] Job left processing before story {} was attached; could not delete it: {}",
                            job.job_id, story_id, e
                        ),
                    }
                    return self.current_status(&job.job_id).await;
                }
                self.observer.job_completed(&job.job_id, story_id).await;
                Ok(JobStatus::Completed)
            }
            Err(e) => {
                let message = e.to_string();
                if !mark_failed(&self.db, &job.job_id, JobStatus::Processing, &message).await? {
                    warn!("[{}] Job left processing before its failure was recorded", job.job_id);
                    return self.current_status(&job.job_id).await;
                }
                self.observer.job_failed(&job.job_id, &message).await;
                Ok(JobStatus::Failed)
            }
        }
    }

    async fn generate_and_store(&self, job: &QueuedJob) -> Result<i32, GenerationError> {
        let generated = tokio::time::timeout(self.timeout, self.generator.generate(&job.theme))
            .await
            .map_err(|_| GenerationError::Timeout(self.timeout.as_secs()))??;

        generated.validate()?;

        let story = self
            .stories
            .save_generated_story(&job.session_id, &generated)
            .await
            .map_err(|e| match e {
                StoryError::Database(db_err) => GenerationError::Storage(db_err),
                other => GenerationError::InvalidStory(other.to_string()),
            })?;

        Ok(story.id)
    }

    async fn current_status(&self, job_id: &str) -> Result<JobStatus, StoryError> {
        story_jobs::Entity::find()
            .filter(story_jobs::Column::JobId.eq(job_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| StoryError::JobNotFound(job_id.to_string()))?
            .get_status()
    }

    /// Fails a job whose task died, from whichever non-terminal state it is in.
    async fn fail_current(&self, job_id: &str, message: &str) {
        for from in [JobStatus::Processing, JobStatus::Pending] {
            match mark_failed(&self.db, job_id, from, message).await {
                Ok(true) => {
                    self.observer.job_failed(job_id, message).await;
                    return;
                }
                Ok(false) => continue,
                Err(e) => {
                    error!("[{}] Could not mark job failed: {}", job_id, e);
                    return;
                }
            }
        }
    }
}

/// Fails every job left non-terminal by a previous run. Their queue
/// entries died with that process, so nothing would ever pick them up.
pub async fn fail_interrupted_jobs(db: &DatabaseConnection) -> Result<u64, StoryError> {
    let result = story_jobs::Entity::update_many()
        .set(story_jobs::ActiveModel {
            status: Set(JobStatus::Failed.into()),
            error: Set(Some("interrupted by server restart".to_string())),
            completed_at: Set(Some(Utc::now())),
            ..Default::default()
        })
        .filter(
            story_jobs::Column::Status
                .is_in([JobStatus::Pending.as_str(), JobStatus::Processing.as_str()]),
        )
        .exec(db)
        .await?;

    if result.rows_affected > 0 {
        warn!("Marked {} interrupted job(s) as failed", result.rows_affected);
    }
    Ok(result.rows_affected)
}

async fn mark_processing(db: &DatabaseConnection, job_id: &str) -> Result<bool, StoryError> {
    let update = story_jobs::ActiveModel {
        status: Set(JobStatus::Processing.into()),
        ..Default::default()
    };
    transition(db, job_id, JobStatus::Pending, JobStatus::Processing, update).await
}

async fn mark_completed(
    db: &DatabaseConnection,
    job_id: &str,
    story_id: i32,
) -> Result<bool, StoryError> {
    let update = story_jobs::ActiveModel {
        status: Set(JobStatus::Completed.into()),
        story_id: Set(Some(story_id)),
        completed_at: Set(Some(Utc::now())),
        ..Default::default()
    };
    transition(db, job_id, JobStatus::Processing, JobStatus::Completed, update).await
}

async fn mark_failed(
    db: &DatabaseConnection,
    job_id: &str,
    from: JobStatus,
    message: &str,
) -> Result<bool, StoryError> {
    let update = story_jobs::ActiveModel {
        status: Set(JobStatus::Failed.into()),
        error: Set(Some(message.to_string())),
        completed_at: Set(Some(Utc::now())),
        ..Default::default()
    };
    transition(db, job_id, from, JobStatus::Failed, update).await
}

/// Compare-and-set on the status column. Returns whether the row moved.
async fn transition(
    db: &DatabaseConnection,
    job_id: &str,
    from: JobStatus,
    to: JobStatus,
    update: story_jobs::ActiveModel,
) -> Result<bool, StoryError> {
    from.transition(to)?;

    let result = story_jobs::Entity::update_many()
        .set(update)
        .filter(story_jobs::Column::JobId.eq(job_id))
        .filter(story_jobs::Column::Status.eq(from.as_str()))
        .exec(db)
        .await?;

    Ok(result.rows_affected == 1)
}
