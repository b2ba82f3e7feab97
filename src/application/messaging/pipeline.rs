//! Pipeline - Ordered background execution of non-interactive commands
//!
//! Each bot owns one pipeline, and each pipeline owns exactly one worker
//! task. Jobs are taken from an unbounded queue in submission order and run
//! one at a time, so a slow job delays only the jobs queued behind it in the
//! same channel.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};

use crate::application::bot::Bot;
use crate::application::errors::PipelineError;
use crate::domain::entities::{Command, Request};
use super::shell::{execute_isolated, report_failure};

/// A queued command invocation
pub struct Job {
    pub sequence: u64,
    pub command: Arc<dyn Command>,
    pub request: Request,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Default)]
struct WorkerStats {
    queued: AtomicUsize,
    processed: AtomicU64,
    busy: AtomicBool,
}

/// Per-channel FIFO job queue with a single worker
pub struct Pipeline {
    channel_id: String,
    sender: mpsc::UnboundedSender<Job>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<Job>>>,
    shutdown: watch::Sender<bool>,
    sequence: AtomicU64,
    stats: Arc<WorkerStats>,
    exited: Arc<watch::Sender<bool>>,
}

/// Flags the worker as gone when dropped, even if its task is aborted
struct ExitSignal(Arc<watch::Sender<bool>>);

impl Drop for ExitSignal {
    fn drop(&mut self) {
        self.0.send_replace(true);
    }
}

impl Pipeline {
    pub fn new(channel_id: impl Into<String>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (shutdown, _) = watch::channel(false);
        let (exited, _) = watch::channel(false);

        Self {
            channel_id: channel_id.into(),
            sender,
            receiver: Mutex::new(Some(receiver)),
            shutdown,
            sequence: AtomicU64::new(0),
            stats: Arc::new(WorkerStats::default()),
            exited: Arc::new(exited),
        }
    }

    /// Spawn the worker task; must be called from within a tokio runtime
    pub fn start(&self, bot: Weak<Bot>) -> Result<(), PipelineError> {
        let receiver = self
            .receiver
            .lock()
            .map_err(|_| PipelineError::AlreadyStarted)?
            .take()
            .ok_or(PipelineError::AlreadyStarted)?;

        tokio::spawn(work(
            self.channel_id.clone(),
            receiver,
            self.shutdown.subscribe(),
            bot,
            self.stats.clone(),
            ExitSignal(self.exited.clone()),
        ));
        Ok(())
    }

    /// Append a job to the queue; never blocks
    ///
    /// Returns the submission sequence number of the job.
    pub fn submit(&self, command: Arc<dyn Command>, request: Request) -> Result<u64, PipelineError> {
        if self.is_stopped() {
            return Err(PipelineError::Stopped);
        }

        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let job = Job {
            sequence,
            command,
            request,
            submitted_at: Utc::now(),
        };

        self.stats.queued.fetch_add(1, Ordering::SeqCst);
        if self.sender.send(job).is_err() {
            self.stats.queued.fetch_sub(1, Ordering::SeqCst);
            return Err(PipelineError::Stopped);
        }
        Ok(sequence)
    }

    /// Let the job in flight finish, then stop; queued jobs are discarded
    pub fn stop(&self) {
        let was_stopped = self.shutdown.send_replace(true);
        if !was_stopped {
            tracing::debug!(channel_id = %self.channel_id, "Stopping pipeline");
        }
    }

    /// Wait for the worker task to exit
    ///
    /// Any number of callers may wait at once. Returns immediately when the
    /// worker was never started.
    pub async fn join(&self) {
        if !self.is_started() {
            return;
        }
        let mut exited = self.exited.subscribe();
        if exited.wait_for(|gone| *gone).await.is_err() {
            tracing::error!(channel_id = %self.channel_id, "Lost track of pipeline worker");
        }
    }

    fn is_started(&self) -> bool {
        self.receiver
            .lock()
            .map(|receiver| receiver.is_none())
            .unwrap_or(true)
    }

    /// True once the worker has been started and has exited
    pub fn is_finished(&self) -> bool {
        self.is_started() && *self.exited.borrow()
    }

    pub fn is_stopped(&self) -> bool {
        *self.shutdown.borrow()
    }

    pub fn is_busy(&self) -> bool {
        self.stats.busy.load(Ordering::SeqCst)
    }

    /// Jobs submitted but not started yet
    pub fn pending(&self) -> usize {
        self.stats.queued.load(Ordering::SeqCst)
    }

    /// Jobs run to completion, successful or not
    pub fn processed(&self) -> u64 {
        self.stats.processed.load(Ordering::SeqCst)
    }
}

async fn work(
    channel_id: String,
    mut jobs: mpsc::UnboundedReceiver<Job>,
    mut shutdown: watch::Receiver<bool>,
    bot: Weak<Bot>,
    stats: Arc<WorkerStats>,
    _exit: ExitSignal,
) {
    tracing::info!(channel_id = %channel_id, "Starting worker");
    let mut discarded = 0usize;

    loop {
        if *shutdown.borrow() {
            break;
        }

        let job = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            job = jobs.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };
        stats.queued.fetch_sub(1, Ordering::SeqCst);

        // stop() may have been called while this job was being dequeued
        if *shutdown.borrow() {
            tracing::debug!(channel_id = %channel_id, sequence = job.sequence, "Discarding job");
            discarded += 1;
            break;
        }

        let Some(owner) = bot.upgrade() else {
            break;
        };

        stats.busy.store(true, Ordering::SeqCst);
        process(&owner, job).await;
        drop(owner);
        stats.busy.store(false, Ordering::SeqCst);
        stats.processed.fetch_add(1, Ordering::SeqCst);
    }

    jobs.close();
    while jobs.try_recv().is_ok() {
        discarded += 1;
    }
    stats.queued.store(0, Ordering::SeqCst);

    tracing::info!(
        channel_id = %channel_id,
        processed = stats.processed.load(Ordering::SeqCst),
        discarded,
        "Worker has been stopped"
    );
}

async fn process(bot: &Arc<Bot>, job: Job) {
    let keyword = job.command.keyword().to_string();
    tracing::debug!(
        channel_id = %bot.channel_id(),
        sequence = job.sequence,
        keyword = %keyword,
        waited_ms = (Utc::now() - job.submitted_at).num_milliseconds(),
        "Worker is working on job"
    );

    if let Err(e) = execute_isolated(bot.clone(), job.command, job.request).await {
        report_failure(bot, &keyword, &e);
    }
}
