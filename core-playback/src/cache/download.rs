//! # Download Manager
//!
//! Schedules and executes background fetches of remote media into the
//! cache store. One live job per track id: concurrent requests for the
//! same id attach to the existing job instead of starting a second
//! transfer. Jobs beyond the concurrency limit wait on a semaphore in
//! `Queued` state.
//!
//! Execution streams bytes into a `.part` temp file while hashing
//! incrementally; only a complete, verified transfer is atomically
//! renamed into place and indexed (promotion). Failures are published on
//! the event bus and never retried here; retry is a caller decision.

use crate::cache::store::{cache_file_name, CacheStore};
use crate::error::{EngineError, Result};
use crate::resolver::stream_request_headers;
use bridge_traits::{FileSystemAccess, HttpClient, HttpRequest};
use core_catalog::{CachedMedia, Track, TrackId};
use core_runtime::events::{DownloadEvent, DownloadStatus, EngineEvent, EventBus};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Read-buffer size for the transfer loop.
const CHUNK_SIZE: usize = 16 * 1024;

/// Handle to a live (or attached) download job.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    /// Unique id of this job, for logging and correlation.
    pub job_id: Uuid,
    /// The track being fetched.
    pub track_id: TrackId,
    cancel: CancellationToken,
}

impl DownloadJob {
    fn new(track_id: TrackId) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            track_id,
            cancel: CancellationToken::new(),
        }
    }

    /// Ask the transfer to stop; partial bytes are discarded.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns `true` once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Outcome of a single transfer attempt.
enum TransferOutcome {
    Complete(CachedMedia),
    Cancelled,
}

/// Background download scheduler and executor.
///
/// Sole writer of the cache store; progress is observable only through
/// `DownloadEvent::Progress` on the event bus.
pub struct DownloadManager {
    http: Arc<dyn HttpClient>,
    fs: Arc<dyn FileSystemAccess>,
    store: Arc<CacheStore>,
    event_bus: EventBus,
    semaphore: Arc<Semaphore>,
    timeout: Duration,
    auth_token: Option<String>,
    jobs: Mutex<HashMap<TrackId, DownloadJob>>,
}

impl DownloadManager {
    pub fn new(
        http: Arc<dyn HttpClient>,
        fs: Arc<dyn FileSystemAccess>,
        store: Arc<CacheStore>,
        event_bus: EventBus,
        max_concurrent: usize,
        timeout: Duration,
        auth_token: Option<String>,
    ) -> Self {
        Self {
            http,
            fs,
            store,
            event_bus,
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            timeout,
            auth_token,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Request a background download for `track`.
    ///
    /// If a job for the id is already queued or active, the existing job
    /// is returned and the caller observes it through the shared progress
    /// events. If the track is already cached, a `Complete` progress
    /// event is published immediately and no transfer starts.
    #[instrument(skip(self, track), fields(track_id = %track.id))]
    pub async fn request_download(self: &Arc<Self>, track: &Track) -> Result<DownloadJob> {
        if let Some(record) = self.store.lookup(&track.id).await {
            debug!("Track already cached; reporting completion");
            self.publish(
                &track.id,
                record.size_bytes,
                Some(record.size_bytes),
                DownloadStatus::Complete,
            );
            return Ok(DownloadJob::new(track.id.clone()));
        }

        let mut jobs = self.jobs.lock().await;
        if let Some(existing) = jobs.get(&track.id) {
            debug!(job = %existing.job_id, "Attaching to in-flight download");
            return Ok(existing.clone());
        }

        let job = DownloadJob::new(track.id.clone());
        jobs.insert(track.id.clone(), job.clone());
        drop(jobs);

        info!(job = %job.job_id, "Scheduling download");
        self.publish(&track.id, 0, None, DownloadStatus::Queued);

        let manager = Arc::clone(self);
        let task_job = job.clone();
        let task_track = track.clone();
        tokio::spawn(async move {
            manager.run_job(task_track, task_job).await;
        });

        Ok(job)
    }

    /// Cooperatively cancel a queued or active job.
    ///
    /// Returns `false` when no live job exists for the id.
    #[instrument(skip(self))]
    pub async fn cancel(&self, track_id: &TrackId) -> bool {
        let jobs = self.jobs.lock().await;
        match jobs.get(track_id) {
            Some(job) => {
                info!(job = %job.job_id, "Cancelling download");
                job.cancel();
                true
            }
            None => false,
        }
    }

    /// Delete a cached entry and its backing file.
    pub async fn remove(&self, track_id: &TrackId) -> Result<Option<CachedMedia>> {
        self.store.remove(track_id).await
    }

    /// Jobs currently queued or transferring.
    pub async fn active_downloads(&self) -> Vec<DownloadJob> {
        self.jobs.lock().await.values().cloned().collect()
    }

    async fn run_job(self: Arc<Self>, track: Track, job: DownloadJob) {
        let outcome = self.acquire_and_transfer(&track, &job).await;

        self.jobs.lock().await.remove(&track.id);

        match outcome {
            Ok(TransferOutcome::Complete(record)) => {
                let size = record.size_bytes;
                match self.store.insert(record).await {
                    Ok(()) => {
                        info!(job = %job.job_id, size, "Download complete");
                        self.publish(&track.id, size, Some(size), DownloadStatus::Complete);
                    }
                    Err(e) => {
                        warn!(job = %job.job_id, "Failed to index completed download: {}", e);
                        self.publish(&track.id, size, Some(size), DownloadStatus::Failed);
                    }
                }
            }
            Ok(TransferOutcome::Cancelled) => {
                info!(job = %job.job_id, "Download cancelled");
                self.publish(&track.id, 0, None, DownloadStatus::Cancelled);
            }
            Err(e) => {
                warn!(job = %job.job_id, "Download failed: {}", e);
                self.publish(&track.id, 0, None, DownloadStatus::Failed);
            }
        }
    }

    async fn acquire_and_transfer(
        &self,
        track: &Track,
        job: &DownloadJob,
    ) -> Result<TransferOutcome> {
        // Wait for a download slot; cancellation while queued never
        // touches the network or the disk.
        let _permit = tokio::select! {
            _ = job.cancel.cancelled() => return Ok(TransferOutcome::Cancelled),
            permit = self.semaphore.clone().acquire_owned() => {
                permit.map_err(|_| EngineError::DownloadFailed {
                    track_id: track.id.to_string(),
                    message: "Download scheduler shut down".to_string(),
                })?
            }
        };

        self.publish(&track.id, 0, None, DownloadStatus::Active);

        let file_name = cache_file_name(&track.id);
        let temp_path = self.store.temp_path(&file_name);

        let result = tokio::time::timeout(self.timeout, self.transfer(track, job, &file_name))
            .await
            .unwrap_or_else(|_| {
                Err(EngineError::DownloadFailed {
                    track_id: track.id.to_string(),
                    message: format!("Timed out after {:?}", self.timeout),
                })
            });

        if !matches!(&result, Ok(TransferOutcome::Complete(_))) {
            // Partial bytes are never promoted.
            let _ = self.fs.delete_file(&temp_path).await;
        }

        result
    }

    async fn transfer(
        &self,
        track: &Track,
        job: &DownloadJob,
        file_name: &str,
    ) -> Result<TransferOutcome> {
        let failed = |message: String| EngineError::DownloadFailed {
            track_id: track.id.to_string(),
            message,
        };

        let request = HttpRequest::get(&track.stream_url)
            .headers(stream_request_headers(track, self.auth_token.as_deref()));

        let mut stream = self
            .http
            .download_stream(request)
            .await
            .map_err(|e| failed(e.to_string()))?;
        let total = stream.content_length;

        let temp_path = self.store.temp_path(file_name);
        let mut writer = self
            .fs
            .open_write_stream(&temp_path)
            .await
            .map_err(|e| failed(e.to_string()))?;

        let mut hasher = Sha256::new();
        let mut bytes_done: u64 = 0;
        let mut buf = vec![0u8; CHUNK_SIZE];

        loop {
            let read = tokio::select! {
                _ = job.cancel.cancelled() => {
                    drop(writer);
                    let _ = self.fs.delete_file(&temp_path).await;
                    return Ok(TransferOutcome::Cancelled);
                }
                read = stream.reader.read(&mut buf) => {
                    read.map_err(|e| failed(format!("Stream read: {}", e)))?
                }
            };

            if read == 0 {
                break;
            }

            writer
                .write_all(&buf[..read])
                .await
                .map_err(|e| failed(format!("Temp file write: {}", e)))?;
            hasher.update(&buf[..read]);
            bytes_done += read as u64;

            self.publish(&track.id, bytes_done, total, DownloadStatus::Active);
        }

        writer
            .shutdown()
            .await
            .map_err(|e| failed(format!("Temp file flush: {}", e)))?;
        drop(writer);

        if let Some(expected) = total {
            if bytes_done != expected {
                return Err(failed(format!(
                    "Truncated transfer: {} of {} bytes",
                    bytes_done, expected
                )));
            }
        }

        let checksum = format!("{:x}", hasher.finalize());

        // Promotion: the completed temp file becomes visible to lookups
        // in one rename, then the index record follows.
        let final_path = self.store.media_path(file_name);
        self.fs
            .rename(&temp_path, &final_path)
            .await
            .map_err(|e| failed(format!("Promote: {}", e)))?;

        Ok(TransferOutcome::Complete(CachedMedia::new(
            track.id.clone(),
            file_name,
            bytes_done,
            checksum,
        )))
    }

    fn publish(
        &self,
        track_id: &TrackId,
        bytes_done: u64,
        bytes_total: Option<u64>,
        status: DownloadStatus,
    ) {
        self.event_bus
            .emit(EngineEvent::Download(DownloadEvent::Progress {
                track_id: track_id.to_string(),
                bytes_done,
                bytes_total,
                status,
            }))
            .ok();
    }
}
