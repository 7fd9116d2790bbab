//! Running thumbnail requests off the caller's thread.
//!
//! A [`Worker`] runs one request at a time on a background thread and hands
//! back a [`JobHandle`]: progress arrives on a channel, the request can be
//! cancelled, and [`JobHandle::wait`] yields the result. Submitting while a
//! request is still in flight fails with [`ThumbnailError::Busy`] instead of
//! queueing.
//!
//! # Example
//!
//! ```no_run
//! use thumbsheet::{
//!     ExportTarget, FileExporter, Request, ThumbnailError, ThumbnailSpec, VideoFile,
//!     WatermarkSpec, Worker,
//! };
//!
//! let worker = Worker::new();
//! let request = Request::new(
//!     ThumbnailSpec::grid(2, 3),
//!     WatermarkSpec::None,
//!     ExportTarget::from_path("sheet.png")?,
//! );
//! let job = worker.submit(VideoFile::open("input.mp4")?, FileExporter, request)?;
//! for info in job.progress().iter() {
//!     println!("{:.0}%", info.percentage);
//! }
//! let generated = job.wait()?;
//! # Ok::<(), ThumbnailError>(())
//! ```

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
};

use crossbeam_channel::{Receiver, Sender};

use crate::{
    error::ThumbnailError,
    export::{ExportTarget, Exporter},
    options::GenerateOptions,
    pipeline::{self, Generated, ThumbnailSpec},
    progress::{CancellationToken, ProgressCallback, ProgressInfo},
    source::FrameSource,
    watermark::WatermarkSpec,
};

/// Everything one thumbnail request needs besides its source and exporter.
#[derive(Debug, Clone)]
pub struct Request {
    /// Layout and sampling.
    pub spec: ThumbnailSpec,
    /// Watermark to blend on.
    pub watermark: WatermarkSpec,
    /// Where to write the result.
    pub target: ExportTarget,
    /// Extraction progress cadence, in frames.
    pub batch_size: u64,
}

impl Request {
    /// Create a request that reports extraction progress after every frame.
    pub fn new(spec: ThumbnailSpec, watermark: WatermarkSpec, target: ExportTarget) -> Self {
        Self {
            spec,
            watermark,
            target,
            batch_size: 1,
        }
    }
}

/// Forwards progress snapshots into a channel.
struct ChannelProgress {
    sender: Sender<ProgressInfo>,
}

impl ProgressCallback for ChannelProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        // The receiver may have been dropped; progress is best-effort.
        let _ = self.sender.send(info.clone());
    }
}

/// Clears the in-flight flag when the job thread ends, including by panic.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs at most one thumbnail request at a time in the background.
#[derive(Debug, Clone, Default)]
pub struct Worker {
    busy: Arc<AtomicBool>,
}

impl Worker {
    /// Create an idle worker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a request is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Start `request` on a background thread.
    ///
    /// # Errors
    ///
    /// Returns [`ThumbnailError::Busy`] while an earlier request is still
    /// running, or [`ThumbnailError::Io`] if the thread cannot be spawned.
    pub fn submit<S, E>(
        &self,
        source: S,
        exporter: E,
        request: Request,
    ) -> Result<JobHandle, ThumbnailError>
    where
        S: FrameSource + Send + 'static,
        E: Exporter + Send + 'static,
    {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::debug!("Rejecting request: another one is in flight");
            return Err(ThumbnailError::Busy);
        }
        let in_flight = InFlight(Arc::clone(&self.busy));

        let (progress_sender, progress_receiver) = crossbeam_channel::unbounded();
        let (result_sender, result_receiver) = crossbeam_channel::bounded(1);
        let cancellation = CancellationToken::new();
        let options = GenerateOptions::new()
            .with_progress(Arc::new(ChannelProgress {
                sender: progress_sender,
            }))
            .with_cancellation(cancellation.clone())
            .with_batch_size(request.batch_size);

        let thread = thread::Builder::new()
            .name("thumbsheet-worker".to_string())
            .spawn(move || {
                let _in_flight = in_flight;
                let mut source = source;
                let result = pipeline::generate(
                    &mut source,
                    &request.spec,
                    &request.watermark,
                    &exporter,
                    &request.target,
                    &options,
                );
                match &result {
                    Ok(generated) => log::info!("Wrote {}", generated.path.display()),
                    Err(ThumbnailError::Cancelled) => log::info!("Request cancelled"),
                    Err(error) => log::warn!("Request failed: {error}"),
                }
                // Dropping the options closes the progress channel before
                // the result is published.
                drop(options);
                let _ = result_sender.send(result);
            })?;

        Ok(JobHandle {
            progress: progress_receiver,
            result: result_receiver,
            cancellation,
            thread: Some(thread),
        })
    }
}

/// Handle to a request running on a [`Worker`].
#[derive(Debug)]
pub struct JobHandle {
    progress: Receiver<ProgressInfo>,
    result: Receiver<Result<Generated, ThumbnailError>>,
    cancellation: CancellationToken,
    thread: Option<JoinHandle<()>>,
}

impl JobHandle {
    /// Progress snapshots, in order. The channel disconnects when the
    /// request finishes.
    pub fn progress(&self) -> &Receiver<ProgressInfo> {
        &self.progress
    }

    /// Ask the request to stop. It returns [`ThumbnailError::Cancelled`]
    /// without writing a file unless export had already started.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// The token that cancels this request.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Whether the request has finished.
    pub fn is_finished(&self) -> bool {
        self.thread
            .as_ref()
            .is_none_or(|thread| thread.is_finished())
    }

    /// Block until the request finishes and return its result.
    ///
    /// # Errors
    ///
    /// Returns the request's own error, or [`ThumbnailError::Decode`] if the
    /// worker thread died without producing a result.
    pub fn wait(mut self) -> Result<Generated, ThumbnailError> {
        let result = self.result.recv().map_err(|_| {
            ThumbnailError::Decode("the worker thread stopped without a result".to_string())
        });
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("Worker thread panicked");
            }
        }
        result?
    }
}
