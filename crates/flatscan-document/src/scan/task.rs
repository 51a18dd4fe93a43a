// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rectification task: one capture, one rectification, one completion.
//
// A task owns its source image and quadrilateral, not its consumer. The
// consumer registers either a boxed callback or a oneshot receiver; the task
// fires it exactly once and then drops every image buffer it held.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use flatscan_core::config::ScanConfig;
use flatscan_core::error::{FlatscanError, Result};
use flatscan_core::geometry::{PixelSpace, Quadrilateral};
use flatscan_core::types::{TaskId, TaskState};
use tokio::sync::{Notify, oneshot};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, instrument, warn};

use crate::image::ScanImage;
use crate::scan::rectify::Rectifier;

/// Boxed completion callback.
pub type CompletionHandler = Box<dyn FnOnce(RectificationResult) + Send + 'static>;

// -- Cancellation -------------------------------------------------------------

/// Cloneable cancellation flag for a task.
///
/// Cancelling only has an effect while the task is still `Ready`; once the
/// rectification is running it completes normally.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<CancelFlag>);

#[derive(Debug, Default)]
struct CancelFlag {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.cancelled.store(true, Ordering::SeqCst);
        self.0.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        loop {
            // Registered before the check so a concurrent cancel is not missed.
            let notified = self.0.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

// -- Result -------------------------------------------------------------------

/// What a task delivers through its completion.
#[derive(Debug)]
pub struct RectificationResult {
    pub task_id: TaskId,
    /// The rectified, upright image. `None` on failure or cancellation.
    pub image: Option<ScanImage>,
    /// The quadrilateral the task was created with, in source pixel space.
    pub quad: Quadrilateral<PixelSpace>,
    /// Why no image was produced.
    pub error: Option<FlatscanError>,
    /// Time from `start()` to completion.
    pub elapsed: Duration,
}

impl RectificationResult {
    pub fn succeeded(
        task_id: TaskId,
        image: ScanImage,
        quad: Quadrilateral<PixelSpace>,
        elapsed: Duration,
    ) -> Self {
        Self {
            task_id,
            image: Some(image),
            quad,
            error: None,
            elapsed,
        }
    }

    pub fn failed(
        task_id: TaskId,
        quad: Quadrilateral<PixelSpace>,
        error: FlatscanError,
        elapsed: Duration,
    ) -> Self {
        Self {
            task_id,
            image: None,
            quad,
            error: Some(error),
            elapsed,
        }
    }

    pub fn is_success(&self) -> bool {
        self.image.is_some()
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.error, Some(FlatscanError::Cancelled))
    }

    /// Collapse into a plain `Result`.
    pub fn into_result(self) -> Result<ScanImage> {
        match (self.image, self.error) {
            (Some(image), _) => Ok(image),
            (None, Some(err)) => Err(err),
            (None, None) => Err(FlatscanError::Worker(
                "task finished without an image or an error".into(),
            )),
        }
    }
}

// -- Task ---------------------------------------------------------------------

enum Completion {
    Callback(CompletionHandler),
    Channel(oneshot::Sender<RectificationResult>),
}

impl Completion {
    fn deliver(self, result: RectificationResult) {
        match self {
            Self::Callback(handler) => handler(result),
            Self::Channel(sender) => {
                if sender.send(result).is_err() {
                    debug!("Completion receiver dropped; result discarded");
                }
            }
        }
    }
}

/// Lifecycle state shared between a task and the worker finishing it.
#[derive(Debug, Clone)]
struct SharedState(Arc<Mutex<TaskState>>);

impl SharedState {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(TaskState::Ready)))
    }

    fn get(&self) -> TaskState {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set(&self, next: TaskState) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

/// An asynchronous, cancellable, run-once rectification.
///
/// `Ready -> Executing -> Finished`, or `Ready -> Finished` when cancelled
/// before `start()`. The rectification itself runs on tokio's blocking
/// pool, and the completion is delivered by a spawned worker, so it fires
/// even if the caller stops polling `start()`.
pub struct RectificationTask {
    id: TaskId,
    state: SharedState,
    image: Option<ScanImage>,
    quad: Quadrilateral<PixelSpace>,
    rectifier: Rectifier,
    cancel: CancelHandle,
    completion: Option<Completion>,
}

impl RectificationTask {
    /// Create a task with the default configuration. `quad` is in the
    /// upright image's pixel space.
    pub fn new(image: ScanImage, quad: Quadrilateral<PixelSpace>) -> Self {
        Self::with_config(image, quad, ScanConfig::default())
    }

    pub fn with_config(
        image: ScanImage,
        quad: Quadrilateral<PixelSpace>,
        config: ScanConfig,
    ) -> Self {
        let id = TaskId::new();
        debug!(task_id = %id, "Rectification task created");
        Self {
            id,
            state: SharedState::new(),
            image: Some(image),
            quad,
            rectifier: Rectifier::new(config),
            cancel: CancelHandle::default(),
            completion: None,
        }
    }

    /// Create a task for a capture, falling back to a default quadrilateral
    /// when the detector produced none.
    ///
    /// The fallback is an inset of `config.default_margin` when detection
    /// was attempted and failed, or the whole frame when detection was off.
    pub fn from_capture(
        image: ScanImage,
        detected: Option<Quadrilateral<PixelSpace>>,
        detection_attempted: bool,
        config: ScanConfig,
    ) -> Self {
        let quad = detected.unwrap_or_else(|| {
            let size = image.oriented_size();
            Quadrilateral::fallback(size, detection_attempted, config.default_margin)
        });
        Self::with_config(image, quad, config)
    }

    // -- Accessors ------------------------------------------------------------

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn state(&self) -> TaskState {
        self.state.get()
    }

    pub fn quad(&self) -> Quadrilateral<PixelSpace> {
        self.quad
    }

    /// Whether the task still pins its source image.
    pub fn holds_source_image(&self) -> bool {
        self.image.is_some()
    }

    // -- Control --------------------------------------------------------------

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Register a completion callback, replacing any earlier registration.
    pub fn on_complete<F>(&mut self, handler: F)
    where
        F: FnOnce(RectificationResult) + Send + 'static,
    {
        self.replace_completion(Completion::Callback(Box::new(handler)));
    }

    /// Register a oneshot receiver for the completion, replacing any earlier
    /// registration. If the task is dropped without finishing the receiver
    /// yields `RecvError`.
    pub fn subscribe(&mut self) -> oneshot::Receiver<RectificationResult> {
        let (sender, receiver) = oneshot::channel();
        self.replace_completion(Completion::Channel(sender));
        receiver
    }

    fn replace_completion(&mut self, completion: Completion) {
        if self.completion.replace(completion).is_some() {
            debug!(task_id = %self.id, "Earlier completion registration replaced");
        }
    }

    /// Run the task.
    ///
    /// Returns `AlreadyStarted` if the task has left `Ready`. Every other
    /// outcome, including rectification failure and cancellation, is
    /// reported through the completion and this returns `Ok(())`.
    ///
    /// Once the task is executing, the image and the completion belong to a
    /// spawned worker. Dropping this future (for example under a host
    /// timeout) does not stop the rectification or lose its completion.
    #[instrument(skip(self), fields(task_id = %self.id))]
    pub async fn start(&mut self) -> Result<()> {
        let state = self.state.get();
        if state != TaskState::Ready {
            warn!(%state, "Start requested on a task that already ran");
            return Err(FlatscanError::AlreadyStarted);
        }

        let started = Instant::now();
        let (id, quad) = (self.id, self.quad);
        let image = self.image.take();
        let completion = self.completion.take();

        if self.cancel.is_cancelled() {
            info!("Task cancelled before start");
            drop(image);
            let result =
                RectificationResult::failed(id, quad, FlatscanError::Cancelled, started.elapsed());
            finish(&self.state, completion, result);
            return Ok(());
        }

        self.state.set(TaskState::Executing);
        let rectifier = self.rectifier.clone();
        let state = self.state.clone();
        let worker = tokio::spawn(
            async move {
                let outcome = match image {
                    Some(image) => {
                        tokio::task::spawn_blocking(move || rectifier.rectify(&image, &quad))
                            .await
                            .map_err(|e| {
                                FlatscanError::Worker(format!("rectification worker: {e}"))
                            })
                            .and_then(|rectified| rectified)
                    }
                    None => Err(FlatscanError::ImageConversion(
                        "source image is no longer available".into(),
                    )),
                };

                let elapsed = started.elapsed();
                let result = match outcome {
                    Ok(image) => {
                        info!(
                            width = image.width(),
                            height = image.height(),
                            elapsed_ms = elapsed.as_millis() as u64,
                            "Rectification completed"
                        );
                        RectificationResult::succeeded(id, image, quad, elapsed)
                    }
                    Err(err) => {
                        warn!(error = %err, "Rectification failed");
                        RectificationResult::failed(id, quad, err, elapsed)
                    }
                };
                finish(&state, completion, result);
            }
            .in_current_span(),
        );

        worker
            .await
            .map_err(|e| FlatscanError::Worker(format!("completion delivery: {e}")))
    }

    /// Move the task onto the tokio runtime and run it there.
    pub fn run_detached(mut self) -> JoinHandle<Result<()>> {
        tokio::spawn(async move { self.start().await })
    }
}

/// Mark the task finished, then fire its completion if one is registered.
fn finish(state: &SharedState, completion: Option<Completion>, result: RectificationResult) {
    state.set(TaskState::Finished);
    match completion {
        Some(completion) => completion.deliver(result),
        None => debug!(task_id = %result.task_id, "No completion registered; result dropped"),
    }
}

impl fmt::Debug for RectificationTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RectificationTask")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("image", &self.image)
            .field("quad", &self.quad)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("has_completion", &self.completion.is_some())
            .finish()
    }
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use flatscan_core::geometry::{Point, Size};
    use image::{DynamicImage, Rgba, RgbaImage};

    fn source_image() -> ScanImage {
        let img = RgbaImage::from_fn(200, 300, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
        });
        ScanImage::from_dynamic(DynamicImage::ImageRgba8(img))
    }

    fn document_quad() -> Quadrilateral<PixelSpace> {
        Quadrilateral::new(
            Point::new(20.0, 20.0),
            Point::new(180.0, 20.0),
            Point::new(190.0, 290.0),
            Point::new(10.0, 280.0),
        )
    }

    /// Completion counter plus the last delivered result.
    fn recorder(
        task: &mut RectificationTask,
    ) -> (Arc<AtomicUsize>, Arc<Mutex<Option<RectificationResult>>>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let last = Arc::new(Mutex::new(None));
        let (c, l) = (Arc::clone(&calls), Arc::clone(&last));
        task.on_complete(move |result| {
            c.fetch_add(1, Ordering::SeqCst);
            *l.lock().unwrap() = Some(result);
        });
        (calls, last)
    }

    #[tokio::test]
    async fn cancelled_task_finishes_without_result_exactly_once() {
        let mut task = RectificationTask::new(source_image(), document_quad());
        let (calls, last) = recorder(&mut task);

        task.cancel();
        task.start().await.unwrap();

        assert_eq!(task.state(), TaskState::Finished);
        assert!(!task.holds_source_image());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let result = last.lock().unwrap().take().unwrap();
        assert!(result.image.is_none());
        assert!(result.is_cancelled());

        let again = task.start().await.unwrap_err();
        assert!(matches!(again, FlatscanError::AlreadyStarted));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn completed_task_fires_once_and_releases_buffers() {
        let mut task = RectificationTask::new(source_image(), document_quad());
        let (calls, last) = recorder(&mut task);
        assert!(task.holds_source_image());

        task.start().await.unwrap();
        assert_eq!(task.state(), TaskState::Finished);
        assert!(!task.holds_source_image());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(task.start().await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let result = last.lock().unwrap().take().unwrap();
        assert!(result.is_success());
        assert_eq!(result.task_id, task.id());
    }

    #[tokio::test]
    async fn end_to_end_output_matches_canonical_bounding_box() {
        let quad = document_quad();
        let mut task = RectificationTask::new(source_image(), quad);
        let receiver = task.subscribe();
        task.start().await.unwrap();

        let result = receiver.await.expect("completion delivered");
        assert_eq!(result.quad, quad);
        let image = result.into_result().expect("rectified image");
        assert!(!image.is_empty());

        let bounds = quad.to_origin_at_bottom_left(300.0).canonicalized().bounding_rect();
        let expected = bounds.width() / bounds.height();
        let actual = f64::from(image.width()) / f64::from(image.height());
        assert!((actual - expected).abs() < 0.01, "aspect {actual} vs {expected}");
    }

    #[tokio::test]
    async fn rectification_failure_is_reported_through_completion() {
        let empty = ScanImage::from_dynamic(DynamicImage::ImageRgba8(RgbaImage::new(0, 0)));
        let mut task = RectificationTask::new(empty, document_quad());
        let receiver = task.subscribe();

        task.start().await.expect("failures do not surface from start");
        let result = receiver.await.unwrap();
        assert!(!result.is_success());
        assert!(result.error.as_ref().is_some_and(FlatscanError::is_rectification_failure));
        assert!(matches!(result.into_result(), Err(FlatscanError::ImageConversion(_))));
    }

    #[tokio::test]
    async fn cloned_cancel_handle_cancels_task() {
        let mut task = RectificationTask::new(source_image(), document_quad());
        let handle = task.cancel_handle();
        let receiver = task.subscribe();

        handle.cancel();
        task.start().await.unwrap();
        assert!(receiver.await.unwrap().is_cancelled());
    }

    #[tokio::test]
    async fn latest_registration_wins() {
        let mut task = RectificationTask::new(source_image(), document_quad());
        let (calls, _) = recorder(&mut task);
        let receiver = task.subscribe();

        task.cancel();
        task.start().await.unwrap();
        assert!(receiver.await.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn completion_fires_once_when_start_future_is_dropped() {
        let img = RgbaImage::from_pixel(1200, 1200, Rgba([90, 90, 90, 255]));
        let image = ScanImage::from_dynamic(DynamicImage::ImageRgba8(img));
        let quad = Quadrilateral::full(Size::new(1200.0, 1200.0));
        let mut task = RectificationTask::new(image, quad);

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let (sender, receiver) = oneshot::channel();
        task.on_complete(move |result| {
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = sender.send(result);
        });

        // The caller gives up long before a 1200x1200 warp can finish.
        let _ = tokio::time::timeout(Duration::from_millis(1), task.start()).await;

        let result = receiver.await.expect("completion still delivered");
        assert!(result.is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(task.state(), TaskState::Finished);
        assert!(!task.holds_source_image());

        assert!(matches!(task.start().await, Err(FlatscanError::AlreadyStarted)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancelled_future_resolves_after_cancel() {
        let handle = CancelHandle::default();
        let waiter = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.cancelled().await })
        };
        tokio::task::yield_now().await;
        handle.cancel();
        tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .expect("woken by cancel")
            .expect("join");
    }

    #[tokio::test]
    async fn dropping_unstarted_task_closes_receiver() {
        let mut task = RectificationTask::new(source_image(), document_quad());
        let receiver = task.subscribe();
        drop(task);
        assert!(receiver.await.is_err());
    }

    #[tokio::test]
    async fn detached_task_delivers_result() {
        let mut task = RectificationTask::new(source_image(), document_quad());
        let receiver = task.subscribe();
        let handle = task.run_detached();

        handle.await.expect("join").expect("start");
        assert!(receiver.await.unwrap().is_success());
    }

    #[test]
    fn capture_without_detection_uses_fallback_quad() {
        let config = ScanConfig::default();
        let size = Size::new(200.0, 300.0);

        let full = RectificationTask::from_capture(source_image(), None, false, config.clone());
        assert_eq!(full.quad(), Quadrilateral::full(size));

        let inset = RectificationTask::from_capture(source_image(), None, true, config.clone());
        assert_eq!(inset.quad(), Quadrilateral::inset(size, config.default_margin));

        let detected =
            RectificationTask::from_capture(source_image(), Some(document_quad()), true, config);
        assert_eq!(detected.quad(), document_quad());
        assert_eq!(detected.state(), TaskState::Ready);
    }
}
