//! The session controller.
//!
//! [`SessionController`] owns everything a running session needs: the pure
//! [`SessionMachine`], the capture pipeline, the loaded surface, the source
//! registry, the download sink and the error reporter. All mutation funnels
//! through [`SessionController::dispatch`]. Blocking work (opening a surface,
//! encoding) runs on tokio's blocking pool and reports back as another
//! [`SessionEvent`] on the controller's channel, so the event loop stays the
//! only writer.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;

use snapper_common::error::SnapperError;
use snapper_frame_model::capture::{CaptureResult, FailureKind};
use snapper_frame_model::format::ImageFormat;
use snapper_frame_model::session::{SessionPhase, SessionSnapshot};

use crate::keys::{shortcut_for, Key, Shortcut};
use crate::machine::{CaptureTicket, Command, Input, SessionMachine};
use crate::pipeline::{CapturePipeline, PipelineSettings};
use crate::reporter::{ErrorRecord, ErrorReporter, ErrorSource};
use crate::sink::DownloadSink;
use crate::source::{SourceId, SourceRegistry};
use crate::supervisor::spawn_watched;
use crate::surface::{SurfaceLoader, VideoSurface};

/// Everything that can happen to a session.
pub enum SessionEvent {
    /// The user picked a video file.
    SelectFile(PathBuf),
    SelectFormat(ImageFormat),
    RequestCapture,
    Key(Key),
    Seek(f64),
    TogglePlayback,
    /// Background load finished.
    SurfaceLoaded {
        source: SourceId,
        surface: Box<dyn VideoSurface>,
    },
    /// Background load failed or timed out.
    SurfaceFailed { source: SourceId, detail: String },
    /// Background encode finished.
    CaptureFinished {
        ticket: CaptureTicket,
        current_time: f64,
        result: CaptureResult,
    },
    /// Stop the event loop.
    Shutdown,
}

impl fmt::Debug for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEvent::SelectFile(path) => f.debug_tuple("SelectFile").field(path).finish(),
            SessionEvent::SelectFormat(format) => {
                f.debug_tuple("SelectFormat").field(format).finish()
            }
            SessionEvent::RequestCapture => f.write_str("RequestCapture"),
            SessionEvent::Key(key) => f.debug_tuple("Key").field(key).finish(),
            SessionEvent::Seek(secs) => f.debug_tuple("Seek").field(secs).finish(),
            SessionEvent::TogglePlayback => f.write_str("TogglePlayback"),
            SessionEvent::SurfaceLoaded { source, .. } => f
                .debug_struct("SurfaceLoaded")
                .field("source", source)
                .finish_non_exhaustive(),
            SessionEvent::SurfaceFailed { source, detail } => f
                .debug_struct("SurfaceFailed")
                .field("source", source)
                .field("detail", detail)
                .finish(),
            SessionEvent::CaptureFinished {
                ticket,
                current_time,
                result,
            } => f
                .debug_struct("CaptureFinished")
                .field("ticket", ticket)
                .field("current_time", current_time)
                .field("success", &result.is_success())
                .finish(),
            SessionEvent::Shutdown => f.write_str("Shutdown"),
        }
    }
}

/// Gets told about every state change.
pub trait SessionObserver: Send {
    fn on_change(&mut self, snapshot: &SessionSnapshot);
}

/// Construction-time settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionSettings {
    /// Format selected when the session starts.
    pub format: ImageFormat,
    pub pipeline: PipelineSettings,
}

/// Sending half of a controller's event channel.
pub type EventSender = mpsc::UnboundedSender<SessionEvent>;

/// Drives one session.
pub struct SessionController {
    machine: SessionMachine,
    pipeline: CapturePipeline,
    surface: Option<(SourceId, Box<dyn VideoSurface>)>,
    loader: Arc<dyn SurfaceLoader>,
    registry: SourceRegistry,
    sink: Box<dyn DownloadSink>,
    reporter: Arc<dyn ErrorReporter>,
    observers: Vec<Box<dyn SessionObserver>>,
    last_snapshot: SessionSnapshot,
    tx: EventSender,
    rx: mpsc::UnboundedReceiver<SessionEvent>,
    shut_down: bool,
}

impl SessionController {
    pub fn new(
        settings: SessionSettings,
        loader: Arc<dyn SurfaceLoader>,
        sink: Box<dyn DownloadSink>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let machine = SessionMachine::new(settings.format);
        let last_snapshot = machine.snapshot();
        Self {
            machine,
            pipeline: CapturePipeline::new(settings.pipeline),
            surface: None,
            loader,
            registry: SourceRegistry::new(),
            sink,
            reporter,
            observers: Vec::new(),
            last_snapshot,
            tx,
            rx,
            shut_down: false,
        }
    }

    /// Register an observer. It is immediately shown the current state.
    pub fn add_observer(&mut self, mut observer: Box<dyn SessionObserver>) {
        observer.on_change(&self.last_snapshot);
        self.observers.push(observer);
    }

    /// A handle other tasks use to feed events into this session.
    pub fn sender(&self) -> EventSender {
        self.tx.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.machine.snapshot()
    }

    /// Number of sources still registered. At most one while the session
    /// lives.
    pub fn live_sources(&self) -> usize {
        self.registry.live_count()
    }

    /// Whether a [`SessionEvent::Shutdown`] has been processed.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Read access to the loaded surface.
    pub fn surface(&self) -> Option<&dyn VideoSurface> {
        self.surface.as_ref().map(|(_, s)| s.as_ref())
    }

    /// Apply one event. The single entry point for every state change.
    pub fn dispatch(&mut self, event: SessionEvent) {
        tracing::trace!(?event, "Dispatching session event");
        match event {
            SessionEvent::SelectFile(path) => self.select_file(&path),
            SessionEvent::SelectFormat(format) => self.apply(Input::FormatSelected(format)),
            SessionEvent::RequestCapture => self.request_capture(),
            SessionEvent::Key(key) => match shortcut_for(key) {
                Some(Shortcut::TogglePlayback) => self.toggle_playback(),
                Some(Shortcut::Capture) => self.request_capture(),
                None => {}
            },
            SessionEvent::Seek(secs) => self.seek(secs),
            SessionEvent::TogglePlayback => self.toggle_playback(),
            SessionEvent::SurfaceLoaded { source, surface } => {
                self.surface_loaded(source, surface)
            }
            SessionEvent::SurfaceFailed { source, detail } => {
                if self.machine.source() != Some(source) {
                    tracing::debug!(locator = %source, %detail, "Ignoring failure of a replaced source");
                    return;
                }
                self.report(
                    ErrorRecord::new(ErrorSource::Load, detail)
                        .with_context("phase", "load")
                        .with_context("source", source.to_string()),
                );
                self.apply(Input::LoadFailed { source });
            }
            SessionEvent::CaptureFinished {
                ticket,
                current_time,
                result,
            } => self.capture_finished(ticket, current_time, result),
            SessionEvent::Shutdown => {
                tracing::debug!("Session shutting down");
                self.shut_down = true;
            }
        }
        self.notify_if_changed();
    }

    /// Wait for the next queued event and dispatch it. Returns `false` once
    /// the session has been shut down.
    pub async fn pump(&mut self) -> bool {
        if self.shut_down {
            return false;
        }
        match self.rx.recv().await {
            Some(event) => {
                self.dispatch(event);
                !self.shut_down
            }
            None => false,
        }
    }

    /// Pump until nothing is loading or capturing.
    pub async fn settle(&mut self) -> bool {
        while !self.machine.snapshot().is_settled() {
            if !self.pump().await {
                return false;
            }
        }
        true
    }

    /// Pump until shut down.
    pub async fn run(&mut self) {
        while self.pump().await {}
    }

    fn apply(&mut self, input: Input) {
        if let Some(command) = self.machine.apply(input) {
            self.execute(command);
        }
    }

    fn execute(&mut self, command: Command) {
        match command {
            Command::BeginCapture(ticket) => self.begin_capture(ticket),
        }
    }

    fn select_file(&mut self, path: &Path) {
        let source = match self.registry.create(path) {
            Ok(source) => source,
            Err(e) => {
                self.report(
                    ErrorRecord::from_error(ErrorSource::Load, &e)
                        .with_context("phase", "select")
                        .with_context("path", path.display().to_string()),
                );
                return;
            }
        };

        if let Some(previous) = self.machine.source() {
            self.registry.revoke(previous);
        }
        // Dropping the surface stops its playback.
        self.surface = None;

        tracing::info!(
            locator = %source.id,
            path = %source.path.display(),
            loader = self.loader.name(),
            "Loading video"
        );
        self.apply(Input::FileSelected(source.id));

        let loader = Arc::clone(&self.loader);
        let tx = self.tx.clone();
        let id = source.id;
        spawn_watched(Arc::clone(&self.reporter), "load", async move {
            let opened = tokio::task::spawn_blocking(move || loader.load(&source)).await;
            let event = match opened {
                Ok(Ok(surface)) => SessionEvent::SurfaceLoaded {
                    source: id,
                    surface,
                },
                Ok(Err(e)) => SessionEvent::SurfaceFailed {
                    source: id,
                    detail: e.detail(),
                },
                Err(e) => SessionEvent::SurfaceFailed {
                    source: id,
                    detail: format!("Load task did not complete: {e}"),
                },
            };
            tx.send(event)
                .map_err(|_| SnapperError::unknown("Session closed before the video loaded"))
        });
    }

    fn surface_loaded(&mut self, source: SourceId, surface: Box<dyn VideoSurface>) {
        if self.machine.source() != Some(source)
            || self.machine.snapshot().phase != SessionPhase::Loading
        {
            tracing::debug!(locator = %source, "Discarding surface of a replaced source");
            return;
        }
        let metadata = surface.metadata();
        tracing::info!(
            locator = %source,
            width = metadata.width,
            height = metadata.height,
            duration_secs = ?metadata.duration_secs,
            "Video loaded"
        );
        self.surface = Some((source, surface));
        self.apply(Input::MetadataAvailable { source, metadata });
    }

    fn begin_capture(&mut self, ticket: CaptureTicket) {
        let Some((_, surface)) = self.surface.as_ref() else {
            self.capture_finished(
                ticket,
                0.0,
                CaptureResult::failure(FailureKind::Unknown, "No video surface to capture from"),
            );
            return;
        };
        let current_time = surface.current_time_secs();
        tracing::debug!(ticket = ticket.id, format = %ticket.format, current_time, "Capture started");

        match self.pipeline.begin(surface.as_ref(), ticket.format) {
            Ok(pending) => {
                let tx = self.tx.clone();
                spawn_watched(Arc::clone(&self.reporter), "encode", async move {
                    let result = pending.finish().await;
                    tx.send(SessionEvent::CaptureFinished {
                        ticket,
                        current_time,
                        result,
                    })
                    .map_err(|_| SnapperError::unknown("Session closed before the encode finished"))
                });
            }
            Err(failure) => self.capture_finished(ticket, current_time, failure.into()),
        }
    }

    fn capture_finished(&mut self, ticket: CaptureTicket, current_time: f64, result: CaptureResult) {
        let failure = match result {
            CaptureResult::Success(image) => {
                let filename = ticket.format.snapshot_filename();
                match self.sink.deliver(&image.bytes, &filename) {
                    Ok(output) => {
                        tracing::info!(
                            ticket = ticket.id,
                            output = %output.display(),
                            width = image.width,
                            height = image.height,
                            bytes = image.bytes.len(),
                            "Snapshot delivered"
                        );
                        self.apply(Input::CaptureSucceeded {
                            ticket: ticket.id,
                            output,
                        });
                        return;
                    }
                    Err(e) => ErrorRecord::from_error(ErrorSource::Capture, &e)
                        .with_context("kind", "delivery"),
                }
            }
            CaptureResult::Failure(failure) => ErrorRecord::new(ErrorSource::Capture, failure.detail)
                .with_context("kind", failure.kind.to_string()),
        };

        let detail = failure.message.clone();
        self.report(
            failure
                .with_context("phase", "capture")
                .with_context("format", ticket.format.mime_type())
                .with_context("currentTime", current_time),
        );
        self.apply(Input::CaptureFailed {
            ticket: ticket.id,
            detail,
        });
    }

    fn request_capture(&mut self) {
        if self.surface_faulted() {
            return;
        }
        self.apply(Input::CaptureRequested);
    }

    fn seek(&mut self, secs: f64) {
        if self.surface_faulted() {
            return;
        }
        let Some((source, surface)) = self.surface.as_mut() else {
            return;
        };
        let source = *source;
        if let Err(e) = surface.seek(secs) {
            self.playback_failed(source, e);
        }
    }

    fn toggle_playback(&mut self) {
        if self.surface_faulted() {
            return;
        }
        let Some((source, surface)) = self.surface.as_mut() else {
            return;
        };
        let source = *source;
        match surface.toggle_playback() {
            Ok(()) => tracing::debug!(paused = surface.is_paused(), "Playback toggled"),
            Err(e) => self.playback_failed(source, e),
        }
    }

    /// Collect an error the surface raised by itself since the last user
    /// action. Returns whether there was one.
    fn surface_faulted(&mut self) -> bool {
        let Some((source, surface)) = self.surface.as_mut() else {
            return false;
        };
        let source = *source;
        match surface.take_error() {
            Some(error) => {
                self.playback_failed(source, error);
                true
            }
            None => false,
        }
    }

    /// A loaded surface stopped cooperating.
    fn playback_failed(&mut self, source: SourceId, error: SnapperError) {
        self.report(
            ErrorRecord::from_error(ErrorSource::Load, &error)
                .with_context("phase", "playback")
                .with_context("source", source.to_string()),
        );
        self.apply(Input::LoadFailed { source });
    }

    fn report(&self, record: ErrorRecord) {
        self.reporter.report(record);
    }

    fn notify_if_changed(&mut self) {
        let snapshot = self.machine.snapshot();
        if snapshot == self.last_snapshot {
            return;
        }
        for observer in &mut self.observers {
            observer.on_change(&snapshot);
        }
        self.last_snapshot = snapshot;
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.surface = None;
        let revoked = self.registry.revoke_all();
        if revoked > 0 {
            tracing::debug!(revoked, "Released media sources");
        }
    }
}
