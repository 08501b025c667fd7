use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};

use snapper_capture_engine::machine::LOAD_FAILED_MESSAGE;
use snapper_capture_engine::{
    DirectorySink, ErrorSource, Key, MediaSource, MemoryReporter, MemorySink, PipelineSettings,
    SessionController, SessionEvent, SessionObserver, SessionSettings, SurfaceLoader, VideoSurface,
};
use snapper_common::error::{SnapperError, SnapperResult};
use snapper_frame_model::format::ImageFormat;
use snapper_frame_model::frame::{VideoFrame, VideoMetadata};
use snapper_frame_model::session::{SessionPhase, SessionSnapshot};

/// A paused video whose every frame is one solid colour.
struct CountingSurface {
    width: u32,
    height: u32,
    position: f64,
    paused: bool,
    frame_reads: Arc<AtomicUsize>,
}

impl VideoSurface for CountingSurface {
    fn metadata(&self) -> VideoMetadata {
        VideoMetadata {
            width: self.width,
            height: self.height,
            duration_secs: Some(30.0),
        }
    }

    fn current_time_secs(&self) -> f64 {
        self.position
    }

    fn current_frame(&self) -> SnapperResult<VideoFrame> {
        self.frame_reads.fetch_add(1, Ordering::SeqCst);
        Ok(VideoFrame::solid(self.width, self.height, [20, 120, 220, 255]))
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn play(&mut self) -> SnapperResult<()> {
        self.paused = false;
        Ok(())
    }

    fn pause(&mut self) -> SnapperResult<()> {
        self.paused = true;
        Ok(())
    }

    fn seek(&mut self, secs: f64) -> SnapperResult<()> {
        self.position = secs.clamp(0.0, 30.0);
        Ok(())
    }
}

/// Reads `WIDTHxHEIGHT` from the file instead of decoding it. Files whose
/// name starts with `broken` fail to load; files whose name starts with
/// `slow` wait until the test releases them.
struct FakeLoader {
    frame_reads: Arc<AtomicUsize>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl FakeLoader {
    fn new() -> (Self, mpsc::Sender<()>, Arc<AtomicUsize>) {
        let (tx, rx) = mpsc::channel();
        let frame_reads = Arc::new(AtomicUsize::new(0));
        let loader = Self {
            frame_reads: frame_reads.clone(),
            release: Mutex::new(rx),
        };
        (loader, tx, frame_reads)
    }
}

impl SurfaceLoader for FakeLoader {
    fn load(&self, source: &MediaSource) -> SnapperResult<Box<dyn VideoSurface>> {
        let name = source
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        if name.starts_with("broken") {
            return Err(SnapperError::load("no decoder for this stream"));
        }
        if name.starts_with("slow") {
            let release = self.release.lock().unwrap();
            release.recv().ok();
        }

        let text = std::fs::read_to_string(&source.path)?;
        let (w, h) = text
            .trim()
            .split_once('x')
            .ok_or_else(|| SnapperError::load("not a fake video"))?;
        Ok(Box::new(CountingSurface {
            width: w.parse().map_err(|_| SnapperError::load("bad width"))?,
            height: h.parse().map_err(|_| SnapperError::load("bad height"))?,
            position: 0.0,
            paused: true,
            frame_reads: self.frame_reads.clone(),
        }))
    }

    fn name(&self) -> &str {
        "fake"
    }
}

struct Recorder(Arc<Mutex<Vec<SessionSnapshot>>>);

impl SessionObserver for Recorder {
    fn on_change(&mut self, snapshot: &SessionSnapshot) {
        self.0.lock().unwrap().push(snapshot.clone());
    }
}

fn scratch(test: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("snapper_flow_{test}"));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn fake_video(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("{width}x{height}")).unwrap();
    path
}

struct Harness {
    controller: SessionController,
    sink: MemorySink,
    reporter: Arc<MemoryReporter>,
    frame_reads: Arc<AtomicUsize>,
    release: mpsc::Sender<()>,
}

fn harness(pipeline: PipelineSettings) -> Harness {
    let (loader, release, frame_reads) = FakeLoader::new();
    let sink = MemorySink::new();
    let reporter = Arc::new(MemoryReporter::new());
    let controller = SessionController::new(
        SessionSettings {
            format: ImageFormat::Png,
            pipeline,
        },
        Arc::new(loader),
        Box::new(sink.clone()),
        reporter.clone(),
    );
    Harness {
        controller,
        sink,
        reporter,
        frame_reads,
        release,
    }
}

#[tokio::test]
async fn webp_capture_of_loaded_video_is_delivered() {
    let dir = scratch("webp");
    let mut h = harness(PipelineSettings::default());

    h.controller
        .dispatch(SessionEvent::SelectFile(fake_video(&dir, "clip.mp4", 640, 360)));
    assert_eq!(h.controller.snapshot().phase, SessionPhase::Loading);
    assert!(h.controller.settle().await);

    h.controller
        .dispatch(SessionEvent::SelectFormat(ImageFormat::Webp));
    h.controller.dispatch(SessionEvent::RequestCapture);
    assert!(h.controller.settle().await);

    let snap = h.controller.snapshot();
    assert!(snap.captured);
    assert!(snap.error_message.is_none());
    assert_eq!(snap.phase, SessionPhase::Ready);

    let deliveries = h.sink.deliveries();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].filename, "snapshot.webp");
    let decoded = image::load_from_memory(&deliveries[0].bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (640, 360));
    assert!(h.reporter.records().is_empty());
}

#[tokio::test]
async fn capture_without_video_does_nothing() {
    let mut h = harness(PipelineSettings::default());
    let before = h.controller.snapshot();

    h.controller.dispatch(SessionEvent::RequestCapture);
    h.controller.dispatch(SessionEvent::Key(Key::Char('c')));

    assert_eq!(h.controller.snapshot(), before);
    assert!(h.sink.deliveries().is_empty());
    assert_eq!(h.frame_reads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn repeated_capture_key_reads_one_frame() {
    let dir = scratch("double");
    let mut h = harness(PipelineSettings::default());
    h.controller
        .dispatch(SessionEvent::SelectFile(fake_video(&dir, "clip.mp4", 32, 18)));
    h.controller.settle().await;

    h.controller.dispatch(SessionEvent::Key(Key::Char('c')));
    h.controller.dispatch(SessionEvent::Key(Key::Char('C')));
    h.controller.settle().await;

    assert_eq!(h.frame_reads.load(Ordering::SeqCst), 1);
    assert_eq!(h.sink.deliveries().len(), 1);
}

#[tokio::test]
async fn space_toggles_playback_without_capturing() {
    let dir = scratch("space");
    let mut h = harness(PipelineSettings::default());
    h.controller
        .dispatch(SessionEvent::SelectFile(fake_video(&dir, "clip.mp4", 32, 18)));
    h.controller.settle().await;
    let before = h.controller.snapshot();

    h.controller.dispatch(SessionEvent::Key(Key::Space));
    assert!(!h.controller.surface().unwrap().is_paused());
    h.controller.dispatch(SessionEvent::Key(Key::Space));
    assert!(h.controller.surface().unwrap().is_paused());

    h.controller.dispatch(SessionEvent::Seek(12.5));
    assert_eq!(h.controller.surface().unwrap().current_time_secs(), 12.5);

    assert_eq!(h.controller.snapshot(), before);
    assert!(h.sink.deliveries().is_empty());
}

#[tokio::test]
async fn missing_drawing_context_is_reported() {
    let dir = scratch("context");
    let mut h = harness(PipelineSettings {
        max_raster_pixels: 100,
        ..PipelineSettings::default()
    });
    h.controller
        .dispatch(SessionEvent::SelectFile(fake_video(&dir, "clip.mp4", 640, 360)));
    h.controller.settle().await;
    h.controller.dispatch(SessionEvent::Seek(4.0));

    h.controller.dispatch(SessionEvent::RequestCapture);
    h.controller.settle().await;

    let snap = h.controller.snapshot();
    assert!(!snap.captured);
    assert!(!snap.capturing);
    assert!(snap.error_message.is_some());
    assert!(h.sink.deliveries().is_empty());

    let records = h.reporter.records();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.source, ErrorSource::Capture);
    assert_eq!(record.context["phase"], "capture");
    assert_eq!(record.context["format"], "image/png");
    assert_eq!(record.context["currentTime"], 4.0);
    assert_eq!(record.context["kind"], "no_render_context");

    // The gate is released: the next attempt runs and fails again.
    h.controller.dispatch(SessionEvent::RequestCapture);
    h.controller.settle().await;
    assert_eq!(h.reporter.count(ErrorSource::Capture), 2);
}

#[tokio::test]
async fn failing_sink_is_a_capture_failure() {
    let dir = scratch("sinkfail");
    let blocker = dir.join("not-a-directory");
    std::fs::write(&blocker, b"file").unwrap();

    let (loader, _release, _) = FakeLoader::new();
    let reporter = Arc::new(MemoryReporter::new());
    let mut controller = SessionController::new(
        SessionSettings::default(),
        Arc::new(loader),
        Box::new(DirectorySink::new(blocker.join("out"))),
        reporter.clone(),
    );
    controller.dispatch(SessionEvent::SelectFile(fake_video(&dir, "clip.mp4", 8, 8)));
    controller.settle().await;
    controller.dispatch(SessionEvent::RequestCapture);
    controller.settle().await;

    let snap = controller.snapshot();
    assert!(!snap.captured);
    assert!(snap.error_message.is_some());
    assert_eq!(reporter.count(ErrorSource::Capture), 1);
}

#[tokio::test]
async fn broken_video_sets_load_failed() {
    let dir = scratch("broken");
    let mut h = harness(PipelineSettings::default());
    h.controller
        .dispatch(SessionEvent::SelectFile(fake_video(&dir, "broken.mp4", 0, 0)));
    h.controller.settle().await;

    let snap = h.controller.snapshot();
    assert_eq!(snap.phase, SessionPhase::Ready);
    assert!(!snap.loaded);
    assert_eq!(snap.error_message.as_deref(), Some(LOAD_FAILED_MESSAGE));
    assert_eq!(h.reporter.count(ErrorSource::Load), 1);

    h.controller.dispatch(SessionEvent::RequestCapture);
    assert!(!h.controller.snapshot().capturing);
}

#[tokio::test]
async fn reload_resets_flags_and_releases_previous_source() {
    let dir = scratch("reload");
    let mut h = harness(PipelineSettings::default());
    h.controller
        .dispatch(SessionEvent::SelectFile(fake_video(&dir, "first.mp4", 16, 16)));
    h.controller.settle().await;
    h.controller.dispatch(SessionEvent::RequestCapture);
    h.controller.settle().await;
    assert!(h.controller.snapshot().captured);

    h.controller
        .dispatch(SessionEvent::SelectFile(fake_video(&dir, "second.mp4", 48, 27)));
    let snap = h.controller.snapshot();
    assert_eq!(snap.phase, SessionPhase::Loading);
    assert!(!snap.captured && !snap.loaded);
    assert!(snap.error_message.is_none());
    assert_eq!(h.controller.live_sources(), 1);

    h.controller.settle().await;
    let meta = h.controller.snapshot().metadata.unwrap();
    assert_eq!((meta.width, meta.height), (48, 27));
    assert_eq!(h.controller.live_sources(), 1);
}

#[tokio::test]
async fn superseded_load_is_ignored() {
    let dir = scratch("stale");
    let mut h = harness(PipelineSettings::default());

    h.controller
        .dispatch(SessionEvent::SelectFile(fake_video(&dir, "slow.mp4", 100, 100)));
    h.controller
        .dispatch(SessionEvent::SelectFile(fake_video(&dir, "fast.mp4", 20, 10)));
    h.controller.settle().await;
    let settled = h.controller.snapshot();
    assert_eq!(settled.metadata.unwrap().width, 20);

    // Let the first load finish; its surface must be discarded.
    h.release.send(()).unwrap();
    assert!(h.controller.pump().await);
    assert_eq!(h.controller.snapshot(), settled);
    assert_eq!(h.controller.surface().unwrap().metadata().width, 20);
    assert_eq!(h.controller.live_sources(), 1);
}

#[tokio::test]
async fn observers_follow_every_change() {
    let dir = scratch("observers");
    let mut h = harness(PipelineSettings::default());
    let seen = Arc::new(Mutex::new(Vec::new()));
    h.controller.add_observer(Box::new(Recorder(seen.clone())));

    h.controller
        .dispatch(SessionEvent::SelectFile(fake_video(&dir, "clip.mp4", 16, 9)));
    h.controller.settle().await;
    h.controller.dispatch(SessionEvent::RequestCapture);
    h.controller.settle().await;
    // No change, no notification.
    h.controller.dispatch(SessionEvent::Key(Key::Char('x')));

    let phases: Vec<SessionPhase> = seen.lock().unwrap().iter().map(|s| s.phase).collect();
    assert_eq!(
        phases,
        vec![
            SessionPhase::Empty,
            SessionPhase::Loading,
            SessionPhase::Ready,
            SessionPhase::Capturing,
            SessionPhase::Ready,
        ]
    );
    assert_eq!(seen.lock().unwrap().last().unwrap(), &h.controller.snapshot());
}
