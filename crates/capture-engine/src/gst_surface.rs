//! GStreamer-backed playback surface.
//!
//! Each surface is a `playbin` whose audio and video sinks are `fakesink`s:
//! nothing is shown on screen, but the pipeline keeps its last rendered video
//! sample, which `convert-sample` hands back as RGBA on demand.

use std::sync::OnceLock;

use gst::prelude::*;
use gstreamer as gst;
use snapper_common::error::{SnapperError, SnapperResult};
use snapper_frame_model::frame::{PixelLayout, VideoFrame, VideoMetadata};

use crate::source::MediaSource;
use crate::surface::{SurfaceLoader, VideoSurface};

/// How long a seek may take to settle before the frame is read anyway.
const SEEK_SETTLE_SECS: u64 = 5;

/// Opens [`GstVideoSurface`]s.
#[derive(Debug, Clone)]
pub struct GstSurfaceLoader {
    load_timeout_secs: u64,
}

impl GstSurfaceLoader {
    pub fn new(load_timeout_secs: u64) -> Self {
        Self {
            load_timeout_secs: load_timeout_secs.max(1),
        }
    }
}

impl Default for GstSurfaceLoader {
    fn default() -> Self {
        Self::new(10)
    }
}

impl SurfaceLoader for GstSurfaceLoader {
    fn load(&self, source: &MediaSource) -> SnapperResult<Box<dyn VideoSurface>> {
        let surface = GstVideoSurface::open(source, self.load_timeout_secs)?;
        Ok(Box::new(surface))
    }

    fn name(&self) -> &str {
        "gstreamer"
    }
}

/// A paused-on-open `playbin` for one media source.
pub struct GstVideoSurface {
    locator: String,
    pipeline: gst::Pipeline,
    metadata: VideoMetadata,
}

impl GstVideoSurface {
    /// Open `source` and preroll it so metadata and the first frame exist.
    pub fn open(source: &MediaSource, timeout_secs: u64) -> SnapperResult<Self> {
        init_gstreamer()?;

        let uri = gst::glib::filename_to_uri(&source.path, None)
            .map_err(|e| SnapperError::load(format!("Invalid media path: {e}")))?;

        let playbin = gst::ElementFactory::make("playbin")
            .name(format!("snapper-{}", source.id.get()))
            .property("uri", uri.as_str())
            .build()
            .map_err(|e| SnapperError::load(format!("Failed to create playbin: {e}")))?;
        let video_sink = make_fakesink()?;
        let audio_sink = make_fakesink()?;
        playbin.set_property("video-sink", &video_sink);
        playbin.set_property("audio-sink", &audio_sink);

        let pipeline = playbin
            .dynamic_cast::<gst::Pipeline>()
            .map_err(|_| SnapperError::load("playbin is not a pipeline"))?;

        let mut surface = Self {
            locator: source.locator(),
            pipeline,
            metadata: VideoMetadata {
                width: 0,
                height: 0,
                duration_secs: None,
            },
        };

        surface
            .pipeline
            .set_state(gst::State::Paused)
            .map_err(|e| SnapperError::load(format!("Failed to open media: {e:?}")))?;
        surface.wait_for_preroll(timeout_secs)?;
        surface.metadata = surface.read_metadata();

        tracing::info!(
            source = %surface.locator,
            width = surface.metadata.width,
            height = surface.metadata.height,
            duration_secs = ?surface.metadata.duration_secs,
            "Media prerolled"
        );
        Ok(surface)
    }

    fn wait_for_preroll(&self, timeout_secs: u64) -> SnapperResult<()> {
        let bus = self
            .pipeline
            .bus()
            .ok_or_else(|| SnapperError::load("Pipeline has no bus"))?;

        let message = bus.timed_pop_filtered(
            gst::ClockTime::from_seconds(timeout_secs),
            &[gst::MessageType::AsyncDone, gst::MessageType::Error],
        );
        match message {
            Some(msg) => match msg.view() {
                gst::MessageView::Error(err) => Err(SnapperError::load(format!(
                    "{} (from {:?})",
                    err.error(),
                    err.src().map(|s| s.path_string())
                ))),
                _ => Ok(()),
            },
            None => Err(SnapperError::load(format!(
                "Media did not finish loading within {timeout_secs}s"
            ))),
        }
    }

    fn read_metadata(&self) -> VideoMetadata {
        let (width, height) = self.video_pad_size().unwrap_or((0, 0));
        let duration_secs = self
            .pipeline
            .query_duration::<gst::ClockTime>()
            .map(clock_to_secs);
        VideoMetadata {
            width,
            height,
            duration_secs,
        }
    }

    fn video_pad_size(&self) -> Option<(u32, u32)> {
        let pad = self
            .pipeline
            .emit_by_name::<Option<gst::Pad>>("get-video-pad", &[&0i32])?;
        let caps = pad.current_caps()?;
        let structure = caps.structure(0)?;
        let width = structure.get::<i32>("width").ok()?;
        let height = structure.get::<i32>("height").ok()?;
        Some((u32::try_from(width).ok()?, u32::try_from(height).ok()?))
    }

    fn set_state(&self, state: gst::State) -> SnapperResult<()> {
        self.pipeline.set_state(state).map_err(|e| {
            SnapperError::playback(format!(
                "Failed to switch {} to {state:?}: {e:?}",
                self.locator
            ))
        })?;
        Ok(())
    }
}

impl VideoSurface for GstVideoSurface {
    fn metadata(&self) -> VideoMetadata {
        self.metadata
    }

    fn current_time_secs(&self) -> f64 {
        self.pipeline
            .query_position::<gst::ClockTime>()
            .map(clock_to_secs)
            .unwrap_or(0.0)
    }

    fn current_frame(&self) -> SnapperResult<VideoFrame> {
        let caps = gst::Caps::builder("video/x-raw")
            .field("format", "RGBA")
            .build();
        let sample = self
            .pipeline
            .emit_by_name::<Option<gst::Sample>>("convert-sample", &[&caps])
            .ok_or_else(|| SnapperError::unknown("No video frame has been rendered yet"))?;

        let structure = sample
            .caps()
            .and_then(|c| c.structure(0))
            .ok_or_else(|| SnapperError::unknown("Converted frame has no caps"))?;
        let width = structure
            .get::<i32>("width")
            .map_err(|e| SnapperError::unknown(format!("Converted frame has no width: {e}")))?;
        let height = structure
            .get::<i32>("height")
            .map_err(|e| SnapperError::unknown(format!("Converted frame has no height: {e}")))?;
        let (width, height) = (width.max(0) as u32, height.max(0) as u32);

        let buffer = sample
            .buffer()
            .ok_or_else(|| SnapperError::unknown("Converted frame has no buffer"))?;
        let map = buffer
            .map_readable()
            .map_err(|e| SnapperError::unknown(format!("Failed to map frame buffer: {e}")))?;

        let stride = if height == 0 {
            width as usize * 4
        } else {
            map.as_slice().len() / height as usize
        };
        Ok(VideoFrame {
            width,
            height,
            stride,
            layout: PixelLayout::Rgba8,
            data: map.as_slice().to_vec(),
        })
    }

    fn is_paused(&self) -> bool {
        self.pipeline.current_state() != gst::State::Playing
    }

    fn play(&mut self) -> SnapperResult<()> {
        self.set_state(gst::State::Playing)?;
        tracing::debug!(source = %self.locator, "Playing");
        Ok(())
    }

    fn pause(&mut self) -> SnapperResult<()> {
        self.set_state(gst::State::Paused)?;
        tracing::debug!(source = %self.locator, "Paused");
        Ok(())
    }

    fn seek(&mut self, secs: f64) -> SnapperResult<()> {
        let target = match self.metadata.duration_secs {
            Some(duration) => secs.clamp(0.0, duration),
            None => secs.max(0.0),
        };
        let position = secs_to_clock(target)?;
        self.pipeline
            .seek_simple(gst::SeekFlags::FLUSH | gst::SeekFlags::ACCURATE, position)
            .map_err(|e| SnapperError::playback(format!("Seek to {target:.3}s failed: {e}")))?;

        // Flushing seeks re-preroll asynchronously; wait so the next frame read
        // reflects the new position.
        let (result, _, _) = self
            .pipeline
            .state(gst::ClockTime::from_seconds(SEEK_SETTLE_SECS));
        if let Err(e) = result {
            return Err(SnapperError::playback(format!(
                "Pipeline failed to settle after seek: {e:?}"
            )));
        }
        tracing::debug!(source = %self.locator, secs = target, "Seeked");
        Ok(())
    }

    fn take_error(&mut self) -> Option<SnapperError> {
        let bus = self.pipeline.bus()?;
        let msg = bus.pop_filtered(&[gst::MessageType::Error])?;
        match msg.view() {
            gst::MessageView::Error(err) => {
                tracing::warn!(
                    source = %self.locator,
                    error = %err.error(),
                    debug = ?err.debug(),
                    "Pipeline error"
                );
                Some(SnapperError::playback(format!(
                    "{} (from {:?})",
                    err.error(),
                    err.src().map(|s| s.path_string())
                )))
            }
            _ => None,
        }
    }
}

impl Drop for GstVideoSurface {
    fn drop(&mut self) {
        if let Err(e) = self.pipeline.set_state(gst::State::Null) {
            tracing::warn!(source = %self.locator, error = ?e, "Failed to shut down pipeline");
        }
    }
}

fn make_fakesink() -> SnapperResult<gst::Element> {
    gst::ElementFactory::make("fakesink")
        .property("sync", true)
        .build()
        .map_err(|e| SnapperError::load(format!("Failed to create fakesink: {e}")))
}

/// Convert a playhead position to a clock time. Negative positions start at
/// zero; positions past what a clock time can hold are refused.
fn secs_to_clock(secs: f64) -> SnapperResult<gst::ClockTime> {
    if !secs.is_finite() {
        return Err(SnapperError::playback(format!("Cannot seek to {secs}")));
    }
    let nanos = (secs.max(0.0) * 1_000_000_000.0).round();
    if nanos >= gst::ClockTime::MAX.nseconds() as f64 {
        return Err(SnapperError::playback(format!(
            "Seek position {secs}s is out of range"
        )));
    }
    Ok(gst::ClockTime::from_nseconds(nanos as u64))
}

fn clock_to_secs(time: gst::ClockTime) -> f64 {
    time.nseconds() as f64 / 1_000_000_000.0
}

fn init_gstreamer() -> SnapperResult<()> {
    static GST_INIT: OnceLock<Result<(), String>> = OnceLock::new();
    let init_res = GST_INIT.get_or_init(|| gst::init().map_err(|e| e.to_string()));
    match init_res {
        Ok(()) => Ok(()),
        Err(e) => Err(SnapperError::load(format!(
            "Failed to initialize GStreamer: {e}"
        ))),
    }
}
