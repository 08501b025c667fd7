//! Playback surface contracts.
//!
//! A surface is the native player for one loaded video: it owns decoding and
//! playback, and exposes the frame it is currently displaying so the capture
//! pipeline can snapshot it.

use snapper_common::error::{SnapperError, SnapperResult};
use snapper_frame_model::frame::{VideoFrame, VideoMetadata};

use crate::source::MediaSource;

/// A live, decoded video the user can play, pause and scrub.
pub trait VideoSurface: Send {
    /// Metadata decoded when the surface was opened.
    fn metadata(&self) -> VideoMetadata;

    /// Native decoded size, independent of any display size.
    fn intrinsic_size(&self) -> (u32, u32) {
        let meta = self.metadata();
        (meta.width, meta.height)
    }

    /// Current playback position in seconds.
    fn current_time_secs(&self) -> f64;

    /// The frame currently on display.
    fn current_frame(&self) -> SnapperResult<VideoFrame>;

    fn is_paused(&self) -> bool;

    fn play(&mut self) -> SnapperResult<()>;

    fn pause(&mut self) -> SnapperResult<()>;

    /// Move the playhead. Precision is whatever the backend offers.
    fn seek(&mut self, secs: f64) -> SnapperResult<()>;

    /// Take an error the backend raised on its own since the last call, such
    /// as a decode failure while playing. Surfaces that only fail
    /// synchronously never have one.
    fn take_error(&mut self) -> Option<SnapperError> {
        None
    }

    /// Play if paused, pause if playing.
    fn toggle_playback(&mut self) -> SnapperResult<()> {
        if self.is_paused() {
            self.play()
        } else {
            self.pause()
        }
    }
}

/// Opens surfaces for media sources.
///
/// `load` blocks until the video's metadata is known or loading failed, so
/// callers run it off the event thread.
pub trait SurfaceLoader: Send + Sync {
    fn load(&self, source: &MediaSource) -> SnapperResult<Box<dyn VideoSurface>>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}
