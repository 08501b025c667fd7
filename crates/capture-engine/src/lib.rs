//! Video Snapper capture engine
//!
//! Loads a local video into a playback surface, lets the user scrub it, and
//! snapshots the frame on display into PNG, JPEG or WebP.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                  SessionController                   │
//! │   events ──▶ dispatch ──▶ SessionMachine ──▶ Command  │
//! │                 │                              │     │
//! │                 ▼                              ▼     │
//! │  ┌───────────────┐   ┌─────────────────────────────┐ │
//! │  │ SurfaceLoader │   │       CapturePipeline       │ │
//! │  │ (GStreamer)   │   │ RasterBuffer ─▶ encode_image│ │
//! │  └───────┬───────┘   └──────────────┬──────────────┘ │
//! │          │ VideoSurface             │ CaptureResult  │
//! │          ▼                          ▼                │
//! │   SourceRegistry              DownloadSink           │
//! └──────────────────────────────────────────────────────┘
//!           failures ──▶ ErrorReporter ◀── Supervisor
//! ```

pub mod encode;
pub mod gst_surface;
pub mod keys;
pub mod machine;
pub mod pipeline;
pub mod raster;
pub mod reporter;
pub mod session;
pub mod sink;
pub mod source;
pub mod supervisor;
pub mod surface;
pub mod view;

pub use gst_surface::{GstSurfaceLoader, GstVideoSurface};
pub use keys::{Key, Shortcut};
pub use machine::{CaptureTicket, SessionMachine};
pub use pipeline::{CapturePipeline, PendingEncode, PipelineSettings};
pub use reporter::{ErrorRecord, ErrorReporter, ErrorSource, MemoryReporter, TracingReporter};
pub use session::*;
pub use sink::{DirectorySink, DownloadSink, MemorySink};
pub use source::{MediaSource, SourceId, SourceRegistry};
pub use supervisor::{install_global_handlers, spawn_watched, Supervisor};
pub use surface::{SurfaceLoader, VideoSurface};
