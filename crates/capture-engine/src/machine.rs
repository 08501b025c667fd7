//! Session state machine.
//!
//! ```text
//!            selectFile                metadataAvailable
//!   Empty ─────────────▶ Loading ─────────────────────────▶ Ready(loaded)
//!                           │                                 │   ▲
//!                           │ loadError                capture│   │success / failure
//!                           ▼                                 ▼   │
//!                    Ready(!loaded, "load failed")          Capturing
//! ```
//!
//! `selectFile` is accepted in every state and always restarts at Loading.
//! The machine is pure: it never touches surfaces, sinks or reporters. It
//! applies [`Input`]s and answers with at most one [`Command`] for the
//! controller to execute.

use std::path::PathBuf;

use snapper_frame_model::format::ImageFormat;
use snapper_frame_model::frame::VideoMetadata;
use snapper_frame_model::session::{SessionPhase, SessionSnapshot};

use crate::source::SourceId;

/// Message shown when the surface fails to load or decode.
pub const LOAD_FAILED_MESSAGE: &str = "load failed";

/// Identity of one capture request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureTicket {
    pub id: u64,
    pub source: SourceId,
    pub format: ImageFormat,
}

/// Something that happened, as far as the machine is concerned.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    FileSelected(SourceId),
    MetadataAvailable {
        source: SourceId,
        metadata: VideoMetadata,
    },
    LoadFailed {
        source: SourceId,
    },
    FormatSelected(ImageFormat),
    CaptureRequested,
    CaptureSucceeded {
        ticket: u64,
        output: PathBuf,
    },
    CaptureFailed {
        ticket: u64,
        detail: String,
    },
}

/// Work the controller must do as a consequence of an input.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    BeginCapture(CaptureTicket),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadPhase {
    Empty,
    Loading,
    Ready,
}

/// The one session of a running instance.
#[derive(Debug)]
pub struct SessionMachine {
    phase: LoadPhase,
    source: Option<SourceId>,
    format: ImageFormat,
    loaded: bool,
    in_flight: Option<CaptureTicket>,
    captured: bool,
    error_message: Option<String>,
    metadata: Option<VideoMetadata>,
    last_output: Option<PathBuf>,
    next_ticket: u64,
}

impl SessionMachine {
    pub fn new(format: ImageFormat) -> Self {
        Self {
            phase: LoadPhase::Empty,
            source: None,
            format,
            loaded: false,
            in_flight: None,
            captured: false,
            error_message: None,
            metadata: None,
            last_output: None,
            next_ticket: 0,
        }
    }

    /// Apply one input. This is the only way the session changes.
    pub fn apply(&mut self, input: Input) -> Option<Command> {
        match input {
            Input::FileSelected(source) => {
                self.phase = LoadPhase::Loading;
                self.source = Some(source);
                self.loaded = false;
                self.captured = false;
                self.error_message = None;
                self.metadata = None;
                None
            }
            Input::MetadataAvailable { source, metadata } => {
                if self.phase != LoadPhase::Loading || self.source != Some(source) {
                    tracing::debug!(source = %source, "Ignoring stale metadata");
                    return None;
                }
                self.phase = LoadPhase::Ready;
                self.loaded = true;
                self.metadata = Some(metadata);
                None
            }
            Input::LoadFailed { source } => {
                if self.source != Some(source) {
                    tracing::debug!(source = %source, "Ignoring load failure of replaced source");
                    return None;
                }
                match self.phase {
                    LoadPhase::Loading => {
                        self.phase = LoadPhase::Ready;
                        self.loaded = false;
                        self.error_message = Some(LOAD_FAILED_MESSAGE.to_string());
                    }
                    LoadPhase::Ready if self.in_flight.is_none() => {
                        self.error_message = Some(LOAD_FAILED_MESSAGE.to_string());
                    }
                    _ => {}
                }
                None
            }
            Input::FormatSelected(format) => {
                self.format = format;
                None
            }
            Input::CaptureRequested => {
                if !self.loaded || self.phase != LoadPhase::Ready || self.in_flight.is_some() {
                    return None;
                }
                let source = self.source?;
                self.next_ticket += 1;
                let ticket = CaptureTicket {
                    id: self.next_ticket,
                    source,
                    format: self.format,
                };
                self.error_message = None;
                self.captured = false;
                self.in_flight = Some(ticket);
                Some(Command::BeginCapture(ticket))
            }
            Input::CaptureSucceeded { ticket, output } => {
                if let Some(current) = self.finish_ticket(ticket) {
                    self.captured = true;
                    self.error_message = None;
                    self.last_output = Some(output);
                    tracing::debug!(ticket = current.id, "Capture completed");
                }
                None
            }
            Input::CaptureFailed { ticket, detail } => {
                if self.finish_ticket(ticket).is_some() {
                    self.captured = false;
                    self.error_message = Some(detail);
                }
                None
            }
        }
    }

    /// Release the in-flight gate for `ticket`. Returns the ticket only if
    /// its outcome still belongs to the current source.
    fn finish_ticket(&mut self, ticket: u64) -> Option<CaptureTicket> {
        let current = self.in_flight.filter(|t| t.id == ticket)?;
        self.in_flight = None;
        if self.source == Some(current.source) && self.phase == LoadPhase::Ready {
            Some(current)
        } else {
            tracing::debug!(ticket, "Capture outcome belongs to a replaced source");
            None
        }
    }

    pub fn source(&self) -> Option<SourceId> {
        self.source
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        // A ticket left over from a replaced source still holds the gate, but
        // the current video is not being captured.
        let capturing = self
            .in_flight
            .is_some_and(|t| Some(t.source) == self.source);
        let phase = match self.phase {
            LoadPhase::Empty => SessionPhase::Empty,
            LoadPhase::Loading => SessionPhase::Loading,
            LoadPhase::Ready if capturing => SessionPhase::Capturing,
            LoadPhase::Ready => SessionPhase::Ready,
        };
        SessionSnapshot {
            phase,
            source: self.source.map(|s| s.to_string()),
            selected_format: self.format,
            loaded: self.loaded,
            capturing,
            captured: self.captured,
            error_message: self.error_message.clone(),
            metadata: self.metadata,
            last_output: self.last_output.clone(),
        }
    }
}
