//! Text rendering of session state.

use std::fmt::Write as _;

use snapper_frame_model::format::ImageFormat;
use snapper_frame_model::session::{SessionPhase, SessionSnapshot};

/// Shown once a render failure abandoned the view and no message is known.
pub const FATAL_FALLBACK: &str = "Please restart the session and try again.";

pub const HELP_TEXT: &str = "\
Commands:
  <space> | space   play / pause
  play | pause      play / pause (also `toggle`)
  c | C | capture   capture the current frame
  seek <secs>       jump to a position
  format <fmt>      choose png, jpeg or webp
  open <path>       load another video
  status            show the current state
  help              show this help
  quit | exit       leave";

/// Render a snapshot as a block of lines.
pub fn render_session(snapshot: &SessionSnapshot) -> String {
    let mut out = String::new();

    match (&snapshot.source, &snapshot.metadata) {
        (None, _) => out.push_str("No video selected. Use `open <path>`.\n"),
        (Some(locator), Some(meta)) => {
            let _ = write!(out, "Video: {locator} ({}x{}", meta.width, meta.height);
            if let Some(duration) = meta.duration_secs {
                let _ = write!(out, ", {duration:.1} s");
            }
            out.push_str(")\n");
        }
        (Some(locator), None) => {
            let _ = writeln!(out, "Video: {locator}");
        }
    }

    let _ = writeln!(out, "Format: {}", format_list(snapshot.selected_format));

    if let Some(message) = &snapshot.error_message {
        let _ = writeln!(out, "❌ {message}");
    }

    if snapshot.phase == SessionPhase::Loading {
        out.push_str("Loading video…\n");
    } else if snapshot.capturing {
        out.push_str("Processing…\n");
    } else if snapshot.captured {
        match &snapshot.last_output {
            Some(path) => {
                let _ = writeln!(out, "✅ Snapshot saved: {}", path.display());
            }
            None => out.push_str("✅ Snapshot saved\n"),
        }
    }

    out
}

/// Supported formats with the selected one bracketed.
pub fn format_list(selected: ImageFormat) -> String {
    ImageFormat::ALL
        .iter()
        .map(|f| {
            if *f == selected {
                format!("[{}]", f.label())
            } else {
                f.label().to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// The notice that replaces the whole view after a render failure.
pub fn render_fatal(message: &str) -> String {
    let message = message.trim();
    let message = if message.is_empty() {
        FATAL_FALLBACK
    } else {
        message
    };
    format!("😵 Unexpected error\n{message}\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapper_frame_model::frame::VideoMetadata;
    use std::path::PathBuf;

    fn ready() -> SessionSnapshot {
        SessionSnapshot {
            phase: SessionPhase::Ready,
            source: Some("media-source:1".to_string()),
            loaded: true,
            metadata: Some(VideoMetadata {
                width: 640,
                height: 360,
                duration_secs: Some(12.04),
            }),
            ..SessionSnapshot::initial(ImageFormat::Webp)
        }
    }

    #[test]
    fn test_empty_session() {
        let text = render_session(&SessionSnapshot::initial(ImageFormat::Png));
        assert!(text.contains("No video selected"));
        assert!(text.contains("[PNG] JPEG WEBP"));
    }

    #[test]
    fn test_ready_session_shows_metadata() {
        let text = render_session(&ready());
        assert!(text.contains("Video: media-source:1 (640x360, 12.0 s)"));
        assert!(text.contains("PNG JPEG [WEBP]"));
        assert!(!text.contains('❌'));
    }

    #[test]
    fn test_processing_wins_over_captured() {
        let mut snap = ready();
        snap.capturing = true;
        snap.captured = true;
        snap.phase = SessionPhase::Capturing;
        let text = render_session(&snap);
        assert!(text.contains("Processing…"));
        assert!(!text.contains('✅'));
    }

    #[test]
    fn test_success_and_error_lines() {
        let mut snap = ready();
        snap.captured = true;
        snap.last_output = Some(PathBuf::from("out/snapshot.webp"));
        assert!(render_session(&snap).contains("✅ Snapshot saved: out/snapshot.webp"));

        let mut snap = ready();
        snap.error_message = Some("load failed".to_string());
        assert!(render_session(&snap).contains("❌ load failed"));
    }

    #[test]
    fn test_fatal_notice_falls_back() {
        assert!(render_fatal("").contains(FATAL_FALLBACK));
        assert!(render_fatal("boom").contains("boom"));
    }
}
