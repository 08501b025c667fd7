//! Line-driven capture session.
//!
//! Each line on stdin is one command. A line holding a single space (or the
//! word `space`) toggles playback and `c` captures, mirroring the player's
//! keyboard shortcuts.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;

use snapper_capture_engine::view::{render_session, HELP_TEXT};
use snapper_capture_engine::{
    install_global_handlers, DirectorySink, ErrorRecord, ErrorReporter, ErrorSource, EventSender,
    Key, SessionController, SessionEvent, SessionObserver, Supervisor, TracingReporter,
};
use snapper_common::config::AppConfig;
use snapper_common::error::SnapperResult;
use snapper_frame_model::format::ImageFormat;
use snapper_frame_model::session::SessionSnapshot;

/// What one line of input asks for.
#[derive(Debug)]
enum LineCommand {
    Event(SessionEvent),
    Status,
    Help,
    Quit,
    Invalid(String),
}

fn parse_line(line: &str) -> Option<LineCommand> {
    if let Some(key) = Key::from_line(line) {
        return Some(LineCommand::Event(SessionEvent::Key(key)));
    }

    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let command = match word.to_ascii_lowercase().as_str() {
        "seek" => match super::parse_seconds(rest) {
            Ok(secs) => LineCommand::Event(SessionEvent::Seek(secs)),
            Err(e) => LineCommand::Invalid(format!("`seek` needs a number of seconds: {e}")),
        },
        "format" => match rest.parse::<ImageFormat>() {
            Ok(format) => LineCommand::Event(SessionEvent::SelectFormat(format)),
            Err(e) => LineCommand::Invalid(e.to_string()),
        },
        "open" if !rest.is_empty() => {
            LineCommand::Event(SessionEvent::SelectFile(PathBuf::from(rest)))
        }
        "open" => LineCommand::Invalid("`open` needs a path".to_string()),
        "capture" => LineCommand::Event(SessionEvent::RequestCapture),
        "play" | "pause" | "toggle" => LineCommand::Event(SessionEvent::TogglePlayback),
        "status" => LineCommand::Status,
        "help" => LineCommand::Help,
        "quit" | "exit" => LineCommand::Quit,
        other => LineCommand::Invalid(format!("unknown command `{other}`, try `help`")),
    };
    Some(command)
}

/// Prints every state change through the render boundary and publishes the
/// latest snapshot for `status`.
struct TerminalView {
    supervisor: Arc<Supervisor>,
    latest: watch::Sender<SessionSnapshot>,
    notice_shown: bool,
}

impl SessionObserver for TerminalView {
    fn on_change(&mut self, snapshot: &SessionSnapshot) {
        self.latest.send_replace(snapshot.clone());

        let view = self.supervisor.render(|| {
            let view = render_session(snapshot);
            let mut out = std::io::stdout().lock();
            writeln!(out, "{view}")?;
            out.flush()?;
            Ok(view)
        });
        if self.supervisor.is_fatal() && !self.notice_shown {
            eprintln!("{view}");
            self.notice_shown = true;
        }
    }
}

/// Read stdin line by line and feed the session until `quit` or EOF.
///
/// Runs on its own thread: a blocking read must not keep the runtime from
/// shutting down.
fn read_commands(events: EventSender, latest: watch::Receiver<SessionSnapshot>) -> SnapperResult<()> {
    for line in std::io::stdin().lock().lines() {
        let line = line?;
        match parse_line(&line) {
            None => {}
            Some(LineCommand::Event(event)) => {
                if events.send(event).is_err() {
                    return Ok(());
                }
            }
            Some(LineCommand::Status) => println!("{}", render_session(&latest.borrow())),
            Some(LineCommand::Help) => println!("{HELP_TEXT}"),
            Some(LineCommand::Invalid(message)) => eprintln!("{message}"),
            Some(LineCommand::Quit) => break,
        }
    }
    events.send(SessionEvent::Shutdown).ok();
    Ok(())
}

pub async fn run(
    config: &AppConfig,
    video: PathBuf,
    format: Option<String>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let format = super::resolve_format(format.as_deref(), config)?;
    let output_dir = super::output_dir(output, config);

    let reporter: Arc<dyn ErrorReporter> = Arc::new(TracingReporter);
    let _handlers = install_global_handlers(Arc::clone(&reporter));
    let supervisor = Arc::new(Supervisor::new(Arc::clone(&reporter)));

    let mut controller = SessionController::new(
        super::session_settings(config, format),
        super::loader(config),
        Box::new(DirectorySink::new(&output_dir)),
        Arc::clone(&reporter),
    );

    println!("Snapshots are saved to {}", output_dir.display());
    println!("{HELP_TEXT}\n");

    let (latest_tx, latest_rx) = watch::channel(controller.snapshot());
    controller.add_observer(Box::new(TerminalView {
        supervisor: Arc::clone(&supervisor),
        latest: latest_tx,
        notice_shown: false,
    }));

    controller.dispatch(SessionEvent::SelectFile(video));

    let events = controller.sender();
    std::thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            if let Err(e) = read_commands(events.clone(), latest_rx) {
                reporter.report(
                    ErrorRecord::from_error(ErrorSource::Unhandled, &e).with_context("task", "stdin"),
                );
                events.send(SessionEvent::Shutdown).ok();
            }
        })?;

    while controller.pump().await {
        if supervisor.is_fatal() {
            break;
        }
    }

    match supervisor.fatal_message() {
        Some(message) => anyhow::bail!("View failed: {message}"),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortcut_lines() {
        assert!(matches!(
            parse_line(" "),
            Some(LineCommand::Event(SessionEvent::Key(Key::Space)))
        ));
        assert!(matches!(
            parse_line("C"),
            Some(LineCommand::Event(SessionEvent::Key(Key::Char('C'))))
        ));
        assert!(parse_line("").is_none());
    }

    #[test]
    fn test_word_commands() {
        assert!(matches!(
            parse_line("seek 12.5"),
            Some(LineCommand::Event(SessionEvent::Seek(s))) if s == 12.5
        ));
        assert!(matches!(
            parse_line("format JPG"),
            Some(LineCommand::Event(SessionEvent::SelectFormat(ImageFormat::Jpeg)))
        ));
        assert!(matches!(
            parse_line("open /videos/my clip.mp4"),
            Some(LineCommand::Event(SessionEvent::SelectFile(p))) if p == PathBuf::from("/videos/my clip.mp4")
        ));
        assert!(matches!(parse_line("status"), Some(LineCommand::Status)));
        assert!(matches!(parse_line("quit"), Some(LineCommand::Quit)));
    }

    #[test]
    fn test_invalid_commands() {
        assert!(matches!(parse_line("seek soon"), Some(LineCommand::Invalid(_))));
        assert!(matches!(parse_line("seek inf"), Some(LineCommand::Invalid(_))));
        assert!(matches!(parse_line("format gif"), Some(LineCommand::Invalid(_))));
        assert!(matches!(parse_line("open"), Some(LineCommand::Invalid(_))));
        assert!(matches!(parse_line("dance"), Some(LineCommand::Invalid(_))));
    }

    #[test]
    fn test_help_lists_every_word_command() {
        for word in [
            "space", "play", "pause", "toggle", "capture", "seek", "format", "open", "status",
            "help", "quit", "exit",
        ] {
            assert!(HELP_TEXT.contains(word), "help does not mention `{word}`");
            assert!(
                !matches!(parse_line(word), Some(LineCommand::Invalid(m)) if m.starts_with("unknown")),
                "`{word}` is not accepted"
            );
        }
    }
}
