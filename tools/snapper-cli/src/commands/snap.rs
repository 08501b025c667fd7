//! One-shot capture.

use std::path::PathBuf;
use std::sync::Arc;

use snapper_capture_engine::{
    install_global_handlers, DirectorySink, ErrorReporter, SessionController, SessionEvent,
    TracingReporter,
};
use snapper_common::config::AppConfig;

pub async fn run(
    config: &AppConfig,
    video: PathBuf,
    at: Option<f64>,
    format: Option<String>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let format = super::resolve_format(format.as_deref(), config)?;
    let output_dir = super::output_dir(output, config);

    let reporter: Arc<dyn ErrorReporter> = Arc::new(TracingReporter);
    let _handlers = install_global_handlers(Arc::clone(&reporter));

    let mut controller = SessionController::new(
        super::session_settings(config, format),
        super::loader(config),
        Box::new(DirectorySink::new(&output_dir)),
        reporter,
    );

    controller.dispatch(SessionEvent::SelectFile(video.clone()));
    if controller.snapshot().source.is_none() {
        anyhow::bail!("Cannot open {}", video.display());
    }
    controller.settle().await;

    let snapshot = controller.snapshot();
    if !snapshot.loaded {
        anyhow::bail!(
            "Failed to load {}: {}",
            video.display(),
            snapshot.error_message.unwrap_or_default()
        );
    }
    if let Some(meta) = snapshot.metadata {
        println!("Loaded {} ({}x{})", video.display(), meta.width, meta.height);
    }

    if let Some(secs) = at {
        controller.dispatch(SessionEvent::Seek(secs));
        if controller.snapshot().error_message.is_some() {
            anyhow::bail!("Failed to seek to {secs}s");
        }
    }

    controller.dispatch(SessionEvent::RequestCapture);
    controller.settle().await;

    let snapshot = controller.snapshot();
    match (snapshot.captured, snapshot.last_output) {
        (true, Some(path)) => {
            println!("Saved {} ({})", path.display(), format.label());
            Ok(())
        }
        _ => anyhow::bail!(
            "Capture failed: {}",
            snapshot
                .error_message
                .unwrap_or_else(|| "unknown error".to_string())
        ),
    }
}
