//! Show what the media backend sees in a video.

use std::path::PathBuf;

use snapper_capture_engine::{SourceRegistry, SurfaceLoader};
use snapper_common::config::AppConfig;

pub fn run(config: &AppConfig, video: PathBuf, json: bool) -> anyhow::Result<()> {
    let mut registry = SourceRegistry::new();
    let source = registry.create(&video)?;
    let loader = super::loader(config);

    let surface = loader
        .load(&source)
        .map_err(|e| anyhow::anyhow!("Failed to load {}: {e}", video.display()))?;
    let meta = surface.metadata();

    if json {
        let report = serde_json::json!({
            "path": source.path,
            "size_bytes": source.size_bytes,
            "metadata": meta,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Video: {}", source.path.display());
    println!("  Size on disk: {} bytes", source.size_bytes);
    println!("  Intrinsic size: {}x{}", meta.width, meta.height);
    match meta.duration_secs {
        Some(secs) => println!("  Duration: {secs:.3}s"),
        None => println!("  Duration: unknown"),
    }
    if !meta.has_picture() {
        println!("  [WARN] No video stream with a picture; captures will fail");
    }

    drop(surface);
    registry.revoke(source.id);
    Ok(())
}
