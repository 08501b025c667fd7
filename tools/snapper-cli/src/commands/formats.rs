//! List supported output formats.

use snapper_frame_model::format::ImageFormat;

pub fn run() -> anyhow::Result<()> {
    println!("{:<6} {:<12} {:<16} ALPHA", "NAME", "MIME", "FILE");
    for format in ImageFormat::ALL {
        println!(
            "{:<6} {:<12} {:<16} {}",
            format.label(),
            format.mime_type(),
            format.snapshot_filename(),
            if format.supports_alpha() { "yes" } else { "no" }
        );
    }
    Ok(())
}
