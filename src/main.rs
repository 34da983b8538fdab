use annotate_canvas::app::{AnnotateApp, TITLE};
use annotate_canvas::{Cli, SurfaceConfig};
use clap::Parser;
use eframe::egui;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let config = SurfaceConfig::default();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([
                (config.width as f32 + 40.0).max(720.0),
                (config.height as f32 + 80.0).max(600.0),
            ])
            .with_title(TITLE),
        ..Default::default()
    };

    eframe::run_native(
        TITLE,
        options,
        Box::new(move |cc| Ok(Box::new(AnnotateApp::new(cc, config, cli.image)?))),
    )?;
    Ok(())
}
