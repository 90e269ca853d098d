//! Multiplot - Interactive Multi-File Analysis
//!
//! Desktop window for importing delimited files and plotting their columns
//! against each other.

mod gui;

use eframe::egui;
use gui::MultiplotApp;

fn main() -> eframe::Result<()> {
    // Set RUST_LOG=debug for verbose logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Configure native options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 800.0])
            .with_min_inner_size([1200.0, 700.0])
            .with_title("Multiplot"),
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        "Multiplot",
        options,
        Box::new(|cc| Ok(Box::new(MultiplotApp::new(cc)))),
    )
}
