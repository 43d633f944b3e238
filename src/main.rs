mod app;
mod color;
mod config;
mod data;
mod error;
mod state;
mod ui;

use app::DashboardApp;
use config::Config;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let config = Config::from_env().unwrap_or_else(|e| {
        log::warn!("Ignoring configuration: {e:#}");
        Config::default()
    });
    log::info!(
        "Data file {}, slider bounds {:?}, watch {}",
        config.data_path.display(),
        config.bounds_policy,
        config.watch_source
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Dashboard de Inflação no Brasil",
        options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(egui::Visuals::dark());
            Ok(Box::new(DashboardApp::new(&config)))
        }),
    )
}
