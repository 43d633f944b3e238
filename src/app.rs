use std::time::{Duration, Instant};

use eframe::egui;

use crate::config::Config;
use crate::state::AppState;
use crate::ui::{panels, plot};

/// How often the data file is checked when watching is enabled.
const WATCH_INTERVAL: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct DashboardApp {
    pub state: AppState,
    /// When the data file's metadata was last read.
    last_poll: Instant,
}

impl DashboardApp {
    pub fn new(config: &Config) -> Self {
        Self {
            state: AppState::new(config),
            last_poll: Instant::now(),
        }
    }

    /// True at most once per [`WATCH_INTERVAL`], however often egui repaints.
    fn poll_due(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last_poll) < WATCH_INTERVAL {
            return false;
        }
        self.last_poll = now;
        true
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.state.watch_source {
            if self.poll_due(Instant::now()) && self.state.poll_source() {
                log::info!("Data file changed on disk, reloaded");
            }
            ctx.request_repaint_after(WATCH_INTERVAL);
        }

        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(280.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: charts ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::dashboard(ui, &self.state);
        });
    }
}
