use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::color::index_color;
use crate::data::model::{IndexKind, Measure, NumericRange};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filtros");
    ui.separator();

    if state.table.is_none() {
        ui.label("Nenhum conjunto de dados carregado.");
        return;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            year_selectors(ui, state);
            ui.separator();
            index_selector(ui, state);
            ui.separator();
            for measure in Measure::ALL {
                range_slider(ui, state, measure);
                ui.add_space(6.0);
            }
            if ui.button("Restaurar faixas").clicked() {
                state.reset_ranges();
            }
        });
}

fn year_selectors(ui: &mut Ui, state: &mut AppState) {
    let years = state.years.clone();
    let mut start = state.year_start;
    let mut end = state.year_end;

    egui::ComboBox::from_label("Ano inicial")
        .selected_text(start.to_string())
        .show_ui(ui, |ui: &mut Ui| {
            for &y in &years {
                ui.selectable_value(&mut start, y, y.to_string());
            }
        });
    // Latest year first, like the start selector reversed.
    egui::ComboBox::from_label("Ano final")
        .selected_text(end.to_string())
        .show_ui(ui, |ui: &mut Ui| {
            for &y in years.iter().rev() {
                ui.selectable_value(&mut end, y, y.to_string());
            }
        });

    if (start, end) != (state.year_start, state.year_end) {
        state.set_years(start, end);
    }
}

fn index_selector(ui: &mut Ui, state: &mut AppState) {
    ui.strong("Índices para comparação (variação mensal)");
    for kind in IndexKind::ALL {
        let mut checked = state.selected_indices.contains(&kind);
        let text = RichText::new(kind.display_name()).color(index_color(kind));
        if ui.checkbox(&mut checked, text).changed() {
            state.toggle_index(kind);
        }
    }
}

/// Two sliders (min and max) spanning the measure's current bounds.
fn range_slider(ui: &mut Ui, state: &mut AppState, measure: Measure) {
    ui.strong(measure.label());
    let Some((bounds, selection)) = state.slider(measure) else {
        ui.label(RichText::new("sem dados no período").weak());
        return;
    };

    let mut lo = selection.min;
    let mut hi = selection.max;
    let span = bounds.min..=bounds.max;
    let lo_changed = ui
        .add(egui::Slider::new(&mut lo, span.clone()).text("mín"))
        .changed();
    let hi_changed = ui
        .add(egui::Slider::new(&mut hi, span).text("máx"))
        .changed();

    // Keep min <= max: the handle being dragged pushes the other one.
    if lo_changed && lo > hi {
        hi = lo;
    } else if hi_changed && hi < lo {
        lo = hi;
    }
    if lo_changed || hi_changed {
        state.set_range(measure, NumericRange::new(lo, hi));
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("Arquivo", |ui: &mut Ui| {
            if ui.button("Abrir…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(state.cache.is_some(), egui::Button::new("Recarregar"))
                .clicked()
            {
                state.reload();
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(table) = &state.table {
            ui.label(format!(
                "{} meses carregados, {} visíveis",
                table.len(),
                state.visible_len()
            ));
        }
        if let Some(cache) = &state.cache {
            ui.label(RichText::new(cache.path().display().to_string()).weak());
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Abrir dados de inflação")
        .add_filter("Formatos suportados", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.open(path);
    }
}
