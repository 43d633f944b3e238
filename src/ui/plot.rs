use std::f64::consts::TAU;

use chrono::{Datelike, NaiveDate};
use eframe::egui::{Color32, RichText, ScrollArea, Stroke, Ui};
use egui_plot::{Legend, Line, Plot, PlotPoint, Polygon, Text};

use crate::color::{generate_palette, index_color};
use crate::data::projection::{IndexShare, SeriesPoint};
use crate::state::AppState;

const CHART_HEIGHT: f32 = 320.0;

// ---------------------------------------------------------------------------
// Dashboard (central panel)
// ---------------------------------------------------------------------------

/// Render the title and the 2×2 chart grid.
pub fn dashboard(ui: &mut Ui, state: &AppState) {
    ui.vertical_centered(|ui: &mut Ui| {
        ui.heading(RichText::new("Dashboard de Inflação no Brasil").size(32.0).strong());
    });
    ui.add_space(6.0);

    if state.table.is_none() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Abra um arquivo de dados  (Arquivo → Abrir…)");
        });
        return;
    }

    let p = &state.projections;
    let colors = generate_palette(4);

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.columns(2, |cols| {
                time_chart(
                    &mut cols[0],
                    "ipca_12m",
                    "IPCA Acumulado em 12 Meses",
                    "IPCA (12M)",
                    &[("IPCA 12M", &p.ipca_12m, colors[0])],
                );
                share_chart(&mut cols[1], &p.index_share);
            });
            ui.add_space(8.0);
            ui.columns(2, |cols| {
                time_chart(
                    &mut cols[0],
                    "selic_ipca",
                    "Relação entre Selic e IPCA (Variação Mensal)",
                    "Taxa (%)",
                    &[
                        ("Selic meta", &p.selic_vs_ipca.selic, colors[1]),
                        ("IPCA", &p.selic_vs_ipca.ipca, colors[2]),
                    ],
                );
                time_chart(
                    &mut cols[1],
                    "minimum_wage",
                    "Evolução do Salário Mínimo",
                    "Salário Mínimo (R$)",
                    &[("Salário mínimo", &p.minimum_wage, colors[3])],
                );
            });
        });
}

// ---------------------------------------------------------------------------
// Dated line charts
// ---------------------------------------------------------------------------

/// Dates are plotted as days since the Common Era.
fn date_x(date: NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce())
}

fn format_date_x(x: f64) -> String {
    NaiveDate::from_num_days_from_ce_opt(x.round() as i32)
        .map(|d| d.format("%Y-%m").to_string())
        .unwrap_or_default()
}

fn points(series: &[SeriesPoint]) -> Vec<[f64; 2]> {
    series.iter().map(|p| [date_x(p.date), p.value]).collect()
}

fn time_chart(
    ui: &mut Ui,
    id: &str,
    title: &str,
    y_label: &str,
    lines: &[(&str, &Vec<SeriesPoint>, Color32)],
) {
    ui.strong(title);
    Plot::new(id)
        .height(CHART_HEIGHT)
        .legend(Legend::default())
        .x_axis_label("Data")
        .y_axis_label(y_label)
        .x_axis_formatter(|mark, _range| format_date_x(mark.value))
        .label_formatter(|name, value| {
            let date = format_date_x(value.x);
            if name.is_empty() {
                format!("{date}\n{:.2}", value.y)
            } else {
                format!("{name}\n{date}\n{:.2}", value.y)
            }
        })
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(false)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for (name, series, color) in lines {
                plot_ui.line(
                    Line::new(points(series))
                        .name(name)
                        .color(*color)
                        .width(2.0),
                );
            }
        });
}

// ---------------------------------------------------------------------------
// Share (pie) chart
// ---------------------------------------------------------------------------

/// Outline of a pie slice centred on the origin with unit radius.
fn slice_points(start: f64, sweep: f64) -> Vec<[f64; 2]> {
    let steps = ((sweep / TAU) * 120.0).ceil().max(2.0) as usize;
    std::iter::once([0.0, 0.0])
        .chain((0..=steps).map(|i| {
            let a = start + sweep * i as f64 / steps as f64;
            [a.cos(), a.sin()]
        }))
        .collect()
}

/// Only positive totals get a slice; an all-zero selection draws nothing.
fn share_chart(ui: &mut Ui, shares: &[IndexShare]) {
    ui.strong("Participação Total - Variação Mensal dos Índices Selecionados");

    let total: f64 = shares.iter().map(|s| s.total.max(0.0)).sum();

    Plot::new("index_share")
        .height(CHART_HEIGHT)
        .legend(Legend::default())
        .data_aspect(1.0)
        .show_axes(false)
        .show_grid(false)
        .allow_boxed_zoom(false)
        .allow_drag(false)
        .allow_scroll(false)
        .allow_zoom(false)
        .show(ui, |plot_ui| {
            if total <= 0.0 {
                return;
            }
            let mut start = 0.0_f64;
            for share in shares.iter().filter(|s| s.total > 0.0) {
                let fraction = share.total / total;
                let sweep = fraction * TAU;
                plot_ui.polygon(
                    Polygon::new(slice_points(start, sweep))
                        .name(share.label)
                        .fill_color(index_color(share.index))
                        .stroke(Stroke::new(1.0, Color32::WHITE)),
                );

                let mid = start + sweep / 2.0;
                plot_ui.text(Text::new(
                    PlotPoint::new(0.6 * mid.cos(), 0.6 * mid.sin()),
                    RichText::new(format!("{}\n{:.1}%", share.label, fraction * 100.0))
                        .color(Color32::WHITE)
                        .strong(),
                ));
                start += sweep;
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_axis_round_trips_to_month() {
        let d = NaiveDate::from_ymd_opt(2022, 7, 1).unwrap();
        assert_eq!(format_date_x(date_x(d)), "2022-07");
        assert_eq!(format_date_x(date_x(d) + 0.3), "2022-07");
    }

    #[test]
    fn slice_starts_at_centre_and_stays_on_unit_circle() {
        let pts = slice_points(0.0, TAU / 4.0);
        assert_eq!(pts[0], [0.0, 0.0]);
        for p in &pts[1..] {
            assert!(((p[0] * p[0] + p[1] * p[1]).sqrt() - 1.0).abs() < 1e-9);
        }
        let last = pts.last().unwrap();
        assert!(last[0].abs() < 1e-9 && (last[1] - 1.0).abs() < 1e-9);
    }
}
