use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use crate::data::model::IndexKind;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Fixed colours for the share chart
// ---------------------------------------------------------------------------

/// Each index keeps its colour whatever else is selected.
pub fn index_color(index: IndexKind) -> Color32 {
    match index {
        IndexKind::Ipca => Color32::from_rgb(0xE7, 0x4C, 0x3C),
        IndexKind::Inpc => Color32::from_rgb(0xF1, 0xC4, 0x0F),
        IndexKind::Ipca15 => Color32::from_rgb(0x5D, 0xAD, 0xE2),
    }
}
