use eframe::egui;

use crate::snapshot::SCREEN_SIZE;

const LAMP_SIZE: f32 = 12.0;
const LAMP_GAP: f32 = 1.0;

const LAMP_ON: egui::Color32 = egui::Color32::from_rgb(255, 176, 66);
const LAMP_OFF: egui::Color32 = egui::Color32::from_rgb(38, 30, 22);

/// The simulator's lamp screen as a grid of filled cells.
///
/// The frame is trusted only loosely: rows and cells beyond the expected
/// grid are ignored, short rows leave their tail dark.
pub fn draw_screen(ui: &mut egui::Ui, screen: &[Vec<u8>]) {
    let side = SCREEN_SIZE as f32 * (LAMP_SIZE + LAMP_GAP);
    let (response, painter) =
        ui.allocate_painter(egui::vec2(side, side), egui::Sense::hover());
    let origin = response.rect.min;

    painter.rect_filled(response.rect, egui::CornerRadius::ZERO, egui::Color32::BLACK);

    for (row_idx, row) in screen.iter().take(SCREEN_SIZE).enumerate() {
        for (col_idx, cell) in row.iter().take(SCREEN_SIZE).enumerate() {
            let corner = origin
                + egui::vec2(
                    col_idx as f32 * (LAMP_SIZE + LAMP_GAP),
                    row_idx as f32 * (LAMP_SIZE + LAMP_GAP),
                );
            let rect = egui::Rect::from_min_size(corner, egui::vec2(LAMP_SIZE, LAMP_SIZE));
            let color = if *cell != 0 { LAMP_ON } else { LAMP_OFF };
            painter.rect_filled(rect, egui::CornerRadius::ZERO, color);
        }
    }
}
