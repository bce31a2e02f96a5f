use eframe::egui;

use crate::snapshot::SimSnapshot;

const HIGHLIGHT: egui::Color32 = egui::Color32::from_rgb(70, 70, 30);

/// Scroll bookkeeping for the source listing.
pub struct CodeViewState {
    pub auto_scroll: bool,

    // Last line we scrolled to; scrolling repeats only when it moves,
    // so the user can still scroll around between steps
    last_scrolled_line: Option<usize>,
}

impl CodeViewState {
    pub fn new(auto_scroll: bool) -> Self {
        Self {
            auto_scroll,
            last_scrolled_line: None,
        }
    }
}

/// The preprocessed source listing with the current line highlighted.
pub fn draw_code_view(ui: &mut egui::Ui, frame: &SimSnapshot, state: &mut CodeViewState) {
    ui.horizontal(|ui| {
        ui.heading("Program");
        ui.checkbox(&mut state.auto_scroll, "Auto-scroll");
    });

    let scroll_wanted = state.auto_scroll && state.last_scrolled_line != Some(frame.current_line);

    egui::ScrollArea::vertical()
        .id_salt("source_listing")
        .max_height(ui.available_height() * 0.55)
        .auto_shrink([false, false])
        .show(ui, |ui| {
            for (idx, line) in frame.listing.iter().enumerate() {
                let is_current = idx == frame.current_line;
                let text = egui::RichText::new(format!("{:>4}  {}", idx, line)).monospace();
                let text = if is_current {
                    text.background_color(HIGHLIGHT)
                } else {
                    text
                };
                let response = ui.label(text);

                if is_current && scroll_wanted {
                    response.scroll_to_me(Some(egui::Align::Center));
                    state.last_scrolled_line = Some(idx);
                }
            }
        });
}
