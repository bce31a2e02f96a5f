use std::collections::{HashMap, HashSet};

use eframe::egui;
use tokio::sync::mpsc;
use tracing::warn;

use crate::config::SpeedConfig;
use crate::input::{EdgeSource, PadButton, PadEdge};
use crate::link::UpstreamEvent;

const PAD_ACTIVE: egui::Color32 = egui::Color32::from_rgb(86, 120, 205);
const PAD_BUTTON_SIZE: f32 = 44.0;

/// Transport buttons; at most one command per frame.
pub fn draw_transport(ui: &mut egui::Ui) -> Option<UpstreamEvent> {
    let mut command = None;

    if ui.button("Reset").clicked() {
        command = Some(UpstreamEvent::Reset);
    }
    if ui.button("Step").clicked() {
        command = Some(UpstreamEvent::Step);
    }
    if ui.button("Stop").clicked() {
        command = Some(UpstreamEvent::Stop);
    }
    if ui.button("Continue").clicked() {
        command = Some(UpstreamEvent::Continue);
    }
    if ui.button("Generate").clicked() {
        command = Some(UpstreamEvent::Generate);
    }

    command
}

/// Slider, direct entry and increment buttons for the clock speed.
///
/// Every path clamps into the configured bounds before the value is
/// reported; returns the clamped speed when anything changed it.
pub fn draw_speed_control(
    ui: &mut egui::Ui,
    speed: &mut u32,
    bounds: &SpeedConfig,
) -> Option<u32> {
    let mut changed = false;

    if ui.button("−").clicked() {
        *speed = bounds.clamp(i64::from(*speed) - 1);
        changed = true;
    }
    changed |= ui
        .add(egui::Slider::new(speed, bounds.min..=bounds.max))
        .changed();
    if ui.button("+").clicked() {
        *speed = bounds.clamp(i64::from(*speed) + 1);
        changed = true;
    }
    changed |= ui
        .add(egui::DragValue::new(speed).range(bounds.min..=bounds.max))
        .changed();
    ui.label("ticks/s");

    if changed {
        *speed = bounds.clamp(i64::from(*speed));
        Some(*speed)
    } else {
        None
    }
}

/// Per-widget bookkeeping for the on-screen pad.
///
/// `pointer_held` remembers which source pressed a button so its release
/// edge reports the same source; `keys_down` mirrors the keyboard state for
/// pressed styling only. The authoritative pad state lives in the
/// aggregator.
#[derive(Default)]
pub struct PadUiState {
    pointer_held: HashMap<PadButton, EdgeSource>,
    pub keys_down: HashSet<PadButton>,
}

impl PadUiState {
    fn visual_pressed(&self, button: PadButton) -> bool {
        self.pointer_held.contains_key(&button) || self.keys_down.contains(&button)
    }
}

/// The on-screen controller pad: d-pad left, face buttons right.
pub fn draw_pad(ui: &mut egui::Ui, state: &mut PadUiState, edge_sender: &mpsc::Sender<PadEdge>) {
    ui.horizontal(|ui| {
        egui::Grid::new("dpad_grid").show(ui, |ui| {
            ui.label("");
            pad_button(ui, state, edge_sender, PadButton::Up, "▲");
            ui.label("");
            ui.end_row();

            pad_button(ui, state, edge_sender, PadButton::Left, "◀");
            pad_button(ui, state, edge_sender, PadButton::Down, "▼");
            pad_button(ui, state, edge_sender, PadButton::Right, "▶");
            ui.end_row();
        });

        ui.add_space(32.0);

        ui.vertical(|ui| {
            ui.horizontal(|ui| {
                pad_button(ui, state, edge_sender, PadButton::Select, "SELECT");
                pad_button(ui, state, edge_sender, PadButton::Start, "START");
            });
            ui.horizontal(|ui| {
                pad_button(ui, state, edge_sender, PadButton::Y, "Y");
                pad_button(ui, state, edge_sender, PadButton::X, "X");
            });
        });
    });
}

fn pad_button(
    ui: &mut egui::Ui,
    state: &mut PadUiState,
    edge_sender: &mpsc::Sender<PadEdge>,
    button: PadButton,
    label: &str,
) {
    let fill = if state.visual_pressed(button) {
        PAD_ACTIVE
    } else {
        ui.visuals().widgets.inactive.weak_bg_fill
    };
    let response = ui.add(
        egui::Button::new(label)
            .fill(fill)
            .min_size(egui::vec2(PAD_BUTTON_SIZE, PAD_BUTTON_SIZE)),
    );

    let down_now = response.is_pointer_button_down_on();
    let was_down = state.pointer_held.contains_key(&button);

    if down_now && !was_down {
        let source = if ui.input(|i| i.any_touches()) {
            EdgeSource::Touch
        } else {
            EdgeSource::Pointer
        };
        state.pointer_held.insert(button, source);
        send_edge(edge_sender, source, button, true);
    } else if !down_now && was_down {
        // Covers release and pointer-leave alike.
        let source = state
            .pointer_held
            .remove(&button)
            .unwrap_or(EdgeSource::Pointer);
        send_edge(edge_sender, source, button, false);
    }
}

fn send_edge(
    edge_sender: &mpsc::Sender<PadEdge>,
    source: EdgeSource,
    button: PadButton,
    pressed: bool,
) {
    let edge = PadEdge {
        source,
        button,
        pressed,
    };
    if let Err(e) = edge_sender.try_send(edge) {
        warn!("Failed to queue pad edge: {}", e);
    }
}

/// Program source editor; returns true when the save button was clicked.
pub fn draw_program_editor(ui: &mut egui::Ui, text: &mut String) -> bool {
    ui.heading("Editor");
    egui::ScrollArea::vertical()
        .id_salt("program_editor")
        .max_height(ui.available_height() - 32.0)
        .auto_shrink([false, false])
        .show(ui, |ui| {
            ui.add(
                egui::TextEdit::multiline(text)
                    .code_editor()
                    .desired_width(f32::INFINITY)
                    .desired_rows(12),
            );
        });

    ui.button("Save to simulator").clicked()
}
