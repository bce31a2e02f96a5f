use std::collections::BTreeMap;

use eframe::egui;

use crate::snapshot::SimSnapshot;

/// All machine state sections for the left panel.
///
/// Sections only paint what the frame actually carries: an empty map draws
/// an empty grid rather than invented defaults.
pub fn draw_state_panels(ui: &mut egui::Ui, frame: &SimSnapshot) {
    egui::CollapsingHeader::new("Registers")
        .default_open(true)
        .show(ui, |ui| {
            value_grid(ui, "registers_grid", &frame.registers, 4);
        });

    egui::CollapsingHeader::new("Ports")
        .default_open(false)
        .show(ui, |ui| {
            egui::CollapsingHeader::new("Read Ports")
                .default_open(true)
                .show(ui, |ui| {
                    value_grid(ui, "ps_grid", &frame.ps, 4);
                });
            egui::CollapsingHeader::new("Write Ports")
                .default_open(true)
                .show(ui, |ui| {
                    value_grid(ui, "pd_grid", &frame.pd, 4);
                });
        });

    egui::CollapsingHeader::new("Data Memory")
        .default_open(false)
        .show(ui, |ui| {
            value_grid(ui, "data_memory_grid", &frame.data_memory, 4);
        });

    egui::CollapsingHeader::new("Call Stack")
        .default_open(false)
        .show(ui, |ui| {
            value_grid(ui, "call_stack_grid", &frame.call_stack, 4);
        });

    egui::CollapsingHeader::new("ALU Flags")
        .default_open(true)
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                for (flag, set) in &frame.alu_flags {
                    let color = if *set {
                        egui::Color32::LIGHT_GREEN
                    } else {
                        egui::Color32::DARK_GRAY
                    };
                    ui.colored_label(color, flag);
                }
            });
        });

    egui::CollapsingHeader::new("Displays")
        .default_open(true)
        .show(ui, |ui| {
            egui::Grid::new("displays_grid").num_columns(2).show(ui, |ui| {
                ui.label("Letters");
                ui.monospace(&frame.letters);
                ui.end_row();

                ui.label("Number");
                ui.monospace(&frame.number);
                ui.end_row();

                ui.label("Big Number");
                ui.monospace(&frame.big_number);
                ui.end_row();
            });
        });
}

// Name/value pairs in a striped grid, `columns` pairs per row
fn value_grid(ui: &mut egui::Ui, id: &str, values: &BTreeMap<String, String>, columns: usize) {
    egui::Grid::new(id)
        .num_columns(columns * 2)
        .striped(true)
        .show(ui, |ui| {
            for (idx, (name, value)) in values.iter().enumerate() {
                ui.monospace(name);
                ui.monospace(value);
                if (idx + 1) % columns == 0 {
                    ui.end_row();
                }
            }
        });
}
