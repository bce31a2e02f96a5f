//! # Panel User Interface Module
//!
//! The operator-facing surface of simpanel: one egui window showing the
//! complete machine state of the remote simulator, its lamp screen and source
//! listing, plus the transport, speed and controller inputs that drive it.
//!
//! ## Architectural Role
//!
//! The UI is deliberately the dumb end of the pipeline. It never talks to the
//! broker and never paces itself against the snapshot stream:
//!
//! - Frames arrive on an mpsc channel already rate-bounded by the scheduler;
//!   whatever is newest when a repaint happens is what gets painted.
//! - Input leaves as bare press/release edges (keyboard and pointer) on the
//!   shared edge channel; the aggregator owns the actual pad state.
//! - Transport commands, speed changes and program uploads go straight onto
//!   the upstream channel.
//!
//! Because of this the UI holds almost no authoritative state: the current
//! frame, the pending status notice, and small per-widget bookkeeping
//! (editor text, which on-screen pad buttons the pointer is holding).
//!
//! ## Layout
//!
//! Three-panel layout in the house style: a transport strip on top, machine
//! state on the left, source listing and editor on the right, the lamp
//! screen and pad in the center, and a status bar at the bottom.

pub mod code_view;
pub mod controls;
pub mod panels;
pub mod screen;

use std::time::Duration;

use eframe::egui;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::{RenderConfig, SpeedConfig};
use crate::input::{PadButton, PadEdge};
use crate::link::{ConnectionState, LinkNotice, UpstreamEvent};
use crate::snapshot::SimSnapshot;

use self::code_view::CodeViewState;
use self::controls::PadUiState;

/// One transient status line with its display deadline.
struct StatusNotice {
    text: String,
    shown_at: chrono::DateTime<chrono::Local>,
    ttl_ms: i64,
}

pub struct SimPanelUI {
    /// Paced frames from the scheduler
    frame_receiver: mpsc::Receiver<SimSnapshot>,

    /// Out-of-band notices from the link
    notice_receiver: mpsc::Receiver<LinkNotice>,

    /// Edge channel shared with the gamepad collector
    edge_sender: mpsc::Sender<PadEdge>,

    /// Direct line to the simulator for commands and speed
    upstream_sender: mpsc::Sender<UpstreamEvent>,

    speed_config: SpeedConfig,

    /// Latest delivered frame; repainted every update
    frame: SimSnapshot,

    speed: u32,
    status: Option<StatusNotice>,
    connection: ConnectionState,
    code_view: CodeViewState,
    pad_ui: PadUiState,
    editor_text: String,
}

impl SimPanelUI {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        frame_receiver: mpsc::Receiver<SimSnapshot>,
        notice_receiver: mpsc::Receiver<LinkNotice>,
        edge_sender: mpsc::Sender<PadEdge>,
        upstream_sender: mpsc::Sender<UpstreamEvent>,
        render_config: RenderConfig,
        speed_config: SpeedConfig,
    ) -> Self {
        cc.egui_ctx.set_theme(egui::Theme::Dark);

        let speed = speed_config.initial;
        SimPanelUI {
            frame_receiver,
            notice_receiver,
            edge_sender,
            upstream_sender,
            speed_config,
            frame: SimSnapshot::default(),
            speed,
            status: None,
            connection: ConnectionState::default(),
            code_view: CodeViewState::new(render_config.auto_scroll),
            pad_ui: PadUiState::default(),
            editor_text: String::new(),
        }
    }

    fn drain_channels(&mut self) {
        while let Ok(frame) = self.frame_receiver.try_recv() {
            self.frame = frame;
        }

        while let Ok(notice) = self.notice_receiver.try_recv() {
            match notice {
                LinkNotice::Error(message) => self.show_status(message, 5000),
                LinkNotice::Generated => {
                    self.show_status("Generate finished successfully!".to_string(), 750)
                }
                LinkNotice::Connection(state) => {
                    debug!("Link connection state: {:?}", state);
                    self.connection = state;
                }
            }
        }

        // Notices clear themselves after their display time.
        if let Some(notice) = &self.status {
            let shown_for = (chrono::Local::now() - notice.shown_at).num_milliseconds();
            if shown_for > notice.ttl_ms {
                self.status = None;
            }
        }
    }

    fn show_status(&mut self, text: String, ttl_ms: i64) {
        self.status = Some(StatusNotice {
            text,
            shown_at: chrono::Local::now(),
            ttl_ms,
        });
    }

    fn send_upstream(&self, event: UpstreamEvent) {
        if let Err(e) = self.upstream_sender.try_send(event) {
            warn!("Failed to queue upstream event: {}", e);
        }
    }

    fn send_key_edge(&mut self, button: PadButton, pressed: bool) {
        if pressed {
            self.pad_ui.keys_down.insert(button);
        } else {
            self.pad_ui.keys_down.remove(&button);
        }

        let edge = PadEdge {
            source: crate::input::EdgeSource::Keyboard,
            button,
            pressed,
        };
        if let Err(e) = self.edge_sender.try_send(edge) {
            warn!("Failed to queue key edge: {}", e);
        }
    }

    /// Keyboard shortcuts: wasd drives the pad, the rest are transport
    /// commands. Suppressed entirely while a text widget has focus, and key
    /// auto-repeat is never an edge.
    fn handle_keyboard(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }

        let events = ctx.input(|i| i.events.clone());
        for event in events {
            if let egui::Event::Key {
                key,
                pressed,
                repeat,
                ..
            } = event
            {
                if repeat {
                    continue;
                }
                match key {
                    egui::Key::W => self.send_key_edge(PadButton::Up, pressed),
                    egui::Key::A => self.send_key_edge(PadButton::Left, pressed),
                    egui::Key::S => self.send_key_edge(PadButton::Down, pressed),
                    egui::Key::D => self.send_key_edge(PadButton::Right, pressed),
                    egui::Key::R if pressed => self.send_upstream(UpstreamEvent::Reset),
                    egui::Key::T if pressed => self.send_upstream(UpstreamEvent::Step),
                    egui::Key::C if pressed => self.send_upstream(UpstreamEvent::Continue),
                    egui::Key::G if pressed => self.send_upstream(UpstreamEvent::Generate),
                    egui::Key::Space if pressed => self.send_upstream(UpstreamEvent::Stop),
                    _ => {}
                }
            }
        }
    }

    fn connection_label(&self) -> (&'static str, egui::Color32) {
        match self.connection {
            ConnectionState::Disconnected => ("offline", egui::Color32::GRAY),
            ConnectionState::Connecting => ("connecting", egui::Color32::YELLOW),
            ConnectionState::Connected => ("connected", egui::Color32::LIGHT_GREEN),
            ConnectionState::Reconnecting => ("reconnecting", egui::Color32::ORANGE),
        }
    }
}

impl eframe::App for SimPanelUI {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.request_repaint_after(Duration::from_millis(33));

        self.drain_channels();
        self.handle_keyboard(ctx);

        egui::TopBottomPanel::top("transport_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if let Some(command) = controls::draw_transport(ui) {
                    self.send_upstream(command);
                }
                ui.separator();
                if let Some(speed) =
                    controls::draw_speed_control(ui, &mut self.speed, &self.speed_config)
                {
                    self.send_upstream(UpstreamEvent::Speed(speed));
                }
            });
        });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let (label, color) = self.connection_label();
                ui.colored_label(color, label);
                ui.separator();
                ui.monospace(format!("PC {}", self.frame.pc));
                ui.separator();
                ui.label(if self.frame.running { "running" } else { "halted" });
                if let Some(notice) = &self.status {
                    ui.separator();
                    ui.colored_label(egui::Color32::LIGHT_RED, &notice.text);
                }
            });
        });

        egui::SidePanel::left("machine_state")
            .default_width(340.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        panels::draw_state_panels(ui, &self.frame);
                    });
            });

        egui::SidePanel::right("program_panel")
            .default_width(320.0)
            .show(ctx, |ui| {
                code_view::draw_code_view(ui, &self.frame, &mut self.code_view);
                ui.separator();
                if controls::draw_program_editor(ui, &mut self.editor_text) {
                    self.send_upstream(UpstreamEvent::Program(self.editor_text.clone()));
                    self.show_status("Program sent upstream".to_string(), 750);
                }
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                screen::draw_screen(ui, &self.frame.screen);
                ui.add_space(12.0);
                controls::draw_pad(ui, &mut self.pad_ui, &self.edge_sender);
            });
        });
    }
}
