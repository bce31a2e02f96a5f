use gilrs::{Button, Event, EventType, Gamepad, GamepadId, Gilrs};
use statum::{machine, state};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::input::{EdgeSource, PadButton, PadEdge};

// Gamepad errors
#[derive(Debug, thiserror::Error)]
pub enum GamepadError {
    #[error("Failed to initialize gamepad backend: {0}")]
    InitializationError(String),

    #[error("Failed to send edge: {0}")]
    EdgeSendError(String),
}

// Define collector states using statum's state macro
#[state]
#[derive(Debug, Clone)]
pub enum GamepadState {
    Initializing,
    Collecting,
}

#[machine]
pub struct GamepadCollector<S: GamepadState> {
    // Gilrs context
    gilrs: Gilrs,

    // Active gamepad
    active_gamepad: Option<GamepadId>,

    // Channel for sending edges to the aggregator
    edge_sender: mpsc::Sender<PadEdge>,

    // Cooperative stop signal
    shutdown: CancellationToken,
}

// Implementation for Initializing state
impl GamepadCollector<Initializing> {
    pub fn create(
        edge_sender: mpsc::Sender<PadEdge>,
        shutdown: CancellationToken,
    ) -> Result<Self, GamepadError> {
        info!("Initializing gilrs gamepad interface");
        let gilrs = match Gilrs::new() {
            Ok(g) => g,
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(GamepadError::InitializationError(e.to_string()));
            }
        };

        Ok(Self::new(gilrs, None, edge_sender, shutdown))
    }

    // Pick a gamepad and transition to Collecting state
    pub fn initialize(mut self) -> Result<GamepadCollector<Collecting>, GamepadError> {
        let gamepads: Vec<(GamepadId, Gamepad<'_>)> = self.gilrs.gamepads().collect();

        if gamepads.is_empty() {
            warn!("No gamepad connected, pad input limited to keyboard and pointer");
        } else {
            info!("Found {} gamepad(s):", gamepads.len());
            for (idx, (id, gamepad)) in gamepads.iter().enumerate() {
                info!("  [{}] ID: {}, Name: {}", idx, id, gamepad.name());
            }
            let (id, gamepad) = &gamepads[0];
            self.active_gamepad = Some(*id);
            info!("Selected gamepad: {} ({})", gamepad.name(), id);
        }

        info!("Gamepad collector initialized, transitioning to Collecting state");
        Ok(self.transition())
    }
}

// Implementation for Collecting state
impl GamepadCollector<Collecting> {
    // Drain one gilrs event and forward it as a pad edge if it maps
    pub fn collect_next_event(&mut self) -> Result<(), GamepadError> {
        if let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            if let Some(active_id) = self.active_gamepad {
                if id != active_id {
                    debug!("Skipping event from non-active gamepad: {:?}", id);
                    return Ok(());
                }
            }

            if let Some(edge) = convert_gilrs_event(event) {
                debug!("Gamepad edge: {:?}", edge);
                match self.edge_sender.try_send(edge) {
                    Ok(_) => {}
                    Err(e) => {
                        error!("Failed to send edge to aggregator: {}", e);
                        return Err(GamepadError::EdgeSendError(e.to_string()));
                    }
                }
            }
        }

        Ok(())
    }

    // Run the collector until shutdown
    pub fn run_collection_loop(&mut self) -> Result<(), GamepadError> {
        info!("Starting gamepad collection loop");

        loop {
            if self.shutdown.is_cancelled() {
                info!("Gamepad collector shutting down");
                return Ok(());
            }

            if let Err(e) = self.collect_next_event() {
                error!("Error collecting gamepad event: {}", e);
                // Continue despite errors to maintain the loop
            }

            // Small sleep to prevent 100% CPU usage
            std::thread::sleep(std::time::Duration::from_micros(500));
        }
    }
}

fn convert_gilrs_event(event: EventType) -> Option<PadEdge> {
    match event {
        EventType::ButtonPressed(button, _) => map_button(button).map(|b| PadEdge {
            source: EdgeSource::Gamepad,
            button: b,
            pressed: true,
        }),
        EventType::ButtonReleased(button, _) => map_button(button).map(|b| PadEdge {
            source: EdgeSource::Gamepad,
            button: b,
            pressed: false,
        }),
        EventType::ButtonRepeated(button, _) => {
            debug!("Button repeat ignored: {:?}", button);
            None
        }
        EventType::Connected => {
            info!("Gamepad connected event detected");
            None
        }
        EventType::Disconnected => {
            warn!("Gamepad disconnected event detected");
            None
        }
        _ => None,
    }
}

// Map gilrs buttons onto the simulator's pad layout
fn map_button(button: Button) -> Option<PadButton> {
    match button {
        Button::DPadUp => Some(PadButton::Up),
        Button::DPadDown => Some(PadButton::Down),
        Button::DPadLeft => Some(PadButton::Left),
        Button::DPadRight => Some(PadButton::Right),
        Button::Start => Some(PadButton::Start),
        Button::Select => Some(PadButton::Select),
        Button::North => Some(PadButton::X),
        Button::West => Some(PadButton::Y),
        _ => None,
    }
}

/// Handle for the gamepad collection task.
pub struct GamepadHandle {}

impl GamepadHandle {
    // Create a new collector and spawn it as a tokio task
    pub fn spawn(
        edge_sender: mpsc::Sender<PadEdge>,
        shutdown: CancellationToken,
    ) -> Result<Self, GamepadError> {
        info!("Spawning gamepad collector");

        let collector = GamepadCollector::create(edge_sender, shutdown)?;

        let task_handle = tokio::spawn(async move {
            match collector.initialize() {
                Ok(mut collecting_state) => {
                    if let Err(e) = collecting_state.run_collection_loop() {
                        error!("Gamepad collector terminated with error: {}", e);
                    }
                }
                Err(e) => {
                    error!("Failed to initialize gamepad collector: {}", e);
                }
            }
        });

        debug!("Tokio task spawned with handle: {:?}", task_handle);
        Ok(Self {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn face_buttons_map_to_pad_layout() {
        assert_eq!(map_button(Button::DPadUp), Some(PadButton::Up));
        assert_eq!(map_button(Button::DPadDown), Some(PadButton::Down));
        assert_eq!(map_button(Button::North), Some(PadButton::X));
        assert_eq!(map_button(Button::West), Some(PadButton::Y));
        assert_eq!(map_button(Button::Start), Some(PadButton::Start));
        assert_eq!(map_button(Button::Mode), None);
        assert_eq!(map_button(Button::LeftTrigger), None);
    }
}
