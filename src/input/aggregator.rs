use std::collections::{HashMap, HashSet};

use tokio::sync::mpsc;
use tracing::{debug, error, info, trace};

use crate::input::{EdgeSource, InputError, PadButton, PadEdge, PadSnapshot};
use crate::link::UpstreamEvent;

/// Merges per-source press/release edges into one canonical pad state.
///
/// Each button tracks the set of sources currently holding it, so a button
/// pressed by both the keyboard and the pointer stays pressed until both
/// released it. Keyboard auto-repeat is filtered through a held-key set
/// before a down edge counts as genuine.
#[derive(Debug, Default)]
pub struct PadAggregator {
    // Per button: the sources currently holding it down
    held: HashMap<PadButton, HashSet<EdgeSource>>,

    // Keyboard keys currently down, to drop repeat edges
    keys_down: HashSet<PadButton>,
}

impl PadAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one edge and recompute the full pad state.
    ///
    /// Returns `None` only when the edge is not genuine (a keyboard repeat
    /// for an already-held key, or a keyboard release for a key that was
    /// never tracked). Every genuine edge yields exactly one snapshot, even
    /// when the visible state did not change; the upstream side relies on
    /// latest-state-wins semantics, not on diffs.
    pub fn apply_edge(&mut self, edge: PadEdge) -> Option<PadSnapshot> {
        if edge.source == EdgeSource::Keyboard {
            if edge.pressed {
                if !self.keys_down.insert(edge.button) {
                    trace!("Ignoring key repeat for {:?}", edge.button);
                    return None;
                }
            } else if !self.keys_down.remove(&edge.button) {
                trace!("Ignoring release for untracked key {:?}", edge.button);
                return None;
            }
        }

        let holders = self.held.entry(edge.button).or_default();
        if edge.pressed {
            holders.insert(edge.source);
        } else {
            // Release without a matching press falls through harmlessly.
            holders.remove(&edge.source);
        }

        debug!(
            "Edge {:?} {:?} pressed={} -> {} holder(s)",
            edge.source,
            edge.button,
            edge.pressed,
            self.held.get(&edge.button).map_or(0, HashSet::len)
        );

        Some(self.snapshot())
    }

    /// Whether a button currently reads pressed from any source.
    pub fn is_pressed(&self, button: PadButton) -> bool {
        self.held.get(&button).is_some_and(|s| !s.is_empty())
    }

    /// Recompute the full pad state from scratch.
    pub fn snapshot(&self) -> PadSnapshot {
        let bit = |button| u8::from(self.is_pressed(button));
        PadSnapshot {
            up: bit(PadButton::Up),
            right: bit(PadButton::Right),
            down: bit(PadButton::Down),
            left: bit(PadButton::Left),
            start: bit(PadButton::Start),
            select: bit(PadButton::Select),
            y: bit(PadButton::Y),
            x: bit(PadButton::X),
        }
    }
}

/// Handle for the aggregation task.
///
/// Edges from all sources funnel into one mpsc channel; the task owns the
/// `PadAggregator` and forwards one controller update per genuine edge, in
/// edge order.
pub struct AggregatorHandle {
    edge_sender: mpsc::Sender<PadEdge>,
}

impl AggregatorHandle {
    pub fn spawn(
        edge_receiver: mpsc::Receiver<PadEdge>,
        edge_sender: mpsc::Sender<PadEdge>,
        upstream_sender: mpsc::Sender<UpstreamEvent>,
    ) -> Result<Self, InputError> {
        info!("Spawning pad aggregator");

        let aggregator = PadAggregator::new();
        let task_handle = tokio::spawn(async move {
            if let Err(e) = run_aggregator_loop(aggregator, edge_receiver, upstream_sender).await {
                error!("Aggregator task terminated with error: {}", e);
            } else {
                info!("Aggregator task finished");
            }
        });
        debug!("Tokio task spawned with handle: {:?}", task_handle);

        Ok(Self { edge_sender })
    }

    /// Sender for feeding edges from additional sources.
    pub fn edge_sender(&self) -> mpsc::Sender<PadEdge> {
        self.edge_sender.clone()
    }
}

async fn run_aggregator_loop(
    mut aggregator: PadAggregator,
    mut edge_receiver: mpsc::Receiver<PadEdge>,
    upstream_sender: mpsc::Sender<UpstreamEvent>,
) -> Result<(), InputError> {
    info!("Entering aggregator loop");

    while let Some(edge) = edge_receiver.recv().await {
        if let Some(snapshot) = aggregator.apply_edge(edge) {
            upstream_sender
                .send(UpstreamEvent::Controller(snapshot))
                .await
                .map_err(|e| InputError::ForwardError(e.to_string()))?;
        }
    }

    info!("Edge channel closed, aggregator stopping");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(source: EdgeSource, button: PadButton, pressed: bool) -> PadEdge {
        PadEdge {
            source,
            button,
            pressed,
        }
    }

    #[test]
    fn every_genuine_edge_emits_a_snapshot() {
        let mut aggregator = PadAggregator::new();

        let first = aggregator.apply_edge(edge(EdgeSource::Pointer, PadButton::Start, true));
        assert_eq!(first.unwrap().start, 1);

        let second = aggregator.apply_edge(edge(EdgeSource::Pointer, PadButton::Start, false));
        assert_eq!(second.unwrap().start, 0);
    }

    #[test]
    fn key_repeat_is_not_an_edge() {
        let mut aggregator = PadAggregator::new();

        assert!(aggregator
            .apply_edge(edge(EdgeSource::Keyboard, PadButton::Up, true))
            .is_some());
        // OS auto-repeat delivers the same down edge again and again.
        assert!(aggregator
            .apply_edge(edge(EdgeSource::Keyboard, PadButton::Up, true))
            .is_none());
        assert!(aggregator
            .apply_edge(edge(EdgeSource::Keyboard, PadButton::Up, true))
            .is_none());

        let released = aggregator.apply_edge(edge(EdgeSource::Keyboard, PadButton::Up, false));
        assert_eq!(released.unwrap().up, 0);
    }

    #[test]
    fn button_stays_pressed_until_every_source_releases() {
        let mut aggregator = PadAggregator::new();

        aggregator.apply_edge(edge(EdgeSource::Keyboard, PadButton::Left, true));
        aggregator.apply_edge(edge(EdgeSource::Pointer, PadButton::Left, true));

        // The pointer lets go first; the key still holds the button.
        let after_pointer =
            aggregator.apply_edge(edge(EdgeSource::Pointer, PadButton::Left, false));
        assert_eq!(after_pointer.unwrap().left, 1);

        let after_key = aggregator.apply_edge(edge(EdgeSource::Keyboard, PadButton::Left, false));
        assert_eq!(after_key.unwrap().left, 0);
    }

    #[test]
    fn release_without_press_is_tolerated() {
        let mut aggregator = PadAggregator::new();

        // Pointer-leave fires on a button that was never pressed.
        let snapshot = aggregator.apply_edge(edge(EdgeSource::Pointer, PadButton::X, false));
        assert_eq!(snapshot.unwrap(), PadSnapshot::default());
    }

    #[test]
    fn snapshot_reflects_union_across_buttons() {
        let mut aggregator = PadAggregator::new();

        aggregator.apply_edge(edge(EdgeSource::Keyboard, PadButton::Up, true));
        aggregator.apply_edge(edge(EdgeSource::Gamepad, PadButton::Select, true));
        let snapshot = aggregator.snapshot();

        assert_eq!(snapshot.up, 1);
        assert_eq!(snapshot.select, 1);
        assert_eq!(snapshot.down, 0);
        assert!(aggregator.is_pressed(PadButton::Up));
        assert!(!aggregator.is_pressed(PadButton::Y));
    }
}
