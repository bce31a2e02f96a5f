use std::time::{Duration, Instant};

use crate::snapshot::SimSnapshot;

/// Outcome of feeding one snapshot into the pacer.
#[derive(Debug, Clone, PartialEq)]
pub enum PaceDecision {
    /// The interval has already elapsed: paint this frame right now.
    RenderNow(SimSnapshot),

    /// First arrival inside a closed window: a trailing flush was armed
    /// for the returned deadline.
    FlushArmed(Instant),

    /// A flush is already armed; the snapshot merely replaced the
    /// value it will deliver.
    Coalesced,
}

/// Rate-bounding state for snapshot delivery.
///
/// Invariants:
/// - at most one flush deadline is armed at any instant
/// - an armed deadline always belongs to the newest unrendered snapshot
/// - a snapshot handed out once is never handed out again (`latest` is
///   taken, not copied, on both render paths)
///
/// State is mutated before any value is handed back to the caller, so a
/// faulting sink cannot leave the pacer inconsistent.
#[derive(Debug)]
pub struct FramePacer {
    min_interval: Duration,
    last_render: Option<Instant>,
    latest: Option<SimSnapshot>,
    pending_flush: Option<Instant>,
}

impl FramePacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_render: None,
            latest: None,
            pending_flush: None,
        }
    }

    /// Feed one snapshot, stamped with its arrival time.
    ///
    /// `last_render = None` means "never rendered" and always opens the
    /// window. An armed flush is disarmed by an immediate render; the timer
    /// that was serving it becomes a no-op once `on_flush` re-checks.
    pub fn on_snapshot(&mut self, snapshot: SimSnapshot, now: Instant) -> PaceDecision {
        let elapsed = self.last_render.map(|last| now.duration_since(last));

        match elapsed {
            Some(since) if since < self.min_interval => {
                self.latest = Some(snapshot);
                match self.pending_flush {
                    Some(_) => PaceDecision::Coalesced,
                    None => {
                        let deadline = now + (self.min_interval - since);
                        self.pending_flush = Some(deadline);
                        PaceDecision::FlushArmed(deadline)
                    }
                }
            }
            _ => {
                self.pending_flush = None;
                self.latest = None;
                self.last_render = Some(now);
                PaceDecision::RenderNow(snapshot)
            }
        }
    }

    /// Fire the armed trailing flush.
    ///
    /// Returns the snapshot to paint, freshly read at fire time. Returns
    /// `None` when the flush was superseded by an immediate render since it
    /// was armed; the caller must treat that as a no-op.
    pub fn on_flush(&mut self, now: Instant) -> Option<SimSnapshot> {
        self.pending_flush.take()?;
        self.last_render = Some(now);
        self.latest.take()
    }

    /// Deadline of the armed trailing flush, if one is live.
    pub fn flush_deadline(&self) -> Option<Instant> {
        self.pending_flush
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(50);

    fn snap(tag: usize) -> SimSnapshot {
        SimSnapshot {
            current_line: tag,
            ..SimSnapshot::default()
        }
    }

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    #[test]
    fn first_snapshot_renders_immediately() {
        let mut pacer = FramePacer::new(INTERVAL);
        let t0 = Instant::now();

        match pacer.on_snapshot(snap(1), t0) {
            PaceDecision::RenderNow(frame) => assert_eq!(frame.current_line, 1),
            other => panic!("expected immediate render, got {:?}", other),
        }
        assert!(pacer.flush_deadline().is_none());
    }

    #[test]
    fn burst_inside_window_coalesces_to_last() {
        let mut pacer = FramePacer::new(INTERVAL);
        let t0 = Instant::now();

        assert!(matches!(
            pacer.on_snapshot(snap(1), t0),
            PaceDecision::RenderNow(_)
        ));

        // Burst of three more, all within the window.
        match pacer.on_snapshot(snap(2), at(t0, 5)) {
            PaceDecision::FlushArmed(deadline) => assert_eq!(deadline, at(t0, 50)),
            other => panic!("expected armed flush, got {:?}", other),
        }
        assert_eq!(pacer.on_snapshot(snap(3), at(t0, 10)), PaceDecision::Coalesced);
        assert_eq!(pacer.on_snapshot(snap(4), at(t0, 15)), PaceDecision::Coalesced);

        // Exactly one flush, carrying the last of the burst.
        let frame = pacer.on_flush(at(t0, 50)).expect("flush must deliver");
        assert_eq!(frame.current_line, 4);
        assert!(pacer.flush_deadline().is_none());
    }

    #[test]
    fn armed_deadline_never_moves() {
        let mut pacer = FramePacer::new(INTERVAL);
        let t0 = Instant::now();

        pacer.on_snapshot(snap(1), t0);
        pacer.on_snapshot(snap(2), at(t0, 10));
        let armed = pacer.flush_deadline().expect("flush armed");

        pacer.on_snapshot(snap(3), at(t0, 20));
        pacer.on_snapshot(snap(4), at(t0, 40));
        assert_eq!(pacer.flush_deadline(), Some(armed));
    }

    #[test]
    fn rate_bound_holds_across_renders() {
        let mut pacer = FramePacer::new(INTERVAL);
        let t0 = Instant::now();
        let mut render_times = Vec::new();

        for ms in (0u64..200).step_by(10) {
            if let PaceDecision::RenderNow(_) = pacer.on_snapshot(snap(ms as usize), at(t0, ms)) {
                render_times.push(at(t0, ms));
            }
            if pacer.flush_deadline() == Some(at(t0, ms)) && pacer.on_flush(at(t0, ms)).is_some() {
                render_times.push(at(t0, ms));
            }
        }

        for pair in render_times.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= INTERVAL);
        }
    }

    #[test]
    fn superseded_flush_is_a_noop() {
        let mut pacer = FramePacer::new(INTERVAL);
        let t0 = Instant::now();

        pacer.on_snapshot(snap(1), t0);
        pacer.on_snapshot(snap(2), at(t0, 10));
        assert!(pacer.flush_deadline().is_some());

        // Window reopens before the timer pops; the immediate render wins.
        match pacer.on_snapshot(snap(3), at(t0, 60)) {
            PaceDecision::RenderNow(frame) => assert_eq!(frame.current_line, 3),
            other => panic!("expected immediate render, got {:?}", other),
        }

        // The stale timer fires afterwards and must deliver nothing.
        assert!(pacer.on_flush(at(t0, 61)).is_none());
    }

    #[test]
    fn flush_delivers_value_current_at_fire_time() {
        let mut pacer = FramePacer::new(INTERVAL);
        let t0 = Instant::now();

        pacer.on_snapshot(snap(1), t0);
        pacer.on_snapshot(snap(2), at(t0, 10));
        // Arrives after arming but before the deadline: the flush must
        // pick it up instead of the value captured at arm time.
        pacer.on_snapshot(snap(3), at(t0, 45));

        let frame = pacer.on_flush(at(t0, 50)).expect("flush must deliver");
        assert_eq!(frame.current_line, 3);
    }

    // Arrivals at t=0,10,20,60 against a 50ms interval: render at t=0,
    // trailing flush at t=50 carrying the t=20 snapshot, and the t=60
    // arrival re-arms for t=100.
    #[test]
    fn staggered_arrival_pattern() {
        let mut pacer = FramePacer::new(INTERVAL);
        let t0 = Instant::now();
        let mut rendered = Vec::new();

        match pacer.on_snapshot(snap(0), t0) {
            PaceDecision::RenderNow(frame) => rendered.push(frame),
            other => panic!("t=0 must render, got {:?}", other),
        }

        assert!(matches!(
            pacer.on_snapshot(snap(10), at(t0, 10)),
            PaceDecision::FlushArmed(_)
        ));
        assert_eq!(pacer.on_snapshot(snap(20), at(t0, 20)), PaceDecision::Coalesced);

        // Timer pops at t=50, before the t=60 snapshot exists.
        rendered.push(pacer.on_flush(at(t0, 50)).expect("flush at t=50"));

        // t=60 is only 10ms after the flush: window still closed.
        match pacer.on_snapshot(snap(60), at(t0, 60)) {
            PaceDecision::FlushArmed(deadline) => assert_eq!(deadline, at(t0, 100)),
            other => panic!("t=60 must re-arm, got {:?}", other),
        }

        assert_eq!(rendered.len(), 2);
        assert_eq!(rendered[1].current_line, 20);
    }
}
