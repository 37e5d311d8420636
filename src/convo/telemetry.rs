//! Per-turn timing telemetry
//!
//! Measures the wall-clock gap between consecutive finalized user
//! messages. The first user turn of a conversation records no sample.

use std::time::Instant;

use serde::Serialize;

/// Elapsed time between one user turn and the previous one
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimingSample {
    /// Index of the turn this sample was taken at
    pub turn_index: usize,
    /// Seconds since the previous user message was finalized
    pub seconds: f64,
}

/// Tracks when the last user message was finalized
#[derive(Debug, Default)]
pub struct TurnTimer {
    last_user_turn: Option<Instant>,
}

impl TurnTimer {
    /// Create a timer with no turns recorded
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_user_turn: None,
        }
    }

    /// Record that a user message was finalized now
    ///
    /// Returns the inter-turn delta, or `None` for the first message of
    /// the conversation.
    pub fn mark(&mut self, turn_index: usize) -> Option<TimingSample> {
        let now = Instant::now();
        let sample = self.last_user_turn.map(|previous| TimingSample {
            turn_index,
            seconds: now.duration_since(previous).as_secs_f64(),
        });
        self.last_user_turn = Some(now);
        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn first_mark_yields_no_sample() {
        let mut timer = TurnTimer::new();
        assert!(timer.mark(0).is_none());
    }

    #[test]
    fn second_mark_yields_elapsed_delta() {
        let mut timer = TurnTimer::new();
        timer.mark(0);
        std::thread::sleep(Duration::from_millis(20));
        let sample = timer.mark(2).unwrap();
        assert_eq!(sample.turn_index, 2);
        assert!(sample.seconds >= 0.02, "delta {}", sample.seconds);
    }

    #[test]
    fn deltas_are_between_consecutive_marks() {
        let mut timer = TurnTimer::new();
        timer.mark(0);
        std::thread::sleep(Duration::from_millis(300));
        timer.mark(1);
        // An immediate third mark must measure from the second, not the first
        let sample = timer.mark(2).unwrap();
        assert!(sample.seconds < 0.25, "delta {}", sample.seconds);
    }
}
