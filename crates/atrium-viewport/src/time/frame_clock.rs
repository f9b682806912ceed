use std::time::{Duration, Instant};

/// Timing snapshot for one frame tick.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Clamped time since the previous tick, in seconds.
    pub delta: f32,

    /// Monotonic timestamp taken at the tick.
    pub at: Instant,

    /// Frame counter, starting at zero.
    pub index: u64,
}

/// Monotonic clock advanced once per frame tick.
///
/// One clock belongs to one render loop; delta state is never shared between
/// loops. Deltas are clamped so that debugger pauses, minimized windows, or
/// long stalls do not feed pathological values into damped interpolation.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    index: u64,
    min_delta: Duration,
    max_delta: Duration,
}

impl FrameClock {
    /// Creates a clock with default clamps (0.1 ms .. 250 ms).
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    /// Creates a clock with custom delta clamps.
    pub fn with_clamps(min_delta: Duration, max_delta: Duration) -> Self {
        debug_assert!(min_delta <= max_delta);
        Self {
            last: Instant::now(),
            index: 0,
            min_delta,
            max_delta,
        }
    }

    /// Resets the delta baseline without touching the frame counter.
    ///
    /// Call after a long suspension (surface reconfigure, resume from sleep).
    pub fn rebase(&mut self) {
        self.last = Instant::now();
    }

    /// Advances the clock and returns the snapshot for this tick.
    pub fn tick(&mut self) -> FrameTime {
        let at = Instant::now();
        let delta = at
            .saturating_duration_since(self.last)
            .clamp(self.min_delta, self.max_delta);
        self.last = at;

        let snapshot = FrameTime {
            delta: delta.as_secs_f32(),
            at,
            index: self.index,
        };
        self.index = self.index.wrapping_add(1);
        snapshot
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_are_sequential() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.tick().index, 0);
        assert_eq!(clock.tick().index, 1);
        assert_eq!(clock.tick().index, 2);
    }

    #[test]
    fn delta_respects_min_clamp() {
        // Back-to-back ticks land well under the minimum clamp.
        let mut clock = FrameClock::with_clamps(
            Duration::from_millis(5),
            Duration::from_millis(250),
        );
        clock.tick();
        let ft = clock.tick();
        assert!(ft.delta >= 0.005);
    }

    #[test]
    fn delta_respects_max_clamp() {
        let mut clock = FrameClock::with_clamps(
            Duration::from_micros(100),
            Duration::from_millis(10),
        );
        // Simulate a stall by rewinding the baseline.
        clock.last = Instant::now() - Duration::from_secs(2);
        let ft = clock.tick();
        assert!(ft.delta <= 0.010 + f32::EPSILON);
    }
}
