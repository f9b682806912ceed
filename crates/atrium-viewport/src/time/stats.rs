use std::collections::VecDeque;
use std::time::Instant;

/// Default number of samples retained for the FPS graph.
const DEFAULT_WINDOW: usize = 120;

/// Frame-duration sampler behind the debug overlay's timing graph.
///
/// `begin`/`end` bracket the render portion of a tick. Unbalanced calls are
/// tolerated: `end` without a matching `begin` records nothing.
#[derive(Debug)]
pub struct FrameStats {
    samples: VecDeque<f32>,
    window: usize,
    in_flight: Option<Instant>,
    total_frames: u64,
}

impl FrameStats {
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW)
    }

    pub fn with_window(window: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(window.max(1)),
            window: window.max(1),
            in_flight: None,
            total_frames: 0,
        }
    }

    /// Starts a measurement. A second `begin` before `end` restarts it.
    pub fn begin(&mut self) {
        self.in_flight = Some(Instant::now());
    }

    /// Finishes the current measurement and records it, in milliseconds.
    pub fn end(&mut self) -> Option<f32> {
        let started = self.in_flight.take()?;
        let ms = started.elapsed().as_secs_f32() * 1_000.0;
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(ms);
        self.total_frames = self.total_frames.wrapping_add(1);
        Some(ms)
    }

    /// Most recent sample, in milliseconds.
    pub fn last_ms(&self) -> Option<f32> {
        self.samples.back().copied()
    }

    /// Mean over the retained window, in milliseconds.
    pub fn average_ms(&self) -> Option<f32> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f32>() / self.samples.len() as f32)
    }

    /// Frames per second derived from the window mean.
    pub fn fps(&self) -> Option<f32> {
        self.average_ms().map(|ms| 1_000.0 / ms.max(0.001))
    }

    /// Total frames measured since construction (or the last reset).
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Retained samples, oldest first. Graph consumers read this directly.
    pub fn samples(&self) -> impl Iterator<Item = f32> + '_ {
        self.samples.iter().copied()
    }

    pub fn reset(&mut self) {
        self.samples.clear();
        self.in_flight = None;
        self.total_frames = 0;
    }
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}
