//! Time management utilities

use std::time::Instant;

/// Frame time threaded through every update call
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GameTime {
    /// Total elapsed time in seconds
    pub elapsed: f32,

    /// Time since the previous frame in seconds
    pub delta: f32,
}

impl GameTime {
    /// Create a game time from explicit values
    pub fn new(elapsed: f32, delta: f32) -> Self {
        Self { elapsed, delta }
    }

    /// Advance by a fixed step, useful for headless stepping and tests
    pub fn advanced(&self, delta: f32) -> Self {
        Self {
            elapsed: self.elapsed + delta,
            delta,
        }
    }
}

/// High-precision timer for frame timing
pub struct Timer {
    last_frame: Instant,
    delta_time: f32,
    total_time: f32,
    frame_count: u64,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Create a new timer
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            delta_time: 0.0,
            total_time: 0.0,
            frame_count: 0,
        }
    }

    /// Update the timer (should be called once per frame) and return the frame time
    pub fn tick(&mut self) -> GameTime {
        let now = Instant::now();
        self.delta_time = now.duration_since(self.last_frame).as_secs_f32();
        self.total_time += self.delta_time;
        self.last_frame = now;
        self.frame_count += 1;
        self.game_time()
    }

    /// Current frame time without advancing
    pub fn game_time(&self) -> GameTime {
        GameTime::new(self.total_time, self.delta_time)
    }

    /// Get the current frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}
