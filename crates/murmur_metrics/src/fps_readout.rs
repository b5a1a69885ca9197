//! Periodic frame-rate readout
//!
//! Accumulates frames until `refresh` seconds of frame time have passed, then
//! publishes `frames / elapsed` once and starts over. Between refreshes the
//! last published value is held.

pub struct FpsReadout {
    refresh_secs: f32,
    frame_counter: u32,
    time_counter: f32,
    last_fps: f32,
}

impl FpsReadout {
    pub fn new(refresh_secs: f32) -> Self {
        Self {
            refresh_secs: refresh_secs.max(f32::EPSILON),
            frame_counter: 0,
            time_counter: 0.0,
            last_fps: 0.0,
        }
    }

    /// Feed one frame of `dt` seconds. Returns the new value when a refresh
    /// happened on this frame.
    pub fn tick(&mut self, dt: f32) -> Option<f32> {
        if self.time_counter < self.refresh_secs {
            self.time_counter += dt;
            self.frame_counter += 1;
            return None;
        }

        self.last_fps = self.frame_counter as f32 / self.time_counter;
        self.frame_counter = 0;
        self.time_counter = 0.0;
        Some(self.last_fps)
    }

    pub fn fps(&self) -> f32 {
        self.last_fps
    }
}
