use std::time::Instant;

use winit::dpi::PhysicalSize;

/// Snapshot of the time state supplied to the shader uniforms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    /// Elapsed seconds since the time source was created.
    pub seconds: f64,
}

impl TimeSample {
    pub fn new(seconds: f64) -> Self {
        Self { seconds }
    }
}

/// Abstraction over where time values originate from.
pub trait TimeSource {
    /// Produces a time sample for the next frame.
    fn sample(&mut self) -> TimeSample;
}

/// Time source backed by the system monotonic clock.
///
/// Created right after the GPU context, so samples count seconds since the
/// context came up.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn sample(&mut self) -> TimeSample {
        TimeSample::new(self.origin.elapsed().as_secs_f64())
    }
}

/// Convenient alias for owning time sources behind trait objects.
pub type BoxedTimeSource = Box<dyn TimeSource>;

/// Values written into the host uniform block for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    /// Framebuffer width and height in pixels (`iResolution`).
    pub resolution: [f32; 2],
    /// Elapsed seconds (`iTime`).
    pub time: f32,
}

impl FrameUniforms {
    pub fn new(framebuffer: PhysicalSize<u32>, time: TimeSample) -> Self {
        Self {
            resolution: [framebuffer.width as f32, framebuffer.height as f32],
            time: time.seconds as f32,
        }
    }
}

/// Unsmoothed per-frame timing used by the frame-rate overlay.
///
/// Every update replaces the previous values outright, so one long or short
/// frame shows up directly in the readout. A zero or negative delta (a clock
/// that returned the same timestamp twice) leaves `fps` at its previous value
/// instead of producing an infinity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTiming {
    last_time: f64,
    frame_time: f64,
    fps: f64,
}

impl FrameTiming {
    /// Starts timing from `start` seconds.
    pub fn new(start: f64) -> Self {
        Self {
            last_time: start,
            frame_time: 0.0,
            fps: 0.0,
        }
    }

    pub fn update_performance_metrics(&mut self, now: f64) {
        self.frame_time = now - self.last_time;
        if self.frame_time > 0.0 {
            self.fps = 1.0 / self.frame_time;
        }
        self.last_time = now;
    }

    pub fn last_time(&self) -> f64 {
        self.last_time
    }

    /// Seconds between the two most recent updates.
    pub fn frame_time(&self) -> f64 {
        self.frame_time
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }
}

impl Default for FrameTiming {
    fn default() -> Self {
        Self::new(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_timestamps_yield_ten_fps() {
        let mut timing = FrameTiming::default();

        timing.update_performance_metrics(0.0);
        assert_eq!(timing.fps(), 0.0);

        timing.update_performance_metrics(0.1);
        assert!((timing.frame_time() - 0.1).abs() < 1e-9);
        assert!((timing.fps() - 10.0).abs() < 1e-6);

        timing.update_performance_metrics(0.2);
        assert!((timing.frame_time() - 0.1).abs() < 1e-9);
        assert!((timing.fps() - 10.0).abs() < 1e-6);
        assert_eq!(timing.last_time(), 0.2);
    }

    #[test]
    fn repeated_timestamp_keeps_previous_fps() {
        let mut timing = FrameTiming::new(1.0);
        timing.update_performance_metrics(1.5);
        assert!((timing.fps() - 2.0).abs() < 1e-9);

        timing.update_performance_metrics(1.5);
        assert_eq!(timing.frame_time(), 0.0);
        assert!(timing.fps().is_finite());
        assert!((timing.fps() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn single_slow_frame_is_not_smoothed() {
        let mut timing = FrameTiming::new(0.0);
        timing.update_performance_metrics(0.016);
        timing.update_performance_metrics(0.516);
        assert!((timing.fps() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn frame_uniforms_use_framebuffer_size_as_floats() {
        let uniforms = FrameUniforms::new(PhysicalSize::new(1920, 1080), TimeSample::new(2.5));
        assert_eq!(uniforms.resolution, [1920.0, 1080.0]);
        assert_eq!(uniforms.time, 2.5);
    }

    #[test]
    fn system_time_source_is_monotonic() {
        let mut source = SystemTimeSource::new();
        let first = source.sample();
        let second = source.sample();
        assert!(first.seconds >= 0.0);
        assert!(second.seconds >= first.seconds);
    }
}
