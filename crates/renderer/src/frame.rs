//! Per-frame driver, independent of winit and wgpu so it can be exercised
//! against a fake surface.

use winit::dpi::PhysicalSize;

use crate::overlay::Overlay;
use crate::runtime::{BoxedTimeSource, FrameTiming, FrameUniforms};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Closing,
}

/// What a frame loop needs from the window and GPU.
pub trait FrameSurface {
    /// Current framebuffer size in physical pixels.
    fn framebuffer_size(&self) -> PhysicalSize<u32>;
    /// Makes the drawable area match `size`.
    fn resize_viewport(&mut self, size: PhysicalSize<u32>);
    /// Clears, draws the program with `uniforms`, then the overlay, and
    /// presents.
    fn draw_frame(
        &mut self,
        uniforms: &FrameUniforms,
        overlay: Option<&mut dyn Overlay>,
    ) -> Result<(), wgpu::SurfaceError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOutcome {
    Presented(FrameUniforms),
    /// Nothing was drawn: the loop is closing or the framebuffer has no area.
    Skipped,
}

pub struct FrameLoop {
    state: LoopState,
    time: BoxedTimeSource,
    timing: FrameTiming,
    overlay: Option<Box<dyn Overlay>>,
    last_size: Option<PhysicalSize<u32>>,
}

impl FrameLoop {
    pub fn new(time: BoxedTimeSource, overlay: Option<Box<dyn Overlay>>) -> Self {
        Self {
            state: LoopState::Running,
            time,
            timing: FrameTiming::default(),
            overlay,
            last_size: None,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    pub fn request_close(&mut self) {
        if self.state == LoopState::Running {
            tracing::debug!("close requested");
        }
        self.state = LoopState::Closing;
    }

    pub fn timing(&self) -> &FrameTiming {
        &self.timing
    }

    /// Forces the next frame to re-apply the framebuffer size.
    pub fn invalidate_viewport(&mut self) {
        self.last_size = None;
    }

    /// Runs one iteration: size the viewport, sample the clock, draw.
    pub fn run_frame<S>(&mut self, surface: &mut S) -> Result<FrameOutcome, wgpu::SurfaceError>
    where
        S: FrameSurface + ?Sized,
    {
        if !self.is_running() {
            return Ok(FrameOutcome::Skipped);
        }

        let size = surface.framebuffer_size();
        if size.width == 0 || size.height == 0 {
            tracing::trace!("framebuffer has no area; skipping frame");
            return Ok(FrameOutcome::Skipped);
        }
        if self.last_size != Some(size) {
            surface.resize_viewport(size);
            self.last_size = Some(size);
        }

        let sample = self.time.sample();
        self.timing.update_performance_metrics(sample.seconds);
        let uniforms = FrameUniforms::new(size, sample);

        if let Some(overlay) = self.overlay.as_mut() {
            overlay.begin_frame(&self.timing);
        }
        let overlay = self
            .overlay
            .as_mut()
            .map(|overlay| overlay.as_mut() as &mut dyn Overlay);
        surface.draw_frame(&uniforms, overlay)?;

        Ok(FrameOutcome::Presented(uniforms))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::overlay::OverlayTarget;
    use crate::runtime::{TimeSample, TimeSource};

    struct ManualClock {
        times: Vec<f64>,
        next: usize,
    }

    impl TimeSource for ManualClock {
        fn sample(&mut self) -> TimeSample {
            let index = self.next.min(self.times.len() - 1);
            let sample = TimeSample::new(self.times[index]);
            self.next += 1;
            sample
        }
    }

    fn clock(times: &[f64]) -> BoxedTimeSource {
        Box::new(ManualClock {
            times: times.to_vec(),
            next: 0,
        })
    }

    #[derive(Default)]
    struct FakeSurface {
        size: PhysicalSize<u32>,
        viewports: Vec<PhysicalSize<u32>>,
        drawn: Vec<FrameUniforms>,
        overlay_present: Vec<bool>,
        fail_with: Option<wgpu::SurfaceError>,
    }

    impl FakeSurface {
        fn sized(width: u32, height: u32) -> Self {
            Self {
                size: PhysicalSize::new(width, height),
                ..Self::default()
            }
        }
    }

    impl FrameSurface for FakeSurface {
        fn framebuffer_size(&self) -> PhysicalSize<u32> {
            self.size
        }

        fn resize_viewport(&mut self, size: PhysicalSize<u32>) {
            self.viewports.push(size);
        }

        fn draw_frame(
            &mut self,
            uniforms: &FrameUniforms,
            overlay: Option<&mut dyn Overlay>,
        ) -> Result<(), wgpu::SurfaceError> {
            if let Some(err) = self.fail_with.take() {
                return Err(err);
            }
            self.overlay_present.push(overlay.is_some());
            if let Some(overlay) = overlay {
                overlay.end_frame();
            }
            self.drawn.push(*uniforms);
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct RecordingOverlay {
        events: Rc<RefCell<Vec<String>>>,
    }

    impl Overlay for RecordingOverlay {
        fn begin_frame(&mut self, timing: &FrameTiming) {
            self.events
                .borrow_mut()
                .push(format!("begin {:.1}", timing.fps()));
        }

        fn draw(&mut self, _target: &mut OverlayTarget<'_>) {
            self.events.borrow_mut().push("draw".into());
        }

        fn end_frame(&mut self) {
            self.events.borrow_mut().push("end".into());
        }
    }

    #[test]
    fn resolution_tracks_framebuffer_size() {
        let mut frames = FrameLoop::new(clock(&[0.0, 0.1, 0.2]), None);
        let mut surface = FakeSurface::sized(640, 480);

        for (width, height) in [(640, 480), (1280, 720), (1, 1)] {
            surface.size = PhysicalSize::new(width, height);
            let outcome = frames.run_frame(&mut surface).unwrap();
            let FrameOutcome::Presented(uniforms) = outcome else {
                panic!("frame should be presented");
            };
            assert_eq!(uniforms.resolution, [width as f32, height as f32]);
        }
        assert_eq!(
            surface.viewports,
            vec![
                PhysicalSize::new(640, 480),
                PhysicalSize::new(1280, 720),
                PhysicalSize::new(1, 1),
            ]
        );
    }

    #[test]
    fn viewport_is_only_reapplied_on_change() {
        let mut frames = FrameLoop::new(clock(&[0.0, 0.1, 0.2]), None);
        let mut surface = FakeSurface::sized(800, 600);
        frames.run_frame(&mut surface).unwrap();
        frames.run_frame(&mut surface).unwrap();
        assert_eq!(surface.viewports.len(), 1);

        frames.invalidate_viewport();
        frames.run_frame(&mut surface).unwrap();
        assert_eq!(surface.viewports.len(), 2);
    }

    #[test]
    fn time_is_non_decreasing() {
        let mut frames = FrameLoop::new(clock(&[0.0, 0.016, 0.033, 0.033, 0.05]), None);
        let mut surface = FakeSurface::sized(320, 240);
        for _ in 0..5 {
            frames.run_frame(&mut surface).unwrap();
        }
        let times: Vec<f32> = surface.drawn.iter().map(|u| u.time).collect();
        assert_eq!(times.len(), 5);
        assert!(times.windows(2).all(|pair| pair[1] >= pair[0]));
        assert!(frames.timing().fps().is_finite());
    }

    #[test]
    fn closing_stops_drawing() {
        let mut frames = FrameLoop::new(clock(&[0.0]), None);
        let mut surface = FakeSurface::sized(320, 240);
        frames.request_close();
        assert_eq!(frames.state(), LoopState::Closing);
        assert_eq!(frames.run_frame(&mut surface).unwrap(), FrameOutcome::Skipped);
        assert!(surface.drawn.is_empty());
    }

    #[test]
    fn zero_sized_framebuffer_is_skipped() {
        let mut frames = FrameLoop::new(clock(&[0.0, 0.1]), None);
        let mut surface = FakeSurface::sized(0, 480);
        assert_eq!(frames.run_frame(&mut surface).unwrap(), FrameOutcome::Skipped);
        assert!(surface.viewports.is_empty());
        assert!(frames.is_running());

        surface.size = PhysicalSize::new(640, 480);
        assert!(matches!(
            frames.run_frame(&mut surface).unwrap(),
            FrameOutcome::Presented(_)
        ));
    }

    #[test]
    fn surface_errors_are_returned() {
        let mut frames = FrameLoop::new(clock(&[0.0]), None);
        let mut surface = FakeSurface::sized(320, 240);
        surface.fail_with = Some(wgpu::SurfaceError::Outdated);
        let err = frames.run_frame(&mut surface).unwrap_err();
        assert!(matches!(err, wgpu::SurfaceError::Outdated));
        assert!(frames.is_running());
    }

    #[test]
    fn overlay_sees_each_frame() {
        let overlay = RecordingOverlay::default();
        let events = overlay.events.clone();
        let mut frames = FrameLoop::new(clock(&[0.0, 0.1, 0.2]), Some(Box::new(overlay)));
        let mut surface = FakeSurface::sized(640, 480);

        for _ in 0..3 {
            frames.run_frame(&mut surface).unwrap();
        }

        assert_eq!(surface.overlay_present, vec![true, true, true]);
        assert_eq!(
            *events.borrow(),
            vec!["begin 0.0", "end", "begin 10.0", "end", "begin 10.0", "end"]
        );
    }
}
