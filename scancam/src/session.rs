use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use alert_player::{AudioAlert, FeedbackSignaler, HapticBuzzer};
use cam_iface::CameraGeometry;
use marker_store::MarkerStore;
use scan_overlay::{DrawFrame, OverlayRenderer};
use torch_trigger::LightSensor;
use viewfinder_geom::{CropRect, ViewGeometry, ViewTransform};

use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Created,
    Foreground,
    Background,
    Finished,
}

/// Cached transform-engine output; both inputs change rarely, so the
/// computation is keyed on the pair and redone only when either changes.
struct CachedGeometry {
    key: (CameraGeometry, ViewGeometry),
    geometry: Option<(CropRect, ViewTransform)>,
}

/// Render-context half of a scan session.
///
/// Owns the overlay, the feedback signaler, the light-sensor subscription
/// and all draw-state mutation. Reaches the camera context only through
/// the shared marker store and the liveness flag.
pub struct ScanSession<A: AudioAlert, H: HapticBuzzer, L: LightSensor> {
    phase: SessionPhase,
    alive: Arc<AtomicBool>,
    markers: Arc<MarkerStore>,
    overlay: OverlayRenderer,
    feedback: FeedbackSignaler<A, H>,
    light_sensor: L,
    sensor_active: bool,
    geometry_rx: watch::Receiver<Option<CameraGeometry>>,
    view: Option<ViewGeometry>,
    cached: Option<CachedGeometry>,
}

impl<A: AudioAlert, H: HapticBuzzer, L: LightSensor> ScanSession<A, H, L> {
    pub(crate) fn new(
        alive: Arc<AtomicBool>,
        markers: Arc<MarkerStore>,
        overlay: OverlayRenderer,
        feedback: FeedbackSignaler<A, H>,
        light_sensor: L,
        geometry_rx: watch::Receiver<Option<CameraGeometry>>,
    ) -> Self {
        Self {
            phase: SessionPhase::Created,
            alive,
            markers,
            overlay,
            feedback,
            light_sensor,
            sensor_active: false,
            geometry_rx,
            view: None,
            cached: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Called on every layout pass; a changed view forces transform
    /// recomputation on the next tick.
    pub fn set_view_geometry(&mut self, view: ViewGeometry) {
        self.view = Some(view);
    }

    pub fn foreground(&mut self) -> Result<()> {
        self.phase = SessionPhase::Foreground;
        self.feedback.arm()?;
        match self.light_sensor.start() {
            Ok(true) => self.sensor_active = true,
            Ok(false) => debug!("no ambient light sensor; torch control disabled"),
            Err(e) => warn!("ambient light sensor failed to start: {e}"),
        }
        Ok(())
    }

    pub fn background(&mut self) {
        self.stop_sensor();
        self.phase = SessionPhase::Background;
    }

    /// Cooperative teardown: flips the liveness flag observed by the
    /// camera callback, so only future frame deliveries are affected.
    pub fn finish(&mut self) {
        self.alive.store(false, Ordering::Release);
        self.stop_sensor();
        self.feedback.close();
        self.phase = SessionPhase::Finished;
        info!("scan session finished");
    }

    fn stop_sensor(&mut self) {
        if self.sensor_active {
            self.light_sensor.stop();
            self.sensor_active = false;
        }
    }

    fn refresh_geometry(&mut self) {
        let camera = *self.geometry_rx.borrow();
        let (Some(camera), Some(view)) = (camera, self.view) else {
            self.cached = None;
            return;
        };
        let key = (camera, view);
        if self.cached.as_ref().map(|c| c.key) == Some(key) {
            return;
        }
        let geometry = match viewfinder_geom::compute(&camera, &view) {
            Ok(pair) => Some(pair),
            Err(e) => {
                // Skip rendering/analysis for this geometry rather than
                // crash; a later layout pass may fix it.
                warn!("degenerate geometry, overlay disabled: {e}");
                None
            }
        };
        self.cached = Some(CachedGeometry { key, geometry });
    }

    /// One pass of the self-rescheduling render timer.
    ///
    /// Drains the marker batch accumulated since the previous tick and
    /// produces the overlay shapes. Not driven by frame arrival, so the
    /// animation keeps running while analysis is slow.
    pub fn render_tick(&mut self, frame_index: u64) -> Option<DrawFrame> {
        if self.phase != SessionPhase::Foreground {
            return None;
        }
        self.refresh_geometry();
        let (crop, transform) = self.cached.as_ref()?.geometry.as_ref()?;
        let markers = self.markers.swap_and_clear();
        self.overlay.tick(transform, crop, &markers, frame_index, true)
    }

    // Feedback passthroughs: the owning screen routes platform player
    // notifications and the decode-success signal here.

    pub fn on_feedback_prepared(&mut self) {
        self.feedback.on_prepared();
    }

    pub fn on_feedback_complete(&mut self) {
        self.feedback.on_playback_complete();
    }

    /// Fire the success beep/vibration. `play_sound` reflects the platform
    /// ringer policy; the haptic pulse is unconditional.
    pub fn decode_feedback(&mut self, play_sound: bool) -> Result<()> {
        self.feedback.fire_once(play_sound)?;
        Ok(())
    }
}
