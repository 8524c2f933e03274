use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info, warn};

use cam_iface::{CamErrorCode, CameraGeometry, CameraObserver};
use luma_frame::LumaFrame;
use scan_pipeline::{DecodeOutcome, FrameDecodePipeline, SymbolDecoder};
use viewfinder_geom::CropRect;

use crate::ScanEvents;

/// Camera-context half of a scan session.
///
/// Driven synchronously by the camera callback layer; owns the decode
/// pipeline and the success/failure dispatch.
pub struct FrameHandler<D: SymbolDecoder, E: ScanEvents> {
    alive: Arc<AtomicBool>,
    decoded: Arc<AtomicBool>,
    pipeline: FrameDecodePipeline<D>,
    events: E,
    crop: Option<CropRect>,
    geometry_tx: watch::Sender<Option<CameraGeometry>>,
}

impl<D: SymbolDecoder, E: ScanEvents> FrameHandler<D, E> {
    pub(crate) fn new(
        alive: Arc<AtomicBool>,
        decoded: Arc<AtomicBool>,
        pipeline: FrameDecodePipeline<D>,
        events: E,
        geometry_tx: watch::Sender<Option<CameraGeometry>>,
    ) -> Self {
        Self {
            alive,
            decoded,
            pipeline,
            events,
            crop: None,
            geometry_tx,
        }
    }
}

impl<D: SymbolDecoder, E: ScanEvents> CameraObserver for FrameHandler<D, E> {
    fn on_camera_ready(&mut self, geometry: CameraGeometry) {
        self.crop = match viewfinder_geom::analysis_crop(&geometry) {
            Ok(crop) => {
                info!(
                    "camera ready: {}x{} at {}, analysis crop {}x{}",
                    geometry.sensor_width,
                    geometry.sensor_height,
                    geometry.orientation,
                    crop.width(),
                    crop.height()
                );
                Some(crop)
            }
            Err(e) => {
                warn!("camera reported degenerate geometry: {e}");
                None
            }
        };
        // Latest-value semantics; the render context reads it on its next
        // tick.
        self.geometry_tx.send_replace(Some(geometry));
    }

    fn on_frame(&mut self, frame: &LumaFrame) -> bool {
        // One liveness snapshot at entry; never re-read mid-callback.
        // Teardown may race this callback, but only future deliveries are
        // affected: an in-flight analysis is never cancelled.
        let live = self.alive.load(Ordering::Acquire);
        if !live || self.decoded.load(Ordering::Acquire) {
            return false;
        }
        let Some(crop) = self.crop else {
            // Not ready or degenerate geometry: skip this frame.
            return true;
        };
        match self.pipeline.analyze(frame, &crop) {
            Ok(DecodeOutcome::Decoded(payload)) => {
                // Dispatch before signalling the camera to stop; the
                // pipeline's compare-and-set already made us the only
                // winner.
                self.events.on_decode_success(payload);
                false
            }
            Ok(DecodeOutcome::NotFound) | Ok(DecodeOutcome::Transient) => true,
            Err(e) => {
                warn!("skipping frame: {e}");
                true
            }
        }
    }

    fn on_camera_error(&mut self, code: CamErrorCode) {
        if code.is_fatal() {
            error!("fatal camera error: {code}");
            self.alive.store(false, Ordering::Release);
            self.events.on_decode_failure(code.user_message());
        } else {
            // Permission problems are owned by the platform permission
            // flow; the session keeps waiting.
            warn!("camera error {code}; deferring to the permission flow");
        }
    }
}
