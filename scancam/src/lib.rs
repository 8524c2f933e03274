//! Scan session orchestration.
//!
//! Wires the per-frame decode pipeline, viewfinder overlay, torch control
//! and success feedback into one scan session, split along execution
//! contexts:
//!
//! - the *camera* context drives [`FrameHandler`] through the
//!   [`cam_iface::CameraObserver`] callbacks, one frame fully processed
//!   before the next;
//! - the *render* context owns [`ScanSession`] and calls
//!   [`ScanSession::render_tick`] on its own timer;
//! - the *sensor* context feeds lux samples to [`TorchWatcher`].
//!
//! The contexts share only the marker store and two set-once atomic flags
//! (session liveness, decode success); everything else is owned by exactly
//! one of the three parts.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::info;

use alert_player::{AudioAlert, FeedbackSignaler, HapticBuzzer};
use cam_iface::{CamCommand, CameraDevice};
use marker_store::MarkerStore;
use scan_overlay::{default_overlay_cfg, OverlayCfg, OverlayRenderer};
use scan_pipeline::{default_scan_cfg, FrameDecodePipeline, ScanCfg, SymbolDecoder};
use torch_trigger::{default_torch_cfg, AmbientLightController, LightSensor, TorchTriggerCfg};

mod frame_handler;
mod session;
mod torch_watcher;

pub use crate::frame_handler::FrameHandler;
pub use crate::session::{ScanSession, SessionPhase};
pub use crate::torch_watcher::TorchWatcher;

pub type Result<M> = std::result::Result<M, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Overlay(#[from] scan_overlay::Error),
    #[error("{0}")]
    Torch(#[from] torch_trigger::Error),
    #[error("{0}")]
    Feedback(#[from] alert_player::Error),
}

fn _test_error_is_send() {
    // Compile-time test to ensure Error implements Send trait.
    fn implements<T: Send>() {}
    implements::<Error>();
}

/// Callbacks exposed to the owning screen.
pub trait ScanEvents {
    fn on_decode_success(&mut self, payload: String);
    fn on_decode_failure(&mut self, message: &str);
}

/// Complete session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionCfg {
    pub scan: ScanCfg,
    pub overlay: OverlayCfg,
    pub torch: TorchTriggerCfg,
}

pub fn default_session_cfg() -> SessionCfg {
    SessionCfg {
        scan: default_scan_cfg(),
        overlay: default_overlay_cfg(),
        torch: default_torch_cfg(),
    }
}

/// Torch commands queue at most this deep before being dropped; the
/// controller's hysteresis makes commands rare.
const CAM_COMMAND_QUEUE_DEPTH: usize = 8;

/// The three per-context parts of one scan session, plus the command
/// stream for the camera-owning context.
pub struct SessionParts<D, E, A, H, L>
where
    D: SymbolDecoder,
    E: ScanEvents,
    A: AudioAlert,
    H: HapticBuzzer,
    L: LightSensor,
{
    pub session: ScanSession<A, H, L>,
    pub frame_handler: FrameHandler<D, E>,
    pub torch_watcher: TorchWatcher,
    pub cam_command_rx: mpsc::Receiver<CamCommand>,
}

/// Apply queued commands to the camera device.
///
/// Run by the camera-owning context between frame deliveries; commands
/// (today only torch changes) originate on other contexts and must never
/// touch the camera handle directly.
pub fn apply_cam_commands(
    device: &mut dyn CameraDevice,
    rx: &mut mpsc::Receiver<CamCommand>,
) {
    while let Ok(command) = rx.try_recv() {
        match command {
            CamCommand::SetTorch(mode) => {
                if let Err(e) = device.set_torch(mode) {
                    tracing::warn!("setting torch failed: {e}");
                }
            }
        }
    }
}

/// Create one scan session.
///
/// `decoder` is the external symbol decoding library, `events` the owning
/// screen's callbacks, `audio`/`haptic` the platform feedback resources
/// and `light_sensor` the platform ambient light subscription.
pub fn start_session<D, E, A, H, L>(
    cfg: SessionCfg,
    decoder: D,
    events: E,
    audio: A,
    haptic: H,
    light_sensor: L,
) -> Result<SessionParts<D, E, A, H, L>>
where
    D: SymbolDecoder,
    E: ScanEvents,
    A: AudioAlert,
    H: HapticBuzzer,
    L: LightSensor,
{
    let alive = Arc::new(AtomicBool::new(true));
    let decoded = Arc::new(AtomicBool::new(false));
    let markers = Arc::new(MarkerStore::new(cfg.scan.max_candidate_points));
    let (geometry_tx, geometry_rx) = watch::channel(None);
    let (cam_tx, cam_command_rx) = mpsc::channel(CAM_COMMAND_QUEUE_DEPTH);

    let pipeline = FrameDecodePipeline::new(
        cfg.scan,
        decoder,
        Arc::clone(&markers),
        Arc::clone(&decoded),
    );
    let overlay = OverlayRenderer::new(cfg.overlay)?;
    let controller = AmbientLightController::new(cfg.torch)?;
    let feedback = FeedbackSignaler::new(audio, haptic);

    info!("scan session created");
    Ok(SessionParts {
        session: ScanSession::new(
            Arc::clone(&alive),
            markers,
            overlay,
            feedback,
            light_sensor,
            geometry_rx,
        ),
        frame_handler: FrameHandler::new(alive, decoded, pipeline, events, geometry_tx),
        torch_watcher: TorchWatcher::new(controller, cam_tx),
        cam_command_rx,
    })
}
