use tokio::sync::mpsc;
use tracing::debug;

use cam_iface::CamCommand;
use torch_trigger::AmbientLightController;

/// Sensor-context part of a scan session.
///
/// Owns the hysteresis controller and forwards its rare commands to the
/// camera-owning context. Sending never blocks the sensor callback; a
/// full or closed queue drops the command.
pub struct TorchWatcher {
    controller: AmbientLightController,
    cam_tx: mpsc::Sender<CamCommand>,
}

impl TorchWatcher {
    pub(crate) fn new(controller: AmbientLightController, cam_tx: mpsc::Sender<CamCommand>) -> Self {
        Self { controller, cam_tx }
    }

    pub fn on_sample(&mut self, lux: f32) {
        if let Some(cmd) = self.controller.on_sample(lux) {
            let command = CamCommand::SetTorch(cmd.mode());
            if let Err(e) = self.cam_tx.try_send(command) {
                debug!("dropping torch command: {e}");
            }
        }
    }
}
