//! Ambient-light-driven torch control.
//!
//! Converts lux samples from the platform light sensor into torch on/off
//! commands. Two distinct thresholds (hysteresis) prevent rapid
//! oscillation when the reading hovers near a single boundary, and the
//! last-commanded state is tracked so the camera never receives redundant
//! hardware calls.

use serde::{Deserialize, Serialize};
use tracing::debug;

use cam_iface::TorchMode;

pub type Result<M> = std::result::Result<M, Error>;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("torch thresholds inverted: on_below {on_below} >= off_above {off_above}")]
    InvertedThresholds { on_below: f32, off_above: f32 },
    #[error("SensorError({0})")]
    SensorError(String),
}

impl<'a> From<&'a str> for Error {
    fn from(orig: &'a str) -> Error {
        Error::SensorError(orig.to_string())
    }
}

/// Lux thresholds for the torch decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TorchTriggerCfg {
    /// Turn the torch on when a sample is at or below this value (lux) and
    /// the torch is currently off.
    pub on_below: f32,
    /// Turn the torch off when a sample is at or above this value (lux)
    /// and the torch is currently on.
    pub off_above: f32,
}

pub fn default_torch_cfg() -> TorchTriggerCfg {
    TorchTriggerCfg {
        on_below: 45.0,
        off_above: 450.0,
    }
}

/// Torch decision emitted toward the camera-owning context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TorchCommand {
    On,
    Off,
}

impl TorchCommand {
    pub fn mode(self) -> TorchMode {
        match self {
            TorchCommand::On => TorchMode::On,
            TorchCommand::Off => TorchMode::Off,
        }
    }
}

/// Platform ambient-light sensor subscription.
///
/// Subscriptions are strictly tied to session foreground state: started on
/// foreground, stopped on background (an active subscription drains the
/// battery). `start` returns `Ok(false)` when no sensor is present; the
/// controller then simply never receives samples and never emits.
pub trait LightSensor {
    fn start(&mut self) -> Result<bool>;
    fn stop(&mut self);
}

#[derive(Debug)]
pub struct AmbientLightController {
    cfg: TorchTriggerCfg,
    commanded: TorchMode,
}

impl AmbientLightController {
    pub fn new(cfg: TorchTriggerCfg) -> Result<Self> {
        if cfg.on_below >= cfg.off_above {
            return Err(Error::InvertedThresholds {
                on_below: cfg.on_below,
                off_above: cfg.off_above,
            });
        }
        Ok(Self {
            cfg,
            commanded: TorchMode::Off,
        })
    }

    pub fn commanded(&self) -> TorchMode {
        self.commanded
    }

    /// Feed one lux sample; returns a command only on a state change.
    pub fn on_sample(&mut self, lux: f32) -> Option<TorchCommand> {
        match self.commanded {
            TorchMode::Off if lux <= self.cfg.on_below => {
                debug!("ambient light {} lux: torch on", lux);
                self.commanded = TorchMode::On;
                Some(TorchCommand::On)
            }
            TorchMode::On if lux >= self.cfg.off_above => {
                debug!("ambient light {} lux: torch off", lux);
                self.commanded = TorchMode::Off;
                Some(TorchCommand::Off)
            }
            _ => None,
        }
    }
}
