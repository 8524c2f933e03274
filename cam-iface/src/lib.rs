//! Trait boundary for the platform camera capability.
//!
//! The scan core never touches camera hardware. It consumes a
//! [`CameraDevice`] (opened and driven by platform glue) and feeds a
//! [`CameraObserver`] from the camera's own execution context.

use serde::{Deserialize, Serialize};

use luma_frame::LumaFrame;

// ---------------------------
// errors

pub type Result<M> = std::result::Result<M, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("no camera available")]
    NoCamera,
    #[error("camera in use by another client")]
    CameraInUse,
    #[error("camera permission not granted")]
    NoPermission,
    #[error("CameraError({0})")]
    CameraError(String),
    #[error("{0}")]
    IoError(#[from] std::io::Error),
}

fn _test_error_is_send() {
    // Compile-time test to ensure Error implements Send trait.
    fn implements<T: Send>() {}
    implements::<Error>();
}

impl<'a> From<&'a str> for Error {
    fn from(orig: &'a str) -> Error {
        Error::CameraError(orig.to_string())
    }
}

// ---------------------------
// value types

/// Display rotation of the camera sensor relative to the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Orientation {
    pub fn degrees(self) -> u16 {
        match self {
            Orientation::Deg0 => 0,
            Orientation::Deg90 => 90,
            Orientation::Deg180 => 180,
            Orientation::Deg270 => 270,
        }
    }

    /// True when sensor rows run along the view's vertical axis.
    pub fn transposes(self) -> bool {
        matches!(self, Orientation::Deg90 | Orientation::Deg270)
    }
}

// use Debug to impl Display
impl std::fmt::Display for Orientation {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::result::Result<(), std::fmt::Error> {
        std::fmt::Debug::fmt(self, fmt)
    }
}

impl Default for Orientation {
    fn default() -> Self {
        Orientation::Deg0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TorchMode {
    Off,
    On,
}

impl Default for TorchMode {
    fn default() -> Self {
        TorchMode::Off
    }
}

/// Fixed per-camera-open facts, captured on every camera-ready event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CameraGeometry {
    /// sensor buffer width in pixels
    pub sensor_width: u32,
    /// sensor buffer height in pixels
    pub sensor_height: u32,
    pub orientation: Orientation,
    pub is_front_facing: bool,
}

/// Camera failure reported through [`CameraObserver::on_camera_error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CamErrorCode {
    NoCamera,
    NoPermission,
    CameraError,
    CameraInUse,
}

impl CamErrorCode {
    /// Message suitable for showing to the user.
    pub fn user_message(self) -> &'static str {
        match self {
            CamErrorCode::NoCamera => "no camera was found on this device",
            CamErrorCode::NoPermission => "camera permission has not been granted",
            CamErrorCode::CameraError => "the camera stopped working",
            CamErrorCode::CameraInUse => "the camera is in use by another app",
        }
    }

    /// Whether this error ends the scan session. Permission problems are
    /// owned by the platform permission flow, not the scan core.
    pub fn is_fatal(self) -> bool {
        !matches!(self, CamErrorCode::NoPermission)
    }
}

impl std::fmt::Display for CamErrorCode {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::result::Result<(), std::fmt::Error> {
        std::fmt::Debug::fmt(self, fmt)
    }
}

/// Command sent to the execution context that owns the camera handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CamCommand {
    SetTorch(TorchMode),
}

// ---------------------------
// CameraDevice

/// A platform camera, owned by exactly one execution context.
pub trait CameraDevice {
    fn open(&mut self, auto_focus: bool) -> Result<()>;
    fn close(&mut self) -> Result<()>;
    fn is_opened(&self) -> bool;

    /// Sensor buffer resolution as delivered (before orientation handling).
    fn resolution(&self) -> Result<(u32, u32)>;
    fn is_front_facing(&self) -> Result<bool>;
    fn display_orientation(&self) -> Result<Orientation>;

    fn set_torch(&mut self, mode: TorchMode) -> Result<()>;
}

/// Assemble the per-open geometry snapshot from an opened device.
///
/// Called by the camera-owning context when the device signals readiness,
/// before the first frame is delivered.
pub fn geometry_of(device: &dyn CameraDevice) -> Result<CameraGeometry> {
    let (sensor_width, sensor_height) = device.resolution()?;
    Ok(CameraGeometry {
        sensor_width,
        sensor_height,
        orientation: device.display_orientation()?,
        is_front_facing: device.is_front_facing()?,
    })
}

// ---------------------------
// CameraObserver

/// Callbacks invoked from the camera execution context.
///
/// `on_frame` is synchronous: the camera must not deliver the next frame
/// until the previous call has returned, and must stop delivering once it
/// returns `false`.
pub trait CameraObserver {
    fn on_camera_ready(&mut self, geometry: CameraGeometry);
    fn on_frame(&mut self, frame: &LumaFrame) -> bool;
    fn on_camera_error(&mut self, code: CamErrorCode);
}
