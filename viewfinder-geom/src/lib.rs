//! Viewfinder geometry: the analysis crop rectangle and the affine
//! transform mapping decoder coordinates onto the view.
//!
//! [`compute`] is a pure function of camera and view geometry. Both inputs
//! change rarely (camera open, layout pass), so callers may cache the result
//! keyed by the input pair, but must recompute whenever either changes.
//!
//! Sensor buffers arrive rotated relative to the view: for 90 and 270
//! degree orientations all computation happens on the width/height-swapped
//! ("normalized") sensor dimensions. Decoder-reported coordinates are local
//! to the crop handed to it, so the transform consumes crop-local points.

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use cam_iface::{CameraGeometry, Orientation};

pub type Result<M> = std::result::Result<M, GeometryError>;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    #[error("invalid sensor geometry {width}x{height}")]
    InvalidSensor { width: u32, height: u32 },
    #[error("invalid view geometry {width}x{height}")]
    InvalidView { width: u32, height: u32 },
}

/// Size of the drawing surface, updated on every layout pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewGeometry {
    pub width: u32,
    pub height: u32,
}

/// Axis-aligned analysis region in orientation-normalized sensor
/// coordinates. Invariant: contained in the normalized sensor bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl CropRect {
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }

    /// The centered sub-window of at most `side` pixels on each axis.
    ///
    /// Used for the first-frame analysis window; degenerates to `self` when
    /// `side` is larger than the crop.
    pub fn centered_window(&self, side: u32) -> CropRect {
        let w = side.min(self.width());
        let h = side.min(self.height());
        let left = self.left + (self.width() - w) / 2;
        let top = self.top + (self.height() - h) / 2;
        CropRect {
            left,
            top,
            right: left + w,
            bottom: top + h,
        }
    }
}

/// Affine map from crop-local decoder coordinates to view coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewTransform {
    mat: Matrix3<f64>,
    scale_x: f64,
    scale_y: f64,
}

impl ViewTransform {
    pub fn map_point(&self, x: f64, y: f64) -> (f64, f64) {
        let p = self.mat * Vector3::new(x, y, 1.0);
        (p.x, p.y)
    }

    /// The (x, y) scale factors applied after rotation.
    pub fn scale_factors(&self) -> (f64, f64) {
        (self.scale_x, self.scale_y)
    }
}

fn normalized_dims(camera: &CameraGeometry) -> (u32, u32) {
    if camera.orientation.transposes() {
        (camera.sensor_height, camera.sensor_width)
    } else {
        (camera.sensor_width, camera.sensor_height)
    }
}

/// Compute the analysis crop alone.
///
/// The crop depends only on camera geometry, which lets the camera-side
/// frame handler derive it without waiting for a layout pass.
pub fn analysis_crop(camera: &CameraGeometry) -> Result<CropRect> {
    if camera.sensor_width == 0 || camera.sensor_height == 0 {
        return Err(GeometryError::InvalidSensor {
            width: camera.sensor_width,
            height: camera.sensor_height,
        });
    }
    let (norm_w, norm_h) = normalized_dims(camera);
    // Largest square over the shorter dimension, centered on the longer
    // one. Bounds analysis cost and matches the visible preview crop.
    let side = norm_w.min(norm_h);
    let left = (norm_w - side) / 2;
    let top = (norm_h - side) / 2;
    Ok(CropRect {
        left,
        top,
        right: left + side,
        bottom: top + side,
    })
}

fn translation(tx: f64, ty: f64) -> Matrix3<f64> {
    Matrix3::new(1.0, 0.0, tx, 0.0, 1.0, ty, 0.0, 0.0, 1.0)
}

fn rotation(orientation: Orientation) -> Matrix3<f64> {
    // Exact right-angle entries; no trigonometry.
    match orientation {
        Orientation::Deg0 => Matrix3::identity(),
        Orientation::Deg90 => Matrix3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0),
        Orientation::Deg180 => Matrix3::new(-1.0, 0.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0, 1.0),
        Orientation::Deg270 => Matrix3::new(0.0, 1.0, 0.0, -1.0, 0.0, 0.0, 0.0, 0.0, 1.0),
    }
}

/// Compute the crop rectangle and the crop-local → view transform.
pub fn compute(camera: &CameraGeometry, view: &ViewGeometry) -> Result<(CropRect, ViewTransform)> {
    let crop = analysis_crop(camera)?;
    if view.width == 0 || view.height == 0 {
        return Err(GeometryError::InvalidView {
            width: view.width,
            height: view.height,
        });
    }
    let (norm_w, norm_h) = normalized_dims(camera);

    let scale_x = view.width as f64 / norm_w as f64;
    let scale_y = view.height as f64 / norm_h as f64;

    // Crop-local point -> centered normalized sensor frame.
    let recenter = translation(
        crop.left as f64 - norm_w as f64 / 2.0,
        crop.top as f64 - norm_h as f64 / 2.0,
    );
    let mirror = if camera.is_front_facing {
        Matrix3::new(-1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0)
    } else {
        Matrix3::identity()
    };
    let scale = Matrix3::new(scale_x, 0.0, 0.0, 0.0, scale_y, 0.0, 0.0, 0.0, 1.0);
    let into_view = translation(view.width as f64 / 2.0, view.height as f64 / 2.0);

    let mat = into_view * scale * rotation(camera.orientation) * mirror * recenter;
    Ok((
        crop,
        ViewTransform {
            mat,
            scale_x,
            scale_y,
        },
    ))
}
