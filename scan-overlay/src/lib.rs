//! Viewfinder overlay geometry.
//!
//! Produces the drawable shapes for one render tick: the framing
//! rectangle, the pulsing scan line, and markers at decoder candidate
//! points. Only geometry and style are computed here; pixel drawing is a
//! platform concern.
//!
//! The renderer runs on the render cadence, independent of frame arrival,
//! so the scan-line animation stays smooth even when frame analysis is
//! slow.

use serde::{Deserialize, Serialize};

use marker_store::CandidatePoint;
use viewfinder_geom::{CropRect, ViewTransform};

pub type Result<M> = std::result::Result<M, Error>;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("scan line alpha palette is empty")]
    EmptyAlphaPalette,
    #[error("sweep period must be nonzero")]
    ZeroSweepPeriod,
}

/// RGBA color for canvas-style rendering.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct RgbaColor {
    r: u8,
    g: u8,
    b: u8,
    a: f32,
}

impl RgbaColor {
    pub fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }
}

impl From<RgbaColor> for String {
    fn from(orig: RgbaColor) -> String {
        format!("rgba({}, {}, {}, {:.2})", orig.r, orig.g, orig.b, orig.a)
    }
}

/// Stroke style for drawing shapes.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum StrokeStyle {
    CssColor(RgbaColor),
}

impl StrokeStyle {
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        StrokeStyle::CssColor(RgbaColor { r, g, b, a: 1.0 })
    }

    pub fn color(&self) -> RgbaColor {
        match self {
            StrokeStyle::CssColor(c) => *c,
        }
    }
}

impl From<StrokeStyle> for String {
    fn from(orig: StrokeStyle) -> String {
        match orig {
            StrokeStyle::CssColor(rgba) => rgba.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RectParams {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LineParams {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CircleParams {
    pub center_x: f32,
    pub center_y: f32,
    pub radius: f32,
}

/// Geometric primitives the overlay emits, in view coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum Shape {
    Rectangle(RectParams),
    Line(LineParams),
    Circle(CircleParams),
}

/// A shape with its drawing style.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DrawableShape {
    shape: Shape,
    stroke: StrokeStyle,
    line_width: f32,
}

impl DrawableShape {
    pub fn from_shape(shape: &Shape, stroke: &StrokeStyle, line_width: f32) -> Self {
        Self {
            shape: *shape,
            stroke: *stroke,
            line_width,
        }
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }
    pub fn stroke(&self) -> StrokeStyle {
        self.stroke
    }
    pub fn line_width(&self) -> f32 {
        self.line_width
    }
}

/// Everything to draw for one render tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrawFrame {
    pub shapes: Vec<DrawableShape>,
}

/// Overlay animation and style parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OverlayCfg {
    /// Scan-line alpha palette, cycled by tick index. The pulsing effect is
    /// independent of decode timing.
    pub scan_line_alphas: Vec<f32>,
    /// Render ticks for one full downward sweep of the scan line.
    pub sweep_period: u32,
    /// Marker dot radius in view pixels.
    pub marker_radius: f32,
}

pub fn default_overlay_cfg() -> OverlayCfg {
    OverlayCfg {
        scan_line_alphas: vec![0.0, 0.25, 0.5, 0.75, 1.0, 0.75, 0.5, 0.25],
        sweep_period: 60,
        marker_radius: 6.0,
    }
}

const FRAME_STROKE: StrokeStyle = StrokeStyle::CssColor(RgbaColor {
    r: 255,
    g: 255,
    b: 255,
    a: 0.9,
});
const SCAN_LINE_COLOR: RgbaColor = RgbaColor {
    r: 255,
    g: 45,
    b: 45,
    a: 1.0,
};
const MARKER_STROKE: StrokeStyle = StrokeStyle::CssColor(RgbaColor {
    r: 255,
    g: 200,
    b: 0,
    a: 0.8,
});

const FRAME_LINE_WIDTH: f32 = 2.0;
const SCAN_LINE_WIDTH: f32 = 3.0;
const MARKER_LINE_WIDTH: f32 = 1.5;

pub struct OverlayRenderer {
    cfg: OverlayCfg,
}

impl OverlayRenderer {
    pub fn new(cfg: OverlayCfg) -> Result<Self> {
        if cfg.scan_line_alphas.is_empty() {
            return Err(Error::EmptyAlphaPalette);
        }
        if cfg.sweep_period == 0 {
            return Err(Error::ZeroSweepPeriod);
        }
        Ok(Self { cfg })
    }

    /// Scan-line vertical position as a fraction of the framing rectangle,
    /// a triangle wave over two sweep periods.
    fn sweep_fraction(&self, frame_index: u64) -> f32 {
        let period = self.cfg.sweep_period as u64;
        let pos = frame_index % (2 * period);
        if pos < period {
            pos as f32 / period as f32
        } else {
            (2 * period - pos) as f32 / period as f32
        }
    }

    /// Produce the shapes for one tick.
    ///
    /// Markers are mapped through `transform` on every tick; the transform
    /// may change between ticks on rotation, so mapped coordinates are
    /// never cached. Returns `None` while the session is not foreground.
    pub fn tick(
        &self,
        transform: &ViewTransform,
        crop: &CropRect,
        markers: &[CandidatePoint],
        frame_index: u64,
        foreground: bool,
    ) -> Option<DrawFrame> {
        if !foreground {
            return None;
        }

        let mut shapes = Vec::with_capacity(markers.len() + 2);

        // Framing rectangle: the crop's corners in view space.
        let w = crop.width() as f64;
        let h = crop.height() as f64;
        let corners = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)]
            .map(|(x, y)| transform.map_point(x, y));
        let min_x = corners.iter().map(|c| c.0).fold(f64::INFINITY, f64::min);
        let max_x = corners.iter().map(|c| c.0).fold(f64::NEG_INFINITY, f64::max);
        let min_y = corners.iter().map(|c| c.1).fold(f64::INFINITY, f64::min);
        let max_y = corners.iter().map(|c| c.1).fold(f64::NEG_INFINITY, f64::max);
        let framing = RectParams {
            x: min_x as f32,
            y: min_y as f32,
            width: (max_x - min_x) as f32,
            height: (max_y - min_y) as f32,
        };
        shapes.push(DrawableShape::from_shape(
            &Shape::Rectangle(framing),
            &FRAME_STROKE,
            FRAME_LINE_WIDTH,
        ));

        let alphas = &self.cfg.scan_line_alphas;
        let alpha = alphas[(frame_index % alphas.len() as u64) as usize];
        let y = framing.y + self.sweep_fraction(frame_index) * framing.height;
        shapes.push(DrawableShape::from_shape(
            &Shape::Line(LineParams {
                x1: framing.x,
                y1: y,
                x2: framing.x + framing.width,
                y2: y,
            }),
            &StrokeStyle::CssColor(SCAN_LINE_COLOR.with_alpha(alpha)),
            SCAN_LINE_WIDTH,
        ));

        for marker in markers {
            let (x, y) = transform.map_point(marker.x as f64, marker.y as f64);
            shapes.push(DrawableShape::from_shape(
                &Shape::Circle(CircleParams {
                    center_x: x as f32,
                    center_y: y as f32,
                    radius: self.cfg.marker_radius,
                }),
                &MARKER_STROKE,
                MARKER_LINE_WIDTH,
            ));
        }

        Some(DrawFrame { shapes })
    }
}
