//! Configuration types for the frame decode pipeline.

use serde::{Deserialize, Serialize};

/// Parameters for per-frame decoding.
///
/// These parameterize how incoming camera frames are cropped and analyzed
/// by the symbol decoder, and how many decoder hints are retained for the
/// viewfinder overlay.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScanCfg {
    /// Side length, in pixels, of the centered analysis window used for the
    /// very first frame of a session.
    ///
    /// Some camera/decoder combinations stall for seconds when the first
    /// frame is analyzed at full crop size; shrinking only that frame keeps
    /// session start responsive. The value is device-tuned and deliberately
    /// configurable.
    pub first_frame_window: u32,
    /// How many candidate points the marker store retains between render
    /// ticks. When exceeded, the oldest half is dropped.
    pub max_candidate_points: usize,
}

pub fn default_scan_cfg() -> ScanCfg {
    ScanCfg {
        first_frame_window: 100,
        max_candidate_points: 64,
    }
}
