//! Per-frame decode pipeline.
//!
//! Consumes one luminance frame at a time from the camera execution
//! context, crops it to the analysis region, runs the symbol decoder, and
//! classifies the result. All expected decode failures are absorbed here;
//! only camera-capability failures ever cross the session boundary.
//!
//! Most work is done in [`FrameDecodePipeline::analyze`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use luma_frame::{LumaFrame, LumaView};
use marker_store::{CandidateSink, MarkerStore};
use viewfinder_geom::CropRect;

pub use scan_pipeline_types::{default_scan_cfg, ScanCfg};

mod errors;
pub use crate::errors::*;

mod histogram;
use crate::histogram::DecodeDurationHistogram;

/// Why the decoding library rejected a frame.
#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("no symbol found")]
    NotFound,
    #[error("checksum mismatch")]
    ChecksumMismatch,
    #[error("malformed symbol")]
    FormatError,
    #[error("transient decode failure: {0}")]
    Transient(String),
}

/// External barcode decoding library boundary.
///
/// Implementations report candidate points through `hints` on every call,
/// whether or not a symbol is found.
pub trait SymbolDecoder {
    fn decode(
        &mut self,
        luma: &LumaView<'_>,
        hints: &dyn CandidateSink,
    ) -> std::result::Result<String, DecodeError>;
}

/// Per-frame classification returned by [`FrameDecodePipeline::analyze`].
///
/// Fatal conditions are not decode outcomes: they arise only from the
/// camera capability layer and reach the session through its error
/// callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// First successful decode of this session.
    Decoded(String),
    /// Expected high-frequency case; scanning continues unchanged.
    NotFound,
    /// Frame dropped (e.g. allocation failure inside the decoder);
    /// scanning continues.
    Transient,
}

pub struct FrameDecodePipeline<D: SymbolDecoder> {
    cfg: ScanCfg,
    decoder: D,
    markers: Arc<MarkerStore>,
    decoded: Arc<AtomicBool>,
    analyzed_first_frame: bool,
    transient_reported: bool,
    histogram: DecodeDurationHistogram,
    fno: u64,
}

impl<D: SymbolDecoder> FrameDecodePipeline<D> {
    /// Create a pipeline for one scan session.
    ///
    /// `decoded` is the session's set-once success flag; it is shared so
    /// the camera callback layer can stop requesting frames without
    /// consulting the pipeline.
    pub fn new(
        cfg: ScanCfg,
        decoder: D,
        markers: Arc<MarkerStore>,
        decoded: Arc<AtomicBool>,
    ) -> Self {
        Self {
            cfg,
            decoder,
            markers,
            decoded,
            analyzed_first_frame: false,
            transient_reported: false,
            histogram: DecodeDurationHistogram::new(),
            fno: 0,
        }
    }

    pub fn config(&self) -> &ScanCfg {
        &self.cfg
    }

    /// Analyze one frame.
    ///
    /// Exactly one analysis may be in flight at a time; the synchronous
    /// camera callback contract enforces this (`&mut self` makes it a
    /// compile-time fact within one context).
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn analyze(&mut self, frame: &LumaFrame, crop: &CropRect) -> Result<DecodeOutcome> {
        if crop.right > frame.width() || crop.bottom > frame.height() {
            return Err(Error::ImageSizeChanged);
        }

        let window = if self.analyzed_first_frame {
            *crop
        } else {
            // Shrunken first-frame window; see ScanCfg::first_frame_window.
            crop.centered_window(self.cfg.first_frame_window)
        };
        self.analyzed_first_frame = true;

        let view = frame.view(window.left, window.top, window.width(), window.height())?;

        let start = std::time::Instant::now();
        let decoded = self.decoder.decode(&view, self.markers.as_ref());
        self.fno += 1;
        self.histogram
            .push_new_sample(start.elapsed().as_secs_f64(), self.fno);
        if self.histogram.is_old() {
            self.histogram.show_stats();
            self.histogram = DecodeDurationHistogram::new();
        }

        match decoded {
            Ok(payload) => {
                // The success callback fires at most once per session: the
                // compare-and-set is the same transition that produces the
                // Decoded outcome.
                if self
                    .decoded
                    .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    info!("decoded payload of {} bytes on frame {}", payload.len(), self.fno);
                    Ok(DecodeOutcome::Decoded(payload))
                } else {
                    debug!("frame {} decoded after session already succeeded", self.fno);
                    Ok(DecodeOutcome::NotFound)
                }
            }
            Err(
                DecodeError::NotFound | DecodeError::ChecksumMismatch | DecodeError::FormatError,
            ) => Ok(DecodeOutcome::NotFound),
            Err(DecodeError::Transient(msg)) => {
                if self.transient_reported {
                    debug!("transient decode failure on frame {}: {}", self.fno, msg);
                } else {
                    // Reported once per session to avoid flooding.
                    warn!("transient decode failure on frame {}: {}", self.fno, msg);
                    self.transient_reported = true;
                }
                Ok(DecodeOutcome::Transient)
            }
        }
    }
}
