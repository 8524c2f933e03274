use tracing::{debug, warn};

const NUM_MSEC_BINS: usize = 100;
const WARN_THRESH_MSEC: usize = 60;

/// Histogram of per-frame decode wall time, logged every ~10 seconds.
///
/// Decode time varies wildly between devices; the mode/max summary makes
/// pathological frames visible without per-frame log spam.
pub(crate) struct DecodeDurationHistogram {
    start: std::time::Instant,
    msec_bins: Vec<u32>,
    longest_frame: u64,
    longest_time: f64,
}

impl DecodeDurationHistogram {
    pub(crate) fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
            msec_bins: vec![0; NUM_MSEC_BINS],
            longest_frame: 0,
            longest_time: 0.0,
        }
    }

    pub(crate) fn push_new_sample(&mut self, duration_secs: f64, frameno: u64) {
        if duration_secs.is_nan() || duration_secs < 0.0 {
            return;
        }
        let msecs = duration_secs * 1000.0;
        let bin_num = if msecs > NUM_MSEC_BINS as f64 {
            NUM_MSEC_BINS - 1
        } else {
            msecs as usize
        };
        self.msec_bins[bin_num] += 1;
        if duration_secs > self.longest_time {
            self.longest_time = duration_secs;
            self.longest_frame = frameno;
        }
    }

    pub(crate) fn num_valid_samples(&self) -> u32 {
        self.msec_bins.iter().sum()
    }

    pub(crate) fn is_old(&self) -> bool {
        self.start.elapsed() > std::time::Duration::from_secs(10)
    }

    pub(crate) fn show_stats(&self) {
        if self.num_valid_samples() < 1 {
            return;
        }
        // compute mode (argmax)
        let (argmax, _max) = self.msec_bins.iter().enumerate().fold(
            (0, 0),
            |acc: (usize, u32), (idx, count): (usize, &u32)| {
                if count > &acc.1 {
                    (idx, *count)
                } else {
                    acc
                }
            },
        );

        let mut max = 0;
        for (msec, msec_count) in self.msec_bins.iter().enumerate() {
            if msec_count > &0 {
                max = msec;
            }
        }
        let max_str = if max == NUM_MSEC_BINS - 1 {
            format!("{}+", max)
        } else {
            format!("{}", max)
        };
        let msg = format!(
            "decode duration statistics: mode: {} msec, max: {} msec (longest: frame {})",
            argmax, max_str, self.longest_frame
        );
        if max > WARN_THRESH_MSEC {
            warn!("{}", msg);
        } else {
            debug!("{}", msg);
        }
    }
}
