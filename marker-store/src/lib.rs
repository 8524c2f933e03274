//! Bounded, double-buffered store for decoder candidate points.
//!
//! The decode context pushes points as the decoder reports them; the render
//! context drains the accumulated batch once per tick with
//! [`MarkerStore::swap_and_clear`]. One mutex guards the producer list, so a
//! swap is atomic with respect to concurrent pushes: no point is lost or
//! duplicated.

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// A location hint reported by the decoder. Not itself a successful decode.
///
/// Coordinates are local to the analysis crop handed to the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandidatePoint {
    pub x: f32,
    pub y: f32,
}

/// Consumer of candidate points, passed into the decoder on every frame.
pub trait CandidateSink {
    fn accept(&self, point: CandidatePoint);
}

pub struct MarkerStore {
    max_points: usize,
    current: Mutex<VecDeque<CandidatePoint>>,
}

fn _test_marker_store_is_send_sync() {
    // Compile-time test to ensure MarkerStore is shareable across contexts.
    fn implements<T: Send + Sync>() {}
    implements::<MarkerStore>();
}

impl MarkerStore {
    /// `max_points` below 2 is raised to 2 so the half-trim stays nonzero.
    pub fn new(max_points: usize) -> Self {
        Self {
            max_points: max_points.max(2),
            current: Mutex::new(VecDeque::new()),
        }
    }

    /// Append one point, trimming the oldest half first when full.
    ///
    /// Dropping `max_points / 2` at once (rather than one entry per push)
    /// amortizes trimming under decoder hint storms.
    pub fn push(&self, point: CandidatePoint) {
        let mut current = self.current.lock();
        if current.len() + 1 > self.max_points {
            current.drain(..self.max_points / 2);
        }
        current.push_back(point);
    }

    /// Take the accumulated batch, leaving the store empty.
    pub fn swap_and_clear(&self) -> Vec<CandidatePoint> {
        let mut current = self.current.lock();
        std::mem::take(&mut *current).into()
    }
}

impl CandidateSink for MarkerStore {
    fn accept(&self, point: CandidatePoint) {
        self.push(point);
    }
}
