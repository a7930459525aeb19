//! Three-lane coordinate model

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::game::constants::field;
use crate::game::constants::lanes::{COUNT, POSITIONS};

/// Lane index (0 = left, 2 = right)
pub type Lane = usize;

/// Maps lane indices to world x positions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LaneField {
    positions: Vec<f32>,
}

impl Default for LaneField {
    fn default() -> Self {
        Self::canonical()
    }
}

impl LaneField {
    pub fn canonical() -> Self {
        Self {
            positions: POSITIONS.to_vec(),
        }
    }

    /// Build from arbitrary positions (used when restoring state); repaired on the next validation
    pub fn from_positions(positions: Vec<f32>) -> Self {
        Self { positions }
    }

    pub fn lane_count(&self) -> usize {
        self.positions.len()
    }

    /// x position of a lane; out-of-range lanes clamp to the nearest edge lane
    pub fn position_of(&self, lane: Lane) -> f32 {
        let last = self.positions.len().saturating_sub(1);
        self.positions
            .get(lane.min(last))
            .copied()
            .unwrap_or(POSITIONS[lane.min(COUNT - 1)])
    }

    /// Move `delta` lanes from `lane`. Moving past an edge lane leaves the lane unchanged.
    pub fn clamp_lane(&self, lane: Lane, delta: i32) -> Lane {
        let target = lane as i64 + delta as i64;
        if target < 0 || target >= self.lane_count() as i64 {
            lane
        } else {
            target as Lane
        }
    }

    /// Nearest lane to an x position
    pub fn nearest_lane(&self, x: f32) -> Lane {
        self.positions
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                (*a - x)
                    .abs()
                    .partial_cmp(&(*b - x).abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i)
            .unwrap_or(crate::game::constants::lanes::START_LANE)
    }

    /// Neighbouring lanes of `lane` (one or two entries)
    pub fn adjacent(&self, lane: Lane) -> impl Iterator<Item = Lane> + '_ {
        [-1, 1]
            .into_iter()
            .map(move |d| self.clamp_lane(lane, d))
            .filter(move |&l| l != lane)
    }

    pub fn is_valid(&self) -> bool {
        self.positions.len() == COUNT
            && self.positions.iter().all(|p| p.is_finite() && (0.0..field::WIDTH).contains(p))
            && self.positions.windows(2).all(|w| w[0] < w[1])
    }

    /// Restore the canonical layout if the table is corrupted. Returns true if a repair happened.
    pub fn validate_or_reset(&mut self) -> bool {
        if self.is_valid() {
            return false;
        }
        warn!(
            "Lane table corrupted ({:?}), restoring canonical layout",
            self.positions
        );
        self.positions = POSITIONS.to_vec();
        true
    }
}
