//! Sweep intake: scanline grouping, ordering, and index bookkeeping.
//!
//! Incoming clouds carry raw laser ids in whatever order the sensor fires.
//! Internally scanlines are indexed by the canonical beam order (sorted by
//! vertical angle, supplied once via calibration), and each scanline is
//! sorted by acquisition order within the sweep. Bidirectional index tables
//! between the input ordering and the internal ordering are kept so per-point
//! results can be attributed back to the caller's cloud.

use std::collections::HashMap;

use crate::error::{Result, SlamError};

use super::LidarPoint;

/// Sensor beam calibration: the canonical ordering of raw laser ids.
#[derive(Debug, Clone)]
pub struct LaserCalibration {
    /// `canonical_order[k]` is the raw laser id of the k-th scanline when
    /// beams are sorted by vertical angle.
    canonical_order: Vec<u16>,
    raw_to_canonical: HashMap<u16, usize>,
}

impl LaserCalibration {
    /// Build a calibration from the canonical beam order.
    ///
    /// Fails if the ordering is empty or contains a duplicate laser id.
    pub fn new(canonical_order: Vec<u16>) -> Result<Self> {
        if canonical_order.is_empty() {
            return Err(SlamError::Calibration(
                "canonical beam order is empty".to_string(),
            ));
        }
        let mut raw_to_canonical = HashMap::with_capacity(canonical_order.len());
        for (idx, &raw) in canonical_order.iter().enumerate() {
            if raw_to_canonical.insert(raw, idx).is_some() {
                return Err(SlamError::Calibration(format!(
                    "duplicate laser id {raw} in canonical order"
                )));
            }
        }
        Ok(Self {
            canonical_order,
            raw_to_canonical,
        })
    }

    /// Identity calibration for a sensor whose ids 0..n are already sorted
    /// by vertical angle.
    pub fn identity(laser_count: usize) -> Result<Self> {
        Self::new((0..laser_count as u16).collect())
    }

    /// Number of beams.
    #[inline]
    pub fn laser_count(&self) -> usize {
        self.canonical_order.len()
    }

    /// Canonical scanline index of a raw laser id, if known.
    #[inline]
    pub fn canonical_index(&self, raw_id: u16) -> Option<usize> {
        self.raw_to_canonical.get(&raw_id).copied()
    }

    /// The canonical beam ordering.
    pub fn canonical_order(&self) -> &[u16] {
        &self.canonical_order
    }
}

/// One sweep split into canonical scanlines.
#[derive(Debug, Clone, Default)]
pub struct Sweep {
    scanlines: Vec<Vec<LidarPoint>>,
    /// `to_input[line][pos]` is the index of that point in the input cloud.
    to_input: Vec<Vec<u32>>,
    /// `to_scanline[i]` locates input point `i` as `(line, pos)`;
    /// `None` if the point was dropped (unknown laser id).
    to_scanline: Vec<Option<(u16, u32)>>,
    dropped: usize,
}

impl Sweep {
    /// Group a cloud into scanlines using the given calibration.
    ///
    /// Points with a laser id absent from the calibration are dropped (and
    /// counted); each scanline is sorted by acquisition order.
    pub fn from_cloud(points: &[LidarPoint], calibration: &LaserCalibration) -> Self {
        let n_lines = calibration.laser_count();
        let mut scanlines: Vec<Vec<LidarPoint>> = vec![Vec::new(); n_lines];
        let mut to_input: Vec<Vec<u32>> = vec![Vec::new(); n_lines];
        let mut to_scanline = vec![None; points.len()];
        let mut dropped = 0usize;

        for (input_idx, point) in points.iter().enumerate() {
            match calibration.canonical_index(point.laser_id) {
                Some(line) => {
                    scanlines[line].push(*point);
                    to_input[line].push(input_idx as u32);
                }
                None => dropped += 1,
            }
        }

        // Acquisition order within a sweep is monotone in rel_time, which is
        // the azimuth order for a rotating sensor.
        for line in 0..n_lines {
            let mut order: Vec<usize> = (0..scanlines[line].len()).collect();
            order.sort_by(|&a, &b| {
                scanlines[line][a]
                    .rel_time
                    .partial_cmp(&scanlines[line][b].rel_time)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            let sorted_points: Vec<LidarPoint> =
                order.iter().map(|&i| scanlines[line][i]).collect();
            let sorted_input: Vec<u32> = order.iter().map(|&i| to_input[line][i]).collect();
            scanlines[line] = sorted_points;
            to_input[line] = sorted_input;
            for (pos, &input_idx) in to_input[line].iter().enumerate() {
                to_scanline[input_idx as usize] = Some((line as u16, pos as u32));
            }
        }

        Self {
            scanlines,
            to_input,
            to_scanline,
            dropped,
        }
    }

    /// Number of scanlines (equals the calibrated beam count).
    #[inline]
    pub fn num_scanlines(&self) -> usize {
        self.scanlines.len()
    }

    /// Points of one scanline, in acquisition order.
    #[inline]
    pub fn scanline(&self, line: usize) -> &[LidarPoint] {
        &self.scanlines[line]
    }

    /// Iterate over all scanlines.
    pub fn scanlines(&self) -> impl Iterator<Item = &[LidarPoint]> {
        self.scanlines.iter().map(|l| l.as_slice())
    }

    /// Total number of points kept across all scanlines.
    pub fn len(&self) -> usize {
        self.scanlines.iter().map(|l| l.len()).sum()
    }

    /// True if no points were kept.
    pub fn is_empty(&self) -> bool {
        self.scanlines.iter().all(|l| l.is_empty())
    }

    /// Number of input points dropped for an unknown laser id.
    #[inline]
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Input-cloud index of the point at `(line, pos)`.
    #[inline]
    pub fn input_index(&self, line: usize, pos: usize) -> usize {
        self.to_input[line][pos] as usize
    }

    /// Locate an input-cloud point as `(line, pos)`, if it was kept.
    #[inline]
    pub fn locate(&self, input_idx: usize) -> Option<(usize, usize)> {
        self.to_scanline[input_idx].map(|(line, pos)| (line as usize, pos as usize))
    }

    /// Size of the input cloud this sweep was built from.
    #[inline]
    pub fn input_len(&self) -> usize {
        self.to_scanline.len()
    }
}
