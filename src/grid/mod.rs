//! Rolling voxel grid: the bounded keypoint map.
//!
//! The grid covers a fixed axis-aligned box of `grid_nb_voxel · voxel_size`
//! meters per axis and logically follows the sensor: when the sensor center
//! moves to another voxel the grid translates by an integer number of voxels,
//! entire slabs fall off one face and empty slabs appear on the opposite
//! face. Points outside the box are forgotten; insertions outside it are
//! silently dropped. Each voxel owns its point bag exclusively, with a
//! leaf-cell downsampling filter applied on insert.
//!
//! Two grids are maintained by the pipeline, one for edge keypoints and one
//! for planar keypoints.

use log::debug;
use nalgebra::Vector3;

use crate::config::RollingGridConfig;
use crate::core::LidarPoint;

/// A fixed-extent voxel grid that rolls with the sensor.
#[derive(Debug, Clone)]
pub struct RollingGrid {
    voxel_size: f64,
    leaf_size: f64,
    dims: [usize; 3],
    /// Voxel coordinates of the grid's minimum corner on the global voxel
    /// lattice; the corner in meters is `origin_voxel · voxel_size`.
    origin_voxel: [i64; 3],
    voxels: Vec<Vec<LidarPoint>>,
    len: usize,
}

impl RollingGrid {
    /// Create an empty grid centered on the world origin.
    pub fn new(config: &RollingGridConfig) -> Self {
        let dims = config.grid_nb_voxel;
        let origin_voxel = [
            -(dims[0] as i64 / 2),
            -(dims[1] as i64 / 2),
            -(dims[2] as i64 / 2),
        ];
        Self {
            voxel_size: config.voxel_size,
            leaf_size: config.leaf_voxel_size,
            dims,
            origin_voxel,
            voxels: vec![Vec::new(); dims[0] * dims[1] * dims[2]],
            len: 0,
        }
    }

    /// Total number of stored points.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the grid holds no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Remove every stored point, keeping the grid in place.
    pub fn clear(&mut self) {
        for voxel in &mut self.voxels {
            voxel.clear();
        }
        self.len = 0;
    }

    /// The box currently covered, as `(min_corner, max_corner)` in meters.
    pub fn bounds(&self) -> (Vector3<f64>, Vector3<f64>) {
        let min = Vector3::new(
            self.origin_voxel[0] as f64 * self.voxel_size,
            self.origin_voxel[1] as f64 * self.voxel_size,
            self.origin_voxel[2] as f64 * self.voxel_size,
        );
        let extent = Vector3::new(
            self.dims[0] as f64 * self.voxel_size,
            self.dims[1] as f64 * self.voxel_size,
            self.dims[2] as f64 * self.voxel_size,
        );
        (min, min + extent)
    }

    /// True if `p` lies inside the covered box.
    pub fn contains(&self, p: &Vector3<f64>) -> bool {
        self.local_voxel(p).is_some()
    }

    #[inline]
    fn global_voxel(&self, p: &Vector3<f64>) -> [i64; 3] {
        [
            (p.x / self.voxel_size).floor() as i64,
            (p.y / self.voxel_size).floor() as i64,
            (p.z / self.voxel_size).floor() as i64,
        ]
    }

    /// Flat index of the voxel containing `p`, if inside the grid.
    fn local_voxel(&self, p: &Vector3<f64>) -> Option<usize> {
        let g = self.global_voxel(p);
        let mut local = [0usize; 3];
        for axis in 0..3 {
            let l = g[axis] - self.origin_voxel[axis];
            if l < 0 || l >= self.dims[axis] as i64 {
                return None;
            }
            local[axis] = l as usize;
        }
        Some(self.flat_index(local))
    }

    #[inline]
    fn flat_index(&self, local: [usize; 3]) -> usize {
        (local[2] * self.dims[1] + local[1]) * self.dims[0] + local[0]
    }

    /// Leaf cell of a point within its voxel.
    fn leaf_cell(&self, p: &Vector3<f64>) -> [u32; 3] {
        let g = self.global_voxel(p);
        let mut cell = [0u32; 3];
        for axis in 0..3 {
            let voxel_min = g[axis] as f64 * self.voxel_size;
            let offset = p[axis] - voxel_min;
            cell[axis] = (offset / self.leaf_size).floor() as u32;
        }
        cell
    }

    /// Insert points, applying the per-voxel leaf downsampling filter.
    ///
    /// The first point to occupy a leaf cell wins; later arrivals in the same
    /// cell are discarded. Points outside the grid are silently dropped.
    pub fn insert(&mut self, points: &[LidarPoint]) {
        for point in points {
            let p = point.position();
            let Some(idx) = self.local_voxel(&p) else {
                continue;
            };
            let cell = self.leaf_cell(&p);
            let occupied = self.voxels[idx]
                .iter()
                .any(|existing| self.leaf_cell(&existing.position()) == cell);
            if !occupied {
                self.voxels[idx].push(*point);
                self.len += 1;
            }
        }
    }

    /// Collect every point stored in voxels intersecting the cube of side
    /// `2·radius` around `center`.
    pub fn query(&self, center: &Vector3<f64>, radius: f64) -> Vec<LidarPoint> {
        let mut out = Vec::new();
        self.query_into(center, radius, &mut out);
        out
    }

    /// Same as [`Self::query`], appending into a caller-owned buffer.
    pub fn query_into(&self, center: &Vector3<f64>, radius: f64, out: &mut Vec<LidarPoint>) {
        let lo = self.global_voxel(&(center - Vector3::repeat(radius)));
        let hi = self.global_voxel(&(center + Vector3::repeat(radius)));

        let mut range = [(0usize, 0usize); 3];
        for axis in 0..3 {
            let start = (lo[axis] - self.origin_voxel[axis]).max(0);
            let end = (hi[axis] - self.origin_voxel[axis]).min(self.dims[axis] as i64 - 1);
            if start > end {
                return;
            }
            range[axis] = (start as usize, end as usize);
        }

        for z in range[2].0..=range[2].1 {
            for y in range[1].0..=range[1].1 {
                for x in range[0].0..=range[0].1 {
                    out.extend_from_slice(&self.voxels[self.flat_index([x, y, z])]);
                }
            }
        }
    }

    /// Re-center the grid on `center`, evicting voxels that fall off.
    ///
    /// The grid shifts by whole voxels so that the voxel containing `center`
    /// becomes the middle voxel. A no-op when the center has not left its
    /// voxel.
    pub fn roll_to(&mut self, center: &Vector3<f64>) {
        let g = self.global_voxel(center);
        let desired = [
            g[0] - self.dims[0] as i64 / 2,
            g[1] - self.dims[1] as i64 / 2,
            g[2] - self.dims[2] as i64 / 2,
        ];
        if desired == self.origin_voxel {
            return;
        }

        let old_origin = self.origin_voxel;
        let mut old_voxels = std::mem::replace(
            &mut self.voxels,
            vec![Vec::new(); self.dims[0] * self.dims[1] * self.dims[2]],
        );
        self.origin_voxel = desired;
        let mut kept = 0usize;

        for z in 0..self.dims[2] {
            for y in 0..self.dims[1] {
                for x in 0..self.dims[0] {
                    let global = [
                        desired[0] + x as i64,
                        desired[1] + y as i64,
                        desired[2] + z as i64,
                    ];
                    let old_local = [
                        global[0] - old_origin[0],
                        global[1] - old_origin[1],
                        global[2] - old_origin[2],
                    ];
                    let inside = (0..3)
                        .all(|axis| old_local[axis] >= 0 && old_local[axis] < self.dims[axis] as i64);
                    if inside {
                        let old_idx = (old_local[2] as usize * self.dims[1]
                            + old_local[1] as usize)
                            * self.dims[0]
                            + old_local[0] as usize;
                        let bag = std::mem::take(&mut old_voxels[old_idx]);
                        kept += bag.len();
                        let new_idx = self.flat_index([x, y, z]);
                        self.voxels[new_idx] = bag;
                    }
                }
            }
        }

        let evicted = self.len - kept;
        self.len = kept;
        if evicted > 0 {
            debug!("rolling grid shifted, {evicted} points evicted");
        }
    }
}
