//! Rolling voxel grid configuration.

use serde::{Deserialize, Serialize};

/// Geometry of the rolling keypoint map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollingGridConfig {
    /// Edge length of one voxel (meters).
    /// Default: 1.0
    pub voxel_size: f64,

    /// Number of voxels per axis. The grid covers a fixed axis-aligned box of
    /// `grid_nb_voxel · voxel_size` meters per axis, centered on the sensor.
    /// Default: [45, 45, 45]
    pub grid_nb_voxel: [usize; 3],

    /// Extent, in voxels per axis, of the box extracted around a query point
    /// when gathering map neighbors for feature fits.
    /// Default: [5, 5, 5]
    pub pointcloud_nb_voxel: [usize; 3],

    /// Edge length of the leaf cells used to downsample each voxel's point
    /// bag on insert: one point is retained per leaf cell (meters).
    /// Default: 0.2
    pub leaf_voxel_size: f64,
}

impl Default for RollingGridConfig {
    fn default() -> Self {
        Self {
            voxel_size: 1.0,
            grid_nb_voxel: [45, 45, 45],
            pointcloud_nb_voxel: [5, 5, 5],
            leaf_voxel_size: 0.2,
        }
    }
}

impl RollingGridConfig {
    /// Half-extent, in meters, of the neighbor-query box derived from
    /// `pointcloud_nb_voxel`.
    pub fn query_radius(&self) -> f64 {
        let max_voxels = self
            .pointcloud_nb_voxel
            .iter()
            .copied()
            .max()
            .unwrap_or(1)
            .max(1);
        0.5 * max_voxels as f64 * self.voxel_size
    }

    /// Builder-style setter for the voxel edge length.
    pub fn with_voxel_size(mut self, size: f64) -> Self {
        self.voxel_size = size;
        self
    }

    /// Builder-style setter for the grid extent in voxels.
    pub fn with_grid_nb_voxel(mut self, nb: [usize; 3]) -> Self {
        self.grid_nb_voxel = nb;
        self
    }

    /// Builder-style setter for the leaf filter size.
    pub fn with_leaf_voxel_size(mut self, size: f64) -> Self {
        self.leaf_voxel_size = size;
        self
    }
}
