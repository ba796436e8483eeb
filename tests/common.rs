//! Test utilities: synthetic ray-cast scenes and sweep generation.
//!
//! Scenes are collections of axis-aligned rectangular panels. A sweep is
//! generated by casting one ray per (laser, azimuth) cell and keeping the
//! nearest panel hit. All points are stamped `rel_time = 1.0`, i.e. sweeps
//! are end-of-sweep snapshots; the constant-velocity undistortion is then
//! exact and scenario expectations depend only on the inter-frame motion.

#![allow(dead_code)]

use gati_slam::{
    KeypointConfig, LaserCalibration, LidarPoint, LidarSlam, MatcherConfig, RollingGridConfig,
    SlamConfig,
};
use nalgebra::{Rotation3, Vector3};

/// An axis-aligned rectangular panel (double-sided).
#[derive(Debug, Clone, Copy)]
pub struct Panel {
    /// Axis of the panel normal (0 = x, 1 = y, 2 = z).
    pub axis: usize,
    /// Plane coordinate along `axis`.
    pub offset: f64,
    /// Bounds on the other two axes, in ascending axis order.
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Panel {
    pub fn new(axis: usize, offset: f64, min: [f64; 2], max: [f64; 2]) -> Self {
        Self {
            axis,
            offset,
            min,
            max,
        }
    }
}

/// A synthetic world.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub panels: Vec<Panel>,
}

impl Scene {
    /// Infinite-feeling flat ground at the given height.
    pub fn ground_plane(z: f64) -> Self {
        Self {
            panels: vec![Panel::new(2, z, [-60.0, -60.0], [60.0, 60.0])],
        }
    }

    /// Corridor along x: side walls at y = ±2, an end wall at x = 8, and a
    /// floor.
    pub fn corridor() -> Self {
        Self {
            panels: vec![
                Panel::new(1, -2.0, [-10.0, -1.7], [10.0, 3.0]),
                Panel::new(1, 2.0, [-10.0, -1.7], [10.0, 3.0]),
                Panel::new(0, 8.0, [-2.0, -1.7], [2.0, 3.0]),
                Panel::new(2, -1.7, [-10.0, -2.0], [10.0, 2.0]),
            ],
        }
    }

    /// Off-center rectangular room with a floor; asymmetric so that no
    /// rotation maps it onto itself.
    pub fn room() -> Self {
        Self {
            panels: vec![
                Panel::new(0, 5.0, [-2.0, -1.7], [4.0, 2.0]),
                Panel::new(0, -3.0, [-2.0, -1.7], [4.0, 2.0]),
                Panel::new(1, 4.0, [-3.0, -1.7], [5.0, 2.0]),
                Panel::new(1, -2.0, [-3.0, -1.7], [5.0, 2.0]),
                Panel::new(2, -1.7, [-3.0, -2.0], [5.0, 4.0]),
            ],
        }
    }

    /// Long corridor along x with crossing pillar faces every 5 m, so that
    /// forward motion stays observable along the whole run.
    pub fn long_corridor() -> Self {
        let mut panels = vec![
            Panel::new(1, -2.0, [-10.0, -1.7], [70.0, 3.0]),
            Panel::new(1, 2.0, [-10.0, -1.7], [70.0, 3.0]),
            Panel::new(2, -1.7, [-10.0, -2.0], [70.0, 2.0]),
            Panel::new(0, 68.0, [-2.0, -1.7], [2.0, 3.0]),
        ];
        for k in 0..14 {
            let x = 5.0 * k as f64;
            let (y_lo, y_hi) = if k % 2 == 0 { (1.1, 2.0) } else { (-2.0, -1.1) };
            panels.push(Panel::new(0, x, [y_lo, -1.7], [y_hi, 1.5]));
        }
        Self { panels }
    }
}

/// Sweep generation parameters.
#[derive(Debug, Clone, Copy)]
pub struct SweepOptions {
    pub n_lasers: usize,
    pub n_azimuth: usize,
    /// Vertical field of view (radians), lowest to highest beam.
    pub vertical_fov: (f64, f64),
    pub max_range: f64,
}

impl SweepOptions {
    /// Fan suited to corridor/room scenes (floor and walls visible).
    pub fn standard() -> Self {
        Self {
            n_lasers: 16,
            n_azimuth: 180,
            vertical_fov: (-25.0_f64.to_radians(), 5.0_f64.to_radians()),
            max_range: 20.0,
        }
    }

    /// Downward fan for ground-only scenes.
    pub fn downward() -> Self {
        Self {
            n_lasers: 16,
            n_azimuth: 720,
            vertical_fov: (-45.0_f64.to_radians(), -10.0_f64.to_radians()),
            max_range: 20.0,
        }
    }

    pub fn azimuth_step(&self) -> f64 {
        std::f64::consts::TAU / self.n_azimuth as f64
    }
}

/// Cast one ray into the scene; returns the nearest hit distance.
fn cast(scene: &Scene, origin: &Vector3<f64>, dir: &Vector3<f64>, max_range: f64) -> Option<f64> {
    let mut best: Option<f64> = None;
    for panel in &scene.panels {
        let d_axis = dir[panel.axis];
        if d_axis.abs() < 1e-12 {
            continue;
        }
        let t = (panel.offset - origin[panel.axis]) / d_axis;
        if t < 0.2 || t > max_range {
            continue;
        }
        let hit = origin + dir * t;
        let others: [usize; 2] = match panel.axis {
            0 => [1, 2],
            1 => [0, 2],
            _ => [0, 1],
        };
        let inside = (0..2).all(|i| hit[others[i]] >= panel.min[i] && hit[others[i]] <= panel.max[i]);
        if inside && best.map_or(true, |b| t < b) {
            best = Some(t);
        }
    }
    best
}

/// Generate one sweep.
///
/// The sensor sits at `sensor_pos` (no sensor rotation); the scene may be
/// yawed about the world origin by `scene_yaw`. Points are returned in the
/// sensor frame with `rel_time = 1.0`.
pub fn generate_sweep(
    scene: &Scene,
    sensor_pos: Vector3<f64>,
    scene_yaw: f64,
    opts: &SweepOptions,
) -> Vec<LidarPoint> {
    let rot = Rotation3::from_axis_angle(&Vector3::z_axis(), scene_yaw);
    let inv = rot.inverse();
    let origin_c = inv * sensor_pos;

    let mut cloud = Vec::new();
    let (fov_lo, fov_hi) = opts.vertical_fov;
    for laser in 0..opts.n_lasers {
        let elevation = if opts.n_lasers > 1 {
            fov_lo + (fov_hi - fov_lo) * laser as f64 / (opts.n_lasers - 1) as f64
        } else {
            fov_lo
        };
        let (sin_e, cos_e) = elevation.sin_cos();
        for step in 0..opts.n_azimuth {
            let azimuth = step as f64 * opts.azimuth_step();
            let (sin_a, cos_a) = azimuth.sin_cos();
            let dir = Vector3::new(cos_e * cos_a, cos_e * sin_a, sin_e);
            let dir_c = inv * dir;
            if let Some(t) = cast(scene, &origin_c, &dir_c, opts.max_range) {
                let hit_world = rot * (origin_c + dir_c * t);
                let p = hit_world - sensor_pos;
                cloud.push(LidarPoint::new(
                    p.x,
                    p.y,
                    p.z,
                    1.0,
                    laser as u16,
                    1.0,
                ));
            }
        }
    }
    cloud
}

/// Add uniform per-axis jitter to a cloud, reproducibly.
pub fn jitter(cloud: &[LidarPoint], sigma: f64, seed: u64) -> Vec<LidarPoint> {
    use rand::{rngs::StdRng, Rng, SeedableRng};
    let mut rng = StdRng::seed_from_u64(seed);
    cloud
        .iter()
        .map(|p| {
            let mut q = *p;
            q.x += rng.gen_range(-sigma..sigma);
            q.y += rng.gen_range(-sigma..sigma);
            q.z += rng.gen_range(-sigma..sigma);
            q
        })
        .collect()
}

/// Configuration tuned for the coarse synthetic fans above.
pub fn test_config(opts: &SweepOptions) -> SlamConfig {
    let matcher = MatcherConfig {
        max_iterations: 25,
        icp_frequency: 4,
        line_k: 5,
        plane_k: 5,
        line_factor: 5.0,
        plane_factor_1: 5.0,
        plane_factor_2: 25.0,
        max_line_distance: 2.0,
        max_plane_distance: 2.0,
        min_residual_distance: 1e-3,
        min_edge_residuals: 10,
        min_planar_residuals: 10,
    };
    SlamConfig {
        keypoints: KeypointConfig {
            min_range: 1.0,
            angle_resolution: opts.azimuth_step(),
            neighbor_width: 4,
            max_edges_per_line: 10,
            max_planars_per_line: 30,
            edge_threshold: 1e-4,
            plane_threshold: 5e-5,
        },
        ego_motion: matcher.clone(),
        mapping: matcher,
        grid: RollingGridConfig {
            voxel_size: 1.0,
            grid_nb_voxel: [45, 45, 45],
            pointcloud_nb_voxel: [5, 5, 5],
            leaf_voxel_size: 0.15,
        },
        max_dist_between_frames: 3.0,
        warm_start: true,
        debug_export: false,
    }
}

/// A calibrated pipeline ready for the synthetic sweeps.
pub fn make_slam(config: SlamConfig, opts: &SweepOptions) -> LidarSlam {
    let mut slam = LidarSlam::new(config);
    slam.set_calibration(LaserCalibration::identity(opts.n_lasers).unwrap());
    slam
}
