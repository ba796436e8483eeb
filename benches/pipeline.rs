//! Criterion benchmarks: keypoint extraction and frame-to-frame alignment.

use criterion::{criterion_group, criterion_main, Criterion};

use gati_slam::{LaserCalibration, LidarPoint, LidarSlam, SlamConfig};

/// Box room sampled with a 16-beam fan, stamped at sweep end.
fn synthetic_sweep(shift_x: f64) -> Vec<LidarPoint> {
    let n_lasers = 16;
    let n_azimuth = 360;
    let mut cloud = Vec::with_capacity(n_lasers * n_azimuth);
    for laser in 0..n_lasers {
        let elevation = (-25.0 + 2.0 * laser as f64).to_radians();
        let (sin_e, cos_e) = elevation.sin_cos();
        for step in 0..n_azimuth {
            let azimuth = (step as f64) * std::f64::consts::TAU / n_azimuth as f64;
            let (sin_a, cos_a) = azimuth.sin_cos();
            let dir = [cos_e * cos_a, cos_e * sin_a, sin_e];

            // Nearest of the four walls and the floor.
            let mut t = f64::MAX;
            for (axis, offset) in [(0usize, 6.0), (0, -6.0), (1, 4.0), (1, -4.0), (2, -1.7)] {
                let d = dir[axis];
                if d.abs() < 1e-9 {
                    continue;
                }
                let candidate = offset / d;
                if candidate > 0.5 && candidate < t {
                    t = candidate;
                }
            }
            if t < 30.0 {
                cloud.push(LidarPoint::new(
                    dir[0] * t + shift_x,
                    dir[1] * t,
                    dir[2] * t,
                    1.0,
                    laser as u16,
                    1.0,
                ));
            }
        }
    }
    cloud
}

fn bench_keypoint_extraction(c: &mut Criterion) {
    let mut slam = LidarSlam::new(SlamConfig::default());
    slam.set_calibration(LaserCalibration::identity(16).unwrap());
    let sweep = synthetic_sweep(0.0);

    c.bench_function("keypoint_extraction", |b| {
        b.iter(|| {
            let (keypoints, _) = slam.extract_keypoints_only(std::hint::black_box(&sweep)).unwrap();
            std::hint::black_box(keypoints.planars.len())
        })
    });
}

fn bench_frame_alignment(c: &mut Criterion) {
    let first = synthetic_sweep(0.0);
    let second = synthetic_sweep(0.3);

    c.bench_function("frame_alignment", |b| {
        b.iter(|| {
            let mut slam = LidarSlam::new(SlamConfig::default());
            slam.set_calibration(LaserCalibration::identity(16).unwrap());
            slam.add_frame(std::hint::black_box(&first)).unwrap();
            let result = slam.add_frame(std::hint::black_box(&second)).unwrap();
            std::hint::black_box(result.t_rel)
        })
    });
}

criterion_group!(benches, bench_keypoint_extraction, bench_frame_alignment);
criterion_main!(benches);
