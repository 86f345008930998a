// Point-cloud densification for the floating line model.
//
// Every track point and a share of the interpolated points hang a vertical
// "tail" down to a common floor. Every few tail points carry a small XY
// lattice so the tails read as solid columns once rendered.
use nalgebra::Vector3;

use crate::config::{PointCloudConfig, TailSpacing};
use crate::console_log;
use crate::error::{Result, TrackError};
use crate::models::PointCloudStats;

#[derive(Debug, Clone, Copy)]
struct TailShape {
    points: u32,
    grid_size: u32,
}

/// Number of points one tail emits, lattice points included.
pub fn tail_point_count(tail_points: u32, grid_size: u32, grid_every: u32) -> u64 {
    let grids = (tail_points / grid_every.max(1)) as u64;
    let lattice = (grid_size as u64 * grid_size as u64).saturating_sub(1);
    tail_points as u64 + grids * lattice
}

/// Predict the output size of [`densify`] for a track of `track_len` points.
pub fn expected_point_count(track_len: usize, config: &PointCloudConfig) -> PointCloudStats {
    if track_len == 0 {
        return PointCloudStats {
            track_points: 0,
            interpolated_points: 0,
            tail_points: 0,
            total_points: 0,
        };
    }

    let n = track_len as u64;
    let segments = n - 1;
    let per_segment = config.density_factor.saturating_sub(1) as u64;
    let interpolated = segments.saturating_mul(per_segment);

    let full_tail = tail_point_count(config.tail_points, config.grid_size, config.grid_every);
    let half_tail = tail_point_count(
        config.tail_points / 2,
        config.interp_grid_size,
        config.grid_every,
    );
    let tailed_per_segment = if config.interp_tail_interval == 0 {
        0
    } else {
        per_segment / config.interp_tail_interval as u64
    };

    let tails = n
        .saturating_mul(full_tail)
        .saturating_add(segments.saturating_mul(tailed_per_segment).saturating_mul(half_tail));
    let total = n.saturating_add(interpolated).saturating_add(tails);

    let to_usize = |v: u64| usize::try_from(v).unwrap_or(usize::MAX);
    PointCloudStats {
        track_points: track_len,
        interpolated_points: to_usize(interpolated),
        tail_points: to_usize(tails),
        total_points: to_usize(total),
    }
}

/// Densify a normalized track into an unordered point cloud.
pub fn densify(points: &[Vector3<f64>], config: &PointCloudConfig) -> Result<Vec<Vector3<f64>>> {
    config.validate()?;

    if points.len() < 2 {
        return Err(TrackError::validation(format!(
            "Need at least 2 points to create a point cloud, got {}",
            points.len()
        )));
    }
    if points.iter().any(|p| !p.iter().all(|c| c.is_finite())) {
        return Err(TrackError::validation("Point cloud input contains non-finite coordinates"));
    }

    let stats = expected_point_count(points.len(), config);
    if stats.total_points > config.max_points {
        return Err(TrackError::validation(format!(
            "Track of {} points would produce {} cloud points, above the limit of {}",
            points.len(),
            stats.total_points,
            config.max_points
        )));
    }

    let min_z = points.iter().map(|p| p.z).fold(f64::INFINITY, f64::min);
    let floor = min_z - config.floor_offset;

    let full_tail = TailShape {
        points: config.tail_points,
        grid_size: config.grid_size,
    };
    let half_tail = TailShape {
        points: config.tail_points / 2,
        grid_size: config.interp_grid_size,
    };

    let mut dense = Vec::with_capacity(stats.total_points);
    let steps = config.density_factor;

    for pair in points.windows(2) {
        let (p1, p2) = (pair[0], pair[1]);

        dense.push(p1);
        push_tail(&mut dense, &p1, floor, full_tail, config);

        for j in 1..steps {
            let t = j as f64 / steps as f64;
            let interp = p1 * (1.0 - t) + p2 * t;
            dense.push(interp);

            if config.interp_tail_interval != 0 && j % config.interp_tail_interval == 0 {
                push_tail(&mut dense, &interp, floor, half_tail, config);
            }
        }
    }

    // The loop above only emits the first point of each pair
    if let Some(last) = points.last() {
        dense.push(*last);
        push_tail(&mut dense, last, floor, full_tail, config);
    }

    console_log!(
        "Original points: {}, dense points with tails: {}",
        points.len(),
        dense.len()
    );
    debug_assert_eq!(dense.len(), stats.total_points);

    Ok(dense)
}

fn push_tail(
    dense: &mut Vec<Vector3<f64>>,
    point: &Vector3<f64>,
    floor: f64,
    shape: TailShape,
    config: &PointCloudConfig,
) {
    if shape.points == 0 {
        return;
    }

    let tail_length = point.z - floor;
    let offset = tail_length * config.grid_offset_ratio;
    let half_grid = (shape.grid_size / 2) as i64;

    for j in 1..=shape.points {
        let fraction = tail_fraction(j, shape.points, config.tail_spacing);
        let tail_point = Vector3::new(point.x, point.y, point.z - fraction * tail_length);
        dense.push(tail_point);

        if j % config.grid_every != 0 {
            continue;
        }
        for dx_idx in 0..shape.grid_size as i64 {
            for dy_idx in 0..shape.grid_size as i64 {
                // Centre cell is the tail point itself
                if dx_idx == half_grid && dy_idx == half_grid {
                    continue;
                }
                let dx = offset * (dx_idx - half_grid) as f64;
                let dy = offset * (dy_idx - half_grid) as f64;
                dense.push(Vector3::new(tail_point.x + dx, tail_point.y + dy, tail_point.z));
            }
        }
    }
}

fn tail_fraction(step: u32, total: u32, spacing: TailSpacing) -> f64 {
    let linear = step as f64 / total as f64;
    match spacing {
        TailSpacing::Linear => linear,
        TailSpacing::PowerLaw { exponent } => linear.powf(1.0 / exponent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(n: usize) -> Vec<Vector3<f64>> {
        (0..n)
            .map(|i| Vector3::new(i as f64 * 10.0, (i as f64 * 0.7).sin() * 5.0, i as f64 * 3.0))
            .collect()
    }

    #[test]
    fn tail_counts_include_lattices() {
        // 16 lattices of 9x9 - 1
        assert_eq!(tail_point_count(50, 9, 3), 50 + 16 * 80);
        // 8 lattices of 7x7 - 1
        assert_eq!(tail_point_count(25, 7, 3), 25 + 8 * 48);
        assert_eq!(tail_point_count(0, 9, 3), 0);
    }

    #[test]
    fn two_point_track_has_exact_count() {
        let config = PointCloudConfig::default();
        let dense = densify(&track(2), &config).expect("densify");

        // 2 track points + 4 interpolated + 2 full tails + 4 half tails
        assert_eq!(dense.len(), 2 + 4 + 2 * 1330 + 4 * 409);
        assert_eq!(dense.len(), 4302);
        assert_eq!(expected_point_count(2, &config).total_points, 4302);
    }

    #[test]
    fn five_point_track_has_exact_count() {
        let config = PointCloudConfig::default();
        let dense = densify(&track(5), &config).expect("densify");

        // 5 track points + 16 interpolated + 5 full tails + 16 half tails
        assert_eq!(dense.len(), 5 + 16 + 5 * 1330 + 16 * 409);
        assert_eq!(dense.len(), 13215);

        let stats = expected_point_count(5, &config);
        assert_eq!(stats.track_points, 5);
        assert_eq!(stats.interpolated_points, 16);
        assert_eq!(stats.total_points, 13215);
    }

    #[test]
    fn interp_tail_interval_controls_half_tails() {
        let config = PointCloudConfig {
            interp_tail_interval: 2,
            ..PointCloudConfig::default()
        };
        let dense = densify(&track(3), &config).expect("densify");
        // j = 2 and j = 4 in each of the 2 segments
        assert_eq!(dense.len(), 3 + 8 + 3 * 1330 + 4 * 409);

        let config = PointCloudConfig {
            interp_tail_interval: 0,
            ..PointCloudConfig::default()
        };
        let dense = densify(&track(3), &config).expect("densify");
        assert_eq!(dense.len(), 3 + 8 + 3 * 1330);
    }

    #[test]
    fn without_tails_only_interpolation_remains() {
        let config = PointCloudConfig {
            tail_points: 0,
            density_factor: 10,
            ..PointCloudConfig::default()
        };
        let points = track(4);
        let dense = densify(&points, &config).expect("densify");

        assert_eq!(dense.len(), 4 + 3 * 9);
        assert_eq!(dense[0], points[0]);
        assert_eq!(*dense.last().expect("last point"), points[3]);
        // Halfway along the first segment
        assert!((dense[5] - (points[0] + points[1]) / 2.0).norm() < 1e-9);
    }

    #[test]
    fn tails_reach_the_shared_floor() {
        let config = PointCloudConfig {
            density_factor: 1,
            grid_every: 1_000,
            ..PointCloudConfig::default()
        };
        let points = track(3);
        let dense = densify(&points, &config).expect("densify");

        let floor = 0.0 - config.floor_offset;
        let min_z = dense.iter().map(|p| p.z).fold(f64::INFINITY, f64::min);
        assert!((min_z - floor).abs() < 1e-9);

        // First tail hangs straight below the first point
        let tail = &dense[1..=config.tail_points as usize];
        assert!(tail.iter().all(|p| p.x == points[0].x && p.y == points[0].y));
        assert!((tail.last().expect("tail end").z - floor).abs() < 1e-9);
    }

    #[test]
    fn power_law_packs_points_near_the_top() {
        let linear = tail_fraction(1, 50, TailSpacing::Linear);
        let biased = tail_fraction(1, 50, TailSpacing::power_law());
        assert!(biased < linear);
        assert!((tail_fraction(50, 50, TailSpacing::power_law()) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn lattice_points_stay_close_to_the_tail() {
        let config = PointCloudConfig {
            density_factor: 1,
            tail_points: 3,
            ..PointCloudConfig::default()
        };
        let points = track(2);
        let dense = densify(&points, &config).expect("densify");

        let tail_length = points[0].z - (0.0 - config.floor_offset);
        let max_offset = tail_length * config.grid_offset_ratio * 4.0;
        // point, 3 tail points, 80 lattice points
        for p in &dense[1..84] {
            assert!((p.x - points[0].x).abs() <= max_offset + 1e-9);
            assert!((p.y - points[0].y).abs() <= max_offset + 1e-9);
        }
    }

    #[test]
    fn rejects_short_tracks_and_oversized_clouds() {
        let config = PointCloudConfig::default();
        let err = densify(&track(1), &config).unwrap_err();
        assert_eq!(err.kind(), "validation");

        let config = PointCloudConfig {
            max_points: 1_000,
            ..PointCloudConfig::default()
        };
        let err = densify(&track(2), &config).unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn unbounded_budget_is_refused_before_allocating() {
        let config = PointCloudConfig {
            density_factor: 3_000,
            tail_points: 1_000,
            grid_size: 15,
            max_points: usize::MAX,
            ..PointCloudConfig::default()
        };
        let err = densify(&track(100_000), &config).unwrap_err();
        assert_eq!(err.kind(), "config");

        // Within the ceiling the same knobs trip the point budget instead
        let config = PointCloudConfig {
            max_points: crate::config::MAX_POINTS_LIMIT,
            ..config
        };
        let err = densify(&track(100_000), &config).unwrap_err();
        assert_eq!(err.kind(), "validation");
    }
}
