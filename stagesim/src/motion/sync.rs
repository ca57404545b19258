//! Multi-axis waypoint synchronization.
//!
//! The longest segment is the master timeline. It is decimated (every Nth
//! sample, final sample always kept) and every axis is resampled onto the
//! resulting timestamps. Axes that finish early hold their target, axes that
//! never move stay constant, and the final row is each axis's target exactly.

use super::{MotionError, MotionSegment};
use nalgebra::Point3;
use tracing::debug;

/// Per-axis positions on one shared, strictly increasing timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct SynchronizedWaypoints {
    times: Vec<f64>,
    axes: Vec<Vec<f64>>,
}

impl SynchronizedWaypoints {
    /// Number of waypoints (rows).
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn axis_count(&self) -> usize {
        self.axes.len()
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn time(&self, index: usize) -> Option<f64> {
        self.times.get(index).copied()
    }

    /// Positions of one axis across all waypoints.
    pub fn axis(&self, axis: usize) -> Option<&[f64]> {
        self.axes.get(axis).map(Vec::as_slice)
    }

    pub fn position(&self, axis: usize, index: usize) -> Option<f64> {
        self.axes.get(axis)?.get(index).copied()
    }

    /// Row `index` of a three-axis trajectory as a point.
    pub fn point(&self, index: usize) -> Option<Point3<f64>> {
        Some(Point3::new(
            self.position(0, index)?,
            self.position(1, index)?,
            self.position(2, index)?,
        ))
    }

    /// Time of the last waypoint.
    pub fn duration(&self) -> f64 {
        self.times.last().copied().unwrap_or(0.0)
    }
}

/// Resample `segments` onto the decimated timeline of the longest one.
///
/// # Errors
/// - `InvalidDecimation` if `decimation` is 0
/// - `NoMotion` if every segment is empty
pub fn synchronize(
    segments: &[MotionSegment],
    decimation: usize,
) -> Result<SynchronizedWaypoints, MotionError> {
    if decimation == 0 {
        return Err(MotionError::InvalidDecimation);
    }

    let master = segments
        .iter()
        .filter(|s| !s.is_empty())
        .max_by(|a, b| a.duration().total_cmp(&b.duration()))
        .ok_or(MotionError::NoMotion)?;

    let last = master.len() - 1;
    let mut times: Vec<f64> = (0..=last)
        .step_by(decimation)
        .map(|i| master.time_at(i))
        .collect();
    if last % decimation != 0 {
        times.push(master.time_at(last));
    }

    let axes: Vec<Vec<f64>> = segments
        .iter()
        .map(|segment| {
            let mut column: Vec<f64> = times.iter().map(|&t| segment.position_at(t)).collect();
            if let Some(end) = column.last_mut() {
                *end = segment.target();
            }
            column
        })
        .collect();

    debug!(
        "Synchronized {} axes: {} master samples -> {} waypoints over {:.4}s",
        segments.len(),
        master.len(),
        times.len(),
        master.duration()
    );
    Ok(SynchronizedWaypoints { times, axes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::MotionProfiler;

    fn profiler() -> MotionProfiler {
        MotionProfiler::new(1e-4).unwrap()
    }

    #[test]
    fn differing_lengths_share_one_timeline() {
        let p = profiler();
        let segments = vec![
            p.profile(0.0, 500.0, 200.0, 50.0).unwrap(),
            p.profile(10.0, 20.0, 200.0, 50.0).unwrap(),
            p.profile(3.0, 3.0, 20.0, 50.0).unwrap(),
        ];

        let waypoints = synchronize(&segments, 100).unwrap();

        assert_eq!(waypoints.axis_count(), 3);
        for axis in 0..3 {
            assert_eq!(waypoints.axis(axis).unwrap().len(), waypoints.len());
        }
        assert!(waypoints.times().windows(2).all(|w| w[1] > w[0]));
        assert_eq!(waypoints.time(0), Some(0.0));
        assert_eq!(waypoints.duration(), segments[0].duration());

        let end = waypoints.len() - 1;
        assert_eq!(waypoints.point(end), Some(Point3::new(500.0, 20.0, 3.0)));
        // Short axis holds its target once done, idle axis never moves.
        assert!(waypoints.axis(1).unwrap()[end / 2..].iter().all(|&y| y == 20.0));
        assert!(waypoints.axis(2).unwrap().iter().all(|&z| z == 3.0));
    }

    #[test]
    fn final_sample_kept_regardless_of_decimation() {
        let segment = profiler().profile(0.0, 7.3, 200.0, 50.0).unwrap();
        for decimation in [1, 2, 7, 1000, segment.len() + 10] {
            let waypoints = synchronize(std::slice::from_ref(&segment), decimation).unwrap();
            assert_eq!(waypoints.duration(), segment.duration());
            assert_eq!(waypoints.position(0, waypoints.len() - 1), Some(7.3));
        }

        let full = synchronize(std::slice::from_ref(&segment), 1).unwrap();
        assert_eq!(full.len(), segment.len());
    }

    #[test]
    fn all_empty_segments_is_no_motion() {
        let p = profiler();
        let segments = vec![
            p.profile(1.0, 1.0, 10.0, 10.0).unwrap(),
            MotionSegment::stationary(2.0),
        ];
        assert_eq!(synchronize(&segments, 10), Err(MotionError::NoMotion));
        assert_eq!(synchronize(&[], 10), Err(MotionError::NoMotion));
    }

    #[test]
    fn zero_decimation_is_rejected() {
        let segment = profiler().profile(0.0, 1.0, 10.0, 10.0).unwrap();
        assert_eq!(
            synchronize(&[segment], 0),
            Err(MotionError::InvalidDecimation)
        );
    }
}
