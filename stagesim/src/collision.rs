//! Safety envelopes and pairwise collision detection.
//!
//! A [`CollisionVolume`] is a box kept axis-aligned in the world frame. Stage
//! envelopes are anchored at the fiber tip and stretched away from the chip
//! along their orientation's long axis; the workpiece envelope is the bounding
//! box of the chip's coupling points. Overlap is inclusive: boxes that merely
//! touch collide.

use nalgebra::{Point3, Vector3};
use stagesim_common::stage::config::{EnvelopeConfig, Orientation};
use stagesim_common::stage::types::{Axis, StageId};
use std::fmt;

/// Fiber dimensions plus safety margin, in world units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeExtents {
    pub fiber_diameter: f64,
    pub fiber_length: f64,
    pub safety_distance: f64,
}

impl EnvelopeExtents {
    pub fn new(envelope: &EnvelopeConfig, safety_distance: f64) -> Self {
        Self {
            fiber_diameter: envelope.fiber_diameter,
            fiber_length: envelope.fiber_length,
            safety_distance,
        }
    }

    /// Half sizes of the box for a stage mounted at `orientation`.
    ///
    /// The long side is `fiber_length + 2*safety`, the short side
    /// `fiber_diameter + 2*safety`, the height `fiber_length`.
    pub fn half_extents(&self, orientation: Orientation) -> Vector3<f64> {
        let long = self.fiber_length / 2.0 + self.safety_distance;
        let short = self.fiber_diameter / 2.0 + self.safety_distance;
        let height = self.fiber_length / 2.0;
        match orientation.long_axis() {
            Axis::X => Vector3::new(long, short, height),
            _ => Vector3::new(short, long, height),
        }
    }

    /// Box center relative to the fiber tip.
    pub fn offset(&self, orientation: Orientation) -> Vector3<f64> {
        let mut offset = Vector3::new(0.0, 0.0, self.fiber_length / 2.0);
        offset[orientation.long_axis().index()] =
            orientation.outward_sign() * (self.fiber_length - self.fiber_diameter) / 2.0;
        offset
    }
}

/// Box-shaped safety envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionVolume {
    center: Point3<f64>,
    half_extents: Vector3<f64>,
    /// Center relative to the reference point the volume is positioned by.
    offset: Vector3<f64>,
    /// `None` for an unoriented (workpiece) volume.
    orientation: Option<Orientation>,
}

impl CollisionVolume {
    /// Unoriented box; its reference point is its center.
    pub fn from_center_half_extents(center: Point3<f64>, half_extents: Vector3<f64>) -> Self {
        Self {
            center,
            half_extents: half_extents.abs(),
            offset: Vector3::zeros(),
            orientation: None,
        }
    }

    /// Bounding box of `points` grown by `margin` on every side.
    ///
    /// Returns `None` for an empty point set.
    pub fn from_points<'a, I>(points: I, margin: f64) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point3<f64>>,
    {
        let mut points = points.into_iter();
        let first = *points.next()?;
        let (min, max) = points.fold((first, first), |(min, max), p| {
            (min.inf(p), max.sup(p))
        });
        let half = (max - min) / 2.0 + Vector3::repeat(margin.max(0.0));
        Some(Self::from_center_half_extents(nalgebra::center(&min, &max), half))
    }

    /// Stage envelope for a fiber tip at `tip` mounted at `orientation`.
    pub fn at(tip: Point3<f64>, orientation: Orientation, extents: &EnvelopeExtents) -> Self {
        let offset = extents.offset(orientation);
        Self {
            center: tip + offset,
            half_extents: extents.half_extents(orientation),
            offset,
            orientation: Some(orientation),
        }
    }

    pub fn center(&self) -> Point3<f64> {
        self.center
    }

    pub fn half_extents(&self) -> Vector3<f64> {
        self.half_extents
    }

    pub fn orientation(&self) -> Option<Orientation> {
        self.orientation
    }

    /// Point the volume is positioned by (fiber tip for stage envelopes).
    pub fn reference(&self) -> Point3<f64> {
        self.center - self.offset
    }

    pub fn min(&self) -> Point3<f64> {
        self.center - self.half_extents
    }

    pub fn max(&self) -> Point3<f64> {
        self.center + self.half_extents
    }

    /// Shift by `delta`.
    pub fn translate(&mut self, delta: &Vector3<f64>) {
        self.center += *delta;
    }

    /// Place the reference point at `reference`.
    pub fn reposition(&mut self, reference: Point3<f64>) {
        self.center = reference + self.offset;
    }

    /// Inclusive box overlap; symmetric.
    pub fn intersects(&self, other: &CollisionVolume) -> bool {
        let gap = (self.center - other.center).abs();
        let reach = self.half_extents + other.half_extents;
        gap.x <= reach.x && gap.y <= reach.y && gap.z <= reach.z
    }
}

/// Owner of a collision volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collider {
    Stage(StageId),
    Workpiece,
}

impl fmt::Display for Collider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collider::Stage(id) => write!(f, "{id}"),
            Collider::Workpiece => f.write_str("workpiece"),
        }
    }
}

/// Two overlapping volumes, stored with `a < b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Collision {
    pub a: Collider,
    pub b: Collider,
}

impl Collision {
    pub fn new(a: Collider, b: Collider) -> Self {
        if a <= b { Self { a, b } } else { Self { a: b, b: a } }
    }

    pub fn involves_workpiece(&self) -> bool {
        self.b == Collider::Workpiece
    }

    pub fn is_between_stages(&self) -> bool {
        matches!((self.a, self.b), (Collider::Stage(_), Collider::Stage(_)))
    }
}

impl fmt::Display for Collision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <-> {}", self.a, self.b)
    }
}

/// Test every pair of volumes and return the overlapping pairs, sorted.
pub fn detect_collisions(volumes: &[(Collider, &CollisionVolume)]) -> Vec<Collision> {
    let mut hits = Vec::new();
    for (i, (a, va)) in volumes.iter().enumerate() {
        for (b, vb) in &volumes[i + 1..] {
            if a != b && va.intersects(vb) {
                hits.push(Collision::new(*a, *b));
            }
        }
    }
    hits.sort_unstable();
    hits.dedup();
    hits
}
