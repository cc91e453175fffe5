use glam::{Mat4, Vec3};

use crate::math::line::Line;

/// Axis-aligned bounding box.
///
/// A box starts out *invalid* (inverted infinite extents). Growing an
/// invalid box by a single point collapses it to that point; growing by
/// further points expands the extents componentwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::invalid()
    }
}

impl BoundingBox {
    /// An inverted box that contains nothing.
    #[must_use]
    pub fn invalid() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    #[must_use]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// `true` when the box contains at least one point.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    /// Expands the box to contain `point`.
    pub fn grow_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Expands the box to contain `other`.
    pub fn grow_box(&mut self, other: &BoundingBox) {
        if other.is_valid() {
            self.min = self.min.min(other.min);
            self.max = self.max.max(other.max);
        }
    }

    #[must_use]
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[must_use]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Half the diagonal, i.e. the radius of the tightest enclosing sphere
    /// centered on [`center`](Self::center).
    #[must_use]
    pub fn radius(&self) -> f32 {
        self.size().length() * 0.5
    }

    /// Inclusive containment test.
    #[must_use]
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Transforms all eight corners and returns their axis-aligned bounds.
    #[must_use]
    pub fn transform(&self, matrix: &Mat4) -> Self {
        if !self.is_valid() {
            return *self;
        }

        let corners = [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ];

        let mut out = Self::invalid();
        for corner in corners {
            out.grow_point(matrix.project_point3(corner));
        }
        out
    }
}

/// Bounding sphere.
///
/// Starts out *invalid* (negative radius). `contains_point` is exact;
/// `intersects_line` is a conservative broad-phase test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Default for BoundingSphere {
    fn default() -> Self {
        Self::invalid()
    }
}

impl BoundingSphere {
    /// A sphere that contains nothing.
    #[must_use]
    pub fn invalid() -> Self {
        Self {
            center: Vec3::ZERO,
            radius: -1.0,
        }
    }

    #[must_use]
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.radius >= 0.0
    }

    /// Tightest sphere centered on the box center.
    #[must_use]
    pub fn from_box(bbox: &BoundingBox) -> Self {
        if !bbox.is_valid() {
            return Self::invalid();
        }
        Self {
            center: bbox.center(),
            radius: bbox.radius(),
        }
    }

    /// The sphere's axis-aligned bounds.
    #[must_use]
    pub fn to_box(&self) -> BoundingBox {
        if !self.is_valid() {
            return BoundingBox::invalid();
        }
        BoundingBox {
            min: self.center - Vec3::splat(self.radius),
            max: self.center + Vec3::splat(self.radius),
        }
    }

    /// Exact containment: `|P − C|² ≤ R²`.
    #[must_use]
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.is_valid() && point.distance_squared(self.center) <= self.radius * self.radius
    }

    /// Conservative intersection test against the sphere's axis-aligned
    /// bounds (boundary inclusive), used for broad-phase picking. A segment
    /// that grazes the bounds counts as a hit.
    #[must_use]
    pub fn intersects_line(&self, line: &Line) -> bool {
        if !self.is_valid() {
            return false;
        }

        let bbox = self.to_box();
        let dir = line.end - line.start;

        // Slab test over the segment parameter range [0, 1].
        let mut t_min: f32 = 0.0;
        let mut t_max: f32 = 1.0;

        for axis in 0..3 {
            let origin = line.start[axis];
            let delta = dir[axis];
            let (lo, hi) = (bbox.min[axis], bbox.max[axis]);

            if delta.abs() < f32::EPSILON {
                if origin < lo || origin > hi {
                    return false;
                }
            } else {
                let inv = 1.0 / delta;
                let (t0, t1) = ((lo - origin) * inv, (hi - origin) * inv);
                let (t0, t1) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
                t_min = t_min.max(t0);
                t_max = t_max.min(t1);
                if t_min > t_max {
                    return false;
                }
            }
        }

        true
    }
}
