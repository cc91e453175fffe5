use glam::{Vec3, Vec4};

/// Plane in constant-normal form: `normal · p + distance = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub distance: f32,
}

impl Plane {
    #[must_use]
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal, distance }
    }

    /// Plane through `point` with the given normal. The normal is
    /// normalised when its length allows it.
    #[must_use]
    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        let n = normal.normalize_or_zero();
        Self {
            normal: n,
            distance: -n.dot(point),
        }
    }

    /// Plane through three counter-clockwise points.
    #[must_use]
    pub fn from_points(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self::from_point_normal(a, (b - a).cross(c - a))
    }

    /// Plane from homogeneous coefficients `(a, b, c, d)`, normalised when
    /// the normal length allows it.
    #[must_use]
    pub fn from_vec4(v: Vec4) -> Self {
        let normal = Vec3::new(v.x, v.y, v.z);
        let length = normal.length();
        if length > 1e-6 {
            Self {
                normal: normal / length,
                distance: v.w / length,
            }
        } else {
            Self {
                normal: Vec3::ZERO,
                distance: v.w,
            }
        }
    }

    /// Signed distance from `point` to the plane. Positive on the side the
    /// normal points towards.
    #[must_use]
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }
}
