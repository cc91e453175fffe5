//! Projections
//!
//! The viewer's projection objects. [`Perspective`] is the default; the
//! viewer falls back to it when its projection is set to `None`. Both
//! projections validate their inputs eagerly and react to viewport changes
//! through [`Projection::set_aspect`].

use glam::Mat4;

use crate::errors::{ArborError, Result};

fn check_positive(name: &str, value: f32) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ArborError::InvalidInput(format!(
            "{name} must be finite and positive, got {value}"
        )));
    }
    Ok(())
}

/// A projection feeding the cull traversal's base projection matrix.
pub trait Projection: std::fmt::Debug {
    /// The 4×4 projection matrix.
    fn matrix(&self) -> Mat4;

    /// Called by the viewer when the viewport aspect ratio changes.
    fn set_aspect(&mut self, aspect: f32);
}

/// Symmetric perspective projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Perspective {
    fov_y_degrees: f32,
    aspect: f32,
    near: f32,
    far: f32,
}

impl Default for Perspective {
    fn default() -> Self {
        Self {
            fov_y_degrees: 45.0,
            aspect: 1.0,
            near: 1.0,
            far: 10_000.0,
        }
    }
}

impl Perspective {
    /// All parameters must be finite and positive, with `near < far`.
    pub fn new(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Result<Self> {
        check_positive("fov", fov_y_degrees)?;
        check_positive("aspect", aspect)?;
        check_positive("near", near)?;
        check_positive("far", far)?;
        if near >= far {
            return Err(ArborError::InvalidInput(format!(
                "near plane {near} must be closer than far plane {far}"
            )));
        }
        Ok(Self {
            fov_y_degrees,
            aspect,
            near,
            far,
        })
    }

    #[must_use]
    pub fn fov_y_degrees(&self) -> f32 {
        self.fov_y_degrees
    }

    #[must_use]
    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    #[must_use]
    pub fn near(&self) -> f32 {
        self.near
    }

    #[must_use]
    pub fn far(&self) -> f32 {
        self.far
    }
}

impl Projection for Perspective {
    fn matrix(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_degrees.to_radians(),
            self.aspect,
            self.near,
            self.far,
        )
    }

    fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }
}

/// Orthographic projection over an explicit box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orthographic {
    left: f32,
    right: f32,
    bottom: f32,
    top: f32,
    near: f32,
    far: f32,
}

impl Orthographic {
    pub fn new(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Result<Self> {
        for (name, value) in [
            ("left", left),
            ("right", right),
            ("bottom", bottom),
            ("top", top),
            ("near", near),
            ("far", far),
        ] {
            if !value.is_finite() {
                return Err(ArborError::InvalidInput(format!(
                    "{name} must be finite, got {value}"
                )));
            }
        }
        if left >= right || bottom >= top {
            return Err(ArborError::InvalidInput(
                "orthographic extents must satisfy left < right and bottom < top".to_string(),
            ));
        }
        if near >= far {
            return Err(ArborError::InvalidInput(format!(
                "near plane {near} must be closer than far plane {far}"
            )));
        }
        Ok(Self {
            left,
            right,
            bottom,
            top,
            near,
            far,
        })
    }
}

impl Projection for Orthographic {
    fn matrix(&self) -> Mat4 {
        Mat4::orthographic_rh(
            self.left,
            self.right,
            self.bottom,
            self.top,
            self.near,
            self.far,
        )
    }

    /// Rescales the horizontal extent around its centre, keeping height.
    fn set_aspect(&mut self, aspect: f32) {
        if !aspect.is_finite() || aspect <= 0.0 {
            return;
        }
        let height = self.top - self.bottom;
        let center = (self.left + self.right) * 0.5;
        let half_width = height * aspect * 0.5;
        self.left = center - half_width;
        self.right = center + half_width;
    }
}
