mod mat3;
mod mat4;
mod quat;
mod transform;
mod vec3;

pub use mat3::Mat3;
pub use mat4::Mat4;
pub use quat::Quat;
pub use transform::Transform;
pub use vec3::Vec3;

/// Common math constants
pub mod consts {
    /// A small epsilon value for floating point comparisons
    pub const EPSILON: f32 = 1e-6;

    pub const PI: f32 = std::f32::consts::PI;

    pub const TAU: f32 = std::f32::consts::TAU;

    pub const FRAC_PI_2: f32 = std::f32::consts::FRAC_PI_2;

    pub const FRAC_PI_4: f32 = std::f32::consts::FRAC_PI_4;
}

/// Utility functions
pub mod utils {
    use super::consts::{PI, TAU};

    #[inline]
    pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
        value.max(min).min(max)
    }

    #[inline]
    pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }

    /// Wraps an angle into (-π, π]
    #[inline]
    pub fn normalize_angle(angle: f32) -> f32 {
        let wrapped = (angle + PI).rem_euclid(TAU) - PI;
        if wrapped <= -PI {
            wrapped + TAU
        } else {
            wrapped
        }
    }

    #[inline]
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees.to_radians()
    }

    #[inline]
    pub fn rad_to_deg(radians: f32) -> f32 {
        radians.to_degrees()
    }

}
