//! Small vector and angle helpers shared by the simulation systems.

use glam::Vec2;
use std::f32::consts::{PI, TAU};

/// Vectors shorter than this normalize to zero.
pub const MOVE_EPSILON: f32 = 1e-4;

/// Normalize `v`, or return zero when it is (nearly) zero-length.
#[inline]
pub fn normalize_or_zero(v: Vec2) -> Vec2 {
    let len = v.length();
    if len < MOVE_EPSILON || !len.is_finite() {
        Vec2::ZERO
    } else {
        v / len
    }
}

/// Replace NaN and infinities with zero.
#[inline]
pub fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() { v } else { 0.0 }
}

/// Unit vector for an angle in radians.
#[inline]
pub fn from_angle(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Wrap an angle into `[-PI, PI]`.
#[inline]
pub fn wrap_angle(angle: f32) -> f32 {
    let mut a = angle % TAU;
    if a > PI {
        a -= TAU;
    } else if a < -PI {
        a += TAU;
    }
    a
}

/// Interpolate from one angle toward another along the shorter arc.
#[inline]
pub fn lerp_angle(from: f32, to: f32, t: f32) -> f32 {
    from + wrap_angle(to - from) * t
}

/// Clamp a vector's length to `max`.
#[inline]
pub fn clamp_length(v: Vec2, max: f32) -> Vec2 {
    let len = v.length();
    if len > max && len > 0.0 { v * (max / len) } else { v }
}

/// Perpendicular (counter-clockwise) of `v`.
#[inline]
pub fn perp(v: Vec2) -> Vec2 {
    Vec2::new(-v.y, v.x)
}
