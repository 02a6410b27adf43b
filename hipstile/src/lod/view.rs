//! Viewing context used to cull tiles and size them on screen.

use glam::{DMat3, DVec3};

use crate::healpix::{angle_between, Footprint};
use crate::properties::Frame;

/// What the render traversal needs to know about the current view.
pub trait ViewContext {
    /// Screen pixels per radian of sky at the view center.
    fn pixels_per_radian(&self) -> f64;

    /// Horizontal field of view in radians.
    fn fov(&self) -> f64;

    /// Whether any part of a tile footprint can be on screen.
    fn is_visible(&self, footprint: &Footprint) -> bool;
}

/// Pinhole view around a direction, expressed in the survey's frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimpleView {
    direction: DVec3,
    fov: f64,
    width: u32,
    height: u32,
}

impl SimpleView {
    /// `fov` is the horizontal field of view in radians; `width` and
    /// `height` are the viewport size in pixels.
    pub fn new(direction: DVec3, fov: f64, width: u32, height: u32) -> Self {
        Self {
            direction: direction.normalize_or_zero(),
            fov,
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn direction(&self) -> DVec3 {
        self.direction
    }

    /// Angular radius of the circle enclosing the viewport.
    fn half_diagonal(&self) -> f64 {
        let aspect = self.height as f64 / self.width as f64;
        (self.fov * 0.5 * (1.0 + aspect * aspect).sqrt()).min(std::f64::consts::PI)
    }
}

impl ViewContext for SimpleView {
    fn pixels_per_radian(&self) -> f64 {
        self.width as f64 / self.fov.max(f64::EPSILON)
    }

    fn fov(&self) -> f64 {
        self.fov
    }

    fn is_visible(&self, footprint: &Footprint) -> bool {
        if self.direction == DVec3::ZERO {
            return true;
        }
        angle_between(footprint.center, self.direction) <= self.half_diagonal() + footprint.radius
    }
}

/// Every tile is visible; used to plan whole-sky loads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FullSkyView {
    pub pixels_per_radian: f64,
}

impl ViewContext for FullSkyView {
    fn pixels_per_radian(&self) -> f64 {
        self.pixels_per_radian
    }

    fn fov(&self) -> f64 {
        std::f64::consts::TAU
    }

    fn is_visible(&self, _footprint: &Footprint) -> bool {
        true
    }
}

/// Unit vector for equatorial coordinates given in degrees.
pub fn radec_to_vec(ra_deg: f64, dec_deg: f64) -> DVec3 {
    let (ra, dec) = (ra_deg.to_radians(), dec_deg.to_radians());
    DVec3::new(dec.cos() * ra.cos(), dec.cos() * ra.sin(), dec.sin())
}

/// ICRS to galactic rotation, listed column by column: each line is one
/// ICRS axis expressed in galactic coordinates.
const ICRS_TO_GALACTIC: DMat3 = DMat3::from_cols_array(&[
    -0.054_875_539_390, 0.494_109_453_633, -0.867_666_135_681,
    -0.873_437_104_725, -0.444_829_594_298, -0.198_076_389_622,
    -0.483_834_991_775, 0.746_982_248_696, 0.455_983_794_523,
]);

/// Express an ICRS direction in a survey frame.
///
/// The observed frame depends on the observer's location and time, so it
/// is returned unchanged; callers rendering horizontal surveys pass
/// directions already in that frame.
pub fn icrs_to_frame(frame: Frame, direction: DVec3) -> DVec3 {
    match frame {
        Frame::Icrs | Frame::Observed => direction,
        Frame::Galactic => ICRS_TO_GALACTIC * direction,
    }
}
