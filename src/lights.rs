//! Accumulated light lists.
//!
//! Lights are lists, not single references: every `*_light` call appends
//! until [`LightState::clear`] (the `no_lights` vocabulary call) resets
//! them. The style stack snapshots these lists **by value**, so a pop
//! restores the exact accumulation present at push time.

use glam::Vec3;
use smallvec::SmallVec;

/// Hard cap per light family; the built-in lit shader declares
/// fixed-size uniform arrays of this length.
pub const MAX_LIGHTS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalLight {
    pub color: Vec3,
    pub specular: Vec3,
    pub direction: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointLight {
    pub color: Vec3,
    pub specular: Vec3,
    pub position: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpotLight {
    pub color: Vec3,
    pub specular: Vec3,
    pub position: Vec3,
    pub direction: Vec3,
    /// Cone half-angle in radians.
    pub angle: f32,
    /// Falloff exponent inside the cone.
    pub concentration: f32,
}

/// All lights accumulated since the last clear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightState {
    pub ambient: SmallVec<[Vec3; MAX_LIGHTS]>,
    pub directional: SmallVec<[DirectionalLight; MAX_LIGHTS]>,
    pub point: SmallVec<[PointLight; MAX_LIGHTS]>,
    pub spot: SmallVec<[SpotLight; MAX_LIGHTS]>,
}

impl LightState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True if any light has been added; drives lit-shader selection.
    #[must_use]
    pub fn any(&self) -> bool {
        !(self.ambient.is_empty()
            && self.directional.is_empty()
            && self.point.is_empty()
            && self.spot.is_empty())
    }

    pub fn add_ambient(&mut self, color: Vec3) {
        if self.ambient.len() >= MAX_LIGHTS {
            log::warn!("ambient light limit ({MAX_LIGHTS}) reached, ignoring");
            return;
        }
        self.ambient.push(color);
    }

    pub fn add_directional(&mut self, light: DirectionalLight) {
        if self.directional.len() >= MAX_LIGHTS {
            log::warn!("directional light limit ({MAX_LIGHTS}) reached, ignoring");
            return;
        }
        self.directional.push(light);
    }

    pub fn add_point(&mut self, light: PointLight) {
        if self.point.len() >= MAX_LIGHTS {
            log::warn!("point light limit ({MAX_LIGHTS}) reached, ignoring");
            return;
        }
        self.point.push(light);
    }

    pub fn add_spot(&mut self, light: SpotLight) {
        if self.spot.len() >= MAX_LIGHTS {
            log::warn!("spot light limit ({MAX_LIGHTS}) reached, ignoring");
            return;
        }
        self.spot.push(light);
    }

    /// Drop every accumulated light.
    pub fn clear(&mut self) {
        self.ambient.clear();
        self.directional.clear();
        self.point.clear();
        self.spot.clear();
    }
}
