use glam::Vec3;

use crate::camera::FrameUniform;
use crate::color::color_from_hex;

/// Ambient fill plus one spot light aimed at a target.
#[derive(Debug, Clone, PartialEq)]
pub struct Lighting {
    pub ambient_color: u32,
    pub ambient_intensity: f32,
    pub spot_color: u32,
    pub spot_intensity: f32,
    pub spot_position: Vec3,
    pub spot_target: Vec3,
    /// Cone half-angle in radians.
    pub spot_angle: f32,
    /// Distance falloff exponent; 0 disables attenuation.
    pub spot_decay: f32,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            ambient_color: 0x404040,
            ambient_intensity: 5.0,
            spot_color: 0xffffff,
            spot_intensity: 10.0,
            spot_position: Vec3::new(2.0, 2.0, 2.0),
            spot_target: Vec3::ZERO,
            spot_angle: std::f32::consts::FRAC_PI_3,
            spot_decay: 2.0,
        }
    }
}

impl Lighting {
    /// Lighting terms of the frame uniform; `view_proj` is left as identity.
    pub fn to_uniform(&self) -> FrameUniform {
        let scaled = |hex: u32, intensity: f32| {
            let [r, g, b, _] = color_from_hex(hex);
            [r * intensity, g * intensity, b * intensity, 1.0]
        };
        let axis = (self.spot_target - self.spot_position).normalize_or(Vec3::NEG_Y);
        FrameUniform {
            view_proj: glam::Mat4::IDENTITY.to_cols_array_2d(),
            ambient: scaled(self.ambient_color, self.ambient_intensity),
            light_position: self.spot_position.extend(self.spot_angle.cos()).to_array(),
            light_direction: axis.extend(self.spot_decay).to_array(),
            light_color: scaled(self.spot_color, self.spot_intensity),
        }
    }
}
