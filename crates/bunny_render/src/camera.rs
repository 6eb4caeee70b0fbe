use glam::{Mat4, Vec3};

use crate::lighting::Lighting;

/// Per-frame uniform block shared by every draw.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniform {
    pub view_proj: [[f32; 4]; 4],
    /// rgb = ambient colour * intensity
    pub ambient: [f32; 4],
    /// xyz = light position, w = cosine of the cone half-angle
    pub light_position: [f32; 4],
    /// xyz = cone axis, w = distance decay exponent
    pub light_direction: [f32; 4],
    /// rgb = light colour * intensity
    pub light_color: [f32; 4],
}

impl FrameUniform {
    pub fn new(camera: &FollowCamera, lighting: &Lighting) -> Self {
        let mut uniform = lighting.to_uniform();
        uniform.view_proj = camera.view_projection().to_cols_array_2d();
        uniform
    }
}

/// Perspective camera trailing a target at a fixed height and distance.
#[derive(Debug, Clone)]
pub struct FollowCamera {
    pub eye: Vec3,
    pub target: Vec3,
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub height: f32,
    pub distance: f32,
}

impl FollowCamera {
    pub fn new(viewport_width: u32, viewport_height: u32) -> Self {
        let mut camera = Self {
            eye: Vec3::new(0.0, 2.0, 5.0),
            target: Vec3::ZERO,
            fov_y: 75.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
            height: 2.0,
            distance: 5.0,
        };
        camera.set_viewport(viewport_width, viewport_height);
        camera
    }

    /// Keeps the previous aspect while the window is minimised.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn follow(&mut self, target: Vec3) {
        self.target = target;
        self.eye = target + Vec3::new(0.0, self.height, self.distance);
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follow_places_eye_above_and_behind() {
        let mut camera = FollowCamera::new(800, 600);
        camera.follow(Vec3::new(3.0, 0.5, -4.0));
        assert_eq!(camera.eye, Vec3::new(3.0, 2.5, 1.0));
        assert_eq!(camera.target, Vec3::new(3.0, 0.5, -4.0));
    }

    #[test]
    fn target_projects_to_screen_centre() {
        let mut camera = FollowCamera::new(1280, 720);
        camera.follow(Vec3::new(10.0, 0.5, -20.0));
        let clip = camera.view_projection() * camera.target.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-4);
        assert!(ndc.y.abs() < 1e-4);
        assert!((0.0..=1.0).contains(&ndc.z));
    }

    #[test]
    fn viewport_updates_aspect_and_ignores_zero() {
        let mut camera = FollowCamera::new(800, 400);
        assert!((camera.aspect - 2.0).abs() < 1e-6);
        camera.set_viewport(0, 600);
        assert!((camera.aspect - 2.0).abs() < 1e-6);
        camera.set_viewport(600, 600);
        assert!((camera.aspect - 1.0).abs() < 1e-6);
    }

    #[test]
    fn frame_uniform_carries_view_projection() {
        let mut camera = FollowCamera::new(640, 480);
        camera.follow(Vec3::ZERO);
        let uniform = FrameUniform::new(&camera, &Lighting::default());
        assert_eq!(
            uniform.view_proj,
            camera.view_projection().to_cols_array_2d()
        );
    }
}
