use bunny_core::input::{InputState, Key};
use glam::Vec3;

use crate::arena::MovementSpec;

/// Directional intent, one flag per arrow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveKeys {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl MoveKeys {
    /// Arrow keys and WASD are interchangeable.
    pub fn from_input(input: &InputState) -> Self {
        Self {
            up: input.any_held(&[Key::Up, Key::W]),
            down: input.any_held(&[Key::Down, Key::S]),
            left: input.any_held(&[Key::Left, Key::A]),
            right: input.any_held(&[Key::Right, Key::D]),
        }
    }

    /// True when the held keys produce a non-zero planar direction.
    pub fn is_moving(self) -> bool {
        self.up != self.down || self.left != self.right
    }
}

/// Up walks away from the camera (-Z), right walks +X. Opposite keys cancel.
/// Diagonals are deliberately not normalised, so they run faster than `speed`.
pub fn planar_velocity(keys: MoveKeys, speed: f32) -> Vec3 {
    let axis = |positive: bool, negative: bool| match (positive, negative) {
        (true, false) => 1.0,
        (false, true) => -1.0,
        _ => 0.0,
    };
    Vec3::new(
        axis(keys.right, keys.left) * speed,
        0.0,
        axis(keys.down, keys.up) * speed,
    )
}

/// Edge-triggered jump latch: a press fires once, and only a release re-arms it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpGuard {
    pub can_jump: bool,
}

impl Default for JumpGuard {
    fn default() -> Self {
        Self { can_jump: true }
    }
}

impl JumpGuard {
    pub fn on_key_down(&mut self) -> bool {
        if self.can_jump {
            self.can_jump = false;
            true
        } else {
            false
        }
    }

    pub fn on_key_up(&mut self) {
        self.can_jump = true;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerInput {
    pub keys: MoveKeys,
    pub jump_pressed: bool,
    pub jump_released: bool,
}

impl ControllerInput {
    /// Reads held movement keys and, when `with_edges`, the jump edges.
    /// Only the first fixed step of a frame should see the edges; later steps
    /// in the same frame would otherwise replay a press-release pair.
    pub fn from_input(input: &InputState, with_edges: bool) -> Self {
        Self {
            keys: MoveKeys::from_input(input),
            jump_pressed: with_edges && input.is_just_pressed(Key::Space),
            jump_released: with_edges && input.is_just_released(Key::Space),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerConfig {
    pub speed: f32,
    pub jump_speed: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::from(&MovementSpec::default())
    }
}

impl From<&MovementSpec> for ControllerConfig {
    fn from(spec: &MovementSpec) -> Self {
        Self {
            speed: spec.speed,
            jump_speed: spec.jump_speed,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlayerController {
    pub config: ControllerConfig,
    pub jump: JumpGuard,
    jumped: bool,
}

impl PlayerController {
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Target velocity for the next physics step. Gravity keeps owning the
    /// vertical axis unless a jump fires this step.
    pub fn step(&mut self, input: ControllerInput, current_velocity: Vec3) -> Vec3 {
        let mut velocity = planar_velocity(input.keys, self.config.speed);
        velocity.y = current_velocity.y;

        // Press before release so a tap that lands inside one frame still jumps.
        self.jumped = input.jump_pressed && self.jump.on_key_down();
        if self.jumped {
            velocity.y = self.config.jump_speed;
        }
        if input.jump_released {
            self.jump.on_key_up();
        }
        velocity
    }

    /// Re-arms the jump outside of a step, for releases the simulation never
    /// sees (focus loss, paused frames).
    pub fn release_jump(&mut self) {
        self.jump.on_key_up();
    }

    /// Whether the last `step` fired a jump.
    pub fn jumped(&self) -> bool {
        self.jumped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(up: bool, down: bool, left: bool, right: bool) -> MoveKeys {
        MoveKeys {
            up,
            down,
            left,
            right,
        }
    }

    #[test]
    fn each_arrow_maps_to_one_axis() {
        assert_eq!(planar_velocity(keys(true, false, false, false), 6.0), Vec3::new(0.0, 0.0, -6.0));
        assert_eq!(planar_velocity(keys(false, true, false, false), 6.0), Vec3::new(0.0, 0.0, 6.0));
        assert_eq!(planar_velocity(keys(false, false, true, false), 6.0), Vec3::new(-6.0, 0.0, 0.0));
        assert_eq!(planar_velocity(keys(false, false, false, true), 6.0), Vec3::new(6.0, 0.0, 0.0));
    }

    #[test]
    fn opposite_keys_cancel() {
        assert_eq!(planar_velocity(keys(true, true, false, false), 6.0), Vec3::ZERO);
        assert_eq!(planar_velocity(keys(true, true, true, true), 6.0), Vec3::ZERO);
        assert!(!keys(true, true, true, true).is_moving());
        assert!(!MoveKeys::default().is_moving());
    }

    #[test]
    fn diagonals_are_not_normalised() {
        let v = planar_velocity(keys(true, false, false, true), 6.0);
        assert_eq!(v, Vec3::new(6.0, 0.0, -6.0));
        assert!(keys(true, false, false, true).is_moving());
    }

    #[test]
    fn wasd_matches_arrows() {
        let mut input = InputState::new();
        input.key_down(Key::W);
        input.key_down(Key::Right);
        let from_input = MoveKeys::from_input(&input);
        assert_eq!(from_input, keys(true, false, false, true));
    }

    #[test]
    fn jump_guard_fires_once_per_press() {
        let mut guard = JumpGuard::default();
        assert!(guard.on_key_down());
        assert!(!guard.on_key_down(), "held key must not refire");
        guard.on_key_up();
        assert!(guard.on_key_down());
    }

    #[test]
    fn controller_keeps_vertical_velocity_and_replaces_planar() {
        let mut controller = PlayerController::new(ControllerConfig::default());
        let input = ControllerInput {
            keys: keys(false, false, true, false),
            ..ControllerInput::default()
        };
        let v = controller.step(input, Vec3::new(3.0, -2.0, 4.0));
        assert_eq!(v, Vec3::new(-6.0, -2.0, 0.0));
        assert!(!controller.jumped());
    }

    #[test]
    fn jump_sets_vertical_speed_until_release() {
        let mut controller = PlayerController::new(ControllerConfig::default());
        let press = ControllerInput {
            jump_pressed: true,
            ..ControllerInput::default()
        };

        let v = controller.step(press, Vec3::ZERO);
        assert_eq!(v.y, 5.0);
        assert!(controller.jumped());

        let v = controller.step(press, Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(v.y, 1.0, "second press without release is ignored");
        assert!(!controller.jumped());

        let release = ControllerInput {
            jump_released: true,
            ..ControllerInput::default()
        };
        controller.step(release, Vec3::ZERO);
        assert!(controller.jump.can_jump);
        controller.step(press, Vec3::ZERO);
        assert!(controller.jumped());
    }

    #[test]
    fn tap_within_one_step_jumps_and_rearms() {
        let mut controller = PlayerController::new(ControllerConfig::default());
        let tap = ControllerInput {
            jump_pressed: true,
            jump_released: true,
            ..ControllerInput::default()
        };
        let v = controller.step(tap, Vec3::ZERO);
        assert_eq!(v.y, 5.0);
        assert!(controller.jump.can_jump);
    }

    #[test]
    fn focus_loss_while_holding_jump_rearms_the_guard() {
        let mut input = InputState::new();
        let mut controller = PlayerController::new(ControllerConfig::default());
        input.key_down(Key::Space);
        controller.step(ControllerInput::from_input(&input, true), Vec3::ZERO);
        assert!(controller.jumped());
        input.end_frame();

        input.release_all();
        controller.step(ControllerInput::from_input(&input, true), Vec3::ZERO);
        input.end_frame();

        input.key_down(Key::Space);
        controller.step(ControllerInput::from_input(&input, true), Vec3::ZERO);
        assert!(controller.jumped(), "fresh press after refocus jumps");
    }

    #[test]
    fn release_jump_rearms_without_a_step() {
        let mut controller = PlayerController::new(ControllerConfig::default());
        let press = ControllerInput {
            jump_pressed: true,
            ..ControllerInput::default()
        };
        controller.step(press, Vec3::ZERO);
        assert!(!controller.jump.can_jump);
        controller.release_jump();
        controller.step(press, Vec3::ZERO);
        assert!(controller.jumped());
    }

    #[test]
    fn jump_edges_only_reach_the_first_step_of_a_frame() {
        let mut input = InputState::new();
        input.key_down(Key::Space);
        assert!(ControllerInput::from_input(&input, true).jump_pressed);
        assert!(!ControllerInput::from_input(&input, false).jump_pressed);
    }
}
