//! The simulation half of a frame, kept apart from the window and GPU.
//!
//! Order per frame: fixed steps (controller, physics, triggers, sync) for as
//! many slices as the accumulator holds, then the animation mixer and pickup
//! spin by wall-clock delta. Rendering follows in `main`.

use bunny_core::input::InputState;
use bunny_core::time::TimeState;

use crate::controller::ControllerInput;
use crate::player_anim::AnimationRegistry;
use crate::world::GameWorld;

/// Pause and single-step requests, from hotkeys or the stats panel.
#[derive(Debug, Default)]
pub struct SimControl {
    pub paused: bool,
    pub single_step_requested: bool,
}

impl SimControl {
    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
        log::info!(
            "Simulation {}",
            if self.paused { "PAUSED" } else { "RESUMED" }
        );
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
#[allow(dead_code)]
pub struct FrameReport {
    /// Fixed steps that reached the world; paused slices are not counted.
    pub steps_run: u32,
    pub jumps: u32,
    pub collected: Vec<String>,
}

/// Runs one frame of simulation. `time` must already have been advanced
/// for this frame.
pub fn simulate_frame(
    time: &mut TimeState,
    input: &mut InputState,
    world: &mut GameWorld,
    control: &mut SimControl,
    clips: &AnimationRegistry,
) -> FrameReport {
    let dt = time.fixed_dt as f32;
    let mut report = FrameReport::default();

    while time.should_step() {
        // Edges stay visible to every step until `end_frame`, so only the
        // first step of a frame reads them.
        let first_step = time.steps_this_frame == 1;
        let controls = ControllerInput::from_input(input, first_step);

        if control.paused && !control.single_step_requested {
            if controls.jump_released {
                world.release_controls();
            }
            time.discard_backlog();
            break;
        }
        control.single_step_requested = false;

        let step = world.fixed_step(controls, dt);
        report.steps_run += 1;
        if step.jumped {
            report.jumps += 1;
            log::debug!(
                "Bunny jumped on step {} at {:?}",
                time.fixed_step_count,
                world.player_position()
            );
        }
        for id in step.collected {
            log::debug!("Pickup '{id}' collected on step {}", time.fixed_step_count);
            report.collected.push(id);
        }
    }
    time.end_frame();

    if !control.paused {
        world.update_animation(time.real_dt, clips);
        world.spin(time.real_dt as f32);
    }

    // A press landing on a zero-step frame stays pending for the next one.
    if time.steps_this_frame > 0 {
        input.end_frame();
    }
    report
}
