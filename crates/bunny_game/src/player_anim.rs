//! Bunny animation: the idle/run/jump state machine and the clip registry it
//! plays from.

use std::collections::HashMap;
use std::path::Path;

use bunny_core::animation::{
    load_animation_file, AnimationClip, AnimationFile, AnimationMixer, ClipLookup, Keyframe, Pose,
};
use glam::Vec3;

pub const CLIP_IDLE: &str = "idle";
pub const CLIP_RUN: &str = "run";
pub const CLIP_JUMP: &str = "jump";
/// Shipped with the rig but never entered by the state machine.
pub const CLIP_DIE: &str = "die";

pub const BUILTIN_ANIMATION_ID: &str = "bunny";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerAnimState {
    #[default]
    Idle,
    Running,
    Jumping,
}

impl PlayerAnimState {
    pub fn clip_name(self) -> &'static str {
        match self {
            PlayerAnimState::Idle => CLIP_IDLE,
            PlayerAnimState::Running => CLIP_RUN,
            PlayerAnimState::Jumping => CLIP_JUMP,
        }
    }

    /// A fired jump wins from any state. A jump in progress holds until its
    /// one-shot clip finishes, then movement picks run or idle.
    pub fn update(self, moving: bool, jump_fired: bool, clip_finished: bool) -> Self {
        if jump_fired {
            return PlayerAnimState::Jumping;
        }
        if self == PlayerAnimState::Jumping && !clip_finished {
            return PlayerAnimState::Jumping;
        }
        if moving {
            PlayerAnimState::Running
        } else {
            PlayerAnimState::Idle
        }
    }
}

/// Drives an `AnimationMixer` from the state machine.
#[derive(Debug, Clone)]
pub struct PlayerAnimator {
    state: PlayerAnimState,
    mixer: AnimationMixer,
}

impl Default for PlayerAnimator {
    fn default() -> Self {
        let mut mixer = AnimationMixer::default();
        mixer.play(CLIP_IDLE);
        Self {
            state: PlayerAnimState::Idle,
            mixer,
        }
    }
}

impl PlayerAnimator {
    #[allow(dead_code)]
    pub fn state(&self) -> PlayerAnimState {
        self.state
    }

    pub fn current_clip(&self) -> Option<&str> {
        self.mixer.current_clip()
    }

    /// Advance by wall-clock seconds after resolving the next state.
    pub fn update(
        &mut self,
        moving: bool,
        jump_fired: bool,
        dt_seconds: f64,
        clips: &impl ClipLookup,
    ) {
        let next = self
            .state
            .update(moving, jump_fired, self.mixer.is_finished());
        if jump_fired {
            // A fresh jump restarts the one-shot even mid-air.
            self.mixer.restart(next.clip_name());
        } else if next != self.state {
            self.mixer.play(next.clip_name());
        }
        if next != self.state {
            log::debug!("Bunny animation {:?} -> {:?}", self.state, next);
        }
        self.state = next;
        self.mixer.update(dt_seconds, clips);
    }

    pub fn pose(&self, clips: &impl ClipLookup) -> Pose {
        self.mixer.pose(clips)
    }
}

/// Registry holding animation clips from multiple animation definition files.
///
/// Clips are organized by `animation_id` (from the JSON file) and clip name.
/// `resolve_clip` supports both targeted lookup (with a source id) and
/// global search (first match across all files).
#[derive(Debug, Default)]
pub struct AnimationRegistry {
    /// animation_id -> clip_name -> clip
    clips: HashMap<String, HashMap<String, AnimationClip>>,
}

impl AnimationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the code-defined bunny clips.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.insert_file(builtin_bunny());
        registry
    }

    /// Load an animation file and register its clips under its `animation_id`.
    /// Returns the id that was registered.
    pub fn load_file(&mut self, path: &Path) -> Result<String, String> {
        let file = load_animation_file(path)?;
        let id = file.animation_id.clone();
        self.insert_file(file);
        Ok(id)
    }

    /// Replaces any clips previously registered under the same id.
    pub fn insert_file(&mut self, file: AnimationFile) {
        for required in [CLIP_IDLE, CLIP_RUN, CLIP_JUMP] {
            if !file.clips.contains_key(required) {
                log::warn!(
                    "Animation '{}' has no '{}' clip; the bunny will hold its rest pose there",
                    file.animation_id,
                    required
                );
            }
        }
        self.clips.insert(file.animation_id, file.clips);
    }

    #[allow(dead_code)]
    pub fn remove_file(&mut self, animation_id: &str) {
        self.clips.remove(animation_id);
    }

    pub fn len(&self) -> usize {
        self.clips.values().map(HashMap::len).sum()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve a clip by name. If `source` is given, only search that animation file.
    /// If `source` is None, search all loaded files (first match wins).
    pub fn resolve_clip(&self, source: Option<&str>, name: &str) -> Option<&AnimationClip> {
        if let Some(source_id) = source {
            return self.clips.get(source_id).and_then(|clips| clips.get(name));
        }
        self.clips.values().find_map(|file_clips| file_clips.get(name))
    }
}

impl ClipLookup for AnimationRegistry {
    fn clip(&self, name: &str) -> Option<&AnimationClip> {
        self.resolve_clip(None, name)
    }
}

fn key(time_ms: u64, offset: [f32; 3], scale: [f32; 3], yaw_deg: f32) -> Keyframe {
    Keyframe {
        time_us: time_ms.saturating_mul(1000),
        pose: Pose {
            offset: Vec3::from_array(offset),
            scale: Vec3::from_array(scale),
            yaw: yaw_deg.to_radians(),
        },
    }
}

/// Clips used when `assets/animations/bunny.json` is missing or broken.
pub fn builtin_bunny() -> AnimationFile {
    let clip = |looping: bool, keyframes: Vec<Keyframe>| AnimationClip { keyframes, looping };
    let clips = HashMap::from([
        (
            CLIP_IDLE.to_string(),
            clip(
                true,
                vec![
                    key(0, [0.0; 3], [1.0, 1.0, 1.0], 0.0),
                    key(600, [0.0, -0.02, 0.0], [1.04, 0.96, 1.04], 0.0),
                    key(1200, [0.0; 3], [1.0, 1.0, 1.0], 0.0),
                ],
            ),
        ),
        (
            CLIP_RUN.to_string(),
            clip(
                true,
                vec![
                    key(0, [0.0; 3], [1.08, 0.9, 1.08], 0.0),
                    key(120, [0.0, 0.25, 0.0], [0.94, 1.1, 0.94], 0.0),
                    key(240, [0.0; 3], [1.08, 0.9, 1.08], 0.0),
                ],
            ),
        ),
        (
            CLIP_JUMP.to_string(),
            clip(
                false,
                vec![
                    key(0, [0.0; 3], [1.15, 0.8, 1.15], 0.0),
                    key(100, [0.0; 3], [0.9, 1.2, 0.9], 0.0),
                    key(400, [0.0; 3], [1.0, 1.0, 1.0], 0.0),
                ],
            ),
        ),
        (
            CLIP_DIE.to_string(),
            clip(
                false,
                vec![
                    key(0, [0.0; 3], [1.0, 1.0, 1.0], 0.0),
                    key(500, [0.0, -0.4, 0.0], [1.3, 0.2, 1.3], 90.0),
                ],
            ),
        ),
    ]);
    AnimationFile {
        version: "0.1".to_string(),
        animation_id: BUILTIN_ANIMATION_ID.to_string(),
        clips,
    }
}
