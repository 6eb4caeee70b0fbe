//! Keyframed transform clips and the mixer that plays them.
//!
//! A clip is a list of keyframes, each a local `Pose` (offset, scale, yaw)
//! relative to the owning body's transform. The mixer advances the current
//! clip by wall-clock time and crossfades from the previous clip when a new one
//! starts, which is how the bunny's idle/run/jump moves blend into each other.
//!
//! Internal timing is integer microseconds so ticking is exact for any
//! sequence of deltas; the JSON format stores `time_ms` for readability.

use glam::Vec3;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub const DEFAULT_FADE_US: u64 = 150_000;

/// Local transform produced by sampling a clip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub offset: Vec3,
    pub scale: Vec3,
    /// Rotation about +Y in radians.
    pub yaw: f32,
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        offset: Vec3::ZERO,
        scale: Vec3::ONE,
        yaw: 0.0,
    };

    pub fn lerp(self, other: Pose, t: f32) -> Pose {
        let t = t.clamp(0.0, 1.0);
        Pose {
            offset: self.offset.lerp(other.offset, t),
            scale: self.scale.lerp(other.scale, t),
            yaw: self.yaw + (other.yaw - self.yaw) * t,
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    pub time_us: u64,
    pub pose: Pose,
}

#[derive(Debug, Clone)]
pub struct AnimationClip {
    pub keyframes: Vec<Keyframe>,
    pub looping: bool,
}

impl AnimationClip {
    /// Time of the last keyframe.
    pub fn duration_us(&self) -> u64 {
        self.keyframes.last().map_or(0, |k| k.time_us)
    }

    /// Linear interpolation between the keyframes bracketing `time_us`.
    /// Times past the end hold the last keyframe.
    pub fn sample(&self, time_us: u64) -> Pose {
        let Some(first) = self.keyframes.first() else {
            return Pose::IDENTITY;
        };
        if time_us <= first.time_us {
            return first.pose;
        }
        for pair in self.keyframes.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if time_us < b.time_us {
                let span = (b.time_us - a.time_us) as f32;
                let t = (time_us - a.time_us) as f32 / span;
                return a.pose.lerp(b.pose, t);
            }
        }
        self.keyframes[self.keyframes.len() - 1].pose
    }
}

/// Anything the mixer can resolve clip names against.
pub trait ClipLookup {
    fn clip(&self, name: &str) -> Option<&AnimationClip>;
}

impl ClipLookup for HashMap<String, AnimationClip> {
    fn clip(&self, name: &str) -> Option<&AnimationClip> {
        self.get(name)
    }
}

/// One playing instance of a clip.
#[derive(Debug, Clone)]
pub struct ClipAction {
    pub clip_name: String,
    pub elapsed_us: u64,
    pub finished: bool,
}

impl ClipAction {
    pub fn new(clip_name: &str) -> Self {
        Self {
            clip_name: clip_name.to_string(),
            elapsed_us: 0,
            finished: false,
        }
    }

    pub fn tick(&mut self, dt_us: u64, clip: &AnimationClip) {
        if self.finished {
            return;
        }
        self.elapsed_us += dt_us;
        let duration = clip.duration_us();
        if self.elapsed_us < duration {
            return;
        }
        if clip.looping && duration > 0 {
            self.elapsed_us %= duration;
        } else {
            self.elapsed_us = duration;
            self.finished = !clip.looping;
        }
    }

    pub fn pose(&self, clip: &AnimationClip) -> Pose {
        clip.sample(self.elapsed_us)
    }
}

/// Plays one clip at a time and crossfades out of the previous one.
#[derive(Debug, Clone)]
pub struct AnimationMixer {
    current: Option<ClipAction>,
    previous: Option<ClipAction>,
    fade_us: u64,
    fade_elapsed_us: u64,
}

impl AnimationMixer {
    pub fn new(fade_us: u64) -> Self {
        Self {
            current: None,
            previous: None,
            fade_us,
            fade_elapsed_us: 0,
        }
    }

    pub fn current_clip(&self) -> Option<&str> {
        self.current.as_ref().map(|a| a.clip_name.as_str())
    }

    pub fn current_action(&self) -> Option<&ClipAction> {
        self.current.as_ref()
    }

    /// True when the current clip is one-shot and has played through.
    pub fn is_finished(&self) -> bool {
        self.current.as_ref().is_some_and(|a| a.finished)
    }

    pub fn is_fading(&self) -> bool {
        self.previous.is_some()
    }

    /// Start `name` unless it is already the current clip.
    pub fn play(&mut self, name: &str) {
        if self.current_clip() == Some(name) {
            return;
        }
        self.restart(name);
    }

    /// Start `name` from zero, fading out whatever was playing.
    pub fn restart(&mut self, name: &str) {
        self.previous = self.current.take();
        self.current = Some(ClipAction::new(name));
        self.fade_elapsed_us = 0;
        if self.fade_us == 0 {
            self.previous = None;
        }
    }

    pub fn stop(&mut self) {
        self.current = None;
        self.previous = None;
    }

    /// Advance by wall-clock seconds.
    pub fn update(&mut self, dt_seconds: f64, clips: &impl ClipLookup) {
        let dt_us = (dt_seconds.max(0.0) * 1_000_000.0).round() as u64;
        for action in [self.current.as_mut(), self.previous.as_mut()]
            .into_iter()
            .flatten()
        {
            match clips.clip(&action.clip_name) {
                Some(clip) => action.tick(dt_us, clip),
                None => log::warn!("Mixer references unknown clip '{}'", action.clip_name),
            }
        }
        if self.previous.is_some() {
            self.fade_elapsed_us += dt_us;
            if self.fade_elapsed_us >= self.fade_us {
                self.previous = None;
            }
        }
    }

    /// Blended pose of the previous and current clip.
    pub fn pose(&self, clips: &impl ClipLookup) -> Pose {
        let sample = |action: &ClipAction| {
            clips
                .clip(&action.clip_name)
                .map_or(Pose::IDENTITY, |clip| action.pose(clip))
        };
        let current = self.current.as_ref().map_or(Pose::IDENTITY, sample);
        match &self.previous {
            Some(prev) if self.fade_us > 0 => {
                let weight = self.fade_elapsed_us as f32 / self.fade_us as f32;
                sample(prev).lerp(current, weight)
            }
            _ => current,
        }
    }
}

impl Default for AnimationMixer {
    fn default() -> Self {
        Self::new(DEFAULT_FADE_US)
    }
}

/// Top-level animation definition file.
#[derive(Debug, Clone)]
pub struct AnimationFile {
    pub version: String,
    pub animation_id: String,
    pub clips: HashMap<String, AnimationClip>,
}

// --- JSON deserialization types (private) ---

#[derive(Debug, Deserialize)]
struct AnimationFileJson {
    version: String,
    animation_id: String,
    clips: HashMap<String, AnimationClipJson>,
}

#[derive(Debug, Deserialize)]
struct AnimationClipJson {
    #[serde(default)]
    looping: bool,
    keyframes: Vec<KeyframeJson>,
}

#[derive(Debug, Deserialize)]
struct KeyframeJson {
    time_ms: u64,
    #[serde(default)]
    offset: [f32; 3],
    #[serde(default = "default_scale")]
    scale: [f32; 3],
    #[serde(default)]
    yaw_deg: f32,
}

pub fn load_animation_file(path: &Path) -> Result<AnimationFile, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read animation file {}: {e}", path.display()))?;
    parse_animation_file(&raw)
        .map_err(|e| format!("Failed to load animation file {}: {e}", path.display()))
}

pub fn parse_animation_file(raw: &str) -> Result<AnimationFile, String> {
    let json: AnimationFileJson =
        serde_json::from_str(raw).map_err(|e| format!("invalid JSON: {e}"))?;
    validate_animation_json(&json)?;

    let clips = json
        .clips
        .into_iter()
        .map(|(name, clip)| {
            let keyframes = clip
                .keyframes
                .into_iter()
                .map(|k| Keyframe {
                    time_us: k.time_ms.saturating_mul(1000),
                    pose: Pose {
                        offset: Vec3::from_array(k.offset),
                        scale: Vec3::from_array(k.scale),
                        yaw: k.yaw_deg.to_radians(),
                    },
                })
                .collect();
            (
                name,
                AnimationClip {
                    keyframes,
                    looping: clip.looping,
                },
            )
        })
        .collect();

    Ok(AnimationFile {
        version: json.version,
        animation_id: json.animation_id,
        clips,
    })
}

fn validate_animation_json(json: &AnimationFileJson) -> Result<(), String> {
    if json.version != "0.1" {
        return Err(format!(
            "Animation validation failed: unsupported version '{}'",
            json.version
        ));
    }
    if json.animation_id.is_empty() {
        return Err("Animation validation failed: animation_id is empty".to_string());
    }
    for (name, clip) in &json.clips {
        let Some(first) = clip.keyframes.first() else {
            return Err(format!(
                "Animation validation failed: clip '{}' has no keyframes",
                name
            ));
        };
        if first.time_ms != 0 {
            return Err(format!(
                "Animation validation failed: clip '{}' must start at 0 ms",
                name
            ));
        }
        for (i, pair) in clip.keyframes.windows(2).enumerate() {
            if pair[1].time_ms <= pair[0].time_ms {
                return Err(format!(
                    "Animation validation failed: clip '{}' keyframe {} is not after keyframe {}",
                    name,
                    i + 1,
                    i
                ));
            }
        }
        for (i, key) in clip.keyframes.iter().enumerate() {
            if key.time_ms.checked_mul(1000).is_none() {
                return Err(format!(
                    "Animation validation failed: clip '{}' keyframe {} time_ms too large",
                    name, i
                ));
            }
            if key.scale.iter().any(|s| *s <= 0.0) {
                return Err(format!(
                    "Animation validation failed: clip '{}' keyframe {} has non-positive scale",
                    name, i
                ));
            }
        }
    }
    Ok(())
}

const fn default_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}
