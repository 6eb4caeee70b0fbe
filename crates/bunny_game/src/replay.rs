use crate::controller::{ControllerInput, MoveKeys};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct ReplaySequence {
    #[serde(default = "default_dt")]
    pub fixed_dt: f32,
    pub frames: Vec<ReplayFrame>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReplayFrame {
    #[serde(default)]
    pub up: bool,
    #[serde(default)]
    pub down: bool,
    #[serde(default)]
    pub left: bool,
    #[serde(default)]
    pub right: bool,
    #[serde(default)]
    pub jump_pressed: bool,
    #[serde(default)]
    pub jump_released: bool,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

impl ReplaySequence {
    /// One input per fixed step. Jump edges land on the first repetition only.
    pub fn expanded_inputs(&self) -> Vec<ControllerInput> {
        let mut out = Vec::new();
        for frame in &self.frames {
            let keys = MoveKeys {
                up: frame.up,
                down: frame.down,
                left: frame.left,
                right: frame.right,
            };
            for i in 0..frame.repeat.max(1) {
                out.push(ControllerInput {
                    keys,
                    jump_pressed: frame.jump_pressed && i == 0,
                    jump_released: frame.jump_released && i == 0,
                });
            }
        }
        out
    }
}

pub fn load_replay_from_path(path: &Path) -> Result<ReplaySequence, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let replay: ReplaySequence = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse replay JSON {}: {e}", path.display()))?;
    validate_replay(&replay)?;
    Ok(replay)
}

fn validate_replay(replay: &ReplaySequence) -> Result<(), String> {
    if replay.fixed_dt <= 0.0 {
        return Err("Replay validation failed: fixed_dt must be > 0".to_string());
    }
    if replay.frames.is_empty() {
        return Err("Replay validation failed: frames list is empty".to_string());
    }
    Ok(())
}

const fn default_dt() -> f32 {
    1.0 / 60.0
}

const fn default_repeat() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ArenaFile;
    use crate::world::GameWorld;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "bunny_replay_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    fn load(name_hint: &str, json: &str) -> ReplaySequence {
        let path = temp_file_path(name_hint);
        fs::write(&path, json).expect("write replay file");
        let replay = load_replay_from_path(&path).expect("replay should load");
        let _ = fs::remove_file(path);
        replay
    }

    fn seeded_arena() -> ArenaFile {
        let mut arena = ArenaFile::builtin();
        arena.obstacles.seed = Some(1234);
        arena
    }

    fn run(arena: &ArenaFile, replay: &ReplaySequence) -> GameWorld {
        let mut world = GameWorld::from_arena(arena, &mut arena.obstacles.rng());
        for input in replay.expanded_inputs() {
            world.fixed_step(input, replay.fixed_dt);
        }
        world
    }

    #[test]
    fn rejects_empty_frames() {
        let path = temp_file_path("empty");
        fs::write(&path, r#"{ "frames": [] }"#).expect("write replay file");
        let err = load_replay_from_path(&path).expect_err("empty frames should fail");
        assert!(err.contains("frames list is empty"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn jump_edges_are_not_repeated() {
        let replay = load(
            "edges",
            r#"{ "frames": [ { "jump_pressed": true, "jump_released": true, "repeat": 3 } ] }"#,
        );
        let inputs = replay.expanded_inputs();
        assert_eq!(inputs.len(), 3);
        assert!(inputs[0].jump_pressed && inputs[0].jump_released);
        assert!(!inputs[1].jump_pressed && !inputs[2].jump_released);
    }

    #[test]
    fn replay_run_is_deterministic() {
        let replay = load(
            "deterministic",
            r#"{
              "fixed_dt": 0.016666667,
              "frames": [
                { "right": true, "repeat": 60 },
                { "right": true, "jump_pressed": true, "repeat": 1 },
                { "right": true, "up": true, "repeat": 90 },
                { "right": true, "jump_released": true, "repeat": 1 },
                { "left": true, "repeat": 45 }
              ]
            }"#,
        );

        let arena = seeded_arena();
        let run_a = run(&arena, &replay);
        let run_b = run(&arena, &replay);

        let a = run_a.player_position();
        let b = run_b.player_position();
        assert!((a - b).length() < 1e-4, "{a:?} vs {b:?}");
        assert!((run_a.player_velocity() - run_b.player_velocity()).length() < 1e-4);
        assert_eq!(run_a.money_collected(), run_b.money_collected());
        assert_eq!(run_a.physics.body_count(), run_b.physics.body_count());
    }

    #[test]
    fn diagonal_replay_reaches_the_money() {
        let replay = load(
            "money",
            r#"{ "frames": [ { "up": true, "right": true, "repeat": 40 } ] }"#,
        );
        let mut arena = ArenaFile::builtin();
        arena.obstacles.count = 0;

        let world = run(&arena, &replay);
        assert_eq!(world.money_collected(), 1);
        assert!(world.pickup_body("money").is_none());
    }
}
