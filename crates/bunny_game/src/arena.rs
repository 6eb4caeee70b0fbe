//! Arena description: floor, bunny, scattered boxes, pickups, movement tuning,
//! camera and lights. Every section is optional in JSON and falls back to the
//! meadow the game shipped with.

use bunny_render::Lighting;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct ArenaFile {
    pub version: String,
    pub arena_id: String,
    #[serde(default = "default_gravity")]
    pub gravity: [f32; 3],
    #[serde(default = "default_background")]
    pub background: String,
    #[serde(default)]
    pub floor: FloorSpec,
    #[serde(default)]
    pub player: PlayerSpec,
    #[serde(default)]
    pub obstacles: ObstacleSpec,
    #[serde(default = "default_pickups")]
    pub pickups: Vec<PickupSpec>,
    #[serde(default)]
    pub movement: MovementSpec,
    #[serde(default)]
    pub camera: CameraSpec,
    #[serde(default)]
    pub lights: LightSpec,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FloorSpec {
    #[serde(default = "default_floor_size")]
    pub size: [f32; 2],
    #[serde(default = "default_floor_color")]
    pub color: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PlayerSpec {
    #[serde(default = "default_player_spawn")]
    pub spawn: [f32; 3],
    #[serde(default = "default_unit_box")]
    pub size: [f32; 3],
    #[serde(default = "default_player_color")]
    pub color: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ObstacleSpec {
    #[serde(default = "default_obstacle_count")]
    pub count: u32,
    #[serde(default = "default_unit_box")]
    pub size: [f32; 3],
    #[serde(default = "default_obstacle_color")]
    pub color: String,
    /// Half-open `[min, max)` range for box centres along X.
    #[serde(default = "default_x_range")]
    pub x_range: [f32; 2],
    /// Half-open `(min, max]` range along Z, measured back from `max`.
    #[serde(default = "default_z_range")]
    pub z_range: [f32; 2],
    /// Fixed seed for reproducible layouts; absent means a fresh layout per run.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_true")]
    pub dynamic: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PickupSpec {
    pub id: String,
    pub position: [f32; 3],
    #[serde(default = "default_pickup_size")]
    pub size: f32,
    #[serde(default = "default_pickup_color")]
    pub color: String,
    #[serde(default = "default_spin_deg_per_sec")]
    pub spin_deg_per_sec: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MovementSpec {
    /// Units per second; 0.1 per frame at 60 fps.
    #[serde(default = "default_speed")]
    pub speed: f32,
    #[serde(default = "default_jump_speed")]
    pub jump_speed: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CameraSpec {
    #[serde(default = "default_camera_distance")]
    pub distance: f32,
    #[serde(default = "default_camera_height")]
    pub height: f32,
    #[serde(default = "default_fov_deg")]
    pub fov_deg: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LightSpec {
    #[serde(default = "default_ambient_color")]
    pub ambient_color: String,
    #[serde(default = "default_ambient_intensity")]
    pub ambient_intensity: f32,
    #[serde(default = "default_spot_color")]
    pub spot_color: String,
    #[serde(default = "default_spot_intensity")]
    pub spot_intensity: f32,
    #[serde(default = "default_spot_position")]
    pub spot_position: [f32; 3],
    #[serde(default)]
    pub spot_target: [f32; 3],
    #[serde(default = "default_spot_angle_deg")]
    pub spot_angle_deg: f32,
    #[serde(default = "default_spot_decay")]
    pub spot_decay: f32,
}

impl ArenaFile {
    /// The meadow used when no arena file is on disk.
    pub fn builtin() -> Self {
        Self {
            version: "0.1".to_string(),
            arena_id: "builtin_meadow".to_string(),
            gravity: default_gravity(),
            background: default_background(),
            floor: FloorSpec::default(),
            player: PlayerSpec::default(),
            obstacles: ObstacleSpec::default(),
            pickups: default_pickups(),
            movement: MovementSpec::default(),
            camera: CameraSpec::default(),
            lights: LightSpec::default(),
        }
    }

    pub fn gravity(&self) -> Vec3 {
        Vec3::from_array(self.gravity)
    }

    /// Clear colour; validated at load, so a bad value here falls back to black.
    pub fn background_hex(&self) -> u32 {
        parse_hex_color(&self.background).unwrap_or(0x000000)
    }
}

impl Default for FloorSpec {
    fn default() -> Self {
        Self {
            size: default_floor_size(),
            color: default_floor_color(),
        }
    }
}

impl Default for PlayerSpec {
    fn default() -> Self {
        Self {
            spawn: default_player_spawn(),
            size: default_unit_box(),
            color: default_player_color(),
        }
    }
}

impl Default for ObstacleSpec {
    fn default() -> Self {
        Self {
            count: default_obstacle_count(),
            size: default_unit_box(),
            color: default_obstacle_color(),
            x_range: default_x_range(),
            z_range: default_z_range(),
            seed: None,
            dynamic: true,
        }
    }
}

impl ObstacleSpec {
    /// Seeded when the arena pins a seed, otherwise drawn from OS entropy.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

impl Default for MovementSpec {
    fn default() -> Self {
        Self {
            speed: default_speed(),
            jump_speed: default_jump_speed(),
        }
    }
}

impl Default for CameraSpec {
    fn default() -> Self {
        Self {
            distance: default_camera_distance(),
            height: default_camera_height(),
            fov_deg: default_fov_deg(),
        }
    }
}

impl Default for LightSpec {
    fn default() -> Self {
        Self {
            ambient_color: default_ambient_color(),
            ambient_intensity: default_ambient_intensity(),
            spot_color: default_spot_color(),
            spot_intensity: default_spot_intensity(),
            spot_position: default_spot_position(),
            spot_target: [0.0; 3],
            spot_angle_deg: default_spot_angle_deg(),
            spot_decay: default_spot_decay(),
        }
    }
}

impl LightSpec {
    pub fn to_lighting(&self) -> Lighting {
        let fallback = Lighting::default();
        Lighting {
            ambient_color: parse_hex_color(&self.ambient_color).unwrap_or(fallback.ambient_color),
            ambient_intensity: self.ambient_intensity,
            spot_color: parse_hex_color(&self.spot_color).unwrap_or(fallback.spot_color),
            spot_intensity: self.spot_intensity,
            spot_position: Vec3::from_array(self.spot_position),
            spot_target: Vec3::from_array(self.spot_target),
            spot_angle: self.spot_angle_deg.to_radians(),
            spot_decay: self.spot_decay,
        }
    }
}

pub fn load_arena_from_path(arena_path: &Path) -> Result<ArenaFile, String> {
    let raw = fs::read_to_string(arena_path)
        .map_err(|e| format!("Failed to read arena file {}: {e}", arena_path.display()))?;
    let arena: ArenaFile = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse arena JSON {}: {e}", arena_path.display()))?;
    validate_arena(&arena)?;
    Ok(arena)
}

/// Accepts `#RRGGBB` or `0xRRGGBB`.
pub fn parse_hex_color(raw: &str) -> Result<u32, String> {
    let digits = raw
        .strip_prefix('#')
        .or_else(|| raw.strip_prefix("0x"))
        .or_else(|| raw.strip_prefix("0X"))
        .ok_or_else(|| format!("colour '{raw}' must start with '#' or '0x'"))?;
    if digits.len() != 6 {
        return Err(format!("colour '{raw}' must have six hex digits"));
    }
    u32::from_str_radix(digits, 16).map_err(|e| format!("colour '{raw}' is not hex: {e}"))
}

/// Box centres resting on the floor, drawn uniformly inside the configured ranges.
pub fn scatter_obstacles(spec: &ObstacleSpec, rng: &mut impl Rng) -> Vec<Vec3> {
    let [x_min, x_max] = spec.x_range;
    let [z_min, z_max] = spec.z_range;
    let y = spec.size[1] * 0.5;
    (0..spec.count)
        .map(|_| {
            let x = rng.gen_range(x_min..x_max);
            let z = z_max - rng.gen_range(0.0..z_max - z_min);
            Vec3::new(x, y, z)
        })
        .collect()
}

fn validate_arena(arena: &ArenaFile) -> Result<(), String> {
    if arena.version != "0.1" {
        return Err(format!(
            "Arena validation failed: unsupported version '{}'",
            arena.version
        ));
    }
    if arena.arena_id.is_empty() {
        return Err("Arena validation failed: arena_id is empty".to_string());
    }

    check_color("background", &arena.background)?;
    check_color("floor.color", &arena.floor.color)?;
    check_color("player.color", &arena.player.color)?;
    check_color("obstacles.color", &arena.obstacles.color)?;
    check_color("lights.ambient_color", &arena.lights.ambient_color)?;
    check_color("lights.spot_color", &arena.lights.spot_color)?;

    check_positive("floor.size", &arena.floor.size)?;
    check_positive("player.size", &arena.player.size)?;
    check_positive("obstacles.size", &arena.obstacles.size)?;

    for (axis, [min, max]) in [("x", arena.obstacles.x_range), ("z", arena.obstacles.z_range)] {
        if !(min.is_finite() && max.is_finite() && (max - min).is_finite()) {
            return Err(format!(
                "Arena validation failed: obstacles.{axis}_range [{min}, {max}] must be finite"
            ));
        }
        if !(max > min) {
            return Err(format!(
                "Arena validation failed: obstacles.{axis}_range [{min}, {max}] has no spread"
            ));
        }
    }

    let mut pickup_ids = HashSet::new();
    for pickup in &arena.pickups {
        if pickup.id.is_empty() {
            return Err("Arena validation failed: pickup id is empty".to_string());
        }
        if !pickup_ids.insert(pickup.id.as_str()) {
            return Err(format!(
                "Arena validation failed: duplicate pickup id '{}'",
                pickup.id
            ));
        }
        if !(pickup.size > 0.0) {
            return Err(format!(
                "Arena validation failed: pickup '{}' size must be positive",
                pickup.id
            ));
        }
        check_color(&format!("pickup '{}' color", pickup.id), &pickup.color)?;
    }

    if !(arena.movement.speed > 0.0) {
        return Err("Arena validation failed: movement.speed must be positive".to_string());
    }
    if !(arena.movement.jump_speed > 0.0) {
        return Err("Arena validation failed: movement.jump_speed must be positive".to_string());
    }
    if !(arena.camera.fov_deg > 0.0 && arena.camera.fov_deg < 180.0) {
        return Err(format!(
            "Arena validation failed: camera.fov_deg {} outside (0, 180)",
            arena.camera.fov_deg
        ));
    }
    if arena.lights.ambient_intensity < 0.0 || arena.lights.spot_intensity < 0.0 {
        return Err("Arena validation failed: light intensities must not be negative".to_string());
    }

    if arena.pickups.is_empty() {
        log::warn!(
            "Arena '{}' has no pickups. This is allowed but often accidental.",
            arena.arena_id
        );
    }

    Ok(())
}

fn check_color(field: &str, raw: &str) -> Result<(), String> {
    parse_hex_color(raw)
        .map(|_| ())
        .map_err(|e| format!("Arena validation failed: {field}: {e}"))
}

fn check_positive(field: &str, values: &[f32]) -> Result<(), String> {
    if values.iter().all(|v| *v > 0.0 && v.is_finite()) {
        Ok(())
    } else {
        Err(format!(
            "Arena validation failed: {field} {values:?} must be positive"
        ))
    }
}

const fn default_gravity() -> [f32; 3] {
    [0.0, -9.81, 0.0]
}

fn default_background() -> String {
    "#000000".to_string()
}

const fn default_floor_size() -> [f32; 2] {
    [100.0, 100.0]
}

fn default_floor_color() -> String {
    "#FFE5CC".to_string()
}

const fn default_player_spawn() -> [f32; 3] {
    [0.0, 0.5, 0.0]
}

const fn default_unit_box() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

fn default_player_color() -> String {
    "#FF99FF".to_string()
}

const fn default_obstacle_count() -> u32 {
    10
}

fn default_obstacle_color() -> String {
    "#0FF000".to_string()
}

const fn default_x_range() -> [f32; 2] {
    [0.0, 50.0]
}

const fn default_z_range() -> [f32; 2] {
    [-50.0, 0.0]
}

const fn default_true() -> bool {
    true
}

fn default_pickups() -> Vec<PickupSpec> {
    vec![PickupSpec {
        id: "money".to_string(),
        position: [3.0, 0.5, -3.0],
        size: default_pickup_size(),
        color: default_pickup_color(),
        spin_deg_per_sec: default_spin_deg_per_sec(),
    }]
}

const fn default_pickup_size() -> f32 {
    0.6
}

fn default_pickup_color() -> String {
    "#FFD700".to_string()
}

const fn default_spin_deg_per_sec() -> f32 {
    90.0
}

const fn default_speed() -> f32 {
    6.0
}

const fn default_jump_speed() -> f32 {
    5.0
}

const fn default_camera_distance() -> f32 {
    5.0
}

const fn default_camera_height() -> f32 {
    2.0
}

const fn default_fov_deg() -> f32 {
    75.0
}

fn default_ambient_color() -> String {
    "#404040".to_string()
}

const fn default_ambient_intensity() -> f32 {
    5.0
}

fn default_spot_color() -> String {
    "#FFFFFF".to_string()
}

const fn default_spot_intensity() -> f32 {
    10.0
}

const fn default_spot_position() -> [f32; 3] {
    [2.0, 2.0, 2.0]
}

const fn default_spot_angle_deg() -> f32 {
    60.0
}

const fn default_spot_decay() -> f32 {
    2.0
}
