//! Game world: every entity owns one physics body and one render node.
//!
//! Physics is authoritative. `fixed_step` feeds the controller's velocity
//! into the player body, steps rapier, consumes trigger overlaps and then
//! copies body poses onto render nodes. Animation and pickup spin are
//! per-frame and only ever touch render nodes.

use std::collections::HashMap;

use bunny_core::animation::Pose;
use bunny_render::{color_from_hex, MeshNode, NodeId, SceneGraph, Transform};
use glam::{Quat, Vec3};
use rand::Rng;
use rapier3d::prelude::RigidBodyHandle;

use crate::arena::{parse_hex_color, scatter_obstacles, ArenaFile};
use crate::controller::{ControllerConfig, ControllerInput, PlayerController};
use crate::physics::{BodyKind, PhysicsWorld, FLOOR_HALF_THICKNESS};
use crate::player_anim::{AnimationRegistry, PlayerAnimState, PlayerAnimator};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityKind {
    Floor,
    Player,
    Obstacle,
    Pickup { id: String },
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub kind: EntityKind,
    pub body: RigidBodyHandle,
    pub node: NodeId,
    /// Full extents of the render box.
    pub size: Vec3,
    /// Node centre relative to the body centre.
    pub render_offset: Vec3,
    /// Render-only yaw for spinning pickups, radians.
    spin_yaw: f32,
    /// Radians per second.
    spin_speed: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepReport {
    pub jumped: bool,
    /// Ids of pickups collected during the step.
    pub collected: Vec<String>,
}

pub struct GameWorld {
    pub physics: PhysicsWorld,
    pub scene: SceneGraph,
    entities: HashMap<RigidBodyHandle, Entity>,
    player: RigidBodyHandle,
    controller: PlayerController,
    animator: PlayerAnimator,
    player_pose: Pose,
    facing_yaw: f32,
    moving: bool,
    jump_pending: bool,
    pub spin_enabled: bool,
    money_collected: u32,
    money_total: u32,
}

impl GameWorld {
    pub fn from_arena(arena: &ArenaFile, rng: &mut impl Rng) -> Self {
        let mut physics = PhysicsWorld::new(arena.gravity());
        let mut scene = SceneGraph::new();
        let mut entities = HashMap::new();

        let color = |hex: &str| color_from_hex(parse_hex_color(hex).unwrap_or(0xffffff));
        let mut spawn = |physics_body: RigidBodyHandle,
                         kind: EntityKind,
                         position: Vec3,
                         size: Vec3,
                         rgba: [f32; 4],
                         spin_speed: f32| {
            let node = scene.add(MeshNode::new(
                Transform::from_translation_scale(position, size),
                rgba,
            ));
            entities.insert(
                physics_body,
                Entity {
                    kind,
                    body: physics_body,
                    node,
                    size,
                    render_offset: Vec3::ZERO,
                    spin_yaw: 0.0,
                    spin_speed,
                },
            );
        };

        // The visible floor is a thin plate whose top matches the slab collider's.
        let [floor_x, floor_z] = arena.floor.size;
        let floor_size = Vec3::new(floor_x, 0.01, floor_z);
        let floor = physics.add_floor(floor_size * 0.5, 0.0);
        let floor_offset = Vec3::Y * (FLOOR_HALF_THICKNESS - floor_size.y * 0.5);
        spawn(
            floor,
            EntityKind::Floor,
            Vec3::new(0.0, -floor_size.y * 0.5, 0.0),
            floor_size,
            color(&arena.floor.color),
            0.0,
        );

        let player_size = Vec3::from_array(arena.player.size);
        let player_spawn = Vec3::from_array(arena.player.spawn);
        let player = physics.add_player(player_spawn, player_size * 0.5);
        spawn(
            player,
            EntityKind::Player,
            player_spawn,
            player_size,
            color(&arena.player.color),
            0.0,
        );

        let obstacle_size = Vec3::from_array(arena.obstacles.size);
        let obstacle_kind = if arena.obstacles.dynamic {
            BodyKind::Dynamic
        } else {
            BodyKind::Fixed
        };
        let obstacle_color = color(&arena.obstacles.color);
        for position in scatter_obstacles(&arena.obstacles, rng) {
            let body = physics.add_box(position, obstacle_size * 0.5, obstacle_kind);
            spawn(
                body,
                EntityKind::Obstacle,
                position,
                obstacle_size,
                obstacle_color,
                0.0,
            );
        }

        for pickup in &arena.pickups {
            let position = Vec3::from_array(pickup.position);
            let size = Vec3::splat(pickup.size);
            let body = physics.add_trigger(position, size * 0.5);
            spawn(
                body,
                EntityKind::Pickup {
                    id: pickup.id.clone(),
                },
                position,
                size,
                color(&pickup.color),
                pickup.spin_deg_per_sec.to_radians(),
            );
        }
        if let Some(entity) = entities.get_mut(&floor) {
            entity.render_offset = floor_offset;
        }

        log::info!(
            "Built arena '{}': {} bodies, {} meshes, {} pickups",
            arena.arena_id,
            physics.body_count(),
            scene.len(),
            arena.pickups.len()
        );

        Self {
            physics,
            scene,
            entities,
            player,
            controller: PlayerController::new(ControllerConfig::from(&arena.movement)),
            animator: PlayerAnimator::default(),
            player_pose: Pose::IDENTITY,
            facing_yaw: 0.0,
            moving: false,
            jump_pending: false,
            spin_enabled: true,
            money_collected: 0,
            money_total: arena.pickups.len() as u32,
        }
    }

    /// One simulation tick: input, physics, triggers, then body-to-node sync.
    pub fn fixed_step(&mut self, input: ControllerInput, dt: f32) -> StepReport {
        let mut report = StepReport::default();

        let current = self.physics.linvel(self.player).unwrap_or(Vec3::ZERO);
        let velocity = self.controller.step(input, current);
        self.physics.set_linvel(self.player, velocity);
        self.moving = input.keys.is_moving();
        if self.moving {
            self.facing_yaw = velocity.x.atan2(velocity.z);
        }
        if self.controller.jumped() {
            self.jump_pending = true;
            report.jumped = true;
        }

        self.physics.step(dt);

        for event in self.physics.drain_trigger_events() {
            if event.other != self.player {
                continue;
            }
            if let Some(id) = self.collect_pickup(event.trigger) {
                report.collected.push(id);
            }
        }

        self.sync_transforms();
        report
    }

    /// Re-arms the jump guard for a release no fixed step will see.
    pub fn release_controls(&mut self) {
        self.controller.release_jump();
    }

    /// Removes a pickup from both worlds. Returns its id, or `None` when the
    /// body is not a live pickup (already collected, or another kind).
    pub fn collect_pickup(&mut self, body: RigidBodyHandle) -> Option<String> {
        let id = match &self.entities.get(&body)?.kind {
            EntityKind::Pickup { id } => id.clone(),
            _ => return None,
        };
        let entity = self.entities.remove(&body)?;
        self.physics.remove_body(entity.body);
        self.scene.remove(entity.node);
        self.money_collected += 1;
        log::info!(
            "Collected '{}' ({} of {})",
            id,
            self.money_collected,
            self.money_total
        );
        Some(id)
    }

    /// Copies every live body's pose onto its render node.
    pub fn sync_transforms(&mut self) {
        for entity in self.entities.values() {
            let Some((position, rotation)) = self.physics.body_pose(entity.body) else {
                continue;
            };
            let transform = match entity.kind {
                EntityKind::Player => self.player_transform(position, entity.size),
                EntityKind::Pickup { .. } => Transform {
                    translation: position,
                    rotation: rotation * Quat::from_rotation_y(entity.spin_yaw),
                    scale: entity.size,
                },
                EntityKind::Floor | EntityKind::Obstacle => Transform {
                    translation: position + rotation * entity.render_offset,
                    rotation,
                    scale: entity.size,
                },
            };
            if let Some(node) = self.scene.get_mut(entity.node) {
                node.transform = transform;
            }
        }
    }

    /// Body position plus the bunny's animated offset, squash and facing.
    fn player_transform(&self, position: Vec3, size: Vec3) -> Transform {
        let facing = Quat::from_rotation_y(self.facing_yaw);
        Transform {
            translation: position + facing * self.player_pose.offset,
            rotation: facing * Quat::from_rotation_y(self.player_pose.yaw),
            scale: size * self.player_pose.scale,
        }
    }

    /// Per-frame, wall-clock driven. Consumes any jump fired since last frame.
    pub fn update_animation(&mut self, real_dt: f64, clips: &AnimationRegistry) {
        let jump_fired = std::mem::take(&mut self.jump_pending);
        self.animator
            .update(self.moving, jump_fired, real_dt, clips);
        self.player_pose = self.animator.pose(clips);

        let Some(entity) = self.entities.get(&self.player) else {
            return;
        };
        let Some((position, _)) = self.physics.body_pose(self.player) else {
            return;
        };
        let transform = self.player_transform(position, entity.size);
        if let Some(node) = self.scene.get_mut(entity.node) {
            node.transform = transform;
        }
    }

    /// Turns pickups in the render world. Their sensors never rotate.
    pub fn spin(&mut self, dt: f32) {
        if !self.spin_enabled {
            return;
        }
        for entity in self.entities.values_mut() {
            if !matches!(entity.kind, EntityKind::Pickup { .. }) {
                continue;
            }
            entity.spin_yaw = (entity.spin_yaw + entity.spin_speed * dt) % std::f32::consts::TAU;
            if let Some(node) = self.scene.get_mut(entity.node) {
                node.transform.rotation = Quat::from_rotation_y(entity.spin_yaw);
            }
        }
    }

    #[allow(dead_code)]
    pub fn player_body(&self) -> RigidBodyHandle {
        self.player
    }

    pub fn player_position(&self) -> Vec3 {
        self.physics
            .body_pose(self.player)
            .map_or(Vec3::ZERO, |(position, _)| position)
    }

    pub fn player_velocity(&self) -> Vec3 {
        self.physics.linvel(self.player).unwrap_or(Vec3::ZERO)
    }

    #[allow(dead_code)]
    pub fn animation_state(&self) -> PlayerAnimState {
        self.animator.state()
    }

    pub fn animation_clip(&self) -> Option<&str> {
        self.animator.current_clip()
    }

    #[allow(dead_code)]
    pub fn entity(&self, body: RigidBodyHandle) -> Option<&Entity> {
        self.entities.get(&body)
    }

    #[allow(dead_code)]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Body handle of a live pickup by id.
    #[allow(dead_code)]
    pub fn pickup_body(&self, id: &str) -> Option<RigidBodyHandle> {
        self.entities.values().find_map(|entity| match &entity.kind {
            EntityKind::Pickup { id: pickup_id } if pickup_id == id => Some(entity.body),
            _ => None,
        })
    }

    pub fn money_collected(&self) -> u32 {
        self.money_collected
    }

    pub fn money_total(&self) -> u32 {
        self.money_total
    }
}
