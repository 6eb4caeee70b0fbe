//! Rigid-body world backed by rapier.
//!
//! Owns every rapier set and pipeline stage so the rest of the game only deals
//! in `RigidBodyHandle`s and glam types. Sensor intersections are collected
//! during `step` and handed out through `drain_trigger_events`.

use std::sync::Mutex;

use glam::{Quat, Vec3};
use rapier3d::prelude::*;

/// Floor slab thickness below its top surface.
pub const FLOOR_HALF_THICKNESS: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Fixed,
    Dynamic,
}

/// A sensor began overlapping another body. `trigger` is the sensor's body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerEvent {
    pub trigger: RigidBodyHandle,
    pub other: RigidBodyHandle,
}

/// Rapier reports events through `&self`, so they queue behind a mutex.
#[derive(Default)]
struct CollisionLog {
    events: Mutex<Vec<CollisionEvent>>,
}

impl CollisionLog {
    fn take(&mut self) -> Vec<CollisionEvent> {
        let events = match self.events.get_mut() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::take(events)
    }
}

impl EventHandler for CollisionLog {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}

pub struct PhysicsWorld {
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    collision_log: CollisionLog,
    pending_triggers: Vec<TriggerEvent>,
}

impl PhysicsWorld {
    pub fn new(gravity: Vec3) -> Self {
        Self {
            gravity: vector![gravity.x, gravity.y, gravity.z],
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            collision_log: CollisionLog::default(),
            pending_triggers: Vec::new(),
        }
    }

    /// Fixed slab whose top face sits at `top_y`. Only X and Z of
    /// `half_extents` are used; the slab has a fixed thickness.
    pub fn add_floor(&mut self, half_extents: Vec3, top_y: f32) -> RigidBodyHandle {
        let body = RigidBodyBuilder::fixed()
            .translation(vector![0.0, top_y - FLOOR_HALF_THICKNESS, 0.0])
            .build();
        let collider =
            ColliderBuilder::cuboid(half_extents.x, FLOOR_HALF_THICKNESS, half_extents.z).build();
        self.insert(body, collider)
    }

    pub fn add_box(&mut self, position: Vec3, half_extents: Vec3, kind: BodyKind) -> RigidBodyHandle {
        let builder = match kind {
            BodyKind::Fixed => RigidBodyBuilder::fixed(),
            BodyKind::Dynamic => RigidBodyBuilder::dynamic(),
        };
        let body = builder.translation(to_vector(position)).build();
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z).build();
        self.insert(body, collider)
    }

    /// Upright dynamic box driven by velocity. Zero friction keeps the
    /// controller's velocity from being eaten by floor contact.
    pub fn add_player(&mut self, position: Vec3, half_extents: Vec3) -> RigidBodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(to_vector(position))
            .lock_rotations()
            .ccd_enabled(true)
            .build();
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .friction(0.0)
            .friction_combine_rule(CoefficientCombineRule::Min)
            .build();
        self.insert(body, collider)
    }

    /// Fixed sensor volume; overlaps surface as `TriggerEvent`s.
    pub fn add_trigger(&mut self, position: Vec3, half_extents: Vec3) -> RigidBodyHandle {
        let body = RigidBodyBuilder::fixed()
            .translation(to_vector(position))
            .build();
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .sensor(true)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .build();
        self.insert(body, collider)
    }

    fn insert(&mut self, body: RigidBody, collider: Collider) -> RigidBodyHandle {
        let handle = self.bodies.insert(body);
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        handle
    }

    pub fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &self.collision_log,
        );

        for event in self.collision_log.take() {
            if let CollisionEvent::Started(a, b, flags) = event {
                if !flags.contains(CollisionEventFlags::SENSOR) {
                    continue;
                }
                if let Some(trigger) = self.resolve_sensor_pair(a, b) {
                    self.pending_triggers.push(trigger);
                }
            }
        }
    }

    /// Orders the pair sensor-first and maps colliders to their bodies.
    fn resolve_sensor_pair(&self, a: ColliderHandle, b: ColliderHandle) -> Option<TriggerEvent> {
        let collider_a = self.colliders.get(a)?;
        let collider_b = self.colliders.get(b)?;
        let (sensor, other) = if collider_a.is_sensor() {
            (collider_a, collider_b)
        } else {
            (collider_b, collider_a)
        };
        Some(TriggerEvent {
            trigger: sensor.parent()?,
            other: other.parent()?,
        })
    }

    pub fn drain_trigger_events(&mut self) -> Vec<TriggerEvent> {
        std::mem::take(&mut self.pending_triggers)
    }

    /// Removes the body and its colliders. Returns false if it was already gone.
    pub fn remove_body(&mut self, handle: RigidBodyHandle) -> bool {
        self.pending_triggers
            .retain(|event| event.trigger != handle && event.other != handle);
        self.bodies
            .remove(
                handle,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some()
    }

    #[allow(dead_code)]
    pub fn contains(&self, handle: RigidBodyHandle) -> bool {
        self.bodies.contains(handle)
    }

    pub fn body_pose(&self, handle: RigidBodyHandle) -> Option<(Vec3, Quat)> {
        let body = self.bodies.get(handle)?;
        let t = body.translation();
        let r = body.rotation();
        Some((Vec3::new(t.x, t.y, t.z), Quat::from_xyzw(r.i, r.j, r.k, r.w)))
    }

    pub fn linvel(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        let v = self.bodies.get(handle)?.linvel();
        Some(Vec3::new(v.x, v.y, v.z))
    }

    /// Returns false if the body does not exist.
    pub fn set_linvel(&mut self, handle: RigidBodyHandle, velocity: Vec3) -> bool {
        match self.bodies.get_mut(handle) {
            Some(body) => {
                body.set_linvel(to_vector(velocity), true);
                true
            }
            None => false,
        }
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }
}

fn to_vector(v: Vec3) -> Vector<Real> {
    vector![v.x, v.y, v.z]
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn world() -> PhysicsWorld {
        PhysicsWorld::new(Vec3::new(0.0, -9.81, 0.0))
    }

    #[test]
    fn dynamic_box_falls_and_rests_on_floor() {
        let mut physics = world();
        physics.add_floor(Vec3::new(50.0, 0.0, 50.0), 0.0);
        let body = physics.add_box(Vec3::new(0.0, 3.0, 0.0), Vec3::splat(0.5), BodyKind::Dynamic);

        for _ in 0..240 {
            physics.step(DT);
        }

        let (position, _) = physics.body_pose(body).expect("box exists");
        assert!((position.y - 0.5).abs() < 0.05, "box rests at y={}", position.y);
    }

    #[test]
    fn fixed_box_does_not_move() {
        let mut physics = world();
        let body = physics.add_box(Vec3::new(1.0, 2.0, 3.0), Vec3::splat(0.5), BodyKind::Fixed);
        for _ in 0..30 {
            physics.step(DT);
        }
        let (position, rotation) = physics.body_pose(body).expect("box exists");
        assert_eq!(position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(rotation, Quat::IDENTITY);
    }

    #[test]
    fn player_keeps_commanded_horizontal_velocity_on_floor() {
        let mut physics = world();
        physics.add_floor(Vec3::new(50.0, 0.0, 50.0), 0.0);
        let player = physics.add_player(Vec3::new(0.0, 0.5, 0.0), Vec3::splat(0.5));

        for _ in 0..30 {
            let mut v = physics.linvel(player).expect("player exists");
            v.x = 6.0;
            v.z = 0.0;
            assert!(physics.set_linvel(player, v));
            physics.step(DT);
        }

        let (position, rotation) = physics.body_pose(player).expect("player exists");
        assert!((position.x - 3.0).abs() < 0.1, "player x={}", position.x);
        assert!((rotation.dot(Quat::IDENTITY).abs() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn sensor_reports_started_overlap_once() {
        let mut physics = world();
        physics.add_floor(Vec3::new(50.0, 0.0, 50.0), 0.0);
        let player = physics.add_player(Vec3::new(0.0, 0.5, 0.0), Vec3::splat(0.5));
        let trigger = physics.add_trigger(Vec3::new(0.0, 0.5, 0.0), Vec3::splat(0.3));

        physics.step(DT);
        let events = physics.drain_trigger_events();
        assert_eq!(events, vec![TriggerEvent { trigger, other: player }]);

        physics.step(DT);
        assert!(physics.drain_trigger_events().is_empty());
    }

    #[test]
    fn sensor_does_not_push_bodies() {
        let mut physics = world();
        physics.add_floor(Vec3::new(50.0, 0.0, 50.0), 0.0);
        let player = physics.add_player(Vec3::new(0.0, 0.5, 0.0), Vec3::splat(0.5));
        physics.add_trigger(Vec3::new(0.2, 0.5, 0.0), Vec3::splat(0.3));

        for _ in 0..30 {
            physics.step(DT);
        }
        let (position, _) = physics.body_pose(player).expect("player exists");
        assert!(position.x.abs() < 1e-3, "player drifted to x={}", position.x);
    }

    #[test]
    fn removing_a_body_is_reported_once() {
        let mut physics = world();
        let body = physics.add_box(Vec3::ZERO, Vec3::splat(0.5), BodyKind::Fixed);
        assert_eq!(physics.body_count(), 1);
        assert!(physics.remove_body(body));
        assert!(!physics.remove_body(body));
        assert!(!physics.contains(body));
        assert_eq!(physics.body_count(), 0);
        assert!(physics.body_pose(body).is_none());
        assert!(!physics.set_linvel(body, Vec3::X));
    }

    #[test]
    fn removing_a_trigger_discards_its_pending_events() {
        let mut physics = world();
        physics.add_player(Vec3::new(0.0, 0.5, 0.0), Vec3::splat(0.5));
        let trigger = physics.add_trigger(Vec3::new(0.0, 0.5, 0.0), Vec3::splat(0.3));
        physics.step(DT);
        assert!(physics.remove_body(trigger));
        assert!(physics.drain_trigger_events().is_empty());
    }
}
