use std::collections::{HashMap, HashSet};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::character::CharacterController;
use crate::collision::{
    gjk, ray_test, Ball, CollisionCallback, CollisionContact, CollisionHandler, CollisionObject,
    ContactInfo, IdAllocator, ObjectId, ObjectPair, SupportMap, TriggerHandler, WorldShape,
};
use crate::constraints::{Constraint, ConstraintId};
use crate::dynamics::{apply_gravity, integrate_positions, integrate_velocities, PhysicsMaterial, RigidBody};
use crate::error::{PhysicsError, PhysicsResult};
use crate::geometry::{Aabb, CollisionShape, Shape};
use crate::math::{Mat4, Quat, Vec3};

/// Broadphase the world reports. Detection always uses the pairwise loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BroadphaseType {
    Naive,
    Sap,
    #[default]
    Dbvt,
}

/// Configuration for the physics world
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WorldConfig {
    pub gravity: Vec3,
    /// Substep length used by [`PhysicsWorld::step_fixed`]
    pub time_step: f32,
    /// Constraint passes per step
    pub solver_iterations: usize,
    pub broadphase: BroadphaseType,
    /// Upper bound on substeps per `step_fixed` call
    pub max_substeps: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            time_step: 1.0 / 60.0,
            solver_iterations: 10,
            broadphase: BroadphaseType::Dbvt,
            max_substeps: 1,
        }
    }
}

impl WorldConfig {
    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_time_step(mut self, time_step: f32) -> Self {
        self.time_step = time_step;
        self
    }

    pub fn with_solver_iterations(mut self, iterations: usize) -> Self {
        self.solver_iterations = iterations;
        self
    }

    pub fn with_broadphase(mut self, broadphase: BroadphaseType) -> Self {
        self.broadphase = broadphase;
        self
    }

    pub fn with_max_substeps(mut self, max_substeps: usize) -> Self {
        self.max_substeps = max_substeps;
        self
    }

    pub fn validate(&self) -> PhysicsResult<()> {
        if !self.gravity.is_finite() {
            return Err(PhysicsError::WorldCreationFailed(format!(
                "gravity must be finite, got {:?}",
                self.gravity
            )));
        }
        if !(self.time_step > 0.0 && self.time_step.is_finite()) {
            return Err(PhysicsError::WorldCreationFailed(format!(
                "time step must be positive, got {}",
                self.time_step
            )));
        }
        if self.solver_iterations == 0 {
            return Err(PhysicsError::WorldCreationFailed(
                "solver iterations must be at least 1".into(),
            ));
        }
        if self.max_substeps == 0 {
            return Err(PhysicsError::WorldCreationFailed(
                "max substeps must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Result of a ray or sphere sweep query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastResult {
    pub has_hit: bool,
    pub hit_object: Option<ObjectId>,
    pub hit_point: Vec3,
    pub hit_normal: Vec3,
    /// Fraction of the segment travelled before the hit
    pub hit_fraction: f32,
    /// Distance from the segment start
    pub distance: f32,
}

impl RaycastResult {
    pub fn miss() -> Self {
        Self {
            has_hit: false,
            hit_object: None,
            hit_point: Vec3::ZERO,
            hit_normal: Vec3::ZERO,
            hit_fraction: 1.0,
            distance: f32::MAX,
        }
    }
}

impl Default for RaycastResult {
    fn default() -> Self {
        Self::miss()
    }
}

/// Returns mutable references to two distinct slice elements
fn pair_mut<T>(items: &mut [T], i: usize, j: usize) -> Option<(&mut T, &mut T)> {
    if i == j || i >= items.len() || j >= items.len() {
        return None;
    }
    if i < j {
        let (left, right) = items.split_at_mut(j);
        Some((&mut left[i], &mut right[0]))
    } else {
        let (left, right) = items.split_at_mut(i);
        Some((&mut right[0], &mut left[j]))
    }
}

/// True when a query volume touches `object`'s shape. Concave shapes
/// only get the bounding box test.
fn touches(query: &impl SupportMap, query_bounds: Aabb, object: &CollisionObject) -> bool {
    let (Some(shape), Some(bounds)) = (object.shape(), object.world_aabb()) else {
        return false;
    };
    if !bounds.intersects(query_bounds) {
        return false;
    }
    if !shape.is_convex() {
        return true;
    }
    object
        .world_shape()
        .is_some_and(|placed| gjk::intersects(query, &placed))
}

/// One side of a candidate pair during detection
struct Participant<'a> {
    object: &'a CollisionObject,
    material: PhysicsMaterial,
    dynamic: bool,
}

impl<'a> Participant<'a> {
    fn body(body: &'a RigidBody) -> Self {
        Self {
            object: body.collision_object(),
            material: *body.material(),
            dynamic: body.is_dynamic(),
        }
    }

    fn object(object: &'a CollisionObject) -> Self {
        Self {
            object,
            material: PhysicsMaterial::default(),
            dynamic: false,
        }
    }
}

fn detect_pair(a: &Participant<'_>, b: &Participant<'_>) -> Option<CollisionContact> {
    if !a.dynamic && !b.dynamic {
        return None;
    }
    if !a.object.can_collide_with(b.object) {
        return None;
    }
    let (shape_a, shape_b) = (a.object.shape()?, b.object.shape()?);
    if !a.object.world_aabb()?.intersects(b.object.world_aabb()?) {
        return None;
    }
    if shape_a.is_convex() && shape_b.is_convex() {
        let (placed_a, placed_b) = (a.object.world_shape()?, b.object.world_shape()?);
        if !gjk::intersects(&placed_a, &placed_b) {
            return None;
        }
    }

    let normal = (b.object.position() - a.object.position())
        .try_normalize()
        .unwrap_or(Vec3::Y);
    let world_pos_a = a.object.support_world(normal)?;
    let world_pos_b = b.object.support_world(-normal)?;
    let material = a.material.combine_with(&b.material);
    Some(CollisionContact {
        object_a: a.object.id(),
        object_b: b.object.id(),
        info: ContactInfo {
            normal,
            world_pos_a,
            world_pos_b,
            distance: (world_pos_b - world_pos_a).dot(normal),
            impulse: 0.0,
            friction: material.friction,
            restitution: material.restitution,
        },
    })
}

/// Owns bodies, constraints, collision objects and characters, and steps
/// them together.
///
/// Every object gets an [`ObjectId`] from the world's allocator when it is
/// added; constraints get a [`ConstraintId`]. After [`dispose`](Self::dispose)
/// every fallible operation fails with `UnsupportedOperation`.
pub struct PhysicsWorld {
    config: WorldConfig,
    ids: IdAllocator,
    next_constraint: u32,

    bodies: Vec<RigidBody>,
    body_index: HashMap<ObjectId, usize>,
    constraints: Vec<Constraint>,
    objects: Vec<CollisionObject>,
    characters: Vec<CharacterController>,

    collision_handlers: Vec<CollisionHandler>,
    trigger_handlers: Vec<TriggerHandler>,
    collision_callback: Option<Box<dyn CollisionCallback>>,
    /// Non-trigger pairs touching at the end of the last step
    active_pairs: HashSet<ObjectPair>,

    paused: bool,
    disposed: bool,
    time: f32,
    accumulator: f32,
}

impl fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("config", &self.config)
            .field("bodies", &self.bodies.len())
            .field("constraints", &self.constraints.len())
            .field("objects", &self.objects.len())
            .field("characters", &self.characters.len())
            .field("paused", &self.paused)
            .field("disposed", &self.disposed)
            .field("time", &self.time)
            .finish()
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::from_valid_config(WorldConfig::default())
    }
}

impl PhysicsWorld {
    pub fn new(config: WorldConfig) -> PhysicsResult<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: WorldConfig) -> Self {
        info!(
            gravity = ?config.gravity,
            time_step = config.time_step,
            solver_iterations = config.solver_iterations,
            "created physics world"
        );
        Self {
            config,
            ids: IdAllocator::new(),
            next_constraint: 0,
            bodies: Vec::new(),
            body_index: HashMap::new(),
            constraints: Vec::new(),
            objects: Vec::new(),
            characters: Vec::new(),
            collision_handlers: Vec::new(),
            trigger_handlers: Vec::new(),
            collision_callback: None,
            active_pairs: HashSet::new(),
            paused: false,
            disposed: false,
            time: 0.0,
            accumulator: 0.0,
        }
    }

    fn ensure_alive(&self) -> PhysicsResult<()> {
        if self.disposed {
            warn!("operation on a disposed physics world");
            return Err(PhysicsError::UnsupportedOperation(
                "PhysicsWorld is disposed".into(),
            ));
        }
        Ok(())
    }

    // Configuration

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn gravity(&self) -> Vec3 {
        self.config.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vec3) -> PhysicsResult<()> {
        if !gravity.is_finite() {
            return Err(PhysicsError::invalid(format!("gravity must be finite, got {gravity:?}")));
        }
        self.config.gravity = gravity;
        Ok(())
    }

    pub fn set_time_step(&mut self, time_step: f32) -> PhysicsResult<()> {
        if !(time_step > 0.0 && time_step.is_finite()) {
            return Err(PhysicsError::invalid(format!(
                "time step must be positive, got {time_step}"
            )));
        }
        self.config.time_step = time_step;
        Ok(())
    }

    pub fn set_solver_iterations(&mut self, iterations: usize) -> PhysicsResult<()> {
        if iterations == 0 {
            return Err(PhysicsError::invalid("solver iterations must be at least 1"));
        }
        self.config.solver_iterations = iterations;
        Ok(())
    }

    // Rigid bodies

    /// Registers `body` under a fresh id and returns it
    pub fn add_rigid_body(&mut self, mut body: RigidBody) -> PhysicsResult<ObjectId> {
        self.ensure_alive()?;
        let id = self.ids.next_object();
        body.set_id(id);
        self.body_index.insert(id, self.bodies.len());
        self.bodies.push(body);
        debug!(%id, "added rigid body");
        Ok(id)
    }

    /// Removes a body together with every constraint attached to it
    pub fn remove_rigid_body(&mut self, id: ObjectId) -> PhysicsResult<RigidBody> {
        self.ensure_alive()?;
        let index = self
            .body_index
            .remove(&id)
            .ok_or_else(|| PhysicsError::InvalidOperation(format!("no rigid body {id}")))?;
        let body = self.bodies.remove(index);
        self.reindex_bodies();

        let before = self.constraints.len();
        self.constraints
            .retain(|c| c.body_a() != id && c.body_b() != Some(id));
        let dropped = before - self.constraints.len();
        self.forget_pairs(id);
        debug!(%id, dropped_constraints = dropped, "removed rigid body");
        Ok(body)
    }

    fn reindex_bodies(&mut self) {
        self.body_index = self
            .bodies
            .iter()
            .enumerate()
            .map(|(i, body)| (body.id(), i))
            .collect();
    }

    pub fn rigid_body(&self, id: ObjectId) -> Option<&RigidBody> {
        self.body_index.get(&id).and_then(|&i| self.bodies.get(i))
    }

    pub fn rigid_body_mut(&mut self, id: ObjectId) -> Option<&mut RigidBody> {
        let index = *self.body_index.get(&id)?;
        self.bodies.get_mut(index)
    }

    pub fn bodies(&self) -> &[RigidBody] {
        &self.bodies
    }

    pub fn num_bodies(&self) -> usize {
        self.bodies.len()
    }

    // Constraints

    /// Registers a joint. Both of its bodies must already be in this world.
    pub fn add_constraint(&mut self, constraint: impl Into<Constraint>) -> PhysicsResult<ConstraintId> {
        self.ensure_alive()?;
        let mut constraint = constraint.into();
        let bodies = std::iter::once(constraint.body_a()).chain(constraint.body_b());
        for body in bodies {
            if !self.body_index.contains_key(&body) {
                return Err(PhysicsError::ConstraintCreationFailed(format!(
                    "{} references body {body}, which is not in this world",
                    constraint.kind()
                )));
            }
        }
        let id = ConstraintId(self.next_constraint);
        self.next_constraint = self.next_constraint.wrapping_add(1);
        constraint.base_mut().set_id(id);
        debug!(%id, kind = constraint.kind(), "added constraint");
        self.constraints.push(constraint);
        Ok(id)
    }

    pub fn remove_constraint(&mut self, id: ConstraintId) -> PhysicsResult<Constraint> {
        self.ensure_alive()?;
        let index = self
            .constraints
            .iter()
            .position(|c| c.id() == id)
            .ok_or_else(|| PhysicsError::InvalidOperation(format!("no constraint {id}")))?;
        debug!(%id, "removed constraint");
        Ok(self.constraints.remove(index))
    }

    pub fn constraint(&self, id: ConstraintId) -> Option<&Constraint> {
        self.constraints.iter().find(|c| c.id() == id)
    }

    pub fn constraint_mut(&mut self, id: ConstraintId) -> Option<&mut Constraint> {
        self.constraints.iter_mut().find(|c| c.id() == id)
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    // Collision objects

    pub fn add_collision_object(&mut self, mut object: CollisionObject) -> PhysicsResult<ObjectId> {
        self.ensure_alive()?;
        let id = self.ids.next_object();
        object.set_id(id);
        self.objects.push(object);
        debug!(%id, "added collision object");
        Ok(id)
    }

    pub fn remove_collision_object(&mut self, id: ObjectId) -> PhysicsResult<CollisionObject> {
        self.ensure_alive()?;
        let index = self
            .objects
            .iter()
            .position(|o| o.id() == id)
            .ok_or_else(|| PhysicsError::InvalidOperation(format!("no collision object {id}")))?;
        self.forget_pairs(id);
        debug!(%id, "removed collision object");
        Ok(self.objects.remove(index))
    }

    pub fn collision_object(&self, id: ObjectId) -> Option<&CollisionObject> {
        self.objects.iter().find(|o| o.id() == id)
    }

    pub fn collision_object_mut(&mut self, id: ObjectId) -> Option<&mut CollisionObject> {
        self.objects.iter_mut().find(|o| o.id() == id)
    }

    pub fn collision_objects(&self) -> &[CollisionObject] {
        &self.objects
    }

    // Characters

    pub fn add_character(&mut self, mut character: CharacterController) -> PhysicsResult<ObjectId> {
        self.ensure_alive()?;
        let id = self.ids.next_object();
        character.set_id(id);
        self.characters.push(character);
        debug!(%id, "added character controller");
        Ok(id)
    }

    pub fn remove_character(&mut self, id: ObjectId) -> PhysicsResult<CharacterController> {
        self.ensure_alive()?;
        let index = self
            .characters
            .iter()
            .position(|c| c.id() == id)
            .ok_or_else(|| PhysicsError::InvalidOperation(format!("no character {id}")))?;
        debug!(%id, "removed character controller");
        Ok(self.characters.remove(index))
    }

    pub fn character(&self, id: ObjectId) -> Option<&CharacterController> {
        self.characters.iter().find(|c| c.id() == id)
    }

    pub fn character_mut(&mut self, id: ObjectId) -> Option<&mut CharacterController> {
        self.characters.iter_mut().find(|c| c.id() == id)
    }

    pub fn characters(&self) -> &[CharacterController] {
        &self.characters
    }

    /// Position of a body or collision object
    pub fn object_position(&self, id: ObjectId) -> Option<Vec3> {
        self.rigid_body(id)
            .map(RigidBody::position)
            .or_else(|| self.collision_object(id).map(CollisionObject::position))
    }

    // Callbacks

    /// Called for every non-trigger pair touching after a step
    pub fn on_collision(&mut self, handler: impl FnMut(&CollisionContact) + 'static) {
        self.collision_handlers.push(Box::new(handler));
    }

    /// Called for every pair with a trigger side overlapping after a step
    pub fn on_trigger_enter(&mut self, handler: impl FnMut(ObjectId, ObjectId) + 'static) {
        self.trigger_handlers.push(Box::new(handler));
    }

    pub fn set_collision_callback(&mut self, callback: Box<dyn CollisionCallback>) {
        self.collision_callback = Some(callback);
    }

    pub fn clear_collision_callback(&mut self) {
        self.collision_callback = None;
    }

    // Lifecycle

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Seconds simulated so far
    pub fn simulation_time(&self) -> f32 {
        self.time
    }

    /// Drops every body, constraint, object, character and callback
    pub fn reset(&mut self) {
        self.bodies.clear();
        self.body_index.clear();
        self.constraints.clear();
        self.objects.clear();
        self.characters.clear();
        self.collision_handlers.clear();
        self.trigger_handlers.clear();
        self.collision_callback = None;
        self.active_pairs.clear();
        self.paused = false;
        self.time = 0.0;
        self.accumulator = 0.0;
        info!("reset physics world");
    }

    pub fn dispose(&mut self) {
        self.reset();
        self.disposed = true;
        info!("disposed physics world");
    }

    // Stepping

    /// Advances the simulation by `dt` seconds.
    ///
    /// Order: gravity and forces into velocities, constraint passes,
    /// velocities into transforms, pair detection and callbacks, then
    /// character controllers.
    pub fn step(&mut self, dt: f32) -> PhysicsResult<()> {
        self.ensure_alive()?;
        if !(dt >= 0.0) || !dt.is_finite() {
            warn!(dt, "rejected time step");
            return Err(PhysicsError::invalid(format!(
                "delta time must be non-negative, got {dt}"
            )));
        }
        if self.paused {
            return Ok(());
        }

        let gravity = self.config.gravity;
        for body in &mut self.bodies {
            apply_gravity(body, gravity);
            integrate_velocities(body, dt);
        }

        self.solve_constraints(dt);

        for body in &mut self.bodies {
            integrate_positions(body, dt);
        }

        let contacts = self.detect_collisions();
        let pairs = contacts.len();
        self.dispatch_contacts(contacts);
        self.update_characters(dt);

        self.time += dt;
        trace!(
            dt,
            bodies = self.bodies.len(),
            constraints = self.constraints.len(),
            pairs,
            "stepped world"
        );
        Ok(())
    }

    /// Steps in fixed `time_step` increments, carrying the remainder to the
    /// next call. Returns how many substeps ran.
    pub fn step_fixed(&mut self, elapsed: f32) -> PhysicsResult<usize> {
        self.ensure_alive()?;
        if !(elapsed >= 0.0) || !elapsed.is_finite() {
            return Err(PhysicsError::invalid(format!(
                "elapsed time must be non-negative, got {elapsed}"
            )));
        }
        if self.paused {
            return Ok(0);
        }

        let step = self.config.time_step;
        self.accumulator += elapsed;
        let mut substeps = 0;
        while self.accumulator >= step && substeps < self.config.max_substeps {
            self.step(step)?;
            self.accumulator -= step;
            substeps += 1;
        }
        // Drop time the substep budget could not cover
        if self.accumulator >= step {
            self.accumulator %= step;
        }
        Ok(substeps)
    }

    fn solve_constraints(&mut self, dt: f32) {
        if self.constraints.is_empty() {
            return;
        }
        let Self {
            constraints,
            bodies,
            body_index,
            config,
            ..
        } = self;

        for constraint in constraints.iter_mut() {
            constraint.begin_step();
        }
        for _ in 0..config.solver_iterations {
            for constraint in constraints.iter_mut().filter(|c| c.is_enabled()) {
                let Some(&a) = body_index.get(&constraint.body_a()) else {
                    continue;
                };
                match constraint.body_b() {
                    None => {
                        if let Some(body_a) = bodies.get_mut(a) {
                            constraint.solve(body_a, None, dt);
                        }
                    }
                    Some(id) => {
                        let Some(&b) = body_index.get(&id) else {
                            continue;
                        };
                        if let Some((body_a, body_b)) = pair_mut(bodies, a, b) {
                            constraint.solve(body_a, Some(body_b), dt);
                        }
                    }
                }
            }
        }
    }

    /// Pairwise test over bodies and collision objects. Returns each
    /// touching pair with whether either side is a trigger.
    fn detect_collisions(&self) -> Vec<(CollisionContact, bool)> {
        let participants: Vec<Participant<'_>> = self
            .bodies
            .iter()
            .map(Participant::body)
            .chain(self.objects.iter().map(Participant::object))
            .collect();

        let mut contacts = Vec::new();
        for (i, a) in participants.iter().enumerate() {
            for b in &participants[i + 1..] {
                if let Some(contact) = detect_pair(a, b) {
                    let trigger = a.object.is_trigger || b.object.is_trigger;
                    contacts.push((contact, trigger));
                }
            }
        }
        contacts
    }

    fn dispatch_contacts(&mut self, contacts: Vec<(CollisionContact, bool)>) {
        let mut touching = HashSet::with_capacity(contacts.len());

        for (contact, trigger) in &contacts {
            if *trigger {
                for handler in &mut self.trigger_handlers {
                    handler(contact.object_a, contact.object_b);
                }
                continue;
            }

            for handler in &mut self.collision_handlers {
                handler(contact);
            }
            let pair = ObjectPair::new(contact.object_a, contact.object_b);
            if let Some(callback) = self.collision_callback.as_mut() {
                if self.active_pairs.contains(&pair) {
                    callback.on_contact_processed(contact);
                } else {
                    callback.on_contact_added(contact);
                }
            }
            touching.insert(pair);
        }

        if let Some(callback) = self.collision_callback.as_mut() {
            for pair in self.active_pairs.difference(&touching) {
                callback.on_contact_destroyed(pair.a, pair.b);
            }
        }
        self.active_pairs = touching;
    }

    /// Ends every tracked contact involving `id`
    fn forget_pairs(&mut self, id: ObjectId) {
        let ended: Vec<ObjectPair> = self
            .active_pairs
            .iter()
            .filter(|pair| pair.a == id || pair.b == id)
            .copied()
            .collect();
        for pair in ended {
            self.active_pairs.remove(&pair);
            if let Some(callback) = self.collision_callback.as_mut() {
                callback.on_contact_destroyed(pair.a, pair.b);
            }
        }
    }

    fn update_characters(&mut self, dt: f32) {
        if self.characters.is_empty() {
            return;
        }
        let mut characters = std::mem::take(&mut self.characters);
        for character in &mut characters {
            character.update(self, dt);
        }
        self.characters = characters;
    }

    // Queries

    /// Bodies followed by standalone collision objects
    fn scene_objects(&self) -> impl Iterator<Item = &CollisionObject> + '_ {
        self.bodies
            .iter()
            .map(RigidBody::collision_object)
            .chain(self.objects.iter())
    }

    /// Nearest hit along the segment `from -> to`
    pub fn raycast(&self, from: Vec3, to: Vec3, groups: i32) -> PhysicsResult<RaycastResult> {
        self.ensure_alive()?;
        Ok(self.cast_ray(from, to, groups, false))
    }

    pub(crate) fn cast_ray(&self, from: Vec3, to: Vec3, groups: i32, skip_triggers: bool) -> RaycastResult {
        let delta = to - from;
        let length = delta.length();
        let Some(direction) = delta.try_normalize() else {
            return RaycastResult::miss();
        };

        let mut best = RaycastResult::miss();
        for object in self.scene_objects() {
            if (skip_triggers && object.is_trigger) || !object.matches_groups(groups) {
                continue;
            }
            let (Some(shape), Some(bounds)) = (object.shape(), object.world_aabb()) else {
                continue;
            };
            let limit = if best.has_hit { best.distance } else { length };
            if bounds.ray_entry(from, direction, limit).is_none() {
                continue;
            }
            if let Some(hit) = ray_test(shape, object.transform(), from, direction, limit) {
                if !best.has_hit || hit.t < best.distance {
                    best = RaycastResult {
                        has_hit: true,
                        hit_object: Some(object.id()),
                        hit_point: from + direction * hit.t,
                        hit_normal: hit.normal,
                        hit_fraction: hit.t / length,
                        distance: hit.t,
                    };
                }
            }
        }
        best
    }

    /// Every object overlapping a ball at `center`
    pub fn sphere_cast(&self, center: Vec3, radius: f32, groups: i32) -> PhysicsResult<Vec<ObjectId>> {
        self.ensure_alive()?;
        check_radius(radius)?;
        let ball = Ball { center, radius };
        let bounds = Aabb::from_center_half_extents(center, Vec3::splat(radius));
        Ok(self.collect_touching(&ball, bounds, groups))
    }

    /// Every object overlapping an oriented box
    pub fn box_cast(
        &self,
        center: Vec3,
        half_extents: Vec3,
        rotation: Quat,
        groups: i32,
    ) -> PhysicsResult<Vec<ObjectId>> {
        self.ensure_alive()?;
        let mut shape = CollisionShape::cuboid(half_extents)?;
        shape.as_dyn_mut().set_margin(0.0)?;
        let transform = Mat4::from_translation_rotation(center, rotation);
        self.overlaps(&shape, &transform, groups)
    }

    /// Every object overlapping `shape` placed at `transform`
    pub fn overlaps(
        &self,
        shape: &CollisionShape,
        transform: &Mat4,
        groups: i32,
    ) -> PhysicsResult<Vec<ObjectId>> {
        self.ensure_alive()?;
        let bounds = shape.bounding_box().transformed(transform);
        if !shape.is_convex() {
            return Ok(self
                .scene_objects()
                .chain(self.characters.iter().map(CharacterController::collision_object))
                .filter(|o| o.matches_groups(groups))
                .filter(|o| o.world_aabb().is_some_and(|b| b.intersects(bounds)))
                .map(CollisionObject::id)
                .collect());
        }
        let placed = WorldShape::new(shape.as_dyn(), transform);
        Ok(self.collect_touching(&placed, bounds, groups))
    }

    fn collect_touching(&self, query: &impl SupportMap, bounds: Aabb, groups: i32) -> Vec<ObjectId> {
        self.scene_objects()
            .chain(self.characters.iter().map(CharacterController::collision_object))
            .filter(|o| o.matches_groups(groups))
            .filter(|o| touches(query, bounds, o))
            .map(CollisionObject::id)
            .collect()
    }

    /// Rigid bodies overlapping a ball
    pub fn overlap_sphere(&self, center: Vec3, radius: f32, groups: i32) -> PhysicsResult<Vec<ObjectId>> {
        self.ensure_alive()?;
        check_radius(radius)?;
        let ball = Ball { center, radius };
        let bounds = Aabb::from_center_half_extents(center, Vec3::splat(radius));
        Ok(self
            .bodies
            .iter()
            .map(RigidBody::collision_object)
            .filter(|o| o.matches_groups(groups))
            .filter(|o| touches(&ball, bounds, o))
            .map(CollisionObject::id)
            .collect())
    }

    /// Sweeps a ball from `from` to `to` and reports the first object it
    /// touches. A ball already overlapping something hits at fraction 0.
    pub fn spherecast(&self, from: Vec3, to: Vec3, radius: f32, groups: i32) -> PhysicsResult<RaycastResult> {
        self.ensure_alive()?;
        check_radius(radius)?;
        let motion = to - from;
        let length = motion.length();
        let ball = Ball { center: from, radius };
        let half = Vec3::splat(radius);
        let swept = Aabb::from_center_half_extents(from, half)
            .union(Aabb::from_center_half_extents(to, half));
        let march = radius.max(0.05);

        let mut best: Option<(f32, &CollisionObject)> = None;
        for object in self.scene_objects() {
            if !object.matches_groups(groups) {
                continue;
            }
            if !object.world_aabb().is_some_and(|b| b.intersects(swept)) {
                continue;
            }
            let Some(placed) = object.world_shape() else {
                continue;
            };
            if let Some(t) = gjk::time_of_impact(&ball, motion, &placed, march) {
                if best.map_or(true, |(best_t, _)| t < best_t) {
                    best = Some((t, object));
                }
            }
        }

        let Some((t, object)) = best else {
            return Ok(RaycastResult::miss());
        };
        let center = from + motion * t;
        let normal = motion
            .try_normalize()
            .and_then(|dir| {
                let shape = object.shape()?;
                let reach = radius * 2.0 + shape.margin() + 1e-3;
                ray_test(shape, object.transform(), center, dir, reach).map(|hit| hit.normal)
            })
            .or_else(|| (center - object.position()).try_normalize())
            .unwrap_or(Vec3::Y);

        Ok(RaycastResult {
            has_hit: true,
            hit_object: Some(object.id()),
            hit_point: center - normal * radius,
            hit_normal: normal,
            hit_fraction: t,
            distance: t * length,
        })
    }
}

fn check_radius(radius: f32) -> PhysicsResult<()> {
    if radius.is_nan() || radius < 0.0 {
        return Err(PhysicsError::invalid(format!(
            "radius must be non-negative, got {radius}"
        )));
    }
    Ok(())
}
