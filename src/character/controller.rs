use crate::collision::{CollisionObject, ObjectId};
use crate::error::{ensure_range, PhysicsError, PhysicsResult};
use crate::geometry::{CollisionShape, SharedShape};
use crate::math::{Mat4, Quat, Vec3};
use crate::world::PhysicsWorld;

use super::settings::{CharacterState, CollisionSettings, MovementSettings, PushMode, TimingSettings};

const MAX_SLIDE_ITERATIONS: usize = 4;
const MIN_MOVE: f32 = 1e-3;
/// Fraction of the external velocity kept after each step
const EXTERNAL_VELOCITY_DECAY: f32 = 0.95;

/// Result of sweeping the character's extent through the world
#[derive(Debug, Clone, Copy)]
struct Sweep {
    hit: bool,
    distance: f32,
    normal: Vec3,
    object: Option<ObjectId>,
}

impl Sweep {
    fn miss(distance: f32) -> Self {
        Self {
            hit: false,
            distance,
            normal: Vec3::Y,
            object: None,
        }
    }
}

fn slope_angle(normal: Vec3) -> f32 {
    normal.dot(Vec3::Y).clamp(-1.0, 1.0).acos()
}

/// `(radius, height)` of the shape as seen by the movement sweeps
fn dimensions(shape: &CollisionShape) -> (f32, f32) {
    match shape {
        CollisionShape::Capsule(c) => (c.radius(), c.height() + 2.0 * c.radius()),
        CollisionShape::Sphere(s) => (s.radius(), 2.0 * s.radius()),
        CollisionShape::Box(b) => {
            let h = b.half_extents();
            (h.x.min(h.z), 2.0 * h.y)
        }
        _ => (0.5, 1.8),
    }
}

/// Kinematic walker driven by explicit movement input rather than forces.
///
/// `position` is the character's foot point; its shape is centered half
/// its height above that. The controller only reads the world: it probes
/// the ground and sweeps its movement with rays, ignoring triggers.
#[derive(Debug)]
pub struct CharacterController {
    object: CollisionObject,
    position: Vec3,
    radius: f32,
    height: f32,

    movement: MovementSettings,
    collision: CollisionSettings,
    timing: TimingSettings,

    walk_direction: Vec3,
    external_velocity: Vec3,
    external_time_left: f32,
    vertical_velocity: f32,

    on_ground: bool,
    can_jump: bool,
    was_jumping: bool,
    jump_timeout: f32,

    ground_normal: Vec3,
    ground_object: Option<ObjectId>,
    ground_distance: f32,

    current_platform: Option<ObjectId>,
    last_platform_position: Option<Vec3>,
    platform_velocity: Vec3,
    last_dt: f32,
}

impl CharacterController {
    pub fn new(shape: SharedShape, step_height: f32, position: Vec3) -> PhysicsResult<Self> {
        ensure_range("step height", step_height, 0.0, f32::MAX)?;
        if !position.is_finite() {
            return Err(PhysicsError::invalid("character position must be finite"));
        }
        let (radius, height) = dimensions(shape.as_ref());
        let mut controller = Self {
            object: CollisionObject::new(Some(shape)),
            position,
            radius,
            height,
            movement: MovementSettings {
                step_height,
                ..MovementSettings::default()
            },
            collision: CollisionSettings::default(),
            timing: TimingSettings::default(),
            walk_direction: Vec3::ZERO,
            external_velocity: Vec3::ZERO,
            external_time_left: 0.0,
            vertical_velocity: 0.0,
            on_ground: false,
            can_jump: true,
            was_jumping: false,
            jump_timeout: 0.0,
            ground_normal: Vec3::Y,
            ground_object: None,
            ground_distance: f32::MAX,
            current_platform: None,
            last_platform_position: None,
            platform_velocity: Vec3::ZERO,
            last_dt: 1.0 / 60.0,
        };
        controller.sync_object();
        Ok(controller)
    }

    pub fn id(&self) -> ObjectId {
        self.object.id()
    }

    pub(crate) fn set_id(&mut self, id: ObjectId) {
        self.object.set_id(id);
    }

    pub fn collision_object(&self) -> &CollisionObject {
        &self.object
    }

    /// Group and mask changes go through here; the mask filters the sweeps
    pub fn collision_object_mut(&mut self) -> &mut CollisionObject {
        &mut self.object
    }

    pub fn set_shape(&mut self, shape: SharedShape) {
        let (radius, height) = dimensions(shape.as_ref());
        self.radius = radius;
        self.height = height;
        self.object.set_shape(Some(shape));
        self.sync_object();
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    fn center(&self, feet: Vec3) -> Vec3 {
        feet + Vec3::Y * (self.height * 0.5)
    }

    fn sync_object(&mut self) {
        let (rotation, scale) = (self.object.rotation(), self.object.scale());
        let center = self.center(self.position);
        self.object
            .set_transform(Mat4::from_translation_rotation_scale(center, rotation, scale));
    }

    pub fn rotation(&self) -> Quat {
        self.object.rotation()
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        let (translation, scale) = (self.object.position(), self.object.scale());
        self.object
            .set_transform(Mat4::from_translation_rotation_scale(translation, rotation, scale));
    }

    // Settings

    pub fn movement_settings(&self) -> &MovementSettings {
        &self.movement
    }

    pub fn configure_movement(&mut self, settings: MovementSettings) -> PhysicsResult<()> {
        settings.validate()?;
        self.movement = settings;
        Ok(())
    }

    pub fn collision_settings(&self) -> &CollisionSettings {
        &self.collision
    }

    pub fn configure_collision(&mut self, settings: CollisionSettings) -> PhysicsResult<()> {
        settings.validate()?;
        self.collision = settings;
        Ok(())
    }

    pub fn timing_settings(&self) -> &TimingSettings {
        &self.timing
    }

    pub fn configure_timing(&mut self, settings: TimingSettings) -> PhysicsResult<()> {
        settings.validate()?;
        self.timing = settings;
        Ok(())
    }

    pub fn step_height(&self) -> f32 {
        self.movement.step_height
    }

    pub fn set_step_height(&mut self, height: f32) -> PhysicsResult<()> {
        ensure_range("step height", height, 0.0, f32::MAX)?;
        self.movement.step_height = height;
        Ok(())
    }

    pub fn max_slope(&self) -> f32 {
        self.movement.max_slope
    }

    pub fn set_max_slope(&mut self, slope: f32) -> PhysicsResult<()> {
        ensure_range("max slope", slope, 0.0, std::f32::consts::FRAC_PI_2)?;
        self.movement.max_slope = slope;
        Ok(())
    }

    pub fn jump_speed(&self) -> f32 {
        self.movement.jump_speed
    }

    pub fn set_jump_speed(&mut self, speed: f32) -> PhysicsResult<()> {
        ensure_range("jump speed", speed, 0.0, f32::MAX)?;
        self.movement.jump_speed = speed;
        Ok(())
    }

    pub fn fall_speed(&self) -> f32 {
        self.movement.fall_speed
    }

    pub fn set_fall_speed(&mut self, speed: f32) -> PhysicsResult<()> {
        ensure_range("fall speed", speed, 0.0, f32::MAX)?;
        self.movement.fall_speed = speed;
        Ok(())
    }

    // Input

    /// Desired horizontal velocity; the length is the walking speed
    pub fn set_walk_direction(&mut self, direction: Vec3) {
        self.walk_direction = direction;
    }

    pub fn walk_direction(&self) -> Vec3 {
        self.walk_direction
    }

    /// Adds an external velocity that decays each step and stops after
    /// `interval` seconds
    pub fn set_velocity_for_time_interval(&mut self, velocity: Vec3, interval: f32) {
        self.external_velocity = velocity;
        self.external_time_left = interval.max(0.0);
    }

    pub fn external_velocity(&self) -> Vec3 {
        self.external_velocity
    }

    pub fn push_character(&mut self, force: Vec3, mode: PushMode) {
        self.external_velocity = match mode {
            PushMode::Force => self.external_velocity + force * 0.1,
            PushMode::Impulse => self.external_velocity + force,
            PushMode::VelocityChange => force,
        };
        self.external_time_left = f32::INFINITY;
    }

    pub fn on_ground(&self) -> bool {
        self.on_ground
    }

    pub fn vertical_velocity(&self) -> f32 {
        self.vertical_velocity
    }

    /// Grounded, or airborne within the coyote window, and not mid-jump
    pub fn can_jump(&self) -> bool {
        self.can_jump && (self.on_ground || self.jump_timeout > 0.0)
    }

    /// Starts a jump if allowed. A non-vertical `direction` adds a
    /// horizontal push of half the jump speed.
    pub fn jump(&mut self, direction: Vec3) -> bool {
        if !self.can_jump() {
            return false;
        }
        self.vertical_velocity = self.movement.jump_speed;
        self.was_jumping = true;
        self.jump_timeout = 0.0;
        self.on_ground = false;
        self.can_jump = false;

        let horizontal = Vec3::new(direction.x, 0.0, direction.z);
        if let Some(dir) = horizontal.try_normalize() {
            self.external_velocity = dir * (self.movement.jump_speed * 0.5);
            self.external_time_left = f32::INFINITY;
        }
        true
    }

    /// Moves to `origin` and drops ground contact and vertical speed
    pub fn warp(&mut self, origin: Vec3) {
        self.position = origin;
        self.vertical_velocity = 0.0;
        self.on_ground = false;
        self.ground_object = None;
        self.sync_object();
    }

    pub fn teleport(&mut self, position: Vec3, reset_velocity: bool) {
        self.warp(position);
        if reset_velocity {
            self.external_velocity = Vec3::ZERO;
            self.external_time_left = 0.0;
            self.vertical_velocity = 0.0;
        }
    }

    pub fn character_state(&self) -> CharacterState {
        CharacterState {
            position: self.position,
            on_ground: self.on_ground,
            can_jump: self.can_jump,
            vertical_velocity: self.vertical_velocity,
            ground_normal: self.ground_normal,
            ground_distance: self.ground_distance,
            platform_velocity: self.platform_velocity,
            current_platform: self.current_platform,
        }
    }

    // Stepping

    /// One fixed step: ground probe, then movement
    pub fn update(&mut self, world: &PhysicsWorld, dt: f32) {
        self.pre_step(world);
        self.player_step(world, dt);
    }

    /// Refreshes platform tracking, ground contact and the jump state
    pub fn pre_step(&mut self, world: &PhysicsWorld) {
        self.update_platform(world);
        self.check_ground(world);
        if self.on_ground && self.was_jumping && self.vertical_velocity <= 0.0 {
            self.was_jumping = false;
        }
        if self.on_ground && !self.was_jumping {
            self.can_jump = true;
        }
    }

    pub fn player_step(&mut self, world: &PhysicsWorld, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        self.last_dt = dt;

        if !self.on_ground || self.vertical_velocity > 0.0 {
            self.vertical_velocity = (self.vertical_velocity + self.movement.gravity * dt)
                .max(-self.movement.fall_speed);
        } else {
            self.vertical_velocity = 0.0;
        }

        let mut movement = Vec3::ZERO;
        let walk = Vec3::new(self.walk_direction.x, 0.0, self.walk_direction.z);
        if let Some(direction) = walk.try_normalize() {
            let speed = self.walk_direction.length();
            let control = if self.on_ground { 1.0 } else { self.movement.air_control };
            movement += direction * (speed * dt * control);
        }

        if self.external_velocity.length() > MIN_MOVE {
            movement += self.external_velocity * dt;
            self.external_velocity = self.external_velocity * EXTERNAL_VELOCITY_DECAY;
            self.external_time_left -= dt;
            if self.external_time_left <= 0.0 {
                self.external_velocity = Vec3::ZERO;
            }
        }

        movement.y += self.vertical_velocity * dt;

        if self.current_platform.is_some() && self.on_ground {
            movement += self.platform_velocity * dt;
        }

        let mut position = self.position;
        let horizontal = Vec3::new(movement.x, 0.0, movement.z);
        if horizontal.length() > MIN_MOVE {
            position = self.move_horizontal(world, position, horizontal);
        }
        if movement.y.abs() > MIN_MOVE {
            position = self.move_vertical(world, position, movement.y);
        }
        self.position = position;
        self.sync_object();
        self.update_timers(dt);
    }

    fn update_platform(&mut self, world: &PhysicsWorld) {
        let ground_position = self.ground_object.and_then(|id| world.object_position(id));
        if self.ground_object == self.current_platform {
            self.platform_velocity = match (ground_position, self.last_platform_position) {
                (Some(now), Some(before)) => (now - before) / self.last_dt,
                _ => Vec3::ZERO,
            };
        } else {
            self.current_platform = self.ground_object;
            self.platform_velocity = Vec3::ZERO;
        }
        self.last_platform_position = ground_position;
    }

    fn check_ground(&mut self, world: &PhysicsWorld) {
        let step = self.movement.step_height;
        let from = self.position + Vec3::Y * step;
        let to = self.position - Vec3::Y * (step + self.collision.skin_width);
        let hit = world.cast_ray(from, to, self.object.collision_mask, true);
        let was_on_ground = self.on_ground;

        if hit.has_hit {
            self.ground_distance = hit.distance - step;
            self.ground_normal = hit.hit_normal;
            self.ground_object = hit.hit_object;
            let walkable = slope_angle(hit.hit_normal) <= self.movement.max_slope;
            // Still rising from a jump
            let ascending = self.vertical_velocity > 0.0;
            if walkable && !ascending && self.ground_distance <= self.collision.skin_width {
                self.on_ground = true;
                if !was_on_ground {
                    self.can_jump = true;
                    self.was_jumping = false;
                }
            } else {
                self.on_ground = false;
                self.ground_object = None;
            }
        } else {
            self.on_ground = false;
            self.ground_object = None;
            self.ground_distance = f32::MAX;
        }

        if was_on_ground && !self.on_ground && !self.was_jumping {
            self.jump_timeout = self.timing.coyote_time;
        }
    }

    fn update_timers(&mut self, dt: f32) {
        if self.jump_timeout > 0.0 {
            self.jump_timeout -= dt;
            if self.jump_timeout <= 0.0 {
                self.jump_timeout = 0.0;
                if !self.on_ground {
                    self.can_jump = false;
                }
            }
        }
    }

    /// Casts the character's extent from `from` toward `to`.
    ///
    /// The ray leaves the shape center and is lengthened by the distance
    /// from the center to the shape surface along the direction: half the
    /// height vertically, the radius horizontally.
    fn sweep(&self, world: &PhysicsWorld, from: Vec3, to: Vec3) -> Sweep {
        let delta = to - from;
        let distance = delta.length();
        let Some(direction) = delta.try_normalize() else {
            return Sweep::miss(distance);
        };
        let vertical = direction.y.abs();
        let extent = vertical * self.height * 0.5
            + (1.0 - vertical * vertical).max(0.0).sqrt() * self.radius;

        let start = self.center(from);
        let end = start + direction * (distance + extent);
        let hit = world.cast_ray(start, end, self.object.collision_mask, true);
        if hit.has_hit {
            Sweep {
                hit: true,
                distance: (hit.distance - extent).max(0.0),
                normal: hit.hit_normal,
                object: hit.hit_object,
            }
        } else {
            Sweep::miss(distance)
        }
    }

    /// Slides along whatever blocks the move, keeping the motion horizontal
    fn move_horizontal(&self, world: &PhysicsWorld, start: Vec3, movement: Vec3) -> Vec3 {
        let Some(mut direction) = movement.try_normalize() else {
            return start;
        };
        let mut remaining = movement.length();
        let mut position = start;

        for _ in 0..MAX_SLIDE_ITERATIONS {
            if remaining <= MIN_MOVE {
                break;
            }
            let target = position + direction * remaining;
            let sweep = self.sweep(world, position, target);
            if !sweep.hit {
                position = target;
                break;
            }

            let safe = sweep.distance - self.collision.skin_width;
            if safe > MIN_MOVE {
                position += direction * safe;
                remaining -= safe;
            }

            let slide = direction.project_on_plane(sweep.normal);
            match Vec3::new(slide.x, 0.0, slide.z).try_normalize() {
                Some(next) if next.dot(direction) > MIN_MOVE => direction = next,
                _ => break,
            }
        }
        position
    }

    fn move_vertical(&mut self, world: &PhysicsWorld, start: Vec3, dy: f32) -> Vec3 {
        let direction = if dy > 0.0 { Vec3::Y } else { -Vec3::Y };
        let target = start + Vec3::Y * dy;
        let sweep = self.sweep(world, start, target);

        if !sweep.hit {
            if dy < 0.0 && self.on_ground {
                self.on_ground = false;
                self.jump_timeout = self.timing.coyote_time;
            }
            return target;
        }

        // Landings keep half the skin so the next ground probe sees the floor
        let gap = if dy < 0.0 {
            self.collision.skin_width * 0.5
        } else {
            self.collision.skin_width
        };
        let position = start + direction * (sweep.distance - gap).max(0.0);
        if dy < 0.0 {
            if slope_angle(sweep.normal) <= self.movement.max_slope {
                self.on_ground = true;
                self.ground_normal = sweep.normal;
                self.ground_object = sweep.object;
                self.vertical_velocity = 0.0;
            }
        } else {
            // Ceiling
            self.vertical_velocity = 0.0;
        }
        position
    }

    /// True when nothing blocks a straight move to `target`
    pub fn can_move_to(&self, world: &PhysicsWorld, target: Vec3) -> bool {
        !self.sweep(world, self.position, target).hit
    }

    /// Furthest point toward `target` the character can reach in a
    /// straight line, backed off by the skin width
    pub fn closest_walkable_position(&self, world: &PhysicsWorld, target: Vec3) -> Vec3 {
        let sweep = self.sweep(world, self.position, target);
        if !sweep.hit {
            return target;
        }
        let direction = (target - self.position).try_normalize().unwrap_or(Vec3::ZERO);
        self.position + direction * (sweep.distance - self.collision.skin_width).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::CharacterController as Controller;
    use crate::world::{PhysicsWorld, WorldConfig};

    const DT: f32 = 1.0 / 60.0;

    /// Static 20x1x20 slab; with the box margin its surface is at y = 0.04
    fn world_with_ground() -> (PhysicsWorld, ObjectId) {
        let mut world = PhysicsWorld::new(WorldConfig::default()).unwrap();
        let ground = CollisionObject::new(Some(
            CollisionShape::cuboid(Vec3::new(10.0, 0.5, 10.0)).unwrap().into_shared(),
        ))
        .with_position(Vec3::new(0.0, -0.5, 0.0));
        let id = world.add_collision_object(ground).unwrap();
        (world, id)
    }

    fn humanoid(position: Vec3) -> Controller {
        let shape = CollisionShape::capsule(0.3, 1.2).unwrap().into_shared();
        Controller::new(shape, 0.35, position).unwrap()
    }

    fn run(c: &mut Controller, world: &PhysicsWorld, steps: usize) {
        for _ in 0..steps {
            c.update(world, DT);
        }
    }

    #[test]
    fn test_dimensions_from_capsule() {
        let c = humanoid(Vec3::ZERO);
        assert!((c.radius() - 0.3).abs() < 1e-6);
        assert!((c.height() - 1.8).abs() < 1e-6);
        // Shape center sits half the height above the feet
        assert!((c.collision_object().position().y - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_grounded_at_rest() {
        let (world, ground) = world_with_ground();
        let mut c = humanoid(Vec3::ZERO);
        run(&mut c, &world, 30);
        assert!(c.on_ground());
        assert!(c.position().y.abs() < 1e-4);
        assert_eq!(c.vertical_velocity(), 0.0);
        assert_eq!(c.character_state().current_platform, Some(ground));
    }

    #[test]
    fn test_falls_and_lands() {
        let (world, _) = world_with_ground();
        let mut c = humanoid(Vec3::new(0.0, 2.0, 0.0));
        run(&mut c, &world, 120);
        assert!(c.on_ground());
        // Comes to rest within a skin width of the surface
        let skin = c.collision_settings().skin_width;
        assert!(c.position().y >= 0.04 - 1e-4);
        assert!(c.position().y <= 0.04 + skin + 1e-3);
    }

    #[test]
    fn test_fall_speed_is_clamped() {
        let world = PhysicsWorld::new(WorldConfig::default()).unwrap();
        let mut c = humanoid(Vec3::new(0.0, 100.0, 0.0));
        run(&mut c, &world, 300);
        assert!((c.vertical_velocity() + c.fall_speed()).abs() < 1e-4);
    }

    #[test]
    fn test_walks_on_ground() {
        let (world, _) = world_with_ground();
        let mut c = humanoid(Vec3::ZERO);
        c.set_walk_direction(Vec3::new(3.0, 0.0, 0.0));
        run(&mut c, &world, 60);
        assert!((c.position().x - 3.0).abs() < 0.1);
        assert!(c.on_ground());
    }

    #[test]
    fn test_wall_blocks_and_slides() {
        let (mut world, _) = world_with_ground();
        let wall = CollisionObject::new(Some(
            CollisionShape::cuboid(Vec3::new(0.5, 2.0, 10.0)).unwrap().into_shared(),
        ))
        .with_position(Vec3::new(2.5, 2.0, 0.0));
        world.add_collision_object(wall).unwrap();

        let mut c = humanoid(Vec3::ZERO);
        c.set_walk_direction(Vec3::new(3.0, 0.0, 3.0));
        run(&mut c, &world, 60);
        // Wall face at x = 1.96
        assert!(c.position().x < 1.96 - 0.2);
        assert!(c.position().z > 2.0);
    }

    #[test]
    fn test_jump_needs_ground() {
        let world = PhysicsWorld::new(WorldConfig::default()).unwrap();
        let mut c = humanoid(Vec3::new(0.0, 10.0, 0.0));
        c.update(&world, DT);
        assert!(!c.can_jump());
        assert!(!c.jump(Vec3::Y));
    }

    #[test]
    fn test_jump_then_land() {
        let (world, _) = world_with_ground();
        let mut c = humanoid(Vec3::ZERO);
        c.update(&world, DT);
        assert!(c.jump(Vec3::Y));
        assert!(!c.can_jump());
        c.update(&world, DT);
        assert!(c.position().y > 0.0);
        run(&mut c, &world, 120);
        assert!(c.on_ground());
        assert!(c.can_jump());
    }

    #[test]
    fn test_coyote_time() {
        let (mut world, ground) = world_with_ground();
        let mut c = humanoid(Vec3::ZERO);
        c.update(&world, DT);
        assert!(c.on_ground());

        world.remove_collision_object(ground).unwrap();
        c.update(&world, DT);
        assert!(!c.on_ground());
        assert!(c.can_jump());

        run(&mut c, &world, 12);
        assert!(!c.can_jump());
    }

    #[test]
    fn test_push_modes() {
        let mut c = humanoid(Vec3::ZERO);
        c.push_character(Vec3::new(1.0, 0.0, 0.0), PushMode::VelocityChange);
        c.push_character(Vec3::new(1.0, 0.0, 0.0), PushMode::Impulse);
        c.push_character(Vec3::new(10.0, 0.0, 0.0), PushMode::Force);
        assert!((c.external_velocity().x - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_external_velocity_decays() {
        let world = PhysicsWorld::new(WorldConfig::default()).unwrap();
        let mut c = humanoid(Vec3::ZERO);
        c.configure_movement(MovementSettings {
            gravity: 0.0,
            ..MovementSettings::default()
        })
        .unwrap();
        c.set_velocity_for_time_interval(Vec3::new(2.0, 0.0, 0.0), 10.0);
        c.update(&world, DT);
        assert!((c.external_velocity().x - 1.9).abs() < 1e-5);
        assert!(c.position().x > 0.0);
    }

    #[test]
    fn test_teleport_resets_motion() {
        let mut c = humanoid(Vec3::ZERO);
        c.push_character(Vec3::new(4.0, 0.0, 0.0), PushMode::VelocityChange);
        c.teleport(Vec3::new(5.0, 1.0, 0.0), true);
        assert_eq!(c.position(), Vec3::new(5.0, 1.0, 0.0));
        assert_eq!(c.external_velocity(), Vec3::ZERO);
        assert!(!c.on_ground());
    }

    #[test]
    fn test_can_move_to_and_closest_walkable() {
        let (mut world, _) = world_with_ground();
        let wall = CollisionObject::new(Some(
            CollisionShape::cuboid(Vec3::new(0.5, 2.0, 10.0)).unwrap().into_shared(),
        ))
        .with_position(Vec3::new(2.5, 2.0, 0.0));
        world.add_collision_object(wall).unwrap();

        let c = humanoid(Vec3::new(0.0, 0.1, 0.0));
        assert!(c.can_move_to(&world, Vec3::new(0.0, 0.1, 1.0)));
        assert!(!c.can_move_to(&world, Vec3::new(5.0, 0.1, 0.0)));

        let p = c.closest_walkable_position(&world, Vec3::new(5.0, 0.1, 0.0));
        // Face at 1.96, backed off by radius and skin
        assert!((p.x - (1.96 - 0.3 - 0.08)).abs() < 1e-3);
    }

    #[test]
    fn test_rejects_bad_settings() {
        let mut c = humanoid(Vec3::ZERO);
        assert!(c.set_max_slope(3.0).is_err());
        assert!(c.set_step_height(-1.0).is_err());
        assert!(c
            .configure_timing(TimingSettings {
                coyote_time: -1.0,
                ..TimingSettings::default()
            })
            .is_err());
    }
}
