//! Straight-line steering, circle separation and map clamping.
//!
//! The kernel works on anything implementing [`Movable`]. Bodies are visited in
//! slice order on every pass, so identical inputs give identical outputs.

use shared::{MAP_HEIGHT, MAP_WIDTH};

/// Pushes overlapping bodies apart by this fraction of their overlap per pass.
pub const SEPARATION_FORCE: f32 = 1.0;
/// Relaxation passes per tick.
pub const SEPARATION_PASSES: usize = 3;

const EPSILON: f32 = 1e-6;

///Represents a vector in 2D space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub fn new(x: f32, y: f32) -> Self {
        Vector2 { x, y }
    }

    ///Returns the magnitude of the vector.
    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    ///Returns the normalized vector.
    pub fn normalize(&self) -> Vector2 {
        let mag = self.magnitude();
        if mag == 0.0 {
            Vector2 { x: 0.0, y: 0.0 }
        } else {
            Vector2 {
                x: self.x / mag,
                y: self.y / mag,
            }
        }
    }

    ///Returns the scaled vector.
    pub fn scale(&self, scalar: f32) -> Vector2 {
        Vector2 {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }

    ///Returns the sum of two vectors.
    pub fn add(&self, other: &Vector2) -> Vector2 {
        Vector2 {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }

    ///Returns the difference `self - other`.
    pub fn sub(&self, other: &Vector2) -> Vector2 {
        Vector2 {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }

    pub fn distance(&self, other: &Vector2) -> f32 {
        self.sub(other).magnitude()
    }
}

/// Axis-aligned rectangle bodies are kept inside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

impl Default for Bounds {
    fn default() -> Self {
        Bounds {
            width: MAP_WIDTH,
            height: MAP_HEIGHT,
        }
    }
}

/// A circle that can steer toward a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    ///The positional center of the circle.
    pub position: Vector2,
    pub radius: f32,
    ///Units per second.
    pub move_speed: f32,
    pub steering_target: Option<Vector2>,
}

impl Body {
    pub fn new(position: Vector2, radius: f32, move_speed: f32) -> Self {
        Body {
            position,
            radius,
            move_speed,
            steering_target: None,
        }
    }

    pub fn overlaps(&self, other: &Body) -> bool {
        self.position.distance(&other.position) < self.radius + other.radius
    }

    /// Moves toward the steering target by at most `move_speed * dt`.
    /// Reaching the target clears it.
    pub fn steer(&mut self, dt: f32) {
        let Some(target) = self.steering_target else {
            return;
        };

        let to_target = target.sub(&self.position);
        let distance = to_target.magnitude();
        let step = self.move_speed * dt;

        if distance <= step || distance < EPSILON {
            self.position = target;
            self.steering_target = None;
        } else {
            self.position = self.position.add(&to_target.normalize().scale(step));
        }
    }

    pub fn clamp_to(&mut self, bounds: &Bounds) {
        self.position.x = clamp_axis(self.position.x, self.radius, bounds.width);
        self.position.y = clamp_axis(self.position.y, self.radius, bounds.height);
    }
}

fn clamp_axis(value: f32, radius: f32, extent: f32) -> f32 {
    if extent < radius * 2.0 {
        return extent / 2.0;
    }
    value.clamp(radius, extent - radius)
}

/// Access to the physical body of a simulated object.
pub trait Movable {
    fn body(&self) -> &Body;
    fn body_mut(&mut self) -> &mut Body;

    /// Inactive bodies are neither moved nor collided.
    fn is_active(&self) -> bool {
        true
    }
}

impl Movable for Body {
    fn body(&self) -> &Body {
        self
    }

    fn body_mut(&mut self) -> &mut Body {
        self
    }
}

/// Pushes one overlapping pair apart symmetrically along the line between centers.
/// Returns true if the pair overlapped.
pub fn separate_pair(a: &mut Body, b: &mut Body) -> bool {
    let delta = b.position.sub(&a.position);
    let distance = delta.magnitude();
    let min_distance = a.radius + b.radius;

    if distance >= min_distance {
        return false;
    }

    // Coincident centers: pick a fixed axis so the result stays deterministic.
    let normal = if distance < EPSILON {
        Vector2::new(1.0, 0.0)
    } else {
        delta.scale(1.0 / distance)
    };

    let overlap = min_distance - distance;
    let push = normal.scale(overlap * SEPARATION_FORCE * 0.5);

    a.position = a.position.sub(&push);
    b.position = b.position.add(&push);
    true
}

/// Runs one relaxation pass over every pair. Returns the number of overlaps found.
pub fn separation_pass<T: Movable>(items: &mut [T]) -> usize {
    let mut overlaps = 0;

    for i in 0..items.len() {
        let (head, tail) = items.split_at_mut(i + 1);
        let first = &mut head[i];
        if !first.is_active() {
            continue;
        }

        for second in tail.iter_mut() {
            if !second.is_active() {
                continue;
            }
            if separate_pair(first.body_mut(), second.body_mut()) {
                overlaps += 1;
            }
        }
    }

    overlaps
}

/// Advances every active body by one tick: steering, separation, then clamping.
pub fn step<T: Movable>(items: &mut [T], dt: f32, bounds: &Bounds) {
    for item in items.iter_mut().filter(|item| item.is_active()) {
        item.body_mut().steer(dt);
    }

    for _ in 0..SEPARATION_PASSES {
        if separation_pass(items) == 0 {
            break;
        }
    }

    for item in items.iter_mut().filter(|item| item.is_active()) {
        item.body_mut().clamp_to(bounds);
    }
}
