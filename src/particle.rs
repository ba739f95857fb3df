use std::f32::consts::TAU;

use crate::color::Color;
use crate::effect::StarEffect;
use crate::pool::{ParticlePool, Pooled};

/// Acceleration in px/s.
pub const GRAVITY: f32 = 0.9;

pub const STAR_AIR_DRAG: f32 = 0.98;
pub const STAR_AIR_DRAG_HEAVY: f32 = 0.992;
pub const SPARK_AIR_DRAG: f32 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub time_step: f32,
    /// Position/velocity multiplier (simulated speed times frame lag).
    pub speed: f32,
    pub star_drag: f32,
    pub star_drag_heavy: f32,
    pub spark_drag: f32,
    /// Velocity added to `speed_y` this frame.
    pub gravity: f32,
    pub frame: u64,
}

impl Step {
    pub fn new(frame_time: f32, lag: f32, sim_speed: f32, frame: u64) -> Self {
        let time_step = frame_time * sim_speed;
        let speed = sim_speed * lag;
        Self {
            time_step,
            speed,
            star_drag: 1.0 - (1.0 - STAR_AIR_DRAG) * speed,
            star_drag_heavy: 1.0 - (1.0 - STAR_AIR_DRAG_HEAVY) * speed,
            spark_drag: 1.0 - (1.0 - SPARK_AIR_DRAG) * speed,
            gravity: time_step / 1000.0 * GRAVITY,
            frame,
        }
    }
}

/// Everything a star death effect needs to know about the star that died.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Death {
    pub effect: StarEffect,
    pub x: f32,
    pub y: f32,
    pub speed_x: f32,
    pub speed_y: f32,
    pub color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StarStep {
    /// Already advanced this frame.
    Skipped,
    Alive,
    /// Switched to its second color and must change bucket.
    Recolored(Color),
    Expired,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Star {
    pub x: f32,
    pub y: f32,
    pub prev_x: f32,
    pub prev_y: f32,
    pub speed_x: f32,
    pub speed_y: f32,
    pub color: Color,
    pub life: f32,
    pub full_life: f32,
    /// Heavy stars (comets) feel less air drag.
    pub heavy: bool,
    pub spin_angle: f32,
    pub spin_speed: f32,
    pub spin_radius: f32,
    /// Milliseconds between spark emissions, 0 for none.
    pub spark_freq: f32,
    pub spark_speed: f32,
    pub spark_timer: f32,
    pub spark_color: Color,
    pub spark_life: f32,
    pub spark_life_variation: f32,
    pub second_color: Option<Color>,
    /// Remaining life below which the second color takes over.
    pub second_color_time: f32,
    pub color_changed: bool,
    pub on_death: Option<StarEffect>,
    pub update_frame: u64,
}

impl Star {
    /// A star heading along `angle` (0 is straight down, PI straight up).
    pub fn new(
        x: f32,
        y: f32,
        color: Color,
        angle: f32,
        speed: f32,
        life: f32,
        rng: &mut fastrand::Rng,
    ) -> Self {
        Self {
            x,
            y,
            prev_x: x,
            prev_y: y,
            speed_x: angle.sin() * speed,
            speed_y: angle.cos() * speed,
            color,
            life,
            full_life: life,
            heavy: false,
            spin_angle: rng.f32() * TAU,
            spin_speed: 0.8,
            spin_radius: 0.0,
            spark_freq: 0.0,
            spark_speed: 1.0,
            spark_timer: 0.0,
            spark_color: color,
            spark_life: 750.0,
            spark_life_variation: 0.25,
            second_color: None,
            second_color_time: 0.0,
            color_changed: false,
            on_death: None,
            update_frame: 0,
        }
    }

    /// Inherit extra velocity, e.g. from the star or comet that spawned it.
    pub fn with_speed_offset(mut self, offset_x: f32, offset_y: f32) -> Self {
        self.speed_x += offset_x;
        self.speed_y += offset_y;
        self
    }

    pub fn with_death(mut self, effect: Option<StarEffect>) -> Self {
        self.on_death = effect;
        self
    }

    /// Fraction of life remaining, square-rooted so dimming speeds up late.
    pub fn burn_rate(&self) -> f32 {
        (self.life / self.full_life).max(0.0).sqrt()
    }

    /// Advance one frame. Sparks emitted along the way go straight into
    /// `sparks`. On [`StarStep::Recolored`] the caller must move the star
    /// to its new bucket; on [`StarStep::Expired`] it must release it.
    pub fn advance(
        &mut self,
        step: &Step,
        rng: &mut fastrand::Rng,
        sparks: &mut ParticlePool<Spark>,
    ) -> StarStep {
        if self.update_frame == step.frame {
            return StarStep::Skipped;
        }
        self.update_frame = step.frame;

        self.life -= step.time_step;
        if self.life <= 0.0 {
            return StarStep::Expired;
        }

        let burn_rate = self.burn_rate();
        let burn_rate_inverse = 1.0 - burn_rate;

        self.prev_x = self.x;
        self.prev_y = self.y;
        self.x += self.speed_x * step.speed;
        self.y += self.speed_y * step.speed;
        let drag = if self.heavy {
            step.star_drag_heavy
        } else {
            step.star_drag
        };
        self.speed_x *= drag;
        self.speed_y *= drag;
        self.speed_y += step.gravity;

        if self.spin_radius > 0.0 {
            self.spin_angle += self.spin_speed * step.speed;
            self.x += self.spin_angle.sin() * self.spin_radius * step.speed;
            self.y += self.spin_angle.cos() * self.spin_radius * step.speed;
        }

        if self.spark_freq > 0.0 {
            self.spark_timer -= step.time_step;
            while self.spark_timer < 0.0 {
                // Interval widens as burn_rate falls: emission thins out near death.
                self.spark_timer +=
                    self.spark_freq * 0.75 + self.spark_freq * burn_rate_inverse * 4.0;
                sparks.add(Spark::new(
                    self.x,
                    self.y,
                    self.spark_color,
                    rng.f32() * TAU,
                    rng.f32() * self.spark_speed * burn_rate,
                    self.spark_life * 0.8
                        + rng.f32() * self.spark_life_variation * self.spark_life,
                ));
            }
        }

        if let Some(second) = self.second_color {
            if !self.color_changed && self.life < self.second_color_time {
                self.color_changed = true;
                self.color = second;
                if second == Color::Invisible {
                    self.spark_freq = 0.0;
                }
                return StarStep::Recolored(second);
            }
        }

        StarStep::Alive
    }
}

impl Pooled for Star {
    type Remains = Death;

    fn bucket(&self) -> usize {
        self.color.index()
    }

    fn retire(&mut self) -> Option<Death> {
        let effect = self.on_death.take();
        self.second_color = None;
        self.second_color_time = 0.0;
        self.color_changed = false;
        effect.map(|effect| Death {
            effect,
            x: self.x,
            y: self.y,
            speed_x: self.speed_x,
            speed_y: self.speed_y,
            color: self.color,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spark {
    pub x: f32,
    pub y: f32,
    pub prev_x: f32,
    pub prev_y: f32,
    pub speed_x: f32,
    pub speed_y: f32,
    pub color: Color,
    pub life: f32,
}

impl Spark {
    pub fn new(x: f32, y: f32, color: Color, angle: f32, speed: f32, life: f32) -> Self {
        Self {
            x,
            y,
            prev_x: x,
            prev_y: y,
            speed_x: angle.sin() * speed,
            speed_y: angle.cos() * speed,
            color,
            life,
        }
    }

    /// Advance one frame, returns `false` once burnt out.
    pub fn advance(&mut self, step: &Step) -> bool {
        self.life -= step.time_step;
        if self.life <= 0.0 {
            return false;
        }
        self.prev_x = self.x;
        self.prev_y = self.y;
        self.x += self.speed_x * step.speed;
        self.y += self.speed_y * step.speed;
        self.speed_x *= step.spark_drag;
        self.speed_y *= step.spark_drag;
        self.speed_y += step.gravity;
        true
    }
}

impl Pooled for Spark {
    type Remains = std::convert::Infallible;

    fn bucket(&self) -> usize {
        self.color.index()
    }

    fn retire(&mut self) -> Option<Self::Remains> {
        None
    }
}

/// One-frame radial flash at the origin of a burst.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BurstFlash {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

impl Pooled for BurstFlash {
    type Remains = std::convert::Infallible;

    fn bucket(&self) -> usize {
        0
    }

    fn retire(&mut self) -> Option<Self::Remains> {
        None
    }
}
