use std::f32::consts::{FRAC_PI_2, TAU};

use crate::color::Color;
use crate::context::SimContext;
use crate::particle::{Death, Spark, Star};
use crate::scene::{Scene, ShellId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StarEffect {
    /// Comet reached its apex: burst the parked shell.
    Burst(ShellId),
    /// Split into four same-color stars.
    Crossette,
    /// A miniature shell.
    Floral,
    /// Invisible stars trailing gold glitter.
    FallingLeaves,
    /// A cloud of short gold sparks.
    Crackle,
}

/// Number of particles [`particle_arc`] produces for a (possibly fractional)
/// `count`. The last step is skipped when it would land within half a step
/// of the start again.
pub fn arc_count(count: f32) -> usize {
    if count > 0.5 {
        (count - 0.5).ceil() as usize
    } else {
        0
    }
}

/// Spread particles over an arc, jittering each angle forward by up to
/// `randomness` steps. `start` and `arc_length` may be negative.
pub fn particle_arc<F>(
    ctx: &mut SimContext,
    start: f32,
    arc_length: f32,
    count: f32,
    randomness: f32,
    mut factory: F,
) where
    F: FnMut(&mut SimContext, f32),
{
    let n = arc_count(count);
    if n == 0 {
        return;
    }
    let angle_delta = arc_length / count;
    for i in 0..n {
        let angle = start + angle_delta * i as f32;
        let jitter = ctx.rng.f32() * angle_delta * randomness;
        factory(ctx, angle + jitter);
    }
}

/// Near-cubic falloff: most stars travel close to the full radius.
pub fn falloff_speed(rng: &mut fastrand::Rng, speed: f32) -> f32 {
    rng.f32().powf(0.45) * speed
}

pub fn dispatch(death: &Death, scene: &mut Scene, ctx: &mut SimContext) {
    match death.effect {
        StarEffect::Burst(id) => scene.burst_shell(id, death, ctx),
        StarEffect::Crossette => crossette(death, scene, ctx),
        StarEffect::Floral => floral(death, scene, ctx),
        StarEffect::FallingLeaves => falling_leaves(death, scene, ctx),
        StarEffect::Crackle => crackle(death, scene, ctx),
    }
}

pub fn crossette(death: &Death, scene: &mut Scene, ctx: &mut SimContext) {
    let start = ctx.rng.f32() * FRAC_PI_2;
    particle_arc(ctx, start, TAU, 4.0, 0.5, |ctx, angle| {
        let speed = ctx.rng.f32() * 0.6 + 0.75;
        let star = Star::new(death.x, death.y, death.color, angle, speed, 600.0, &mut ctx.rng);
        scene.stars.add(star);
    });
}

pub fn floral(death: &Death, scene: &mut Scene, ctx: &mut SimContext) {
    let start = ctx.rng.f32() * FRAC_PI_2;
    let count = ctx.quality.floral_count as f32;
    particle_arc(ctx, start, TAU, count, 1.0, |ctx, angle| {
        let speed = falloff_speed(&mut ctx.rng, 2.4);
        let life = 1000.0 + ctx.rng.f32() * 300.0;
        let star = Star::new(death.x, death.y, death.color, angle, speed, life, &mut ctx.rng)
            .with_speed_offset(death.speed_x, death.speed_y);
        scene.stars.add(star);
    });
    scene.add_flash(death.x, death.y, 46.0);
}

pub fn falling_leaves(death: &Death, scene: &mut Scene, ctx: &mut SimContext) {
    let start = ctx.rng.f32() * FRAC_PI_2;
    let spark_freq = ctx.quality.falling_leaves_spark_freq;
    particle_arc(ctx, start, TAU, 12.0, 1.0, |ctx, angle| {
        let speed = falloff_speed(&mut ctx.rng, 2.4);
        let life = 2400.0 + ctx.rng.f32() * 600.0;
        let mut star = Star::new(death.x, death.y, Color::Invisible, angle, speed, life, &mut ctx.rng)
            .with_speed_offset(death.speed_x, death.speed_y);
        star.spark_color = Color::Gold;
        star.spark_freq = spark_freq;
        star.spark_speed = 0.28;
        star.spark_life = 750.0;
        star.spark_life_variation = 3.2;
        scene.stars.add(star);
    });
    scene.add_flash(death.x, death.y, 46.0);
}

pub fn crackle(death: &Death, scene: &mut Scene, ctx: &mut SimContext) {
    let count = ctx.quality.crackle_count as f32;
    particle_arc(ctx, 0.0, TAU, count, 1.8, |ctx, angle| {
        let speed = falloff_speed(&mut ctx.rng, 2.4);
        let life = 300.0 + ctx.rng.f32() * 200.0;
        scene
            .sparks
            .add(Spark::new(death.x, death.y, Color::Gold, angle, speed, life));
    });
}
