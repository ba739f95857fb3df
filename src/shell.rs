use std::f32::consts::{PI, TAU};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::color::{Color, ShellColor};
use crate::context::{QualityProfile, SimContext};
use crate::effect::{StarEffect, falloff_speed, particle_arc};
use crate::particle::Star;
use crate::scene::{Scene, ShellId};

/// Spark emission profile of burst stars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Glitter {
    Light,
    Medium,
    Heavy,
    Thick,
    Streamer,
    Willow,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlitterParams {
    /// Milliseconds between sparks, already scaled by quality.
    pub freq: f32,
    pub speed: f32,
    pub life: f32,
    pub life_variation: f32,
}

impl Glitter {
    pub fn params(self, quality: &QualityProfile) -> GlitterParams {
        let (freq, speed, life, life_variation) = match self {
            Glitter::Light => (400.0, 0.3, 300.0, 2.0),
            Glitter::Medium => (200.0, 0.44, 700.0, 2.0),
            Glitter::Heavy => (82.0, 0.8, 1400.0, 2.0),
            Glitter::Thick => (15.0, quality.thick_spark_speed, 2000.0, 3.0),
            Glitter::Streamer => (40.0, 0.92, 400.0, 2.0),
            Glitter::Willow => (120.0, 0.34, 1400.0, 3.8),
        };
        GlitterParams {
            freq: freq / quality.factor,
            speed,
            life,
            life_variation,
        }
    }
}

/// Shell options. Anything left `None` gets a generated default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShellSpec {
    pub size: f32,
    pub star_life: f32,
    pub star_life_variation: Option<f32>,
    pub star_density: Option<f32>,
    pub star_count: Option<f32>,
    pub color: Option<ShellColor>,
    pub second_color: Option<Color>,
    pub glitter: Option<Glitter>,
    pub glitter_color: Option<Color>,
    pub pistil: bool,
    pub pistil_color: Option<Color>,
    pub streamers: bool,
    pub crossette: bool,
    pub floral: bool,
    pub crackle: bool,
    pub falling_leaves: bool,
    pub ring: bool,
    pub horsetail: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Shell {
    pub size: f32,
    pub star_life: f32,
    pub star_life_variation: f32,
    pub star_count: f32,
    pub color: ShellColor,
    pub second_color: Option<Color>,
    pub glitter: Option<Glitter>,
    pub glitter_color: Color,
    pub pistil: bool,
    pub pistil_color: Option<Color>,
    pub streamers: bool,
    pub crossette: bool,
    pub floral: bool,
    pub crackle: bool,
    pub falling_leaves: bool,
    pub ring: bool,
    pub horsetail: bool,
    /// Velocity of the comet when it burst, inherited by horsetail stars.
    pub comet_speed: Option<(f32, f32)>,
}

/// Star count for a shell of `size` when none is given: grows like the
/// surface of a sphere.
pub fn default_star_count(size: f32, density: f32) -> f32 {
    let scaled = size / 50.0 * density;
    (scaled * scaled).max(6.0)
}

impl Shell {
    pub fn new(spec: ShellSpec, ctx: &mut SimContext) -> Self {
        let color = match spec.color {
            Some(color) => color,
            None => ShellColor::Single(ctx.colors.any(&mut ctx.rng)),
        };
        let glitter_color = spec
            .glitter_color
            .or_else(|| color.single())
            .unwrap_or(Color::White);
        let star_count = spec
            .star_count
            .filter(|count| *count > 0.0)
            .unwrap_or_else(|| default_star_count(spec.size, spec.star_density.unwrap_or(1.0)));

        Self {
            size: spec.size,
            star_life: spec.star_life,
            star_life_variation: spec.star_life_variation.unwrap_or(0.125),
            star_count,
            color,
            second_color: spec.second_color,
            glitter: spec.glitter,
            glitter_color,
            pistil: spec.pistil,
            pistil_color: spec.pistil_color,
            streamers: spec.streamers,
            crossette: spec.crossette,
            floral: spec.floral,
            crackle: spec.crackle,
            falling_leaves: spec.falling_leaves,
            ring: spec.ring,
            horsetail: spec.horsetail,
            comet_speed: None,
        }
    }

    /// Effect every burst star carries. Later flags win.
    pub fn death_effect(&self) -> Option<StarEffect> {
        if self.falling_leaves {
            Some(StarEffect::FallingLeaves)
        } else if self.crackle {
            Some(StarEffect::Crackle)
        } else if self.floral {
            Some(StarEffect::Floral)
        } else if self.crossette {
            Some(StarEffect::Crossette)
        } else {
            None
        }
    }

    /// Fire the comet from `position` (0..1 across the stage) so that it
    /// bursts at `launch_height` (0 lowest, 1 highest). The shell itself
    /// waits in the scene until the comet dies.
    pub fn launch(
        self,
        position: f32,
        launch_height: f32,
        scene: &mut Scene,
        ctx: &mut SimContext,
    ) -> ShellId {
        let geometry = ctx.stage.launch_geometry(position, launch_height);
        let launch_velocity = geometry.launch_velocity();

        let comet_color = match self.color {
            ShellColor::Single(color) if color.is_visible() => color,
            _ => Color::White,
        };
        let (speed, life) = if self.horsetail {
            (launch_velocity * 1.2, launch_velocity * 100.0)
        } else {
            (launch_velocity, launch_velocity * 400.0)
        };

        let mut comet = Star::new(
            geometry.launch_x,
            geometry.launch_y,
            comet_color,
            PI,
            speed,
            life,
            &mut ctx.rng,
        );
        comet.heavy = true;
        comet.spin_radius = 0.78;
        comet.spark_freq = ctx.quality.comet_spark_freq;
        comet.spark_life = 320.0;
        comet.spark_life_variation = 3.0;
        if self.glitter == Some(Glitter::Willow) || self.falling_leaves {
            comet.spark_freq = 20.0 / ctx.quality.factor;
            comet.spark_speed = 0.5;
            comet.spark_life = 500.0;
        }
        if self.color == ShellColor::Single(Color::Invisible) {
            comet.spark_color = Color::Gold;
        }

        // Half the comets go dark partway up for a cleaner reveal.
        if ctx.rng.f32() > 0.5 {
            comet.second_color = Some(Color::Invisible);
            comet.second_color_time = ctx.rng.f32().powf(1.5) * 700.0 + 500.0;
        }

        debug!(
            x = geometry.launch_x,
            burst_y = geometry.burst_y,
            size = self.size,
            "launching shell"
        );

        let id = scene.park_shell(self);
        comet.on_death = Some(StarEffect::Burst(id));
        scene.stars.add(comet);
        id
    }

    pub fn burst(&self, x: f32, y: f32, scene: &mut Scene, ctx: &mut SimContext) {
        // Tuned so the burst grows to roughly `size` under air drag.
        let speed = self.size / 96.0;
        let on_death = self.death_effect();
        let glitter = self.glitter.map(|g| g.params(&ctx.quality));
        let (offset_x, offset_y) = match (self.horsetail, self.comet_speed) {
            (true, Some(velocity)) => velocity,
            _ => (0.0, 0.0),
        };
        let before = scene.stars.active_count();

        let mut add_star = |ctx: &mut SimContext, color: Option<Color>, angle: f32| {
            let color = color.unwrap_or_else(|| ctx.colors.any(&mut ctx.rng));
            let star_speed = falloff_speed(&mut ctx.rng, speed);
            let life = self.star_life + ctx.rng.f32() * self.star_life * self.star_life_variation;
            let mut star = Star::new(x, y, color, angle, star_speed, life, &mut ctx.rng)
                .with_speed_offset(offset_x, offset_y)
                .with_death(on_death);

            star.second_color = self.second_color;
            if self.second_color.is_some() {
                star.second_color_time = self.star_life * (ctx.rng.f32() * 0.05 + 0.32);
            }
            if let Some(params) = glitter {
                self.apply_glitter(&mut star, params, &mut ctx.rng);
            }
            scene.stars.add(star);
        };

        match self.color {
            ShellColor::Pair(first, second) => {
                let (start, start2, arc) = if ctx.rng.f32() < 0.5 {
                    let start = ctx.rng.f32() * PI;
                    (start, start + PI, PI)
                } else {
                    (0.0, 0.0, TAU)
                };
                let half = self.star_count / 2.0;
                particle_arc(ctx, start, arc, half, 1.0, |ctx, angle| {
                    add_star(ctx, Some(first), angle)
                });
                particle_arc(ctx, start2, arc, half, 1.0, |ctx, angle| {
                    add_star(ctx, Some(second), angle)
                });
            }
            color if self.ring => {
                self.burst_ring(x, y, color.single(), speed, glitter, scene, ctx);
            }
            color => {
                let single = color.single();
                particle_arc(ctx, 0.0, TAU, self.star_count, 1.0, |ctx, angle| {
                    add_star(ctx, single, angle)
                });
            }
        }

        debug!(
            x,
            y,
            size = self.size,
            stars = scene.stars.active_count() - before,
            "shell burst"
        );

        if self.pistil {
            let pistil_color = self.pistil_color;
            let inner = Shell::new(
                ShellSpec {
                    size: self.size * 0.5,
                    star_life: self.star_life * 0.7,
                    star_life_variation: Some(self.star_life_variation),
                    star_density: Some(1.65),
                    color: pistil_color.map(ShellColor::Single),
                    glitter: Some(Glitter::Light),
                    glitter_color: Some(if pistil_color == Some(Color::Gold) {
                        Color::Gold
                    } else {
                        Color::White
                    }),
                    ..ShellSpec::default()
                },
                ctx,
            );
            inner.burst(x, y, scene, ctx);
        }

        if self.streamers {
            let inner = Shell::new(
                ShellSpec {
                    size: self.size,
                    star_life: self.star_life * 0.8,
                    star_life_variation: Some(self.star_life_variation),
                    star_count: Some((self.size / 45.0).max(6.0).floor()),
                    color: Some(ShellColor::Single(Color::White)),
                    glitter: Some(Glitter::Streamer),
                    ..ShellSpec::default()
                },
                ctx,
            );
            inner.burst(x, y, scene, ctx);
        }

        scene.add_flash(x, y, self.size / 4.0);
    }

    /// Evenly spaced stars on a squashed, randomly rotated ellipse.
    #[allow(clippy::too_many_arguments)]
    fn burst_ring(
        &self,
        x: f32,
        y: f32,
        color: Option<Color>,
        speed: f32,
        glitter: Option<GlitterParams>,
        scene: &mut Scene,
        ctx: &mut SimContext,
    ) {
        let ring_start = ctx.rng.f32() * PI;
        let ring_squash = ctx.rng.f32().powf(0.45) * 0.992 + 0.008;

        particle_arc(ctx, 0.0, TAU, self.star_count, 0.0, |ctx, angle| {
            let init_x = angle.sin() * speed * ring_squash;
            let init_y = angle.cos() * speed;
            let ring_speed = init_x.hypot(init_y);
            let ring_angle = init_x.atan2(init_y) + ring_start;

            let color = color.unwrap_or_else(|| ctx.colors.any(&mut ctx.rng));
            let life = self.star_life + ctx.rng.f32() * self.star_life * self.star_life_variation;
            let mut star = Star::new(x, y, color, ring_angle, ring_speed, life, &mut ctx.rng);
            if let Some(params) = glitter {
                self.apply_glitter(&mut star, params, &mut ctx.rng);
            }
            scene.stars.add(star);
        });
    }

    fn apply_glitter(&self, star: &mut Star, params: GlitterParams, rng: &mut fastrand::Rng) {
        star.spark_freq = params.freq;
        star.spark_speed = params.speed;
        star.spark_life = params.life;
        star.spark_life_variation = params.life_variation;
        star.spark_color = self.glitter_color;
        // Offset timers so a whole burst doesn't flash in sync.
        star.spark_timer = rng.f32() * params.freq;
    }
}
