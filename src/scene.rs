use tracing::trace;

use crate::color::Color;
use crate::context::SimContext;
use crate::effect;
use crate::particle::{BurstFlash, Death, Spark, Star, StarStep, Step};
use crate::pool::ParticlePool;
use crate::shell::Shell;

/// A shell parked in the scene while its comet climbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShellId(usize);

#[derive(Debug, Clone)]
pub struct Scene {
    pub stars: ParticlePool<Star>,
    pub sparks: ParticlePool<Spark>,
    /// Flashes queued since the renderer last drained them.
    pub flashes: ParticlePool<BurstFlash>,
    shells: Vec<Option<Shell>>,
    free_shells: Vec<usize>,
    deaths: Vec<Death>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            stars: ParticlePool::with_capacity(Color::COUNT, 1024),
            sparks: ParticlePool::with_capacity(Color::COUNT, 4096),
            flashes: ParticlePool::new(1),
            shells: Vec::new(),
            free_shells: Vec::new(),
            deaths: Vec::new(),
        }
    }

    pub fn add_flash(&mut self, x: f32, y: f32, radius: f32) {
        self.flashes.add(BurstFlash { x, y, radius });
    }

    pub fn park_shell(&mut self, shell: Shell) -> ShellId {
        match self.free_shells.pop() {
            Some(index) => {
                self.shells[index] = Some(shell);
                ShellId(index)
            }
            None => {
                self.shells.push(Some(shell));
                ShellId(self.shells.len() - 1)
            }
        }
    }

    /// Remove a parked shell. Returns `None` if it already burst.
    pub fn take_shell(&mut self, id: ShellId) -> Option<Shell> {
        let shell = self.shells.get_mut(id.0)?.take()?;
        self.free_shells.push(id.0);
        Some(shell)
    }

    pub fn shells_in_flight(&self) -> usize {
        self.shells.iter().filter(|s| s.is_some()).count()
    }

    /// Burst the shell whose comet just died, at the comet's position.
    pub fn burst_shell(&mut self, id: ShellId, comet: &Death, ctx: &mut SimContext) {
        let Some(mut shell) = self.take_shell(id) else {
            trace!(?id, "shell already burst");
            return;
        };
        shell.comet_speed = Some((comet.speed_x, comet.speed_y));
        shell.burst(comet.x, comet.y, self, ctx);
    }

    /// Advance every star and spark by one frame.
    ///
    /// Stars go first. Death effects run once the whole star pass is done,
    /// so particles they spawn start moving next frame. Sparks go last and
    /// include the ones emitted this frame.
    pub fn step(&mut self, step: &Step, ctx: &mut SimContext) {
        let mut deaths = std::mem::take(&mut self.deaths);

        for bucket in 0..self.stars.bucket_count() {
            // Walk backward: release and move both swap-remove.
            for position in (0..self.stars.bucket_len(bucket)).rev() {
                let handle = self.stars.bucket(bucket)[position];
                let star = self.stars.get_mut(handle);
                match star.advance(step, &mut ctx.rng, &mut self.sparks) {
                    StarStep::Skipped | StarStep::Alive => {}
                    StarStep::Recolored(color) => {
                        self.stars.move_at(bucket, position, color.index());
                    }
                    StarStep::Expired => {
                        if let Some(death) = self.stars.release_at(bucket, position) {
                            deaths.push(death);
                        }
                    }
                }
            }
        }

        for death in deaths.drain(..) {
            effect::dispatch(&death, self, ctx);
        }
        self.deaths = deaths;

        for bucket in 0..self.sparks.bucket_count() {
            for position in (0..self.sparks.bucket_len(bucket)).rev() {
                let handle = self.sparks.bucket(bucket)[position];
                if !self.sparks.get_mut(handle).advance(step) {
                    self.sparks.release_at(bucket, position);
                }
            }
        }
    }

    /// Drop every particle and parked shell. No death effects fire.
    pub fn clear(&mut self) {
        self.stars.clear();
        self.sparks.clear();
        self.flashes.clear();
        self.shells.clear();
        self.free_shells.clear();
        self.deaths.clear();
    }

    pub fn active_count(&self) -> usize {
        self.stars.active_count() + self.sparks.active_count()
    }
}
