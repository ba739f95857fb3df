use tracing::{debug, info};

use crate::catalog::ShellType;
use crate::config::{Quality, ShowConfig, SkyLighting};
use crate::context::{SimContext, Stage};
use crate::particle::{BurstFlash, Spark, Star, Step};
use crate::pool::ParticlePool;
use crate::scene::{Scene, ShellId};
use crate::sequencer::{self, Launcher, Sequencer};
use crate::shell::Shell;
use crate::sky::SkyColor;
use crate::timeline::Timeline;

/// Longest frame simulated in one go, in ms. Longer gaps (a stalled
/// terminal, a debugger) are cut short.
pub const MAX_FRAME_TIME: f32 = 68.0;
pub const MAX_LAG: f32 = 4.0;

/// A request to fire one shell. Anything left `None` comes from the
/// configuration or is picked at random.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LaunchRequest {
    /// Horizontal position and burst height, both 0..1.
    pub position: Option<(f32, f32)>,
    pub shell_type: Option<ShellType>,
    pub size: Option<f32>,
}

#[derive(Debug)]
pub struct Show {
    config: ShowConfig,
    ctx: SimContext,
    scene: Scene,
    timeline: Timeline,
    sequencer: Sequencer,
    sky: SkyColor,
    paused: bool,
}

impl Show {
    pub fn new(stage: Stage, config: ShowConfig) -> Self {
        Self::from_context(SimContext::new(stage, config.quality), config)
    }

    /// A reproducible show.
    pub fn with_seed(stage: Stage, config: ShowConfig, seed: u64) -> Self {
        Self::from_context(SimContext::with_seed(stage, config.quality, seed), config)
    }

    fn from_context(ctx: SimContext, mut config: ShowConfig) -> Self {
        config.validate();
        Self {
            config,
            ctx,
            scene: Scene::new(),
            timeline: Timeline::new(),
            sequencer: Sequencer::new(),
            sky: SkyColor::new(),
            paused: false,
        }
    }

    /// Advance the show by one frame of `frame_time` ms. `lag` is how many
    /// nominal frames that time represents.
    pub fn update(&mut self, frame_time: f32, lag: f32) {
        if self.paused {
            return;
        }
        let frame_time = clamp_or_zero(frame_time, MAX_FRAME_TIME);
        let lag = clamp_or_zero(lag, MAX_LAG);
        self.ctx.sim_speed = clamp_or_zero(self.ctx.sim_speed, 1.0);

        self.ctx.frame += 1;
        let step = Step::new(frame_time, lag, self.ctx.sim_speed, self.ctx.frame);
        self.ctx.clock += f64::from(step.time_step);

        let mut launcher = Launcher {
            config: &self.config,
            scene: &mut self.scene,
            timeline: &mut self.timeline,
            ctx: &mut self.ctx,
        };
        self.sequencer.tick(step.time_step, &mut launcher);

        for launch in self.timeline.drain_due(self.ctx.clock) {
            sequencer::fire_pending(&launch, &mut self.scene, &mut self.ctx);
        }

        self.scene.step(&step, &mut self.ctx);

        match self.config.sky_lighting {
            SkyLighting::None => self.sky.reset(),
            lighting => {
                let max_saturation = f32::from(lighting.level()) * 15.0;
                self.sky.update(&self.scene.stars, max_saturation, step.speed);
            }
        }
    }

    /// Fire exactly one shell. Nothing is launched while paused.
    pub fn launch(&mut self, request: LaunchRequest) -> Option<ShellId> {
        if self.paused {
            return None;
        }
        let (position, height) = request.position.unwrap_or_else(|| {
            (
                Stage::fit_h(self.ctx.rng.f32()),
                Stage::fit_v(self.ctx.rng.f32()),
            )
        });
        let shell_type = request.shell_type.unwrap_or(self.config.shell);
        let size = request.size.unwrap_or(self.config.size);
        debug!(shell = %shell_type, size, position, height, "manual launch");
        let shell = Shell::new(shell_type.build(size, &mut self.ctx), &mut self.ctx);
        Some(shell.launch(position, height, &mut self.scene, &mut self.ctx))
    }

    /// Launch the configured shell at a random position.
    pub fn launch_from_config(&mut self) -> Option<ShellId> {
        self.launch(LaunchRequest::default())
    }

    /// Launch the configured shell where the stage point `(x, y)` is.
    pub fn launch_at(&mut self, x: f32, y: f32) -> Option<ShellId> {
        let position = self.ctx.stage.position_at(x, y);
        self.launch(LaunchRequest {
            position: Some(position),
            ..LaunchRequest::default()
        })
    }

    /// Start over: every particle, parked shell and pending launch is
    /// dropped without firing, the clock goes back to zero and the
    /// sequencer begins again with its opening shot.
    pub fn reload(&mut self) {
        self.scene.clear();
        self.timeline.clear();
        self.ctx.clock = 0.0;
        self.ctx.frame = 0;
        self.sequencer = Sequencer::new();
        self.sky.reset();
        self.ctx.colors.forget();
        info!("show reloaded");
    }

    pub fn config(&self) -> &ShowConfig {
        &self.config
    }

    pub fn set_config(&mut self, mut config: ShowConfig) {
        config.validate();
        if config != self.config {
            info!(
                quality = %config.quality,
                shell = %config.shell,
                size = config.size,
                auto_launch = config.auto_launch,
                finale = config.finale,
                sky = %config.sky_lighting,
                "config changed"
            );
        }
        self.ctx.apply_config(&config);
        if config.sky_lighting == SkyLighting::None {
            self.sky.reset();
        }
        self.config = config;
    }

    /// Apply `change` to a copy of the configuration and install it.
    pub fn update_config(&mut self, change: impl FnOnce(&mut ShowConfig)) {
        let mut config = self.config.clone();
        change(&mut config);
        self.set_config(config);
    }

    pub fn quality(&self) -> Quality {
        self.ctx.quality.quality
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    pub fn sim_speed(&self) -> f32 {
        self.ctx.sim_speed
    }

    pub fn set_sim_speed(&mut self, speed: f32) {
        self.ctx.sim_speed = clamp_or_zero(speed, 1.0);
    }

    pub fn stage(&self) -> Stage {
        self.ctx.stage
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.ctx.stage = Stage::new(width, height);
    }

    pub fn stars(&self) -> &ParticlePool<Star> {
        &self.scene.stars
    }

    pub fn sparks(&self) -> &ParticlePool<Spark> {
        &self.scene.sparks
    }

    /// Take this frame's burst flashes. Each is handed out once. Nothing is
    /// drained while paused.
    pub fn drain_flashes(&mut self) -> Vec<BurstFlash> {
        let mut flashes = Vec::new();
        if self.paused {
            return flashes;
        }
        while let Some(flash) = self.scene.flashes.pop(0) {
            flashes.push(flash);
        }
        flashes
    }

    pub fn sky_color(&self) -> (u8, u8, u8) {
        self.sky.rgb()
    }

    pub fn pending_launches(&self) -> usize {
        self.timeline.pending()
    }

    pub fn shells_in_flight(&self) -> usize {
        self.scene.shells_in_flight()
    }

    pub fn active_particles(&self) -> usize {
        self.scene.active_count()
    }

    /// Simulated milliseconds since the show started or was reloaded.
    pub fn clock(&self) -> f64 {
        self.ctx.clock
    }

    pub fn frame(&self) -> u64 {
        self.ctx.frame
    }
}

fn clamp_or_zero(value: f32, max: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;

    const FRAME: f32 = 1000.0 / 60.0;

    fn show(config: ShowConfig) -> Show {
        Show::with_seed(Stage::new(1280.0, 720.0), config, 21)
    }

    fn run(show: &mut Show, frames: usize) {
        for _ in 0..frames {
            show.update(FRAME, 1.0);
        }
    }

    #[test]
    fn test_reload_then_update_is_empty() {
        let mut show = show(ShowConfig::default());
        run(&mut show, 600);
        for _ in 0..3 {
            show.launch_from_config();
        }
        run(&mut show, 90);
        assert!(show.active_particles() > 0);

        // force some deferred launches into the queue
        show.timeline.schedule(show.clock() + 5000.0, crate::timeline::PendingLaunch {
            shell_type: ShellType::Palm,
            size: 1.0,
            position: 0.5,
            height: 0.5,
        });

        show.reload();
        show.update(FRAME, 1.0);
        for color in Color::ALL {
            assert!(show.stars().bucket(color.index()).is_empty());
            assert!(show.sparks().bucket(color.index()).is_empty());
        }
        assert_eq!(show.pending_launches(), 0);
        assert_eq!(show.shells_in_flight(), 0);
        assert!(show.drain_flashes().is_empty());
    }

    #[test]
    fn test_reload_restarts_barrage_cooldown() {
        let mut show = show(ShowConfig::default());
        show.ctx.clock = 100_000.0;
        let mut launcher = Launcher {
            config: &show.config,
            scene: &mut show.scene,
            timeline: &mut show.timeline,
            ctx: &mut show.ctx,
        };
        show.sequencer.barrage(&mut launcher);
        assert_eq!(show.sequencer.last_barrage(), 100_000.0);

        show.reload();
        assert_eq!(show.clock(), 0.0);
        assert_eq!(show.frame(), 0);

        show.ctx.clock = 1000.0;
        for _ in 0..200 {
            let mut launcher = Launcher {
                config: &show.config,
                scene: &mut show.scene,
                timeline: &mut show.timeline,
                ctx: &mut show.ctx,
            };
            show.sequencer.start_sequence(&mut launcher);
        }
        assert_eq!(show.sequencer.last_barrage(), 0.0);
    }

    #[test]
    fn test_launch_while_paused_spawns_nothing() {
        let mut show = show(ShowConfig {
            auto_launch: false,
            ..ShowConfig::default()
        });
        show.set_paused(true);
        assert_eq!(show.launch_from_config(), None);
        assert_eq!(show.launch_at(640.0, 100.0), None);
        assert_eq!(show.active_particles(), 0);
        assert_eq!(show.shells_in_flight(), 0);

        show.set_paused(false);
        assert!(show.launch_from_config().is_some());
        assert_eq!(show.shells_in_flight(), 1);
    }

    #[test]
    fn test_auto_launch_starts_after_lead_in() {
        let mut show = show(ShowConfig::default());
        run(&mut show, 59);
        assert_eq!(show.active_particles(), 0);
        run(&mut show, 2);
        assert_eq!(show.shells_in_flight(), 1);
    }

    #[test]
    fn test_show_keeps_running() {
        let mut show = show(ShowConfig {
            quality: Quality::Low,
            size: 1.0,
            ..ShowConfig::default()
        });
        let mut flashes = 0;
        for _ in 0..60 * 30 {
            show.update(FRAME, 1.0);
            flashes += show.drain_flashes().len();
            show.scene.stars.assert_consistent();
        }
        assert!(flashes > 5);
        assert!(show.clock() > 29_000.0);
    }

    #[test]
    fn test_pause_freezes_everything() {
        let mut show = show(ShowConfig::default());
        show.launch_from_config();
        run(&mut show, 5);
        let frame = show.frame();
        let clock = show.clock();
        let comet_y: Vec<f32> = show.stars().iter_active().map(|s| s.y).collect();

        show.set_paused(true);
        run(&mut show, 30);
        assert_eq!(show.frame(), frame);
        assert_eq!(show.clock(), clock);
        let after: Vec<f32> = show.stars().iter_active().map(|s| s.y).collect();
        assert_eq!(comet_y, after);

        show.toggle_pause();
        run(&mut show, 1);
        assert_eq!(show.frame(), frame + 1);
    }

    #[test]
    fn test_zero_sim_speed_holds_particles() {
        let mut show = show(ShowConfig {
            auto_launch: false,
            ..ShowConfig::default()
        });
        show.launch(LaunchRequest {
            position: Some((0.5, 0.5)),
            ..LaunchRequest::default()
        });
        show.set_sim_speed(0.0);
        let before: Vec<(f32, f32)> = show.stars().iter_active().map(|s| (s.x, s.life)).collect();
        run(&mut show, 20);
        let after: Vec<(f32, f32)> = show.stars().iter_active().map(|s| (s.x, s.life)).collect();
        assert_eq!(before, after);
        assert_eq!(show.clock(), 0.0);
    }

    #[test]
    fn test_inputs_are_clamped() {
        let mut show = show(ShowConfig::default());
        show.set_sim_speed(7.0);
        assert_eq!(show.sim_speed(), 1.0);
        show.set_sim_speed(-1.0);
        assert_eq!(show.sim_speed(), 0.0);
        show.set_sim_speed(1.0);

        show.update(-50.0, f32::NAN);
        assert_eq!(show.clock(), 0.0);
        show.update(10_000.0, 1.0);
        assert_eq!(show.clock(), f64::from(MAX_FRAME_TIME));
    }

    #[test]
    fn test_launch_request_overrides_config() {
        let mut show = show(ShowConfig {
            auto_launch: false,
            ..ShowConfig::default()
        });
        show.launch(LaunchRequest {
            position: Some((0.0, 1.0)),
            shell_type: Some(ShellType::Willow),
            size: Some(0.0),
        });
        let comet = show.stars().iter_active().next().expect("comet");
        assert_eq!(comet.x, 60.0);
        assert_eq!(comet.color, Color::White);
        assert_eq!(comet.spark_color, Color::Gold);
    }

    #[test]
    fn test_launch_at_stage_point() {
        let mut show = show(ShowConfig {
            auto_launch: false,
            ..ShowConfig::default()
        });
        show.launch_at(640.0, 100.0);
        let comet = show.stars().iter_active().next().expect("comet");
        assert_eq!(comet.x, 640.0);
    }

    #[test]
    fn test_set_config_rederives_quality() {
        let mut show = show(ShowConfig::default());
        show.update_config(|c| {
            c.quality = Quality::High;
            c.size = 12.0;
        });
        assert_eq!(show.quality(), Quality::High);
        assert_eq!(show.config().size, 4.0);
    }

    #[test]
    fn test_sky_lighting_off_keeps_sky_black() {
        let mut show = show(ShowConfig {
            sky_lighting: SkyLighting::None,
            ..ShowConfig::default()
        });
        run(&mut show, 400);
        assert_eq!(show.sky_color(), (0, 0, 0));
    }
}
