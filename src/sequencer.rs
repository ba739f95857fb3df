use std::f32::consts::{FRAC_PI_2, PI};

use tracing::{debug, trace};

use crate::catalog::ShellType;
use crate::config::ShowConfig;
use crate::context::{SimContext, Stage};
use crate::scene::Scene;
use crate::shell::Shell;
use crate::timeline::{PendingLaunch, Timeline};

/// Quiet period before the first event after a (re)start.
pub const LEAD_IN: f32 = 1000.0;
pub const BARRAGE_COOLDOWN: f64 = 15000.0;
pub const FINALE_COUNT: u32 = 32;
pub const FINALE_INTERVAL: f32 = 170.0;
pub const FINALE_REST: f32 = 6000.0;
/// Falling leaves linger far longer than their star life suggests.
const FALLING_LEAVES_DELAY: f32 = 4600.0;

/// A randomized size and launch point near the configured size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomShot {
    pub size: f32,
    pub position: f32,
    pub height: f32,
}

/// Smaller shells burst lower and stay closer to the center.
pub fn random_shot(base_size: f32, rng: &mut fastrand::Rng) -> RandomShot {
    let max_variance = base_size.min(2.5).max(0.0);
    let variance = rng.f32() * max_variance;
    let size = base_size - variance;
    let height = if max_variance == 0.0 {
        rng.f32()
    } else {
        1.0 - variance / max_variance
    };
    let center_offset = rng.f32() * (1.0 - height * 0.65) * 0.5;
    let x = if rng.f32() < 0.5 {
        0.5 - center_offset
    } else {
        0.5 + center_offset
    };
    RandomShot {
        size,
        position: Stage::fit_h(x),
        height: Stage::fit_v(height),
    }
}

/// Everything an event needs to put shells in the air.
pub struct Launcher<'a> {
    pub config: &'a ShowConfig,
    pub scene: &'a mut Scene,
    pub timeline: &'a mut Timeline,
    pub ctx: &'a mut SimContext,
}

impl Launcher<'_> {
    /// Launch one shell now. Returns how long its burst keeps the sky busy.
    fn fire(&mut self, shell_type: ShellType, size: f32, position: f32, height: f32) -> f32 {
        let shell = Shell::new(shell_type.build(size, self.ctx), self.ctx);
        let busy = if shell.falling_leaves {
            FALLING_LEAVES_DELAY
        } else {
            shell.star_life
        };
        shell.launch(position, height, self.scene, self.ctx);
        busy
    }

    fn schedule(&mut self, delay: f32, launch: PendingLaunch) {
        let fire_at = self.ctx.clock + f64::from(delay);
        self.timeline.schedule(fire_at, launch);
    }

    fn jitter(&mut self, range: f32) -> f32 {
        self.ctx.rng.f32() * range * 2.0 - range
    }
}

/// Fire a launch that came due on the timeline.
pub fn fire_pending(launch: &PendingLaunch, scene: &mut Scene, ctx: &mut SimContext) {
    trace!(shell = %launch.shell_type, x = launch.position, "deferred launch");
    let shell = Shell::new(launch.shell_type.build(launch.size, ctx), ctx);
    shell.launch(launch.position, launch.height, scene, ctx);
}

fn linger(busy: f32, rng: &mut fastrand::Rng) -> f32 {
    900.0 + rng.f32() * 600.0 + busy
}

#[derive(Debug, Clone)]
pub struct Sequencer {
    first: bool,
    finale_count: u32,
    last_barrage: f64,
    countdown: f32,
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl Sequencer {
    pub fn new() -> Self {
        Self {
            first: true,
            finale_count: 0,
            last_barrage: 0.0,
            countdown: LEAD_IN,
        }
    }

    pub fn countdown(&self) -> f32 {
        self.countdown
    }

    pub fn finale_count(&self) -> u32 {
        self.finale_count
    }

    /// Clock time of the most recent barrage.
    pub fn last_barrage(&self) -> f64 {
        self.last_barrage
    }

    /// Count down by `time_step` simulated ms and start the next event when
    /// it runs out. Does nothing while auto launch is off.
    pub fn tick(&mut self, time_step: f32, launcher: &mut Launcher<'_>) {
        if !launcher.config.auto_launch {
            return;
        }
        self.countdown -= time_step;
        if self.countdown <= 0.0 {
            self.countdown = self.start_sequence(launcher) * 1.25;
        }
    }

    /// Launch the next event. Returns the milliseconds until the next one.
    pub fn start_sequence(&mut self, launcher: &mut Launcher<'_>) -> f32 {
        if self.first {
            self.first = false;
            debug!("opening shot");
            let size = launcher.config.size;
            launcher.fire(ShellType::Crysanthemum, size, 0.5, 0.5);
            return 2400.0;
        }

        if launcher.config.finale {
            self.single(launcher);
            return if self.finale_count < FINALE_COUNT {
                self.finale_count += 1;
                FINALE_INTERVAL
            } else {
                self.finale_count = 0;
                FINALE_REST
            };
        }

        let roll = launcher.ctx.rng.f32();
        if roll < 0.2 && launcher.ctx.clock - self.last_barrage > BARRAGE_COOLDOWN {
            return self.barrage(launcher);
        }
        if roll < 0.6 {
            self.single(launcher)
        } else if roll < 0.8 {
            self.pair(launcher)
        } else {
            self.triple(launcher)
        }
    }

    pub fn single(&mut self, launcher: &mut Launcher<'_>) -> f32 {
        let shot = random_shot(launcher.config.size, &mut launcher.ctx.rng);
        let shell_type = launcher.config.shell;
        debug!(size = shot.size, "single shell");
        let busy = launcher.fire(shell_type, shot.size, shot.position, shot.height);
        linger(busy, &mut launcher.ctx.rng)
    }

    pub fn pair(&mut self, launcher: &mut Launcher<'_>) -> f32 {
        let left = random_shot(launcher.config.size, &mut launcher.ctx.rng);
        let right = random_shot(launcher.config.size, &mut launcher.ctx.rng);
        let left_offset = launcher.jitter(0.1);
        let right_offset = launcher.jitter(0.1);
        debug!("shell pair");
        let shell_type = launcher.config.shell;
        let a = launcher.fire(shell_type, left.size, 0.3 + left_offset, left.height);
        let b = launcher.fire(shell_type, right.size, 0.7 + right_offset, right.height);
        linger(a.max(b), &mut launcher.ctx.rng)
    }

    /// One shell in the center now, two smaller ones on the flanks a moment
    /// later. All three share a type.
    pub fn triple(&mut self, launcher: &mut Launcher<'_>) -> f32 {
        let shell_type = launcher.config.shell.resolve_fast(&mut launcher.ctx.rng);
        let base_size = launcher.config.size;
        let small_size = (base_size - 1.25).max(0.0);
        debug!(shell = %shell_type, "triple");

        let offset = launcher.jitter(0.04);
        launcher.fire(shell_type, base_size, 0.5 + offset, 0.7);

        for flank in [0.2, 0.8] {
            let delay = 1000.0 + launcher.ctx.rng.f32() * 400.0;
            let offset = launcher.jitter(0.04);
            launcher.schedule(
                delay,
                PendingLaunch {
                    shell_type,
                    size: small_size,
                    position: flank + offset,
                    height: 0.1,
                },
            );
        }
        4000.0
    }

    /// A wave of pairs spreading out from the center every 200 ms.
    pub fn barrage(&mut self, launcher: &mut Launcher<'_>) -> f32 {
        self.last_barrage = launcher.ctx.clock;
        let (count, special_index) = if launcher.ctx.stage.is_desktop() {
            (11, 3)
        } else {
            (5, 1)
        };
        let size = (launcher.config.size - 2.0).max(0.0);
        let rng = &mut launcher.ctx.rng;
        let (main_type, special_type) = match launcher.config.shell {
            ShellType::Random => {
                let main = if rng.f32() < 0.78 {
                    ShellType::Crysanthemum
                } else {
                    ShellType::Ring
                };
                (main, ShellType::Random.resolve_fast(rng))
            }
            chosen => (chosen, chosen),
        };
        debug!(count, shell = %main_type, "barrage");

        let height = |x: f32| ((x * 5.0 * PI + FRAC_PI_2).cos() + 1.0) / 2.0 * 0.75;
        launcher.fire(main_type, size, 0.5, height(0.5));

        let mut fired = 1;
        let mut delay = 200.0;
        while fired < count {
            let offset = (fired + 1) as f32 / count as f32 / 2.0;
            let shell_type = if fired == special_index {
                special_type
            } else {
                main_type
            };
            for x in [0.5 + offset, 0.5 - offset] {
                launcher.schedule(
                    delay,
                    PendingLaunch {
                        shell_type,
                        size,
                        position: x,
                        height: height(x),
                    },
                );
            }
            fired += 2;
            delay += 200.0;
        }

        3400.0 + count as f32 * 120.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Quality;

    struct Rig {
        config: ShowConfig,
        scene: Scene,
        timeline: Timeline,
        ctx: SimContext,
    }

    impl Rig {
        fn new(config: ShowConfig) -> Self {
            Self {
                config,
                scene: Scene::new(),
                timeline: Timeline::new(),
                ctx: SimContext::with_seed(Stage::new(1280.0, 720.0), Quality::Low, 9),
            }
        }

        fn launcher(&mut self) -> Launcher<'_> {
            Launcher {
                config: &self.config,
                scene: &mut self.scene,
                timeline: &mut self.timeline,
                ctx: &mut self.ctx,
            }
        }
    }

    #[test]
    fn test_opening_shot() {
        let mut rig = Rig::new(ShowConfig::default());
        let mut sequencer = Sequencer::new();
        assert_eq!(sequencer.start_sequence(&mut rig.launcher()), 2400.0);
        assert_eq!(rig.scene.shells_in_flight(), 1);
        assert_eq!(rig.scene.stars.active_count(), 1);
    }

    #[test]
    fn test_finale_rhythm() {
        let mut rig = Rig::new(ShowConfig {
            finale: true,
            ..ShowConfig::default()
        });
        let mut sequencer = Sequencer::new();
        sequencer.start_sequence(&mut rig.launcher());

        for call in 1..=32 {
            assert_eq!(sequencer.start_sequence(&mut rig.launcher()), 170.0, "call {call}");
        }
        assert_eq!(sequencer.finale_count(), 32);
        assert_eq!(sequencer.start_sequence(&mut rig.launcher()), 6000.0);
        assert_eq!(sequencer.finale_count(), 0);
        assert_eq!(sequencer.start_sequence(&mut rig.launcher()), 170.0);
        // one shell per call, plus the opening shot
        assert_eq!(rig.scene.shells_in_flight(), 35);
    }

    #[test]
    fn test_triple_defers_flanks() {
        let mut rig = Rig::new(ShowConfig {
            shell: ShellType::Palm,
            ..ShowConfig::default()
        });
        let mut sequencer = Sequencer::new();
        assert_eq!(sequencer.triple(&mut rig.launcher()), 4000.0);
        assert_eq!(rig.scene.shells_in_flight(), 1);
        assert_eq!(rig.timeline.pending(), 2);

        assert!(rig.timeline.drain_due(999.0).is_empty());
        let due = rig.timeline.drain_due(1400.0);
        assert_eq!(due.len(), 2);
        for launch in &due {
            assert_eq!(launch.shell_type, ShellType::Palm);
            assert_eq!(launch.size, 1.75);
            assert_eq!(launch.height, 0.1);
        }
    }

    #[test]
    fn test_barrage_schedules_pairs() {
        let mut rig = Rig::new(ShowConfig::default());
        let mut sequencer = Sequencer::new();
        rig.ctx.clock = 20_000.0;
        assert_eq!(sequencer.barrage(&mut rig.launcher()), 3400.0 + 11.0 * 120.0);
        assert_eq!(rig.scene.shells_in_flight(), 1);
        assert_eq!(rig.timeline.pending(), 10);
        assert_eq!(rig.timeline.drain_due(20_200.0).len(), 2);
        assert_eq!(rig.timeline.drain_due(21_000.0).len(), 8);
    }

    #[test]
    fn test_mobile_barrage_is_smaller() {
        let mut rig = Rig::new(ShowConfig::default());
        rig.ctx.stage = Stage::new(600.0, 800.0);
        let mut sequencer = Sequencer::new();
        assert_eq!(sequencer.barrage(&mut rig.launcher()), 3400.0 + 5.0 * 120.0);
        assert_eq!(rig.timeline.pending(), 4);
    }

    #[test]
    fn test_no_barrage_during_cooldown() {
        let mut rig = Rig::new(ShowConfig::default());
        let mut sequencer = Sequencer::new();
        sequencer.start_sequence(&mut rig.launcher());
        for _ in 0..100 {
            let wait = sequencer.start_sequence(&mut rig.launcher());
            assert_ne!(wait, 3400.0 + 11.0 * 120.0);
        }
    }

    #[test]
    fn test_tick_rearms_countdown() {
        let mut rig = Rig::new(ShowConfig::default());
        let mut sequencer = Sequencer::new();
        sequencer.tick(999.0, &mut rig.launcher());
        assert_eq!(rig.scene.shells_in_flight(), 0);
        sequencer.tick(1.0, &mut rig.launcher());
        assert_eq!(rig.scene.shells_in_flight(), 1);
        assert_eq!(sequencer.countdown(), 3000.0);
    }

    #[test]
    fn test_tick_idle_without_auto_launch() {
        let mut rig = Rig::new(ShowConfig {
            auto_launch: false,
            ..ShowConfig::default()
        });
        let mut sequencer = Sequencer::new();
        sequencer.tick(10_000.0, &mut rig.launcher());
        assert_eq!(rig.scene.shells_in_flight(), 0);
        assert_eq!(sequencer.countdown(), LEAD_IN);
    }

    #[test]
    fn test_random_shot_bounds() {
        let mut rng = fastrand::Rng::with_seed(4);
        for base in [0.0, 1.0, 3.0, 4.0] {
            for _ in 0..200 {
                let shot = random_shot(base, &mut rng);
                assert!(shot.size >= 0.0 && shot.size <= base);
                assert!((0.18..=0.82).contains(&shot.position));
                assert!((0.0..=0.75).contains(&shot.height));
            }
        }
    }
}
