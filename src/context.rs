use crate::color::ColorPicker;
use crate::config::{Quality, ShowConfig};

const HORIZONTAL_PADDING: f32 = 60.0;
const VERTICAL_PADDING: f32 = 50.0;
/// Shells never burst in the lowest part of the stage.
const MIN_HEIGHT_FRACTION: f32 = 0.45;

/// Virtual canvas the show is laid out on, in pixels with y pointing down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stage {
    pub width: f32,
    pub height: f32,
}

/// Where a comet starts and where its shell should burst.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaunchGeometry {
    pub launch_x: f32,
    pub launch_y: f32,
    pub burst_y: f32,
}

impl LaunchGeometry {
    /// Initial comet speed so that drag and gravity stop it near `burst_y`.
    pub fn launch_velocity(&self) -> f32 {
        let launch_distance = (self.launch_y - self.burst_y).max(0.0);
        (launch_distance * 0.04).powf(0.64)
    }
}

impl Stage {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: width.max(1.0),
            height: height.max(1.0),
        }
    }

    /// Wide stages get the denser desktop sequences.
    pub fn is_desktop(&self) -> bool {
        self.width > 800.0
    }

    pub fn launch_geometry(&self, position: f32, launch_height: f32) -> LaunchGeometry {
        let position = position.clamp(0.0, 1.0);
        let launch_height = launch_height.clamp(0.0, 1.0);
        let launch_width = self.width - HORIZONTAL_PADDING * 2.0;
        let min_height = self.height - self.height * MIN_HEIGHT_FRACTION;
        let max_height = VERTICAL_PADDING;
        LaunchGeometry {
            launch_x: position * launch_width + HORIZONTAL_PADDING,
            launch_y: self.height,
            burst_y: min_height - launch_height * (min_height - max_height),
        }
    }

    /// Map a 0..1 horizontal position away from the stage edges.
    pub fn fit_h(position: f32) -> f32 {
        const EDGE: f32 = 0.18;
        (1.0 - EDGE * 2.0) * position + EDGE
    }

    /// Keep bursts out of the lowest quarter of the launch range.
    pub fn fit_v(height: f32) -> f32 {
        height * 0.75
    }

    /// Convert a point on the stage into a launch position and height.
    /// Points below the burst floor clamp to height 0.
    pub fn position_at(&self, x: f32, y: f32) -> (f32, f32) {
        let launch_width = self.width - HORIZONTAL_PADDING * 2.0;
        let min_height = self.height - self.height * MIN_HEIGHT_FRACTION;
        let position = if launch_width > 0.0 {
            (x - HORIZONTAL_PADDING) / launch_width
        } else {
            0.5
        };
        let range = min_height - VERTICAL_PADDING;
        let height = if range > 0.0 {
            (min_height - y) / range
        } else {
            0.5
        };
        (position.clamp(0.0, 1.0), height.clamp(0.0, 1.0))
    }
}

/// Numbers derived from the quality setting, looked up once instead of
/// branched on at every spawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityProfile {
    pub quality: Quality,
    pub factor: f32,
    pub comet_spark_freq: f32,
    pub floral_count: usize,
    pub crackle_count: usize,
    pub crackle_density: f32,
    pub falling_leaves_spark_freq: f32,
    pub thick_spark_speed: f32,
}

impl QualityProfile {
    pub fn from_quality(quality: Quality) -> Self {
        let factor = quality.factor();
        let high = quality == Quality::High;
        Self {
            quality,
            factor,
            comet_spark_freq: if high { 8.0 } else { 32.0 / factor },
            floral_count: 12 + 6 * factor as usize,
            crackle_count: if high { 26 } else { 12 },
            crackle_density: if quality == Quality::Low { 0.65 } else { 1.0 },
            falling_leaves_spark_freq: 144.0 / factor,
            thick_spark_speed: if high { 1.65 } else { 1.42 },
        }
    }

    pub fn is_low(&self) -> bool {
        self.quality == Quality::Low
    }

    pub fn is_high(&self) -> bool {
        self.quality == Quality::High
    }
}

/// Owns the random source and everything spawn code reads but does not
/// belong to any one particle.
#[derive(Debug, Clone)]
pub struct SimContext {
    pub rng: fastrand::Rng,
    pub colors: ColorPicker,
    pub quality: QualityProfile,
    pub stage: Stage,
    pub sim_speed: f32,
    pub frame: u64,
    /// Simulated milliseconds since the show started.
    pub clock: f64,
}

impl SimContext {
    pub fn new(stage: Stage, quality: Quality) -> Self {
        Self::from_rng(stage, quality, fastrand::Rng::new())
    }

    /// Deterministic context, identical seeds give identical shows.
    pub fn with_seed(stage: Stage, quality: Quality, seed: u64) -> Self {
        Self::from_rng(stage, quality, fastrand::Rng::with_seed(seed))
    }

    fn from_rng(stage: Stage, quality: Quality, rng: fastrand::Rng) -> Self {
        Self {
            rng,
            colors: ColorPicker::new(),
            quality: QualityProfile::from_quality(quality),
            stage,
            sim_speed: 1.0,
            frame: 0,
            clock: 0.0,
        }
    }

    pub fn apply_config(&mut self, config: &ShowConfig) {
        if self.quality.quality != config.quality {
            self.quality = QualityProfile::from_quality(config.quality);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_geometry_bounds() {
        let stage = Stage::new(1280.0, 720.0);
        let low = stage.launch_geometry(0.0, 0.0);
        assert_eq!(low.launch_x, 60.0);
        assert_eq!(low.launch_y, 720.0);
        assert!((low.burst_y - 396.0).abs() < 1e-3);

        let high = stage.launch_geometry(1.0, 1.0);
        assert_eq!(high.launch_x, 1220.0);
        assert_eq!(high.burst_y, 50.0);
        assert!(high.launch_velocity() > low.launch_velocity());
    }

    #[test]
    fn test_launch_velocity_value() {
        let geometry = LaunchGeometry {
            launch_x: 0.0,
            launch_y: 720.0,
            burst_y: 220.0,
        };
        let expected = 20.0f32.powf(0.64);
        assert!((geometry.launch_velocity() - expected).abs() < 1e-4);
    }

    #[test]
    fn test_position_at_inverts_geometry() {
        let stage = Stage::new(1280.0, 720.0);
        let geometry = stage.launch_geometry(0.3, 0.6);
        let (position, height) = stage.position_at(geometry.launch_x, geometry.burst_y);
        assert!((position - 0.3).abs() < 1e-4);
        assert!((height - 0.6).abs() < 1e-4);
        assert_eq!(stage.position_at(-50.0, 719.0), (0.0, 0.0));
    }

    #[test]
    fn test_fit_functions() {
        assert!((Stage::fit_h(0.0) - 0.18).abs() < 1e-6);
        assert!((Stage::fit_h(1.0) - 0.82).abs() < 1e-6);
        assert_eq!(Stage::fit_v(1.0), 0.75);
    }

    #[test]
    fn test_quality_profile() {
        let low = QualityProfile::from_quality(Quality::Low);
        assert_eq!(low.comet_spark_freq, 32.0);
        assert_eq!(low.floral_count, 18);
        assert_eq!(low.crackle_density, 0.65);
        assert!(low.is_low());

        let normal = QualityProfile::from_quality(Quality::Normal);
        assert_eq!(normal.comet_spark_freq, 16.0);
        assert_eq!(normal.falling_leaves_spark_freq, 72.0);
        assert_eq!(normal.thick_spark_speed, 1.42);

        let high = QualityProfile::from_quality(Quality::High);
        assert_eq!(high.comet_spark_freq, 8.0);
        assert_eq!(high.floral_count, 30);
        assert_eq!(high.crackle_count, 26);
        assert!(high.is_high());
    }

    #[test]
    fn test_apply_config_swaps_profile() {
        let mut ctx = SimContext::with_seed(Stage::new(800.0, 600.0), Quality::Normal, 1);
        let config = ShowConfig {
            quality: Quality::High,
            ..ShowConfig::default()
        };
        ctx.apply_config(&config);
        assert!(ctx.quality.is_high());
        assert!(!ctx.stage.is_desktop());
    }
}
