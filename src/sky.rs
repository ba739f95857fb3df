use crate::color::Color;
use crate::particle::Star;
use crate::pool::ParticlePool;

/// Stars needed for full sky brightness.
const MAX_STAR_COUNT: f32 = 500.0;
/// Fraction of the remaining distance covered per frame at full speed.
const EASING: f32 = 10.0;

/// Brightness for `total` visible stars, compressed so a few stars already
/// show.
pub fn intensity(total: usize) -> f32 {
    (total as f32 / MAX_STAR_COUNT).min(1.0).powf(0.3)
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SkyColor {
    current: [f32; 3],
    target: [f32; 3],
}

impl SkyColor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute the target tint from the visible star buckets and ease
    /// toward it. `max_saturation` caps the brightest channel.
    pub fn update(&mut self, stars: &ParticlePool<Star>, max_saturation: f32, speed: f32) {
        let mut total = 0;
        let mut sum = [0.0f32; 3];
        for color in Color::VISIBLE {
            let Some((r, g, b)) = color.rgb() else {
                continue;
            };
            let count = stars.bucket_len(color.index());
            total += count;
            let weight = count as f32;
            sum[0] += f32::from(r) * weight;
            sum[1] += f32::from(g) * weight;
            sum[2] += f32::from(b) * weight;
        }

        let intensity = intensity(total);
        let max_component = sum.iter().copied().fold(1.0f32, f32::max);
        for (target, component) in self.target.iter_mut().zip(sum) {
            *target = component / max_component * max_saturation * intensity;
        }

        for (current, target) in self.current.iter_mut().zip(self.target) {
            *current += (target - *current) / EASING * speed;
        }
    }

    pub fn rgb(&self) -> (u8, u8, u8) {
        let channel = |v: f32| v.round().clamp(0.0, 255.0) as u8;
        (
            channel(self.current[0]),
            channel(self.current[1]),
            channel(self.current[2]),
        )
    }

    pub fn target_rgb(&self) -> (u8, u8, u8) {
        let channel = |v: f32| v.round().clamp(0.0, 255.0) as u8;
        (
            channel(self.target[0]),
            channel(self.target[1]),
            channel(self.target[2]),
        )
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pool_with(color: Color, count: usize) -> ParticlePool<Star> {
        let mut rng = fastrand::Rng::with_seed(3);
        let mut pool = ParticlePool::new(Color::COUNT);
        for _ in 0..count {
            pool.add(Star::new(0.0, 0.0, color, 0.0, 0.0, 1000.0, &mut rng));
        }
        pool
    }

    #[test]
    fn test_empty_sky_stays_black() {
        let mut sky = SkyColor::new();
        sky.update(&ParticlePool::new(Color::COUNT), 30.0, 1.0);
        assert_eq!(sky.rgb(), (0, 0, 0));
        assert_eq!(intensity(0), 0.0);
    }

    #[test]
    fn test_invisible_stars_do_not_tint() {
        let mut sky = SkyColor::new();
        sky.update(&pool_with(Color::Invisible, 800), 30.0, 1.0);
        assert_eq!(sky.target_rgb(), (0, 0, 0));
    }

    #[test]
    fn test_hue_preserved_and_capped() {
        let mut sky = SkyColor::new();
        let stars = pool_with(Color::Gold, 500);
        sky.update(&stars, 30.0, 1.0);
        // ffae00 scaled to a max channel of 30
        assert_eq!(sky.target_rgb(), (30, 20, 0));
        assert_eq!(sky.rgb(), (3, 2, 0));

        for _ in 0..200 {
            sky.update(&stars, 30.0, 1.0);
        }
        assert_eq!(sky.rgb(), (30, 20, 0));
    }

    #[test]
    fn test_zero_speed_freezes_easing() {
        let mut sky = SkyColor::new();
        sky.update(&pool_with(Color::Red, 50), 30.0, 0.0);
        assert_eq!(sky.rgb(), (0, 0, 0));
        assert!(sky.target_rgb().0 > 0);
    }

    proptest! {
        #[test]
        fn prop_intensity_bounded(total in 0usize..100_000) {
            let value = intensity(total);
            prop_assert!((0.0..=1.0).contains(&value));
        }
    }
}
