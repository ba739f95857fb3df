use std::f32::consts::TAU;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::color::{Color, ColorOptions, ColorPicker, ShellColor};
use crate::context::SimContext;
use crate::shell::{Glitter, ShellSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShellType {
    #[default]
    Random,
    Crackle,
    Crossette,
    Crysanthemum,
    #[serde(rename = "Falling Leaves")]
    FallingLeaves,
    Floral,
    #[serde(rename = "Horse Tail")]
    HorseTail,
    Palm,
    Ring,
    Willow,
}

impl ShellType {
    /// Menu order, `Random` first.
    pub const ALL: [ShellType; 10] = [
        ShellType::Random,
        ShellType::Crackle,
        ShellType::Crossette,
        ShellType::Crysanthemum,
        ShellType::FallingLeaves,
        ShellType::Floral,
        ShellType::HorseTail,
        ShellType::Palm,
        ShellType::Ring,
        ShellType::Willow,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            ShellType::Random => "Random",
            ShellType::Crackle => "Crackle",
            ShellType::Crossette => "Crossette",
            ShellType::Crysanthemum => "Crysanthemum",
            ShellType::FallingLeaves => "Falling Leaves",
            ShellType::Floral => "Floral",
            ShellType::HorseTail => "Horse Tail",
            ShellType::Palm => "Palm",
            ShellType::Ring => "Ring",
            ShellType::Willow => "Willow",
        }
    }

    /// Next entry in menu order, wrapping around.
    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    /// Expensive types kept out of rapid-fire sequences.
    pub const fn is_heavy(self) -> bool {
        matches!(
            self,
            ShellType::FallingLeaves | ShellType::Floral | ShellType::Willow
        )
    }

    /// Crysanthemum most of the time, otherwise any concrete type.
    pub fn random(rng: &mut fastrand::Rng) -> Self {
        if rng.f32() < 0.6 {
            ShellType::Crysanthemum
        } else {
            Self::ALL[rng.usize(1..Self::ALL.len())]
        }
    }

    /// Resolve `Random` to a concrete type.
    pub fn resolve(self, rng: &mut fastrand::Rng) -> Self {
        match self {
            ShellType::Random => Self::random(rng),
            other => other,
        }
    }

    /// Like [`resolve`](Self::resolve) but never picks a heavy type at
    /// random. An explicitly chosen type is kept as is.
    pub fn resolve_fast(self, rng: &mut fastrand::Rng) -> Self {
        match self {
            ShellType::Random => loop {
                let candidate = Self::random(rng);
                if !candidate.is_heavy() {
                    break candidate;
                }
            },
            other => other,
        }
    }

    /// Options for a shell of this type at size selector `size` (0 for 3",
    /// 4 for 12").
    pub fn build(self, size: f32, ctx: &mut SimContext) -> ShellSpec {
        let SimContext {
            rng,
            colors,
            quality,
            ..
        } = ctx;

        match self.resolve(rng) {
            ShellType::Random | ShellType::Crysanthemum => {
                let glitter = rng.f32() < 0.25;
                let single_color = rng.f32() < 0.72;
                let color = if single_color {
                    ShellColor::Single(colors.random_color(rng, ColorOptions::limit_white()))
                } else {
                    let first = colors.any(rng);
                    ShellColor::Pair(first, colors.random_color(rng, ColorOptions::not_same()))
                };
                let pistil = single_color && rng.f32() < 0.42;
                let pistil_color = match (pistil, color.single()) {
                    (true, Some(c)) => Some(colors.pistil_color(rng, c)),
                    _ => None,
                };
                let second_color = match color.single() {
                    Some(c) if rng.f32() < 0.42 || c == Color::White => Some(
                        pistil_color.unwrap_or_else(|| {
                            colors.random_color(
                                rng,
                                ColorOptions {
                                    not_color: Some(c),
                                    limit_white: true,
                                    ..ColorOptions::default()
                                },
                            )
                        }),
                    ),
                    _ => None,
                };
                let streamers =
                    !pistil && color != ShellColor::Single(Color::White) && rng.f32() < 0.42;
                let mut star_density = if glitter { 1.1 } else { 1.5 };
                if quality.is_low() {
                    star_density *= 0.8;
                }
                if quality.is_high() {
                    star_density = 1.5;
                }
                ShellSpec {
                    size: 300.0 + size * 100.0,
                    star_life: 900.0 + size * 200.0,
                    star_density: Some(star_density),
                    color: Some(color),
                    second_color,
                    glitter: glitter.then_some(Glitter::Light),
                    glitter_color: Some(ColorPicker::white_or_gold(rng)),
                    pistil,
                    pistil_color,
                    streamers,
                    ..ShellSpec::default()
                }
            }
            ShellType::Palm => {
                let color = colors.any(rng);
                let thick = rng.f32() < 0.5;
                ShellSpec {
                    size: 250.0 + size * 75.0,
                    star_life: 1800.0 + size * 200.0,
                    star_density: Some(if thick { 0.3 } else { 0.6 }),
                    color: Some(color.into()),
                    glitter: Some(if thick { Glitter::Thick } else { Glitter::Heavy }),
                    ..ShellSpec::default()
                }
            }
            ShellType::Ring => {
                let color = colors.any(rng);
                let pistil = rng.f32() < 0.75;
                ShellSpec {
                    size: 300.0 + size * 100.0,
                    star_life: 900.0 + size * 200.0,
                    // Counted from the size selector, not the pixel size.
                    star_count: Some(ring_star_count(size)),
                    color: Some(color.into()),
                    ring: true,
                    pistil,
                    pistil_color: Some(colors.pistil_color(rng, color)),
                    glitter: (!pistil).then_some(Glitter::Light),
                    glitter_color: Some(if color == Color::Gold {
                        Color::Gold
                    } else {
                        Color::White
                    }),
                    streamers: rng.f32() < 0.3,
                    ..ShellSpec::default()
                }
            }
            ShellType::Crossette => {
                let color = colors.random_color(rng, ColorOptions::limit_white());
                ShellSpec {
                    size: 300.0 + size * 100.0,
                    star_life: 900.0 + size * 200.0,
                    star_life_variation: Some(0.22),
                    color: Some(color.into()),
                    crossette: true,
                    pistil: rng.f32() < 0.5,
                    pistil_color: Some(colors.pistil_color(rng, color)),
                    ..ShellSpec::default()
                }
            }
            ShellType::Floral => {
                let color = if rng.f32() < 0.65 {
                    ShellColor::Random
                } else if rng.f32() < 0.15 {
                    ShellColor::Single(colors.any(rng))
                } else {
                    let first = colors.any(rng);
                    ShellColor::Pair(first, colors.random_color(rng, ColorOptions::not_same()))
                };
                ShellSpec {
                    size: 300.0 + size * 120.0,
                    star_density: Some(0.38),
                    star_life: 500.0 + size * 50.0,
                    star_life_variation: Some(0.5),
                    color: Some(color),
                    floral: true,
                    ..ShellSpec::default()
                }
            }
            ShellType::FallingLeaves => ShellSpec {
                color: Some(Color::Invisible.into()),
                size: 300.0 + size * 120.0,
                star_density: Some(0.38),
                star_life: 500.0 + size * 50.0,
                star_life_variation: Some(0.5),
                glitter: Some(Glitter::Medium),
                glitter_color: Some(Color::Gold),
                falling_leaves: true,
                ..ShellSpec::default()
            },
            ShellType::Willow => ShellSpec {
                size: 300.0 + size * 100.0,
                star_density: Some(0.7),
                star_life: 3000.0 + size * 300.0,
                glitter: Some(Glitter::Willow),
                glitter_color: Some(Color::Gold),
                color: Some(Color::Invisible.into()),
                ..ShellSpec::default()
            },
            ShellType::Crackle => {
                // favor gold
                let color = if rng.f32() < 0.75 {
                    Color::Gold
                } else {
                    colors.any(rng)
                };
                ShellSpec {
                    size: 380.0 + size * 75.0,
                    star_density: Some(quality.crackle_density),
                    star_life: 600.0 + size * 100.0,
                    star_life_variation: Some(0.32),
                    glitter: Some(Glitter::Light),
                    glitter_color: Some(Color::Gold),
                    color: Some(color.into()),
                    crackle: true,
                    pistil: rng.f32() < 0.65,
                    pistil_color: Some(colors.pistil_color(rng, color)),
                    ..ShellSpec::default()
                }
            }
            ShellType::HorseTail => {
                let color = colors.any(rng);
                let glitter_color = if rng.f32() < 0.5 {
                    ColorPicker::white_or_gold(rng)
                } else {
                    color
                };
                ShellSpec {
                    horsetail: true,
                    color: Some(color.into()),
                    size: 250.0 + size * 38.0,
                    star_density: Some(0.85 + size * 0.1),
                    star_life: 2500.0 + size * 300.0,
                    glitter: Some(Glitter::Medium),
                    glitter_color: Some(glitter_color),
                    ..ShellSpec::default()
                }
            }
        }
    }
}

/// Ring shells place `2.2 * 2π * (size + 1)` stars for size selector `size`.
pub fn ring_star_count(size: f32) -> f32 {
    2.2 * TAU * (size + 1.0)
}

impl fmt::Display for ShellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ShellType {
    type Err = String;

    /// Accepts menu names case-insensitively, with or without spaces.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name().replace(' ', "").to_ascii_lowercase() == wanted)
            .ok_or_else(|| format!("unknown shell type: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Quality;
    use crate::context::Stage;
    use crate::effect::arc_count;
    use crate::scene::Scene;
    use crate::shell::Shell;

    fn ctx(quality: Quality) -> SimContext {
        SimContext::with_seed(Stage::new(1280.0, 720.0), quality, 5)
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("falling leaves".parse(), Ok(ShellType::FallingLeaves));
        assert_eq!("horse-tail".parse(), Ok(ShellType::HorseTail));
        assert_eq!("Ring".parse(), Ok(ShellType::Ring));
        assert!("rocket".parse::<ShellType>().is_err());
    }

    #[test]
    fn test_next_wraps() {
        assert_eq!(ShellType::Random.next(), ShellType::Crackle);
        assert_eq!(ShellType::Willow.next(), ShellType::Random);
    }

    #[test]
    fn test_random_never_returns_random() {
        let mut rng = fastrand::Rng::with_seed(1);
        for _ in 0..500 {
            assert_ne!(ShellType::random(&mut rng), ShellType::Random);
            assert!(!ShellType::Random.resolve_fast(&mut rng).is_heavy());
        }
        assert_eq!(ShellType::Willow.resolve_fast(&mut rng), ShellType::Willow);
    }

    #[test]
    fn test_ring_star_count_uses_size_selector() {
        let mut ctx = ctx(Quality::Normal);
        let spec = ShellType::Ring.build(2.0, &mut ctx);
        let expected = 2.2 * TAU * 3.0;
        assert!((spec.star_count.expect("ring count") - expected).abs() < 1e-4);
        assert_eq!(spec.size, 500.0);

        let shell = Shell::new(spec, &mut ctx);
        assert!((shell.star_count - 41.469).abs() < 1e-2);
    }

    #[test]
    fn test_ring_burst_places_exact_count() {
        let mut ctx = ctx(Quality::Normal);
        let mut scene = Scene::new();
        let spec = ShellSpec {
            pistil: false,
            streamers: false,
            ..ShellType::Ring.build(1.0, &mut ctx)
        };
        let color = spec.color.and_then(|c| c.single()).expect("ring color");
        Shell::new(spec, &mut ctx).burst(0.0, 0.0, &mut scene, &mut ctx);
        assert_eq!(
            scene.stars.bucket_len(color.index()),
            arc_count(ring_star_count(1.0))
        );
    }

    #[test]
    fn test_plain_crysanthemum_burst() {
        let mut ctx = ctx(Quality::Normal);
        let mut scene = Scene::new();
        let spec = ShellSpec {
            color: Some(ShellColor::Single(Color::Blue)),
            second_color: None,
            glitter: None,
            pistil: false,
            streamers: false,
            ..ShellType::Crysanthemum.build(1.0, &mut ctx)
        };
        let shell = Shell::new(spec, &mut ctx);
        shell.burst(640.0, 200.0, &mut scene, &mut ctx);

        assert_eq!(scene.stars.active_count(), arc_count(shell.star_count));
        for star in scene.stars.iter_bucket(Color::Blue.index()) {
            assert!(star.life >= shell.star_life);
            assert!(star.life <= shell.star_life * 1.125 + 1e-3);
            assert_eq!(star.spark_freq, 0.0);
        }
    }

    #[test]
    fn test_crysanthemum_density_by_quality() {
        for _ in 0..20 {
            let mut high = ctx(Quality::High);
            assert_eq!(
                ShellType::Crysanthemum.build(1.0, &mut high).star_density,
                Some(1.5)
            );
        }
        let mut low = ctx(Quality::Low);
        let density = ShellType::Crysanthemum
            .build(1.0, &mut low)
            .star_density
            .expect("density");
        assert!(density == 1.1 * 0.8 || density == 1.5 * 0.8);
    }

    #[test]
    fn test_invisible_types() {
        let mut ctx = ctx(Quality::Normal);
        for t in [ShellType::Willow, ShellType::FallingLeaves] {
            let spec = t.build(1.0, &mut ctx);
            assert_eq!(spec.color, Some(ShellColor::Single(Color::Invisible)));
            assert_eq!(spec.glitter_color, Some(Color::Gold));
        }
    }

    #[test]
    fn test_every_type_builds_and_bursts() {
        let mut ctx = ctx(Quality::Normal);
        for t in ShellType::ALL {
            let mut scene = Scene::new();
            let shell = Shell::new(t.build(3.0, &mut ctx), &mut ctx);
            assert!(shell.size > 0.0 && shell.star_life > 0.0);
            shell.burst(100.0, 100.0, &mut scene, &mut ctx);
            assert!(scene.stars.active_count() >= 6);
            assert!(scene.flashes.active_count() >= 1);
        }
    }
}
