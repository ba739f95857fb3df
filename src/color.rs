use serde::{Deserialize, Serialize};

// Invisible stars still move and may emit sparks, but are never drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    Red,
    Green,
    Blue,
    Purple,
    Gold,
    White,
    Invisible,
}

impl Color {
    pub const COUNT: usize = 7;

    /// Every bucket, invisible last.
    pub const ALL: [Color; Self::COUNT] = [
        Color::Red,
        Color::Green,
        Color::Blue,
        Color::Purple,
        Color::Gold,
        Color::White,
        Color::Invisible,
    ];

    pub const VISIBLE: [Color; 6] = [
        Color::Red,
        Color::Green,
        Color::Blue,
        Color::Purple,
        Color::Gold,
        Color::White,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn from_index(index: usize) -> Option<Self> {
        if index < Self::COUNT {
            Some(Self::ALL[index])
        } else {
            None
        }
    }

    pub const fn is_visible(self) -> bool {
        !matches!(self, Color::Invisible)
    }

    /// RGB components, `None` for the invisible sentinel.
    pub const fn rgb(self) -> Option<(u8, u8, u8)> {
        match self {
            Color::Red => Some((0xff, 0x00, 0x43)),
            Color::Green => Some((0x14, 0xfc, 0x56)),
            Color::Blue => Some((0x1e, 0x7f, 0xff)),
            Color::Purple => Some((0xe6, 0x0a, 0xff)),
            Color::Gold => Some((0xff, 0xae, 0x00)),
            Color::White => Some((0xff, 0xff, 0xff)),
            Color::Invisible => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellColor {
    Single(Color),
    /// Two colors, either as opposing halves or as two overlapping circles.
    Pair(Color, Color),
    Random,
}

impl ShellColor {
    /// The color the shell is "known" by, if it has exactly one.
    pub fn single(self) -> Option<Color> {
        match self {
            ShellColor::Single(color) => Some(color),
            _ => None,
        }
    }
}

impl From<Color> for ShellColor {
    fn from(color: Color) -> Self {
        ShellColor::Single(color)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ColorOptions {
    /// Never repeat the previously picked color.
    pub not_same: bool,
    /// Never pick this color.
    pub not_color: Option<Color>,
    /// Re-draw white most of the time, it washes out the sky.
    pub limit_white: bool,
}

impl ColorOptions {
    pub fn not_same() -> Self {
        Self {
            not_same: true,
            ..Self::default()
        }
    }

    pub fn not_color(color: Color) -> Self {
        Self {
            not_color: Some(color),
            ..Self::default()
        }
    }

    pub fn limit_white() -> Self {
        Self {
            limit_white: true,
            ..Self::default()
        }
    }
}

/// Random palette selection that remembers the last color it handed out.
#[derive(Debug, Clone, Default)]
pub struct ColorPicker {
    last: Option<Color>,
}

impl ColorPicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn simple(rng: &mut fastrand::Rng) -> Color {
        Color::VISIBLE[rng.usize(..Color::VISIBLE.len())]
    }

    pub fn random_color(&mut self, rng: &mut fastrand::Rng, options: ColorOptions) -> Color {
        let mut color = Self::simple(rng);

        if options.limit_white && color == Color::White && rng.f32() < 0.6 {
            color = Self::simple(rng);
        }

        if options.not_same {
            if let Some(last) = self.last {
                while color == last {
                    color = Self::simple(rng);
                }
            }
        } else if let Some(excluded) = options.not_color {
            while color == excluded {
                color = Self::simple(rng);
            }
        }

        self.last = Some(color);
        color
    }

    pub fn any(&mut self, rng: &mut fastrand::Rng) -> Color {
        self.random_color(rng, ColorOptions::default())
    }

    pub fn white_or_gold(rng: &mut fastrand::Rng) -> Color {
        if rng.f32() < 0.5 { Color::Gold } else { Color::White }
    }

    /// Pistils contrast with their shell: white/gold shells get a colored
    /// pistil, everything else a white or gold one.
    pub fn pistil_color(&mut self, rng: &mut fastrand::Rng, shell_color: Color) -> Color {
        if shell_color == Color::White || shell_color == Color::Gold {
            self.random_color(rng, ColorOptions::not_color(shell_color))
        } else {
            Self::white_or_gold(rng)
        }
    }

    pub fn forget(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_indexes_round_trip() {
        for (i, color) in Color::ALL.iter().enumerate() {
            assert_eq!(color.index(), i);
            assert_eq!(Color::from_index(i), Some(*color));
        }
        assert_eq!(Color::from_index(Color::COUNT), None);
    }

    #[test]
    fn test_invisible_has_no_rgb() {
        assert!(Color::Invisible.rgb().is_none());
        assert!(!Color::Invisible.is_visible());
        assert!(Color::VISIBLE.iter().all(|c| c.rgb().is_some()));
    }

    #[test]
    fn test_not_same_never_repeats() {
        let mut rng = fastrand::Rng::with_seed(7);
        let mut picker = ColorPicker::new();
        let mut last = picker.any(&mut rng);
        for _ in 0..200 {
            let next = picker.random_color(&mut rng, ColorOptions::not_same());
            assert_ne!(next, last);
            last = next;
        }
    }

    #[test]
    fn test_not_color_excludes() {
        let mut rng = fastrand::Rng::with_seed(11);
        let mut picker = ColorPicker::new();
        for _ in 0..200 {
            let c = picker.random_color(&mut rng, ColorOptions::not_color(Color::Gold));
            assert_ne!(c, Color::Gold);
            assert_ne!(c, Color::Invisible);
        }
    }

    #[test]
    fn test_pistil_contrasts_with_white_and_gold() {
        let mut rng = fastrand::Rng::with_seed(3);
        let mut picker = ColorPicker::new();
        for _ in 0..100 {
            assert_ne!(picker.pistil_color(&mut rng, Color::White), Color::White);
            assert_ne!(picker.pistil_color(&mut rng, Color::Gold), Color::Gold);
            let p = picker.pistil_color(&mut rng, Color::Red);
            assert!(p == Color::White || p == Color::Gold);
        }
    }
}
