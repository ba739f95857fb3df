use std::io::Write;

use pyroshow::{BurstFlash, Color, Show};

/// Virtual stage pixels per half-block pixel.
pub const STAGE_SCALE: f32 = 8.0;

const FLASH_STOPS: [(f32, (f32, f32, f32), f32); 4] = [
    (0.024, (255.0, 255.0, 255.0), 1.0),
    (0.125, (255.0, 160.0, 20.0), 0.2),
    (0.32, (255.0, 140.0, 20.0), 0.11),
    (1.0, (255.0, 120.0, 20.0), 0.0),
];

const SPEED_BAR_COLOR: (u8, u8, u8) = (0x1e, 0x7f, 0xff);

/// Half-block truecolor renderer. Trails live in a persistent buffer that
/// fades a little every simulated frame; star heads are redrawn from
/// scratch each frame on top.
pub struct Renderer {
    width: usize,
    height: usize,
    bg_color: (u8, u8, u8),
    trails: Vec<[f32; 3]>,
    heads: Vec<bool>,
    output_buf: Vec<u8>,
    /// Fades out after the speed changes.
    pub speed_bar_opacity: f32,
}

impl Renderer {
    pub fn new(cols: u16, rows: u16, bg_color: (u8, u8, u8)) -> Self {
        let width = usize::from(cols.max(1));
        let height = usize::from(rows.max(1)) * 2;
        Self {
            width,
            height,
            bg_color,
            trails: vec![[0.0; 3]; width * height],
            heads: vec![false; width * height],
            output_buf: Vec::with_capacity(width * height * 25),
            speed_bar_opacity: 0.0,
        }
    }

    pub fn bg_color(&self) -> (u8, u8, u8) {
        self.bg_color
    }

    /// Stage size matching this terminal, in virtual pixels.
    pub fn stage_size(&self) -> (f32, f32) {
        (
            self.width as f32 * STAGE_SCALE,
            self.height as f32 * STAGE_SCALE,
        )
    }

    /// Fade trails once per simulated step.
    pub fn fade(&mut self, show: &Show, lag: f32) {
        let amount = if show.config().long_exposure {
            0.0025
        } else {
            0.1 * show.sim_speed() * lag
        };
        let keep = 1.0 - amount.clamp(0.0, 1.0);
        for pixel in &mut self.trails {
            for channel in pixel {
                *channel *= keep;
            }
        }
        self.speed_bar_opacity = (self.speed_bar_opacity - lag / 30.0).max(0.0);
    }

    pub fn render(&mut self, show: &mut Show, out: &mut impl Write) -> std::io::Result<()> {
        for flash in show.drain_flashes() {
            self.draw_flash(&flash);
        }

        self.heads.iter_mut().for_each(|h| *h = false);
        for color in Color::VISIBLE {
            let Some(rgb) = color.rgb() else {
                continue;
            };
            for star in show.stars().iter_bucket(color.index()) {
                self.draw_line(star.prev_x, star.prev_y, star.x, star.y, rgb);
                self.mark_head(star.x, star.y);
            }
            for spark in show.sparks().iter_bucket(color.index()) {
                self.draw_line(spark.prev_x, spark.prev_y, spark.x, spark.y, rgb);
            }
        }

        self.compose(show)?;
        out.write_all(&self.output_buf)?;
        out.flush()
    }

    fn pixel_index(&self, x: f32, y: f32) -> Option<usize> {
        let px = (x / STAGE_SCALE).floor();
        let py = (y / STAGE_SCALE).floor();
        if px < 0.0 || py < 0.0 {
            return None;
        }
        let (px, py) = (px as usize, py as usize);
        (px < self.width && py < self.height).then(|| py * self.width + px)
    }

    /// Lighten blend: keep the brighter value per channel.
    fn lighten(&mut self, index: usize, rgb: (u8, u8, u8)) {
        let pixel = &mut self.trails[index];
        pixel[0] = pixel[0].max(f32::from(rgb.0));
        pixel[1] = pixel[1].max(f32::from(rgb.1));
        pixel[2] = pixel[2].max(f32::from(rgb.2));
    }

    fn draw_line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, rgb: (u8, u8, u8)) {
        let dx = (x1 - x0) / STAGE_SCALE;
        let dy = (y1 - y0) / STAGE_SCALE;
        let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as usize;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            if let Some(index) = self.pixel_index(x0 + (x1 - x0) * t, y0 + (y1 - y0) * t) {
                self.lighten(index, rgb);
            }
        }
    }

    fn mark_head(&mut self, x: f32, y: f32) {
        if let Some(index) = self.pixel_index(x, y) {
            self.heads[index] = true;
        }
    }

    /// Radial gradient painted over the trails.
    fn draw_flash(&mut self, flash: &BurstFlash) {
        if flash.radius <= 0.0 {
            return;
        }
        let radius_px = (flash.radius / STAGE_SCALE).ceil() as isize;
        let cx = (flash.x / STAGE_SCALE) as isize;
        let cy = (flash.y / STAGE_SCALE) as isize;
        for py in cy - radius_px..=cy + radius_px {
            for px in cx - radius_px..=cx + radius_px {
                if px < 0 || py < 0 || px as usize >= self.width || py as usize >= self.height {
                    continue;
                }
                let sx = (px as f32 + 0.5) * STAGE_SCALE - flash.x;
                let sy = (py as f32 + 0.5) * STAGE_SCALE - flash.y;
                let t = (sx * sx + sy * sy).sqrt() / flash.radius;
                if t >= 1.0 {
                    continue;
                }
                let (color, alpha) = gradient_at(t);
                let pixel = &mut self.trails[py as usize * self.width + px as usize];
                pixel[0] = pixel[0] * (1.0 - alpha) + color.0 * alpha;
                pixel[1] = pixel[1] * (1.0 - alpha) + color.1 * alpha;
                pixel[2] = pixel[2] * (1.0 - alpha) + color.2 * alpha;
            }
        }
    }

    fn compose(&mut self, show: &Show) -> std::io::Result<()> {
        let mut buf = std::mem::take(&mut self.output_buf);
        buf.clear();
        buf.extend_from_slice(b"\x1b[H");

        let sky = show.sky_color();
        let base = (
            self.bg_color.0.saturating_add(sky.0),
            self.bg_color.1.saturating_add(sky.1),
            self.bg_color.2.saturating_add(sky.2),
        );
        let bar_width = (self.width as f32 * show.sim_speed()).round() as usize;
        let bar_row = self.height - 1;

        let color_at = |index: usize, x: usize, y: usize| -> (u8, u8, u8) {
            if self.speed_bar_opacity > 0.0 && y == bar_row && x < bar_width {
                return blend(base, SPEED_BAR_COLOR, self.speed_bar_opacity);
            }
            if self.heads[index] {
                return (255, 255, 255);
            }
            let [r, g, b] = self.trails[index];
            (
                base.0.max(r.min(255.0) as u8),
                base.1.max(g.min(255.0) as u8),
                base.2.max(b.min(255.0) as u8),
            )
        };

        let mut prev_top_color: Option<(u8, u8, u8)> = None;
        let mut prev_bot_color: Option<(u8, u8, u8)> = None;

        for y in (0..self.height).step_by(2) {
            for x in 0..self.width {
                let top_idx = y * self.width + x;
                let bot_y = if y + 1 < self.height { y + 1 } else { y };
                let top_color = color_at(top_idx, x, y);
                let bot_color = color_at(bot_y * self.width + x, x, bot_y);

                if prev_top_color != Some(top_color) {
                    write!(
                        buf,
                        "\x1b[48;2;{};{};{}m",
                        top_color.0, top_color.1, top_color.2
                    )?;
                    prev_top_color = Some(top_color);
                }
                if prev_bot_color != Some(bot_color) {
                    write!(
                        buf,
                        "\x1b[38;2;{};{};{}m",
                        bot_color.0, bot_color.1, bot_color.2
                    )?;
                    prev_bot_color = Some(bot_color);
                }
                buf.extend_from_slice("▄".as_bytes());
            }
            buf.extend_from_slice(b"\x1b[0m");
            prev_top_color = None;
            prev_bot_color = None;
            if y + 2 < self.height {
                buf.extend_from_slice(b"\r\n");
            }
        }

        self.output_buf = buf;
        Ok(())
    }
}

fn gradient_at(t: f32) -> ((f32, f32, f32), f32) {
    if t <= FLASH_STOPS[0].0 {
        return (FLASH_STOPS[0].1, FLASH_STOPS[0].2);
    }
    for pair in FLASH_STOPS.windows(2) {
        let (t0, c0, a0) = pair[0];
        let (t1, c1, a1) = pair[1];
        if t <= t1 {
            let f = (t - t0) / (t1 - t0);
            let lerp = |a: f32, b: f32| a + (b - a) * f;
            return ((lerp(c0.0, c1.0), lerp(c0.1, c1.1), lerp(c0.2, c1.2)), lerp(a0, a1));
        }
    }
    (FLASH_STOPS[3].1, 0.0)
}

fn blend(from: (u8, u8, u8), to: (u8, u8, u8), amount: f32) -> (u8, u8, u8) {
    let mix = |a: u8, b: u8| (f32::from(a) * (1.0 - amount) + f32::from(b) * amount) as u8;
    (mix(from.0, to.0), mix(from.1, to.1), mix(from.2, to.2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gradient_fades_out() {
        assert_eq!(gradient_at(0.0).1, 1.0);
        assert!((gradient_at(0.125).1 - 0.2).abs() < 1e-6);
        assert!(gradient_at(0.99).1 < 0.01);
    }

    #[test]
    fn test_line_lightens_pixels() {
        let mut renderer = Renderer::new(4, 2, (0, 0, 0));
        renderer.draw_line(0.0, 0.0, 31.0, 0.0, (10, 20, 30));
        renderer.draw_line(0.0, 0.0, 0.0, 0.0, (5, 50, 5));
        assert_eq!(renderer.trails[0], [10.0, 50.0, 30.0]);
        assert_eq!(renderer.trails[3], [10.0, 20.0, 30.0]);
        assert_eq!(renderer.trails[4], [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_offscreen_points_are_ignored() {
        let renderer = Renderer::new(4, 2, (0, 0, 0));
        assert_eq!(renderer.pixel_index(-1.0, 0.0), None);
        assert_eq!(renderer.pixel_index(32.0, 0.0), None);
        assert_eq!(renderer.pixel_index(31.9, 31.9), Some(15));
    }
}
