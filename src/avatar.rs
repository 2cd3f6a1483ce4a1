//! Pet avatar: a small RGBA canvas rasterised to braille cells, with an
//! ASCII sprite fallback.

use crate::model::{Mood, Outfit, PetAppearance, Species};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Pixel {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    pub(crate) a: u8,
}

impl Pixel {
    const fn rgb(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

const INK: Pixel = Pixel::rgb(30, 20, 30, 245);
const BLUSH: Pixel = Pixel::rgb(255, 160, 180, 200);
const TEAR: Pixel = Pixel::rgb(120, 190, 255, 235);
const WHITE: Pixel = Pixel::rgb(250, 250, 255, 235);

pub(crate) struct PixelCanvas {
    pub(crate) w: u32,
    pub(crate) h: u32,
    pub(crate) px: Vec<Pixel>,
}

impl PixelCanvas {
    pub(crate) fn new(w: u32, h: u32) -> Self {
        Self {
            w,
            h,
            px: vec![Pixel::default(); (w as usize) * (h as usize)],
        }
    }

    fn idx(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }

    pub(crate) fn get(&self, x: u32, y: u32) -> Pixel {
        self.px[self.idx(x, y)]
    }

    #[cfg(test)]
    pub(crate) fn ink_count(&self) -> usize {
        self.px.iter().filter(|p| p.a >= 32).count()
    }

    fn blend_over(&mut self, x: i32, y: i32, src: Pixel) {
        if x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as u32, y as u32);
        if x >= self.w || y >= self.h {
            return;
        }
        let i = self.idx(x, y);
        let dst = self.px[i];

        let sa = src.a as f32 / 255.0;
        let da = dst.a as f32 / 255.0;

        let out_a = sa + da * (1.0 - sa);
        if out_a <= 1e-6 {
            self.px[i] = Pixel::default();
            return;
        }

        let blend = |sc: u8, dc: u8| -> u8 {
            let sc = sc as f32 / 255.0;
            let dc = dc as f32 / 255.0;
            let out = (sc * sa + dc * da * (1.0 - sa)) / out_a;
            (out.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
        };

        self.px[i] = Pixel {
            r: blend(src.r, dst.r),
            g: blend(src.g, dst.g),
            b: blend(src.b, dst.b),
            a: (out_a.clamp(0.0, 1.0) * 255.0 + 0.5) as u8,
        };
    }

    fn ellipse(&mut self, cx: i32, cy: i32, rx: i32, ry: i32, p: Pixel, shade: bool) {
        let (rx, ry) = (rx.max(1), ry.max(1));
        for y in -ry..=ry {
            for x in -rx..=rx {
                let d = (x * x) as f32 / (rx * rx) as f32 + (y * y) as f32 / (ry * ry) as f32;
                if d > 1.0 {
                    continue;
                }
                let a = if shade {
                    (p.a as f32 * (0.55 + 0.45 * (1.0 - d.sqrt()))) as u8
                } else {
                    p.a
                };
                self.blend_over(cx + x, cy + y, Pixel { a, ..p });
            }
        }
    }

    fn disc(&mut self, cx: i32, cy: i32, r: i32, p: Pixel) {
        self.ellipse(cx, cy, r, r, p, false);
    }

    /// Isoceles triangle pointing up.
    fn spike(&mut self, apex_x: i32, apex_y: i32, height: i32, half_base: i32, p: Pixel) {
        for dy in 0..=height {
            let half = half_base * dy / height.max(1);
            for dx in -half..=half {
                self.blend_over(apex_x + dx, apex_y + dy, p);
            }
        }
    }

    fn hline(&mut self, x0: i32, x1: i32, y: i32, p: Pixel) {
        for x in x0.min(x1)..=x0.max(x1) {
            self.blend_over(x, y, p);
        }
    }

    /// Parabolic mouth; positive `curve` smiles, negative frowns.
    fn mouth(&mut self, cx: i32, y: i32, half_w: i32, curve: i32) {
        for dx in -half_w..=half_w {
            let off = curve * (half_w * half_w - dx * dx) / (half_w * half_w).max(1);
            self.blend_over(cx + dx, y + off, INK);
        }
    }
}

/* -----------------------------
   Braille encoding: 2×4 pixels -> U+2800..U+28FF
------------------------------ */

fn braille_bit(dx: u32, dy: u32) -> u8 {
    match (dx, dy) {
        (0, 0) => 0x01,
        (0, 1) => 0x02,
        (0, 2) => 0x04,
        (0, 3) => 0x40,
        (1, 0) => 0x08,
        (1, 1) => 0x10,
        (1, 2) => 0x20,
        (1, 3) => 0x80,
        _ => 0x00,
    }
}

fn canvas_to_buffer(canvas: &PixelCanvas, area: Rect, buf: &mut Buffer, enable_color: bool) {
    for cy in 0..area.height as u32 {
        for cx in 0..area.width as u32 {
            let mut mask: u8 = 0;
            let (mut sr, mut sg, mut sb, mut n) = (0u32, 0u32, 0u32, 0u32);

            for dy in 0..4 {
                for dx in 0..2 {
                    let (x, y) = (cx * 2 + dx, cy * 4 + dy);
                    if x >= canvas.w || y >= canvas.h {
                        continue;
                    }
                    let p = canvas.get(x, y);
                    if p.a >= 32 {
                        mask |= braille_bit(dx, dy);
                        sr += p.r as u32;
                        sg += p.g as u32;
                        sb += p.b as u32;
                        n += 1;
                    }
                }
            }
            if mask == 0 {
                continue;
            }

            let ch = char::from_u32(0x2800 + mask as u32).unwrap_or(' ');
            let fg = if enable_color {
                Color::Rgb((sr / n) as u8, (sg / n) as u8, (sb / n) as u8)
            } else {
                Color::White
            };
            let cell = buf.get_mut(area.x + cx as u16, area.y + cy as u16);
            cell.set_char(ch);
            cell.set_fg(fg);
        }
    }
}

/// Gentle idle bob; quicker and higher when happy.
pub(crate) fn bounce_offset(mood: Mood, frames: u64) -> (i32, i32) {
    let (speed, amp) = match mood {
        Mood::Happy => (0.45, 4.0),
        Mood::Sleeping => (0.05, 1.0),
        _ => (0.12, 2.0),
    };
    let t = frames as f32 * speed;
    ((t.cos() * 1.5) as i32, (t.sin().abs() * -amp) as i32)
}

pub(crate) fn draw_pet(
    canvas: &mut PixelCanvas,
    look: &PetAppearance,
    mood: Mood,
    offset: (i32, i32),
) {
    let (w, h) = (canvas.w as i32, canvas.h as i32);
    let r = (w.min(h) / 2 * 11 / 20).clamp(6, 28);
    let cx = w / 2 + offset.0;
    let cy = h / 2 + r / 4 + offset.1;

    let ((mr, mg, mb), (dr, dg, db)) = look.color.rgb();
    let main = Pixel::rgb(mr, mg, mb, 225);
    let dark = Pixel::rgb(dr, dg, db, 235);

    // ears sit behind the head
    match look.species {
        Species::Bear => {
            canvas.disc(cx - r * 7 / 10, cy - r * 3 / 4, r / 3, main);
            canvas.disc(cx + r * 7 / 10, cy - r * 3 / 4, r / 3, main);
            canvas.disc(cx - r * 7 / 10, cy - r * 3 / 4, r / 6, BLUSH);
            canvas.disc(cx + r * 7 / 10, cy - r * 3 / 4, r / 6, BLUSH);
        }
        Species::Cat => {
            canvas.spike(cx - r / 2, cy - r * 13 / 10, r * 3 / 4, r / 3, main);
            canvas.spike(cx + r / 2, cy - r * 13 / 10, r * 3 / 4, r / 3, main);
        }
        Species::Rabbit => {
            canvas.ellipse(cx - r / 3, cy - r * 13 / 10, r / 5, r * 3 / 5, main, false);
            canvas.ellipse(cx + r / 3, cy - r * 13 / 10, r / 5, r * 3 / 5, main, false);
            canvas.ellipse(cx - r / 3, cy - r * 13 / 10, r / 10, r * 2 / 5, BLUSH, false);
            canvas.ellipse(cx + r / 3, cy - r * 13 / 10, r / 10, r * 2 / 5, BLUSH, false);
        }
    }

    canvas.ellipse(cx, cy, r, r * 9 / 10, main, true);

    let ex = r / 3;
    let ey = cy - r / 6;
    match look.outfit {
        Outfit::Everyday => {
            canvas.disc(cx + r * 2 / 3 - 2, cy - r * 2 / 3, 2, dark);
            canvas.disc(cx + r * 2 / 3 + 2, cy - r * 2 / 3, 2, dark);
        }
        Outfit::Pajama => {
            canvas.spike(cx + r / 4, cy - r * 3 / 2, r * 3 / 5, r / 2, dark);
            canvas.disc(cx + r / 4, cy - r * 3 / 2, 2, WHITE);
        }
        Outfit::Hero => {
            for dy in -2..=2 {
                canvas.hline(cx - r * 4 / 5, cx + r * 4 / 5, ey + dy, dark);
            }
        }
    }

    let mouth_y = cy + r / 3;
    match mood {
        Mood::Idle => {
            canvas.disc(cx - ex, ey, 1, INK);
            canvas.disc(cx + ex, ey, 1, INK);
            canvas.mouth(cx, mouth_y, r / 5, 2);
        }
        Mood::Happy => {
            for side in [-ex, ex] {
                for d in -3..=3i32 {
                    canvas.blend_over(cx + side + d, ey - 2 + d.abs(), INK);
                }
            }
            canvas.disc(cx - ex - 3, ey + 4, 2, BLUSH);
            canvas.disc(cx + ex + 3, ey + 4, 2, BLUSH);
            canvas.mouth(cx, mouth_y, r / 4, 4);
        }
        Mood::Thinking => {
            canvas.disc(cx - ex + 1, ey - 1, 1, INK);
            canvas.disc(cx + ex + 1, ey - 1, 1, INK);
            canvas.hline(cx - r / 8, cx + r / 8, mouth_y, INK);
            for (i, rr) in [1, 2, 3].iter().enumerate() {
                let i = i as i32;
                canvas.disc(cx + r + 2 + i * 4, cy - r - i * 5, *rr, WHITE);
            }
        }
        Mood::Worried | Mood::Crying => {
            canvas.disc(cx - ex, ey, 1, INK);
            canvas.disc(cx + ex, ey, 1, INK);
            for d in 0..4 {
                canvas.blend_over(cx - ex - 2 + d, ey - 5 + d / 2, INK);
                canvas.blend_over(cx + ex + 2 - d, ey - 5 + d / 2, INK);
            }
            canvas.mouth(cx, mouth_y + 2, r / 6, -2);
            if mood == Mood::Crying {
                for d in 1..6 {
                    canvas.blend_over(cx - ex, ey + 1 + d, TEAR);
                    canvas.blend_over(cx + ex, ey + 1 + d, TEAR);
                }
            }
        }
        Mood::Sleeping => {
            canvas.hline(cx - ex - 3, cx - ex + 3, ey, INK);
            canvas.hline(cx + ex - 3, cx + ex + 3, ey, INK);
            canvas.disc(cx + r, cy - r, 2, WHITE);
            canvas.disc(cx + r + 5, cy - r - 5, 1, WHITE);
        }
    }
}

const ASCII_BODY: [&str; 7] = [
    "    _______    ",
    "   /       \\   ",
    "  |  o   o  |  ",
    "  |    ^    |  ",
    "  |   \\_/   |  ",
    "   \\_______/   ",
    "               ",
];

fn ascii_sprite(look: &PetAppearance, mood: Mood) -> [String; 8] {
    let ears = match look.species {
        Species::Bear => "   ()     ()   ",
        Species::Cat => "   /\\     /\\   ",
        Species::Rabbit => "    ||   ||    ",
    };
    let mut rows: [String; 8] = Default::default();
    rows[0] = ears.to_string();
    for (i, line) in ASCII_BODY.iter().enumerate() {
        rows[i + 1] = line.to_string();
    }
    rows[3] = match mood {
        Mood::Happy => "  |  ^   ^  |  ",
        Mood::Sleeping => "  |  -   -  |  ",
        Mood::Crying => "  |  T   T  |  ",
        Mood::Thinking => "  |  o   o  | ?",
        _ => "  |  o   o  |  ",
    }
    .to_string();
    rows[5] = match mood {
        Mood::Worried | Mood::Crying => "  |   /-\\   |  ",
        Mood::Thinking | Mood::Sleeping => "  |   ---   |  ",
        _ => "  |   \\_/   |  ",
    }
    .to_string();
    rows[7] = match look.outfit {
        Outfit::Everyday => "",
        Outfit::Pajama => "    ~ zzz ~    ",
        Outfit::Hero => "   [ HERO ]    ",
    }
    .to_string();
    rows
}

/// Renders the pet into its stage area.
pub(crate) struct PetAvatar<'a> {
    pub(crate) look: &'a PetAppearance,
    pub(crate) mood: Mood,
    pub(crate) frames: u64,
    pub(crate) braille: bool,
    pub(crate) color: bool,
}

impl Widget for PetAvatar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 4 || area.height < 4 {
            return;
        }
        let offset = bounce_offset(self.mood, self.frames);

        if self.braille {
            let mut canvas = PixelCanvas::new(area.width as u32 * 2, area.height as u32 * 4);
            draw_pet(&mut canvas, self.look, self.mood, offset);
            canvas_to_buffer(&canvas, area, buf, self.color);
            return;
        }

        let fg = if self.color {
            let ((r, g, b), _) = self.look.color.rgb();
            Color::Rgb(r, g, b)
        } else {
            Color::White
        };
        let rows = ascii_sprite(self.look, self.mood);
        let x0 = area.x + area.width.saturating_sub(15) / 2;
        let y0 = (area.y + area.height.saturating_sub(rows.len() as u16) / 2)
            .saturating_add_signed((offset.1 / 4) as i16);
        for (i, line) in rows.iter().enumerate() {
            let y = y0 + i as u16;
            if y < area.y || y >= area.bottom() {
                continue;
            }
            buf.set_stringn(x0, y, line, area.width as usize, Style::default().fg(fg));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ColorTheme;

    fn draw(look: &PetAppearance, mood: Mood) -> PixelCanvas {
        let mut c = PixelCanvas::new(80, 96);
        draw_pet(&mut c, look, mood, (0, 0));
        c
    }

    #[test]
    fn every_mood_draws_something_distinct() {
        let look = PetAppearance::default();
        let moods = [
            Mood::Idle,
            Mood::Thinking,
            Mood::Happy,
            Mood::Worried,
            Mood::Crying,
            Mood::Sleeping,
        ];
        let canvases: Vec<_> = moods.iter().map(|m| draw(&look, *m)).collect();
        for c in &canvases {
            assert!(c.ink_count() > 500);
        }
        for i in 0..canvases.len() {
            for j in (i + 1)..canvases.len() {
                assert_ne!(canvases[i].px, canvases[j].px, "{:?} vs {:?}", moods[i], moods[j]);
            }
        }
    }

    #[test]
    fn theme_color_tints_the_body() {
        let mut look = PetAppearance::default();
        look.color = ColorTheme::Blue;
        let c = draw(&look, Mood::Idle);
        // centre of the body, below the face
        let p = c.get(40, 48 + 12);
        assert!(p.b > p.r, "{p:?}");
    }

    #[test]
    fn widget_writes_braille_and_ascii() {
        let look = PetAppearance::default();
        let area = Rect::new(0, 0, 30, 14);

        let mut buf = Buffer::empty(area);
        PetAvatar { look: &look, mood: Mood::Happy, frames: 3, braille: true, color: true }
            .render(area, &mut buf);
        let braille = buf
            .content()
            .iter()
            .filter(|c| c.symbol().chars().any(|ch| ('\u{2801}'..='\u{28FF}').contains(&ch)))
            .count();
        assert!(braille > 20);

        let mut buf = Buffer::empty(area);
        PetAvatar { look: &look, mood: Mood::Sleeping, frames: 0, braille: false, color: false }
            .render(area, &mut buf);
        let text: String = buf.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("-   -"));
    }
}
