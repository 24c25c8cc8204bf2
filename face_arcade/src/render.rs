//! Software rendering into an in-memory ARGB framebuffer.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────────────────────┬────────────┐
//! │ SCORE 42                 [HP ██████░░]       │  camera    │
//! │                                              │  preview   │
//! │                                              │  [ROI box] │
//! │               play field                     ├────────────┤
//! │                                              │ ratio  ▮|  │
//! │                                              │ calib ░░░  │
//! │──────────────── ground (runner) ─────────────┴────────────│
//! │ status · settings readout · key legend                    │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here touches the window; the visualizer copies the finished
//! buffer out each frame, and tests inspect it directly.

use arcade_signal::metric::Roi;
use arcade_signal::{QualityParams, TriggerSettings};
use arcade_sim::runner::Runner;
use arcade_sim::survivor::MAX_HP;
use arcade_sim::{Phase, World};
use image::RgbaImage;

use crate::config::Variant;

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

pub const WIN_W: usize = 800;
pub const WIN_H: usize = 480;

pub const PREVIEW_W: i32 = 160;
pub const PREVIEW_H: i32 = 120;
const PREVIEW_X: i32 = WIN_W as i32 - PREVIEW_W - 12;
const PREVIEW_Y: i32 = 12;
const METER_W:   i32 = PREVIEW_W;
const METER_H:   i32 = 8;
const STATUS_Y:  i32 = WIN_H as i32 - 14;

const BG_RUNNER:   u32 = 0xFF0B0F16;
const BG_SURVIVOR: u32 = 0xFF0E1420;
const GRID:        u32 = 0xFF182132;
const GROUND:      u32 = 0xFF1A2538;
const PLAYER:      u32 = 0xFF6CA8FF;
const HAZARD:      u32 = 0xFFFF6B6B;
const COIN:        u32 = 0xFFFFD166;
const BULLET:      u32 = 0xFFE6EEFF;
const HUD_TEXT:    u32 = 0xFFC8DBFF;
const DIM_TEXT:    u32 = 0xFF7C8BA8;
const PANEL:       u32 = 0xFF141C2B;
const GUIDE:       u32 = 0xFF2D4780;
const ROI_BOX:     u32 = 0xFF6CA8FF;
const HP_BACK:     u32 = 0xFF2A3550;
const HP_FILL:     u32 = 0xFF4ADE80;
const METER_FILL:  u32 = 0xFF9FB4DD;
const THRESH_MARK: u32 = 0xFFFFD166;
const BANNER:      u32 = 0xFFE6EEFF;

const GRID_STEP: f64 = 48.0;

// ════════════════════════════════════════════════════════════════════════════
// Canvas
// ════════════════════════════════════════════════════════════════════════════

/// ARGB framebuffer with clipped drawing primitives.  Coordinates are
/// signed so partially off-screen shapes can be drawn without checks.
#[derive(Clone, Debug)]
pub struct Canvas {
    w:   usize,
    h:   usize,
    buf: Vec<u32>,
}

impl Canvas {
    pub fn new(w: usize, h: usize) -> Self {
        Canvas { w, h, buf: vec![0xFF000000; w * h] }
    }

    pub fn width(&self)  -> usize  { self.w }
    pub fn height(&self) -> usize  { self.h }
    pub fn pixels(&self) -> &[u32] { &self.buf }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        (x < self.w && y < self.h).then(|| self.buf[y * self.w + x])
    }

    pub fn clear(&mut self, color: u32) {
        self.buf.fill(color);
    }

    pub fn set_pixel(&mut self, x: i32, y: i32, color: u32) {
        if x >= 0 && y >= 0 && (x as usize) < self.w && (y as usize) < self.h {
            self.buf[y as usize * self.w + x as usize] = color;
        }
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: u32) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + w).min(self.w as i32);
        let y1 = (y + h).min(self.h as i32);
        for row in y0..y1 {
            let base = row as usize * self.w;
            for col in x0..x1 {
                self.buf[base + col as usize] = color;
            }
        }
    }

    pub fn draw_border(&mut self, x: i32, y: i32, w: i32, h: i32, color: u32) {
        if w <= 0 || h <= 0 { return; }
        self.fill_rect(x, y, w, 1, color);
        self.fill_rect(x, y + h - 1, w, 1, color);
        self.fill_rect(x, y, 1, h, color);
        self.fill_rect(x + w - 1, y, 1, h, color);
    }

    pub fn fill_circle(&mut self, cx: f64, cy: f64, r: f64, color: u32) {
        let rr = r * r;
        let (x0, x1) = ((cx - r).floor() as i32, (cx + r).ceil() as i32);
        let (y0, y1) = ((cy - r).floor() as i32, (cy + r).ceil() as i32);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = x as f64 + 0.5 - cx;
                let dy = y as f64 + 0.5 - cy;
                if dx * dx + dy * dy <= rr {
                    self.set_pixel(x, y, color);
                }
            }
        }
    }

    /// One-pixel circle outline.
    pub fn draw_ring(&mut self, cx: f64, cy: f64, r: f64, color: u32) {
        let steps = (r * 8.0).max(16.0) as usize;
        for i in 0..steps {
            let a = i as f64 / steps as f64 * std::f64::consts::TAU;
            self.set_pixel((cx + a.cos() * r) as i32, (cy + a.sin() * r) as i32, color);
        }
    }

    /// Draw `text` in the 3×5 font at `scale`; returns the advance in pixels.
    pub fn draw_text(&mut self, text: &str, x: i32, y: i32, scale: i32, color: u32) -> i32 {
        let scale = scale.max(1);
        let mut cx = x;
        for ch in text.chars() {
            let bits = glyph(ch);
            for row in 0..5 {
                for col in 0..3 {
                    if bits & (1 << (14 - row * 3 - col)) != 0 {
                        self.fill_rect(cx + col * scale, y + row * scale, scale, scale, color);
                    }
                }
            }
            cx += 4 * scale;
        }
        cx - x
    }

    /// Nearest-neighbour copy of `img` into the `w`×`h` box at (`x`, `y`).
    pub fn blit_scaled(&mut self, img: &RgbaImage, x: i32, y: i32, w: i32, h: i32) {
        let (iw, ih) = img.dimensions();
        if iw == 0 || ih == 0 || w <= 0 || h <= 0 { return; }
        for dy in 0..h {
            let sy = (dy as u32 * ih / h as u32).min(ih - 1);
            for dx in 0..w {
                let sx = (dx as u32 * iw / w as u32).min(iw - 1);
                let p = img.get_pixel(sx, sy).0;
                let c = 0xFF000000 | (p[0] as u32) << 16 | (p[1] as u32) << 8 | p[2] as u32;
                self.set_pixel(x + dx, y + dy, c);
            }
        }
    }
}

/// Packed 3×5 glyph: bit 14 is the top-left pixel, rows of three run
/// left to right, top to bottom.
fn glyph(c: char) -> u16 {
    match c {
        '0'         => 0x7B6F,
        '1'         => 0x2C97,
        '2'         => 0x73E7,
        '3'         => 0x72CF,
        '4'         => 0x5BC9,
        '5'         => 0x79CF,
        '6'         => 0x79EF,
        '7'         => 0x7292,
        '8'         => 0x7BEF,
        '9'         => 0x7BCF,
        'A' | 'a'   => 0x2BED,
        'B' | 'b'   => 0x6BAE,
        'C' | 'c'   => 0x3923,
        'D' | 'd'   => 0x6B6E,
        'E' | 'e'   => 0x79A7,
        'F' | 'f'   => 0x79A4,
        'G' | 'g'   => 0x396B,
        'H' | 'h'   => 0x5BED,
        'I' | 'i'   => 0x7497,
        'J' | 'j'   => 0x126A,
        'K' | 'k'   => 0x5BAD,
        'L' | 'l'   => 0x4927,
        'M' | 'm'   => 0x5FED,
        'N' | 'n'   => 0x6B6D,
        'O' | 'o'   => 0x2B6A,
        'P' | 'p'   => 0x6BA4,
        'Q' | 'q'   => 0x2B73,
        'R' | 'r'   => 0x6BAD,
        'S' | 's'   => 0x388E,
        'T' | 't'   => 0x7492,
        'U' | 'u'   => 0x5B6F,
        'V' | 'v'   => 0x5B6A,
        'W' | 'w'   => 0x5BFD,
        'X' | 'x'   => 0x5AAD,
        'Y' | 'y'   => 0x5A92,
        'Z' | 'z'   => 0x72A7,
        ' '         => 0x0000,
        '.'         => 0x0002,
        ','         => 0x0014,
        ':'         => 0x0410,
        '-'         => 0x01C0,
        '+'         => 0x05D0,
        '='         => 0x0E38,
        '/'         => 0x12A4,
        '%'         => 0x52A5,
        '('         => 0x2922,
        ')'         => 0x224A,
        '['         => 0x6926,
        ']'         => 0x324B,
        '!'         => 0x2482,
        '?'         => 0x6282,
        '<'         => 0x1511,
        '>'         => 0x4454,
        '_'         => 0x0007,
        '|'         => 0x2492,
        '\''        => 0x2400,
        _           => 0x0080,
    }
}

/// Linear mix of two ARGB colours; `t` = 0 gives `a`.
pub fn blend(a: u32, b: u32, t: f32) -> u32 {
    let t = t.clamp(0.0, 1.0);
    let mix = |shift: u32| {
        let ca = ((a >> shift) & 0xFF) as f32;
        let cb = ((b >> shift) & 0xFF) as f32;
        ((ca + (cb - ca) * t).round() as u32) << shift
    };
    0xFF000000 | mix(16) | mix(8) | mix(0)
}

// ════════════════════════════════════════════════════════════════════════════
// Scene snapshot
// ════════════════════════════════════════════════════════════════════════════

/// Camera / signal side of the HUD.  Absent while the camera is off.
pub struct VisionHud<'a> {
    pub preview:     Option<&'a RgbaImage>,
    pub ratio:       f64,
    pub armed:       bool,
    pub quality:     QualityParams,
    /// 0..1 while a calibration window is open.
    pub calibration: Option<f64>,
}

/// Read-only view of everything drawn in one frame.
pub struct Scene<'a> {
    pub variant:  Variant,
    pub world:    &'a World,
    pub settings: TriggerSettings,
    pub status:   &'a str,
    pub vision:   Option<VisionHud<'a>>,
}

pub fn draw_scene(c: &mut Canvas, scene: &Scene) {
    match scene.variant {
        Variant::Runner   => draw_runner(c, scene.world),
        Variant::Survivor => draw_survivor(c, scene.world),
    }
    draw_score(c, scene.world);
    if let Some(v) = &scene.vision {
        draw_vision_panel(c, v, &scene.settings);
    }
    draw_status(c, scene);
    match scene.world.state.phase {
        Phase::GameOver => draw_banner(c, "GAME OVER", restart_hint(scene.variant)),
        Phase::Paused   => draw_banner(c, "PAUSED", "P TO RESUME"),
        Phase::Running  => {}
    }
}

fn restart_hint(variant: Variant) -> &'static str {
    match variant {
        Variant::Runner   => "CLICK OR SPACE TO RESTART",
        Variant::Survivor => "CLICK TO RESTART",
    }
}

// ── play field ────────────────────────────────────────────────────────────

fn draw_runner(c: &mut Canvas, world: &World) {
    c.clear(BG_RUNNER);

    let offset = (world.state.time * world.state.difficulty * 0.3) % GRID_STEP;
    let mut x = -offset;
    while x < c.width() as f64 {
        c.fill_rect(x as i32, 0, 1, c.height() as i32, GRID);
        x += GRID_STEP;
    }

    let ground = Runner::ground_y(world) as i32;
    c.fill_rect(0, ground, c.width() as i32, 2, GROUND);

    for o in &world.obstacles {
        c.fill_rect(o.pos.x as i32, o.pos.y as i32, o.w.ceil() as i32, o.h.ceil() as i32, HAZARD);
    }
    for coin in &world.coins {
        c.fill_circle(coin.pos.x, coin.pos.y, coin.r, COIN);
    }

    // Player position is its ground contact point.
    let p = &world.player;
    c.fill_circle(p.pos.x, p.pos.y - p.r, p.r, PLAYER);
}

fn draw_survivor(c: &mut Canvas, world: &World) {
    c.clear(BG_SURVIVOR);

    let p = &world.player;
    if let Some(t) = p.target {
        c.draw_ring(t.x, t.y, 10.0, GUIDE);
    }
    for e in &world.enemies {
        c.fill_circle(e.pos.x, e.pos.y, e.r, HAZARD);
    }
    for b in &world.bullets {
        c.fill_circle(b.pos.x, b.pos.y, b.r, BULLET);
    }

    // Flicker while invulnerable.
    let color = if p.is_invulnerable() && (p.invuln * 20.0) as i64 % 2 == 0 {
        blend(PLAYER, BG_SURVIVOR, 0.6)
    } else {
        PLAYER
    };
    c.fill_circle(p.pos.x, p.pos.y, p.r, color);

    if let Some(hp) = p.health {
        draw_hp_bar(c, hp);
    }
}

pub const HP_BAR_X: i32 = 12;
pub const HP_BAR_Y: i32 = 34;
pub const HP_BAR_W: i32 = 200;

fn draw_hp_bar(c: &mut Canvas, hp: f64) {
    let pct = (hp / MAX_HP).clamp(0.0, 1.0);
    c.fill_rect(HP_BAR_X, HP_BAR_Y, HP_BAR_W, 10, HP_BACK);
    c.fill_rect(HP_BAR_X, HP_BAR_Y, (HP_BAR_W as f64 * pct).round() as i32, 10, HP_FILL);
    c.draw_text(&format!("HP {}", hp.floor() as i64), HP_BAR_X + HP_BAR_W + 8, HP_BAR_Y + 2, 1, HUD_TEXT);
}

// ── HUD ───────────────────────────────────────────────────────────────────

fn draw_score(c: &mut Canvas, world: &World) {
    c.draw_text(&format!("SCORE {}", world.state.score), 12, 12, 3, HUD_TEXT);
}

fn draw_vision_panel(c: &mut Canvas, v: &VisionHud, settings: &TriggerSettings) {
    c.fill_rect(PREVIEW_X - 4, PREVIEW_Y - 4, PREVIEW_W + 8, PREVIEW_H + 58, PANEL);

    match v.preview {
        Some(img) => c.blit_scaled(img, PREVIEW_X, PREVIEW_Y, PREVIEW_W, PREVIEW_H),
        None => {
            c.draw_border(PREVIEW_X, PREVIEW_Y, PREVIEW_W, PREVIEW_H, GUIDE);
            c.draw_text("WAITING FOR CAMERA", PREVIEW_X + 8, PREVIEW_Y + 56, 1, DIM_TEXT);
        }
    }
    let roi = Roi::mouth_box(PREVIEW_W as u32, PREVIEW_H as u32);
    c.draw_border(PREVIEW_X + roi.x as i32, PREVIEW_Y + roi.y as i32, roi.w as i32, roi.h as i32, ROI_BOX);

    // Ratio meter with the threshold marked.
    let my = PREVIEW_Y + PREVIEW_H + 8;
    c.fill_rect(PREVIEW_X, my, METER_W, METER_H, HP_BACK);
    c.fill_rect(PREVIEW_X, my, (METER_W as f64 * v.ratio.clamp(0.0, 1.0)) as i32, METER_H, METER_FILL);
    let tx = PREVIEW_X + (METER_W as f64 * settings.threshold) as i32;
    c.fill_rect(tx, my - 2, 2, METER_H + 4, THRESH_MARK);

    let armed = if v.armed { "ARMED" } else { "REARMING" };
    c.draw_text(&format!("RATIO {:.2} {}", v.ratio, armed), PREVIEW_X, my + 12, 1, HUD_TEXT);
    let q = v.quality;
    c.draw_text(
        &format!("Q {:.2} / {} / {}", q.scale, q.stride, q.frame_skip),
        PREVIEW_X, my + 22, 1, DIM_TEXT,
    );

    if let Some(p) = v.calibration {
        let cy = my + 32;
        c.draw_text("CALIBRATING", PREVIEW_X, cy, 1, THRESH_MARK);
        c.fill_rect(PREVIEW_X + 48, cy, METER_W - 48, 5, HP_BACK);
        c.fill_rect(PREVIEW_X + 48, cy, ((METER_W - 48) as f64 * p.clamp(0.0, 1.0)) as i32, 5, THRESH_MARK);
    }
}

fn draw_status(c: &mut Canvas, scene: &Scene) {
    let s = &scene.settings;
    c.fill_rect(0, STATUS_Y - 16, c.width() as i32, 30, PANEL);
    c.draw_text(scene.status, 8, STATUS_Y - 12, 1, HUD_TEXT);
    let readout = format!(
        "T {:.2}  SUSTAIN {}MS  COOLDOWN {}MS  MODE {}  ENGINE {}",
        s.threshold, s.sustain_ms.round(), s.cooldown_ms.round(),
        s.mode.label(), s.engine.label(),
    );
    c.draw_text(&readout, 8, STATUS_Y - 4, 1, DIM_TEXT);
    c.draw_text(
        "=/- THRESH  ]/[ SUSTAIN  ./, COOLDOWN  M MODE  E ENGINE  C CALIB  V CAMERA  O/S FACE  Q QUIT",
        8, STATUS_Y + 4, 1, DIM_TEXT,
    );
}

fn draw_banner(c: &mut Canvas, title: &str, sub: &str) {
    let (w, h) = (c.width() as i32, c.height() as i32);
    c.fill_rect(0, h / 2 - 44, w, 80, PANEL);
    let tw = text_width(title, 5);
    c.draw_text(title, (w - tw) / 2, h / 2 - 32, 5, BANNER);
    let sw = text_width(sub, 2);
    c.draw_text(sub, (w - sw) / 2, h / 2 + 10, 2, HUD_TEXT);
}

fn text_width(text: &str, scale: i32) -> i32 {
    text.chars().count() as i32 * 4 * scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcade_sim::{Bounds, Coin, Enemy, Player, Vec2};

    fn runner_world() -> World {
        let mut w = World::new(Bounds::new(WIN_W as f64, WIN_H as f64));
        w.player = Player::new(Vec2::new(120.0, 440.0), 16.0);
        w
    }

    fn scene<'a>(variant: Variant, world: &'a World) -> Scene<'a> {
        Scene {
            variant,
            world,
            settings: TriggerSettings::default(),
            status:   "READY",
            vision:   None,
        }
    }

    fn render(s: &Scene) -> Canvas {
        let mut c = Canvas::new(WIN_W, WIN_H);
        draw_scene(&mut c, s);
        c
    }

    #[test]
    fn rect_is_clipped() {
        let mut c = Canvas::new(10, 10);
        c.fill_rect(-5, -5, 8, 8, 0xFFFFFFFF);
        assert_eq!(c.pixel(0, 0), Some(0xFFFFFFFF));
        assert_eq!(c.pixel(2, 2), Some(0xFFFFFFFF));
        assert_eq!(c.pixel(3, 3), Some(0xFF000000));
        c.fill_rect(8, 8, 100, 100, 0xFF00FF00);
        assert_eq!(c.pixel(9, 9), Some(0xFF00FF00));
        assert_eq!(c.pixel(10, 10), None);
    }

    #[test]
    fn text_advances_four_cells_per_char() {
        let mut c = Canvas::new(64, 16);
        assert_eq!(c.draw_text("AB1", 0, 0, 1, 0xFFFFFFFF), 12);
        assert_eq!(c.draw_text("AB1", 0, 0, 2, 0xFFFFFFFF), 24);
        // '1' has its top-middle pixel set and its top-left clear.
        let mut c = Canvas::new(8, 8);
        c.draw_text("1", 0, 0, 1, 0xFFFFFFFF);
        assert_eq!(c.pixel(1, 0), Some(0xFFFFFFFF));
        assert_eq!(c.pixel(0, 0), Some(0xFF000000));
        assert_eq!(c.pixel(0, 1), Some(0xFFFFFFFF));
    }

    #[test]
    fn blend_endpoints() {
        assert_eq!(blend(0xFF000000, 0xFFFFFFFF, 0.0), 0xFF000000);
        assert_eq!(blend(0xFF000000, 0xFFFFFFFF, 1.0), 0xFFFFFFFF);
        assert_eq!(blend(0xFF000000, 0xFF0000FF, 0.5), 0xFF000080);
    }

    #[test]
    fn runner_player_and_coin_are_drawn() {
        let mut w = runner_world();
        w.coins.push(Coin { pos: Vec2::new(400.0, 350.0), r: 8.0, vel: Vec2::ZERO });
        let c = render(&scene(Variant::Runner, &w));
        // Ball is drawn above its ground point.
        assert_eq!(c.pixel(120, 424), Some(PLAYER));
        assert_eq!(c.pixel(400, 350), Some(COIN));
    }

    #[test]
    fn game_over_shows_banner() {
        let mut w = runner_world();
        let running = render(&scene(Variant::Runner, &w));
        w.end_run();
        let over = render(&scene(Variant::Runner, &w));
        let banner = |c: &Canvas| c.pixels().iter().filter(|&&p| p == BANNER).count();
        assert_eq!(banner(&running), 0);
        assert!(banner(&over) > 0);
    }

    #[test]
    fn hp_bar_tracks_health() {
        let mut w = World::new(Bounds::new(WIN_W as f64, WIN_H as f64));
        w.player = Player::new(Vec2::new(400.0, 240.0), 14.0);
        w.player.health = Some(50.0);
        w.enemies.push(Enemy { pos: Vec2::new(600.0, 300.0), r: 12.0, speed: 0.0, hp: 2, vel: Vec2::ZERO });
        let c = render(&scene(Variant::Survivor, &w));
        let y = HP_BAR_Y as usize + 5;
        assert_eq!(c.pixel(HP_BAR_X as usize + 99, y), Some(HP_FILL));
        assert_eq!(c.pixel(HP_BAR_X as usize + 101, y), Some(HP_BACK));
        assert_eq!(c.pixel(600, 300), Some(HAZARD));
    }

    #[test]
    fn vision_panel_outlines_roi() {
        let w = runner_world();
        let preview = RgbaImage::new(320, 240);
        let mut s = scene(Variant::Runner, &w);
        s.vision = Some(VisionHud {
            preview:     Some(&preview),
            ratio:       0.5,
            armed:       true,
            quality:     QualityParams::default(),
            calibration: Some(0.5),
        });
        let c = render(&s);
        let roi = Roi::mouth_box(PREVIEW_W as u32, PREVIEW_H as u32);
        let x = (PREVIEW_X + roi.x as i32) as usize;
        let y = (PREVIEW_Y + roi.y as i32) as usize;
        assert_eq!(c.pixel(x, y), Some(ROI_BOX));
        // Black preview pixel just inside the box.
        assert_eq!(c.pixel(x + 2, y + 2), Some(0xFF000000));
    }
}
