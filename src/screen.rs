//! A single halftone separation: a rotated lattice of ink marks sized by the sampled intensity.

use raqote::{DrawOptions, DrawTarget, PathBuilder, SolidSource, Source, StrokeStyle};
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::curve::ToneCurve;
use crate::math::{clamp01, clip_to_rect, pi, regular_polygon, rotate_about};
use crate::sampler::{Channel, ImageSampler};
use crate::texture::{TextureCatalog, TextureStyle};

/// Color of the cell outlines drawn when `show_grid` is on.
const OUTLINE_COLOR: Color = Color::BLACK;

/// Number of segments used to approximate an ellipse outline.
const ELLIPSE_SEGMENTS: usize = 64;

/// How far outside the canvas filled marks are clipped, in pixels.
const CLIP_MARGIN: f64 = 1.0;

/// How far outside the canvas cell outlines are clipped. Wider than the outline itself.
const OUTLINE_CLIP_MARGIN: f64 = 2.0;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DotStyle {
    Circle,
    Ellipse,
    Triangle,
    Square,
    Hexagon,
    PixelatedDot,
    EuclideanDot,
}

impl DotStyle {
    pub fn all() -> &'static [DotStyle] {
        &[
            DotStyle::Circle,
            DotStyle::Ellipse,
            DotStyle::Triangle,
            DotStyle::Square,
            DotStyle::Hexagon,
            DotStyle::PixelatedDot,
            DotStyle::EuclideanDot,
        ]
    }
}

/// Everything about a screen that is persisted and can be copied between screens.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ScreenConfig {
    pub angle_degree: f64,
    /// Lattice pitch in output pixels.
    pub grid_size: f64,
    /// Dot scale relative to the lattice pitch.
    pub raster_size: f64,
    pub show_grid: bool,
    /// Shift every other row by half a pitch.
    pub interlaced: bool,
    /// Scale the row pitch by `raster_size` instead of keeping square cells.
    pub collapsed: bool,
    /// Draw only the middle row.
    pub oneline: bool,
    pub dot_style: DotStyle,
    pub color: Color,
    pub channel: Channel,
    pub toggled: bool,
    pub negative: bool,
    pub tone_curve: ToneCurve,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        ScreenConfig {
            angle_degree: 45.0,
            grid_size: 16.0,
            raster_size: 1.0,
            show_grid: false,
            interlaced: false,
            collapsed: false,
            oneline: false,
            dot_style: DotStyle::Circle,
            color: Color::BLACK,
            channel: Channel::Darkness,
            toggled: true,
            negative: false,
            tone_curve: ToneCurve::identity(),
        }
    }
}

impl ScreenConfig {
    /// Whether this screen draws anything at all.
    pub fn is_enabled(&self) -> bool {
        self.toggled && self.raster_size != 0.0
    }

    fn row_pitch(&self) -> f64 {
        if self.collapsed {
            self.grid_size * self.raster_size
        } else {
            self.grid_size
        }
    }

    /// Maps a sampled channel value to ink coverage in `[0, 1]`.
    pub fn intensity(&self, sample: f64) -> f64 {
        let intensity = clamp01(self.tone_curve.eval(sample));
        if self.negative {
            1.0 - intensity
        } else {
            intensity
        }
    }
}

/// A lattice point that landed inside the canvas.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LatticePoint {
    pub row: i64,
    pub col: i64,
    pub x: f64,
    pub y: f64,
}

pub struct Screen {
    index: usize,
    config: ScreenConfig,
    canvas: Option<DrawTarget>,
    dots: usize,
}

impl std::fmt::Debug for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Screen")
            .field("index", &self.index)
            .field("config", &self.config)
            .field("dimensions", &self.dimensions())
            .finish()
    }
}

impl Screen {
    pub fn new(index: usize, config: ScreenConfig) -> Self {
        Screen {
            index,
            config,
            canvas: None,
            dots: 0,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn config(&self) -> &ScreenConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ScreenConfig {
        &mut self.config
    }

    pub fn set_config(&mut self, config: ScreenConfig) {
        self.config = config;
    }

    /// Number of marks drawn by the last render.
    pub fn dot_count(&self) -> usize {
        self.dots
    }

    pub fn dimensions(&self) -> (u32, u32) {
        match &self.canvas {
            Some(dt) => (dt.width() as u32, dt.height() as u32),
            None => (0, 0),
        }
    }

    /// Premultiplied ARGB pixels of the last render, row-major.
    pub fn pixels(&self) -> &[u32] {
        match &self.canvas {
            Some(dt) => dt.get_data(),
            None => &[],
        }
    }

    /// Enumerates the lattice points that fall inside a `width × height` canvas.
    pub fn lattice(&self, width: u32, height: u32) -> Vec<LatticePoint> {
        let config = &self.config;
        let pitch = config.grid_size;
        let row_pitch = config.row_pitch();
        if !(pitch > 0.0 && row_pitch > 0.0 && pitch.is_finite() && row_pitch.is_finite()) {
            return Vec::new();
        }
        let (w, h) = (f64::from(width), f64::from(height));
        let center = (w / 2.0, h / 2.0);
        let angle = config.angle_degree.to_radians();

        // Rotating about the center keeps the canvas inside [-extent, 2 * extent) pitches on
        // either axis.
        let longest = w.max(h);
        let col_extent = (longest / pitch).ceil() as i64;
        let row_extent = (longest / row_pitch).ceil() as i64;
        let rows = if config.oneline {
            let middle = ((center.1 - row_pitch / 2.0) / row_pitch).round() as i64;
            middle..middle + 1
        } else {
            -row_extent..2 * row_extent
        };

        let mut points = Vec::new();
        for row in rows {
            let y_base = row as f64 * row_pitch + row_pitch / 2.0;
            let shift = if config.interlaced && row.rem_euclid(2) == 1 {
                pitch / 2.0
            } else {
                0.0
            };
            for col in -col_extent..2 * col_extent {
                let x_base = col as f64 * pitch + pitch / 2.0 + shift;
                let (x, y) = rotate_about((x_base, y_base), center, angle);
                if x >= 0.0 && x < w && y >= 0.0 && y < h {
                    points.push(LatticePoint { row, col, x, y });
                }
            }
        }
        points
    }

    /// Redraws this screen's buffer at `width × height` from the current source image.
    pub fn render(
        &mut self,
        (width, height): (u32, u32),
        sampler: &ImageSampler,
        catalog: &TextureCatalog,
    ) {
        self.dots = 0;
        let lattice = if self.config.is_enabled() {
            self.lattice(width, height)
        } else {
            Vec::new()
        };

        let (w, h) = (width as i32, height as i32);
        if matches!(&self.canvas, Some(dt) if (dt.width(), dt.height()) != (w, h)) {
            self.canvas = None;
        }
        let dt = self.canvas.get_or_insert_with(|| DrawTarget::new(w, h));
        dt.clear(SolidSource::from_unpremultiplied_argb(0, 0, 0, 0));
        if lattice.is_empty() {
            return;
        }

        let config = &self.config;
        let ink = config.color.to_source();
        let outline = OUTLINE_COLOR.to_source();
        let options = DrawOptions::new();
        let angle = config.angle_degree.to_radians();
        let mut dots = 0;
        for point in &lattice {
            let sample = sampler.channel_at(point.x, point.y, config.channel);
            let intensity = config.intensity(sample);
            if draw_mark(dt, config, (point.x, point.y), intensity, angle, catalog, &ink, &options)
            {
                dots += 1;
            }
            if config.show_grid {
                stroke_cell(dt, config, (point.x, point.y), angle, &outline, &options);
            }
        }
        self.dots = dots;
        log::debug!(
            "screen {}: {} lattice points, {} marks",
            self.index,
            lattice.len(),
            dots
        );
    }
}

fn canvas_diagonal(dt: &DrawTarget) -> f64 {
    f64::from(dt.width()).hypot(f64::from(dt.height()))
}

/// The canvas rectangle grown by `margin` pixels on every side.
fn canvas_bounds(dt: &DrawTarget, margin: f64) -> ((f64, f64), (f64, f64)) {
    let (w, h) = (f64::from(dt.width()), f64::from(dt.height()));
    ((-margin, -margin), (w + margin, h + margin))
}

/// Fills a polygon after clipping it to just outside the canvas. The rasterizer works in fixed
/// point and cannot take coordinates far off the canvas.
fn fill_polygon(
    dt: &mut DrawTarget,
    vertices: &[(f64, f64)],
    source: &Source,
    options: &DrawOptions,
) {
    let (min, max) = canvas_bounds(dt, CLIP_MARGIN);
    let clipped = clip_to_rect(vertices, min, max);
    let Some((&(x0, y0), rest)) = clipped.split_first() else {
        return;
    };
    let mut pb = PathBuilder::new();
    pb.move_to(x0 as f32, y0 as f32);
    for &(x, y) in rest {
        pb.line_to(x as f32, y as f32);
    }
    pb.close();
    dt.fill(&pb.finish(), source, options);
}

fn fill_canvas(dt: &mut DrawTarget, source: &Source, options: &DrawOptions) {
    let (min, max) = canvas_bounds(dt, 0.0);
    let corners = [min, (max.0, min.1), max, (min.0, max.1)];
    fill_polygon(dt, &corners, source, options);
}

/// Draws one ink mark. Returns whether anything was drawn.
#[allow(clippy::too_many_arguments)]
fn draw_mark(
    dt: &mut DrawTarget,
    config: &ScreenConfig,
    (x, y): (f64, f64),
    intensity: f64,
    angle: f64,
    catalog: &TextureCatalog,
    source: &Source,
    options: &DrawOptions,
) -> bool {
    let pitch = config.grid_size;
    let scale = config.raster_size;
    let radius = intensity * pitch / 2.0 * scale;
    if radius.is_nan() || radius <= 0.0 {
        return false;
    }
    match config.dot_style {
        DotStyle::PixelatedDot | DotStyle::EuclideanDot => {
            let style = if config.dot_style == DotStyle::PixelatedDot {
                TextureStyle::Pixelated
            } else {
                TextureStyle::Euclidean
            };
            let texture = catalog.lookup(style, intensity);
            if texture.count() == 0 {
                return false;
            }
            texture.draw(dt, (x, y), pitch * scale, angle, source, options);
        }
        // Every mark is centered on the canvas, so one this large covers all of it.
        _ if radius.is_infinite() => fill_canvas(dt, source, options),
        DotStyle::Circle if radius >= canvas_diagonal(dt) => fill_canvas(dt, source, options),
        DotStyle::Circle => {
            let mut pb = PathBuilder::new();
            pb.move_to((x + radius) as f32, y as f32);
            pb.arc(x as f32, y as f32, radius as f32, 0.0, pi(2.0) as f32);
            pb.close();
            dt.fill(&pb.finish(), source, options);
        }
        DotStyle::Ellipse => {
            let (rx, ry) = (radius, 0.5 * radius);
            let (sin, cos) = (-pi(0.25)).sin_cos();
            let vertices: Vec<(f64, f64)> = (0..ELLIPSE_SEGMENTS)
                .map(|k| {
                    let t = pi(2.0) * k as f64 / ELLIPSE_SEGMENTS as f64;
                    let (ex, ey) = (rx * t.cos(), ry * t.sin());
                    (x + ex * cos - ey * sin, y + ex * sin + ey * cos)
                })
                .collect();
            fill_polygon(dt, &vertices, source, options);
        }
        DotStyle::Triangle => {
            fill_polygon(dt, &regular_polygon((x, y), radius, 3, pi(1.0)), source, options);
        }
        DotStyle::Hexagon => {
            let vertices = regular_polygon((x, y), radius, 6, pi(1.0 / 6.0));
            fill_polygon(dt, &vertices, source, options);
        }
        DotStyle::Square => {
            let half = intensity * pitch * scale / 2.0;
            let corners = [(half, half), (half, -half), (-half, -half), (-half, half)]
                .map(|(dx, dy)| rotate_about((x + dx, y + dy), (x, y), angle));
            fill_polygon(dt, &corners, source, options);
        }
    }
    true
}

fn stroke_cell(
    dt: &mut DrawTarget,
    config: &ScreenConfig,
    (x, y): (f64, f64),
    angle: f64,
    source: &Source,
    options: &DrawOptions,
) {
    let hw = config.grid_size / 2.0;
    let hh = config.row_pitch() / 2.0;
    let corners = [(hw, hh), (hw, -hh), (-hw, -hh), (-hw, hh)]
        .map(|(dx, dy)| rotate_about((x + dx, y + dy), (x, y), angle));
    // Clip far enough out that the outline along the clip edge stays off the canvas.
    let (min, max) = canvas_bounds(dt, OUTLINE_CLIP_MARGIN);
    let clipped = clip_to_rect(&corners, min, max);
    let Some((&(x0, y0), rest)) = clipped.split_first() else {
        return;
    };
    let mut pb = PathBuilder::new();
    pb.move_to(x0 as f32, y0 as f32);
    for &(cx, cy) in rest {
        pb.line_to(cx as f32, cy as f32);
    }
    pb.close();
    let style = StrokeStyle {
        width: 1.0,
        ..StrokeStyle::default()
    };
    dt.stroke(&pb.finish(), source, &style, options);
}

#[cfg(test)]
mod test {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn black(size: u32) -> ImageSampler {
        ImageSampler::new(RgbaImage::from_pixel(size, size, Rgba([0, 0, 0, 255])), size)
    }

    fn alpha_at(screen: &Screen, x: u32, y: u32) -> u8 {
        let (w, _) = screen.dimensions();
        (screen.pixels()[(y * w + x) as usize] >> 24) as u8
    }

    #[test]
    fn test_lattice_unrotated() {
        let screen = Screen::new(
            0,
            ScreenConfig {
                angle_degree: 0.0,
                ..ScreenConfig::default()
            },
        );
        let points = screen.lattice(64, 64);
        assert_eq!(points.len(), 16);
        assert!(points.iter().all(|p| (p.x - 8.0) % 16.0 == 0.0 && (p.y - 8.0) % 16.0 == 0.0));
        assert!(points.contains(&LatticePoint {
            row: 0,
            col: 0,
            x: 8.0,
            y: 8.0
        }));
    }

    #[test]
    fn test_lattice_interlaced() {
        let screen = Screen::new(
            0,
            ScreenConfig {
                angle_degree: 0.0,
                interlaced: true,
                ..ScreenConfig::default()
            },
        );
        let points = screen.lattice(64, 64);
        let first_on_row = |row| {
            points
                .iter()
                .filter(|p| p.row == row)
                .map(|p| p.x)
                .fold(f64::INFINITY, f64::min)
        };
        assert_eq!(first_on_row(0), 8.0);
        assert_eq!(first_on_row(1), 0.0);
    }

    #[test]
    fn test_lattice_collapsed() {
        let screen = Screen::new(
            0,
            ScreenConfig {
                angle_degree: 0.0,
                collapsed: true,
                raster_size: 0.5,
                ..ScreenConfig::default()
            },
        );
        let points = screen.lattice(64, 64);
        // Rows are 8px apart, columns stay 16px apart.
        assert_eq!(points.len(), 8 * 4);
        assert!(points.iter().any(|p| p.y == 4.0));
        assert!(points.iter().any(|p| p.y == 12.0));
    }

    #[test]
    fn test_lattice_oneline() {
        let screen = Screen::new(
            0,
            ScreenConfig {
                angle_degree: 0.0,
                oneline: true,
                ..ScreenConfig::default()
            },
        );
        let points = screen.lattice(64, 64);
        assert_eq!(points.len(), 4);
        let y = points[0].y;
        assert!(points.iter().all(|p| p.y == y));
        assert!((y - 32.0).abs() <= 8.0);
    }

    #[test]
    fn test_lattice_rotated_stays_in_bounds() {
        for &angle in &[15.0, 30.0, 45.0, 72.5, 90.0] {
            let screen = Screen::new(
                0,
                ScreenConfig {
                    angle_degree: angle,
                    ..ScreenConfig::default()
                },
            );
            let points = screen.lattice(100, 60);
            assert!(!points.is_empty());
            for p in &points {
                assert!(p.x >= 0.0 && p.x < 100.0 && p.y >= 0.0 && p.y < 60.0);
            }
            // Roughly one point per cell.
            let cells = 100.0 * 60.0 / (16.0 * 16.0);
            let n = points.len() as f64;
            assert!(n > 0.6 * cells && n < 1.6 * cells, "{}: {}", angle, n);
        }
    }

    #[test]
    fn test_intensity_remap() {
        let mut config = ScreenConfig::default();
        config.tone_curve = ToneCurve::new([(0.0, 0.2), (1.0, 1.0)]).unwrap();
        assert!((config.intensity(0.5) - 0.6).abs() < 1e-12);
        config.negative = true;
        assert!((config.intensity(0.5) - 0.4).abs() < 1e-12);
        // f(x) = 5x - 4x² overshoots to 1.5625 at x = 0.625.
        config.tone_curve = ToneCurve::new([(0.0, 0.0), (0.25, 1.0), (1.0, 1.0)]).unwrap();
        config.negative = false;
        assert!(config.tone_curve.eval(0.625) > 1.5);
        assert_eq!(config.intensity(0.625), 1.0);
    }

    #[test]
    fn test_disabled_screen_is_blank() {
        let sampler = black(32);
        let catalog = TextureCatalog::new(4);
        for config in [
            ScreenConfig {
                toggled: false,
                ..ScreenConfig::default()
            },
            ScreenConfig {
                raster_size: 0.0,
                ..ScreenConfig::default()
            },
        ] {
            let mut screen = Screen::new(3, config);
            screen.render((32, 32), &sampler, &catalog);
            assert_eq!(screen.dimensions(), (32, 32));
            assert!(screen.pixels().iter().all(|&px| px == 0));
            assert_eq!(screen.dot_count(), 0);
        }
    }

    #[test]
    fn test_render_clears_previous_ink() {
        let sampler = black(32);
        let catalog = TextureCatalog::new(4);
        let mut screen = Screen::new(0, ScreenConfig::default());
        screen.render((32, 32), &sampler, &catalog);
        assert!(screen.pixels().iter().any(|&px| px != 0));
        screen.config_mut().toggled = false;
        screen.render((32, 32), &sampler, &catalog);
        assert!(screen.pixels().iter().all(|&px| px == 0));
        screen.config_mut().toggled = true;
        screen.render((16, 8), &sampler, &catalog);
        assert_eq!(screen.dimensions(), (16, 8));
    }

    #[test]
    fn test_every_style_draws_at_full_intensity() {
        let sampler = black(64);
        let catalog = TextureCatalog::new(4);
        for &dot_style in DotStyle::all() {
            let mut screen = Screen::new(
                0,
                ScreenConfig {
                    angle_degree: 0.0,
                    dot_style,
                    ..ScreenConfig::default()
                },
            );
            screen.render((64, 64), &sampler, &catalog);
            assert_eq!(screen.dot_count(), 16, "{:?}", dot_style);
            // Every shape covers its own lattice point.
            assert_eq!(alpha_at(&screen, 24, 24), 255, "{:?}", dot_style);
        }
    }

    #[test]
    fn test_white_source_draws_nothing() {
        let sampler = ImageSampler::new(RgbaImage::from_pixel(32, 32, Rgba([255; 4])), 32);
        let catalog = TextureCatalog::new(4);
        let mut screen = Screen::new(0, ScreenConfig::default());
        screen.render((32, 32), &sampler, &catalog);
        assert_eq!(screen.dot_count(), 0);
        assert!(screen.pixels().iter().all(|&px| px == 0));

        screen.config_mut().negative = true;
        screen.render((32, 32), &sampler, &catalog);
        assert!(screen.dot_count() > 0);
    }

    #[test]
    fn test_show_grid_draws_outline_without_ink() {
        let sampler = ImageSampler::empty(32);
        let catalog = TextureCatalog::new(4);
        let mut screen = Screen::new(
            0,
            ScreenConfig {
                angle_degree: 0.0,
                show_grid: true,
                ..ScreenConfig::default()
            },
        );
        screen.render((32, 32), &sampler, &catalog);
        assert_eq!(screen.dot_count(), 0);
        // Cell boundaries run along x = 16.
        assert!(alpha_at(&screen, 16, 4) > 0 || alpha_at(&screen, 15, 4) > 0);
        assert_eq!(alpha_at(&screen, 8, 8), 0);
    }

    #[test]
    fn test_oversized_marks_cover_the_canvas() {
        let sampler = black(32);
        let catalog = TextureCatalog::new(4);
        let opaque = |screen: &Screen| screen.pixels().iter().all(|&px| px >> 24 == 0xff);
        for &raster_size in &[1e7, 1e40] {
            for &dot_style in DotStyle::all() {
                let mut screen = Screen::new(
                    0,
                    ScreenConfig {
                        angle_degree: 30.0,
                        raster_size,
                        dot_style,
                        ..ScreenConfig::default()
                    },
                );
                screen.render((32, 32), &sampler, &catalog);
                assert!(screen.dot_count() > 0);
                assert!(opaque(&screen), "{:?} at {}", dot_style, raster_size);
            }
        }

        let mut screen = Screen::new(
            0,
            ScreenConfig {
                raster_size: f64::INFINITY,
                show_grid: true,
                ..ScreenConfig::default()
            },
        );
        screen.render((32, 32), &sampler, &catalog);
        assert!(opaque(&screen));
    }

    #[test]
    fn test_outline_clipped_to_canvas() {
        let mut dt = DrawTarget::new(32, 32);
        let config = ScreenConfig {
            grid_size: 1e6,
            show_grid: true,
            ..ScreenConfig::default()
        };
        let source = OUTLINE_COLOR.to_source();
        // The cell contains the whole canvas, so neither its outline nor the clip edge shows.
        stroke_cell(&mut dt, &config, (16.0, 16.0), 0.3, &source, &DrawOptions::new());
        assert!(dt.get_data().iter().all(|&px| px == 0));

        let config = ScreenConfig {
            grid_size: 16.0,
            ..config
        };
        stroke_cell(&mut dt, &config, (16.0, 16.0), 0.0, &source, &DrawOptions::new());
        assert!(dt.get_data().iter().any(|&px| px != 0));
    }
}
