//! Growth-ordered dot textures.
//!
//! A texture pack is a sequence of bitmaps indexed by fill level, where each level sets exactly
//! the cells of the previous level plus some more. Drawing the texture for a quantized intensity
//! therefore grows a dot outwards from its center as the intensity increases.

use raqote::{DrawOptions, DrawTarget, PathBuilder, Source};

use crate::math::{clip_to_rect, minkowski, rotate_about};

pub const DEFAULT_SUB_RESOLUTION: usize = 10;

/// Largest sub-resolution accepted from the command line. Catalog size grows with its fourth
/// power.
pub const MAX_SUB_RESOLUTION: usize = 32;

/// Order of the distance used to rank cells. Always Euclidean.
const GROWTH_EXPONENT: f64 = 2.0;

/// Half-width of a drawn texture cell relative to the cell pitch. Slightly more than `0.5` so
/// that neighboring cells overlap and no hairline seams show after rotation.
const CELL_HALF_WIDTH: f64 = 0.6;

const CLIP_MARGIN: f64 = 1.0;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TextureStyle {
    /// Square dot growing within its own lattice cell.
    Pixelated,
    /// Dot that fills its cell at half coverage and then bleeds into the eight neighboring
    /// cells.
    Euclidean,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Texture {
    side: usize,
    /// Number of lattice cells the bitmap spans along each axis.
    span: usize,
    cells: Vec<bool>,
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Texture({}x{}, span {}, {} set)",
            self.side,
            self.side,
            self.span,
            self.count()
        )
    }
}

impl Texture {
    fn empty(side: usize, span: usize) -> Self {
        Texture {
            side,
            span,
            cells: vec![false; side * side],
        }
    }

    fn set(&mut self, (row, col): (usize, usize)) {
        self.cells[row * self.side + col] = true;
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn span(&self) -> usize {
        self.span
    }

    pub fn get(&self, row: usize, col: usize) -> bool {
        row < self.side && col < self.side && self.cells[row * self.side + col]
    }

    /// Number of set cells.
    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    pub fn is_subset_of(&self, other: &Texture) -> bool {
        self.side == other.side && self.cells.iter().zip(&other.cells).all(|(&a, &b)| !a || b)
    }

    /// Draws the set cells as small squares centered on `center`, where one lattice cell is
    /// `cell_size` wide, rotated by `angle` radians about `center`.
    pub fn draw(
        &self,
        dt: &mut DrawTarget,
        center: (f64, f64),
        cell_size: f64,
        angle: f64,
        source: &Source,
        options: &DrawOptions,
    ) {
        let scale = cell_size * self.span as f64 / self.side as f64;
        if !scale.is_finite() {
            return;
        }
        let half = self.side as f64 / 2.0;
        let sr = CELL_HALF_WIDTH * scale;
        // Cells are clipped to just outside the target; the rasterizer cannot take coordinates
        // far off it.
        let min = (-CLIP_MARGIN, -CLIP_MARGIN);
        let max = (
            f64::from(dt.width()) + CLIP_MARGIN,
            f64::from(dt.height()) + CLIP_MARGIN,
        );

        let mut pb = PathBuilder::new();
        let mut any = false;
        for row in 0..self.side {
            for col in 0..self.side {
                if !self.cells[row * self.side + col] {
                    continue;
                }
                let base = (
                    center.0 + (col as f64 + 0.5 - half) * scale,
                    center.1 + (row as f64 + 0.5 - half) * scale,
                );
                let c = rotate_about(base, center, angle);
                let corners = [(sr, sr), (sr, -sr), (-sr, -sr), (-sr, sr)]
                    .map(|(dx, dy)| rotate_about((c.0 + dx, c.1 + dy), c, angle));
                let clipped = clip_to_rect(&corners, min, max);
                let Some((&(x0, y0), rest)) = clipped.split_first() else {
                    continue;
                };
                any = true;
                pb.move_to(x0 as f32, y0 as f32);
                for &(x, y) in rest {
                    pb.line_to(x as f32, y as f32);
                }
                pb.close();
            }
        }
        if any {
            dt.fill(&pb.finish(), source, options);
        }
    }
}

/// Precomputed texture packs shared by every screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureCatalog {
    sub_resolution: usize,
    pixelated: Vec<Texture>,
    euclidean: Vec<Texture>,
}

impl TextureCatalog {
    /// Builds both packs for a `sub_resolution × sub_resolution` cell grid.
    ///
    /// # Panics
    ///
    /// Panics if `sub_resolution` is zero.
    pub fn new(sub_resolution: usize) -> Self {
        assert!(sub_resolution > 0, "sub-resolution must be positive");
        let start = std::time::Instant::now();
        let catalog = TextureCatalog {
            sub_resolution,
            pixelated: pixelated_pack(sub_resolution),
            euclidean: euclidean_pack(sub_resolution),
        };
        log::debug!(
            "built texture catalog at sub-resolution {} in {:?}",
            sub_resolution,
            start.elapsed()
        );
        catalog
    }

    pub fn sub_resolution(&self) -> usize {
        self.sub_resolution
    }

    pub fn pack(&self, style: TextureStyle) -> &[Texture] {
        match style {
            TextureStyle::Pixelated => &self.pixelated,
            TextureStyle::Euclidean => &self.euclidean,
        }
    }

    /// Picks the texture for an intensity in `[0, 1]`.
    pub fn lookup(&self, style: TextureStyle, intensity: f64) -> &Texture {
        let pack = self.pack(style);
        let index = (intensity.clamp(0.0, 1.0) * (pack.len() - 1) as f64).round() as usize;
        &pack[index]
    }
}

impl Default for TextureCatalog {
    fn default() -> Self {
        TextureCatalog::new(DEFAULT_SUB_RESOLUTION)
    }
}

/// Sorts `cells` by distance of each cell's center from the point `(center, center)`. The sort
/// is stable, so equidistant cells keep the order they were given in.
fn growth_order(cells: impl Iterator<Item = (usize, usize)>, center: f64) -> Vec<(usize, usize)> {
    let mut ranked: Vec<((usize, usize), f64)> = cells
        .map(|(row, col)| {
            let d = minkowski(
                (row as f64 + 0.5, col as f64 + 0.5),
                (center, center),
                GROWTH_EXPONENT,
            );
            ((row, col), d)
        })
        .collect();
    ranked.sort_by(|(_, d1), (_, d2)| d1.total_cmp(d2));
    ranked.into_iter().map(|(cell, _)| cell).collect()
}

fn row_major(side: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..side).flat_map(move |row| (0..side).map(move |col| (row, col)))
}

fn pixelated_pack(s: usize) -> Vec<Texture> {
    let order = growth_order(row_major(s), s as f64 / 2.0);
    (0..=s * s)
        .map(|level| {
            let mut texture = Texture::empty(s, 1);
            for &cell in &order[..level] {
                texture.set(cell);
            }
            texture
        })
        .collect()
}

fn euclidean_pack(s: usize) -> Vec<Texture> {
    let n = s * s;
    let side = 3 * s;
    let in_center =
        |(row, col): (usize, usize)| (s..2 * s).contains(&row) && (s..2 * s).contains(&col);

    let inner = growth_order(row_major(s), s as f64 / 2.0);
    // Ranking by distance from the middle of the 3x3 tiling sends ink across the nearest
    // edge first and around the corners last.
    let outer = growth_order(row_major(side).filter(|&c| !in_center(c)), side as f64 / 2.0);

    (0..=n)
        .map(|level| {
            let mut texture = Texture::empty(side, 3);
            let doubled = 2 * level;
            if doubled <= n {
                for &(row, col) in &inner[..doubled] {
                    texture.set((row + s, col + s));
                }
            } else {
                for (row, col) in row_major(s) {
                    texture.set((row + s, col + s));
                }
                for &cell in &outer[..8 * (doubled - n)] {
                    texture.set(cell);
                }
            }
            texture
        })
        .collect()
}
