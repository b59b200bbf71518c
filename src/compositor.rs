//! Stacks every screen's buffer over a background and applies the final noise pass.

use std::path::Path;
use std::rc::Rc;
use std::time::Instant;

use image::error::{LimitError, LimitErrorKind};
use image::{ImageError, ImageFormat, ImageResult, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::document::{Clipboard, Document, LoadError, ScreenEntry, SourceConfig, MAX_SIZE};
use crate::rand::Rng;
use crate::sampler::ImageSampler;
use crate::screen::{Screen, ScreenConfig};
use crate::texture::TextureCatalog;

/// Largest exported image, in pixels per side.
pub const MAX_EXPORT_SIZE: u32 = 32768;

/// How a screen's ink combines with what is already on the output.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    /// Straight alpha compositing.
    #[default]
    Normal,
    /// Ink adds light, saturating at white.
    Additive,
    /// Ink takes light away, saturating at black.
    Subtractive,
}

impl BlendMode {
    pub fn all() -> &'static [BlendMode] {
        &[BlendMode::Normal, BlendMode::Additive, BlendMode::Subtractive]
    }

    /// Blends one channel. `out` and `layer` are in `0..=255`, `alpha` in `[0, 1]`.
    pub fn blend(self, out: f64, layer: f64, alpha: f64) -> f64 {
        match self {
            BlendMode::Normal => (1.0 - alpha) * out + alpha * layer,
            BlendMode::Additive => f64::min(255.0, out + alpha * layer),
            BlendMode::Subtractive => {
                let base = 255.0 * (1.0 - alpha) + layer * alpha;
                f64::max(0.0, out - (255.0 - base))
            }
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NoiseMode {
    /// One random value per pixel, shared by all three channels.
    Grey,
    /// An independent random value per channel.
    PerChannel,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OutputConfig {
    pub noise_level: f64,
    pub grey_noise: bool,
    /// Keep antialiased dot edges; when off, any partially covered pixel counts as fully inked.
    pub smooth: bool,
    pub background: Color,
    pub composition_mode: BlendMode,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            noise_level: 0.0,
            grey_noise: true,
            smooth: true,
            background: Color::WHITE,
            composition_mode: BlendMode::Normal,
        }
    }
}

impl OutputConfig {
    pub fn noise_mode(&self) -> NoiseMode {
        if self.grey_noise {
            NoiseMode::Grey
        } else {
            NoiseMode::PerChannel
        }
    }
}

/// Converts a premultiplied ARGB pixel to straight RGBA.
pub fn unpremultiply(px: u32) -> [u8; 4] {
    let [b, g, r, a] = px.to_le_bytes();
    if a == 0 {
        return [0, 0, 0, 0];
    }
    let a32 = u32::from(a);
    let straight = |c: u8| ((u32::from(c) * 255 + a32 / 2) / a32).min(255) as u8;
    [straight(r), straight(g), straight(b), a]
}

fn quantize(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Blends one straight-alpha layer pixel onto an output pixel.
fn blend_pixel(out: &mut Rgba<u8>, layer: [u8; 4], mode: BlendMode, smooth: bool) {
    if layer[3] == 0 {
        return;
    }
    let alpha = if smooth {
        f64::from(layer[3]) / 255.0
    } else {
        1.0
    };
    for c in 0..3 {
        out.0[c] = quantize(mode.blend(f64::from(out.0[c]), f64::from(layer[c]), alpha));
    }
}

pub struct Compositor {
    catalog: Rc<TextureCatalog>,
    sampler: ImageSampler,
    screens: Vec<Screen>,
    next_index: usize,
    output: OutputConfig,
    rng: Rng,
    buffer: RgbaImage,
}

impl Compositor {
    /// Creates a compositor with no screens. `rng` drives the noise pass; it keeps advancing
    /// from one render to the next.
    pub fn new(catalog: Rc<TextureCatalog>, sampler: ImageSampler, rng: Rng) -> Self {
        let (width, height) = sampler.dimensions();
        Compositor {
            catalog,
            sampler,
            screens: Vec::new(),
            next_index: 0,
            output: OutputConfig::default(),
            rng,
            buffer: RgbaImage::new(width, height),
        }
    }

    pub fn catalog(&self) -> &TextureCatalog {
        &self.catalog
    }

    pub fn sampler(&self) -> &ImageSampler {
        &self.sampler
    }

    /// Replaces the source image, keeping the current size and debug setting.
    pub fn set_source(&mut self, mut sampler: ImageSampler) {
        sampler.set_size(self.sampler.size());
        sampler.set_debug(self.sampler.debug());
        self.sampler = sampler;
    }

    /// Refits the source into a `size × size` box, clamped to `1..=MAX_SIZE`.
    pub fn set_size(&mut self, size: u32) {
        self.sampler.set_size(size.clamp(1, MAX_SIZE));
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.sampler.set_debug(debug);
    }

    pub fn output(&self) -> &OutputConfig {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut OutputConfig {
        &mut self.output
    }

    pub fn set_output(&mut self, output: OutputConfig) {
        self.output = output;
    }

    /// Screens from bottom to top.
    pub fn screens(&self) -> &[Screen] {
        &self.screens
    }

    pub fn screen(&self, index: usize) -> Option<&Screen> {
        self.screens.iter().find(|s| s.index() == index)
    }

    pub fn screen_mut(&mut self, index: usize) -> Option<&mut Screen> {
        self.screens.iter_mut().find(|s| s.index() == index)
    }

    /// Adds a screen on top of the stack and returns its index.
    pub fn add_screen(&mut self, config: ScreenConfig) -> usize {
        let index = self.next_index;
        self.next_index += 1;
        self.screens.push(Screen::new(index, config));
        index
    }

    pub fn delete_screen(&mut self, index: usize) -> Option<Screen> {
        match self.screens.iter().position(|s| s.index() == index) {
            Some(position) => Some(self.screens.remove(position)),
            None => {
                log::warn!("no screen with index {} to delete", index);
                None
            }
        }
    }

    pub fn clear_screens(&mut self) {
        self.screens.clear();
    }

    /// Adds a copy of a screen's configuration on top of the stack.
    pub fn duplicate_screen(&mut self, index: usize) -> Option<usize> {
        let config = self.screen(index)?.config().clone();
        Some(self.add_screen(config))
    }

    pub fn copy_screen(&self, index: usize, clipboard: &mut Clipboard) -> Result<(), LoadError> {
        let screen = self
            .screen(index)
            .ok_or(LoadError::UnknownScreen { index })?;
        clipboard.copy(screen.config())
    }

    /// Replaces a screen's configuration with the clipboard contents and re-renders.
    pub fn paste_screen(&mut self, index: usize, clipboard: &Clipboard) -> Result<(), LoadError> {
        let config = clipboard.paste()?;
        let screen = self
            .screen_mut(index)
            .ok_or(LoadError::UnknownScreen { index })?;
        screen.set_config(config);
        self.render();
        Ok(())
    }

    /// Replaces the whole state with `document`. Nothing is rendered until [`Compositor::render`].
    pub fn apply(&mut self, document: &Document) -> Result<(), LoadError> {
        document.validate()?;
        self.clear_screens();
        self.sampler.set_size(document.size);
        self.sampler.set_debug(document.source.debug);
        self.output = document.output.clone();
        for entry in &document.screens {
            self.screens
                .push(Screen::new(entry.index, entry.config.clone()));
        }
        self.next_index = document
            .screens
            .iter()
            .map(|e| e.index + 1)
            .max()
            .unwrap_or(0);
        log::debug!("applied document with {} screens", self.screens.len());
        Ok(())
    }

    /// Captures the current state as a document.
    pub fn snapshot(&self) -> Document {
        Document {
            size: self.sampler.size(),
            source: SourceConfig {
                debug: self.sampler.debug(),
            },
            output: self.output.clone(),
            screens: self
                .screens
                .iter()
                .map(|s| ScreenEntry {
                    index: s.index(),
                    config: s.config().clone(),
                })
                .collect(),
        }
    }

    /// Re-renders every screen and the composite from scratch.
    pub fn render(&mut self) -> &RgbaImage {
        let start = Instant::now();
        let (width, height) = self.sampler.dimensions();
        for screen in &mut self.screens {
            screen.render((width, height), &self.sampler, &self.catalog);
        }

        let Color { r, g, b } = self.output.background;
        let mut buffer = RgbaImage::from_pixel(width, height, Rgba([r, g, b, 0xff]));
        let mode = self.output.composition_mode;
        let smooth = self.output.smooth;
        for screen in &self.screens {
            if screen.pixels().len() != buffer.pixels().len() {
                continue;
            }
            for (out, &px) in buffer.pixels_mut().zip(screen.pixels()) {
                blend_pixel(out, unpremultiply(px), mode, smooth);
            }
        }

        let level = self.output.noise_level.clamp(0.0, 1.0);
        if level > 0.0 {
            let mode = self.output.noise_mode();
            for out in buffer.pixels_mut() {
                let noise = match mode {
                    NoiseMode::Grey => [self.rng.channel(); 3],
                    NoiseMode::PerChannel => {
                        [self.rng.channel(), self.rng.channel(), self.rng.channel()]
                    }
                };
                for c in 0..3 {
                    let v = (1.0 - level) * f64::from(out.0[c]) + level * f64::from(noise[c]);
                    out.0[c] = quantize(v);
                }
            }
        }
        for out in buffer.pixels_mut() {
            out.0[3] = 0xff;
        }

        self.buffer = buffer;
        log::debug!(
            "rendered {}x{} with {} screens in {:?}",
            width,
            height,
            self.screens.len(),
            start.elapsed()
        );
        &self.buffer
    }

    /// The last rendered composite.
    pub fn buffer(&self) -> &RgbaImage {
        &self.buffer
    }

    /// Returns the composite upscaled by an integer factor, each pixel becoming a
    /// `scale × scale` block. A scale of 0 is treated as 1.
    ///
    /// Fails with a dimension error if either side would exceed [`MAX_EXPORT_SIZE`].
    pub fn export(&self, scale: u32) -> ImageResult<RgbaImage> {
        let scale = scale.max(1);
        let (width, height) = self.buffer.dimensions();
        let scaled = |side: u32| side.checked_mul(scale).filter(|&s| s <= MAX_EXPORT_SIZE);
        let (Some(scaled_width), Some(scaled_height)) = (scaled(width), scaled(height)) else {
            return Err(ImageError::Limits(LimitError::from_kind(
                LimitErrorKind::DimensionError,
            )));
        };
        if scale == 1 {
            return Ok(self.buffer.clone());
        }
        Ok(RgbaImage::from_fn(scaled_width, scaled_height, |x, y| {
            *self.buffer.get_pixel(x / scale, y / scale)
        }))
    }

    pub fn write_png(&self, path: impl AsRef<Path>, scale: u32) -> ImageResult<()> {
        self.export(scale)?.save_with_format(path, ImageFormat::Png)
    }
}
