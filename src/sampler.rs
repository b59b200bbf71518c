use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use serde::{Deserialize, Serialize};

/// Which quantity of a source pixel a screen reads as its intensity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Darkness,
    Red,
    Green,
    Blue,
    Cyan,
    Magenta,
    Yellow,
}

impl Channel {
    pub fn all() -> &'static [Channel] {
        &[
            Channel::Darkness,
            Channel::Red,
            Channel::Green,
            Channel::Blue,
            Channel::Cyan,
            Channel::Magenta,
            Channel::Yellow,
        ]
    }

    /// Derives this channel from straight color components in `[0, 1]`.
    pub fn extract(self, [r, g, b]: [f64; 3]) -> f64 {
        match self {
            Channel::Darkness => 1.0 - (r + g + b) / 3.0,
            Channel::Red => r,
            Channel::Green => g,
            Channel::Blue => b,
            Channel::Cyan => 1.0 - r,
            Channel::Magenta => 1.0 - g,
            Channel::Yellow => 1.0 - b,
        }
    }
}

/// Computes output dimensions for an image of `(width, height)` fitted into a `size × size`
/// box: the longer side becomes `size` and the shorter side is scaled and floored.
pub fn fit_dimensions((width, height): (u32, u32), size: u32) -> (u32, u32) {
    let scaled = |short: u32, long: u32| -> u32 {
        if long == 0 {
            return size;
        }
        ((u64::from(short) * u64::from(size)) / u64::from(long)).max(1) as u32
    };
    if width >= height {
        (size, scaled(height, width))
    } else {
        (scaled(width, height), size)
    }
}

/// Answers channel queries against the source image, resampled to the output dimensions.
#[derive(Debug, Clone)]
pub struct ImageSampler {
    source: Option<RgbaImage>,
    fitted: Option<RgbaImage>,
    size: u32,
    width: u32,
    height: u32,
    debug: bool,
}

impl ImageSampler {
    /// A sampler with no image loaded yet. Every query returns 0 outside debug mode.
    pub fn empty(size: u32) -> Self {
        ImageSampler {
            source: None,
            fitted: None,
            size,
            width: size,
            height: size,
            debug: false,
        }
    }

    pub fn new(image: RgbaImage, size: u32) -> Self {
        let mut sampler = ImageSampler::empty(size);
        sampler.source = Some(image);
        sampler.refit();
        sampler
    }

    pub fn from_dynamic(image: DynamicImage, size: u32) -> Self {
        ImageSampler::new(image.into_rgba8(), size)
    }

    pub fn set_size(&mut self, size: u32) {
        if size != self.size {
            self.size = size;
            self.refit();
        }
    }

    fn refit(&mut self) {
        match &self.source {
            Some(source) => {
                let (w, h) = fit_dimensions(source.dimensions(), self.size);
                let fitted = if (w, h) == source.dimensions() {
                    source.clone()
                } else {
                    image::imageops::resize(source, w, h, FilterType::Triangle)
                };
                log::debug!(
                    "fitted {}x{} source into {}x{}",
                    source.width(),
                    source.height(),
                    w,
                    h
                );
                self.width = w;
                self.height = h;
                self.fitted = Some(fitted);
            }
            None => {
                self.width = self.size;
                self.height = self.size;
                self.fitted = None;
            }
        }
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn has_image(&self) -> bool {
        self.source.is_some()
    }

    /// Output dimensions: the fitted image, or the full box if no image is loaded.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Value of `channel` at output pixel `(x, y)`, in `[0, 1]`.
    ///
    /// Points outside the image, fully transparent pixels, and queries before an image is loaded
    /// all read as 0. In debug mode the image is ignored and every channel is a left-to-right
    /// gradient.
    pub fn channel_at(&self, x: f64, y: f64, channel: Channel) -> f64 {
        if self.debug {
            let last = f64::from(self.width.saturating_sub(1).max(1));
            return (x / last).clamp(0.0, 1.0);
        }
        let Some(image) = &self.fitted else {
            return 0.0;
        };
        if !(x >= 0.0 && y >= 0.0) {
            return 0.0;
        }
        let (px, py) = (x.floor() as u32, y.floor() as u32);
        if px >= image.width() || py >= image.height() {
            return 0.0;
        }
        let [r, g, b, a] = image.get_pixel(px, py).0;
        if a == 0 {
            return 0.0;
        }
        let unit = |v: u8| f64::from(v) / 255.0;
        channel.extract([unit(r), unit(g), unit(b)])
    }
}
