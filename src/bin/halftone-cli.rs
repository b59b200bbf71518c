use core::fmt::Debug;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};
use std::{fmt::Display, str::FromStr};

use anyhow::Context;
use clap::Parser;

use halftone::compositor::Compositor;
use halftone::document::Document;
use halftone::rand::Rng;
use halftone::sampler::ImageSampler;
use halftone::texture::TextureCatalog;

#[derive(Parser)]
struct Opts {
    /// Source image (PNG or JPEG). Without one, only `--debug` produces any ink.
    input: Option<PathBuf>,
    /// Where to write the rendered PNG.
    #[clap(short, long, default_value = "halftone.png")]
    output: PathBuf,
    /// JSON configuration document to render with. Defaults to a single black screen.
    #[clap(long)]
    config: Option<PathBuf>,
    /// Integer upscaling factor for the exported PNG.
    #[clap(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..=64))]
    scale: u32,
    /// Noise seed as hex bytes. Picked from the clock if omitted.
    #[clap(long)]
    seed: Option<Seed>,
    /// Also write the effective configuration document to this path.
    #[clap(long)]
    dump_config: Option<PathBuf>,
    #[clap(flatten)]
    settings: halftone::config::Config,
}

#[derive(Clone)]
struct Seed(pub Vec<u8>);
impl Seed {
    fn from_clock() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        Seed(nanos.to_le_bytes().to_vec())
    }
    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}
impl FromStr for Seed {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes: Vec<u8> = hex::decode(s)?;
        Ok(Seed(bytes))
    }
}
impl Debug for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("0x")?;
        f.write_str(&hex::encode(&self.0))
    }
}
impl Display for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as Debug>::fmt(self, f)
    }
}

fn load_document(path: Option<&PathBuf>) -> anyhow::Result<Document> {
    let Some(path) = path else {
        return Ok(Document::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config at {}", path.display()))?;
    Document::from_json(&json).with_context(|| format!("Failed to load {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    let opts = Opts::parse();

    let mut document = load_document(opts.config.as_ref())?;
    opts.settings.apply_to(&mut document);

    let sampler = match &opts.input {
        Some(path) => {
            let image = image::open(path)
                .with_context(|| format!("Failed to decode image at {}", path.display()))?;
            log::info!(
                "loaded {} ({}x{})",
                path.display(),
                image.width(),
                image.height()
            );
            ImageSampler::from_dynamic(image, document.size)
        }
        None => {
            log::warn!("no input image given; only the debug gradient will produce ink");
            ImageSampler::empty(document.size)
        }
    };

    let seed = opts.seed.clone().unwrap_or_else(Seed::from_clock);
    log::info!("noise seed: {}", seed);

    let catalog = Rc::new(TextureCatalog::new(opts.settings.sub_resolution));
    let mut compositor = Compositor::new(catalog, sampler, Rng::from_seed(seed.as_bytes()));
    compositor.apply(&document)?;
    let (width, height) = compositor.render().dimensions();

    compositor
        .write_png(&opts.output, opts.scale)
        .with_context(|| format!("Failed to write {}", opts.output.display()))?;
    log::info!(
        "wrote png: {} ({}x{})",
        opts.output.display(),
        width * opts.scale,
        height * opts.scale
    );

    if let Some(path) = &opts.dump_config {
        let json = compositor.snapshot().to_json()?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        log::info!("wrote config: {}", path.display());
    }
    Ok(())
}
