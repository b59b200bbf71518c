use crate::document::Document;
use crate::texture::{DEFAULT_SUB_RESOLUTION, MAX_SUB_RESOLUTION};

#[derive(Debug, clap::Args)]
pub struct Config {
    /// Fit the source image into a box this many pixels wide and tall. Overrides the size in a
    /// loaded configuration.
    #[clap(long)]
    pub size: Option<u32>,

    /// Ignore the source image and sample a left-to-right gradient instead, to check screen
    /// geometry.
    #[clap(long)]
    pub debug: bool,

    /// Cells per side of the pixelated and euclidean dot textures.
    #[clap(long, default_value_t = DEFAULT_SUB_RESOLUTION, value_parser = parse_sub_resolution)]
    pub sub_resolution: usize,
}

fn parse_sub_resolution(s: &str) -> Result<usize, String> {
    let n: usize = s.parse().map_err(|e| format!("{}", e))?;
    if (1..=MAX_SUB_RESOLUTION).contains(&n) {
        Ok(n)
    } else {
        Err(format!("must be between 1 and {}", MAX_SUB_RESOLUTION))
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            size: None,
            debug: false,
            sub_resolution: DEFAULT_SUB_RESOLUTION,
        }
    }
}

impl Config {
    /// Applies the command-line overrides to a loaded document.
    pub fn apply_to(&self, document: &mut Document) {
        if let Some(size) = self.size {
            document.size = size;
        }
        if self.debug {
            document.source.debug = true;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Cli {
        #[clap(flatten)]
        config: Config,
    }

    #[test]
    fn test_overrides() {
        let mut document = Document::default();
        Config::default().apply_to(&mut document);
        assert_eq!(document, Document::default());

        let config = Config {
            size: Some(128),
            debug: true,
            ..Config::default()
        };
        config.apply_to(&mut document);
        assert_eq!(document.size, 128);
        assert!(document.source.debug);
    }

    #[test]
    fn test_sub_resolution_flag() {
        let cli = Cli::try_parse_from(["halftone"]).unwrap();
        assert_eq!(cli.config.sub_resolution, DEFAULT_SUB_RESOLUTION);
        let cli = Cli::try_parse_from(["halftone", "--sub-resolution", "4"]).unwrap();
        assert_eq!(cli.config.sub_resolution, 4);
        for bad in ["0", "33", "-1", "ten"] {
            assert!(
                Cli::try_parse_from(["halftone", "--sub-resolution", bad]).is_err(),
                "{}",
                bad
            );
        }
    }
}
