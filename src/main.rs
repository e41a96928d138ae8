use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use mosaic::atlas::AtlasBuilder;
use mosaic::cache::{AtlasCache, CacheMeta, cache_compatible};
use mosaic::cli::{CliArgs, Command, CompressionLevel, InspectArgs, PackArgs};
use mosaic::config::{
    CompressConfig, InputConfig, LoadedConfig, MosaicConfig, make_relative, save_config,
};
use mosaic::gpu::{ColorPrecision, TextureFilter};
use mosaic::sprite::{GROUP_PRIORITY_STRIDE, InputGroup, ResourceSet, load_images};

const DEFAULT_MAX_SIZE: u32 = 2048;
const DEFAULT_OUTPUT: &str = "atlas-cache";

#[allow(clippy::print_stderr)]
fn main() {
    if let Err(e) = run() {
        // Use eprintln instead of error! because logger may not be initialized
        // (e.g., config loading fails before logger init)
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = CliArgs::parse();

    match cli.command {
        Command::Pack(args) => {
            let merged = merge_config_with_args(&args)?;
            init_logging(merged.verbose);
            pack(merged)
        }
        Command::Inspect(args) => {
            init_logging(args.verbose);
            inspect(&args)
        }
    }
}

fn init_logging(verbose: bool) {
    env_logger::Builder::new()
        .filter_level(if verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn pack(merged: MergedConfig) -> Result<()> {
    info!("Mosaic atlas packer v{}", env!("CARGO_PKG_VERSION"));

    if let Some(path) = &merged.write_config {
        write_config(&merged, path)?;
    }

    let images = load_images(&merged.groups, merged.base_dir.as_deref())?;
    let set = ResourceSet::try_from(images).context("invalid input images")?;
    info!("Loaded {} images", set.len());

    let atlases = AtlasBuilder::new(merged.max_size)
        .border(merged.border)
        .color_precision(merged.color_precision)
        .build(set.images())?;

    let meta = CacheMeta {
        max_atlas_size: merged.max_size,
        texture_filter: merged.filter,
        color_precision: merged.color_precision,
    };
    AtlasCache::new(&merged.output)
        .compress(merged.compress)
        .save(&atlases, &meta)?;

    info!("Done!");

    Ok(())
}

/// Save the merged settings so the same pack can be rerun with `-c`.
fn write_config(merged: &MergedConfig, path: &Path) -> Result<()> {
    let config_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let config = merged.to_config(config_dir)?;
    save_config(&config, path)?;
    info!("Wrote config to {}", path.display());
    Ok(())
}

#[allow(clippy::print_stdout)]
fn inspect(args: &InspectArgs) -> Result<()> {
    let cache = AtlasCache::new(&args.dir);
    let manifest = cache
        .read_manifest()?
        .with_context(|| format!("no atlas cache in {}", args.dir.display()))?;

    println!("format:          {}", manifest.format_tag);
    println!("max atlas size:  {}", manifest.max_atlas_size);
    println!("color precision: {:?}", manifest.color_precision);
    println!("texture filter:  {:?}", manifest.texture_filter);
    println!("drawables:       {}", manifest.region_count());
    for atlas in &manifest.atlases {
        println!(
            "  {} {}x{} ({} regions)",
            atlas.image,
            atlas.side,
            atlas.side,
            atlas.regions.len()
        );
    }

    if let Some(max_size) = args.max_size {
        let compatible = cache_compatible(manifest.max_atlas_size, max_size, &manifest.atlas_sides());
        println!(
            "compatible with {}px: {}",
            max_size,
            if compatible { "yes" } else { "no" }
        );
    }

    Ok(())
}

/// Merged configuration from CLI args and optional config file.
struct MergedConfig {
    /// Loaded config, or defaults; carries the settings the CLI cannot change
    settings: MosaicConfig,
    groups: Vec<InputGroup>,
    /// Inputs as given, before glob expansion
    patterns: Vec<InputConfig>,
    /// Directory file inputs are keyed relative to
    base_dir: Option<PathBuf>,
    output: PathBuf,
    max_size: u32,
    border: u32,
    filter: TextureFilter,
    color_precision: ColorPrecision,
    compress: Option<CompressionLevel>,
    write_config: Option<PathBuf>,
    verbose: bool,
}

impl MergedConfig {
    /// The merged settings as a config file stored in `config_dir`.
    fn to_config(&self, config_dir: &Path) -> Result<MosaicConfig> {
        let base = std::path::absolute(config_dir)
            .with_context(|| format!("failed to resolve {}", config_dir.display()))?;
        let relative = |path: &Path| -> Result<String> {
            let path = std::path::absolute(path)
                .with_context(|| format!("failed to resolve {}", path.display()))?;
            Ok(make_relative(&path, &base))
        };

        let inputs = self
            .patterns
            .iter()
            .map(|input| {
                Ok(InputConfig {
                    pattern: relative(Path::new(&input.pattern))?,
                    priority: input.priority,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(MosaicConfig {
            border: self.border,
            max_atlas_size: Some(self.max_size),
            texture_filter: self.filter,
            color_precision: self.color_precision,
            cache_dir: Some(PathBuf::from(relative(&self.output)?)),
            compress: self.compress.map(CompressConfig::from),
            inputs,
            ..self.settings.clone()
        })
    }
}

/// Merge config file values with CLI arguments.
/// CLI arguments always take precedence over config values.
fn merge_config_with_args(args: &PackArgs) -> Result<MergedConfig> {
    let loaded_config = if let Some(config_path) = &args.config {
        Some(
            LoadedConfig::load(config_path)
                .with_context(|| format!("failed to load config: {}", config_path.display()))?,
        )
    } else {
        None
    };
    let config = loaded_config
        .as_ref()
        .map(|lc| lc.config.clone())
        .unwrap_or_default();

    // Inputs: CLI args override config; every CLI input is its own group
    let (groups, patterns, base_dir) = if !args.input.is_empty() {
        let mut groups = Vec::with_capacity(args.input.len());
        let mut patterns = Vec::with_capacity(args.input.len());
        for (i, path) in args.input.iter().enumerate() {
            let priority = i32::try_from(i)
                .ok()
                .and_then(|i| i.checked_mul(GROUP_PRIORITY_STRIDE))
                .context("too many input groups")?;
            groups.push(InputGroup {
                paths: vec![path.clone()],
                priority,
            });
            patterns.push(InputConfig {
                pattern: path.to_string_lossy().into_owned(),
                priority,
            });
        }
        (groups, patterns, None)
    } else if let Some(ref lc) = loaded_config {
        let groups = lc
            .resolve_input_groups()
            .context("failed to resolve input files from config")?;
        let patterns = lc
            .config
            .inputs
            .iter()
            .map(|input| InputConfig {
                pattern: lc.config_dir.join(&input.pattern).to_string_lossy().into_owned(),
                priority: input.priority,
            })
            .collect();
        (groups, patterns, Some(lc.config_dir.clone()))
    } else {
        // This shouldn't happen due to clap's required_unless_present
        (Vec::new(), Vec::new(), None)
    };

    // Output directory: CLI > config > default
    let output = args.output.clone().unwrap_or_else(|| {
        loaded_config
            .as_ref()
            .and_then(LoadedConfig::resolve_cache_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT))
    });

    let max_size = args
        .max_size
        .or(config.max_atlas_size)
        .unwrap_or(DEFAULT_MAX_SIZE);
    let border = args.border.unwrap_or(config.border);
    let filter = args.filter.map_or(config.texture_filter, TextureFilter::from);

    let color_precision = if args.low_bit {
        ColorPrecision::Low
    } else {
        config.color_precision
    };

    let compress = if args.compress.is_some() {
        args.compress
    } else {
        config.compress_level()?
    };

    Ok(MergedConfig {
        settings: config,
        groups,
        patterns,
        base_dir,
        output,
        max_size,
        border,
        filter,
        color_precision,
        compress,
        write_config: args.write_config.clone(),
        verbose: args.verbose,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_pack(args: &[&str]) -> PackArgs {
        let cli = CliArgs::try_parse_from(args).unwrap();
        let Command::Pack(args) = cli.command else {
            panic!("expected pack");
        };
        args
    }

    #[test]
    fn test_write_config_reproduces_the_pack() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let art = root.join("art");
        let ui = root.join("ui");
        let out = root.join("out");
        let config_path = root.join("mosaic.json");

        let args = parse_pack(&[
            "mosaic",
            "pack",
            art.to_str().unwrap(),
            ui.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
            "--border",
            "2",
            "--low-bit",
            "--compress",
            "max",
            "--write-config",
            config_path.to_str().unwrap(),
        ]);
        let merged = merge_config_with_args(&args).unwrap();
        write_config(&merged, args.write_config.as_deref().unwrap()).unwrap();

        let loaded = LoadedConfig::load(&config_path).unwrap();
        let patterns: Vec<_> = loaded.config.inputs.iter().map(|i| i.pattern.as_str()).collect();
        assert_eq!(patterns, ["art", "ui"]);
        assert_eq!(loaded.config.cache_dir, Some(PathBuf::from("out")));
        assert_eq!(loaded.config.max_atlas_size, Some(DEFAULT_MAX_SIZE));

        // rerunning from the written file gives the same settings
        let again = merge_config_with_args(&parse_pack(&[
            "mosaic",
            "pack",
            "-c",
            config_path.to_str().unwrap(),
        ]))
        .unwrap();
        assert_eq!(again.output, out);
        assert_eq!(again.border, 2);
        assert_eq!(again.color_precision, ColorPrecision::Low);
        assert_eq!(again.compress, Some(CompressionLevel::Max));
        assert_eq!(again.groups.len(), 2);
        assert_eq!(again.groups[1].paths, vec![ui]);
        assert_eq!(again.groups[1].priority, GROUP_PRIORITY_STRIDE);
    }
}
