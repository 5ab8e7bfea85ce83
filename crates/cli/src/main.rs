#![deny(unsafe_code)]
//! CLI binary for the artfx image renderers.
//!
//! Subcommands:
//! - `render <effect>`: load images, run the effect N frames, write PNG
//! - `recipe <file>`: replay a saved render description
//! - `list`: print available effects

mod error;

use artfx_core::effect::run as run_effect;
use artfx_core::{PixelBuffer, RasterSurface, Recipe};
use artfx_effects::snapshot::{load_image, write_png};
use artfx_effects::EffectKind;
use clap::{Parser, Subcommand};
use error::CliError;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "artfx", about = "Procedural image effect renderer")]
struct Cli {
    /// Output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run an effect and write the final frame as a PNG.
    Render {
        /// Effect name (e.g. "flow-field").
        effect: String,

        /// Source image; repeat for effects that blend several.
        #[arg(short, long = "image")]
        images: Vec<PathBuf>,

        /// Canvas width in pixels.
        #[arg(short = 'W', long, default_value_t = 600)]
        width: usize,

        /// Canvas height in pixels. Defaults to the effect's natural height.
        #[arg(short = 'H', long)]
        height: Option<usize>,

        /// Frames to draw. Static effects stop after one.
        #[arg(short, long, default_value_t = 120)]
        frames: u64,

        /// PRNG seed for deterministic output.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Effect parameters as a JSON string.
        #[arg(long, default_value = "{}")]
        params: String,

        /// Output file path.
        #[arg(short, long, default_value = "output.png")]
        output: PathBuf,

        /// Also write the render description as a recipe JSON file.
        #[arg(long)]
        save_recipe: Option<PathBuf>,
    },
    /// Replay a recipe JSON file.
    Recipe {
        file: PathBuf,

        /// Output file path.
        #[arg(short, long, default_value = "output.png")]
        output: PathBuf,
    },
    /// List available effects.
    List,
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

fn load_images(paths: &[PathBuf], base: Option<&Path>) -> Result<Vec<PixelBuffer>, CliError> {
    paths
        .iter()
        .map(|p| {
            let path = match base {
                Some(dir) if p.is_relative() => dir.join(p),
                _ => p.clone(),
            };
            load_image(&path).map_err(|e| CliError::image_load(path, e))
        })
        .collect()
}

/// Builds and runs the recipe's effect, returning the frames drawn.
fn render(recipe: &Recipe, images: &[PixelBuffer], output: &Path) -> Result<u64, CliError> {
    recipe.validate()?;
    let kind = EffectKind::from_name(&recipe.effect)?;
    let mut effect = kind.build(
        recipe.width,
        recipe.height,
        recipe.seed,
        &recipe.params,
        images,
    )?;
    let mut surface = RasterSurface::new(recipe.width, recipe.height)?;
    let drawn = run_effect(effect.as_mut(), &mut surface, recipe.frames.max(1))?;
    effect.dispose();
    write_png(surface.buffer(), output).map_err(|e| CliError::write(output, e))?;
    Ok(drawn)
}

fn report(json: bool, recipe: &Recipe, drawn: u64, output: &Path) -> Result<(), CliError> {
    if json {
        let info = serde_json::json!({
            "effect": recipe.effect,
            "width": recipe.width,
            "height": recipe.height,
            "frames": drawn,
            "seed": recipe.seed,
            "params": recipe.params,
            "output": output.display().to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        eprintln!(
            "rendered {} ({}x{}, {drawn} frames, seed {}) -> {}",
            recipe.effect,
            recipe.width,
            recipe.height,
            recipe.seed,
            output.display()
        );
    }
    Ok(())
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::List => {
            let kinds = EffectKind::all();
            if cli.json {
                let effects: Vec<_> = kinds
                    .iter()
                    .map(|k| {
                        serde_json::json!({
                            "name": k.name(),
                            "images": k.images_needed(),
                            "animated": k.is_animated(),
                        })
                    })
                    .collect();
                let info = serde_json::json!({ "effects": effects });
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("Effects:");
                for k in kinds {
                    let motion = if k.is_animated() { "animated" } else { "static" };
                    println!("  {:<18} {} image(s), {motion}", k.name(), k.images_needed());
                }
            }
        }
        Command::Render {
            effect,
            images,
            width,
            height,
            frames,
            seed,
            params,
            output,
            save_recipe,
        } => {
            let params: serde_json::Value =
                serde_json::from_str(&params).map_err(CliError::Params)?;
            if !params.is_object() {
                return Err(CliError::ParamsShape(json_kind(&params).to_string()));
            }
            let kind = EffectKind::from_name(&effect)?;
            let buffers = load_images(&images, None)?;
            let height = height.unwrap_or_else(|| kind.natural_height(width, &buffers, &params));

            let mut recipe = Recipe::new(&effect, width, height, seed);
            recipe.params = params;
            recipe.frames = frames;
            recipe.inputs = images;

            let drawn = render(&recipe, &buffers, &output)?;
            if let Some(path) = save_recipe {
                fs::write(&path, serde_json::to_string_pretty(&recipe)?).map_err(|e| {
                    CliError::Write {
                        path: path.clone(),
                        reason: e.to_string(),
                    }
                })?;
                tracing::info!(path = %path.display(), "recipe saved");
            }
            report(cli.json, &recipe, drawn, &output)?;
        }
        Command::Recipe { file, output } => {
            let text = fs::read_to_string(&file).map_err(|source| CliError::RecipeRead {
                path: file.clone(),
                source,
            })?;
            let recipe: Recipe =
                serde_json::from_str(&text).map_err(|source| CliError::RecipeParse {
                    path: file.clone(),
                    source,
                })?;
            let buffers = load_images(&recipe.inputs, file.parent())?;
            let drawn = render(&recipe, &buffers, &output)?;
            report(cli.json, &recipe, drawn, &output)?;
        }
    }

    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json_mode = cli.json;
    if let Err(e) = run(cli) {
        if json_mode {
            let j = serde_json::json!({"error": e.to_string(), "exit_code": e.exit_code()});
            eprintln!("{}", serde_json::to_string_pretty(&j).unwrap_or_default());
        } else {
            eprintln!("error: {e}");
        }
        process::exit(e.exit_code());
    }
}
