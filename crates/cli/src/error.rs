//! CLI failures, each mapped to an exit code.
//!
//! - 2:  clap arg parse error (before our code runs)
//! - 10: the effect could not be built or stepped
//! - 11: a file could not be read, decoded or written
//! - 12: the user handed us something malformed (params, recipe)
//! - 13: JSON output could not be produced

use std::path::PathBuf;

use artfx_core::EffectError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Effect(EffectError),

    /// A source image was missing or not a decodable PNG/JPEG.
    #[error("cannot load image {path}: {reason}")]
    ImageLoad { path: PathBuf, reason: String },

    #[error("cannot write {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    #[error("cannot read recipe {path}: {source}")]
    RecipeRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The recipe file is not valid JSON or lacks required fields.
    #[error("invalid recipe {path}: {source}")]
    RecipeParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid --params JSON: {0}")]
    Params(serde_json::Error),

    /// `--params` parsed but is not a JSON object.
    #[error("--params must be a JSON object, got {0}")]
    ParamsShape(String),

    #[error("cannot serialize output: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    /// Returns the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Effect(_) => 10,
            CliError::ImageLoad { .. } | CliError::Write { .. } | CliError::RecipeRead { .. } => 11,
            CliError::RecipeParse { .. } | CliError::Params(_) | CliError::ParamsShape(_) => 12,
            CliError::Output(_) => 13,
        }
    }

    /// Wraps a decode failure for the image at `path`.
    pub fn image_load(path: impl Into<PathBuf>, err: EffectError) -> Self {
        CliError::ImageLoad {
            path: path.into(),
            reason: io_reason(err),
        }
    }

    /// Wraps a failure writing `path`. Non-I/O effect errors (such as
    /// oversized dimensions) stay effect errors.
    pub fn write(path: impl Into<PathBuf>, err: EffectError) -> Self {
        match err {
            EffectError::Io(reason) => CliError::Write {
                path: path.into(),
                reason,
            },
            other => CliError::Effect(other),
        }
    }
}

fn io_reason(err: EffectError) -> String {
    match err {
        EffectError::Io(reason) => reason,
        other => other.to_string(),
    }
}

impl From<EffectError> for CliError {
    fn from(e: EffectError) -> Self {
        CliError::Effect(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json_error(text: &str) -> serde_json::Error {
        serde_json::from_str::<serde_json::Value>(text).unwrap_err()
    }

    #[test]
    fn effect_errors_exit_10() {
        let err = CliError::from(EffectError::MissingImages {
            effect: "pixel-sort".into(),
            needed: 2,
            got: 0,
        });
        assert_eq!(err.exit_code(), 10);
        assert!(err.to_string().contains("pixel-sort"));
    }

    #[test]
    fn undecodable_image_names_the_file_and_exits_11() {
        let err = CliError::image_load("photos/cat.jpg", EffectError::Io("unsupported format".into()));
        assert_eq!(err.exit_code(), 11);
        let msg = err.to_string();
        assert!(msg.contains("photos/cat.jpg") && msg.contains("unsupported format"), "{msg}");
    }

    #[test]
    fn write_failure_exits_11_but_bad_dimensions_stay_effect_errors() {
        let io = CliError::write("out/x.png", EffectError::Io("disk full".into()));
        assert_eq!(io.exit_code(), 11);
        assert!(io.to_string().contains("out/x.png"));
        let dims = CliError::write(
            "x.png",
            EffectError::InvalidImageDimensions {
                width: 0,
                height: 1,
            },
        );
        assert_eq!(dims.exit_code(), 10);
    }

    #[test]
    fn missing_recipe_file_exits_11() {
        let err = CliError::RecipeRead {
            path: "r.json".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert_eq!(err.exit_code(), 11);
        assert!(err.to_string().contains("r.json"));
    }

    #[test]
    fn malformed_recipe_exits_12() {
        let err = CliError::RecipeParse {
            path: "r.json".into(),
            source: json_error("{\"effect\": "),
        };
        assert_eq!(err.exit_code(), 12);
        assert!(err.to_string().starts_with("invalid recipe r.json"));
    }

    #[test]
    fn bad_params_exit_12() {
        assert_eq!(CliError::Params(json_error("{oops")).exit_code(), 12);
        let shape = CliError::ParamsShape("array".into());
        assert_eq!(shape.exit_code(), 12);
        assert!(shape.to_string().contains("array"));
    }

    #[test]
    fn serde_errors_convert_to_output_failures() {
        let err: CliError = json_error("[").into();
        assert_eq!(err.exit_code(), 13);
    }
}
