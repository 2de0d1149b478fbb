//! Configuration file loader.
//!
//! Configuration lives in a single `config.toml`. A missing file is not an
//! error: every field has a default, so a bare installation with the three
//! tools on PATH needs no configuration at all.

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::models::PipelineConfig;
use std::path::{Path, PathBuf};

/// Load configuration from `path`.
///
/// Returns the default configuration when the file does not exist.
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: &Path) -> ConfigResult<PipelineConfig> {
    if !path.exists() {
        return Ok(PipelineConfig::default());
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let config: PipelineConfig =
        toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(config)
}

/// Resolve bare tool names onto PATH.
///
/// Entries that already contain a path separator are taken as-is, so a
/// configured absolute location is never second-guessed. Called once by the
/// driver before the pipeline starts; the stages then trust the paths.
///
/// # Errors
///
/// Returns `ConfigError::ToolNotFound` for a bare name PATH lookup that
/// comes up empty.
pub fn resolve_tools(config: &mut PipelineConfig) -> ConfigResult<()> {
    for tool in [
        &mut config.tools.bcl2fastq,
        &mut config.tools.fastqc,
        &mut config.tools.pdflatex,
    ] {
        *tool = resolve_one(tool)?;
    }
    Ok(())
}

fn resolve_one(tool: &Path) -> ConfigResult<PathBuf> {
    if tool.components().count() > 1 {
        return Ok(tool.to_path_buf());
    }
    which::which(tool).map_err(|source| ConfigError::ToolNotFound {
        name: tool.to_string_lossy().into_owned(),
        source,
    })
}
