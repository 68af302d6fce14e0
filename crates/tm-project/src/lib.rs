//! tm-project: threat-model definition files and their loading.

pub mod build;
pub mod migrate;
pub mod schema;
pub mod validate;

use std::path::Path;

pub use build::{LoadedModel, build_model, find_endpoint};
pub use migrate::{LATEST_VERSION, migrate_to_latest};
pub use schema::*;
pub use validate::{ValidationError, validate_def};

use tm_core::TmError;
use tracing::debug;

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Model error: {0}")]
    Model(#[from] TmError),

    #[error("Unknown reference: '{name}' in {context}")]
    UnknownReference { name: String, context: String },

    #[error("Ambiguous reference: '{name}' in {context} matches several elements")]
    AmbiguousReference { name: String, context: String },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Migrate, validate and build a parsed definition.
pub fn load_def(def: ModelDef) -> ProjectResult<LoadedModel> {
    let def = migrate_to_latest(def)?;
    validate_def(&def)?;
    build_model(&def)
}

pub fn from_yaml_str(content: &str) -> ProjectResult<LoadedModel> {
    let def: ModelDef = serde_yaml::from_str(content)?;
    load_def(def)
}

pub fn from_json_str(content: &str) -> ProjectResult<LoadedModel> {
    let def: ModelDef = serde_json::from_str(content)?;
    load_def(def)
}

pub fn load_yaml(path: &Path) -> ProjectResult<LoadedModel> {
    debug!(path = %path.display(), "loading YAML model");
    let content = std::fs::read_to_string(path)?;
    from_yaml_str(&content)
}

pub fn load_json(path: &Path) -> ProjectResult<LoadedModel> {
    debug!(path = %path.display(), "loading JSON model");
    let content = std::fs::read_to_string(path)?;
    from_json_str(&content)
}

/// Load by extension: `.json` is JSON, anything else YAML.
pub fn load(path: &Path) -> ProjectResult<LoadedModel> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => load_json(path),
        _ => load_yaml(path),
    }
}

pub fn save_yaml(path: &Path, def: &ModelDef) -> ProjectResult<()> {
    validate_def(def)?;
    let content = serde_yaml::to_string(def)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn save_json(path: &Path, def: &ModelDef) -> ProjectResult<()> {
    validate_def(def)?;
    let content = serde_json::to_string_pretty(def)?;
    std::fs::write(path, content)?;
    Ok(())
}
