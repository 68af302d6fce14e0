//! Structural checks on a definition before it is built.
//!
//! These catch file-level mistakes (blank or repeated names) with messages that
//! point at the file section. Reference resolution happens in `build`.

use std::collections::HashSet;

use crate::schema::{FlowKindDef, ModelDef};

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Empty name in {context}")]
    EmptyName { context: String },

    #[error("Duplicate name: '{name}' in {context}")]
    DuplicateName { name: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

pub fn validate_def(def: &ModelDef) -> Result<(), ValidationError> {
    if def.name.trim().is_empty() {
        return Err(ValidationError::EmptyName {
            context: "model".to_string(),
        });
    }

    unique_names("actors", def.actors.iter().map(|a| a.name.as_str()))?;
    unique_names("components", def.components.iter().map(|c| c.name.as_str()))?;
    unique_names("boundaries", def.boundaries.iter().map(|b| b.name.as_str()))?;
    unique_names("flows", def.flows.iter().map(|f| f.name.as_str()))?;

    for flow in &def.flows {
        if flow.src == flow.dst {
            return Err(ValidationError::InvalidValue {
                field: format!("flows.{}.dst", flow.name),
                value: flow.dst.clone(),
                reason: "same as src".to_string(),
            });
        }
        if flow.kind == FlowKindDef::Work && (flow.protocol.is_some() || flow.port.is_some()) {
            return Err(ValidationError::InvalidValue {
                field: format!("flows.{}.kind", flow.name),
                value: "work".to_string(),
                reason: "work flows carry no protocol or port".to_string(),
            });
        }
        if flow.port == Some(0) {
            return Err(ValidationError::InvalidValue {
                field: format!("flows.{}.port", flow.name),
                value: "0".to_string(),
                reason: "port 0 is reserved".to_string(),
            });
        }
    }

    if def.settings.max_paths == Some(0) {
        return Err(ValidationError::InvalidValue {
            field: "settings.max_paths".to_string(),
            value: "0".to_string(),
            reason: "must allow at least one path".to_string(),
        });
    }

    Ok(())
}

fn unique_names<'a>(
    context: &str,
    names: impl Iterator<Item = &'a str>,
) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for name in names {
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName {
                context: context.to_string(),
            });
        }
        if !seen.insert(name) {
            return Err(ValidationError::DuplicateName {
                name: name.to_string(),
                context: context.to_string(),
            });
        }
    }
    Ok(())
}
