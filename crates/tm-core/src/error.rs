use thiserror::Error;

use crate::{ElementClass, ElementId};

pub type TmResult<T> = Result<T, TmError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TmError {
    #[error("Invalid argument: {what}")]
    InvalidArgument { what: String },

    #[error("Invalid relationship: {what}")]
    InvalidRelationship { what: String },

    #[error("Element {id} is not registered in this model")]
    NotRegistered { id: ElementId },

    #[error("Duplicate {class} name: {name}")]
    DuplicateName { class: ElementClass, name: String },

    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Integrity violated: {what}")]
    Integrity { what: String },
}

impl TmError {
    pub fn invalid_argument(what: impl Into<String>) -> Self {
        TmError::InvalidArgument { what: what.into() }
    }

    pub fn invalid_relationship(what: impl Into<String>) -> Self {
        TmError::InvalidRelationship { what: what.into() }
    }

    pub fn integrity(what: impl Into<String>) -> Self {
        TmError::Integrity { what: what.into() }
    }
}
