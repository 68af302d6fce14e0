//! Definition file versioning.

use crate::ProjectError;
use crate::schema::ModelDef;

pub const LATEST_VERSION: u32 = 1;

pub fn migrate_to_latest(mut def: ModelDef) -> Result<ModelDef, ProjectError> {
    if def.version > LATEST_VERSION {
        return Err(ProjectError::UnsupportedVersion {
            version: def.version,
        });
    }
    while def.version < LATEST_VERSION {
        def = migrate_one_version(def)?;
    }
    Ok(def)
}

fn migrate_one_version(def: ModelDef) -> Result<ModelDef, ProjectError> {
    match def.version {
        0 => migrate_v0_to_v1(def),
        v => Err(ProjectError::UnsupportedVersion { version: v }),
    }
}

/// Version 0 files predate `settings`; the serde defaults already fill it.
fn migrate_v0_to_v1(mut def: ModelDef) -> Result<ModelDef, ProjectError> {
    def.version = 1;
    Ok(def)
}
