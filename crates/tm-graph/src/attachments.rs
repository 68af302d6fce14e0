//! Data, threats and controls attached to components and flows.

use tm_core::{TmError, TmResult};

/// How long a piece of data (typically a credential) stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifetime {
    /// Not applicable.
    #[default]
    None,
    Unknown,
    /// Relatively short time to live.
    Short,
    /// Long or no expiration.
    Long,
    /// No expiration, revoked automatically under some conditions.
    AutoRevocable,
    /// No expiration, can be invalidated manually.
    ManuallyRevocable,
    /// Cannot be invalidated at all.
    Hardcoded,
}

/// A piece of information processed, stored or carried by an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Data {
    pub name: String,
    pub description: Option<String>,
    pub is_pii: bool,
    pub is_phi: bool,
    pub is_credentials: bool,
    pub format: Option<String>,
    pub lifetime: Lifetime,
}

impl Data {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            is_pii: false,
            is_phi: false,
            is_credentials: false,
            format: None,
            lifetime: Lifetime::None,
        }
    }

    pub fn pii(mut self) -> Self {
        self.is_pii = true;
        self
    }

    pub fn phi(mut self) -> Self {
        self.is_phi = true;
        self
    }

    pub fn credentials(mut self, lifetime: Lifetime) -> Self {
        self.is_credentials = true;
        self.lifetime = lifetime;
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Sensitive data is anything personal, medical or a credential.
    pub fn is_sensitive(&self) -> bool {
        self.is_pii || self.is_phi || self.is_credentials
    }
}

/// What a threat record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThreatKind {
    /// An attack pattern, e.g. a CAPEC entry.
    #[default]
    Threat,
    /// A concrete problem observed in the system under analysis.
    Issue,
    /// A class of flaw, e.g. a CWE entry.
    Weakness,
    /// A specific known flaw, e.g. a CVE entry.
    Vulnerability,
}

/// A threat assigned to an element (e.g. a CAPEC or CWE entry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Threat {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub kind: ThreatKind,
}

impl Threat {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            kind: ThreatKind::Threat,
        }
    }

    pub fn with_kind(mut self, kind: ThreatKind) -> Self {
        self.kind = kind;
        self
    }
}

/// A safeguard or countermeasure implemented for an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

impl Control {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
        }
    }
}

/// Attachment collections owned by one component or flow.
///
/// Data is unique by name, threats and controls by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attachments {
    data: Vec<Data>,
    threats: Vec<Threat>,
    controls: Vec<Control>,
}

impl Attachments {
    pub fn data(&self) -> &[Data] {
        &self.data
    }

    pub fn threats(&self) -> &[Threat] {
        &self.threats
    }

    /// Attached threats of one kind, in attachment order.
    pub fn threats_of(&self, kind: ThreatKind) -> impl Iterator<Item = &Threat> + '_ {
        self.threats.iter().filter(move |t| t.kind == kind)
    }

    pub fn has_threat(&self, id: &str) -> bool {
        self.threats.iter().any(|t| t.id == id)
    }

    pub fn has_control(&self, id: &str) -> bool {
        self.controls.iter().any(|c| c.id == id)
    }

    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    pub fn has_data(&self, name: &str) -> bool {
        self.data.iter().any(|d| d.name == name)
    }

    pub fn add_data(&mut self, data: Data) -> TmResult<()> {
        if data.name.trim().is_empty() {
            return Err(TmError::invalid_argument("data name must not be empty"));
        }
        if self.has_data(&data.name) {
            return Err(TmError::invalid_argument(format!(
                "data '{}' is already attached",
                data.name
            )));
        }
        self.data.push(data);
        Ok(())
    }

    pub fn remove_data(&mut self, name: &str) -> TmResult<Data> {
        let pos = self
            .data
            .iter()
            .position(|d| d.name == name)
            .ok_or_else(|| TmError::NotFound {
                what: format!("data '{}'", name),
            })?;
        Ok(self.data.remove(pos))
    }

    pub fn add_threat(&mut self, threat: Threat) -> TmResult<()> {
        if threat.id.trim().is_empty() {
            return Err(TmError::invalid_argument("threat id must not be empty"));
        }
        if self.has_threat(&threat.id) {
            return Err(TmError::invalid_argument(format!(
                "threat '{}' is already attached",
                threat.id
            )));
        }
        self.threats.push(threat);
        Ok(())
    }

    pub fn remove_threat(&mut self, id: &str) -> TmResult<Threat> {
        let pos = self
            .threats
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| TmError::NotFound {
                what: format!("threat '{}'", id),
            })?;
        Ok(self.threats.remove(pos))
    }

    pub fn add_control(&mut self, control: Control) -> TmResult<()> {
        if control.id.trim().is_empty() {
            return Err(TmError::invalid_argument("control id must not be empty"));
        }
        if self.has_control(&control.id) {
            return Err(TmError::invalid_argument(format!(
                "control '{}' is already attached",
                control.id
            )));
        }
        self.controls.push(control);
        Ok(())
    }

    pub fn remove_control(&mut self, id: &str) -> TmResult<Control> {
        let pos = self
            .controls
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| TmError::NotFound {
                what: format!("control '{}'", id),
            })?;
        Ok(self.controls.remove(pos))
    }
}
