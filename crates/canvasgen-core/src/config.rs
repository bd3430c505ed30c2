//! Canvas settings file handling.
//!
//! Settings are read from TOML into plain serde structs, then compiled into a
//! [`GraphDefinition`]. Every selector, link template and policy pattern is
//! compiled during [`CanvasSettings::load`], so a bad rule fails before any
//! resolution runs.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::CanvasError;
use crate::graph::{
    CollaboratorDefinition, GraphDefinition, PolicyDefinition, Role, RoleDefinition,
};
use crate::label::node_id;
use crate::link::LinkTemplate;
use crate::selector::parse_selector;

/// Settings file looked up next to the facts file.
pub const DEFAULT_SETTINGS_FILE: &str = "bounded_context_canvas_settings.toml";

/// Settings file as written on disk
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct SettingsFile {
    /// Document title
    #[serde(default)]
    pub name: Option<String>,

    /// Inbound communication rules
    #[serde(default)]
    pub inbound_communication: InboundCommunicationSettings,
}

/// `[inbound_communication]` table
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct InboundCommunicationSettings {
    #[serde(default)]
    pub commands: Option<RoleSettings>,

    #[serde(default)]
    pub domain_events: Option<RoleSettings>,

    #[serde(default)]
    pub integration_events: Option<RoleSettings>,

    #[serde(default)]
    pub collaborators: Vec<CollaboratorSettings>,

    #[serde(default)]
    pub policies: Vec<PolicySettings>,
}

/// Selector for one role, with an optional handler hop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleSettings {
    pub selector: String,

    #[serde(default)]
    pub handler: Option<HandlerSettings>,

    /// Fail when the selector matches nothing
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HandlerSettings {
    pub selector: String,
    pub link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollaboratorSettings {
    pub name: String,

    /// Optional collaborator type, used for styling
    #[serde(default, rename = "type")]
    pub kind: Option<String>,

    pub selector: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicySettings {
    pub method_attribute_pattern: String,
}

impl SettingsFile {
    /// Parse settings from TOML text.
    pub fn parse(content: &str, path: &Path) -> Result<Self, CanvasError> {
        toml::from_str(content).map_err(|e| {
            CanvasError::config(
                path.display().to_string(),
                format!("failed to parse settings file: {}", e),
            )
        })
    }

    /// Compile every rule into a graph definition.
    pub fn compile(&self, path: &Path) -> Result<CanvasSettings, CanvasError> {
        let inbound = &self.inbound_communication;
        let mut definition = GraphDefinition::new();

        let roles = [
            (Role::Command, &inbound.commands),
            (Role::DomainEvent, &inbound.domain_events),
            (Role::IntegrationEvent, &inbound.integration_events),
        ];
        for (role, settings) in roles {
            if let Some(settings) = settings {
                definition = definition.with_role(settings.compile(role)?);
            }
        }

        let mut ids: Vec<(String, &str)> = Vec::new();
        for collaborator in &inbound.collaborators {
            let name = collaborator.name.trim();
            let id = node_id(name);
            if id.is_empty() {
                return Err(CanvasError::config(
                    path.display().to_string(),
                    "collaborator name must contain a letter or digit",
                ));
            }
            if let Some((_, earlier)) = ids.iter().find(|(existing, _)| *existing == id) {
                return Err(CanvasError::config(
                    path.display().to_string(),
                    format!(
                        "collaborator '{}' has the same node id as '{}'",
                        name, earlier
                    ),
                ));
            }
            ids.push((id, name));

            let mut compiled =
                CollaboratorDefinition::new(name, parse_selector(&collaborator.selector)?);
            if let Some(kind) = collaborator.kind.as_deref().map(str::trim) {
                if !kind.is_empty() {
                    compiled = compiled.with_kind(kind);
                }
            }
            definition = definition.with_collaborator(compiled);
        }

        for policy in &inbound.policies {
            definition =
                definition.with_policy(PolicyDefinition::new(&policy.method_attribute_pattern)?);
        }

        Ok(CanvasSettings {
            name: self.name.clone().filter(|n| !n.trim().is_empty()),
            graph: definition,
        })
    }
}

impl RoleSettings {
    fn compile(&self, role: Role) -> Result<RoleDefinition, CanvasError> {
        let mut definition = RoleDefinition::new(role, parse_selector(&self.selector)?);
        if let Some(handler) = &self.handler {
            definition = definition.with_handler(
                parse_selector(&handler.selector)?,
                LinkTemplate::parse(&handler.link)?,
            );
        }
        if self.required {
            definition = definition.required();
        }
        Ok(definition)
    }
}

/// Compiled settings, ready for graph building.
#[derive(Debug, Clone, Default)]
pub struct CanvasSettings {
    pub name: Option<String>,
    pub graph: GraphDefinition,
}

impl CanvasSettings {
    /// Load and compile a settings file
    pub fn load(path: &Path) -> Result<Self, CanvasError> {
        let content = fs::read_to_string(path).map_err(|e| {
            CanvasError::config(
                path.display().to_string(),
                format!("failed to read settings file: {}", e),
            )
        })?;
        Self::from_toml(&content, path)
    }

    /// Parse and compile settings text; `path` is used for error messages.
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, CanvasError> {
        SettingsFile::parse(content, path)?.compile(path)
    }
}

/// Settings path used when none is given: next to the facts file.
pub fn default_settings_path(facts_path: &Path) -> PathBuf {
    facts_path
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(DEFAULT_SETTINGS_FILE)
}
