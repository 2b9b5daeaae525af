//! Component, service and license-choice models.
//!
//! These are the walker-facing contract types: the SBOM document walk itself
//! is external, but every component or service it hands over uses this shape.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single asserted license on a component or service.
///
/// Either a structured license (id, name and/or URL) or a raw SPDX-style
/// expression string. This is also the unit the finder caches persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LicenseChoice {
    License(License),
    Expression(String),
}

impl LicenseChoice {
    /// Structured choice with only an SPDX id set.
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self::License(License {
            id: id.into(),
            ..License::default()
        })
    }

    /// Structured choice with only a name set.
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self::License(License {
            name: name.into(),
            ..License::default()
        })
    }

    /// Structured choice with a name and a URL.
    #[must_use]
    pub fn name_and_url(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::License(License {
            name: name.into(),
            url: url.into(),
            ..License::default()
        })
    }

    /// Raw expression choice.
    #[must_use]
    pub fn expression(expression: impl Into<String>) -> Self {
        Self::Expression(expression.into())
    }
}

/// Structured license data inside a [`LicenseChoice`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
}

/// A component as provided by the SBOM walker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    #[serde(default)]
    pub group: String,
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub purl: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bom_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub licenses: Vec<LicenseChoice>,
    /// Hierarchically nested components
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
}

impl Component {
    /// Extract the group from a composed name, when the walker delivered
    /// e.g. `name: "org.apache.commons/commons-lang3"` with an empty group.
    /// Splits once on the first `/`.
    pub fn split_composite_name(&mut self) {
        if self.group.is_empty() && self.name.contains('/') {
            if let Some((group, name)) = self.name.split_once('/') {
                if !group.is_empty() && !name.is_empty() {
                    self.group = group.to_string();
                    self.name = name.to_string();
                }
            }
        }
    }

    /// The `group:name:version` coordinate used for cache keys and logging.
    #[must_use]
    pub fn coordinate(&self) -> String {
        format!("{}:{}:{}", self.group, self.name, self.version)
    }
}

/// A service as provided by the SBOM walker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bom_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub licenses: Vec<LicenseChoice>,
    /// Hierarchically nested services
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<Service>,
}

/// Where in the document a license was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LicenseLocation {
    Metadata,
    MetadataComponent,
    Components,
    Services,
}

impl fmt::Display for LicenseLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Metadata => write!(f, "metadata"),
            Self::MetadataComponent => write!(f, "metadata-component"),
            Self::Components => write!(f, "components"),
            Self::Services => write!(f, "services"),
        }
    }
}
