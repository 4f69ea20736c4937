use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// `groupId:artifactId` pair used to key workspace members.
///
/// Serialized as the `groupId:artifactId` string so it can key JSON maps.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ArtifactKey {
    pub group_id: String,
    pub artifact_id: String,
}

impl ArtifactKey {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
        }
    }
}

impl From<ArtifactKey> for String {
    fn from(key: ArtifactKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for ArtifactKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.split_once(':') {
            Some((group_id, artifact_id)) if !group_id.is_empty() && !artifact_id.is_empty() => {
                Ok(ArtifactKey::new(group_id, artifact_id))
            }
            _ => Err(format!("expected `groupId:artifactId`, got `{value}`")),
        }
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub scope: Option<String>,
    pub classifier: Option<String>,
    #[serde(rename = "type")]
    pub type_: Option<String>,
    #[serde(default)]
    pub optional: bool,
}

impl Dependency {
    pub fn key(&self) -> ArtifactKey {
        ArtifactKey::new(self.group_id.clone(), self.artifact_id.clone())
    }

    /// `<scope>import</scope>` + `<type>pom</type>` inside `<dependencyManagement>`.
    pub fn is_bom_import(&self) -> bool {
        self.scope.as_deref() == Some("import") && self.type_.as_deref() == Some("pom")
    }
}

/// The `<parent>` element of a POM.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentRef {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    /// `None` when `<relativePath>` is absent or empty.
    pub relative_path: Option<String>,
}

/// `<activation><property>`; either part may be negated with a leading `!`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyActivation {
    pub name: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activation {
    pub active_by_default: bool,
    pub property: Option<PropertyActivation>,
    pub file_exists: Option<String>,
    pub file_missing: Option<String>,
}

impl Activation {
    pub(crate) fn has_conditions(&self) -> bool {
        self.property.is_some() || self.file_exists.is_some() || self.file_missing.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub activation: Activation,
    pub properties: BTreeMap<String, String>,
    pub modules: Vec<String>,
    pub dependencies: Vec<Dependency>,
    pub dependency_management: Vec<Dependency>,
}

/// A `pom.xml` as parsed, before inheritance and profile resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPom {
    pub pom_file: PathBuf,
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub packaging: Option<String>,
    pub parent: Option<ParentRef>,
    pub modules: Vec<String>,
    pub properties: BTreeMap<String, String>,
    pub dependencies: Vec<Dependency>,
    pub dependency_management: Vec<Dependency>,
    pub profiles: Vec<Profile>,
}

impl RawPom {
    pub fn project_dir(&self) -> &Path {
        self.pom_file.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Own groupId, falling back to the `<parent>` element's.
    pub fn raw_group_id(&self) -> Option<&str> {
        self.group_id
            .as_deref()
            .or_else(|| self.parent.as_ref().and_then(|p| p.group_id.as_deref()))
    }

    /// Own version, falling back to the `<parent>` element's.
    ///
    /// Not interpolated: CI-friendly versions come back as e.g. `${revision}`.
    pub fn raw_version(&self) -> Option<&str> {
        self.version
            .as_deref()
            .or_else(|| self.parent.as_ref().and_then(|p| p.version.as_deref()))
    }

    pub fn raw_key(&self) -> Option<ArtifactKey> {
        Some(ArtifactKey::new(
            self.raw_group_id()?,
            self.artifact_id.as_deref()?,
        ))
    }
}

/// A POM after inheritance, profile activation and interpolation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectivePom {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub packaging: String,
    pub properties: BTreeMap<String, String>,
    pub modules: Vec<String>,
    pub dependencies: Vec<Dependency>,
    pub dependency_management: BTreeMap<ArtifactKey, Dependency>,
    pub active_profiles: Vec<String>,
}

impl EffectivePom {
    pub fn key(&self) -> ArtifactKey {
        ArtifactKey::new(self.group_id.clone(), self.artifact_id.clone())
    }
}
