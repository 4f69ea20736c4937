//! Effective model computation.
//!
//! The loader only depends on [`EffectiveModelBuilder`]; [`DefaultModelBuilder`] implements the
//! subset of Maven's model building that matters for workspace discovery: coordinate and
//! property inheritance, profile activation, `${...}` interpolation and dependency management
//! (including BOM imports served by workspace members).

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::ModelBuildError;
use crate::model::{ArtifactKey, Dependency, EffectivePom, Profile, RawPom};
use crate::workspace::WorkspaceModelResolver;

/// Everything needed to turn one raw POM into its effective form.
pub struct ModelBuildingRequest<'a> {
    pub raw: &'a RawPom,
    /// Effective model of the resolved parent, already built.
    pub parent: Option<&'a EffectivePom>,
    pub active_profiles: &'a [String],
    pub inactive_profiles: &'a [String],
    /// `-D` style properties; these win over model properties.
    pub user_properties: &'a BTreeMap<String, String>,
    pub workspace: &'a dyn WorkspaceModelResolver,
}

pub trait EffectiveModelBuilder {
    fn build(&self, request: &ModelBuildingRequest<'_>) -> Result<EffectivePom, ModelBuildError>;
}

impl<F> EffectiveModelBuilder for F
where
    F: Fn(&ModelBuildingRequest<'_>) -> Result<EffectivePom, ModelBuildError>,
{
    fn build(&self, request: &ModelBuildingRequest<'_>) -> Result<EffectivePom, ModelBuildError> {
        self(request)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultModelBuilder;

/// Upper bound on nested `${a}` -> `${b}` -> ... expansion.
const MAX_INTERPOLATION_DEPTH: usize = 8;

impl EffectiveModelBuilder for DefaultModelBuilder {
    fn build(&self, request: &ModelBuildingRequest<'_>) -> Result<EffectivePom, ModelBuildError> {
        let raw = request.raw;
        let parent = request.parent;
        let parent_ref = raw.parent.as_ref();

        let active = active_profiles(
            raw,
            request.active_profiles,
            request.inactive_profiles,
            request.user_properties,
        );

        let group_id = raw
            .group_id
            .clone()
            .or_else(|| parent_ref.and_then(|p| p.group_id.clone()))
            .or_else(|| parent.map(|p| p.group_id.clone()))
            .ok_or(ModelBuildError::MissingCoordinate { field: "groupId" })?;
        let artifact_id = raw
            .artifact_id
            .clone()
            .ok_or(ModelBuildError::MissingCoordinate {
                field: "artifactId",
            })?;
        let raw_version = raw
            .version
            .clone()
            .or_else(|| parent_ref.and_then(|p| p.version.clone()))
            .or_else(|| parent.map(|p| p.version.clone()))
            .ok_or(ModelBuildError::MissingCoordinate { field: "version" })?;

        let mut properties = parent.map(|p| p.properties.clone()).unwrap_or_default();
        properties.extend(raw.properties.clone());
        for profile in &active {
            properties.extend(profile.properties.clone());
        }

        let basedir = raw.project_dir().to_string_lossy().into_owned();
        for prefix in ["project", "pom"] {
            properties.insert(format!("{prefix}.groupId"), group_id.clone());
            properties.insert(format!("{prefix}.artifactId"), artifact_id.clone());
            properties.insert(format!("{prefix}.basedir"), basedir.clone());
        }
        properties.insert("basedir".to_string(), basedir);

        let interpolator = Interpolator {
            user: request.user_properties,
            model: &properties,
        };
        let version = interpolator.interpolate(&raw_version);
        if version.contains("${") {
            return Err(ModelBuildError::UnresolvedVersion { version });
        }
        properties.insert("project.version".to_string(), version.clone());
        properties.insert("pom.version".to_string(), version.clone());

        let interpolator = Interpolator {
            user: request.user_properties,
            model: &properties,
        };

        let packaging = raw
            .packaging
            .as_deref()
            .map(|p| interpolator.interpolate(p))
            .unwrap_or_else(|| "jar".to_string());

        let mut modules: Vec<String> = Vec::new();
        for module in raw
            .modules
            .iter()
            .chain(active.iter().flat_map(|p| p.modules.iter()))
        {
            if !modules.contains(module) {
                modules.push(module.clone());
            }
        }

        let mut dependency_management = parent
            .map(|p| p.dependency_management.clone())
            .unwrap_or_default();
        let managed = raw
            .dependency_management
            .iter()
            .chain(active.iter().flat_map(|p| p.dependency_management.iter()));
        for dep in managed {
            let dep = interpolate_dependency(dep, &interpolator);
            if dep.is_bom_import() {
                import_bom(&dep, request.workspace, &mut dependency_management);
                continue;
            }
            dependency_management.insert(dep.key(), dep);
        }

        let mut dependencies = Vec::new();
        let declared = raw
            .dependencies
            .iter()
            .chain(active.iter().flat_map(|p| p.dependencies.iter()));
        for dep in declared {
            let mut dep = interpolate_dependency(dep, &interpolator);
            if let Some(managed) = dependency_management.get(&dep.key()) {
                if dep.version.is_none() {
                    dep.version = managed.version.clone();
                }
                if dep.scope.is_none() {
                    dep.scope = managed.scope.clone();
                }
            }
            dependencies.push(dep);
        }

        Ok(EffectivePom {
            group_id,
            artifact_id,
            version,
            packaging,
            properties,
            modules,
            dependencies,
            dependency_management,
            active_profiles: active.iter().map(|p| p.id.clone()).collect(),
        })
    }
}

fn import_bom(
    bom: &Dependency,
    workspace: &dyn WorkspaceModelResolver,
    dependency_management: &mut BTreeMap<ArtifactKey, Dependency>,
) {
    let imported = bom
        .version
        .as_deref()
        .and_then(|version| workspace.resolve_effective_model(&bom.group_id, &bom.artifact_id, version));
    let Some(imported) = imported else {
        tracing::debug!(
            target = "nova.maven",
            bom = %bom.key(),
            version = ?bom.version,
            "BOM import is not a workspace member; skipping"
        );
        return;
    };

    for (key, dep) in &imported.dependency_management {
        // Explicitly managed entries win over imported ones.
        dependency_management
            .entry(key.clone())
            .or_insert_with(|| dep.clone());
    }
}

fn interpolate_dependency(dep: &Dependency, interpolator: &Interpolator<'_>) -> Dependency {
    Dependency {
        group_id: interpolator.interpolate(&dep.group_id),
        artifact_id: interpolator.interpolate(&dep.artifact_id),
        version: dep.version.as_deref().map(|v| interpolator.interpolate(v)),
        scope: dep.scope.as_deref().map(|v| interpolator.interpolate(v)),
        classifier: dep.classifier.as_deref().map(|v| interpolator.interpolate(v)),
        type_: dep.type_.as_deref().map(|v| interpolator.interpolate(v)),
        optional: dep.optional,
    }
}

/// Profiles of `raw` that are active for this build, in declaration order.
pub fn active_profiles<'a>(
    raw: &'a RawPom,
    active_ids: &[String],
    inactive_ids: &[String],
    user_properties: &BTreeMap<String, String>,
) -> Vec<&'a Profile> {
    let is_inactive = |profile: &Profile| inactive_ids.iter().any(|id| id == &profile.id);

    let active: Vec<&Profile> = raw
        .profiles
        .iter()
        .filter(|profile| !is_inactive(profile))
        .filter(|profile| {
            active_ids.iter().any(|id| id == &profile.id)
                || (profile.activation.has_conditions()
                    && conditions_met(profile, raw.project_dir(), user_properties))
        })
        .collect();
    if !active.is_empty() {
        return active;
    }

    raw.profiles
        .iter()
        .filter(|profile| !is_inactive(profile) && profile.activation.active_by_default)
        .collect()
}

fn conditions_met(
    profile: &Profile,
    project_dir: &Path,
    user_properties: &BTreeMap<String, String>,
) -> bool {
    let activation = &profile.activation;

    if let Some(property) = &activation.property {
        let (negated, name) = match property.name.strip_prefix('!') {
            Some(name) => (true, name),
            None => (false, property.name.as_str()),
        };
        let actual = user_properties.get(name);
        let matched = match &property.value {
            None => actual.is_some() != negated,
            Some(expected) => match expected.strip_prefix('!') {
                Some(expected) => actual.map(String::as_str) != Some(expected),
                None => actual.map(String::as_str) == Some(expected.as_str()),
            },
        };
        if !matched {
            return false;
        }
    }

    let resolve = |path: &str| {
        let basedir = project_dir.to_string_lossy();
        let path = path
            .replace("${basedir}", &basedir)
            .replace("${project.basedir}", &basedir);
        project_dir.join(path)
    };
    if let Some(exists) = &activation.file_exists {
        if !resolve(exists).exists() {
            return false;
        }
    }
    if let Some(missing) = &activation.file_missing {
        if resolve(missing).exists() {
            return false;
        }
    }

    true
}

struct Interpolator<'a> {
    user: &'a BTreeMap<String, String>,
    model: &'a BTreeMap<String, String>,
}

impl Interpolator<'_> {
    fn lookup(&self, key: &str) -> Option<String> {
        if let Some(value) = self.user.get(key).or_else(|| self.model.get(key)) {
            return Some(value.clone());
        }
        key.strip_prefix("env.")
            .and_then(|name| std::env::var(name).ok())
    }

    fn interpolate(&self, text: &str) -> String {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("valid regex"));

        let mut current = text.to_string();
        for _ in 0..MAX_INTERPOLATION_DEPTH {
            if !current.contains("${") {
                break;
            }
            let next = re
                .replace_all(&current, |caps: &regex::Captures<'_>| {
                    self.lookup(&caps[1])
                        .unwrap_or_else(|| caps[0].to_string())
                })
                .into_owned();
            if next == current {
                break;
            }
            current = next;
        }
        current
    }
}
