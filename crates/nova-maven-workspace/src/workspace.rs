use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::model::{ArtifactKey, EffectivePom, RawPom};

/// Index of a [`ProjectNode`] inside its [`Workspace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ProjectId(u32);

impl ProjectId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A project of the loaded workspace.
#[derive(Debug, Clone)]
pub struct ProjectNode {
    id: ProjectId,
    dir: PathBuf,
    raw: Arc<RawPom>,
    effective: Option<Arc<EffectivePom>>,
    modules: Vec<ProjectId>,
    parent: Option<ProjectId>,
}

impl ProjectNode {
    pub fn id(&self) -> ProjectId {
        self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn pom_file(&self) -> &Path {
        &self.raw.pom_file
    }

    pub fn raw(&self) -> &Arc<RawPom> {
        &self.raw
    }

    pub fn effective(&self) -> Option<&Arc<EffectivePom>> {
        self.effective.as_ref()
    }

    /// Modules attached under this project, in resolution order.
    pub fn modules(&self) -> &[ProjectId] {
        &self.modules
    }

    /// The workspace project at this project's parent POM location, or else the project it was
    /// first attached under.
    pub fn parent(&self) -> Option<ProjectId> {
        self.parent
    }

    /// Declared modules: effective when built, raw otherwise.
    pub fn declared_modules(&self) -> &[String] {
        match &self.effective {
            Some(effective) => &effective.modules,
            None => &self.raw.modules,
        }
    }

    pub fn group_id(&self) -> Option<&str> {
        match &self.effective {
            Some(effective) => Some(&effective.group_id),
            None => self.raw.raw_group_id(),
        }
    }

    pub fn artifact_id(&self) -> Option<&str> {
        match &self.effective {
            Some(effective) => Some(&effective.artifact_id),
            None => self.raw.artifact_id.as_deref(),
        }
    }

    pub fn version(&self) -> Option<&str> {
        match &self.effective {
            Some(effective) => Some(&effective.version),
            None => self.raw.raw_version(),
        }
    }

    pub fn key(&self) -> Option<ArtifactKey> {
        Some(ArtifactKey::new(self.group_id()?, self.artifact_id()?))
    }
}

/// Lookups the effective-model builder uses to prefer workspace members over published
/// artifacts.
pub trait WorkspaceModelResolver {
    /// The raw model of the member `group:artifact`, if its raw version is exactly `version`.
    ///
    /// The raw version is compared uninterpolated, so a CI-friendly `${revision}` matches a
    /// `${revision}` constraint.
    fn resolve_raw_model(
        &self,
        group_id: &str,
        artifact_id: &str,
        version: &str,
    ) -> Option<Arc<RawPom>>;

    /// The effective model of the member `group:artifact`, if its resolved version is exactly
    /// `version`.
    fn resolve_effective_model(
        &self,
        group_id: &str,
        artifact_id: &str,
        version: &str,
    ) -> Option<Arc<EffectivePom>>;
}

/// Projects loaded in one session.
///
/// Owns every [`ProjectNode`]; edges between nodes are [`ProjectId`]s into this arena.
#[derive(Debug, Default)]
pub struct Workspace {
    nodes: Vec<ProjectNode>,
    by_dir: HashMap<PathBuf, ProjectId>,
    by_key: HashMap<ArtifactKey, ProjectId>,
    current: Option<ProjectId>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a project and registers its coordinates.
    ///
    /// Coordinates already taken by an earlier project stay with that project. Registering a
    /// directory twice returns the existing id.
    pub fn register_project(
        &mut self,
        raw: Arc<RawPom>,
        effective: Option<Arc<EffectivePom>>,
    ) -> ProjectId {
        let dir = raw.project_dir().to_path_buf();
        if let Some(&id) = self.by_dir.get(&dir) {
            return id;
        }

        let id = ProjectId(self.nodes.len() as u32);
        let node = ProjectNode {
            id,
            dir: dir.clone(),
            raw,
            effective,
            modules: Vec::new(),
            parent: None,
        };

        if let Some(key) = node.key() {
            if let Some(existing) = self.by_key.get(&key).copied() {
                tracing::debug!(
                    target = "nova.maven",
                    key = %key,
                    pom = %node.pom_file().display(),
                    existing = %self.nodes[existing.index()].pom_file().display(),
                    "coordinates already registered; keeping the first project"
                );
            } else {
                self.by_key.insert(key, id);
            }
        }

        self.by_dir.insert(dir, id);
        self.nodes.push(node);
        id
    }

    /// Appends `module` to `parent`'s modules. Returns `false` if the edge already existed.
    pub fn add_module(&mut self, parent: ProjectId, module: ProjectId) -> bool {
        if parent == module || self.nodes[parent.index()].modules.contains(&module) {
            return false;
        }
        self.nodes[parent.index()].modules.push(module);
        let child = &mut self.nodes[module.index()];
        if child.parent.is_none() {
            child.parent = Some(parent);
        }
        true
    }

    /// Points `module` back at `parent`, replacing any parent set by [`Workspace::add_module`].
    pub(crate) fn set_parent(&mut self, module: ProjectId, parent: ProjectId) {
        if module != parent {
            self.nodes[module.index()].parent = Some(parent);
        }
    }

    pub fn lookup(&self, group_id: &str, artifact_id: &str) -> Option<&ProjectNode> {
        let key = ArtifactKey::new(group_id, artifact_id);
        self.by_key.get(&key).map(|id| &self.nodes[id.index()])
    }

    pub fn set_current_project(&mut self, id: ProjectId) {
        self.current = Some(id);
    }

    pub fn current_project(&self) -> Option<&ProjectNode> {
        self.current.map(|id| &self.nodes[id.index()])
    }

    pub fn project(&self, id: ProjectId) -> &ProjectNode {
        &self.nodes[id.index()]
    }

    pub fn project_by_dir(&self, dir: &Path) -> Option<&ProjectNode> {
        self.by_dir.get(dir).map(|id| &self.nodes[id.index()])
    }

    pub(crate) fn id_by_dir(&self, dir: &Path) -> Option<ProjectId> {
        self.by_dir.get(dir).copied()
    }

    /// All projects in load order.
    pub fn projects(&self) -> impl Iterator<Item = &ProjectNode> + '_ {
        self.nodes.iter()
    }

    pub fn modules(&self, id: ProjectId) -> impl Iterator<Item = &ProjectNode> + '_ {
        self.nodes[id.index()]
            .modules
            .iter()
            .map(|module| &self.nodes[module.index()])
    }

    pub fn parent(&self, id: ProjectId) -> Option<&ProjectNode> {
        self.nodes[id.index()]
            .parent
            .map(|parent| &self.nodes[parent.index()])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Locates a workspace member's artifact on disk.
    ///
    /// `pom` resolves to the member's `pom.xml`; `jar` resolves to `target/classes` once the
    /// member has been compiled. Anything else, or a version mismatch, yields `None`.
    pub fn find_artifact(
        &self,
        group_id: &str,
        artifact_id: &str,
        version: &str,
        extension: &str,
    ) -> Option<PathBuf> {
        let node = self.lookup(group_id, artifact_id)?;
        if node.version() != Some(version) {
            return None;
        }
        match extension {
            "pom" => Some(node.pom_file().to_path_buf()),
            "jar" => {
                let classes = node.dir().join("target").join("classes");
                classes.is_dir().then_some(classes)
            }
            _ => None,
        }
    }

    /// Versions of `group:artifact` available in the workspace (at most one).
    pub fn find_versions(&self, group_id: &str, artifact_id: &str) -> Vec<String> {
        self.lookup(group_id, artifact_id)
            .and_then(ProjectNode::version)
            .map(|version| vec![version.to_string()])
            .unwrap_or_default()
    }

    /// Serializable outline of every project and its edges.
    pub fn summary(&self) -> WorkspaceSummary {
        let projects = self
            .nodes
            .iter()
            .map(|node| ProjectSummary {
                id: node.id,
                dir: node.dir.clone(),
                group_id: node.group_id().map(str::to_string),
                artifact_id: node.artifact_id().map(str::to_string),
                version: node.version().map(str::to_string),
                parent: node.parent,
                modules: node.modules.clone(),
            })
            .collect();
        WorkspaceSummary {
            current: self.current,
            projects,
        }
    }
}

impl WorkspaceModelResolver for Workspace {
    fn resolve_raw_model(
        &self,
        group_id: &str,
        artifact_id: &str,
        version: &str,
    ) -> Option<Arc<RawPom>> {
        let node = self.lookup(group_id, artifact_id)?;
        (node.raw.raw_version() == Some(version)).then(|| Arc::clone(&node.raw))
    }

    fn resolve_effective_model(
        &self,
        group_id: &str,
        artifact_id: &str,
        version: &str,
    ) -> Option<Arc<EffectivePom>> {
        let effective = self.lookup(group_id, artifact_id)?.effective.as_ref()?;
        (effective.version == version).then(|| Arc::clone(effective))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSummary {
    pub current: Option<ProjectId>,
    pub projects: Vec<ProjectSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: ProjectId,
    pub dir: PathBuf,
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub parent: Option<ProjectId>,
    pub modules: Vec<ProjectId>,
}
