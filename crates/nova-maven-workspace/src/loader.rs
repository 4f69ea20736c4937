use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::PomCache;
use crate::config::LoadOptions;
use crate::effective::{DefaultModelBuilder, EffectiveModelBuilder, ModelBuildingRequest};
use crate::error::WorkspaceError;
use crate::model::{EffectivePom, ParentRef, RawPom};
use crate::path::{absolutize, normalize, relativize};
use crate::pom::{locate_project_pom, FsPomReader, PomReader, POM_XML};
use crate::workspace::{ProjectId, Workspace, WorkspaceModelResolver};

/// Loads the workspace around `start` (a project directory, a file inside one, or a `pom.xml`).
pub fn load_workspace(
    start: impl AsRef<Path>,
    options: &LoadOptions,
) -> Result<Workspace, WorkspaceError> {
    WorkspaceLoader::new(start, options.clone()).load()
}

/// Whether a failure to read a POM aborts the load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Requirement {
    /// The start project, the workspace root, or a parent named by `<relativePath>`.
    Required,
    /// A parent found by convention (`../pom.xml`) or a declared module.
    Optional,
}

/// One load session.
///
/// Resolves the start project's parent chain and the modules of every project on it, building
/// effective models parent-first when enabled. Every cache lives on the loader and is dropped
/// with it; the resulting [`Workspace`] is handed back by [`WorkspaceLoader::load`].
pub struct WorkspaceLoader {
    start: PathBuf,
    options: LoadOptions,
    reader: Box<dyn PomReader>,
    builder: Box<dyn EffectiveModelBuilder>,
    raw_cache: PomCache,
    /// Directories whose POM was requested by the graph walk. The raw cache also serves parent
    /// lookups for effective models, which must not count as walked.
    walked: HashSet<PathBuf>,
    effective_cache: HashMap<PathBuf, Arc<EffectivePom>>,
    /// POMs whose effective model is being built, outermost first.
    building: Vec<PathBuf>,
    workspace: Workspace,
}

impl WorkspaceLoader {
    pub fn new(start: impl AsRef<Path>, options: LoadOptions) -> Self {
        Self {
            start: start.as_ref().to_path_buf(),
            options,
            reader: Box::new(FsPomReader),
            builder: Box::new(DefaultModelBuilder),
            raw_cache: PomCache::new(),
            walked: HashSet::new(),
            effective_cache: HashMap::new(),
            building: Vec::new(),
            workspace: Workspace::new(),
        }
    }

    pub fn with_reader(mut self, reader: impl PomReader + 'static) -> Self {
        self.reader = Box::new(reader);
        self
    }

    pub fn with_model_builder(mut self, builder: impl EffectiveModelBuilder + 'static) -> Self {
        self.builder = Box::new(builder);
        self
    }

    pub fn load(mut self) -> Result<Workspace, WorkspaceError> {
        let current_pom = self.locate_current_pom()?;

        if let Some(root) = self.options.workspace_root.clone() {
            let root = absolutize(&root);
            let root_pom = if root.is_dir() { root.join(POM_XML) } else { root };
            tracing::debug!(
                target = "nova.maven",
                pom = %root_pom.display(),
                "loading workspace root"
            );
            self.resolve_project(&root_pom, None, Requirement::Required)?;
        }

        let current_dir = project_dir(&current_pom).to_path_buf();
        let current = match self.workspace.id_by_dir(&current_dir) {
            Some(id) => id,
            None => self
                .resolve_project(&current_pom, None, Requirement::Required)?
                .ok_or_else(|| WorkspaceError::DescriptorNotFound {
                    path: current_pom.clone(),
                })?,
        };
        self.workspace.set_current_project(current);
        self.link_parents();

        tracing::debug!(
            target = "nova.maven",
            pom = %current_pom.display(),
            projects = self.workspace.len(),
            "loaded maven workspace"
        );
        Ok(self.workspace)
    }

    /// Points every node at the node living at its parent POM location, when that was loaded.
    fn link_parents(&mut self) {
        let links: Vec<_> = self
            .workspace
            .projects()
            .filter_map(|node| {
                let (parent_pom, _) = parent_pom(node.raw())?;
                let parent = self.workspace.id_by_dir(project_dir(&parent_pom))?;
                Some((node.id(), parent))
            })
            .collect();
        for (module, parent) in links {
            self.workspace.set_parent(module, parent);
        }
    }

    fn locate_current_pom(&mut self) -> Result<PathBuf, WorkspaceError> {
        let start = absolutize(&self.start);
        if start.is_file() && self.is_pom(&start) {
            return Ok(start);
        }
        locate_project_pom(&start).ok_or(WorkspaceError::DescriptorNotFound { path: start })
    }

    /// Whether `file` parses as a POM; a successful parse is kept for the walk.
    fn is_pom(&mut self, file: &Path) -> bool {
        let dir = project_dir(file).to_path_buf();
        if self.raw_cache.get(&dir).is_some() {
            self.walked.insert(dir);
            return true;
        }
        match self.reader.read(file) {
            Ok(raw) => {
                self.raw_cache.put(dir.clone(), Arc::new(raw));
                self.walked.insert(dir);
                true
            }
            Err(_) => false,
        }
    }

    fn resolve_project(
        &mut self,
        pom_file: &Path,
        skip_module: Option<&str>,
        requirement: Requirement,
    ) -> Result<Option<ProjectId>, WorkspaceError> {
        let Some(raw) = self.walk_raw(pom_file, requirement)? else {
            return Ok(None);
        };

        let mut parent = None;
        if let Some((parent_pom, parent_requirement)) = parent_pom(&raw) {
            let parent_dir = project_dir(&parent_pom).to_path_buf();
            if !self.walked.contains(&parent_dir) {
                let skip = relativize(&parent_dir, raw.project_dir());
                parent = self.resolve_project(&parent_pom, Some(&skip), parent_requirement)?;
            }
        }

        let Some(id) = self.project(pom_file)? else {
            return Ok(None);
        };
        if let Some(parent) = parent {
            self.workspace.add_module(parent, id);
        }
        self.load_modules(id, skip_module)?;
        Ok(Some(id))
    }

    fn load_modules(
        &mut self,
        id: ProjectId,
        skip_module: Option<&str>,
    ) -> Result<(), WorkspaceError> {
        let node = self.workspace.project(id);
        let dir = node.dir().to_path_buf();
        let modules = node.declared_modules().to_vec();

        for module in modules {
            // Compared as declared: `./core` does not match a skip of `core`.
            if skip_module == Some(module.as_str()) {
                tracing::trace!(
                    target = "nova.maven",
                    module,
                    "skipping module that is being resolved"
                );
                continue;
            }

            let module_pom = normalize(&dir.join(&module).join(POM_XML));
            let Some(child) = self.project(&module_pom)? else {
                continue;
            };
            if self.workspace.add_module(id, child) {
                self.load_modules(child, None)?;
            }
        }
        Ok(())
    }

    /// The node for `pom_file`, creating it on first use.
    fn project(&mut self, pom_file: &Path) -> Result<Option<ProjectId>, WorkspaceError> {
        if let Some(id) = self.workspace.id_by_dir(project_dir(pom_file)) {
            return Ok(Some(id));
        }

        let Some(raw) = self.walk_raw(pom_file, Requirement::Optional)? else {
            return Ok(None);
        };
        let effective = if self.options.effective_model {
            Some(self.effective_model(&raw)?)
        } else {
            None
        };

        let id = self.workspace.register_project(raw, effective);
        tracing::trace!(
            target = "nova.maven",
            pom = %pom_file.display(),
            ?id,
            "registered project"
        );
        Ok(Some(id))
    }

    fn walk_raw(
        &mut self,
        pom_file: &Path,
        requirement: Requirement,
    ) -> Result<Option<Arc<RawPom>>, WorkspaceError> {
        self.walked.insert(project_dir(pom_file).to_path_buf());
        self.raw_pom(pom_file, requirement)
    }

    fn raw_pom(
        &mut self,
        pom_file: &Path,
        requirement: Requirement,
    ) -> Result<Option<Arc<RawPom>>, WorkspaceError> {
        let dir = project_dir(pom_file);
        if self.raw_cache.contains(dir) {
            if requirement == Requirement::Required {
                if self.raw_cache.is_missing(dir) {
                    return Err(WorkspaceError::DescriptorNotFound {
                        path: pom_file.to_path_buf(),
                    });
                }
                if let Some(message) = self.raw_cache.unparsable(dir) {
                    return Err(WorkspaceError::InvalidPom {
                        path: pom_file.to_path_buf(),
                        message: message.to_string(),
                    });
                }
            }
            return Ok(self.raw_cache.get(dir));
        }

        match self.reader.read(pom_file) {
            Ok(raw) => {
                let raw = Arc::new(raw);
                self.raw_cache.put(dir, Arc::clone(&raw));
                Ok(Some(raw))
            }
            Err(err) if err.is_not_found() => {
                self.raw_cache.put_missing(dir);
                if requirement == Requirement::Required {
                    return Err(WorkspaceError::DescriptorNotFound {
                        path: pom_file.to_path_buf(),
                    });
                }
                // Some projects are built by Maven extensions without a pom.xml (e.g. Tycho).
                tracing::warn!(
                    target = "nova.maven",
                    dir = %dir.display(),
                    pom = %pom_file.display(),
                    "module(s) will be handled as thirdparty dependencies because the pom.xml does not exist"
                );
                Ok(None)
            }
            Err(err) if err.is_parse_error() && requirement == Requirement::Optional => {
                tracing::warn!(
                    target = "nova.maven",
                    pom = %pom_file.display(),
                    error = %err,
                    "ignoring unparsable pom.xml"
                );
                self.raw_cache.put_unparsable(dir, err.detail());
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn effective_model(&mut self, raw: &Arc<RawPom>) -> Result<Arc<EffectivePom>, WorkspaceError> {
        let dir = raw.project_dir();
        if let Some(effective) = self.effective_cache.get(dir) {
            return Ok(Arc::clone(effective));
        }

        if let Some(start) = self.building.iter().position(|p| p == &raw.pom_file) {
            let mut chain = self.building[start..].to_vec();
            chain.push(raw.pom_file.clone());
            return Err(WorkspaceError::AncestorCycle {
                path: raw.pom_file.clone(),
                chain,
            });
        }

        self.building.push(raw.pom_file.clone());
        let built = self.build_effective(raw);
        self.building.pop();

        let effective = Arc::new(built?);
        self.effective_cache
            .insert(dir.to_path_buf(), Arc::clone(&effective));
        Ok(effective)
    }

    fn build_effective(&mut self, raw: &Arc<RawPom>) -> Result<EffectivePom, WorkspaceError> {
        let parent = self.inherited_parent(raw)?;
        let request = ModelBuildingRequest {
            raw: raw.as_ref(),
            parent: parent.as_deref(),
            active_profiles: &self.options.active_profiles,
            inactive_profiles: &self.options.inactive_profiles,
            user_properties: &self.options.user_properties,
            workspace: &self.workspace,
        };
        self.builder
            .build(&request)
            .map_err(|source| WorkspaceError::ModelBuild {
                path: raw.pom_file.clone(),
                source,
            })
    }

    /// Effective model of the parent `raw` inherits from: the local POM at `<relativePath>` (or
    /// `../pom.xml`) if its coordinates match, else a workspace member with the declared
    /// coordinates and version. `None` for external or absent parents.
    fn inherited_parent(
        &mut self,
        raw: &RawPom,
    ) -> Result<Option<Arc<EffectivePom>>, WorkspaceError> {
        let Some(parent_ref) = raw.parent.as_ref() else {
            return Ok(None);
        };

        if let Some((parent_pom, requirement)) = parent_pom(raw) {
            if let Some(parent_raw) = self.raw_pom(&parent_pom, requirement)? {
                if is_declared_parent(parent_ref, &parent_raw) {
                    return self.effective_model(&parent_raw).map(Some);
                }
            }
        }

        if let (Some(group_id), Some(artifact_id), Some(version)) = (
            parent_ref.group_id.as_deref(),
            parent_ref.artifact_id.as_deref(),
            parent_ref.version.as_deref(),
        ) {
            if let Some(effective) =
                self.workspace
                    .resolve_effective_model(group_id, artifact_id, version)
            {
                return Ok(Some(effective));
            }
        }

        tracing::debug!(
            target = "nova.maven",
            pom = %raw.pom_file.display(),
            parent = ?parent_ref,
            "parent is not part of the workspace"
        );
        Ok(None)
    }
}

fn project_dir(pom_file: &Path) -> &Path {
    pom_file.parent().unwrap_or_else(|| Path::new(""))
}

/// Where `raw`'s parent POM lives on disk, if anywhere.
///
/// An explicit `<relativePath>` is resolved against the project directory (a directory target
/// means its `pom.xml`); otherwise the enclosing directory's `pom.xml` is tried.
fn parent_pom(raw: &RawPom) -> Option<(PathBuf, Requirement)> {
    let project_dir = raw.project_dir();
    let relative_path = raw
        .parent
        .as_ref()
        .and_then(|parent| parent.relative_path.as_deref());

    let (candidate, requirement) = match relative_path {
        Some(relative_path) => {
            let path = normalize(&project_dir.join(relative_path));
            let path = if path.is_dir() {
                path.join(POM_XML)
            } else {
                path
            };
            (path, Requirement::Required)
        }
        None => (
            project_dir.parent()?.join(POM_XML),
            Requirement::Optional,
        ),
    };

    candidate.exists().then_some((candidate, requirement))
}

fn is_declared_parent(parent_ref: &ParentRef, candidate: &RawPom) -> bool {
    let artifact_matches = match (parent_ref.artifact_id.as_deref(), candidate.artifact_id.as_deref()) {
        (Some(expected), Some(actual)) => expected == actual,
        _ => true,
    };
    let group_matches = match (parent_ref.group_id.as_deref(), candidate.raw_group_id()) {
        (Some(expected), Some(actual)) => expected == actual,
        _ => true,
    };
    artifact_matches && group_matches
}
