use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::WorkspaceError;
use crate::model::{Activation, Dependency, ParentRef, Profile, PropertyActivation, RawPom};

pub const POM_XML: &str = "pom.xml";

/// Source of raw POMs.
///
/// The loader only talks to this trait, so callers can serve models from memory (e.g. an editor's
/// unsaved buffers) instead of the filesystem.
pub trait PomReader {
    /// Reads and parses `pom_file`.
    ///
    /// A missing file must be reported with an error for which
    /// [`WorkspaceError::is_not_found`] returns `true`.
    fn read(&self, pom_file: &Path) -> Result<RawPom, WorkspaceError>;
}

/// Reads POMs from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsPomReader;

impl PomReader for FsPomReader {
    fn read(&self, pom_file: &Path) -> Result<RawPom, WorkspaceError> {
        let contents = std::fs::read_to_string(pom_file).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                WorkspaceError::DescriptorNotFound {
                    path: pom_file.to_path_buf(),
                }
            } else {
                WorkspaceError::Io {
                    path: pom_file.to_path_buf(),
                    source,
                }
            }
        })?;
        parse_pom_str(pom_file, &contents)
    }
}

impl<R: PomReader + ?Sized> PomReader for &R {
    fn read(&self, pom_file: &Path) -> Result<RawPom, WorkspaceError> {
        (**self).read(pom_file)
    }
}

/// Searches `path` and its ancestors for a `pom.xml`.
pub fn locate_project_pom(path: &Path) -> Option<PathBuf> {
    path.ancestors()
        .map(|dir| dir.join(POM_XML))
        .find(|pom| pom.is_file())
}

/// Parses POM text; `pom_file` is recorded on the model and used for error context.
pub fn parse_pom_str(pom_file: &Path, contents: &str) -> Result<RawPom, WorkspaceError> {
    let doc = roxmltree::Document::parse(contents).map_err(|source| WorkspaceError::Xml {
        path: pom_file.to_path_buf(),
        source,
    })?;

    let project = doc.root_element();
    if project.tag_name().name() != "project" {
        return Err(WorkspaceError::InvalidPom {
            path: pom_file.to_path_buf(),
            message: format!(
                "expected root element <project>, found <{}>",
                project.tag_name().name()
            ),
        });
    }

    let mut pom = RawPom {
        pom_file: pom_file.to_path_buf(),
        group_id: child_text(&project, "groupId"),
        artifact_id: child_text(&project, "artifactId"),
        version: child_text(&project, "version"),
        packaging: child_text(&project, "packaging"),
        ..RawPom::default()
    };

    if let Some(parent_node) = child_element(&project, "parent") {
        pom.parent = Some(ParentRef {
            group_id: child_text(&parent_node, "groupId"),
            artifact_id: child_text(&parent_node, "artifactId"),
            version: child_text(&parent_node, "version"),
            relative_path: child_text(&parent_node, "relativePath"),
        });
    }

    pom.properties = parse_properties(&project);
    pom.modules = parse_modules(&project);
    pom.dependencies = parse_dependencies_of(&project);
    pom.dependency_management = parse_dependency_management(&project);

    if let Some(profiles_node) = child_element(&project, "profiles") {
        pom.profiles = profiles_node
            .children()
            .filter(|n| n.is_element() && n.has_tag_name("profile"))
            .filter_map(|n| parse_profile(&n))
            .collect();
    }

    Ok(pom)
}

fn parse_profile(node: &roxmltree::Node<'_, '_>) -> Option<Profile> {
    // Maven rejects profiles without an id; we just ignore them.
    let id = child_text(node, "id")?;

    let mut activation = Activation::default();
    if let Some(activation_node) = child_element(node, "activation") {
        activation.active_by_default = child_text(&activation_node, "activeByDefault")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));

        if let Some(property_node) = child_element(&activation_node, "property") {
            if let Some(name) = child_text(&property_node, "name") {
                activation.property = Some(PropertyActivation {
                    name,
                    value: child_text(&property_node, "value"),
                });
            }
        }

        if let Some(file_node) = child_element(&activation_node, "file") {
            activation.file_exists = child_text(&file_node, "exists");
            activation.file_missing = child_text(&file_node, "missing");
        }
    }

    Some(Profile {
        id,
        activation,
        properties: parse_properties(node),
        modules: parse_modules(node),
        dependencies: parse_dependencies_of(node),
        dependency_management: parse_dependency_management(node),
    })
}

fn parse_properties(node: &roxmltree::Node<'_, '_>) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    if let Some(props_node) = child_element(node, "properties") {
        for child in props_node.children().filter(|n| n.is_element()) {
            let key = child.tag_name().name().to_string();
            // Empty properties are legal (`<skipTests/>`) and still defined.
            let value = child.text().map(str::trim).unwrap_or_default();
            out.insert(key, value.to_string());
        }
    }
    out
}

fn parse_modules(node: &roxmltree::Node<'_, '_>) -> Vec<String> {
    let Some(modules_node) = child_element(node, "modules") else {
        return Vec::new();
    };
    modules_node
        .children()
        .filter(|n| n.is_element() && n.has_tag_name("module"))
        .filter_map(|n| n.text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn parse_dependencies_of(node: &roxmltree::Node<'_, '_>) -> Vec<Dependency> {
    child_element(node, "dependencies")
        .map(|deps| parse_dependencies(&deps))
        .unwrap_or_default()
}

fn parse_dependency_management(node: &roxmltree::Node<'_, '_>) -> Vec<Dependency> {
    child_element(node, "dependencyManagement")
        .and_then(|mgmt| child_element(&mgmt, "dependencies"))
        .map(|deps| parse_dependencies(&deps))
        .unwrap_or_default()
}

fn parse_dependencies(deps_node: &roxmltree::Node<'_, '_>) -> Vec<Dependency> {
    deps_node
        .children()
        .filter(|n| n.is_element() && n.has_tag_name("dependency"))
        .filter_map(|dep_node| {
            let group_id = child_text(&dep_node, "groupId")?;
            let artifact_id = child_text(&dep_node, "artifactId")?;

            Some(Dependency {
                group_id,
                artifact_id,
                version: child_text(&dep_node, "version"),
                scope: child_text(&dep_node, "scope"),
                classifier: child_text(&dep_node, "classifier"),
                type_: child_text(&dep_node, "type"),
                optional: child_text(&dep_node, "optional")
                    .is_some_and(|v| v.eq_ignore_ascii_case("true")),
            })
        })
        .collect()
}

fn child_element<'a>(
    node: &roxmltree::Node<'a, 'a>,
    name: &str,
) -> Option<roxmltree::Node<'a, 'a>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

fn child_text(node: &roxmltree::Node<'_, '_>, name: &str) -> Option<String> {
    child_element(node, name)
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
