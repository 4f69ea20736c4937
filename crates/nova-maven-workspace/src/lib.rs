//! Maven workspace discovery for Nova.
//!
//! Given a path inside a Maven project, this crate loads the connected local workspace:
//! - the project owning the path, its parent chain and every module reachable from it
//! - optionally an explicit workspace root, loaded first
//! - optionally each project's effective model (inheritance, profiles, interpolation)
//!
//! The result is a [`Workspace`] that answers lookups by `groupId:artifactId` and can stand in
//! for a repository when resolving parents and BOM imports that live in the workspace.

mod cache;
mod config;
mod effective;
mod error;
mod loader;
mod model;
mod path;
mod pom;
mod workspace;

pub use cache::PomCache;
pub use config::{
    discover_config_path, init_tracing, load_for_workspace, LoadOptions, LoggingConfig,
    MavenCliOptions, MavenConfig, WorkspaceConfig, NOVA_CONFIG_ENV_VAR,
};
pub use effective::{
    active_profiles, DefaultModelBuilder, EffectiveModelBuilder, ModelBuildingRequest,
};
pub use error::{ModelBuildError, WorkspaceError};
pub use loader::{load_workspace, WorkspaceLoader};
pub use model::*;
pub use pom::{locate_project_pom, parse_pom_str, FsPomReader, PomReader, POM_XML};
pub use workspace::{
    ProjectId, ProjectNode, ProjectSummary, Workspace, WorkspaceModelResolver, WorkspaceSummary,
};
