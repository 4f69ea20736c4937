use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("failed to locate project pom.xml for {path}")]
    DescriptorNotFound { path: PathBuf },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse XML in {path}: {source}")]
    Xml {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },

    #[error("{path} is not a Maven project descriptor: {message}")]
    InvalidPom { path: PathBuf, message: String },

    #[error("parent chain of {path} forms a cycle: {}", format_chain(.chain))]
    AncestorCycle { path: PathBuf, chain: Vec<PathBuf> },

    #[error("failed to resolve the effective model for {path}: {source}")]
    ModelBuild {
        path: PathBuf,
        #[source]
        source: ModelBuildError,
    },

    #[error("invalid configuration in {path}: {message}")]
    Config { path: PathBuf, message: String },
}

impl WorkspaceError {
    /// Whether this error means "there is no descriptor at that location".
    ///
    /// The loader treats this as "not a workspace member" for discovered parents and modules.
    pub fn is_not_found(&self) -> bool {
        match self {
            WorkspaceError::DescriptorNotFound { .. } => true,
            WorkspaceError::Io { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// Whether the descriptor exists but could not be parsed.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            WorkspaceError::Xml { .. } | WorkspaceError::InvalidPom { .. }
        )
    }

    /// The message without the path prefix.
    pub(crate) fn detail(&self) -> String {
        match self {
            WorkspaceError::Xml { source, .. } => source.to_string(),
            WorkspaceError::InvalidPom { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

fn format_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Failure reported by an [`crate::EffectiveModelBuilder`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelBuildError {
    #[error("missing {field}")]
    MissingCoordinate { field: &'static str },

    #[error("version `{version}` contains an unresolved expression")]
    UnresolvedVersion { version: String },

    #[error("{0}")]
    Other(String),
}
