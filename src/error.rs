use std::{io, path::PathBuf};

use thiserror::Error;

/// Broad failure classes. Stage policies and front ends match on these
/// rather than on individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Launch,
    Execution,
    Filesystem,
    Template,
    Frontend,
    Assets,
    Config,
}

#[derive(Debug, Error)]
pub enum InstallerError {
    #[error("Command '{0}' not found — is it installed?")]
    CommandNotFound(String),

    #[error("Could not launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Command '{command}' failed with exit code {code}")]
    Execution { command: String, code: i32 },

    #[error("Lost track of '{program}' while waiting for it: {source}")]
    Interrupted {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Target {} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("Could not restore package keys into {}: {source}", .dir.display())]
    Assets {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Frontend(#[from] FrontendError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("This installer must be run as root (sudo)")]
    NotRoot,
}

impl InstallerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            InstallerError::CommandNotFound(_) | InstallerError::Launch { .. } => ErrorKind::Launch,
            InstallerError::Execution { .. } | InstallerError::Interrupted { .. } => {
                ErrorKind::Execution
            }
            InstallerError::Filesystem { .. } | InstallerError::NotADirectory(_) => {
                ErrorKind::Filesystem
            }
            InstallerError::Template(_) => ErrorKind::Template,
            InstallerError::Assets { .. } => ErrorKind::Assets,
            InstallerError::Frontend(_) => ErrorKind::Frontend,
            InstallerError::InvalidConfig(_) | InstallerError::NotRoot => ErrorKind::Config,
        }
    }

    pub(crate) fn fs(path: impl Into<PathBuf>, source: io::Error) -> Self {
        InstallerError::Filesystem {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template '{0}' does not exist")]
    NotFound(String),

    #[error("Template '{name}' failed to render: {reason}")]
    Render { name: String, reason: String },

    #[error("Value {value:?} cannot be written into '{name}'")]
    InvalidValue { name: String, value: String },

    #[error("Could not write rendered '{name}': {source}")]
    Write {
        name: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("Frontend '{0}' is not known")]
    Unknown(String),

    #[error("No frontend selected; choose one of: {}", .0.join(", "))]
    Ambiguous(Vec<String>),

    #[error("Configuration cannot be obtained: {0}")]
    ConfigUnobtainable(String),

    #[error("Could not read {}: {source}", .path.display())]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not parse {}: {source}", .path.display())]
    ConfigSyntax {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Installation cancelled by user")]
    Aborted,

    #[error("Prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_the_taxonomy() {
        let launch = InstallerError::CommandNotFound("xbps-install".into());
        assert_eq!(launch.kind(), ErrorKind::Launch);

        let exec = InstallerError::Execution {
            command: "useradd alice".into(),
            code: 9,
        };
        assert_eq!(exec.kind(), ErrorKind::Execution);
        assert_eq!(exec.to_string(), "Command 'useradd alice' failed with exit code 9");

        let missing = InstallerError::NotADirectory("/target".into());
        assert_eq!(missing.kind(), ErrorKind::Filesystem);

        let tmpl: InstallerError = TemplateError::NotFound("hosts".into()).into();
        assert_eq!(tmpl.kind(), ErrorKind::Template);

        let fe: InstallerError = FrontendError::Aborted.into();
        assert_eq!(fe.kind(), ErrorKind::Frontend);
    }

    #[test]
    fn ambiguous_lists_candidates() {
        let err = FrontendError::Ambiguous(vec!["auto".into(), "prompt".into()]);
        assert_eq!(
            err.to_string(),
            "No frontend selected; choose one of: auto, prompt"
        );
    }
}
