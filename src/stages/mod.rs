//! The ordered provisioning stages run against the target root.
//!
//! Each stage is a descriptor; whether its failure stops the run is part of
//! the descriptor rather than of the code that runs it.

mod files;
mod packages;
mod services;
mod users;

use std::path::{Path, PathBuf};

use crate::{
    assets::Assets,
    config::{Config, Meta},
    error::{ErrorKind, InstallerError},
    progress::ProgressSender,
    runner::{CommandLine, Executor},
    templates::Templates,
};

/// What the installer does when a stage returns an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop the run.
    Abort,
    /// Keep going if the command ran but exited non-zero.
    /// Launch failures still stop the run.
    TolerateExitStatus,
}

impl FailurePolicy {
    pub fn tolerates(self, err: &InstallerError) -> bool {
        self == FailurePolicy::TolerateExitStatus && err.kind() == ErrorKind::Execution
    }
}

pub type StageFn = fn(&StageContext<'_>) -> Result<(), InstallerError>;

#[derive(Clone, Copy)]
pub struct Stage {
    pub name: &'static str,
    pub policy: FailurePolicy,
    pub run: StageFn,
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .finish()
    }
}

/// Everything a stage may touch.
pub struct StageContext<'a> {
    pub target: &'a Path,
    pub config: &'a Config,
    pub meta: &'a Meta,
    pub executor: &'a dyn Executor,
    pub templates: &'a dyn Templates,
    pub assets: &'a dyn Assets,
    pub progress: &'a ProgressSender,
}

impl StageContext<'_> {
    /// Joins a target-relative path under the target root.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.target.join(relative.trim_start_matches('/'))
    }

    pub fn root(&self) -> String {
        self.target.to_string_lossy().into_owned()
    }

    pub fn say(&self, line: impl Into<String>) {
        self.progress.say(line);
    }

    pub fn run(&self, command: &CommandLine) -> Result<(), InstallerError> {
        self.executor.execute(command, self.progress.output())
    }
}

/// The stages in the order they run.
pub fn pipeline(meta: &Meta) -> Vec<Stage> {
    let mut stages = vec![
        Stage {
            name: "package-keys",
            policy: FailurePolicy::Abort,
            run: packages::restore_keys,
        },
        // xbps-install exits non-zero in states that are not failures.
        Stage {
            name: "base-system",
            policy: FailurePolicy::TolerateExitStatus,
            run: packages::install_base,
        },
        Stage {
            name: "hostname",
            policy: FailurePolicy::Abort,
            run: files::configure_hostname,
        },
        Stage {
            name: "rc.conf",
            policy: FailurePolicy::Abort,
            run: files::configure_rc_conf,
        },
        Stage {
            name: "locale.conf",
            policy: FailurePolicy::Abort,
            run: files::configure_locale,
        },
        Stage {
            name: "fstab",
            policy: FailurePolicy::Abort,
            run: files::configure_fstab,
        },
        Stage {
            name: "users",
            policy: FailurePolicy::Abort,
            run: users::create_accounts,
        },
    ];

    if meta.enable_services {
        stages.push(Stage {
            name: "services",
            policy: FailurePolicy::Abort,
            run: services::enable,
        });
    }

    stages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_order_is_fixed() {
        let names: Vec<_> = pipeline(&Meta::default()).iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            ["package-keys", "base-system", "hostname", "rc.conf", "locale.conf", "fstab", "users"]
        );

        let meta = Meta {
            enable_services: true,
            ..Meta::default()
        };
        assert_eq!(pipeline(&meta).last().map(|s| s.name), Some("services"));
    }

    #[test]
    fn only_package_install_tolerates_exit_status() {
        let exit = InstallerError::Execution {
            command: "xbps-install".into(),
            code: 1,
        };
        let launch = InstallerError::CommandNotFound("xbps-install".into());

        for stage in pipeline(&Meta::default()) {
            let tolerant = stage.name == "base-system";
            assert_eq!(stage.policy.tolerates(&exit), tolerant, "{}", stage.name);
            assert!(!stage.policy.tolerates(&launch), "{}", stage.name);
        }
    }
}
