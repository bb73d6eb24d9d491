use std::{fs, path::Path};

use tracing::{error, info, warn};

use crate::{
    assets::{Assets, KeyDirectory},
    config::{Config, Meta},
    error::InstallerError,
    mounts,
    progress::ProgressSender,
    runner::{Executor, SystemExecutor},
    stages::{self, StageContext},
    templates::{BuiltinTemplates, Templates},
};

/// How a run ended. Details of any failure went out on the error channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Aborted { stage: &'static str },
}

/// Puts a system on disk.
///
/// Owns the configuration for the whole run and never changes it.
pub struct Installer {
    config: Config,
    meta: Meta,
    executor: Box<dyn Executor>,
    templates: Box<dyn Templates>,
    assets: Box<dyn Assets>,
}

impl Installer {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            meta: Meta::default(),
            executor: Box::new(SystemExecutor),
            templates: Box::new(BuiltinTemplates::default()),
            assets: Box::new(KeyDirectory::default()),
        }
    }

    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = meta;
        self
    }

    pub fn with_executor(mut self, executor: impl Executor + 'static) -> Self {
        self.executor = Box::new(executor);
        self
    }

    pub fn with_templates(mut self, templates: impl Templates + 'static) -> Self {
        self.templates = Box::new(templates);
        self
    }

    pub fn with_assets(mut self, assets: impl Assets + 'static) -> Self {
        self.assets = Box::new(assets);
        self
    }

    /// Runs every stage against `target`.
    ///
    /// Blocks on the progress channels, so call it from a different thread
    /// than the one draining them. The completion signal fires and all
    /// channels close before this returns, whatever the outcome.
    pub fn install(self, target: impl AsRef<Path>, progress: ProgressSender) -> Outcome {
        let outcome = self.run(target.as_ref(), &progress);
        match outcome {
            Outcome::Completed => {
                info!("System installed");
                progress.say("System installed");
            }
            Outcome::Aborted { stage } => warn!(stage, "installation aborted"),
        }
        progress.finish();
        outcome
    }

    fn run(&self, target: &Path, progress: &ProgressSender) -> Outcome {
        let target = match std::path::absolute(target) {
            Ok(t) => t,
            Err(e) => {
                error!(error = %e, "couldn't determine target path");
                progress.report(InstallerError::fs(target, e));
                return Outcome::Aborted { stage: "resolve-target" };
            }
        };
        info!(target = %target.display(), "starting installation");

        // Nothing may be mounted under a target that isn't a directory.
        if let Err(e) = verify_target_dir(&target) {
            error!(error = %e, "target is unusable");
            progress.report(e);
            return Outcome::Aborted { stage: "verify-target" };
        }

        progress.say("Mounting special filesystems");
        // Unmounts when it goes out of scope, on every path below.
        let _specials = match mounts::mount_specials(&target, self.executor.as_ref(), progress) {
            Ok(specials) => specials,
            Err(e) => {
                error!(error = %e, "could not mount special filesystems");
                progress.report(e);
                return Outcome::Aborted { stage: "mount-specials" };
            }
        };

        let ctx = StageContext {
            target: &target,
            config: &self.config,
            meta: &self.meta,
            executor: self.executor.as_ref(),
            templates: self.templates.as_ref(),
            assets: self.assets.as_ref(),
            progress,
        };

        for stage in stages::pipeline(&self.meta) {
            info!(stage = stage.name, "running stage");
            let Err(err) = (stage.run)(&ctx) else {
                continue;
            };

            if stage.policy.tolerates(&err) {
                warn!(stage = stage.name, error = %err, "ignoring failure");
                progress.report(err);
                continue;
            }

            error!(stage = stage.name, error = %err, "stage failed");
            progress.report(err);
            return Outcome::Aborted { stage: stage.name };
        }

        progress.say("Unmounting special filesystems");
        Outcome::Completed
    }
}

fn verify_target_dir(target: &Path) -> Result<(), InstallerError> {
    let meta = fs::metadata(target).map_err(|e| InstallerError::fs(target, e))?;
    if !meta.is_dir() {
        return Err(InstallerError::NotADirectory(target.to_path_buf()));
    }
    Ok(())
}
