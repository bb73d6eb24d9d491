//! Front ends obtain a [`Config`], confirm intent, and watch the install.
//!
//! They are looked up by name in a [`Registry`] built at startup.

mod auto;
mod prompt;

use std::{collections::BTreeMap, path::PathBuf};

use tracing::{debug, info};

use crate::{config::Config, error::FrontendError, progress::ProgressReceiver};

pub use auto::{load_config, Auto};
pub use prompt::Prompt;

pub trait Frontend {
    /// Produces the configuration for this run.
    fn config(&mut self) -> Result<Config, FrontendError>;

    /// Fails with [`FrontendError::Aborted`] if the operator declines.
    fn confirm(&mut self) -> Result<(), FrontendError>;

    /// Drains the progress channels until the installer signals completion.
    /// Returns the number of errors seen.
    fn show_progress(&mut self, progress: ProgressReceiver) -> usize;
}

/// Settings passed to every factory.
#[derive(Debug, Clone, Default)]
pub struct FrontendOptions {
    pub config_path: Option<PathBuf>,
    pub assume_yes: bool,
}

pub type Factory =
    Box<dyn Fn(&FrontendOptions) -> Result<Box<dyn Frontend>, FrontendError> + Send + Sync>;

/// Name → factory map. The first registration of a name wins.
#[derive(Default)]
pub struct Registry {
    factories: BTreeMap<String, Factory>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the front ends shipped with the installer.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("prompt", |_| Ok(Box::new(Prompt::new()) as Box<dyn Frontend>));
        registry.register("auto", |opts| Ok(Box::new(Auto::new(opts)) as Box<dyn Frontend>));
        registry
    }

    /// Returns `false`, changing nothing, when `name` is already taken.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> bool
    where
        F: Fn(&FrontendOptions) -> Result<Box<dyn Frontend>, FrontendError> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.contains_key(&name) {
            debug!(frontend = %name, "already registered, ignoring");
            return false;
        }
        self.factories.insert(name, Box::new(factory));
        true
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Picks the requested front end, or the only one if none was requested.
    pub fn resolve(
        &self,
        requested: Option<&str>,
        options: &FrontendOptions,
    ) -> Result<Box<dyn Frontend>, FrontendError> {
        match requested.filter(|name| !name.is_empty()) {
            Some(name) => {
                let factory = self
                    .factories
                    .get(name)
                    .ok_or_else(|| FrontendError::Unknown(name.to_string()))?;
                info!(frontend = name, "using explicitly specified frontend");
                factory(options)
            }
            None if self.factories.len() == 1 => {
                let (name, factory) = self
                    .factories
                    .iter()
                    .next()
                    .ok_or_else(|| FrontendError::Ambiguous(Vec::new()))?;
                info!(frontend = %name, "no frontend specified, using the only one");
                factory(options)
            }
            None => Err(FrontendError::Ambiguous(
                self.names().into_iter().map(String::from).collect(),
            )),
        }
    }
}
