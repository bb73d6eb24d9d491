use std::{
    fs,
    path::{Path, PathBuf},
};

use dialoguer::Confirm;
use tracing::info;

use super::{Frontend, FrontendOptions};
use crate::{
    config::{Config, User},
    error::FrontendError,
    progress::ProgressReceiver,
    ui,
};

/// Unattended front end: the configuration comes from a TOML file, or from
/// built-in defaults when no file is given.
#[derive(Debug, Default)]
pub struct Auto {
    path: Option<PathBuf>,
    assume_yes: bool,
    config: Option<Config>,
}

impl Auto {
    pub fn new(options: &FrontendOptions) -> Self {
        Self {
            path: options.config_path.clone(),
            assume_yes: options.assume_yes,
            config: None,
        }
    }

    fn defaults() -> Config {
        Config {
            timezone: "America/Los_Angeles".into(),
            locale: "en_US.UTF-8".into(),
            keyboard: "us".into(),
            hostname: "test".into(),
            root_password: "toor".into(),
            users: vec![User {
                username: "void".into(),
                gecos: "Void User".into(),
                password: "void".into(),
                groups: vec!["wheel".into()],
            }],
            ..Config::default()
        }
    }
}

/// Reads a [`Config`] from a TOML file.
pub fn load_config(path: &Path) -> Result<Config, FrontendError> {
    let text = fs::read_to_string(path).map_err(|source| FrontendError::ConfigFile {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| FrontendError::ConfigSyntax {
        path: path.to_path_buf(),
        source,
    })
}

impl Frontend for Auto {
    fn config(&mut self) -> Result<Config, FrontendError> {
        let config = match self.path {
            Some(ref path) => {
                info!(path = %path.display(), "loading configuration");
                load_config(path)?
            }
            None => Self::defaults(),
        };
        self.config = Some(config.clone());
        Ok(config)
    }

    fn confirm(&mut self) -> Result<(), FrontendError> {
        let Some(ref config) = self.config else {
            return Err(FrontendError::ConfigUnobtainable(
                "confirmation requested before configuration".into(),
            ));
        };

        println!("{}", config);
        println!();

        if self.assume_yes {
            ui::print_info("Proceeding without confirmation (--yes).");
            return Ok(());
        }

        if !Confirm::new()
            .with_prompt("Do you wish to proceed with installation?")
            .default(false)
            .interact()?
        {
            return Err(FrontendError::Aborted);
        }
        Ok(())
    }

    fn show_progress(&mut self, progress: ProgressReceiver) -> usize {
        ui::show_progress(progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_a_file() {
        let mut auto = Auto::new(&FrontendOptions::default());
        let config = auto.config().unwrap();
        assert_eq!(config.hostname, "test");
        assert_eq!(config.users[0].username, "void");
        assert_eq!(config.users[0].groups, ["wheel"]);
    }

    #[test]
    fn loads_the_given_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("install.toml");
        fs::write(
            &path,
            "hostname = \"void-test\"\n[[users]]\nusername = \"alice\"\ngroups = [\"wheel\"]\n",
        )
        .unwrap();

        let mut auto = Auto::new(&FrontendOptions {
            config_path: Some(path),
            assume_yes: true,
        });
        let config = auto.config().unwrap();
        assert_eq!(config.hostname, "void-test");
        assert_eq!(config.users[0].username, "alice");
        assert!(auto.confirm().is_ok());
    }

    #[test]
    fn bad_files_are_frontend_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = load_config(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(missing, FrontendError::ConfigFile { .. }));

        let path = dir.path().join("broken.toml");
        fs::write(&path, "hostname = [").unwrap();
        assert!(matches!(
            load_config(&path).unwrap_err(),
            FrontendError::ConfigSyntax { .. }
        ));
    }

    #[test]
    fn confirm_needs_a_config_first() {
        let mut auto = Auto::new(&FrontendOptions {
            config_path: None,
            assume_yes: true,
        });
        assert!(matches!(
            auto.confirm().unwrap_err(),
            FrontendError::ConfigUnobtainable(_)
        ));
    }
}
