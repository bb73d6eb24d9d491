//! Void Linux installer.
//!
//! A front end produces a [`Config`]; the [`Installer`] applies it to a
//! mounted target root while reporting over the [`progress`] channels.

pub mod assets;
pub mod config;
pub mod error;
pub mod frontend;
pub mod installer;
mod mounts;
pub mod progress;
pub mod runner;
pub mod stages;
pub mod sysinfo;
pub mod templates;
pub mod ui;

pub use config::{Bootloader, Config, Filesystem, Meta, User};
pub use error::{ErrorKind, FrontendError, InstallerError, TemplateError};
pub use installer::{Installer, Outcome};
