use std::fs;

use tracing::info;

use super::StageContext;
use crate::{error::InstallerError, runner::CommandLine};

/// Package database directory inside the target.
const PACKAGE_DB: &str = "var/db/xbps";

/// Seeds the target's package database with the repository keys.
/// Skipped when the target already has a package database.
pub(super) fn restore_keys(ctx: &StageContext<'_>) -> Result<(), InstallerError> {
    let db = ctx.path(PACKAGE_DB);
    if db.exists() {
        info!(db = %db.display(), "package database present, keeping its keys");
        return Ok(());
    }

    ctx.say("Installing keys");
    fs::create_dir_all(&db).map_err(|e| InstallerError::fs(&db, e))?;
    ctx.assets.restore(&db.join("keys"))
}

fn xbps_install(ctx: &StageContext<'_>, packages: &[String]) -> CommandLine {
    CommandLine::new("xbps-install")
        .args(["-y", "-S", "-i"])
        .arg("-R")
        .arg(ctx.meta.mirror.as_str())
        .arg("-M")
        .arg("-r")
        .arg(ctx.root())
        .args(packages.iter().map(String::as_str))
}

pub(super) fn install_base(ctx: &StageContext<'_>) -> Result<(), InstallerError> {
    ctx.say(format!("Installing {}", ctx.meta.packages.join(" ")));
    ctx.run(&xbps_install(ctx, &ctx.meta.packages))?;
    ctx.say("  Packages installed");
    Ok(())
}
