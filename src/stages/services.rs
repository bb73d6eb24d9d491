use std::{fs, os::unix::fs::symlink};

use tracing::debug;

use super::StageContext;
use crate::error::InstallerError;

const RUNSVDIR: &str = "etc/runit/runsvdir/default";
const SERVICE_DIR: &str = "/etc/sv";

/// Links each service into the default runlevel of the target.
pub(super) fn enable(ctx: &StageContext<'_>) -> Result<(), InstallerError> {
    ctx.say("Enabling Services");
    let runsvdir = ctx.path(RUNSVDIR);
    fs::create_dir_all(&runsvdir).map_err(|e| InstallerError::fs(&runsvdir, e))?;

    for service in &ctx.meta.services {
        let link = runsvdir.join(service);
        if link.symlink_metadata().is_ok() {
            debug!(service = %service, "already enabled");
            continue;
        }
        ctx.say(format!("  {}", service));
        symlink(format!("{}/{}", SERVICE_DIR, service), &link)
            .map_err(|e| InstallerError::fs(&link, e))?;
    }
    Ok(())
}
