use std::{
    fs::{self, Permissions},
    io::{BufWriter, Write},
    os::unix::fs::PermissionsExt,
    path::Path,
};

use tempfile::NamedTempFile;
use tracing::info;

use super::StageContext;
use crate::{error::InstallerError, templates::TemplateData};

/// Writes `path` through a temporary file in the same directory, so the
/// destination either keeps its old contents or holds the complete new ones.
pub(crate) fn write_atomic(
    path: &Path,
    fill: impl FnOnce(&mut dyn Write) -> Result<(), InstallerError>,
) -> Result<(), InstallerError> {
    let dir = path
        .parent()
        .ok_or_else(|| InstallerError::NotADirectory(path.to_path_buf()))?;
    fs::create_dir_all(dir).map_err(|e| InstallerError::fs(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| InstallerError::fs(dir, e))?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        fill(&mut writer)?;
        writer.flush().map_err(|e| InstallerError::fs(path, e))?;
    }
    tmp.as_file()
        .sync_all()
        .map_err(|e| InstallerError::fs(path, e))?;
    fs::set_permissions(tmp.path(), Permissions::from_mode(0o644))
        .map_err(|e| InstallerError::fs(path, e))?;
    tmp.persist(path)
        .map_err(|e| InstallerError::fs(path, e.error))?;
    Ok(())
}

fn render_to(
    ctx: &StageContext<'_>,
    relative: &str,
    template: &str,
    data: TemplateData<'_>,
) -> Result<(), InstallerError> {
    info!(file = relative, "configuring");
    write_atomic(&ctx.path(relative), |out| {
        ctx.templates.render(template, data, out)?;
        Ok(())
    })
}

pub(super) fn configure_hostname(ctx: &StageContext<'_>) -> Result<(), InstallerError> {
    let hostname = ctx.config.hostname.trim();
    let short = hostname.split('.').next().unwrap_or_default();
    if short.is_empty() {
        return Err(InstallerError::InvalidConfig("hostname is empty".into()));
    }

    ctx.say("Configuring network names");
    ctx.say("  Configuring /etc/hosts");
    render_to(ctx, "etc/hosts", "hosts", TemplateData::Text(hostname))?;
    ctx.say("    /etc/hosts has been configured");

    ctx.say("  Configuring /etc/hostname");
    write_atomic(&ctx.path("etc/hostname"), |out| {
        writeln!(out, "{}", short).map_err(|e| InstallerError::fs(ctx.path("etc/hostname"), e))
    })?;
    ctx.say("    /etc/hostname has been configured");
    Ok(())
}

pub(super) fn configure_rc_conf(ctx: &StageContext<'_>) -> Result<(), InstallerError> {
    ctx.say("Configuring /etc/rc.conf");
    render_to(
        ctx,
        "etc/rc.conf",
        "rc.conf",
        TemplateData::Clock {
            timezone: &ctx.config.timezone,
            keyboard: &ctx.config.keyboard,
        },
    )?;
    ctx.say("  /etc/rc.conf has been configured");
    Ok(())
}

pub(super) fn configure_locale(ctx: &StageContext<'_>) -> Result<(), InstallerError> {
    ctx.say("Configuring /etc/locale.conf");
    render_to(
        ctx,
        "etc/locale.conf",
        "locale.conf",
        TemplateData::Text(&ctx.config.locale),
    )?;
    ctx.say("  /etc/locale.conf has been configured");
    Ok(())
}

pub(super) fn configure_fstab(ctx: &StageContext<'_>) -> Result<(), InstallerError> {
    ctx.say("Configuring /etc/fstab");
    render_to(
        ctx,
        "etc/fstab",
        "fstab",
        TemplateData::Filesystems(&ctx.config.filesystems),
    )?;
    ctx.say("  /etc/fstab has been configured");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_fill_leaves_existing_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("etc/hosts");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "old\n").unwrap();

        let err = write_atomic(&path, |out| {
            out.write_all(b"half a fi").unwrap();
            Err(InstallerError::InvalidConfig("boom".into()))
        })
        .unwrap_err();

        assert!(matches!(err, InstallerError::InvalidConfig(_)));
        assert_eq!(fs::read_to_string(&path).unwrap(), "old\n");
        assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn writes_with_0644_and_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("etc/hostname");

        write_atomic(&path, |out| {
            out.write_all(b"box\n")
                .map_err(|e| InstallerError::fs("hostname", e))
        })
        .unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "box\n");
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}
