//! Virtual filesystems the chrooted tools need inside the target.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use crate::{
    error::InstallerError,
    progress::ProgressSender,
    runner::{CommandLine, Executor},
};

/// Mount point under the target, and the `mount` arguments before it.
const SPECIALS: [(&str, &[&str]); 3] = [
    ("proc", &["-t", "proc", "proc"]),
    ("sys", &["--rbind", "/sys"]),
    ("dev", &["--rbind", "/dev"]),
];

/// Holds the special mounts; dropping it unmounts them in reverse order.
pub(crate) struct Specials<'a> {
    executor: &'a dyn Executor,
    progress: &'a ProgressSender,
    mounted: Vec<PathBuf>,
}

/// Mounts `proc`, `sys` and `dev` under `target`, which must already be a
/// directory. If one mount fails, the ones before it are released before
/// returning.
pub(crate) fn mount_specials<'a>(
    target: &Path,
    executor: &'a dyn Executor,
    progress: &'a ProgressSender,
) -> Result<Specials<'a>, InstallerError> {
    let mut specials = Specials {
        executor,
        progress,
        mounted: Vec::with_capacity(SPECIALS.len()),
    };

    for (name, args) in SPECIALS {
        let point = target.join(name);
        fs::create_dir_all(&point).map_err(|e| InstallerError::fs(&point, e))?;

        let cmd = CommandLine::new("mount")
            .args(args.iter().copied())
            .arg(point.to_string_lossy());
        executor.execute(&cmd, progress.output())?;
        debug!(point = %point.display(), "mounted");
        specials.mounted.push(point);
    }

    Ok(specials)
}

impl Drop for Specials<'_> {
    fn drop(&mut self) {
        for point in self.mounted.drain(..).rev() {
            let cmd = CommandLine::new("umount")
                .arg("-R")
                .arg(point.to_string_lossy());
            match self.executor.execute(&cmd, self.progress.output()) {
                Ok(()) => debug!(point = %point.display(), "unmounted"),
                Err(e) => {
                    warn!(point = %point.display(), error = %e, "unmount failed");
                    self.progress.report(e);
                }
            }
        }
    }
}
