use std::{path::PathBuf, process, thread};

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use void_installer::{
    assets::{KeyDirectory, StaticAssets},
    frontend::{FrontendOptions, Registry},
    progress::{self, Backpressure, ChannelOptions},
    runner::{self, DryRunExecutor, SystemExecutor},
    ui, Installer, InstallerError, Meta, Outcome,
};

#[derive(Debug, Parser)]
#[command(name = "void-installer", version, about = "Install Void Linux onto a mounted target")]
struct Cli {
    /// Mountpoint for the target filesystem
    #[arg(long, default_value = "/target")]
    target: PathBuf,

    /// Frontend interface to use
    #[arg(long)]
    frontend: Option<String>,

    /// TOML configuration for the `auto` frontend
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip the confirmation prompt where the frontend allows it
    #[arg(long)]
    yes: bool,

    /// Print commands instead of running them
    #[arg(long)]
    dry_run: bool,

    /// Package repository to install from
    #[arg(long)]
    mirror: Option<String>,

    /// Packages to install, shell-quoted, e.g. "base-system 'grub-x86_64-efi'"
    #[arg(long)]
    packages: Option<String>,

    /// Enable the default services in the new system
    #[arg(long)]
    enable_services: bool,

    /// Progress lines buffered before the installer waits for the display
    #[arg(long, default_value_t = 50)]
    output_buffer: usize,

    /// Drop progress lines instead of waiting when the buffer is full
    #[arg(long)]
    drop_output: bool,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(Outcome::Completed) => {}
        Ok(Outcome::Aborted { stage }) => {
            println!();
            ui::print_error(&format!("Installation stopped at stage '{}'.", stage));
            process::exit(1);
        }
        Err(e) => {
            println!();
            ui::print_error(&format!("{}", e));
            process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<Outcome, InstallerError> {
    if cli.dry_run {
        ui::print_warning("DRY-RUN MODE — commands are printed, not run.");
    } else {
        check_root()?;
    }

    let registry = Registry::builtin();
    let options = FrontendOptions {
        config_path: cli.config.clone(),
        assume_yes: cli.yes,
    };
    let mut frontend = registry.resolve(cli.frontend.as_deref(), &options)?;

    let config = frontend.config()?;
    frontend.confirm()?;

    let mut meta = Meta {
        enable_services: cli.enable_services,
        ..Meta::default()
    };
    if let Some(mirror) = cli.mirror {
        meta.mirror = mirror;
    }
    if let Some(ref packages) = cli.packages {
        meta.packages = runner::split_words(packages)?;
    }

    let (sender, receiver) = progress::channel(ChannelOptions {
        output_capacity: cli.output_buffer,
        output_policy: if cli.drop_output {
            Backpressure::DropNewest
        } else {
            Backpressure::Block
        },
        ..ChannelOptions::default()
    });

    let installer = Installer::new(config).with_meta(meta);
    let installer = if cli.dry_run {
        installer
            .with_executor(DryRunExecutor)
            .with_assets(StaticAssets::default())
    } else {
        installer
            .with_executor(SystemExecutor)
            .with_assets(KeyDirectory::default())
    };

    info!(target = %cli.target.display(), "handing over to the installer");
    let target = cli.target;
    let worker = thread::spawn(move || installer.install(target, sender));

    frontend.show_progress(receiver);

    // The installer only panics on a bug; its channels are closed either way.
    Ok(worker
        .join()
        .unwrap_or(Outcome::Aborted { stage: "installer thread" }))
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Checks that the process is running as root (UID 0).
fn check_root() -> Result<(), InstallerError> {
    let uid = std::fs::read_to_string("/proc/self/status")
        .ok()
        .and_then(|s| {
            s.lines()
                .find(|l| l.starts_with("Uid:"))
                .and_then(|l| l.split_whitespace().nth(2))
                .and_then(|v| v.parse::<u32>().ok())
        })
        .unwrap_or(1); // default to non-root if unreadable

    if uid != 0 {
        return Err(InstallerError::NotRoot);
    }

    Ok(())
}
