use dialoguer::{Confirm, Input, Password, Select};

use super::Frontend;
use crate::{
    config::{Bootloader, Config, Filesystem, User},
    error::FrontendError,
    progress::ProgressReceiver,
    sysinfo, ui,
};

const TOTAL_STEPS: u8 = 6;

/// Interactive terminal front end. Asks for every setting in turn.
#[derive(Debug, Default)]
pub struct Prompt {
    config: Option<Config>,
}

impl Prompt {
    pub fn new() -> Self {
        Self::default()
    }
}

fn ask(prompt: &str, default: &str) -> Result<String, FrontendError> {
    let value: String = Input::new()
        .with_prompt(prompt)
        .default(default.to_string())
        .interact_text()?;
    Ok(value.trim().to_string())
}

fn ask_password(prompt: &str) -> Result<String, FrontendError> {
    Ok(Password::new()
        .with_prompt(prompt)
        .with_confirmation("Repeat password", "Passwords do not match")
        .interact()?)
}

/// Splits a comma separated group list, dropping blanks.
fn parse_groups(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(String::from)
        .collect()
}

fn ask_grub(system: &sysinfo::System) -> Result<Bootloader, FrontendError> {
    if !Confirm::new().with_prompt("Use GRUB?").default(true).interact()? {
        return Ok(Bootloader::default());
    }
    let graphical = Confirm::new()
        .with_prompt("Use graphical GRUB?")
        .default(true)
        .interact()?;

    let install_to = if system.disks.is_empty() {
        ask("Install GRUB to", "/dev/sda")?
    } else {
        let labels: Vec<String> = system.disks.iter().map(|d| d.display()).collect();
        let idx = Select::new()
            .with_prompt("Install GRUB to")
            .items(&labels)
            .default(0)
            .interact()?;
        system.disks[idx].path.clone()
    };

    Ok(Bootloader {
        graphical,
        install_to: Some(install_to),
    })
}

fn ask_users() -> Result<Vec<User>, FrontendError> {
    let mut users = Vec::new();
    let mut prompt = "Do you wish to add a user?";
    while Confirm::new().with_prompt(prompt).default(users.is_empty()).interact()? {
        let username = ask("Username", "")?;
        let gecos = ask("Name for the user", "")?;
        let password = ask_password("Password")?;
        let groups = parse_groups(&ask("Additional groups (comma separated)", "wheel")?);
        users.push(User {
            username,
            gecos,
            password,
            groups,
        });
        prompt = "Add another user?";
    }
    Ok(users)
}

fn ask_filesystems() -> Result<Vec<Filesystem>, FrontendError> {
    let mut filesystems = Vec::new();
    while Confirm::new()
        .with_prompt("Add an entry to /etc/fstab?")
        .default(filesystems.is_empty())
        .interact()?
    {
        let source = ask("Device or UUID=…", "")?;
        let mount_point = ask("Mount point", if filesystems.is_empty() { "/" } else { "" })?;
        let fs_type = ask("Filesystem type", "ext4")?;
        let options = ask("Mount options", "defaults")?;
        let pass = if mount_point == "/" { 1 } else { 2 };
        filesystems.push(Filesystem {
            source,
            mount_point,
            fs_type,
            options,
            dump: 0,
            pass,
        });
    }
    Ok(filesystems)
}

impl Frontend for Prompt {
    fn config(&mut self) -> Result<Config, FrontendError> {
        ui::print_banner();
        ui::print_info("Please wait while the installer inspects your system…");
        let system = sysinfo::discover();
        println!();
        println!("{}", system);

        ui::print_step(1, TOTAL_STEPS, "Network Name");
        let hostname = ask("System hostname", "void")?;

        ui::print_step(2, TOTAL_STEPS, "Localization");
        let timezone = ask("Time zone", "UTC")?;
        let locale = ask("glibc locale", "en_US.UTF-8")?;
        let keyboard = ask("Keyboard layout", "us")?;

        ui::print_step(3, TOTAL_STEPS, "Boot Loader");
        let grub = ask_grub(&system)?;

        ui::print_step(4, TOTAL_STEPS, "Root Account");
        let root_password = ask_password("Root password")?;

        ui::print_step(5, TOTAL_STEPS, "User Accounts");
        let users = ask_users()?;

        ui::print_step(6, TOTAL_STEPS, "Filesystems");
        let filesystems = ask_filesystems()?;

        let config = Config {
            timezone,
            locale,
            keyboard,
            hostname,
            root_password,
            users,
            grub,
            filesystems,
        };
        self.config = Some(config.clone());
        Ok(config)
    }

    fn confirm(&mut self) -> Result<(), FrontendError> {
        let Some(ref config) = self.config else {
            return Err(FrontendError::ConfigUnobtainable(
                "no answers were collected".into(),
            ));
        };

        println!();
        let users: Vec<&str> = config.users.iter().map(|u| u.username.as_str()).collect();
        let users = users.join(", ");
        ui::print_kv_box(
            "Installation Summary",
            &[
                ("Hostname", config.hostname.as_str()),
                ("Time zone", config.timezone.as_str()),
                ("Locale", config.locale.as_str()),
                ("Keyboard", config.keyboard.as_str()),
                ("GRUB", config.grub.install_to.as_deref().unwrap_or("none")),
                ("Users", users.as_str()),
            ],
        );
        println!();

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
