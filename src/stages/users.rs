use super::StageContext;
use crate::{config::User, error::InstallerError, runner::CommandLine};

fn useradd(ctx: &StageContext<'_>, user: &User) -> CommandLine {
    let groups: Vec<&str> = user
        .groups
        .iter()
        .map(|g| g.trim())
        .filter(|g| !g.is_empty())
        .collect();

    let mut cmd = CommandLine::new("chroot")
        .arg(ctx.root())
        .args(["useradd", "-m", "-U"]);
    if !groups.is_empty() {
        cmd = cmd.arg("-G").arg(groups.join(","));
    }
    if !user.gecos.is_empty() {
        cmd = cmd.arg("-c").arg(user.gecos.as_str());
    }
    cmd.arg(user.username.as_str())
}

/// `chpasswd` reads `name:password` from stdin, so the secret never shows
/// up in a process listing.
fn chpasswd(ctx: &StageContext<'_>, username: &str, password: &str) -> CommandLine {
    CommandLine::new("chroot")
        .arg(ctx.root())
        .args(["chpasswd", "-c", "SHA512"])
        .input(format!("{}:{}\n", username, password))
}

fn check(user: &User) -> Result<(), InstallerError> {
    let name = &user.username;
    if name.is_empty() || name.starts_with('-') || name.contains(|c: char| c == ':' || c.is_whitespace()) {
        return Err(InstallerError::InvalidConfig(format!(
            "{:?} is not a valid username",
            name
        )));
    }
    if user.password.contains('\n') || user.gecos.contains([':', '\n']) {
        return Err(InstallerError::InvalidConfig(format!(
            "account details for {} contain forbidden characters",
            name
        )));
    }
    Ok(())
}

pub(super) fn create_accounts(ctx: &StageContext<'_>) -> Result<(), InstallerError> {
    ctx.say("Adding user account(s)");

    if !ctx.config.root_password.is_empty() {
        ctx.say("  Setting the root password");
        if ctx.config.root_password.contains('\n') {
            return Err(InstallerError::InvalidConfig(
                "root password contains a newline".into(),
            ));
        }
        ctx.run(&chpasswd(ctx, "root", &ctx.config.root_password))?;
    }

    for user in &ctx.config.users {
        check(user)?;
        ctx.say(format!("  {}", user.username));
        ctx.run(&useradd(ctx, user))?;
        ctx.run(&chpasswd(ctx, &user.username, &user.password))?;
    }

    ctx.say("  User accounts added");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> User {
        User {
            username: name.into(),
            ..User::default()
        }
    }

    #[test]
    fn rejects_names_that_break_chpasswd() {
        assert!(check(&user("alice")).is_ok());
        assert!(check(&user("")).is_err());
        assert!(check(&user("al:ice")).is_err());
        assert!(check(&user("al ice")).is_err());
        assert!(check(&user("-rf")).is_err());
    }
}
