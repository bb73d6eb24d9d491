use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::progress::{ProgressEvent, ProgressReceiver};

// ── Terminal helpers ──────────────────────────────────────────────────────────

fn term_width() -> usize {
    Term::stdout().size().1.max(60) as usize
}

// ── Banner ────────────────────────────────────────────────────────────────────

pub fn print_banner() {
    let _ = Term::stdout().clear_screen();

    let logo = [
        r"   __   __   _      _",
        r"   \ \ / /__(_)__ _| |",
        r"    \ V / _ \ / _` | |",
        r"     \_/\___/_\__,_|_|",
    ];

    println!();
    for line in &logo {
        println!("{}", style(line).green().bold());
    }
    println!();
    println!(
        "{}",
        style(concat!("   Void Linux Installer  ·  runit  ·  v", env!("CARGO_PKG_VERSION")))
            .dim()
            .italic()
    );
    println!();
    println!("{}", style("─".repeat(term_width().min(52))).dim());
    println!();
}

// ── Step header ───────────────────────────────────────────────────────────────

/// Prints a visually distinct numbered step header.
pub fn print_step(step: u8, total: u8, title: &str) {
    println!();
    let tag = style(format!(" {}/{} ", step, total)).black().on_cyan().bold();
    let heading = style(format!("  {}", title)).white().bold();
    println!("{}{}", tag, heading);
    println!("{}", style("─".repeat(term_width().min(52))).dim());
}

// ── Feedback messages ─────────────────────────────────────────────────────────

/// Green ✓ — operation completed successfully.
pub fn print_success(msg: &str) {
    println!("  {}  {}", style("✓").green().bold(), style(msg).green());
}

/// Blue → — neutral info / progress note.
pub fn print_info(msg: &str) {
    println!("  {}  {}", style("→").blue().bold(), msg);
}

/// Yellow ⚠  — non-fatal notice.
pub fn print_warning(msg: &str) {
    println!("  {}  {}", style("⚠").yellow().bold(), style(msg).yellow());
}

/// Red ✗ — error (written to stderr).
pub fn print_error(msg: &str) {
    eprintln!("  {}  {}", style("✗").red().bold(), style(msg).red());
}

// ── Info box ──────────────────────────────────────────────────────────────────

/// Renders a bordered key→value box in the terminal.
///
/// ```text
/// ┌─ Installation Summary ────────────┐
/// │  Hostname    void                 │
/// │  Locale      en_US.UTF-8          │
/// │  Users       alice, bob           │
/// └───────────────────────────────────┘
/// ```
pub fn print_kv_box(title: &str, rows: &[(&str, &str)]) {
    const BOX_INNER: usize = 38;

    let dashes = "─".repeat(BOX_INNER.saturating_sub(title.chars().count() + 2));
    println!(
        "  ┌─ {} {}┐",
        style(title).white().bold(),
        style(&dashes).dim()
    );

    for (key, val) in rows {
        println!(
            "  │  {:<13}{}",
            style(*key).dim(),
            style(*val).white().bold()
        );
    }

    println!("  └{}┘", style("─".repeat(BOX_INNER + 2)).dim());
}

// ── Spinner ───────────────────────────────────────────────────────────────────

/// Returns a running braille spinner.
/// Call `pb.finish_and_clear()` when done.
pub fn spinner(msg: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("  {spinner:.cyan.bold}  {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
    pb.set_style(style);
    pb.set_message(msg.into());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

// ── Installation progress ─────────────────────────────────────────────────────

/// Prints every progress line and error above a spinner until the installer
/// finishes. Returns the number of errors shown.
pub fn show_progress(progress: ProgressReceiver) -> usize {
    let pb = spinner("Installing…");
    let mut errors = 0;

    progress.drain(|event| match event {
        ProgressEvent::Output(line) => {
            pb.println(format!("  {}  {}", style("→").blue().bold(), line));
            pb.set_message(line);
        }
        ProgressEvent::Error(err) => {
            errors += 1;
            pb.println(format!(
                "  {}  {}",
                style("✗").red().bold(),
                style(err).red()
            ));
        }
    });
    pb.finish_and_clear();

    println!();
    if errors == 0 {
        print_success("Installation finished.");
    } else {
        print_warning(&format!("Installation finished with {} error(s).", errors));
    }
    errors
}
