use std::io::Write;

use console::Style;

fn emit(style: Style, label: &str, message: &str) {
    let _ = writeln!(std::io::stderr(), "{:>12} {message}", style.apply_to(label));
}

/// Print a Cargo-style status line: `    Resolved 12 modules`
///
/// The `label` is right-aligned to 12 columns and printed in bold green,
/// followed by the `message` in the default terminal colour.
pub fn status(label: &str, message: &str) {
    emit(Style::new().green().bold(), label, message);
}

/// Like [`status`] but uses bold cyan for informational (non-action) messages.
pub fn status_info(label: &str, message: &str) {
    emit(Style::new().cyan().bold(), label, message);
}

/// Warning-style status line (bold yellow label).
pub fn status_warn(label: &str, message: &str) {
    emit(Style::new().yellow().bold(), label, message);
}

/// Render a `module -> version` change the way `status` lines show them,
/// e.g. `example.com/b 1.0.0 -> 1.2.0`. A missing side is shown as `none`.
pub fn change_line(path: &str, old: Option<&str>, new: Option<&str>) -> String {
    format!(
        "{path} {} -> {}",
        old.unwrap_or("none"),
        new.unwrap_or("none")
    )
}
