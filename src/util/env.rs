//! Terminal detection.

use std::io::IsTerminal;

/// Whether stdout is attached to a terminal.
#[must_use]
pub fn stdout_is_tty() -> bool {
    std::io::stdout().is_terminal()
}

/// Whether stderr is attached to a terminal.
#[must_use]
pub fn stderr_is_tty() -> bool {
    std::io::stderr().is_terminal()
}

/// Colors are used only on a capable terminal and when nothing opts out:
/// `--no-color`, `NO_COLOR`, `CHAINPROBE_NO_COLOR` or `TERM=dumb`.
#[must_use]
pub fn should_use_color(no_color_flag: bool) -> bool {
    let opted_out = no_color_flag
        || std::env::var_os(crate::storage::ENV_NO_COLOR_STD).is_some()
        || std::env::var(crate::storage::ENV_NO_COLOR)
            .is_ok_and(|v| matches!(v.trim(), "1" | "true" | "yes"));
    let dumb = std::env::var("TERM").is_ok_and(|t| t == "dumb");
    !opted_out && !dumb && stdout_is_tty()
}
