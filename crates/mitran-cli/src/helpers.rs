//! Shared CLI helpers: banner and labels.

use colored::Colorize;

/// Heading printed above each assistant reply.
pub const ASSISTANT_LABEL: &str = "Mitran";

/// Print the banner shown at REPL and server start.
pub fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}  v{}", "Mitran".cyan().bold(), version.dimmed());
    println!(
        "{}",
        "Chat with Mitran to make our city kinder for community dogs.".dimmed()
    );
    println!();
}

/// `✓ detail` in green, or `· detail` dimmed.
pub fn mark(ok: bool, detail: &str) -> String {
    if ok {
        format!("{} {}", "✓".green(), detail)
    } else {
        format!("{}", format!("· {detail}").dimmed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_keeps_detail() {
        colored::control::set_override(false);
        assert_eq!(mark(true, "key set"), "✓ key set");
        assert_eq!(mark(false, "not configured"), "· not configured");
    }
}
