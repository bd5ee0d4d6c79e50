//! Output formatting utilities

use colored::Colorize;
use edgeci_lib::sync::{ProxyOutcome, TickReport};

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print one line per proxy of a finished tick
pub fn print_report(report: &TickReport, verb: &str) {
    if let Some(e) = &report.discovery_error {
        print_error(&format!("Could not resolve proxies: {}", e));
        return;
    }
    if report.outcomes.is_empty() {
        print_warning("No proxies selected");
        return;
    }

    for (proxy, outcome) in &report.outcomes {
        match outcome {
            ProxyOutcome::Synced { revision } => {
                print_success(&format!("{} {} revision {}", verb, proxy.cyan(), revision))
            }
            ProxyOutcome::Unchanged => print_info(&format!("{} is up to date", proxy.cyan())),
            ProxyOutcome::SkippedInFlight => {
                print_warning(&format!("{} is still being processed", proxy.cyan()))
            }
            ProxyOutcome::Failed(e) => print_error(&format!("{}: {}", proxy.cyan(), e)),
        }
    }
}
