//! Console output for a suite run.
//!
//! These lines are the harness's user-facing result, so they go to stdout
//! with terminal styling. Diagnostics about the harness itself go through
//! `tracing` instead.

use crossterm::style::Stylize;

use lspcheck_types::Counter;

pub fn pattern_notice(pattern: &str) {
    println!("{}", format!("test pattern: {pattern}").magenta().bold());
}

pub fn test_begin(name: &str) {
    println!("{}", format!("Testing {name} ...").yellow().bold());
}

/// `[index] description: OK` or `... FAILED`.
pub fn assertion(index: usize, description: &str, passed: bool) {
    let status = if passed {
        "OK".green().bold()
    } else {
        "FAILED".red().bold()
    };
    println!(
        "[{index}] {}{status}",
        format!("{description}: ").blue().bold()
    );
}

/// Detail for a failed test: the error report, already rendered.
pub fn failure(detail: &str) {
    println!("{detail}");
}

pub fn summary(tests: Counter, assertions: Counter) {
    println!("\n{}\n", "Summary:".magenta().bold());
    println!("{}", summary_line("Test cases", tests));
    println!("{}\n", summary_line("Assertions", assertions));
}

fn summary_line(label: &str, counter: Counter) -> String {
    format!(
        "  {label}: {} passed, {} failed",
        counter.passed, counter.failed
    )
}
