//! Styled terminal output for command results.
//!
//! Progress and results go to stdout, errors to stderr.

use owo_colors::OwoColorize;

/// Print a command title
pub fn header(text: &str) {
    println!();
    println!("{}", text.bold().cyan());
    println!("{}", "─".repeat(text.chars().count()).dimmed());
    println!();
}

/// Print a group heading
pub fn group(name: &str, detail: &str) {
    println!("{} {}", name.bold().white(), format!("({})", detail).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Print a success message
pub fn success(text: &str) {
    println!("{} {}", "✔".green().bold(), text.green());
}

/// Print an info message
pub fn info(text: &str) {
    println!("{} {}", "ℹ".blue().bold(), text);
}

/// Print a warning message
pub fn warn(text: &str) {
    println!("{} {}", "⚠".yellow().bold(), text.yellow());
}

/// Print an error message
pub fn error(text: &str) {
    eprintln!("{} {}", "✖".red().bold(), text.red());
}

/// Print a step indicator
pub fn step(current: usize, total: usize, text: &str) {
    println!("{} {}", format!("[{}/{}]", current, total).dimmed(), text);
}

/// Print a unit that was applied, with an optional timestamp
pub fn applied_unit(name: &str, at: Option<&str>) {
    match at {
        Some(at) => println!("  {} {}  {}", "✔".green(), name, at.dimmed()),
        None => println!("  {} {}", "✔".green(), name.green()),
    }
}

/// Print a unit that an update would apply
pub fn pending_unit(name: &str) {
    println!("  {} {}", "•".yellow(), name.yellow());
}

/// Print a newline
pub fn newline() {
    println!();
}

/// Print dimmed text
pub fn dim(text: &str) {
    println!("{}", text.dimmed());
}
