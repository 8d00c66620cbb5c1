use colored::Colorize;
use declarative::ApplyResult;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Status glyph for an apply result
pub fn result_symbol(result: &ApplyResult) -> &'static str {
    match result {
        ApplyResult::NoChange => "○",
        ApplyResult::Created | ApplyResult::Modified | ApplyResult::Removed => "✓",
        ApplyResult::Failed { .. } => "✗",
        ApplyResult::Skipped { .. } => "⊘",
    }
}

/// One-line description of an apply result
pub fn describe_result(result: &ApplyResult) -> String {
    match result {
        ApplyResult::NoChange => "up to date".to_string(),
        ApplyResult::Created => "created".to_string(),
        ApplyResult::Modified => "updated".to_string(),
        ApplyResult::Removed => "deleted".to_string(),
        ApplyResult::Failed { error } => format!("failed: {}", error),
        ApplyResult::Skipped { reason } => format!("skipped: {}", reason),
    }
}
