//! `agentry screen` — run the safety screener over a file.

use agentry_core::synthesis::screen as screen_source;

/// Print every issue found in `file`; fails when there is at least one.
pub fn screen(file: &str) -> Result<(), String> {
    let source = std::fs::read_to_string(file)
        .map_err(|e| format!("Failed to read '{}': {}", file, e))?;

    let issues = screen_source(&source);
    if issues.is_empty() {
        println!("✅ No issues found in {}", file);
        return Ok(());
    }

    println!("❌ {} issue(s) in {}:", issues.len(), file);
    for issue in &issues {
        println!("   - {}", issue);
    }
    Err(format!("{} failed screening", file))
}
