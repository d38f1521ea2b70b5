//! Output formatting for CLI

use crate::{planner::SearchSummary, types::BoundedValue};

const RULE_WIDTH: usize = 60;

/// Print a section header framed by rules
pub fn print_section(title: &str) {
    let rule = "=".repeat(RULE_WIDTH);
    println!("\n{rule}\n{title}\n{rule}");
}

/// Print a subsection header
pub fn print_subsection(title: &str) {
    println!("\n{title}\n{}", "-".repeat(RULE_WIDTH / 3 * 2));
}

/// Format a count with thousands separators
pub fn format_number(n: usize) -> String {
    let digits = n.to_string();
    let head = digits.len() % 3;
    let mut groups: Vec<&str> = Vec::new();
    if head > 0 {
        groups.push(&digits[..head]);
    }
    groups.extend(
        digits.as_bytes()[head..]
            .chunks(3)
            .filter_map(|chunk| std::str::from_utf8(chunk).ok()),
    );
    groups.join(",")
}

/// Format a bounded value as `avg [lower, upper]`
pub fn format_value(value: &BoundedValue) -> String {
    format!(
        "{:.4} [{:.4}, {:.4}]",
        value.average, value.lower, value.upper
    )
}

/// Print an aligned `key: value` line
pub fn print_kv(key: &str, value: &str) {
    let label = format!("{key}:");
    println!("  {label:20} {value}");
}

/// Print the fields of a search summary
pub fn print_summary(summary: &SearchSummary) {
    print_kv("Stop reason", &summary.stop_reason.to_string());
    print_kv("Iterations", &format_number(summary.iterations as usize));
    print_kv("Root value", &format_value(&summary.root_value));
    print_kv("Root complete", &summary.root_complete.to_string());
    print_kv("States", &format_number(summary.states));
    print_kv("Actions", &format_number(summary.actions));
    print_kv("Transitions", &format_number(summary.transitions));
    print_kv("Elapsed", &format!("{} ms", summary.elapsed_ms));
}
