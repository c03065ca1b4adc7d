use once_cell::sync::Lazy;
use regex::Regex;

static NUMBERED_ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+\.[ \t]+(.+)$").expect("entry pattern should compile"));

/// Collect the entries of a numbered list (`1. text`), in order.
/// Lines that are not numbered entries are dropped.
pub fn numbered_entries(region: &str) -> Vec<String> {
    region
        .lines()
        .filter_map(|line| NUMBERED_ENTRY.captures(line))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|entry| !entry.is_empty())
        .map(str::to_owned)
        .collect()
}
