//! WCAG references derived from audit rule tags.
//!
//! axe-core tags rules with their conformance level (`wcag2a`, `wcag21aa`,
//! `wcag22aaa`) and with the success criteria they test, encoded as digits
//! (`wcag111` is 1.1.1, `wcag1410` is 1.4.10).

use beacon_core::{WcagLevel, WcagReferences};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

fn level_regex() -> &'static Regex {
    static LEVEL_REGEX: OnceLock<Regex> = OnceLock::new();
    LEVEL_REGEX.get_or_init(|| Regex::new(r"^wcag(\d)(\d?)(a{1,3})$").expect("valid regex"))
}

fn criterion_regex() -> &'static Regex {
    static CRITERION_REGEX: OnceLock<Regex> = OnceLock::new();
    CRITERION_REGEX.get_or_init(|| Regex::new(r"^wcag(\d)(\d)(\d{1,2})$").expect("valid regex"))
}

/// Build the WCAG references for a rule, if it carries a level tag.
#[must_use]
pub fn wcag_references(tags: &[String]) -> Option<WcagReferences> {
    let (level, version) = tags.iter().filter_map(|tag| parse_level_tag(tag)).max()?;

    let criteria: BTreeSet<String> = tags
        .iter()
        .filter_map(|tag| {
            criterion_regex()
                .captures(tag)
                .map(|c| format!("{}.{}.{}", &c[1], &c[2], &c[3]))
        })
        .collect();

    Some(WcagReferences {
        version,
        level,
        criteria,
    })
}

fn parse_level_tag(tag: &str) -> Option<(WcagLevel, String)> {
    let captures = level_regex().captures(tag)?;
    let minor = match &captures[2] {
        "" => "0",
        digit => digit,
    };
    let version = format!("{}.{}", &captures[1], minor);
    let level = match captures[3].len() {
        1 => WcagLevel::A,
        2 => WcagLevel::AA,
        _ => WcagLevel::AAA,
    };
    Some((level, version))
}
