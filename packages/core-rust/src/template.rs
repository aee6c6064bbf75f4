//! Positional placeholder formatting.
//!
//! `%0`, `%1`, ... are replaced by the rendered argument at that index and
//! `%%` by a literal `%`. Placeholders without a matching argument are left
//! as written.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::value::Value;

fn placeholder() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"%(?:%|(\d+))").expect("placeholder pattern is valid"))
}

/// Formats `template` against `args` in a single left-to-right pass.
#[must_use]
pub fn format(template: &str, args: &[Value]) -> String {
    placeholder()
        .replace_all(template, |caps: &Captures<'_>| match caps.get(1) {
            None => "%".to_string(),
            Some(index) => index
                .as_str()
                .parse::<usize>()
                .ok()
                .and_then(|i| args.get(i))
                .map_or_else(|| caps[0].to_string(), ToString::to_string),
        })
        .into_owned()
}
