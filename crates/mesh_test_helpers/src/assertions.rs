//! Predicates over `boardmesh` output

use predicates::prelude::*;
use predicates::str::contains;

/// stderr must not contain any of `values`
pub fn stderr_not_contains(values: &[&str]) -> impl Predicate<str> {
    let owned_values: Vec<String> = values.iter().map(|&s| s.to_string()).collect();
    predicate::function(move |s: &str| !owned_values.iter().any(|v| s.contains(v.as_str())))
}

/// Text report of a `simulate` run that converged
pub fn reports_convergence() -> impl Predicate<str> {
    contains("converged: yes").and(contains("converged: no").not())
}

/// A peer identity as printed by `boardmesh identity`: one token of hex digits
pub fn looks_like_identity() -> impl Predicate<str> {
    predicate::function(|s: &str| {
        let id = s.trim();
        !id.is_empty() && !id.contains(char::is_whitespace) && id.chars().all(|c| c.is_ascii_hexdigit())
    })
}
