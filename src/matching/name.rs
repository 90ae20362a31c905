// src/matching/name.rs

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::matching::ClusterMember;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Trims a company name and collapses internal whitespace runs to a single space.
pub fn normalize_name(name: &str) -> String {
    WHITESPACE_RE.replace_all(name.trim(), " ").into_owned()
}

/// Picks the display name for a cluster.
///
/// Every member name is normalized, then the shortest one wins, with the
/// lowercase form breaking ties. Among fully tied names the earliest member wins,
/// so callers should pass members in a stable order. This favours the least
/// decorated variant ("Acme Inc" over "Acme, Inc.") and is a heuristic only.
///
/// Returns an empty string for an empty member list.
pub fn choose_canonical(members: &[ClusterMember]) -> String {
    let mut cleaned: Vec<(usize, String, String)> = members
        .iter()
        .map(|member| {
            let name = normalize_name(&member.company_name);
            (name.chars().count(), name.to_lowercase(), name)
        })
        .collect();
    cleaned.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    cleaned
        .into_iter()
        .next()
        .map(|(_, _, name)| name)
        .unwrap_or_default()
}

/// Picks the member whose embedding stands in for the whole cluster when looking
/// up the master registry: shortest normalized name, then lowercase name, then
/// identifier string form. Fully deterministic for any member order.
pub fn choose_representative(members: &[ClusterMember]) -> Option<&ClusterMember> {
    members.iter().min_by(|a, b| {
        let name_a = normalize_name(&a.company_name);
        let name_b = normalize_name(&b.company_name);
        name_a
            .chars()
            .count()
            .cmp(&name_b.chars().count())
            .then_with(|| name_a.to_lowercase().cmp(&name_b.to_lowercase()))
            .then_with(|| a.id.as_key().cmp(&b.id.as_key()))
    })
}
