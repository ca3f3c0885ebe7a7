//! Site-branch matching over hierarchical topology paths.
//!
//! Site identifiers are `/`-separated paths such as `"region/zone/rack"`.
//! Two sites are in the same branch when one path is a prefix of the other
//! at a segment boundary (equality included). A global handler registered
//! for a site therefore covers the whole subtree below it without an
//! explicit destination list.

/// Returns true when `site_a` and `site_b` belong to the same topology
/// branch.
///
/// Matching is segment-wise: `"eu/west"` covers `"eu/west/1"` but not
/// `"eu/we"`. Empty segments (leading, trailing or doubled slashes) are
/// ignored, so `"eu/west/"` and `"eu/west"` compare equal.
pub fn sites_in_same_branch(site_a: &str, site_b: &str) -> bool {
    segments(site_a)
        .zip(segments(site_b))
        .all(|(a, b)| a == b)
}

fn segments(site: &str) -> impl Iterator<Item = &str> {
    site.split('/').filter(|segment| !segment.is_empty())
}
