//! Dependency extraction.

use smallvec::SmallVec;

use super::{segments, Segment};

/// Return the known variable names referenced by `template`, deduplicated,
/// in order of first appearance.
///
/// `is_known` decides which names belong to the variable set; any other
/// reference is not a dependency.
pub fn extract_dependencies<'t, F>(template: &'t str, is_known: F) -> SmallVec<[&'t str; 4]>
where
    F: Fn(&str) -> bool,
{
    collect_references(template, |name| is_known(name))
}

/// Return the referenced names that `is_known` rejects.
pub fn unknown_references<'t, F>(template: &'t str, is_known: F) -> SmallVec<[&'t str; 4]>
where
    F: Fn(&str) -> bool,
{
    collect_references(template, |name| !is_known(name))
}

fn collect_references<'t, F>(template: &'t str, keep: F) -> SmallVec<[&'t str; 4]>
where
    F: Fn(&str) -> bool,
{
    let mut names: SmallVec<[&'t str; 4]> = SmallVec::new();
    for segment in segments(template) {
        if let Segment::Reference(reference) = segment {
            if keep(reference.name) && !names.contains(&reference.name) {
                names.push(reference.name);
            }
        }
    }
    names
}
