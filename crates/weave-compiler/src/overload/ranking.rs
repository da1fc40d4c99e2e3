//! Specificity ranking among surviving candidates.

use weave_core::more_general;

use super::Candidate;

/// Candidates whose signature is not strictly more general than another's.
///
/// Registration order is preserved. Two candidates with signatures equal up
/// to renaming are both kept, since neither is more specific.
pub fn minimal<'r>(candidates: Vec<Candidate<'r>>) -> Vec<Candidate<'r>> {
    if candidates.len() < 2 {
        return candidates;
    }
    let keep: Vec<bool> = candidates
        .iter()
        .map(|c| {
            !candidates
                .iter()
                .any(|d| !std::ptr::eq(c, d) && more_general(&c.signature, &d.signature))
        })
        .collect();
    candidates
        .into_iter()
        .zip(keep)
        .filter_map(|(c, keep)| keep.then_some(c))
        .collect()
}
