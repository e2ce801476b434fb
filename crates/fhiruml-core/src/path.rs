//! Element id and path helpers
//!
//! Element ids are dot-separated paths where slices are introduced with a
//! colon (`Patient.identifier:mrn.system`). All helpers here are total: an id
//! without any delimiter is its own parent.

/// Position of the last `.` or `:` in `id`, whichever comes later
fn last_delimiter(id: &str) -> Option<usize> {
    id.rfind(['.', ':'])
}

/// Id of the enclosing element: everything before the last `.` or `:`.
///
/// Returns `id` unchanged when it has no delimiter (the root element).
pub fn parent_id(id: &str) -> &str {
    match last_delimiter(id) {
        Some(pos) => &id[..pos],
        None => id,
    }
}

/// Like [`parent_id`] but `None` for the root instead of the id itself
pub fn try_parent_id(id: &str) -> Option<&str> {
    last_delimiter(id).map(|pos| &id[..pos])
}

/// Id of the sliced element: everything before the last `:`.
pub fn slice_parent_id(id: &str) -> &str {
    match id.rfind(':') {
        Some(pos) => &id[..pos],
        None => id,
    }
}

/// Last segment of the id (`Patient.identifier:mrn` -> `mrn`)
pub fn local_name(id: &str) -> &str {
    match last_delimiter(id) {
        Some(pos) => &id[pos + 1..],
        None => id,
    }
}

/// Splits an id into its segments regardless of delimiter kind
pub fn segments(id: &str) -> Vec<&str> {
    id.split(['.', ':']).collect()
}

/// First segment of `old` that no longer sits at the same position in `new`.
///
/// Used to label merged slices after their header segment has been folded
/// away: `removed_segment("Patient.extension:race", "Patient:race")` is
/// `Some("extension")`.
pub fn removed_segment<'a>(old: &'a str, new: &str) -> Option<&'a str> {
    let old_segments = segments(old);
    let new_segments = segments(new);
    old_segments
        .iter()
        .enumerate()
        .find(|(i, segment)| new_segments.get(*i) != Some(*segment))
        .map(|(_, segment)| *segment)
}
