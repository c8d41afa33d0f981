use crate::api::Note;

/// Notes whose title or content contains `term`, ignoring case. An empty term
/// matches every note; order is preserved.
pub fn filter_notes<'a>(notes: &'a [Note], term: &str) -> Vec<&'a Note> {
    let needle = term.to_lowercase();
    if needle.is_empty() {
        return notes.iter().collect();
    }
    notes
        .iter()
        .filter(|note| matches_lowercase(note, &needle))
        .collect()
}

pub fn matches(note: &Note, term: &str) -> bool {
    matches_lowercase(note, &term.to_lowercase())
}

fn matches_lowercase(note: &Note, needle: &str) -> bool {
    note.title.to_lowercase().contains(needle) || note.content.to_lowercase().contains(needle)
}
