use regex::{Regex, RegexBuilder};

/// Case-insensitive literal matcher for the active search term.
pub fn build_highlight_regex(term: &str) -> Option<Regex> {
    if term.trim().is_empty() {
        return None;
    }
    RegexBuilder::new(&regex::escape(term))
        .case_insensitive(true)
        .build()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_term_regardless_of_case() {
        let regex = build_highlight_regex("meet").expect("regex");
        let matches: Vec<_> = regex
            .find_iter("Meeting about MEETUPS")
            .map(|m| m.as_str())
            .collect();
        assert_eq!(matches, vec!["Meet", "MEET"]);
    }

    #[test]
    fn escapes_regex_metacharacters() {
        let regex = build_highlight_regex("c++ (draft)").expect("regex");
        assert!(regex.is_match("notes on C++ (draft) syntax"));
        assert!(!regex.is_match("c draft"));
    }

    #[test]
    fn blank_term_has_no_highlight() {
        assert!(build_highlight_regex("   ").is_none());
    }
}
