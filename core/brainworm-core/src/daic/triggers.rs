//! Trigger-phrase detection for `user_prompt_submit`.
//!
//! Case-insensitive substring containment. Quoted or negated occurrences
//! still match; the default phrases are long enough that accidental
//! containment is rare, and a wrong flip is one `daic discussion` away.

/// Returns the first configured phrase contained in the prompt, if any.
pub fn detect(prompt: &str, phrases: &[String]) -> Option<String> {
    let normalized = prompt.to_lowercase();
    phrases
        .iter()
        .find(|phrase| !phrase.is_empty() && normalized.contains(&phrase.to_lowercase()))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_TRIGGER_PHRASES;

    fn defaults() -> Vec<String> {
        DEFAULT_TRIGGER_PHRASES.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn detects_exact_phrase() {
        assert_eq!(
            detect("Okay, make it so", &defaults()).as_deref(),
            Some("make it so")
        );
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(
            detect("SHIP IT already", &defaults()).as_deref(),
            Some("ship it")
        );
    }

    #[test]
    fn substring_containment_is_enough() {
        // Phrase embedded mid-sentence still matches.
        assert_eq!(
            detect("I think we should go ahead with plan B", &defaults()).as_deref(),
            Some("go ahead")
        );
    }

    #[test]
    fn no_phrase_means_no_match() {
        assert!(detect("what do you think about this design?", &defaults()).is_none());
    }

    #[test]
    fn quoted_occurrences_still_match() {
        // Documented behavior: plain substring match, quoting is ignored.
        assert!(detect("do not \"make it so\" yet", &defaults()).is_some());
    }

    #[test]
    fn empty_phrase_list_never_matches() {
        assert!(detect("make it so", &[]).is_none());
    }

    #[test]
    fn empty_phrases_are_skipped() {
        let phrases = vec![String::new(), "execute".to_string()];
        assert_eq!(detect("execute the plan", &phrases).as_deref(), Some("execute"));
    }
}
