//! "Did you mean" suggestions for misspelled names.

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a_len = a.chars().count();
    let b_len = b.chars().count();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut prev_row: Vec<usize> = (0..=b_len).collect();
    let mut curr_row = vec![0; b_len + 1];

    for (i, a_char) in a.chars().enumerate() {
        curr_row[0] = i + 1;
        for (j, b_char) in b.chars().enumerate() {
            let cost = if a_char == b_char { 0 } else { 1 };
            curr_row[j + 1] = (prev_row[j + 1] + 1)
                .min(curr_row[j] + 1)
                .min(prev_row[j] + cost);
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b_len]
}

/// Find the candidate closest to `given`, if any is within an edit distance of two.
///
/// Names are compared case-sensitively, since the language is case-sensitive.
pub(crate) fn name_suggestion<'a, I>(given: &str, candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    candidates
        .into_iter()
        .map(|candidate| (candidate, levenshtein(given, candidate)))
        .filter(|(_, dist)| *dist < 3)
        .min_by_key(|(_, dist)| *dist)
        .map(|(candidate, _)| candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("count", "count"), 0);
    }

    #[test]
    fn test_picks_closest() {
        let names = ["description", "default", "type"];
        assert_eq!(name_suggestion("defualt", names), Some("default"));
        assert_eq!(name_suggestion("typo", names), Some("type"));
        assert_eq!(name_suggestion("validation", names), None);
    }

    #[test]
    fn test_is_case_sensitive() {
        assert_eq!(name_suggestion("DEFAULT", ["default"]), None);
    }
}
