//! "Did you mean" suggestions for misspelled names.

/// Candidates close to `target`, best first.
///
/// Candidates are ranked by edit distance; everything within
/// `2 + 1.2 × best` of the best match is kept, capped at ten entries.
/// Ties keep their original order.
pub fn closest_matches<'a>(
    target: &str,
    candidates: impl IntoIterator<Item = &'a str>,
) -> Vec<&'a str> {
    let mut scored: Vec<(usize, &str)> = candidates
        .into_iter()
        .map(|candidate| (levenshtein(target, candidate), candidate))
        .collect();

    scored.sort_by_key(|&(distance, _)| distance);

    let Some(&(best, _)) = scored.first() else {
        return Vec::new();
    };

    let cutoff = 2.0 + 1.2 * best as f64;
    scored
        .into_iter()
        .filter(|&(distance, _)| (distance as f64) < cutoff)
        .take(10)
        .map(|(_, candidate)| candidate)
        .collect()
}

/// Render a suggestion list as a note, or `None` when there is nothing
/// worth suggesting.
pub fn suggestion_note<'a>(
    target: &str,
    candidates: impl IntoIterator<Item = &'a str>,
) -> Option<String> {
    let matches = closest_matches(target, candidates);
    if matches.is_empty() {
        return None;
    }

    let rendered: Vec<String> = matches.iter().map(|name| format!("`{}`", name)).collect();
    Some(format!("did you mean {}?", rendered.join(", ")))
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let m = a_chars.len();
    let n = b_chars.len();

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    let mut prev = (0..=n).collect::<Vec<_>>();
    let mut curr = vec![0; n + 1];

    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = usize::from(a_chars[i - 1] != b_chars[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

#[cfg(test)]
mod suggest_tests {
    use super::*;

    #[test]
    fn distance_basics() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("abc", "abc"), 0);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("add5", "abd5"), 1);
    }

    #[test]
    fn close_names_first() {
        let candidates = ["counter", "count", "pointer"];
        let matches = closest_matches("cont", candidates);
        assert_eq!(matches.first(), Some(&"count"));
    }

    #[test]
    fn cutoff_scales_with_best() {
        // best = 0, cutoff = 2: only distances 0 and 1 survive.
        let matches = closest_matches("add5", ["add5", "add6", "dec5", "set250"]);
        assert!(matches.contains(&"add5"));
        assert!(matches.contains(&"add6"));
        assert!(!matches.contains(&"set250"));
    }

    #[test]
    fn capped_at_ten() {
        let names: Vec<String> = (0..30).map(|i| format!("x{}", i)).collect();
        let matches = closest_matches("x", names.iter().map(String::as_str));
        assert!(matches.len() <= 10);
    }

    #[test]
    fn no_candidates_no_note() {
        assert_eq!(suggestion_note("ghost", []), None);
    }

    #[test]
    fn note_lists_backticked_names() {
        let note = suggestion_note("abd5", ["add5"]).unwrap();
        assert_eq!(note, "did you mean `add5`?");
    }
}
