//! Case-insensitive literal search.
//!
//! Matching compares characters after simple lowercase folding, so
//! offsets are always in characters of the original text.

fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

fn matches_at(haystack: &[char], at: usize, needle: &[char]) -> bool {
    haystack.len() >= at + needle.len()
        && haystack[at..at + needle.len()]
            .iter()
            .zip(needle)
            .all(|(&h, &n)| fold(h) == fold(n))
}

/// Offset of the first match starting at or after `from`.
pub fn find_forward(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&at| matches_at(haystack, at, needle))
}

/// Offset of the last match starting at or before `from`.
pub fn find_backward(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    let last = from.min(haystack.len() - needle.len());
    (0..=last).rev().find(|&at| matches_at(haystack, at, needle))
}

/// Character columns of every non-overlapping match in `line`.
pub fn match_columns(line: &str, needle: &str) -> Vec<usize> {
    let haystack: Vec<char> = line.chars().collect();
    let needle: Vec<char> = needle.chars().collect();
    let mut columns = Vec::new();
    let mut from = 0;
    while let Some(at) = find_forward(&haystack, &needle, from) {
        columns.push(at);
        from = at + needle.len();
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_find_forward_ignores_case() {
        let hay = chars("Hello hello HELLO");
        let needle = chars("hello");
        assert_eq!(find_forward(&hay, &needle, 0), Some(0));
        assert_eq!(find_forward(&hay, &needle, 1), Some(6));
        assert_eq!(find_forward(&hay, &needle, 13), None);
    }

    #[test]
    fn test_find_backward() {
        let hay = chars("ab ab ab");
        let needle = chars("ab");
        assert_eq!(find_backward(&hay, &needle, 5), Some(3));
        assert_eq!(find_backward(&hay, &needle, 100), Some(6));
        assert_eq!(find_backward(&hay, &chars("zz"), 8), None);
    }

    #[test]
    fn test_match_columns_non_overlapping() {
        assert_eq!(match_columns("aaaa", "aa"), vec![0, 2]);
        assert_eq!(match_columns("Fn fn FN", "fn"), vec![0, 3, 6]);
        assert!(match_columns("abc", "").is_empty());
    }
}
