//! Name normalization and fuzzy matching helpers.
//!
//! Category, account and budget names come from two independent sources (the
//! rule sheet and the ledger) and are edited by hand on both sides, so every
//! comparison goes through [`normalize_key`].

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// Lowercase, accent-free, symbol-free comparison key.
///
/// Emoji and punctuation collapse into single spaces, so `"🏠 Rent"` and
/// `"rent"` produce the same key. Returns `None` when nothing alphanumeric
/// is left.
///
/// ```rust
/// use engine::normalize_key;
///
/// assert_eq!(normalize_key("🏠 Rent").as_deref(), Some("rent"));
/// assert_eq!(normalize_key("Caffè  & Bar").as_deref(), Some("caffe bar"));
/// assert_eq!(normalize_key(" 🎉 "), None);
/// ```
#[must_use]
pub fn normalize_key(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut out = String::new();
    let mut prev_space = false;
    for ch in trimmed.nfkd() {
        if is_combining_mark(ch) {
            continue;
        }
        if ch.is_alphanumeric() {
            for lower in ch.to_lowercase() {
                out.push(lower);
            }
            prev_space = false;
        } else if !out.is_empty() && !prev_space {
            out.push(' ');
            prev_space = true;
        }
    }
    let normalized = out.trim();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized.to_string())
    }
}

/// Display form of a name: symbols outside the Basic Multilingual Plane
/// (emoji) removed and whitespace collapsed.
#[must_use]
pub fn normalize_display(input: &str) -> Option<String> {
    let stripped: String = input.chars().filter(|ch| u32::from(*ch) < 0x1_0000).collect();
    let mut out = String::new();
    for token in stripped.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(token);
    }
    if out.is_empty() { None } else { Some(out) }
}

/// `true` when both names produce the same [`normalize_key`].
#[must_use]
pub fn same_name(left: &str, right: &str) -> bool {
    match (normalize_key(left), normalize_key(right)) {
        (Some(left), Some(right)) => left == right,
        _ => false,
    }
}

/// Index of the candidate that best matches `query`.
///
/// A case-insensitive substring hit wins (first one in order); otherwise the
/// closest candidate by edit distance is returned if it is within the
/// similarity threshold of the query length.
#[must_use]
pub fn closest_name<S: AsRef<str>>(query: &str, candidates: &[S]) -> Option<usize> {
    let query = normalize_key(query)?;
    let keys: Vec<Option<String>> = candidates
        .iter()
        .map(|candidate| normalize_key(candidate.as_ref()))
        .collect();

    if let Some(index) = keys
        .iter()
        .position(|key| key.as_deref().is_some_and(|key| key.contains(query.as_str())))
    {
        return Some(index);
    }

    let threshold = similarity_threshold(&query);
    let mut best: Option<(usize, usize)> = None;
    for (index, key) in keys.iter().enumerate() {
        let Some(key) = key else { continue };
        let distance = levenshtein(&query, key);
        if distance > threshold {
            continue;
        }
        if best.is_none_or(|(_, best_distance)| distance < best_distance) {
            best = Some((index, distance));
        }
    }
    best.map(|(index, _)| index)
}

fn similarity_threshold(input: &str) -> usize {
    let len = input.chars().count();
    if len <= 6 { 1 } else { 2 }
}

fn levenshtein(left: &str, right: &str) -> usize {
    let left: Vec<char> = left.chars().collect();
    let right: Vec<char> = right.chars().collect();

    if left.is_empty() {
        return right.len();
    }
    if right.is_empty() {
        return left.len();
    }

    let mut costs: Vec<usize> = (0..=right.len()).collect();

    for (i, left_char) in left.iter().enumerate() {
        let mut last_cost = i;
        costs[0] = i + 1;
        for (j, right_char) in right.iter().enumerate() {
            let next_cost = costs[j + 1];
            let cost = if left_char == right_char {
                last_cost
            } else {
                last_cost + 1
            };
            costs[j + 1] = cost.min(costs[j] + 1).min(next_cost + 1);
            last_cost = next_cost;
        }
    }

    costs[right.len()]
}
