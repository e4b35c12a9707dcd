use testdelta_types::TestError;

const TYPE_WEIGHT: f64 = 0.4;
const MESSAGE_WEIGHT: f64 = 0.6;

/// Score how alike `error` is to a cluster's representative, in `0.0..=1.0`.
///
/// An exact (case-sensitive) type match contributes 0.4, message edit
/// similarity up to 0.6.
pub fn similarity_score(error: &TestError, cluster_type: &str, cluster_message: &str) -> f64 {
    let type_score = if error.error_type == cluster_type {
        TYPE_WEIGHT
    } else {
        0.0
    };
    let message_score = MESSAGE_WEIGHT * message_similarity(&error.message, cluster_message);
    (type_score + message_score).min(1.0)
}

/// Normalized edit similarity: `(len(longer) - distance) / len(longer)`.
///
/// Two empty strings are identical (1.0). Lengths are counted in chars.
pub fn message_similarity(a: &str, b: &str) -> f64 {
    let a_len = a.chars().count();
    let b_len = b.chars().count();
    let longer_len = a_len.max(b_len);

    if longer_len == 0 {
        return 1.0;
    }

    let distance = edit_distance(a, b);
    (longer_len - distance) as f64 / longer_len as f64
}

/// Levenshtein distance over chars with unit costs.
///
/// Keeps a single cost row sized to the shorter input.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (longer, shorter) = if a.len() >= b.len() { (a, b) } else { (b, a) };

    let mut costs: Vec<usize> = (0..=shorter.len()).collect();

    for (i, lc) in longer.iter().enumerate() {
        // costs[j] still holds the previous row until overwritten
        let mut diagonal = costs[0];
        costs[0] = i + 1;
        for (j, sc) in shorter.iter().enumerate() {
            let above = costs[j + 1];
            costs[j + 1] = if lc == sc {
                diagonal
            } else {
                1 + diagonal.min(above).min(costs[j])
            };
            diagonal = above;
        }
    }

    costs[shorter.len()]
}

/// Cut `s` to at most `max` chars, on a char boundary.
pub(crate) fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
