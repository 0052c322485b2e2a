//! Token combination engine.
//!
//! Find and replace tokens are expanded into every casing variant and every
//! separator-joined sequence. Both sides go through the exact same steps, so
//! the i-th find combination always lines up with the i-th replace
//! combination.

pub const SEPARATORS: [&str; 5] = [" ", "_", "-", ".", "/"];

/// Combination sets above this size are reported as a usage warning.
pub const LARGE_COMBINATION_COUNT: u128 = 1_000_000;

pub fn pad_tokens(mut tokens: Vec<String>, count: usize) -> Vec<String> {
    tokens.extend(std::iter::repeat_n(String::new(), count));
    tokens
}

/// Pads the shorter list with empty tokens so both lists have the same length.
pub fn align_token_lists(find: Vec<String>, replace: Vec<String>) -> (Vec<String>, Vec<String>) {
    let (find_len, replace_len) = (find.len(), replace.len());
    if find_len > replace_len {
        (find, pad_tokens(replace, find_len - replace_len))
    } else if replace_len > find_len {
        (pad_tokens(find, replace_len - find_len), replace)
    } else {
        (find, replace)
    }
}

/// Returns `[lower, UPPER, Title]` for `token`. The order is fixed.
pub fn casing_variants(token: &str) -> [String; 3] {
    [token.to_lowercase(), token.to_uppercase(), title_case(token)]
}

/// Uppercases the first letter of every run of letters and lowercases the rest.
pub fn title_case(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    let mut in_word = false;
    for ch in token.chars() {
        if ch.is_alphabetic() {
            if in_word {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(ch);
            in_word = false;
        }
    }
    out
}

/// Folds per-token option lists into one flat list of joined strings.
///
/// The fold runs right to left: `[a, b, c]` becomes `pair(a, pair(b, c))`.
pub fn combine(options: &[Vec<String>], separators: &[&str]) -> Vec<String> {
    let Some((last, rest)) = options.split_last() else {
        return Vec::new();
    };

    let mut acc = last.clone();
    for first in rest.iter().rev() {
        acc = combine_pair(first, &acc, separators);
    }
    acc
}

fn combine_pair(first: &[String], second: &[String], separators: &[&str]) -> Vec<String> {
    let mut out = Vec::with_capacity(first.len() * second.len() * (separators.len() + 1));
    for head in first {
        for tail in second {
            out.push(format!("{head}{tail}"));
            if tail.is_empty() {
                // one dummy per separator keeps both sides index-aligned
                for _ in separators {
                    out.push(head.clone());
                }
            } else {
                for sep in separators {
                    out.push(format!("{head}{sep}{tail}"));
                }
            }
        }
    }
    out
}

pub fn compute_combinations(tokens: &[String]) -> Vec<String> {
    let options: Vec<Vec<String>> = tokens
        .iter()
        .map(|token| casing_variants(token).to_vec())
        .collect();
    combine(&options, &SEPARATORS)
}

/// Number of combinations `compute_combinations` yields for `tokens` tokens.
pub fn combination_count(tokens: usize) -> u128 {
    if tokens == 0 {
        return 0;
    }
    let per_pair = (SEPARATORS.len() + 1) as u128;
    let exp = u32::try_from(tokens).unwrap_or(u32::MAX);
    3u128
        .saturating_pow(exp)
        .saturating_mul(per_pair.saturating_pow(exp - 1))
}
