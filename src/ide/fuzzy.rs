//! Fuzzy matching of a query against keyword names.

/// Score given to every candidate when the query is empty.
pub const UNIFORM_SCORE: f64 = 1.0;

const EXACT_BONUS: f64 = 3.0;
const PREFIX_BONUS: f64 = 2.0;
const SUBSTRING_BONUS: f64 = 1.0;
const WORD_START_WEIGHT: f64 = 0.5;

/// Score `candidate` against `query`, or `None` if it does not match.
///
/// A candidate matches when the query's characters appear in it in order,
/// ignoring case. Higher is better: exact names beat prefixes, prefixes beat
/// substrings, and query characters landing on word starts count extra.
pub fn score(query: &str, candidate: &str) -> Option<f64> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Some(UNIFORM_SCORE);
    }
    let name = candidate.to_lowercase();
    let word_starts = match_word_starts(&query, &name)?;

    let mut score = strsim::jaro_winkler(&query, &name);
    score += if name == query {
        EXACT_BONUS
    } else if name.starts_with(&query) {
        PREFIX_BONUS
    } else if name.contains(&query) {
        SUBSTRING_BONUS
    } else {
        0.0
    };
    score += WORD_START_WEIGHT * word_starts as f64 / query.chars().count() as f64;
    Some(score)
}

/// Match `query` as a subsequence of `name`, preferring word starts.
///
/// Returns how many query characters landed on the start of a word. A word
/// start is only taken if the rest of the query still fits after it.
fn match_word_starts(query: &str, name: &str) -> Option<usize> {
    let query: Vec<char> = query.chars().collect();
    let name: Vec<char> = name.chars().collect();
    let mut at = 0;
    let mut word_starts = 0;

    for (q, &wanted) in query.iter().enumerate() {
        let first = at + name.get(at..)?.iter().position(|&c| c == wanted)?;
        let preferred = (first..name.len()).find(|&i| {
            name[i] == wanted
                && is_word_start(&name, i)
                && is_subsequence(&query[q + 1..], &name[i + 1..])
        });
        at = match preferred {
            Some(i) => {
                word_starts += 1;
                i + 1
            }
            None => first + 1,
        };
    }
    Some(word_starts)
}

fn is_subsequence(needle: &[char], haystack: &[char]) -> bool {
    let mut rest = haystack.iter();
    needle.iter().all(|c| rest.any(|h| h == c))
}

fn is_word_start(name: &[char], i: usize) -> bool {
    i == 0 || !name[i - 1].is_alphanumeric()
}
