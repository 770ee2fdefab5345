//! Text similarity helpers
//!
//! Pure functions used to decide whether two recognized strings describe the
//! same on-screen phrase, plus the character clean-up shared with the scorer.

use regex::Regex;
use std::sync::LazyLock;
use std::time::{Duration, Instant};
use tracing::warn;

/// Time budget for a single noise-stripping pass
pub const NOISE_MATCH_BUDGET: Duration = Duration::from_millis(500);

/// Deadline is checked once per this many matches
const DEADLINE_CHECK_INTERVAL: usize = 64;

/// Everything except word characters, `.`, `!`, `?`, `,`, apostrophe and space
static NOISE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w.!?,' ]").expect("noise pattern is valid"));

/// Accented and special characters the recognizer tends to hallucinate.
/// `Œ` is counted but has no transliteration.
const ACCENTED_CHARS: &str = "àÀâÂäÄáÁéÉèÈêÊëËìÌîÎïÏòÒôÔöÖùÙûÛüÜçÇ’ñŒ•";

/// One-to-one transliteration table
const TRANSLITERATIONS: [(char, char); 39] = [
    ('à', 'a'),
    ('À', 'A'),
    ('â', 'a'),
    ('Â', 'A'),
    ('ä', 'a'),
    ('Ä', 'A'),
    ('á', 'a'),
    ('Á', 'A'),
    ('é', 'e'),
    ('É', 'E'),
    ('è', 'e'),
    ('È', 'E'),
    ('ê', 'e'),
    ('Ê', 'E'),
    ('ë', 'e'),
    ('Ë', 'E'),
    ('ì', 'i'),
    ('Ì', 'I'),
    ('î', 'i'),
    ('Î', 'I'),
    ('ï', 'i'),
    ('Ï', 'I'),
    ('ò', 'o'),
    ('Ò', 'O'),
    ('ô', 'o'),
    ('Ô', 'O'),
    ('ö', 'o'),
    ('Ö', 'O'),
    ('ù', 'u'),
    ('Ù', 'U'),
    ('û', 'u'),
    ('Û', 'U'),
    ('ü', 'u'),
    ('Ü', 'U'),
    ('ç', 'c'),
    ('Ç', 'C'),
    ('’', '\''),
    ('ñ', 'n'),
    ('•', ' '),
];

/// Damerau-Levenshtein distance (optimal string alignment variant)
///
/// Insertion, deletion, substitution and adjacent transposition each cost 1.
/// Operates on chars, so an empty string against `s` yields `s`'s length.
pub fn edit_distance(a: &str, b: &str) -> usize {
    strsim::osa_distance(a, b)
}

/// Character-bigram similarity in `[0, 1]`
///
/// Both strings are uppercased and split into words; each word contributes
/// its consecutive letter pairs. Matches are consumed one-to-one so a run of
/// repeated pairs cannot match the same pair on the other side twice.
/// Returns 0.0 when neither string has any pair.
pub fn bigram_similarity(a: &str, b: &str) -> f64 {
    let pairs_a = word_letter_pairs(a);
    let mut pairs_b = word_letter_pairs(b);

    let union = pairs_a.len() + pairs_b.len();
    if union == 0 {
        return 0.0;
    }

    let mut intersection = 0usize;
    for pair in &pairs_a {
        if let Some(pos) = pairs_b.iter().position(|p| p == pair) {
            pairs_b.remove(pos);
            intersection += 1;
        }
    }

    (2.0 * intersection as f64) / union as f64
}

/// Letter pairs of every whitespace-separated word, uppercased
fn word_letter_pairs(s: &str) -> Vec<(char, char)> {
    s.to_uppercase()
        .split_whitespace()
        .flat_map(|word| {
            let chars: Vec<char> = word.chars().collect();
            chars
                .windows(2)
                .map(|pair| (pair[0], pair[1]))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Number of accented/special characters in `s`
pub fn count_accented(s: &str) -> usize {
    s.chars().filter(|c| ACCENTED_CHARS.contains(*c)).count()
}

/// Replace accented characters with their closest plain-ASCII equivalent
pub fn strip_accents(s: &str) -> String {
    s.chars()
        .map(|c| {
            TRANSLITERATIONS
                .iter()
                .find(|(from, _)| *from == c)
                .map(|(_, to)| *to)
                .unwrap_or(c)
        })
        .collect()
}

/// Remove every character outside the allowed set
///
/// Fails soft: if matching exceeds [`NOISE_MATCH_BUDGET`] the result is an
/// empty string.
pub fn strip_noise(s: &str) -> String {
    strip_noise_within(s, NOISE_MATCH_BUDGET)
}

/// [`strip_noise`] with an explicit time budget
pub fn strip_noise_within(s: &str, budget: Duration) -> String {
    let deadline = Instant::now() + budget;
    let mut cleaned = String::with_capacity(s.len());
    let mut last = 0;

    // Matching is linear time, so a per-match deadline check bounds the pass
    for (n, m) in NOISE_PATTERN.find_iter(s).enumerate() {
        if n % DEADLINE_CHECK_INTERVAL == 0 && Instant::now() >= deadline {
            warn!(
                "Noise stripping exceeded {:?} on {} bytes, dropping text",
                budget,
                s.len()
            );
            return String::new();
        }
        cleaned.push_str(&s[last..m.start()]);
        last = m.end();
    }
    cleaned.push_str(&s[last..]);

    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_distance_identity_and_empty() {
        for s in ["", "a", "Hallo daar", "ëën één"] {
            assert_eq!(edit_distance(s, s), 0);
            assert_eq!(edit_distance("", s), s.chars().count());
            assert_eq!(edit_distance(s, ""), s.chars().count());
        }
    }

    #[test]
    fn test_edit_distance_transposition_costs_one() {
        assert_eq!(edit_distance("ab", "ba"), 1);
        assert_eq!(edit_distance("Hlalo daar", "Hallo daar"), 1);
    }

    #[test]
    fn test_edit_distance_classic() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        // Restricted variant: no edits inside a transposed pair
        assert_eq!(edit_distance("ca", "abc"), 3);
    }

    #[test]
    fn test_bigram_identical() {
        assert!((bigram_similarity("Hallo daar", "Hallo daar") - 1.0).abs() < 1e-9);
        assert!((bigram_similarity("hallo", "HALLO") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_bigram_symmetric() {
        let pairs = [
            ("Tot ziens", "Nieuwe scene hier"),
            ("GGGG", "GG"),
            ("Hallo daar", "Hallo daar vriend"),
            ("a", "ab cd"),
        ];
        for (a, b) in pairs {
            assert_eq!(bigram_similarity(a, b), bigram_similarity(b, a));
        }
    }

    #[test]
    fn test_bigram_consumes_matches_once() {
        // GGGG has three GG pairs, GG only one
        let sim = bigram_similarity("GGGG", "GG");
        assert!((sim - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_bigram_ignores_single_letter_words() {
        assert_eq!(bigram_similarity("a b c", "a b c"), 0.0);
        assert_eq!(bigram_similarity("", ""), 0.0);
    }

    #[test]
    fn test_bigram_unrelated_is_low() {
        let sim = bigram_similarity("Tot ziens", "Nieuwe scene hier");
        assert!((sim - 4.0 / 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_count_accented() {
        assert_eq!(count_accented("Hallo daar"), 0);
        assert_eq!(count_accented("één café’s • Œuvre"), 6);
    }

    #[test]
    fn test_strip_accents() {
        assert_eq!(strip_accents("één café’s•ñ"), "een cafe's n");
        assert_eq!(strip_accents("Œ"), "Œ");
    }

    #[test]
    fn test_strip_accents_idempotent() {
        for s in ["één café’s•ñ", "ÀÂÄÁÉÈÊËÌÎÏÒÔÖÙÛÜÇ", "plain", "Œuvre"] {
            let once = strip_accents(s);
            assert_eq!(strip_accents(&once), once);
        }
    }

    #[test]
    fn test_strip_noise_keeps_allowed() {
        assert_eq!(strip_noise("Hallo, daar! Wat? Ja. 't_is"), "Hallo, daar! Wat? Ja. 't_is");
        assert_eq!(strip_noise("Hal#lo \"daar\" (nu)\n"), "Hallo daar nu");
        assert_eq!(strip_noise("één"), "één");
    }

    #[test]
    fn test_strip_noise_budget_exceeded_fails_soft() {
        assert_eq!(strip_noise_within("a#b", Duration::ZERO), "");
        // No matches means no matching work to bound
        assert_eq!(strip_noise_within("ab", Duration::ZERO), "ab");
    }
}
