//! Scoring and ranking of confirmed matches before the result cap is
//! applied (spec §4.8). Scoring favors exact-case, whole-word,
//! declaration-site matches — the same signals a developer's eye would
//! use to decide which hit to look at first — plus a handful of
//! weaker secondary signals (requested-kind match, proximity to the
//! start of the line, small enclosing file) and a down-weight applied
//! when the pattern was only heuristically, not explicitly, classified
//! as a regex.

use crate::symbols::Symbol;

#[derive(Debug, Clone)]
pub struct ScoredMatch<T> {
    pub item: T,
    pub score: f32,
}

/// Down-weight applied to a match's score when its pattern was
/// classified as a regex by the heuristic (spec §8 S3) rather than via
/// an explicit `force_regex`. Strictly between 0 and 1 so the match is
/// never zeroed out or left unweighted — a heuristically-detected
/// regex is less certain to be what the caller meant than a spelled-
/// out one, but still a real match.
pub const HEURISTIC_REGEX_MULTIPLIER: f32 = 0.5;

/// A file at or under this size gets the "small file" scoring bonus —
/// a match in a small, focused file is more likely to be the
/// definition site a caller is after than one in a sprawling file.
pub const SMALL_FILE_BYTES: u64 = 2_000;

/// Column beyond which the line-start-proximity bonus bottoms out to
/// zero.
const PROXIMITY_COLUMN_CEILING: f32 = 100.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreInputs {
    pub case_exact: bool,
    pub whole_word: bool,
    pub is_declaration: bool,
    pub reference_strength: Option<f32>,
    /// Whether the enclosing symbol's kind is one the caller's
    /// `symbol_kinds` filter asked for (always `false` when the
    /// filter left `symbol_kinds` empty — there's nothing to match).
    pub symbol_kind_matches: bool,
    /// 1-indexed column of the match within its line, for the
    /// line-start-proximity bonus.
    pub column: u32,
    /// Size in bytes of the file the match occurred in, for the
    /// small-file bonus.
    pub file_size_bytes: u64,
    /// Whether the pattern was classified as a regex by
    /// `looks_like_regex` rather than an explicit `force_regex`.
    pub heuristic_regex: bool,
}

/// Weighted sum of ranking signals, highest-first.
pub fn score(inputs: ScoreInputs, enclosing: Option<&Symbol>) -> f32 {
    let mut score = 1.0;
    if inputs.case_exact {
        score += 2.0;
    }
    if inputs.whole_word {
        score += 1.5;
    }
    if inputs.is_declaration {
        score += 3.0;
    }
    if let Some(strength) = inputs.reference_strength {
        score += strength;
    }
    if let Some(symbol) = enclosing {
        if symbol.is_exported {
            score += 0.5;
        }
    }
    if inputs.symbol_kind_matches {
        score += 0.75;
    }

    let proximity = 1.0 - (inputs.column as f32).min(PROXIMITY_COLUMN_CEILING) / PROXIMITY_COLUMN_CEILING;
    score += proximity * 0.5;

    if inputs.file_size_bytes > 0 && inputs.file_size_bytes <= SMALL_FILE_BYTES {
        score += 0.25;
    }

    if inputs.heuristic_regex {
        score *= HEURISTIC_REGEX_MULTIPLIER;
    }

    score
}

/// Sort `matches` by descending score (ties broken by original order,
/// i.e. a stable sort) and truncate to `cap`.
pub fn rank_and_cap<T>(mut matches: Vec<ScoredMatch<T>>, cap: usize) -> Vec<ScoredMatch<T>> {
    matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    matches.truncate(cap);
    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declaration_outranks_usage() {
        let decl = score(ScoreInputs { is_declaration: true, ..Default::default() }, None);
        let usage = score(ScoreInputs { is_declaration: false, ..Default::default() }, None);
        assert!(decl > usage);
    }

    #[test]
    fn rank_and_cap_sorts_descending_and_truncates() {
        let matches = vec![
            ScoredMatch { item: "a", score: 1.0 },
            ScoredMatch { item: "b", score: 5.0 },
            ScoredMatch { item: "c", score: 3.0 },
        ];
        let ranked = rank_and_cap(matches, 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].item, "b");
        assert_eq!(ranked[1].item, "c");
    }

    #[test]
    fn heuristic_regex_down_weights_strictly_between_zero_and_full_score() {
        let inputs = ScoreInputs { is_declaration: true, ..Default::default() };
        let plain = score(inputs, None);
        let heuristic = score(ScoreInputs { heuristic_regex: true, ..inputs }, None);
        assert!(heuristic > 0.0);
        assert!(heuristic < plain);
        assert!(heuristic >= plain * 0.0 && heuristic <= plain * 0.75);
    }

    #[test]
    fn symbol_kind_match_increases_score() {
        let base = score(ScoreInputs::default(), None);
        let with_kind = score(ScoreInputs { symbol_kind_matches: true, ..Default::default() }, None);
        assert!(with_kind > base);
    }

    #[test]
    fn closer_to_line_start_scores_higher() {
        let near = score(ScoreInputs { column: 1, ..Default::default() }, None);
        let far = score(ScoreInputs { column: 90, ..Default::default() }, None);
        assert!(near > far);
    }

    #[test]
    fn small_file_scores_higher_than_large_file() {
        let small = score(ScoreInputs { file_size_bytes: 500, ..Default::default() }, None);
        let large = score(ScoreInputs { file_size_bytes: 50_000, ..Default::default() }, None);
        assert!(small > large);
    }
}
