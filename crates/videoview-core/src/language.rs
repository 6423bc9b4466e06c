//! Language-preference matching
//!
//! Tags are compared subtag by subtag (`zh-hant-tw` → `zh`, `hant`, `tw`),
//! ASCII case-insensitively:
//!
//! - tier 1: first subtags equal
//! - tier 2: tier 1 and second subtags equal
//! - tier 3: tier 2 and third subtags equal, returned on the spot
//!
//! Without a tier 3 hit the tier 2 set is consulted, then the tier 1 set. Inside
//! a set the candidate with the fewest subtags wins, the first one on ties, so
//! a request for `en` picks `en` over `en-US`.

use crate::types::TrackId;

/// Split a language tag into its subtags
pub fn subtags(tag: &str) -> Vec<&str> {
    tag.split('-').collect()
}

/// Best candidate for `requested`, or `None` when nothing shares its primary
/// language. An empty request never matches.
pub fn best_match<'a, I>(requested: &str, candidates: I) -> Option<TrackId>
where
    I: IntoIterator<Item = (TrackId, &'a str)>,
{
    let requested = requested.trim();
    if requested.is_empty() {
        return None;
    }
    let wanted = subtags(requested);

    let mut primary: Vec<(TrackId, usize)> = Vec::new();
    let mut regional: Vec<(TrackId, usize)> = Vec::new();
    for (id, tag) in candidates {
        let have = subtags(tag);
        if !wanted[0].eq_ignore_ascii_case(have[0]) {
            continue;
        }
        primary.push((id, have.len()));
        if wanted.len() > 1 && have.len() > 1 && wanted[1].eq_ignore_ascii_case(have[1]) {
            regional.push((id, have.len()));
            if wanted.len() > 2 && have.len() > 2 && wanted[2].eq_ignore_ascii_case(have[2]) {
                return Some(id);
            }
        }
    }

    least_specific(&regional).or_else(|| least_specific(&primary))
}

fn least_specific(matches: &[(TrackId, usize)]) -> Option<TrackId> {
    // min_by_key keeps the first of equal minima
    matches.iter().min_by_key(|(_, count)| *count).map(|(id, _)| *id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(pairs: &[(u32, &'static str)]) -> Vec<(TrackId, &'static str)> {
        pairs.iter().map(|(id, tag)| (TrackId(*id), *tag)).collect()
    }

    #[test]
    fn test_generic_tag_wins_primary_tie() {
        let candidates = ids(&[(1, "en-US"), (2, "en")]);
        assert_eq!(best_match("en", candidates), Some(TrackId(2)));
    }

    #[test]
    fn test_region_match_preferred() {
        let candidates = ids(&[(1, "en"), (2, "en-GB"), (3, "en-US")]);
        assert_eq!(best_match("en-US", candidates), Some(TrackId(3)));
    }

    #[test]
    fn test_falls_back_to_primary_language() {
        let candidates = ids(&[(1, "pt-BR"), (2, "pt-PT-x"), (3, "es")]);
        assert_eq!(best_match("pt-AO", candidates), Some(TrackId(1)));
    }

    #[test]
    fn test_first_wins_exact_tie() {
        let candidates = ids(&[(7, "de-AT"), (3, "de-CH")]);
        assert_eq!(best_match("de", candidates), Some(TrackId(7)));
    }

    #[test]
    fn test_case_insensitive() {
        let candidates = ids(&[(1, "zh-Hant"), (2, "zh-Hans")]);
        assert_eq!(best_match("zh-hans", candidates), Some(TrackId(2)));
    }

    #[test]
    fn test_exact_three_subtag_match_stops_scanning() {
        let candidates = ids(&[(1, "zh"), (2, "zh-hant-tw"), (3, "zh-hant-tw"), (4, "zh-hant")]);
        let mut scanned = 0;
        let result = best_match("zh-Hant-TW", candidates.into_iter().inspect(|_| scanned += 1));
        assert_eq!(result, Some(TrackId(2)));
        assert_eq!(scanned, 2);
    }

    #[test]
    fn test_no_match() {
        assert_eq!(best_match("en", ids(&[(1, "fr-CA")])), None);
        assert_eq!(best_match("en", Vec::new()), None);
        assert_eq!(best_match("", ids(&[(1, "")])), None);
    }

    #[test]
    fn test_single_candidate_set() {
        assert_eq!(best_match("en-US-x", ids(&[(9, "en")])), Some(TrackId(9)));
    }
}
