/// Minimum normalized Levenshtein similarity for a suggestion.
const THRESHOLD: f64 = 0.55;

/// Closest known id to `needle`, if any is similar enough.
///
/// Ties keep the first candidate, so callers iterating a sorted index get a
/// deterministic answer.
pub fn closest_id<'a>(needle: &str, hay: impl Iterator<Item = &'a str>) -> Option<String> {
    let mut best: Option<(&str, f64)> = None;

    for candidate in hay {
        let sim = strsim::normalized_levenshtein(needle, candidate);
        if sim >= THRESHOLD && best.map_or(true, |(_, b)| sim > b) {
            best = Some((candidate, sim));
        }
    }
    best.map(|(id, _)| id.to_string())
}
