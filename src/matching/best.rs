//! Order-independent selection of the best gallery score.

/// Best score of a 1:N search and the gallery index that produced it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchResult {
    /// Similarity in [0, 1].
    pub score: f32,
    /// Index into the gallery.
    pub index: usize,
}

/// Higher score wins; equal scores keep the lower index.
///
/// Associative and commutative, so any reduction order over the gallery
/// yields the same result.
#[inline]
pub(crate) fn better(a: MatchResult, b: MatchResult) -> MatchResult {
    match a.score.total_cmp(&b.score) {
        std::cmp::Ordering::Greater => a,
        std::cmp::Ordering::Less => b,
        std::cmp::Ordering::Equal => {
            if a.index <= b.index {
                a
            } else {
                b
            }
        }
    }
}

/// Best entry of `scores`, `None` when empty.
pub(crate) fn best_of(scores: impl IntoIterator<Item = f32>) -> Option<MatchResult> {
    scores
        .into_iter()
        .enumerate()
        .map(|(index, score)| MatchResult { score, index })
        .reduce(better)
}
