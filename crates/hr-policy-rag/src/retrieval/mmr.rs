//! Maximal marginal relevance selection

use super::store::{cosine_similarity, ScoredEntry};

/// Greedily pick up to `k` candidates balancing relevance and diversity.
///
/// Each step scores the remaining candidates with
/// `lambda * sim(query, d) - (1 - lambda) * max(sim(d, s) for s in selected)`
/// and takes the best one; equal scores go to the earlier candidate. With a
/// `redundancy_threshold`, candidates whose similarity to an already selected
/// passage exceeds it are never picked, so the result can be shorter than `k`.
///
/// Returns indices into `candidates`, in selection order.
pub fn mmr_select(
    candidates: &[ScoredEntry<'_>],
    k: usize,
    lambda: f32,
    redundancy_threshold: Option<f32>,
) -> Vec<usize> {
    let mut selected: Vec<usize> = Vec::with_capacity(k.min(candidates.len()));
    // Max similarity of every candidate to the selected set so far
    let mut redundancy = vec![f32::NEG_INFINITY; candidates.len()];

    while selected.len() < k {
        let mut best: Option<(usize, f32)> = None;

        for (idx, candidate) in candidates.iter().enumerate() {
            if selected.contains(&idx) {
                continue;
            }

            let max_sim = if selected.is_empty() { 0.0 } else { redundancy[idx] };
            if let Some(threshold) = redundancy_threshold {
                if !selected.is_empty() && max_sim > threshold {
                    continue;
                }
            }

            let score = lambda * candidate.similarity - (1.0 - lambda) * max_sim;
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((idx, score)),
            }
        }

        let Some((chosen, _)) = best else {
            break;
        };
        selected.push(chosen);

        let chosen_embedding = &candidates[chosen].entry.embedding;
        for (idx, candidate) in candidates.iter().enumerate() {
            let sim = cosine_similarity(chosen_embedding, &candidate.entry.embedding);
            if sim > redundancy[idx] {
                redundancy[idx] = sim;
            }
        }
    }

    selected
}
