use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    db::CatalogStore,
    error::AppResult,
    models::{PeerSimilarityRecord, Rating},
};

/// Peers sharing fewer rated items than this are ignored
pub const MIN_SHARED_RATINGS: usize = 3;

/// Pearson correlation of two equally long rating vectors.
///
/// Computed over deviations from the mean. Returns 0 when either vector has
/// (numerically) zero variance or the inputs are empty; the result is always
/// within `[-1, 1]`.
pub fn pearson_correlation(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n == 0 {
        return 0.0;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    let nf = n as f64;

    let mean_x = xs.iter().sum::<f64>() / nf;
    let mean_y = ys.iter().sum::<f64>() / nf;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if negligible_variance(var_x, xs) || negligible_variance(var_y, ys) {
        return 0.0;
    }

    let r = cov / (var_x * var_y).sqrt();
    if !r.is_finite() {
        return 0.0;
    }
    r.clamp(-1.0, 1.0)
}

/// Sum of squared deviations indistinguishable from rounding noise
fn negligible_variance(sum_sq_dev: f64, values: &[f64]) -> bool {
    let scale = values.iter().fold(0.0_f64, |acc, v| acc.max(v * v));
    sum_sq_dev <= f64::EPSILON * values.len() as f64 * scale
}

/// Ranks peers by rating correlation with the target user.
///
/// `target` maps content id to the target user's rating; `peer_ratings` are
/// other users' ratings on any of those items. Peers with fewer than
/// [`MIN_SHARED_RATINGS`] items in common are dropped, at most `limit * 2` of
/// the most-overlapping remaining peers are scored, and negative correlations
/// are clamped to 0.
pub fn rank_peers(
    target: &HashMap<Uuid, f64>,
    peer_ratings: &[Rating],
    limit: usize,
) -> Vec<PeerSimilarityRecord> {
    if target.is_empty() || limit == 0 {
        return Vec::new();
    }

    // Grouped in first-seen order so equal scores keep a stable order
    let mut order: Vec<Uuid> = Vec::new();
    let mut shared: HashMap<Uuid, Vec<(f64, f64)>> = HashMap::new();
    for rating in peer_ratings {
        let Some(&mine) = target.get(&rating.content_id) else {
            continue;
        };
        shared
            .entry(rating.user_id)
            .or_insert_with(|| {
                order.push(rating.user_id);
                Vec::new()
            })
            .push((mine, rating.rating));
    }

    let mut candidates: Vec<(Uuid, Vec<(f64, f64)>)> = order
        .into_iter()
        .filter_map(|peer| shared.remove(&peer).map(|pairs| (peer, pairs)))
        .filter(|(_, pairs)| pairs.len() >= MIN_SHARED_RATINGS)
        .collect();
    candidates.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
    candidates.truncate(limit.saturating_mul(2));

    let mut records: Vec<PeerSimilarityRecord> = candidates
        .into_iter()
        .map(|(peer_user_id, pairs)| {
            let (xs, ys): (Vec<f64>, Vec<f64>) = pairs.iter().copied().unzip();
            let similarity = pearson_correlation(&xs, &ys).clamp(0.0, 1.0);
            PeerSimilarityRecord {
                peer_user_id,
                similarity_score: similarity,
                shared_rating_count: pairs.len(),
            }
        })
        .collect();

    records.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));
    records.truncate(limit);
    records
}

/// Finds the users whose ratings best correlate with `user_id`'s.
///
/// An empty result is normal: the user has no ratings, or nobody shares
/// enough rated items with them.
pub async fn find_similar_users(
    store: &dyn CatalogStore,
    user_id: Uuid,
    limit: usize,
) -> AppResult<Vec<PeerSimilarityRecord>> {
    let ratings = store.get_ratings(user_id).await?;
    find_similar_users_for(store, user_id, &ratings, limit).await
}

/// Same as [`find_similar_users`] for an already-loaded rating history
pub async fn find_similar_users_for(
    store: &dyn CatalogStore,
    user_id: Uuid,
    ratings: &[Rating],
    limit: usize,
) -> AppResult<Vec<PeerSimilarityRecord>> {
    let target: HashMap<Uuid, f64> = ratings.iter().map(|r| (r.content_id, r.rating)).collect();
    if target.is_empty() {
        return Ok(Vec::new());
    }

    let content_ids: Vec<Uuid> = target.keys().copied().collect();
    let peer_ratings = store.get_ratings_for_content(&content_ids, user_id).await?;

    let peers = rank_peers(&target, &peer_ratings, limit);

    tracing::debug!(
        user_id = %user_id,
        candidate_ratings = peer_ratings.len(),
        peers = peers.len(),
        "Ranked similar users"
    );

    Ok(peers)
}
