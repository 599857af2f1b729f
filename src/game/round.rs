// src/game/round.rs

use std::collections::BTreeSet;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::{error::AppError, models::question::QuestionRecord};

/// Category value that disables the category filter.
pub const ALL_CATEGORIES: &str = "ALL";

/// Selects and shuffles the questions for one round.
///
/// * Keeps records whose book or category contains `category` (all records for "ALL" or blank).
/// * Drops records already in `used_ids` unless `allow_duplicate`.
/// * Shuffles the remainder uniformly.
pub fn build_queue<R: Rng + ?Sized>(
    pool: &[QuestionRecord],
    category: &str,
    allow_duplicate: bool,
    used_ids: &BTreeSet<i64>,
    rng: &mut R,
) -> Result<Vec<QuestionRecord>, AppError> {
    if pool.is_empty() {
        return Err(AppError::PoolEmpty);
    }

    let needle = category.trim();
    let filter_category = !needle.is_empty() && needle != ALL_CATEGORIES;

    let mut queue: Vec<QuestionRecord> = pool
        .iter()
        .filter(|q| !filter_category || q.matches_category(needle))
        .filter(|q| allow_duplicate || !used_ids.contains(&q.id))
        .cloned()
        .collect();

    if queue.is_empty() {
        return Err(AppError::RoundFilterExhausted {
            category: category.to_string(),
        });
    }

    queue.shuffle(rng);
    Ok(queue)
}
