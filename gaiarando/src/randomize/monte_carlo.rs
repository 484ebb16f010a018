use gaiarando_game::{GameData, Requirement};
use rand::Rng;

/// Cumulative selection table (ending at 100) over `candidates`. A candidate's weight is the
/// chance of drawing its items without replacement from the remaining pool of each category,
/// multiplied by `boost` for every required item it contains.
pub fn weighted_candidates(
    game_data: &GameData,
    candidates: &[Requirement],
    pool: &[usize],
    required_items: &[bool],
    boost: f64,
) -> Vec<f64> {
    let mut category_totals = [0usize; 3];
    for (item, &count) in pool.iter().enumerate() {
        category_totals[game_data.items[item].category.idx()] += count;
    }

    let mut weights: Vec<f64> = Vec::with_capacity(candidates.len());
    for req in candidates {
        let mut weight = 1.0;
        let mut consumed = [0usize; 3];
        for &(item, count) in &req.items {
            let cat = game_data.items[item].category.idx();
            for k in 0..count {
                let remaining = pool[item].saturating_sub(k);
                let total = category_totals[cat].saturating_sub(consumed[cat]);
                if remaining == 0 || total == 0 {
                    weight = 0.0;
                } else {
                    weight *= remaining as f64 / total as f64;
                }
                consumed[cat] += 1;
            }
            if required_items[item] {
                weight *= boost;
            }
        }
        weights.push(weight);
    }

    let total: f64 = weights.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        weights.iter_mut().for_each(|w| *w = 1.0);
    }
    let total: f64 = weights.iter().sum();
    let mut table: Vec<f64> = Vec::with_capacity(weights.len());
    let mut cumulative = 0.0;
    for w in weights {
        cumulative += 100.0 * w / total;
        table.push(cumulative);
    }
    if let Some(last) = table.last_mut() {
        *last = 100.0;
    }
    table
}

pub fn select_candidate<R: Rng>(table: &[f64], rng: &mut R) -> usize {
    let draw: f64 = rng.gen_range(0.0..100.0);
    table
        .iter()
        .position(|&bound| bound >= draw)
        .unwrap_or(table.len().saturating_sub(1))
}
