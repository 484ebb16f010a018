use gaiarando_game::{GameData, LogicEdge, Requirement};
use gaiarando_logic::Inventory;

use crate::traverse::get_frontier_edges;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgressionResult {
    // Deduplicated residual requirements that could be placed now.
    Candidates(Vec<Requirement>),
    // No frontier edge is satisfiable with the open locations.
    NoEdges,
    // Satisfiable edges exist but each would overflow the inventory.
    AllOverBudget,
}

pub fn progression_list(
    game_data: &GameData,
    edges: &[LogicEdge],
    reached: &[bool],
    held: &Inventory,
    pool: &[usize],
    open_counts: &[usize; 3],
    max_inventory: usize,
) -> ProgressionResult {
    let mut candidates: Vec<Requirement> = vec![];
    let mut num_over_budget = 0;
    for edge_idx in get_frontier_edges(edges, reached) {
        let residual = held.residual(&edges[edge_idx].requirement);
        if residual.is_empty() {
            continue;
        }
        if residual.items.iter().any(|&(item, count)| pool[item] < count) {
            continue;
        }
        let mut needed = [0usize; 3];
        for &(item, count) in &residual.items {
            needed[game_data.items[item].category.idx()] += count;
        }
        if (0..3).any(|c| needed[c] > open_counts[c]) {
            continue;
        }
        let mut simulated = held.clone();
        simulated.add_requirement(&residual);
        if simulated.occupied_slots(&game_data.items) > max_inventory {
            num_over_budget += 1;
            continue;
        }
        candidates.push(residual);
    }
    candidates.sort();
    candidates.dedup();

    if !candidates.is_empty() {
        ProgressionResult::Candidates(candidates)
    } else if num_over_budget > 0 {
        ProgressionResult::AllOverBudget
    } else {
        ProgressionResult::NoEdges
    }
}
