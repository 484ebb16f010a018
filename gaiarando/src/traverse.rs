use std::collections::VecDeque;

use gaiarando_game::{EdgeIdx, GameData, ItemId, LogicEdge, RegionId};
use gaiarando_logic::Inventory;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraverseResult {
    pub reached: Vec<bool>,
    // Items held after harvesting every reached location and stripping consumed items.
    pub held: Inventory,
}

impl TraverseResult {
    pub fn num_reached(&self) -> usize {
        self.reached.iter().filter(|&&x| x).count()
    }
}

pub fn get_edges_by_origin(num_regions: usize, edges: &[LogicEdge]) -> Vec<Vec<EdgeIdx>> {
    let mut out: Vec<Vec<EdgeIdx>> = vec![vec![]; num_regions];
    for (i, edge) in edges.iter().enumerate() {
        out[edge.from].push(i);
    }
    out
}

/// Breadth-first fixed point over the region graph. Every call starts from a clean slate,
/// so there is no reached state to reset between calls.
pub fn traverse(
    game_data: &GameData,
    edges: &[LogicEdge],
    start_region: RegionId,
    starting_items: &Inventory,
    placed_items: &[Option<ItemId>],
) -> TraverseResult {
    let num_regions = game_data.regions.len();
    let edges_by_origin = get_edges_by_origin(num_regions, edges);
    let mut reached = vec![false; num_regions];
    let mut held = starting_items.clone();
    let mut queue: VecDeque<RegionId> = VecDeque::new();
    queue.push_back(start_region);

    while let Some(region_id) = queue.pop_front() {
        if !reached[region_id] {
            reached[region_id] = true;
            let region = &game_data.regions[region_id];
            for &neighbor in &region.neighbors {
                if !reached[neighbor] {
                    queue.push_back(neighbor);
                }
            }
            let mut found_item = false;
            for &loc_id in &game_data.region_locations[region_id] {
                if let Some(item) = placed_items[loc_id] {
                    held.add(item, 1);
                    found_item = true;
                }
            }
            held.strip(&region.items_to_strip);
            if found_item {
                // A new item may open edges out of regions visited earlier.
                for r in 0..num_regions {
                    if reached[r] && r != region_id {
                        queue.push_back(r);
                    }
                }
            }
        }
        for &edge_idx in &edges_by_origin[region_id] {
            let edge = &edges[edge_idx];
            if !reached[edge.to] && held.satisfies(&edge.requirement) {
                queue.push_back(edge.to);
            }
        }
    }

    TraverseResult { reached, held }
}

/// Edges leading out of the reached set that are not yet traversable.
pub fn get_frontier_edges(edges: &[LogicEdge], reached: &[bool]) -> Vec<EdgeIdx> {
    edges
        .iter()
        .enumerate()
        .filter(|(_, e)| reached[e.from] && !reached[e.to])
        .map(|(i, _)| i)
        .collect()
}
