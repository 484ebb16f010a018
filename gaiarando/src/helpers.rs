use gaiarando_game::{GameData, ItemCategory, ItemId, LogicEdge, RegionId};
use hashbrown::HashMap;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::{
    randomize::RandomizeError,
    settings::{Difficulty, Goal, LogicMode, RandomizerSettings, RequiredStatues},
};

/// Statue items in catalog order; `statue_K` refers to the K-th entry.
pub fn get_statue_items(game_data: &GameData) -> Vec<ItemId> {
    game_data
        .items
        .iter()
        .enumerate()
        .filter(|(_, x)| x.category == ItemCategory::Statue)
        .map(|(i, _)| i)
        .collect()
}

pub fn choose_required_statues<R: Rng>(
    settings: &RandomizerSettings,
    game_data: &GameData,
    rng: &mut R,
) -> Result<Vec<ItemId>, RandomizeError> {
    let statues = get_statue_items(game_data);
    let mut out: Vec<ItemId> = match &settings.required_statues {
        RequiredStatues::Count(n) => {
            if *n > statues.len() {
                return Err(RandomizeError::Configuration(format!(
                    "{} required statues requested but only {} exist",
                    n,
                    statues.len()
                )));
            }
            let mut shuffled = statues.clone();
            shuffled.shuffle(rng);
            shuffled.truncate(*n);
            shuffled
        }
        RequiredStatues::Specific(numbers) => {
            let mut v = vec![];
            for &k in numbers {
                if k == 0 || k > statues.len() {
                    return Err(RandomizeError::Configuration(format!(
                        "statue number {k} out of range 1..={}",
                        statues.len()
                    )));
                }
                v.push(statues[k - 1]);
            }
            v
        }
    };
    out.sort();
    out.dedup();
    Ok(out)
}

pub fn get_template_values(
    settings: &RandomizerSettings,
    game_data: &GameData,
    required_statues: &[ItemId],
) -> HashMap<String, usize> {
    let mut values: HashMap<String, usize> = HashMap::new();
    for (i, &amount) in settings.jeweler_amounts.iter().enumerate() {
        values.insert(format!("jeweler_{}", i + 1), amount);
    }
    if settings.goal == Goal::RedJewelHunt {
        values.insert("jewel_hunt".to_string(), settings.jewel_hunt_amount);
    }
    for (i, statue) in get_statue_items(game_data).into_iter().enumerate() {
        let required = required_statues.contains(&statue);
        values.insert(format!("statue_{}", i + 1), required as usize);
    }
    values
}

/// Builds the run's edge set. Edges whose templates are undefined for this run are dropped.
pub fn resolve_edges(game_data: &GameData, values: &HashMap<String, usize>) -> Vec<LogicEdge> {
    game_data
        .edge_templates
        .iter()
        .filter_map(|t| t.resolve(values))
        .collect()
}

pub fn check_edge_feasibility(
    game_data: &GameData,
    edges: &[LogicEdge],
) -> Result<(), RandomizeError> {
    for edge in edges {
        for &(item, count) in &edge.requirement.items {
            if count > game_data.items[item].count {
                return Err(RandomizeError::Configuration(format!(
                    "edge {} -> {} requires {} x{} but only {} exist",
                    game_data.region_name(edge.from),
                    game_data.region_name(edge.to),
                    game_data.item_name(item),
                    count,
                    game_data.items[item].count
                )));
            }
        }
    }
    Ok(())
}

/// Items in requirements of edges entering the goal region or a region holding a
/// required statue.
pub fn get_required_items(
    game_data: &GameData,
    edges: &[LogicEdge],
    goal_region: RegionId,
    required_statues: &[ItemId],
    placed_items: &[Option<ItemId>],
) -> Vec<bool> {
    let mut key_regions: Vec<RegionId> = vec![goal_region];
    for (loc_id, placed) in placed_items.iter().enumerate() {
        if let Some(item) = placed {
            if required_statues.contains(item) {
                key_regions.push(game_data.item_locations[loc_id].region);
            }
        }
    }
    let mut required = vec![false; game_data.items.len()];
    for edge in edges {
        if key_regions.contains(&edge.to) {
            for &(item, _) in &edge.requirement.items {
                required[item] = true;
            }
        }
    }
    required
}

pub fn get_required_item_boost(logic_mode: LogicMode, difficulty: Difficulty) -> f64 {
    let mode_factor = match logic_mode {
        LogicMode::Completable => 2.0,
        LogicMode::Beatable => 5.0,
        LogicMode::Unconstrained => 10.0,
    };
    let difficulty_factor = match difficulty {
        Difficulty::Easy => 1.5,
        Difficulty::Normal => 1.0,
        Difficulty::Hard => 0.75,
        Difficulty::Extreme => 0.5,
    };
    f64::max(mode_factor * difficulty_factor, 1.0)
}
