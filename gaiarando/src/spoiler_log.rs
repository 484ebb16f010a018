use gaiarando_game::{GameData, ItemId, RegionId};
use serde::{Deserialize, Serialize};

use crate::{
    randomize::PlacementLogEntry,
    settings::{Difficulty, Goal, LogicMode, RandomizerSettings},
};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SpoilerPlacement {
    pub step: usize,
    pub item: String,
    pub location: String,
    pub region: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SpoilerAssignment {
    pub location: String,
    pub region: String,
    pub item: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SpoilerLog {
    pub seed: u64,
    pub attempt_num: usize,
    pub logic_mode: LogicMode,
    pub goal: Goal,
    pub difficulty: Difficulty,
    pub start_region: String,
    pub required_statues: Vec<String>,
    // Placements in the order they were committed.
    pub placements: Vec<SpoilerPlacement>,
    pub assignment: Vec<SpoilerAssignment>,
}

pub fn get_spoiler_log(
    game_data: &GameData,
    settings: &RandomizerSettings,
    start_region: RegionId,
    seed: u64,
    attempt_num: usize,
    required_statues: &[ItemId],
    placement_log: &[PlacementLogEntry],
    item_placement: &[ItemId],
) -> SpoilerLog {
    let placements = placement_log
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let loc = &game_data.item_locations[entry.location];
            SpoilerPlacement {
                step: i + 1,
                item: game_data.item_name(entry.item).to_string(),
                location: loc.name.clone(),
                region: game_data.region_name(loc.region).to_string(),
            }
        })
        .collect();
    let assignment = item_placement
        .iter()
        .enumerate()
        .map(|(loc_id, &item)| {
            let loc = &game_data.item_locations[loc_id];
            SpoilerAssignment {
                location: loc.name.clone(),
                region: game_data.region_name(loc.region).to_string(),
                item: game_data.item_name(item).to_string(),
            }
        })
        .collect();
    SpoilerLog {
        seed,
        attempt_num,
        logic_mode: settings.logic_mode,
        goal: settings.goal,
        difficulty: settings.difficulty,
        start_region: game_data.region_name(start_region).to_string(),
        required_statues: required_statues
            .iter()
            .map(|&x| game_data.item_name(x).to_string())
            .collect(),
        placements,
        assignment,
    }
}

#[cfg(test)]
mod tests {
    use crate::randomize::Randomizer;
    use crate::test_worlds::{small_settings, small_world};

    #[test]
    fn test_spoiler_log_contents() {
        let game_data = small_world();
        let settings = small_settings();
        let randomizer = Randomizer::new(&game_data, &settings).unwrap();
        let randomization = randomizer.randomize(0, 11).unwrap();
        let spoiler = &randomization.spoiler_log;
        assert_eq!(spoiler.seed, 11);
        assert_eq!(spoiler.start_region, "Start");
        assert_eq!(spoiler.required_statues.len(), 2);
        assert_eq!(spoiler.assignment.len(), game_data.item_locations.len());
        // Every location is filled, and each fill is logged once.
        assert_eq!(spoiler.placements.len(), game_data.item_locations.len());
        let key_placement = spoiler.placements.iter().find(|x| x.item == "Key").unwrap();
        assert!(["Start", "Vault"].contains(&key_placement.region.as_str()));
        let json = serde_json::to_string(spoiler).unwrap();
        assert!(json.contains("\"logic_mode\":\"Completable\""));
    }
}
