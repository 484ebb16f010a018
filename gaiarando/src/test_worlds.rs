use gaiarando_game::GameData;

use crate::settings::{RandomizerSettings, RequiredStatues};

// Start --Key--> Cave --Dash--> Tower --statues--> Goal
// Start --Gem x jeweler_1--> Vault, Start --Gem x jewel_hunt--> Hunt
pub const SMALL_WORLD: &str = r#"{
    "start_region": "Start",
    "goal_regions": {"DarkGaia": "Goal", "RedJewelHunt": "Hunt"},
    "items": [
        {"name": "Key", "category": "Item", "count": 1, "inventory": "Slot", "progression": "OpensLocations"},
        {"name": "Gem", "category": "Item", "count": 2, "inventory": "Stack", "progression": "OpensLocations"},
        {"name": "Apple", "category": "Item", "count": 1, "inventory": "Slot"},
        {"name": "Herb", "category": "Item", "count": 2, "easy_mode": true},
        {"name": "Nothing", "category": "Item", "count": 0, "filler": true, "easy_mode": true},
        {"name": "Dash", "category": "Ability", "count": 1, "progression": "OpensLocations"},
        {"name": "Void", "category": "Ability", "count": 0, "filler": true, "easy_mode": true},
        {"name": "Statue A", "category": "Statue", "count": 1, "progression": "OpensLocations"},
        {"name": "Statue B", "category": "Statue", "count": 1, "progression": "OpensLocations"}
    ],
    "regions": [
        {"name": "Start"},
        {"name": "Cave", "neighbors": ["Start"], "strip": [["Key", 1]]},
        {"name": "Tower", "neighbors": ["Cave"]},
        {"name": "Goal"},
        {"name": "Vault", "neighbors": ["Start"]},
        {"name": "Hunt"}
    ],
    "edges": [
        {"from": "Start", "to": "Cave", "requirement": [["Key", 1]]},
        {"from": "Cave", "to": "Tower", "requirement": [["Dash", 1]]},
        {"from": "Tower", "to": "Goal", "requirement": [["Statue A", "statue_1"], ["Statue B", "statue_2"]]},
        {"from": "Start", "to": "Vault", "requirement": [["Gem", "jeweler_1"]]},
        {"from": "Start", "to": "Hunt", "requirement": [["Gem", "jewel_hunt"]]}
    ],
    "locations": [
        {"name": "Start: Chest 1", "region": "Start", "slot": "Item"},
        {"name": "Start: Chest 2", "region": "Start", "slot": "Item"},
        {"name": "Start: Chest 3", "region": "Start", "slot": "Item"},
        {"name": "Start: Dark Space", "region": "Start", "slot": "Ability"},
        {"name": "Cave: Chest 1", "region": "Cave", "slot": "Item"},
        {"name": "Cave: Chest 2", "region": "Cave", "slot": "Item"},
        {"name": "Cave: Chest 3", "region": "Cave", "slot": "Item"},
        {"name": "Cave: Dark Space", "region": "Cave", "slot": "Ability"},
        {"name": "Cave: Statue", "region": "Cave", "slot": "Statue"},
        {"name": "Tower: Chest 1", "region": "Tower", "slot": "Item"},
        {"name": "Tower: Chest 2", "region": "Tower", "slot": "Item"},
        {"name": "Tower: Statue", "region": "Tower", "slot": "Statue"},
        {"name": "Vault: Prize", "region": "Vault", "slot": "Item", "forbidden": ["Gem"]}
    ],
    "dark_space_sets": [["Start: Dark Space", "Cave: Dark Space"]],
    "easy_mode_placements": [["Dash", "Start: Dark Space"]]
}"#;

pub fn small_world() -> GameData {
    GameData::from_json_str(SMALL_WORLD).unwrap()
}

pub fn small_settings() -> RandomizerSettings {
    RandomizerSettings {
        required_statues: RequiredStatues::Count(2),
        jeweler_amounts: [2, 2, 2, 2, 2, 2, 2],
        jewel_hunt_amount: 2,
        ..RandomizerSettings::default()
    }
}
