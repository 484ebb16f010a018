use anyhow::Result;
use serde::{Deserialize, Serialize};
use strum_macros::{EnumString, VariantNames};

#[derive(
    Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash, EnumString, VariantNames,
)]
pub enum LogicMode {
    // Every region must end up reachable.
    Completable,
    // Only the goal region must be reachable.
    Beatable,
    #[serde(alias = "Chaos")]
    #[strum(serialize = "Unconstrained", serialize = "Chaos")]
    Unconstrained,
}

#[derive(
    Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash, EnumString, VariantNames,
)]
pub enum Goal {
    DarkGaia,
    RedJewelHunt,
}

impl Goal {
    pub fn key(&self) -> &'static str {
        match self {
            Goal::DarkGaia => "DarkGaia",
            Goal::RedJewelHunt => "RedJewelHunt",
        }
    }
}

#[derive(
    Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash, EnumString, VariantNames,
)]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
    Extreme,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum RequiredStatues {
    // Number of statues, chosen at random each attempt.
    Count(usize),
    // 1-based statue numbers, in catalog order.
    Specific(Vec<usize>),
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ItemCount {
    pub item: String,
    pub count: usize,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct RandomizerSettings {
    pub seed: u64,
    pub logic_mode: LogicMode,
    pub goal: Goal,
    pub required_statues: RequiredStatues,
    pub difficulty: Difficulty,
    pub start_region: Option<String>,
    pub jeweler_amounts: [usize; 7],
    pub jewel_hunt_amount: usize,
    pub max_inventory: usize,
    pub max_cycles: usize,
    pub max_attempts: usize,
    pub starting_items: Vec<ItemCount>,
}

impl Default for RandomizerSettings {
    fn default() -> Self {
        RandomizerSettings {
            seed: 0,
            logic_mode: LogicMode::Completable,
            goal: Goal::DarkGaia,
            required_statues: RequiredStatues::Count(4),
            difficulty: Difficulty::Normal,
            start_region: None,
            jeweler_amounts: [3, 5, 8, 11, 14, 17, 20],
            jewel_hunt_amount: 15,
            max_inventory: 15,
            max_cycles: 500,
            max_attempts: 10,
            starting_items: vec![],
        }
    }
}

pub fn parse_randomizer_settings(settings_json: &str) -> Result<RandomizerSettings> {
    let mut des = serde_json::Deserializer::from_str(settings_json);
    let settings = serde_path_to_error::deserialize(&mut des)?;
    Ok(settings)
}
