// The changes suggested by this lint usually make the code more cluttered and less clear:
#![allow(clippy::needless_range_loop)]

use anyhow::{bail, ensure, Context, Result};
use hashbrown::HashMap;
use log::info;
use serde::{Deserialize, Serialize};
use std::borrow::ToOwned;
use std::hash::Hash;
use std::path::Path;
use strum_macros::{EnumString, VariantNames};

pub type ItemId = usize; // Index into GameData.item_isv.keys: distinct item names
pub type RegionId = usize; // Index into GameData.region_isv.keys: distinct region names
pub type ItemLocationId = usize; // Index into GameData.item_locations
pub type EdgeIdx = usize; // Index into the run's resolved logic edges

const BUILTIN_WORLD: &str = include_str!("../../data/world.json");

#[derive(Default, Clone, Debug)]
pub struct IndexedVec<T: Hash + Eq> {
    pub keys: Vec<T>,
    pub index_by_key: HashMap<T, usize>,
}

impl<T: Hash + Eq> IndexedVec<T> {
    pub fn add<U: ToOwned<Owned = T> + ?Sized>(&mut self, name: &U) -> usize {
        if !self.index_by_key.contains_key(&name.to_owned()) {
            let idx = self.keys.len();
            self.index_by_key.insert(name.to_owned(), self.keys.len());
            self.keys.push(name.to_owned());
            idx
        } else {
            self.index_by_key[&name.to_owned()]
        }
    }
}

#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumString,
    VariantNames,
    Serialize,
    Deserialize,
    PartialOrd,
    Ord,
)]
pub enum ItemCategory {
    Item,
    Ability,
    Statue,
}

impl ItemCategory {
    pub const ALL: [ItemCategory; 3] =
        [ItemCategory::Item, ItemCategory::Ability, ItemCategory::Statue];

    pub fn idx(self) -> usize {
        self as usize
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumString, VariantNames, Serialize, Deserialize)]
pub enum ProgressionClass {
    // Possession can open regions holding further item locations.
    OpensLocations,
    // Catalog tag for items that only gate optional side content. Placement treats these
    // exactly like `OpensLocations`: they are progression for capacity checks, eviction and
    // the non-progression bulk fill.
    QuestOnly,
    NoProgression,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumString, VariantNames, Serialize, Deserialize)]
pub enum InventorySlot {
    None,
    // One slot per copy held.
    Slot,
    // A single slot however many copies are held.
    Stack,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemDefinition {
    pub name: String,
    pub category: ItemCategory,
    pub count: usize,
    pub inventory: InventorySlot,
    pub progression: ProgressionClass,
    pub filler: bool,
    pub easy_mode: bool,
}

impl ItemDefinition {
    pub fn occupies_inventory(&self) -> bool {
        self.inventory != InventorySlot::None
    }

    pub fn is_progression(&self) -> bool {
        self.progression != ProgressionClass::NoProgression
    }
}

/// A multiset of items, normalized so that entries are sorted by item, merged,
/// and never carry a zero count. Normalization makes equal multisets compare
/// equal, which the progression analyzer relies on for deduplication.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Requirement {
    pub items: Vec<(ItemId, usize)>,
}

impl Requirement {
    pub fn new<I: IntoIterator<Item = (ItemId, usize)>>(entries: I) -> Self {
        let mut items: Vec<(ItemId, usize)> = entries.into_iter().filter(|x| x.1 > 0).collect();
        items.sort();
        let mut merged: Vec<(ItemId, usize)> = Vec::with_capacity(items.len());
        for (item, count) in items {
            match merged.last_mut() {
                Some(last) if last.0 == item => last.1 += count,
                _ => merged.push((item, count)),
            }
        }
        Requirement { items: merged }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total(&self) -> usize {
        self.items.iter().map(|x| x.1).sum()
    }

    pub fn count(&self, item: ItemId) -> usize {
        self.items
            .iter()
            .find(|x| x.0 == item)
            .map(|x| x.1)
            .unwrap_or(0)
    }

    /// One entry per copy, identical items adjacent.
    pub fn expand(&self) -> Vec<ItemId> {
        self.items
            .iter()
            .flat_map(|&(item, count)| std::iter::repeat(item).take(count))
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    Fixed(usize),
    // Key filled in from run settings when the run's edges are built.
    Template(String),
}

#[derive(Clone, Debug)]
pub struct Region {
    pub name: String,
    pub neighbors: Vec<RegionId>,
    pub items_to_strip: Requirement,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogicEdge {
    pub from: RegionId,
    pub to: RegionId,
    pub requirement: Requirement,
}

#[derive(Clone, Debug)]
pub struct LogicEdgeTemplate {
    pub from: RegionId,
    pub to: RegionId,
    pub requirement: Vec<(ItemId, Quantity)>,
}

impl LogicEdgeTemplate {
    /// Returns None if the edge references a template key that is not defined for this run.
    pub fn resolve(&self, values: &HashMap<String, usize>) -> Option<LogicEdge> {
        let mut entries: Vec<(ItemId, usize)> = Vec::with_capacity(self.requirement.len());
        for (item, quantity) in &self.requirement {
            let count = match quantity {
                Quantity::Fixed(n) => *n,
                Quantity::Template(key) => *values.get(key.as_str())?,
            };
            entries.push((*item, count));
        }
        Some(LogicEdge {
            from: self.from,
            to: self.to,
            requirement: Requirement::new(entries),
        })
    }
}

#[derive(Clone, Debug)]
pub struct ItemLocation {
    pub name: String,
    pub region: RegionId,
    pub slot_type: ItemCategory,
    pub forbidden_items: Vec<ItemId>,
    // Write-back address for the patcher; unused by placement.
    pub address: Option<u32>,
}

impl ItemLocation {
    pub fn forbids(&self, item: ItemId) -> bool {
        self.forbidden_items.contains(&item)
    }
}

#[derive(Deserialize)]
struct ItemJson {
    name: String,
    category: ItemCategory,
    count: usize,
    #[serde(default = "default_inventory_slot")]
    inventory: InventorySlot,
    #[serde(default = "default_progression_class")]
    progression: ProgressionClass,
    #[serde(default)]
    filler: bool,
    #[serde(default)]
    easy_mode: bool,
}

fn default_inventory_slot() -> InventorySlot {
    InventorySlot::None
}

fn default_progression_class() -> ProgressionClass {
    ProgressionClass::NoProgression
}

#[derive(Deserialize)]
struct RegionJson {
    name: String,
    #[serde(default)]
    neighbors: Vec<String>,
    #[serde(default)]
    strip: Vec<(String, usize)>,
}

#[derive(Deserialize)]
struct EdgeJson {
    from: String,
    to: String,
    #[serde(default)]
    requirement: Vec<(String, Quantity)>,
}

#[derive(Deserialize)]
struct LocationJson {
    name: String,
    region: String,
    slot: ItemCategory,
    #[serde(default)]
    forbidden: Vec<String>,
    #[serde(default)]
    address: Option<u32>,
}

#[derive(Deserialize)]
struct WorldJson {
    start_region: String,
    goal_regions: HashMap<String, String>,
    items: Vec<ItemJson>,
    regions: Vec<RegionJson>,
    #[serde(default)]
    edges: Vec<EdgeJson>,
    locations: Vec<LocationJson>,
    #[serde(default)]
    dark_space_sets: Vec<Vec<String>>,
    #[serde(default)]
    easy_mode_placements: Vec<(String, String)>,
}

#[derive(Default, Clone, Debug)]
pub struct GameData {
    pub item_isv: IndexedVec<String>,
    pub items: Vec<ItemDefinition>,
    pub region_isv: IndexedVec<String>,
    pub regions: Vec<Region>,
    pub location_isv: IndexedVec<String>,
    pub item_locations: Vec<ItemLocation>,
    pub region_locations: Vec<Vec<ItemLocationId>>, // Item locations contained in each region
    pub edge_templates: Vec<LogicEdgeTemplate>,
    pub dark_space_sets: Vec<Vec<ItemLocationId>>,
    pub easy_mode_placements: Vec<(ItemId, ItemLocationId)>,
    pub start_region: RegionId,
    pub goal_regions: HashMap<String, RegionId>,
}

fn lookup(isv: &IndexedVec<String>, name: &str, kind: &str) -> Result<usize> {
    match isv.index_by_key.get(name) {
        Some(&idx) => Ok(idx),
        None => bail!("unknown {kind} '{name}'"),
    }
}

fn add_unique(isv: &mut IndexedVec<String>, name: &str, kind: &str) -> Result<usize> {
    ensure!(
        !isv.index_by_key.contains_key(name),
        "duplicate {kind} name '{name}'"
    );
    Ok(isv.add(name))
}

impl GameData {
    pub fn load(path: &Path) -> Result<GameData> {
        let json_str = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read {}", path.display()))?;
        Self::from_json_str(&json_str)
            .with_context(|| format!("unable to load world data from {}", path.display()))
    }

    pub fn builtin() -> Result<GameData> {
        Self::from_json_str(BUILTIN_WORLD).context("unable to load built-in world data")
    }

    pub fn from_json_str(json_str: &str) -> Result<GameData> {
        let world: WorldJson =
            serde_json::from_str(json_str).context("unable to parse world JSON")?;
        let mut game_data = GameData::default();

        for item_json in &world.items {
            add_unique(&mut game_data.item_isv, &item_json.name, "item")?;
            game_data.items.push(ItemDefinition {
                name: item_json.name.clone(),
                category: item_json.category,
                count: item_json.count,
                inventory: item_json.inventory,
                progression: item_json.progression,
                filler: item_json.filler,
                easy_mode: item_json.easy_mode,
            });
        }
        for category in ItemCategory::ALL {
            let num_filler = game_data
                .items
                .iter()
                .filter(|x| x.filler && x.category == category)
                .count();
            ensure!(
                num_filler <= 1,
                "more than one filler item in category {category:?}"
            );
        }

        for region_json in &world.regions {
            add_unique(&mut game_data.region_isv, &region_json.name, "region")?;
        }
        for region_json in &world.regions {
            let neighbors = region_json
                .neighbors
                .iter()
                .map(|x| lookup(&game_data.region_isv, x, "region"))
                .collect::<Result<Vec<RegionId>>>()
                .with_context(|| format!("neighbors of region '{}'", region_json.name))?;
            let mut strip: Vec<(ItemId, usize)> = Vec::new();
            for (item_name, count) in &region_json.strip {
                strip.push((lookup(&game_data.item_isv, item_name, "item")?, *count));
            }
            game_data.regions.push(Region {
                name: region_json.name.clone(),
                neighbors,
                items_to_strip: Requirement::new(strip),
            });
        }

        for edge_json in &world.edges {
            let from = lookup(&game_data.region_isv, &edge_json.from, "region")?;
            let to = lookup(&game_data.region_isv, &edge_json.to, "region")?;
            let mut requirement: Vec<(ItemId, Quantity)> = Vec::new();
            for (item_name, quantity) in &edge_json.requirement {
                let item = lookup(&game_data.item_isv, item_name, "item").with_context(|| {
                    format!("edge '{}' -> '{}'", edge_json.from, edge_json.to)
                })?;
                requirement.push((item, quantity.clone()));
            }
            game_data
                .edge_templates
                .push(LogicEdgeTemplate { from, to, requirement });
        }

        game_data.region_locations = vec![vec![]; game_data.regions.len()];
        for location_json in &world.locations {
            let loc_id = add_unique(&mut game_data.location_isv, &location_json.name, "location")?;
            let region = lookup(&game_data.region_isv, &location_json.region, "region")
                .with_context(|| format!("location '{}'", location_json.name))?;
            let mut forbidden_items: Vec<ItemId> = Vec::new();
            for item_name in &location_json.forbidden {
                forbidden_items.push(lookup(&game_data.item_isv, item_name, "item")?);
            }
            game_data.region_locations[region].push(loc_id);
            game_data.item_locations.push(ItemLocation {
                name: location_json.name.clone(),
                region,
                slot_type: location_json.slot,
                forbidden_items,
                address: location_json.address,
            });
        }

        for set in &world.dark_space_sets {
            let mut loc_ids: Vec<ItemLocationId> = Vec::new();
            for name in set {
                let loc_id = lookup(&game_data.location_isv, name, "location")?;
                ensure!(
                    game_data.item_locations[loc_id].slot_type == ItemCategory::Ability,
                    "dark space set member '{name}' is not an ability location"
                );
                loc_ids.push(loc_id);
            }
            game_data.dark_space_sets.push(loc_ids);
        }

        for (item_name, loc_name) in &world.easy_mode_placements {
            let item = lookup(&game_data.item_isv, item_name, "item")?;
            let loc_id = lookup(&game_data.location_isv, loc_name, "location")?;
            ensure!(
                game_data.items[item].category == game_data.item_locations[loc_id].slot_type,
                "easy mode placement of '{item_name}' does not match slot type of '{loc_name}'"
            );
            game_data.easy_mode_placements.push((item, loc_id));
        }

        game_data.start_region = lookup(&game_data.region_isv, &world.start_region, "region")?;
        for (goal, region_name) in &world.goal_regions {
            let region = lookup(&game_data.region_isv, region_name, "region")?;
            game_data.goal_regions.insert(goal.clone(), region);
        }

        info!(
            "Loaded world data: {} items, {} regions, {} edges, {} locations",
            game_data.items.len(),
            game_data.regions.len(),
            game_data.edge_templates.len(),
            game_data.item_locations.len()
        );
        Ok(game_data)
    }

    pub fn item_name(&self, item: ItemId) -> &str {
        &self.items[item].name
    }

    pub fn region_name(&self, region: RegionId) -> &str {
        &self.regions[region].name
    }

    pub fn filler_item(&self, category: ItemCategory) -> Option<ItemId> {
        self.items
            .iter()
            .position(|x| x.filler && x.category == category)
    }

    pub fn num_locations(&self, category: ItemCategory) -> usize {
        self.item_locations
            .iter()
            .filter(|x| x.slot_type == category)
            .count()
    }

    pub fn requirement_names(&self, req: &Requirement) -> Vec<String> {
        req.items
            .iter()
            .map(|&(item, count)| format!("{}x{}", self.item_name(item), count))
            .collect()
    }
}
