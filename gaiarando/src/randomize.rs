pub mod fill;
pub mod monte_carlo;
pub mod progression;

use anyhow::{ensure, Result};
use gaiarando_game::{
    GameData, ItemCategory, ItemId, ItemLocationId, LogicEdge, ProgressionClass, RegionId,
};
use gaiarando_logic::Inventory;
use log::{debug, info, warn};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use thiserror::Error;

use crate::{
    helpers::{
        check_edge_feasibility, choose_required_statues, get_required_item_boost,
        get_required_items, get_template_values, resolve_edges,
    },
    settings::{Difficulty, LogicMode, RandomizerSettings},
    spoiler_log::{get_spoiler_log, SpoilerLog},
    traverse::{get_frontier_edges, traverse},
};

use self::fill::PlacementOutcome;
use self::progression::{progression_list, ProgressionResult};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RandomizeError {
    #[error("progression loop exceeded {0} cycles")]
    CycleLimitExceeded(usize),
    #[error("no evictable location found (prefer inventory items: {prefer_inventory})")]
    NoEvictableLocation { prefer_inventory: bool },
    #[error("no room available for {0}")]
    NoRoomAvailable(String),
    #[error("dark space set {0} has no open member to lock")]
    DarkSpaceLockInconsistency(usize),
    #[error("randomization failed after {0} attempts")]
    MaxRetriesExceeded(usize),
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl RandomizeError {
    /// Whether a fresh attempt with another seed can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RandomizeError::CycleLimitExceeded(_)
                | RandomizeError::NoEvictableLocation { .. }
                | RandomizeError::NoRoomAvailable(_)
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementLogEntry {
    pub item: ItemId,
    pub location: ItemLocationId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum RandomizationPhase {
    Init,
    PrePlace,
    ProgressLoop,
    JunkFill,
    Done,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RandomizationState {
    pub phase: RandomizationPhase,
    pub cycle: usize,
    pub edges: Vec<LogicEdge>,
    pub required_statues: Vec<ItemId>,
    pub required_items: Vec<bool>, // Indexed by ItemId
    pub placed_items: Vec<Option<ItemId>>, // Indexed by ItemLocationId
    pub locked: Vec<bool>,                 // Indexed by ItemLocationId
    pub items_remaining: Vec<usize>,       // Copies not yet placed, by ItemId
    pub reached: Vec<bool>,                // Indexed by RegionId
    pub held: Inventory,
    pub placement_log: Vec<PlacementLogEntry>,
}

impl RandomizationState {
    pub fn fill_item(&mut self, item: ItemId, loc_id: ItemLocationId) {
        debug_assert!(self.placed_items[loc_id].is_none());
        debug_assert!(self.items_remaining[item] > 0);
        self.placed_items[loc_id] = Some(item);
        self.items_remaining[item] -= 1;
        self.placement_log.push(PlacementLogEntry {
            item,
            location: loc_id,
        });
    }

    pub fn unfill_item(&mut self, loc_id: ItemLocationId) -> Option<ItemId> {
        let item = self.placed_items[loc_id].take()?;
        self.items_remaining[item] += 1;
        let entry = PlacementLogEntry {
            item,
            location: loc_id,
        };
        self.placement_log.retain(|x| *x != entry);
        Some(item)
    }

    pub fn unsolve(&mut self) {
        self.reached.fill(false);
        self.held.counts.fill(0);
    }

    pub fn placed_count(&self, item: ItemId) -> usize {
        self.placed_items
            .iter()
            .filter(|x| **x == Some(item))
            .count()
    }

    /// Reachable, unfilled locations by slot type.
    pub fn open_location_counts(&self, game_data: &GameData) -> [usize; 3] {
        let mut counts = [0; 3];
        for (loc_id, loc) in game_data.item_locations.iter().enumerate() {
            if self.reached[loc.region] && self.placed_items[loc_id].is_none() {
                counts[loc.slot_type.idx()] += 1;
            }
        }
        counts
    }
}

#[derive(Clone, Debug)]
pub struct Randomization {
    pub seed: u64,
    pub attempt_num: usize,
    pub item_placement: Vec<ItemId>, // Indexed by ItemLocationId
    pub placement_log: Vec<PlacementLogEntry>,
    pub required_statues: Vec<ItemId>,
    pub spoiler_log: SpoilerLog,
}

pub struct Randomizer<'a> {
    pub game_data: &'a GameData,
    pub settings: &'a RandomizerSettings,
    pub start_region: RegionId,
    pub goal_region: RegionId,
    pub starting_items: Inventory,
    pub initial_items_remaining: Vec<usize>,
    pub required_item_boost: f64,
}

fn expand_counts(counts: &[usize], filter: impl Fn(ItemId) -> bool) -> Vec<ItemId> {
    let mut out: Vec<ItemId> = vec![];
    for (item, &count) in counts.iter().enumerate() {
        if filter(item) {
            out.extend(std::iter::repeat(item).take(count));
        }
    }
    out
}

impl<'r> Randomizer<'r> {
    pub fn new(
        game_data: &'r GameData,
        settings: &'r RandomizerSettings,
    ) -> Result<Randomizer<'r>, RandomizeError> {
        let start_region = match &settings.start_region {
            Some(name) => *game_data.region_isv.index_by_key.get(name).ok_or_else(|| {
                RandomizeError::Configuration(format!("unknown start region '{name}'"))
            })?,
            None => game_data.start_region,
        };
        let goal_region = *game_data
            .goal_regions
            .get(settings.goal.key())
            .ok_or_else(|| {
                RandomizeError::Configuration(format!(
                    "world has no region for goal {:?}",
                    settings.goal
                ))
            })?;

        let num_items = game_data.items.len();
        let mut starting_items = Inventory::new(num_items);
        for x in &settings.starting_items {
            let item = *game_data.item_isv.index_by_key.get(&x.item).ok_or_else(|| {
                RandomizeError::Configuration(format!("unknown starting item '{}'", x.item))
            })?;
            starting_items.add(item, x.count);
            if starting_items.count(item) > game_data.items[item].count {
                return Err(RandomizeError::Configuration(format!(
                    "more starting copies of '{}' than exist",
                    x.item
                )));
            }
        }

        let mut initial_items_remaining: Vec<usize> = (0..num_items)
            .map(|i| game_data.items[i].count - starting_items.count(i))
            .collect();
        for category in ItemCategory::ALL {
            let num_locations = game_data.num_locations(category);
            let filler = game_data.filler_item(category);
            let copies: usize = (0..num_items)
                .filter(|&i| game_data.items[i].category == category && Some(i) != filler)
                .map(|i| initial_items_remaining[i])
                .sum();
            match filler {
                Some(f) if copies <= num_locations => {
                    initial_items_remaining[f] = num_locations - copies;
                }
                None if copies == num_locations => {}
                _ => {
                    return Err(RandomizeError::Configuration(format!(
                        "{copies} {category:?} copies for {num_locations} locations"
                    )));
                }
            }
        }
        if !game_data.dark_space_sets.is_empty() {
            let num_sets = game_data.dark_space_sets.len();
            match game_data.filler_item(ItemCategory::Ability) {
                Some(f) if initial_items_remaining[f] >= num_sets => {}
                _ => {
                    return Err(RandomizeError::Configuration(format!(
                        "not enough ability filler to lock {num_sets} dark space sets"
                    )));
                }
            }
        }

        Ok(Randomizer {
            game_data,
            settings,
            start_region,
            goal_region,
            starting_items,
            initial_items_remaining,
            required_item_boost: get_required_item_boost(
                settings.logic_mode,
                settings.difficulty,
            ),
        })
    }

    pub fn get_initial_state(&self) -> RandomizationState {
        let num_locations = self.game_data.item_locations.len();
        RandomizationState {
            phase: RandomizationPhase::Init,
            cycle: 0,
            edges: vec![],
            required_statues: vec![],
            required_items: vec![false; self.game_data.items.len()],
            placed_items: vec![None; num_locations],
            locked: vec![false; num_locations],
            items_remaining: self.initial_items_remaining.clone(),
            reached: vec![false; self.game_data.regions.len()],
            held: Inventory::new(self.game_data.items.len()),
            placement_log: vec![],
        }
    }

    pub fn update_reachability(&self, state: &mut RandomizationState) {
        state.unsolve();
        let result = traverse(
            self.game_data,
            &state.edges,
            self.start_region,
            &self.starting_items,
            &state.placed_items,
        );
        state.reached = result.reached;
        state.held = result.held;
    }

    pub fn is_inventory_ok(&self, held: &Inventory) -> bool {
        held.occupied_slots(&self.game_data.items) <= self.settings.max_inventory
    }

    pub fn is_done(&self, state: &RandomizationState) -> bool {
        if !state.reached[self.goal_region] {
            return false;
        }
        match self.settings.logic_mode {
            LogicMode::Completable => get_frontier_edges(&state.edges, &state.reached).is_empty(),
            LogicMode::Beatable | LogicMode::Unconstrained => true,
        }
    }

    fn item_names(&self, items: &[ItemId]) -> Vec<&str> {
        items.iter().map(|&i| self.game_data.item_name(i)).collect()
    }

    fn log_failure(&self, attempt_num: usize, state: &RandomizationState, err: &RandomizeError) {
        let unreached: Vec<&str> = (0..self.game_data.regions.len())
            .filter(|&r| !state.reached[r])
            .map(|r| self.game_data.region_name(r))
            .collect();
        let held: Vec<String> = state
            .held
            .held_items()
            .into_iter()
            .map(|(item, count)| format!("{}x{}", self.game_data.item_name(item), count))
            .collect();
        warn!(
            "[attempt {attempt_num}] {} failed at cycle {}: {err}",
            state.phase, state.cycle
        );
        warn!("[attempt {attempt_num}] Unreached regions: {:?}", unreached);
        warn!("[attempt {attempt_num}] Held items: {:?}", held);
    }

    fn init<R: Rng>(
        &self,
        attempt_num: usize,
        state: &mut RandomizationState,
        rng: &mut R,
    ) -> Result<(), RandomizeError> {
        state.required_statues = choose_required_statues(self.settings, self.game_data, rng)?;
        let values = get_template_values(self.settings, self.game_data, &state.required_statues);
        state.edges = resolve_edges(self.game_data, &values);
        check_edge_feasibility(self.game_data, &state.edges)?;
        info!(
            "[attempt {attempt_num}] Required statues: {:?}",
            self.item_names(&state.required_statues)
        );
        Ok(())
    }

    fn lock_dark_spaces<R: Rng>(
        &self,
        attempt_num: usize,
        state: &mut RandomizationState,
        rng: &mut R,
    ) -> Result<(), RandomizeError> {
        if self.game_data.dark_space_sets.is_empty() {
            return Ok(());
        }
        let filler = self
            .game_data
            .filler_item(ItemCategory::Ability)
            .ok_or(RandomizeError::DarkSpaceLockInconsistency(0))?;
        let mut open: Vec<ItemLocationId> = (0..self.game_data.item_locations.len())
            .filter(|&i| {
                self.game_data.item_locations[i].slot_type == ItemCategory::Ability
                    && state.placed_items[i].is_none()
            })
            .collect();
        open.shuffle(rng);
        for (set_idx, set) in self.game_data.dark_space_sets.iter().enumerate() {
            let loc_id = open
                .iter()
                .copied()
                .find(|&i| set.contains(&i) && state.placed_items[i].is_none())
                .ok_or(RandomizeError::DarkSpaceLockInconsistency(set_idx))?;
            if state.items_remaining[filler] == 0 {
                return Err(RandomizeError::DarkSpaceLockInconsistency(set_idx));
            }
            state.fill_item(filler, loc_id);
            state.locked[loc_id] = true;
            debug!(
                "[attempt {attempt_num}] Locked open: {}",
                self.game_data.item_locations[loc_id].name
            );
        }
        Ok(())
    }

    fn pre_place<R: Rng>(
        &self,
        attempt_num: usize,
        state: &mut RandomizationState,
        rng: &mut R,
    ) -> Result<(), RandomizeError> {
        let items = &self.game_data.items;
        let mut statues = expand_counts(&state.items_remaining, |i| {
            items[i].category == ItemCategory::Statue
        });
        statues.shuffle(rng);
        let leftover = self.random_fill(state, rng, statues, false);
        if let Some(&item) = leftover.first() {
            return Err(RandomizeError::NoRoomAvailable(
                self.game_data.item_name(item).to_string(),
            ));
        }

        if self.settings.difficulty == Difficulty::Easy {
            for &(item, loc_id) in &self.game_data.easy_mode_placements {
                if state.items_remaining[item] > 0 && self.can_seat(state, item, loc_id, false) {
                    state.fill_item(item, loc_id);
                }
            }
        }

        self.lock_dark_spaces(attempt_num, state, rng)?;

        for category in [ItemCategory::Item, ItemCategory::Ability] {
            let num_open = (0..self.game_data.item_locations.len())
                .filter(|&i| {
                    self.game_data.item_locations[i].slot_type == category
                        && state.placed_items[i].is_none()
                })
                .count();
            let progression_copies: usize = (0..items.len())
                .filter(|&i| items[i].category == category && items[i].is_progression())
                .map(|i| state.items_remaining[i])
                .sum();
            let budget =
                f64::max(num_open as f64 - 1.5 * progression_copies as f64, 0.0) as usize;
            let mut bulk = expand_counts(&state.items_remaining, |i| {
                items[i].category == category
                    && items[i].progression == ProgressionClass::NoProgression
            });
            bulk.shuffle(rng);
            bulk.truncate(budget);
            let num_bulk = bulk.len();
            let leftover = self.random_fill(state, rng, bulk, false);
            debug!(
                "[attempt {attempt_num}] Pre-placed {} of {} non-progression {category:?} copies",
                num_bulk - leftover.len(),
                num_bulk
            );
        }

        self.update_reachability(state);
        state.required_items = get_required_items(
            self.game_data,
            &state.edges,
            self.goal_region,
            &state.required_statues,
            &state.placed_items,
        );
        Ok(())
    }

    fn progress_loop<R: Rng>(
        &self,
        attempt_num: usize,
        state: &mut RandomizationState,
        rng: &mut R,
    ) -> Result<(), RandomizeError> {
        loop {
            state.cycle += 1;
            if state.cycle > self.settings.max_cycles {
                return Err(RandomizeError::CycleLimitExceeded(self.settings.max_cycles));
            }
            self.update_reachability(state);
            debug!(
                "[attempt {attempt_num}] Cycle {}: {} regions reached, {} items held",
                state.cycle,
                state.reached.iter().filter(|&&x| x).count(),
                state.held.total()
            );
            if self.is_done(state) {
                return Ok(());
            }
            let result = progression_list(
                self.game_data,
                &state.edges,
                &state.reached,
                &state.held,
                &state.items_remaining,
                &state.open_location_counts(self.game_data),
                self.settings.max_inventory,
            );
            match result {
                ProgressionResult::NoEdges => {
                    self.make_room(attempt_num, state, rng, false, 1)?;
                }
                ProgressionResult::AllOverBudget => {
                    self.make_room(attempt_num, state, rng, true, 1)?;
                }
                ProgressionResult::Candidates(candidates) => {
                    match self.place_progression(attempt_num, state, rng, candidates) {
                        PlacementOutcome::Placed(req) => {
                            info!(
                                "[attempt {attempt_num}] Cycle {}: placed {:?}",
                                state.cycle,
                                self.game_data.requirement_names(&req)
                            );
                        }
                        PlacementOutcome::Exhausted {
                            inventory_blocked,
                            seat_blocked,
                        } => {
                            self.make_room_after_rejections(
                                attempt_num,
                                state,
                                rng,
                                inventory_blocked,
                                seat_blocked,
                            )?;
                        }
                    }
                }
            }
        }
    }

    fn junk_fill<R: Rng>(
        &self,
        attempt_num: usize,
        state: &mut RandomizationState,
        rng: &mut R,
    ) -> Result<(), RandomizeError> {
        let restricted: Vec<bool> = (0..self.game_data.items.len())
            .map(|i| self.game_data.item_locations.iter().any(|loc| loc.forbids(i)))
            .collect();
        let mut items = expand_counts(&state.items_remaining, |_| true);
        items.shuffle(rng);
        // Stable sort keeps the shuffled order within each group.
        items.sort_by_key(|&i| !restricted[i]);
        info!(
            "[attempt {attempt_num}] Junk fill of {} remaining copies",
            items.len()
        );
        let leftover = self.random_fill(state, rng, items, false);
        if let Some(&item) = leftover.first() {
            return Err(RandomizeError::NoRoomAvailable(
                self.game_data.item_name(item).to_string(),
            ));
        }
        self.update_reachability(state);
        Ok(())
    }

    pub fn run_phase<R: Rng>(
        &self,
        attempt_num: usize,
        state: &mut RandomizationState,
        rng: &mut R,
    ) -> Result<RandomizationPhase, RandomizeError> {
        match state.phase {
            RandomizationPhase::Init => {
                self.init(attempt_num, state, rng)?;
                Ok(RandomizationPhase::PrePlace)
            }
            RandomizationPhase::PrePlace => {
                self.pre_place(attempt_num, state, rng)?;
                Ok(RandomizationPhase::ProgressLoop)
            }
            RandomizationPhase::ProgressLoop => {
                self.progress_loop(attempt_num, state, rng)?;
                Ok(RandomizationPhase::JunkFill)
            }
            RandomizationPhase::JunkFill => {
                self.junk_fill(attempt_num, state, rng)?;
                Ok(RandomizationPhase::Done)
            }
            RandomizationPhase::Done => Ok(RandomizationPhase::Done),
        }
    }

    fn finish(
        &self,
        attempt_num: usize,
        seed: u64,
        state: RandomizationState,
    ) -> Result<Randomization, RandomizeError> {
        let mut item_placement: Vec<ItemId> = Vec::with_capacity(state.placed_items.len());
        for (loc_id, placed) in state.placed_items.iter().enumerate() {
            match placed {
                Some(item) => item_placement.push(*item),
                None => {
                    return Err(RandomizeError::Configuration(format!(
                        "location '{}' left empty",
                        self.game_data.item_locations[loc_id].name
                    )));
                }
            }
        }
        let spoiler_log = get_spoiler_log(
            self.game_data,
            self.settings,
            self.start_region,
            seed,
            attempt_num,
            &state.required_statues,
            &state.placement_log,
            &item_placement,
        );
        info!(
            "[attempt {attempt_num}] Randomization succeeded after {} cycles",
            state.cycle
        );
        Ok(Randomization {
            seed,
            attempt_num,
            item_placement,
            placement_log: state.placement_log,
            required_statues: state.required_statues,
            spoiler_log,
        })
    }

    /// Runs one attempt with a fixed seed.
    pub fn randomize(
        &self,
        attempt_num: usize,
        seed: u64,
    ) -> Result<Randomization, RandomizeError> {
        let mut rng_seed = [0u8; 32];
        rng_seed[..8].copy_from_slice(&seed.to_le_bytes());
        let mut rng = rand::rngs::StdRng::from_seed(rng_seed);
        info!("[attempt {attempt_num}] Starting randomization with seed {seed}");

        let mut state = self.get_initial_state();
        while state.phase != RandomizationPhase::Done {
            match self.run_phase(attempt_num, &mut state, &mut rng) {
                Ok(next) => {
                    debug!("[attempt {attempt_num}] {} -> {}", state.phase, next);
                    state.phase = next;
                }
                Err(e) => {
                    self.log_failure(attempt_num, &state, &e);
                    return Err(e);
                }
            }
        }
        self.finish(attempt_num, seed, state)
    }

    /// Re-checks a finished placement from scratch.
    pub fn verify(&self, randomization: &Randomization) -> Result<()> {
        let game_data = self.game_data;
        ensure!(
            randomization.item_placement.len() == game_data.item_locations.len(),
            "placement covers {} of {} locations",
            randomization.item_placement.len(),
            game_data.item_locations.len()
        );
        let mut placed_counts = vec![0; game_data.items.len()];
        for (loc_id, &item) in randomization.item_placement.iter().enumerate() {
            let loc = &game_data.item_locations[loc_id];
            ensure!(
                game_data.items[item].category == loc.slot_type,
                "{} placed in {:?} slot '{}'",
                game_data.item_name(item),
                loc.slot_type,
                loc.name
            );
            ensure!(
                !loc.forbids(item),
                "{} placed in forbidden location '{}'",
                game_data.item_name(item),
                loc.name
            );
            placed_counts[item] += 1;
        }
        for item in 0..game_data.items.len() {
            ensure!(
                placed_counts[item] == self.initial_items_remaining[item],
                "{} placed {} times, expected {}",
                game_data.item_name(item),
                placed_counts[item],
                self.initial_items_remaining[item]
            );
        }

        let values = get_template_values(self.settings, game_data, &randomization.required_statues);
        let edges = resolve_edges(game_data, &values);
        let placed: Vec<Option<ItemId>> = randomization
            .item_placement
            .iter()
            .map(|&x| Some(x))
            .collect();
        let result = traverse(
            game_data,
            &edges,
            self.start_region,
            &self.starting_items,
            &placed,
        );
        ensure!(
            result.reached[self.goal_region],
            "goal region '{}' is unreachable",
            game_data.region_name(self.goal_region)
        );
        if self.settings.logic_mode == LogicMode::Completable {
            let frontier = get_frontier_edges(&edges, &result.reached);
            ensure!(
                frontier.is_empty(),
                "{} edges remain untraversable, e.g. into '{}'",
                frontier.len(),
                game_data.region_name(edges[frontier[0]].to)
            );
        }
        let occupied = result.held.occupied_slots(&game_data.items);
        ensure!(
            occupied <= self.settings.max_inventory,
            "{occupied} inventory slots used, capacity {}",
            self.settings.max_inventory
        );
        Ok(())
    }
}

/// Attempt `i` runs with seed `settings.seed + i`; only retryable failures move on to the
/// next attempt.
pub fn randomize_with_retries(
    game_data: &GameData,
    settings: &RandomizerSettings,
) -> Result<Randomization, RandomizeError> {
    let randomizer = Randomizer::new(game_data, settings)?;
    let max_attempts = settings.max_attempts;
    for attempt_num in 0..max_attempts {
        let seed = settings.seed.wrapping_add(attempt_num as u64);
        match randomizer.randomize(attempt_num, seed) {
            Ok(randomization) => return Ok(randomization),
            Err(e) if e.is_retryable() => {
                info!(
                    "Attempt {}/{max_attempts}: Randomization failed: {}",
                    attempt_num + 1,
                    e
                );
            }
            Err(e) => return Err(e),
        }
    }
    Err(RandomizeError::MaxRetriesExceeded(max_attempts))
}
