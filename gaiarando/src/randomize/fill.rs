use gaiarando_game::{ItemCategory, ItemId, ItemLocationId, ProgressionClass, Requirement};
use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;

use super::{
    monte_carlo::{select_candidate, weighted_candidates},
    RandomizationState, RandomizeError, Randomizer,
};

pub enum PlacementOutcome {
    Placed(Requirement),
    // Every candidate was rejected. The flags record whether any failed on capacity and
    // whether any failed for lack of a seat.
    Exhausted {
        inventory_blocked: bool,
        seat_blocked: bool,
    },
}

enum Rejection {
    NoSeat,
    InventoryFull,
}

impl<'r> Randomizer<'r> {
    pub fn can_seat(
        &self,
        state: &RandomizationState,
        item: ItemId,
        loc_id: ItemLocationId,
        only_accessible: bool,
    ) -> bool {
        let loc = &self.game_data.item_locations[loc_id];
        state.placed_items[loc_id].is_none()
            && !state.locked[loc_id]
            && loc.slot_type == self.game_data.items[item].category
            && !loc.forbids(item)
            && (!only_accessible || state.reached[loc.region])
    }

    pub fn get_seatable_locations(
        &self,
        state: &RandomizationState,
        item: ItemId,
        only_accessible: bool,
    ) -> Vec<ItemLocationId> {
        (0..self.game_data.item_locations.len())
            .filter(|&loc_id| self.can_seat(state, item, loc_id, only_accessible))
            .collect()
    }

    /// Places `items` into reachable `locations`, backtracking on dead ends. On failure the
    /// state is left exactly as it was.
    pub fn forward_fill(
        &self,
        state: &mut RandomizationState,
        items: &[ItemId],
        locations: &[ItemLocationId],
    ) -> bool {
        self.forward_fill_from(state, items, locations, 0)
    }

    fn forward_fill_from(
        &self,
        state: &mut RandomizationState,
        items: &[ItemId],
        locations: &[ItemLocationId],
        start_idx: usize,
    ) -> bool {
        let Some((&item, rest)) = items.split_first() else {
            return true;
        };
        for (i, &loc_id) in locations.iter().enumerate().skip(start_idx) {
            if !self.can_seat(state, item, loc_id, true) {
                continue;
            }
            state.fill_item(item, loc_id);
            // Copies of the same item go in increasing location order; other orders are
            // the same placement.
            let next_start = if rest.first() == Some(&item) { i + 1 } else { 0 };
            if self.forward_fill_from(state, rest, locations, next_start) {
                return true;
            }
            state.unfill_item(loc_id);
        }
        false
    }

    fn try_place_requirement<R: Rng>(
        &self,
        state: &mut RandomizationState,
        rng: &mut R,
        req: &Requirement,
    ) -> Result<(), Rejection> {
        for &(item, count) in &req.items {
            if self.get_seatable_locations(state, item, true).len() < count {
                return Err(Rejection::NoSeat);
            }
        }
        let mut locations: Vec<ItemLocationId> = (0..self.game_data.item_locations.len())
            .filter(|&i| {
                state.placed_items[i].is_none()
                    && state.reached[self.game_data.item_locations[i].region]
            })
            .collect();
        locations.shuffle(rng);
        let log_len = state.placement_log.len();
        if !self.forward_fill(state, &req.expand(), &locations) {
            return Err(Rejection::NoSeat);
        }
        self.update_reachability(state);
        if !self.is_inventory_ok(&state.held) {
            let filled: Vec<ItemLocationId> = state.placement_log[log_len..]
                .iter()
                .map(|x| x.location)
                .collect();
            for loc_id in filled {
                state.unfill_item(loc_id);
            }
            self.update_reachability(state);
            return Err(Rejection::InventoryFull);
        }
        Ok(())
    }

    /// Draws candidates by weight until one can be placed.
    pub fn place_progression<R: Rng>(
        &self,
        attempt_num: usize,
        state: &mut RandomizationState,
        rng: &mut R,
        candidates: Vec<Requirement>,
    ) -> PlacementOutcome {
        let mut candidates = candidates;
        let mut inventory_blocked = false;
        let mut seat_blocked = false;
        while !candidates.is_empty() {
            let table = weighted_candidates(
                self.game_data,
                &candidates,
                &state.items_remaining,
                &state.required_items,
                self.required_item_boost,
            );
            let idx = select_candidate(&table, rng);
            let req = candidates.remove(idx);
            match self.try_place_requirement(state, rng, &req) {
                Ok(()) => return PlacementOutcome::Placed(req),
                Err(Rejection::InventoryFull) => {
                    inventory_blocked = true;
                    debug!(
                        "[attempt {attempt_num}] Rejected {:?}: inventory full",
                        self.game_data.requirement_names(&req)
                    );
                }
                Err(Rejection::NoSeat) => {
                    seat_blocked = true;
                    debug!(
                        "[attempt {attempt_num}] Rejected {:?}: no seating",
                        self.game_data.requirement_names(&req)
                    );
                }
            }
        }
        PlacementOutcome::Exhausted {
            inventory_blocked,
            seat_blocked,
        }
    }

    /// Places each item in a random structurally valid location. Returns the items that
    /// could not be seated.
    pub fn random_fill<R: Rng>(
        &self,
        state: &mut RandomizationState,
        rng: &mut R,
        items: Vec<ItemId>,
        only_accessible: bool,
    ) -> Vec<ItemId> {
        let mut leftover: Vec<ItemId> = vec![];
        for item in items {
            if state.items_remaining[item] == 0 {
                leftover.push(item);
                continue;
            }
            let def = &self.game_data.items[item];
            // Anything that can change what the player carries needs a capacity re-check.
            let needs_check = def.occupies_inventory() || def.is_progression();
            let mut locations = self.get_seatable_locations(state, item, only_accessible);
            locations.shuffle(rng);
            let mut seated = false;
            for loc_id in locations {
                state.fill_item(item, loc_id);
                if needs_check {
                    self.update_reachability(state);
                    if !self.is_inventory_ok(&state.held) {
                        state.unfill_item(loc_id);
                        self.update_reachability(state);
                        continue;
                    }
                }
                seated = true;
                break;
            }
            if !seated {
                leftover.push(item);
            }
        }
        leftover
    }

    fn is_evictable(&self, state: &RandomizationState, loc_id: ItemLocationId) -> bool {
        let Some(item) = state.placed_items[loc_id] else {
            return false;
        };
        let def = &self.game_data.items[item];
        state.reached[self.game_data.item_locations[loc_id].region]
            && !state.locked[loc_id]
            && def.progression == ProgressionClass::NoProgression
            && def.category != ItemCategory::Statue
            && !state.required_items[item]
    }

    /// Frees one location after every candidate was rejected. Capacity rejections try an
    /// inventory item first; if none is evictable and some candidate also lacked a seat, any
    /// evictable item will do.
    pub fn make_room_after_rejections<R: Rng>(
        &self,
        attempt_num: usize,
        state: &mut RandomizationState,
        rng: &mut R,
        inventory_blocked: bool,
        seat_blocked: bool,
    ) -> Result<usize, RandomizeError> {
        if !inventory_blocked {
            return self.make_room(attempt_num, state, rng, false, 1);
        }
        match self.make_room(attempt_num, state, rng, true, 1) {
            Err(RandomizeError::NoEvictableLocation { .. }) if seat_blocked => {
                debug!(
                    "[attempt {attempt_num}] No inventory item to evict, freeing a seat instead"
                );
                self.make_room(attempt_num, state, rng, false, 1)
            }
            result => result,
        }
    }

    /// Returns up to `count` reachable non-essential items to the pool.
    pub fn make_room<R: Rng>(
        &self,
        attempt_num: usize,
        state: &mut RandomizationState,
        rng: &mut R,
        prefer_inventory: bool,
        count: usize,
    ) -> Result<usize, RandomizeError> {
        let items = &self.game_data.items;
        let evictable: Vec<ItemLocationId> = (0..self.game_data.item_locations.len())
            .filter(|&i| self.is_evictable(state, i))
            .collect();
        let item_at = |loc_id: ItemLocationId| state.placed_items[loc_id].map(|x| &items[x]);
        let mut pool: Vec<ItemLocationId> = if prefer_inventory {
            evictable
                .iter()
                .copied()
                .filter(|&i| item_at(i).is_some_and(|x| x.occupies_inventory()))
                .collect()
        } else {
            let easy: Vec<ItemLocationId> = evictable
                .iter()
                .copied()
                .filter(|&i| item_at(i).is_some_and(|x| x.easy_mode))
                .collect();
            if easy.is_empty() {
                evictable
            } else {
                easy
            }
        };
        if pool.is_empty() {
            return Err(RandomizeError::NoEvictableLocation { prefer_inventory });
        }
        pool.shuffle(rng);
        pool.truncate(count);
        for &loc_id in &pool {
            if let Some(item) = state.unfill_item(loc_id) {
                debug!(
                    "[attempt {attempt_num}] Evicted {} from {}",
                    self.game_data.item_name(item),
                    self.game_data.item_locations[loc_id].name
                );
            }
        }
        self.update_reachability(state);
        Ok(pool.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::randomize::tests::initialized_state;
    use crate::settings::RandomizerSettings;
    use crate::test_worlds::{small_settings, small_world};
    use gaiarando_game::GameData;
    use rand::SeedableRng;

    fn loc(game_data: &GameData, name: &str) -> ItemLocationId {
        game_data.location_isv.index_by_key[name]
    }

    fn item(game_data: &GameData, name: &str) -> ItemId {
        game_data.item_isv.index_by_key[name]
    }

    #[test]
    fn test_forward_fill_success() {
        let game_data = small_world();
        let settings = small_settings();
        let randomizer = Randomizer::new(&game_data, &settings).unwrap();
        let (mut state, _) = initialized_state(&randomizer);
        let locations = vec![
            loc(&game_data, "Start: Chest 1"),
            loc(&game_data, "Start: Chest 2"),
            loc(&game_data, "Start: Chest 3"),
        ];
        let gem = item(&game_data, "Gem");
        let key = item(&game_data, "Key");
        assert!(randomizer.forward_fill(&mut state, &[key, gem, gem], &locations));
        assert_eq!(state.placed_count(gem), 2);
        assert_eq!(state.placed_count(key), 1);
        assert_eq!(state.placement_log.len(), 3);
    }

    #[test]
    fn test_forward_fill_failure_rolls_back() {
        let game_data = small_world();
        let settings = small_settings();
        let randomizer = Randomizer::new(&game_data, &settings).unwrap();
        let (mut state, _) = initialized_state(&randomizer);
        let before = state.clone();
        let locations = vec![
            loc(&game_data, "Start: Chest 1"),
            loc(&game_data, "Start: Chest 2"),
            loc(&game_data, "Start: Chest 3"),
            // Not reached yet.
            loc(&game_data, "Cave: Chest 1"),
        ];
        let items = [
            item(&game_data, "Key"),
            item(&game_data, "Gem"),
            item(&game_data, "Gem"),
            item(&game_data, "Apple"),
        ];
        assert!(!randomizer.forward_fill(&mut state, &items, &locations));
        assert_eq!(state, before);
    }

    #[test]
    fn test_forward_fill_respects_forbidden_items() {
        let game_data = small_world();
        let settings = small_settings();
        let randomizer = Randomizer::new(&game_data, &settings).unwrap();
        let (mut state, _) = initialized_state(&randomizer);
        let vault = loc(&game_data, "Vault: Prize");
        state.reached[game_data.item_locations[vault].region] = true;
        let gem = item(&game_data, "Gem");
        assert!(!randomizer.can_seat(&state, gem, vault, true));
        let chest = loc(&game_data, "Start: Chest 1");
        assert!(randomizer.forward_fill(&mut state, &[gem], &[vault, chest]));
        assert_eq!(state.placed_items[chest], Some(gem));
        assert_eq!(state.placed_items[vault], None);
    }

    #[test]
    fn test_random_fill_returns_leftovers() {
        let game_data = small_world();
        let settings = small_settings();
        let randomizer = Randomizer::new(&game_data, &settings).unwrap();
        let (mut state, mut rng) = initialized_state(&randomizer);
        let herb = item(&game_data, "Herb");
        let nothing = item(&game_data, "Nothing");
        // Only three Start chests are reachable.
        let items = vec![herb, herb, nothing, nothing];
        let leftover = randomizer.random_fill(&mut state, &mut rng, items, true);
        assert_eq!(leftover.len(), 1);
        for name in ["Start: Chest 1", "Start: Chest 2", "Start: Chest 3"] {
            assert!(state.placed_items[loc(&game_data, name)].is_some());
        }
    }

    #[test]
    fn test_random_fill_respects_capacity() {
        let game_data = small_world();
        let settings = RandomizerSettings {
            max_inventory: 1,
            ..small_settings()
        };
        let randomizer = Randomizer::new(&game_data, &settings).unwrap();
        let (mut state, mut rng) = initialized_state(&randomizer);
        let apple = item(&game_data, "Apple");
        let gem = item(&game_data, "Gem");
        state.fill_item(apple, loc(&game_data, "Start: Chest 1"));
        randomizer.update_reachability(&mut state);
        let before = state.clone();
        // Holding the Apple and a Gem at once needs two slots.
        let leftover = randomizer.random_fill(&mut state, &mut rng, vec![gem], true);
        assert_eq!(leftover, vec![gem]);
        assert_eq!(state, before);
    }

    #[test]
    fn test_make_room_prefers_inventory_items() {
        let game_data = small_world();
        let settings = small_settings();
        let randomizer = Randomizer::new(&game_data, &settings).unwrap();
        let (mut state, mut rng) = initialized_state(&randomizer);
        let herb = item(&game_data, "Herb");
        state.fill_item(herb, loc(&game_data, "Start: Chest 1"));
        state.fill_item(herb, loc(&game_data, "Start: Chest 2"));
        randomizer.update_reachability(&mut state);
        let before = state.clone();
        // Only non-inventory items are evictable.
        assert_eq!(
            randomizer.make_room(0, &mut state, &mut rng, true, 1),
            Err(RandomizeError::NoEvictableLocation {
                prefer_inventory: true
            })
        );
        assert_eq!(state, before);
        assert_eq!(randomizer.make_room(0, &mut state, &mut rng, false, 1), Ok(1));
        assert_eq!(state.placed_count(herb), 1);
        assert_eq!(state.items_remaining[herb], 1);

        let apple = item(&game_data, "Apple");
        state.fill_item(apple, loc(&game_data, "Start: Chest 3"));
        randomizer.update_reachability(&mut state);
        assert_eq!(randomizer.make_room(0, &mut state, &mut rng, true, 1), Ok(1));
        assert_eq!(state.placed_count(apple), 0);
    }

    #[test]
    fn test_make_room_skips_progression_and_locked() {
        let game_data = small_world();
        let settings = small_settings();
        let randomizer = Randomizer::new(&game_data, &settings).unwrap();
        let (mut state, mut rng) = initialized_state(&randomizer);
        state.fill_item(item(&game_data, "Gem"), loc(&game_data, "Start: Chest 1"));
        let dark_space = loc(&game_data, "Start: Dark Space");
        state.fill_item(item(&game_data, "Void"), dark_space);
        state.locked[dark_space] = true;
        // Unreachable junk is not evictable either.
        state.fill_item(item(&game_data, "Herb"), loc(&game_data, "Cave: Chest 1"));
        randomizer.update_reachability(&mut state);
        assert!(randomizer
            .make_room(0, &mut state, &mut rng, false, 1)
            .is_err());
    }

    #[test]
    fn test_make_room_prefers_easy_items() {
        let game_data = small_world();
        let settings = small_settings();
        let randomizer = Randomizer::new(&game_data, &settings).unwrap();
        let herb = item(&game_data, "Herb");
        let apple = item(&game_data, "Apple");
        for seed in 0..16 {
            let (mut state, _) = initialized_state(&randomizer);
            let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
            state.fill_item(apple, loc(&game_data, "Start: Chest 1"));
            state.fill_item(herb, loc(&game_data, "Start: Chest 2"));
            randomizer.update_reachability(&mut state);
            assert_eq!(randomizer.make_room(0, &mut state, &mut rng, false, 1), Ok(1));
            assert_eq!(state.placed_count(apple), 1);
            assert_eq!(state.placed_count(herb), 0);
        }
    }

    #[test]
    fn test_rejections_fall_back_to_any_eviction() {
        let game_data = small_world();
        let settings = small_settings();
        let randomizer = Randomizer::new(&game_data, &settings).unwrap();
        let (mut state, mut rng) = initialized_state(&randomizer);
        let herb = item(&game_data, "Herb");
        state.fill_item(herb, loc(&game_data, "Start: Chest 1"));
        randomizer.update_reachability(&mut state);
        let before = state.clone();

        // Capacity was the only blocker and no inventory item is evictable.
        assert_eq!(
            randomizer.make_room_after_rejections(0, &mut state, &mut rng, true, false),
            Err(RandomizeError::NoEvictableLocation {
                prefer_inventory: true
            })
        );
        assert_eq!(state, before);

        // Another candidate lacked a seat, so freeing any location can help.
        assert_eq!(
            randomizer.make_room_after_rejections(0, &mut state, &mut rng, true, true),
            Ok(1)
        );
        assert_eq!(state.placed_count(herb), 0);
    }
}
