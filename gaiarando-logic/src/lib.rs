use gaiarando_game::{ItemDefinition, ItemId, Requirement};
use serde::{Deserialize, Serialize};

/// Multiset of items held by the player, indexed by ItemId.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub counts: Vec<usize>,
}

impl Inventory {
    pub fn new(num_items: usize) -> Self {
        Inventory {
            counts: vec![0; num_items],
        }
    }

    pub fn count(&self, item: ItemId) -> usize {
        self.counts[item]
    }

    pub fn add(&mut self, item: ItemId, count: usize) {
        self.counts[item] += count;
    }

    pub fn add_requirement(&mut self, req: &Requirement) {
        for &(item, count) in &req.items {
            self.counts[item] += count;
        }
    }

    pub fn remove(&mut self, item: ItemId, count: usize) {
        self.counts[item] = self.counts[item].saturating_sub(count);
    }

    /// Removes consumed items; never goes below zero.
    pub fn strip(&mut self, req: &Requirement) {
        for &(item, count) in &req.items {
            self.remove(item, count);
        }
    }

    pub fn satisfies(&self, req: &Requirement) -> bool {
        req.items.iter().all(|&(item, count)| self.counts[item] >= count)
    }

    /// The part of `req` not already covered by this inventory.
    pub fn residual(&self, req: &Requirement) -> Requirement {
        Requirement::new(
            req.items
                .iter()
                .map(|&(item, count)| (item, count.saturating_sub(self.counts[item]))),
        )
    }

    /// Number of inventory slots in use. Stackable items take one slot regardless of count.
    pub fn occupied_slots(&self, items: &[ItemDefinition]) -> usize {
        let mut total = 0;
        for (i, item) in items.iter().enumerate() {
            let count = self.counts[i];
            if count == 0 {
                continue;
            }
            total += match item.inventory {
                gaiarando_game::InventorySlot::None => 0,
                gaiarando_game::InventorySlot::Slot => count,
                gaiarando_game::InventorySlot::Stack => 1,
            };
        }
        total
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn held_items(&self) -> Vec<(ItemId, usize)> {
        self.counts
            .iter()
            .enumerate()
            .filter(|x| *x.1 > 0)
            .map(|(i, &c)| (i, c))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gaiarando_game::{InventorySlot, ItemCategory, ProgressionClass};

    fn item_def(name: &str, inventory: InventorySlot) -> ItemDefinition {
        ItemDefinition {
            name: name.to_string(),
            category: ItemCategory::Item,
            count: 1,
            inventory,
            progression: ProgressionClass::OpensLocations,
            filler: false,
            easy_mode: false,
        }
    }

    #[test]
    fn test_strip_saturates() {
        let mut inv = Inventory::new(2);
        inv.add(0, 1);
        inv.strip(&Requirement::new(vec![(0, 3), (1, 1)]));
        assert_eq!(inv.counts, vec![0, 0]);
    }

    #[test]
    fn test_residual() {
        let mut inv = Inventory::new(3);
        inv.add(0, 2);
        inv.add(2, 1);
        let req = Requirement::new(vec![(0, 3), (1, 1), (2, 1)]);
        assert!(!inv.satisfies(&req));
        assert_eq!(inv.residual(&req).items, vec![(0, 1), (1, 1)]);
        inv.add_requirement(&inv.residual(&req));
        assert!(inv.satisfies(&req));
        assert!(inv.residual(&req).is_empty());
    }

    #[test]
    fn test_occupied_slots() {
        let items = vec![
            item_def("Key", InventorySlot::Slot),
            item_def("Jewel", InventorySlot::Stack),
            item_def("Dash", InventorySlot::None),
        ];
        let mut inv = Inventory::new(3);
        inv.add(0, 2);
        inv.add(1, 5);
        inv.add(2, 1);
        assert_eq!(inv.occupied_slots(&items), 3);
    }

    #[test]
    fn test_held_items_skips_empty_counts() {
        let mut inv = Inventory::new(4);
        inv.add(1, 2);
        inv.add(3, 1);
        assert_eq!(inv.held_items(), vec![(1, 2), (3, 1)]);
        assert_eq!(inv.total(), 3);
    }
}
