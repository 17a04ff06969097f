use std::collections::BTreeMap;

use smallvec::SmallVec;

use crate::catalog::DressSlot;
use crate::texture::TextureRegion;

/// Item texture code that carries no pixels and is never overlaid.
pub const IGNORED_ITEM_TEXTURE: &str = "seraph";

/// Baked item texture: a named region of the host's item texture atlas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemTexture {
    pub code: String,
    pub region: TextureRegion,
}

/// Worn item as seen by the compositors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemStack {
    pub code: String,
    pub textures: Vec<ItemTexture>,
    /// Base shape elements hidden while this item is worn
    pub disable_elements: SmallVec<[String; 2]>,
}

impl ItemStack {
    #[must_use]
    pub fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_texture(mut self, code: &str, region: TextureRegion) -> Self {
        self.textures.push(ItemTexture {
            code: code.to_string(),
            region,
        });
        self
    }

    #[must_use]
    pub fn with_disabled_elements(mut self, elements: &[&str]) -> Self {
        self.disable_elements = elements.iter().map(|e| (*e).to_string()).collect();
        self
    }

    /// Items without a first texture are unknown or corrupted and are
    /// treated as not worn.
    #[must_use]
    pub fn has_valid_texture(&self) -> bool {
        !self.textures.is_empty()
    }
}

/// Character inventory of worn items.
pub trait Inventory {
    fn stack(&self, slot: DressSlot) -> Option<&ItemStack>;

    /// Every occupied slot.
    fn stacks(&self) -> Box<dyn Iterator<Item = &ItemStack> + '_>;

    /// Player toggle that hides all worn clothing.
    fn hides_clothing(&self) -> bool {
        false
    }
}

/// True when any of `slots` holds an item with a valid texture.
pub fn is_any_slot_worn(inventory: &dyn Inventory, slots: &[DressSlot]) -> bool {
    slots
        .iter()
        .any(|&slot| inventory.stack(slot).is_some_and(ItemStack::has_valid_texture))
}

/// Slot-map inventory.
#[derive(Debug, Clone, Default)]
pub struct Equipment {
    slots: BTreeMap<DressSlot, ItemStack>,
    hide_clothing: bool,
}

impl Equipment {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Puts `stack` into `slot`, returning what was there.
    pub fn equip(&mut self, slot: DressSlot, stack: ItemStack) -> Option<ItemStack> {
        self.slots.insert(slot, stack)
    }

    pub fn unequip(&mut self, slot: DressSlot) -> Option<ItemStack> {
        self.slots.remove(&slot)
    }

    pub fn set_hide_clothing(&mut self, hide: bool) {
        self.hide_clothing = hide;
    }
}

impl Inventory for Equipment {
    fn stack(&self, slot: DressSlot) -> Option<&ItemStack> {
        self.slots.get(&slot)
    }

    fn stacks(&self) -> Box<dyn Iterator<Item = &ItemStack> + '_> {
        Box::new(self.slots.values())
    }

    fn hides_clothing(&self) -> bool {
        self.hide_clothing
    }
}
