use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Highest rating a resident can hold in a category.
pub const MAX_SKILL: u8 = 9;
/// Rating assumed when a category was never supplied.
pub const DEFAULT_SKILL: u8 = 5;
/// Minimum rating that counts a resident as qualified for a shop's category.
pub const QUALIFIED_SKILL: u8 = 5;

/// Identifier shared by residents and shops; both draw from one roster counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Food,
    Service,
    Recreation,
    Creative,
    Retail,
}

impl Category {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Food,
            Self::Service,
            Self::Recreation,
            Self::Creative,
            Self::Retail,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Food => "Food",
            Self::Service => "Service",
            Self::Recreation => "Recreation",
            Self::Creative => "Creative",
            Self::Retail => "Retail",
        }
    }

    /// Case-insensitive lookup; accepts the short "rec" form used on the skill sliders.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "food" => Some(Self::Food),
            "service" => Some(Self::Service),
            "recreation" | "rec" => Some(Self::Recreation),
            "creative" => Some(Self::Creative),
            "retail" => Some(Self::Retail),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category '{0}' (expected Food, Service, Recreation, Creative or Retail)")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value).ok_or_else(|| UnknownCategory(value.to_string()))
    }
}

fn default_skill() -> u8 {
    DEFAULT_SKILL
}

/// One rating per category. Missing keys deserialize to [`DEFAULT_SKILL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SkillSet {
    #[serde(default = "default_skill")]
    pub food: u8,
    #[serde(default = "default_skill")]
    pub service: u8,
    #[serde(default = "default_skill")]
    pub recreation: u8,
    #[serde(default = "default_skill")]
    pub creative: u8,
    #[serde(default = "default_skill")]
    pub retail: u8,
}

impl Default for SkillSet {
    fn default() -> Self {
        Self::uniform(DEFAULT_SKILL)
    }
}

impl SkillSet {
    pub const fn uniform(value: u8) -> Self {
        Self {
            food: value,
            service: value,
            recreation: value,
            creative: value,
            retail: value,
        }
    }

    pub const fn get(&self, category: Category) -> u8 {
        match category {
            Category::Food => self.food,
            Category::Service => self.service,
            Category::Recreation => self.recreation,
            Category::Creative => self.creative,
            Category::Retail => self.retail,
        }
    }

    pub fn set(&mut self, category: Category, value: u8) {
        let slot = match category {
            Category::Food => &mut self.food,
            Category::Service => &mut self.service,
            Category::Recreation => &mut self.recreation,
            Category::Creative => &mut self.creative,
            Category::Retail => &mut self.retail,
        };
        *slot = value;
    }

    pub fn with(mut self, category: Category, value: u8) -> Self {
        self.set(category, value);
        self
    }

    /// Strongest category; the earlier category in display order wins a tie.
    pub fn best(&self) -> (Category, u8) {
        Category::ordered()
            .into_iter()
            .map(|category| (category, self.get(category)))
            .fold((Category::Food, self.food), |best, candidate| {
                if candidate.1 > best.1 {
                    candidate
                } else {
                    best
                }
            })
    }

    /// First category whose rating is above [`MAX_SKILL`], if any.
    pub fn out_of_range(&self) -> Option<(Category, u8)> {
        Category::ordered()
            .into_iter()
            .map(|category| (category, self.get(category)))
            .find(|(_, value)| *value > MAX_SKILL)
    }

    pub fn apply(&mut self, partial: &PartialSkills) {
        for (category, value) in partial.iter() {
            self.set(category, value);
        }
    }
}

/// Ratings for a subset of categories; absent categories are left untouched on merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartialSkills(BTreeMap<Category, u8>);

impl PartialSkills {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category: Category, value: u8) {
        self.0.insert(category, value);
    }

    pub fn with(mut self, category: Category, value: u8) -> Self {
        self.insert(category, value);
        self
    }

    pub fn get(&self, category: Category) -> Option<u8> {
        self.0.get(&category).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, u8)> + '_ {
        self.0.iter().map(|(category, value)| (*category, *value))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fills every missing category with [`DEFAULT_SKILL`].
    pub fn complete(&self) -> SkillSet {
        let mut skills = SkillSet::default();
        skills.apply(self);
        skills
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resident {
    pub id: EntityId,
    pub name: String,
    pub skills: SkillSet,
    /// Free-text shop name; may reference a shop that does not exist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dream_job: Option<String>,
}

impl Resident {
    pub fn skill(&self, category: Category) -> u8 {
        self.skills.get(category)
    }

    pub fn dreams_of(&self, shop_name: &str) -> bool {
        self.dream_job
            .as_deref()
            .is_some_and(|dream| names_match(dream, shop_name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shop {
    pub id: EntityId,
    pub name: String,
    pub category: Category,
    pub capacity: u32,
}

impl Shop {
    pub fn max_skill(&self) -> u32 {
        self.capacity * u32::from(MAX_SKILL)
    }
}

/// Shop id to ordered resident ids; index in the sequence is the slot number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssignmentTable {
    slots: BTreeMap<EntityId, Vec<EntityId>>,
}

impl AssignmentTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no shop has an entry at all (empty sequences still count as entries).
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn get(&self, shop: EntityId) -> &[EntityId] {
        self.slots.get(&shop).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains_shop(&self, shop: EntityId) -> bool {
        self.slots.contains_key(&shop)
    }

    pub fn entries(&self) -> impl Iterator<Item = (EntityId, &[EntityId])> + '_ {
        self.slots
            .iter()
            .map(|(shop, residents)| (*shop, residents.as_slice()))
    }

    pub fn insert(&mut self, shop: EntityId, residents: Vec<EntityId>) {
        self.slots.insert(shop, residents);
    }

    pub(crate) fn sequence_mut(&mut self, shop: EntityId) -> &mut Vec<EntityId> {
        self.slots.entry(shop).or_default()
    }

    pub fn shop_of(&self, resident: EntityId) -> Option<EntityId> {
        self.slots
            .iter()
            .find(|(_, residents)| residents.contains(&resident))
            .map(|(shop, _)| *shop)
    }

    pub fn filled_slots(&self) -> usize {
        self.slots.values().map(Vec::len).sum()
    }

    pub fn remove_shop(&mut self, shop: EntityId) -> Option<Vec<EntityId>> {
        self.slots.remove(&shop)
    }

    pub fn remove_resident(&mut self, resident: EntityId) {
        for residents in self.slots.values_mut() {
            residents.retain(|id| *id != resident);
        }
    }

    pub fn truncate_shop(&mut self, shop: EntityId, capacity: u32) {
        if let Some(residents) = self.slots.get_mut(&shop) {
            residents.truncate(capacity as usize);
        }
    }
}

/// Canonical form for case-insensitive, whitespace-trimmed name comparisons.
pub fn normalize_name(value: &str) -> String {
    value.trim().to_lowercase()
}

pub fn names_match(left: &str, right: &str) -> bool {
    normalize_name(left) == normalize_name(right)
}
