//! Data models for catalog entries and production-tree elements

use std::fmt;

use serde::{Deserialize, Serialize};

pub type RecipeId = i64;

/// Process-type tag used for mining facilities.
pub const PROCESS_MINING: &str = "mining";
/// Process-type tag used for extraction facilities.
pub const PROCESS_EXTRACTION: &str = "extraction";

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: String,
    pub name: String,
}

/// One `(item, count)` slot of a recipe.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemCount {
    pub item_id: String,
    pub count: f64,
}

impl ItemCount {
    pub fn new(item_id: impl Into<String>, count: f64) -> Self {
        Self {
            item_id: item_id.into(),
            count,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub id: RecipeId,
    pub name: String,
    pub process_type: String,
    pub cycle_seconds: f64,
    pub inputs: Vec<ItemCount>,
    pub outputs: Vec<ItemCount>,
}

impl Recipe {
    /// The output slot producing `item_id`, if any.
    pub fn output_for(&self, item_id: &str) -> Option<&ItemCount> {
        self.outputs.iter().find(|o| o.item_id == item_id)
    }

    /// Inputs that actually consume something, in slot order.
    pub fn active_inputs(&self) -> impl Iterator<Item = &ItemCount> {
        self.inputs.iter().filter(|i| i.count > 0.0)
    }

    pub fn total_input_count(&self) -> f64 {
        self.active_inputs().map(|i| i.count).sum()
    }
}

/// Facility definition as stored in the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct FacilityData {
    pub id: String,
    pub name: String,
    pub process_type: String,
    pub speed_multiplier: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierMode {
    #[default]
    None,
    Speed,
    Product,
}

impl fmt::Display for ModifierMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModifierMode::None => write!(f, "none"),
            ModifierMode::Speed => write!(f, "speed"),
            ModifierMode::Product => write!(f, "product"),
        }
    }
}

/// Proliferator setting on an element
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Modifier {
    pub mode: ModifierMode,
    pub level: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
}

impl Modifier {
    pub fn new(mode: ModifierMode, level: u8) -> Self {
        Self {
            mode,
            level,
            item_id: None,
        }
    }

    /// True when the modifier changes nothing.
    pub fn is_inert(&self) -> bool {
        self.mode == ModifierMode::None || self.level == 0
    }

    /// Item whose charges this modifier draws on.
    pub fn charge_item(&self) -> String {
        match &self.item_id {
            Some(id) => id.clone(),
            None => format!("proliferator_mk{}", self.level.min(3)),
        }
    }
}

/// Facility assigned to an element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub id: String,
    pub speed: f64,
    pub count: f64,
    /// Count was set explicitly and survives recalculation.
    #[serde(default)]
    pub pinned: bool,
}

impl Facility {
    pub fn new(id: impl Into<String>, speed: f64) -> Self {
        Self {
            id: id.into(),
            speed,
            count: 0.0,
            pinned: false,
        }
    }
}

/// Where an element's output comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Source {
    Recipe { recipe_id: RecipeId },
    Mining { mining_time: f64 },
    Extraction { speed: f64 },
    Gathered,
}

impl Source {
    pub fn kind(&self) -> SourceKind {
        match self {
            Source::Recipe { .. } => SourceKind::Recipe,
            Source::Mining { .. } => SourceKind::Mining,
            Source::Extraction { .. } => SourceKind::Extraction,
            Source::Gathered => SourceKind::Gathered,
        }
    }

    pub fn recipe_id(&self) -> Option<RecipeId> {
        match self {
            Source::Recipe { recipe_id } => Some(*recipe_id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Recipe,
    Mining,
    Extraction,
    Gathered,
    Unassigned,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceKind::Recipe => "recipe",
            SourceKind::Mining => "mined",
            SourceKind::Extraction => "extracted",
            SourceKind::Gathered => "gathered",
            SourceKind::Unassigned => "unassigned",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(pub u64);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Non-primary output of a recipe-backed element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Byproduct {
    pub item_id: String,
    pub rate: f64,
    #[serde(default)]
    pub consumers: Vec<ElementId>,
}

/// One node of a per-target production tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    pub item_id: String,
    pub required_rate: f64,
    pub actual_rate: f64,
    #[serde(default)]
    pub source: Option<Source>,
    #[serde(default)]
    pub facility: Option<Facility>,
    #[serde(default)]
    pub modifier: Modifier,
    #[serde(default)]
    pub children: Vec<ElementId>,
    #[serde(default)]
    pub byproducts: Vec<Byproduct>,
    #[serde(default)]
    pub depth: u32,
    #[serde(default)]
    pub parents: Vec<ElementId>,
}

impl Element {
    /// A sourceless leaf awaiting assignment.
    pub fn leaf(
        id: ElementId,
        item_id: impl Into<String>,
        required_rate: f64,
        parent: Option<ElementId>,
        depth: u32,
    ) -> Self {
        Self {
            id,
            item_id: item_id.into(),
            required_rate,
            actual_rate: 0.0,
            source: None,
            facility: None,
            modifier: Modifier::default(),
            children: Vec::new(),
            byproducts: Vec::new(),
            depth,
            parents: parent.into_iter().collect(),
        }
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source
            .as_ref()
            .map(Source::kind)
            .unwrap_or(SourceKind::Unassigned)
    }

    pub fn facility_count(&self) -> f64 {
        self.facility.as_ref().map_or(0.0, |f| f.count)
    }
}

/// A user-declared production goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: TargetId,
    pub item_id: String,
    pub rate: f64,
    pub root: ElementId,
}
