use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

/// Standard scent category.
///
/// Declaration order is significant: it is the column order of the label
/// binarizer and the tie-break order of the note selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Citrus,
    Fruity,
    Aquatic,
    Green,
    Casual,
    Floral,
    Powdery,
    Aromatic,
    Fougere,
    Spicy,
    Amber,
    Chypre,
    Gourmand,
    Cozy,
    Musk,
    Woody,
    Oriental,
    /// Sentinel for an opinion that falls outside the taxonomy
    Other,
}

/// A set of categories attached to one record
pub type CategorySet = BTreeSet<Category>;

/// Predicted probability per taxonomy category
pub type ConfidenceMap = BTreeMap<Category, f64>;

impl Category {
    /// Every taxonomy category in declaration order (the sentinel is excluded)
    pub const TAXONOMY: [Category; 17] = [
        Category::Citrus,
        Category::Fruity,
        Category::Aquatic,
        Category::Green,
        Category::Casual,
        Category::Floral,
        Category::Powdery,
        Category::Aromatic,
        Category::Fougere,
        Category::Spicy,
        Category::Amber,
        Category::Chypre,
        Category::Gourmand,
        Category::Cozy,
        Category::Musk,
        Category::Woody,
        Category::Oriental,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Citrus => "citrus",
            Category::Fruity => "fruity",
            Category::Aquatic => "aquatic",
            Category::Green => "green",
            Category::Casual => "casual",
            Category::Floral => "floral",
            Category::Powdery => "powdery",
            Category::Aromatic => "aromatic",
            Category::Fougere => "fougere",
            Category::Spicy => "spicy",
            Category::Amber => "amber",
            Category::Chypre => "chypre",
            Category::Gourmand => "gourmand",
            Category::Cozy => "cozy",
            Category::Musk => "musk",
            Category::Woody => "woody",
            Category::Oriental => "oriental",
            Category::Other => "other",
        }
    }

    /// Parses an exact standard token (including the `other` sentinel)
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim().to_lowercase();
        Category::TAXONOMY
            .iter()
            .copied()
            .chain(std::iter::once(Category::Other))
            .find(|c| c.as_str() == token)
    }

    pub fn is_sentinel(&self) -> bool {
        *self == Category::Other
    }

    /// The note layer this category belongs to, `None` for the sentinel
    pub fn layer(&self) -> Option<NoteLayer> {
        NoteLayer::ALL
            .into_iter()
            .find(|layer| layer.members().contains(self))
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fragrance note layer used to structure a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteLayer {
    Top,
    Middle,
    Base,
}

const TOP_NOTES: &[Category] = &[
    Category::Citrus,
    Category::Fruity,
    Category::Aquatic,
    Category::Green,
    Category::Casual,
];

const MIDDLE_NOTES: &[Category] = &[
    Category::Floral,
    Category::Powdery,
    Category::Aromatic,
    Category::Fougere,
    Category::Spicy,
];

const BASE_NOTES: &[Category] = &[
    Category::Amber,
    Category::Chypre,
    Category::Gourmand,
    Category::Cozy,
    Category::Musk,
    Category::Woody,
    Category::Oriental,
];

impl NoteLayer {
    pub const ALL: [NoteLayer; 3] = [NoteLayer::Top, NoteLayer::Middle, NoteLayer::Base];

    /// Members of the layer in taxonomy declaration order
    pub fn members(&self) -> &'static [Category] {
        match self {
            NoteLayer::Top => TOP_NOTES,
            NoteLayer::Middle => MIDDLE_NOTES,
            NoteLayer::Base => BASE_NOTES,
        }
    }
}

/// Near-duplicate variants folded into their canonical category.
///
/// This is the only place where category merging is declared.
pub const MERGE_TABLE: &[(&str, Category)] = &[
    ("white floral", Category::Floral),
    ("light floral", Category::Floral),
    ("soft floral", Category::Floral),
    ("floral fruity", Category::Fruity),
    ("soft amber", Category::Amber),
    ("woody amber", Category::Amber),
    ("warm spicy", Category::Spicy),
    ("fresh spicy", Category::Spicy),
    ("marine", Category::Aquatic),
    ("fresh", Category::Aquatic),
    ("leather", Category::Woody),
];

/// Resolves a variant or standard token to its canonical category
pub fn canonicalize(token: &str) -> Option<Category> {
    let token = token.trim().to_lowercase();
    MERGE_TABLE
        .iter()
        .find(|(variant, _)| *variant == token)
        .map(|(_, category)| *category)
        .or_else(|| Category::from_token(&token))
}

/// A confidence map with every taxonomy category at zero
pub fn zero_confidence() -> ConfidenceMap {
    Category::TAXONOMY.iter().map(|c| (*c, 0.0)).collect()
}
