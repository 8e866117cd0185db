use serde::Serialize;
use uuid::Uuid;

use crate::models::{Category, NoteLayer, Perfume, Trait, TraitRecord};

use crate::models::NoteLayer::{Base, Middle, Top};

struct SeedProduct {
    category: Category,
    name: &'static str,
    age_group: &'static str,
    gender: &'static str,
    purposes: &'static [&'static str],
    description: &'static str,
    /// Essential oils; the alcohol carrier fills the formula up to 100%
    oils: &'static [(&'static str, f64, NoteLayer)],
}

const BRAND: &str = "Atelier Note";

const SEED_PRODUCTS: &[SeedProduct] = &[
    SeedProduct {
        category: Category::Citrus,
        name: "Lemon Grove Breeze",
        age_group: "young",
        gender: "unisex",
        purposes: &["daily", "special"],
        description: "Sparkling lemon and bergamot over a clean musk.",
        oils: &[
            ("Bergamot Oil", 10.0, Top),
            ("Lemon Zest", 8.0, Top),
            ("Neroli", 7.0, Middle),
            ("Petitgrain", 5.0, Middle),
            ("Musk", 5.0, Base),
        ],
    },
    SeedProduct {
        category: Category::Citrus,
        name: "Bergamot Bliss",
        age_group: "adult",
        gender: "unisex",
        purposes: &["work", "daily"],
        description: "Italian bergamot and mandarin softened by oakmoss.",
        oils: &[
            ("Bergamot", 9.0, Top),
            ("Mandarin", 8.0, Top),
            ("Neroli", 6.0, Middle),
            ("Oakmoss", 5.0, Base),
            ("Amber", 5.0, Base),
        ],
    },
    SeedProduct {
        category: Category::Fruity,
        name: "Peach Blossom Bliss",
        age_group: "young",
        gender: "female",
        purposes: &["date", "daily"],
        description: "Juicy peach and raspberry with a jasmine heart.",
        oils: &[
            ("Peach", 8.0, Top),
            ("Apple", 7.0, Top),
            ("Raspberry", 7.0, Middle),
            ("Jasmine", 6.0, Middle),
            ("Musk", 7.0, Base),
        ],
    },
    SeedProduct {
        category: Category::Aquatic,
        name: "Oceanic Blue Wave",
        age_group: "young",
        gender: "unisex",
        purposes: &["daily"],
        description: "Marine accord and sea spray drying down to driftwood.",
        oils: &[
            ("Marine Accord", 10.0, Top),
            ("Sea Spray", 7.0, Middle),
            ("Cucumber", 6.0, Middle),
            ("Driftwood", 7.0, Base),
            ("White Musk", 5.0, Base),
        ],
    },
    SeedProduct {
        category: Category::Green,
        name: "Spring Meadow",
        age_group: "all",
        gender: "unisex",
        purposes: &["daily", "work"],
        description: "Galbanum and crushed leaves over oakmoss.",
        oils: &[
            ("Galbanum", 8.0, Top),
            ("Green Leaves", 7.0, Middle),
            ("Herb Accord", 7.0, Middle),
            ("Oakmoss", 8.0, Base),
            ("Cedarwood", 5.0, Base),
        ],
    },
    SeedProduct {
        category: Category::Casual,
        name: "Everyday Comfort",
        age_group: "all",
        gender: "unisex",
        purposes: &["daily"],
        description: "Fresh cotton and linen, easy to wear anywhere.",
        oils: &[
            ("Mandarin", 7.0, Top),
            ("Cotton Accord", 8.0, Middle),
            ("Linen", 8.0, Middle),
            ("Musk", 7.0, Base),
            ("Cedarwood", 5.0, Base),
        ],
    },
    SeedProduct {
        category: Category::Floral,
        name: "Rose Petal Symphony",
        age_group: "adult",
        gender: "female",
        purposes: &["date", "special"],
        description: "Rose absolute with peony and jasmine.",
        oils: &[
            ("Rose Absolute", 10.0, Top),
            ("Peony", 7.0, Middle),
            ("Jasmine", 7.0, Middle),
            ("Violet", 6.0, Base),
            ("Musk", 5.0, Base),
        ],
    },
    SeedProduct {
        category: Category::Floral,
        name: "Light Lily Whisper",
        age_group: "young",
        gender: "female",
        purposes: &["daily"],
        description: "A light bouquet of lily, freesia and cyclamen.",
        oils: &[
            ("Lily", 8.0, Top),
            ("Freesia", 7.0, Middle),
            ("Cyclamen", 7.0, Middle),
            ("Musk", 8.0, Base),
            ("Sandalwood", 5.0, Base),
        ],
    },
    SeedProduct {
        category: Category::Floral,
        name: "White Jasmine Aura",
        age_group: "mature",
        gender: "female",
        purposes: &["special"],
        description: "Creamy white flowers: jasmine, tuberose and gardenia.",
        oils: &[
            ("Jasmine", 10.0, Top),
            ("Tuberose", 8.0, Middle),
            ("Gardenia", 7.0, Middle),
            ("Musk", 8.0, Base),
            ("Sandalwood", 5.0, Base),
        ],
    },
    SeedProduct {
        category: Category::Powdery,
        name: "Soft Powder Veil",
        age_group: "adult",
        gender: "female",
        purposes: &["work", "date"],
        description: "Iris and violet wrapped in soft musk.",
        oils: &[
            ("Aldehydes", 7.0, Top),
            ("Iris", 8.0, Middle),
            ("Violet", 7.0, Middle),
            ("Musk", 8.0, Base),
            ("Sandalwood", 5.0, Base),
        ],
    },
    SeedProduct {
        category: Category::Aromatic,
        name: "Herbal Harmony",
        age_group: "adult",
        gender: "unisex",
        purposes: &["work"],
        description: "Lavender, rosemary and sage on cedarwood.",
        oils: &[
            ("Lavender", 8.0, Top),
            ("Rosemary", 7.0, Middle),
            ("Sage", 7.0, Middle),
            ("Thyme", 6.0, Base),
            ("Cedarwood", 7.0, Base),
        ],
    },
    SeedProduct {
        category: Category::Fougere,
        name: "Lavender Fern Mist",
        age_group: "adult",
        gender: "male",
        purposes: &["work", "daily"],
        description: "Classic lavender, geranium and coumarin.",
        oils: &[
            ("Lavender", 8.0, Top),
            ("Geranium", 7.0, Middle),
            ("Oakmoss", 8.0, Base),
            ("Coumarin", 7.0, Base),
            ("Tonka Bean", 7.0, Base),
        ],
    },
    SeedProduct {
        category: Category::Spicy,
        name: "Spiced Saffron Touch",
        age_group: "adult",
        gender: "unisex",
        purposes: &["special", "date"],
        description: "Pink pepper, saffron and cinnamon with patchouli.",
        oils: &[
            ("Pink Pepper", 8.0, Top),
            ("Saffron", 7.0, Middle),
            ("Cinnamon", 8.0, Middle),
            ("Clove", 7.0, Base),
            ("Patchouli", 5.0, Base),
        ],
    },
    SeedProduct {
        category: Category::Amber,
        name: "Golden Amber Night",
        age_group: "mature",
        gender: "unisex",
        purposes: &["special"],
        description: "Resinous amber and benzoin with a touch of vanilla.",
        oils: &[
            ("Mandarin", 7.0, Top),
            ("Benzoin", 8.0, Middle),
            ("Amber", 12.0, Base),
            ("Labdanum", 7.0, Base),
            ("Vanilla", 5.0, Base),
        ],
    },
    SeedProduct {
        category: Category::Chypre,
        name: "Mossy Forest Classic",
        age_group: "mature",
        gender: "female",
        purposes: &["work", "special"],
        description: "Bergamot, labdanum and oakmoss in the chypre tradition.",
        oils: &[
            ("Bergamot", 8.0, Top),
            ("Labdanum", 7.0, Middle),
            ("Oakmoss", 10.0, Base),
            ("Patchouli", 7.0, Base),
            ("Musk", 5.0, Base),
        ],
    },
    SeedProduct {
        category: Category::Gourmand,
        name: "Vanilla Caramel Dream",
        age_group: "young",
        gender: "female",
        purposes: &["daily", "date"],
        description: "Caramel and chocolate over vanilla absolute.",
        oils: &[
            ("Orange", 7.0, Top),
            ("Caramel", 8.0, Middle),
            ("Chocolate", 7.0, Middle),
            ("Vanilla Absolute", 10.0, Base),
            ("Tonka Bean", 5.0, Base),
        ],
    },
    SeedProduct {
        category: Category::Cozy,
        name: "Warm Cashmere Hug",
        age_group: "all",
        gender: "unisex",
        purposes: &["daily"],
        description: "Cashmere wood and vanilla, soft as a sweater.",
        oils: &[
            ("Pear", 7.0, Top),
            ("Cashmere Wood", 8.0, Middle),
            ("Vanilla", 8.0, Middle),
            ("Tonka Bean", 7.0, Base),
            ("Musk", 5.0, Base),
        ],
    },
    SeedProduct {
        category: Category::Musk,
        name: "Pure White Musk",
        age_group: "all",
        gender: "unisex",
        purposes: &["daily", "work"],
        description: "Clean white musk with aldehydes and tonka.",
        oils: &[
            ("Aldehydes", 6.0, Top),
            ("White Flowers", 6.0, Middle),
            ("White Musk", 15.0, Base),
            ("Tonka Bean", 5.0, Base),
        ],
    },
    SeedProduct {
        category: Category::Woody,
        name: "Cedarwood Essence",
        age_group: "adult",
        gender: "male",
        purposes: &["work", "daily"],
        description: "Cypress and pine over cedarwood and sandalwood.",
        oils: &[
            ("Cypress", 8.0, Top),
            ("Pine", 7.0, Middle),
            ("Cedarwood Oil", 10.0, Base),
            ("Sandalwood", 8.0, Base),
            ("Vetiver", 5.0, Base),
        ],
    },
    SeedProduct {
        category: Category::Oriental,
        name: "Mystique of the East",
        age_group: "mature",
        gender: "unisex",
        purposes: &["special", "date"],
        description: "Saffron and cardamom over oud and amber.",
        oils: &[
            ("Saffron", 7.0, Top),
            ("Cardamom", 6.0, Middle),
            ("Oud Oil", 8.0, Base),
            ("Amber", 9.0, Base),
            ("Vanilla", 5.0, Base),
        ],
    },
];

impl SeedProduct {
    fn build(&self) -> Perfume {
        let mut perfume = Perfume::new(self.name, BRAND, self.category);
        perfume.description = self.description.to_string();
        perfume.age_group = self.age_group.to_string();
        perfume.gender_target = self.gender.to_string();
        perfume.purposes = self.purposes.iter().map(|p| p.to_string()).collect();

        for &(name, percentage, layer) in self.oils {
            perfume.add_ingredient(name, percentage, Some(layer));
        }
        let carrier = 100.0 - perfume.recipe_total();
        perfume.add_ingredient("Alcohol", carrier, None);
        perfume
    }
}

/// Why a product fits a person
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchFactor {
    AgeGroup,
    Gender,
    Purpose,
}

/// A product chosen for a person, with the traits it matched on
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogMatch<'a> {
    pub perfume: &'a Perfume,
    pub factors: Vec<MatchFactor>,
}

fn match_factors(perfume: &Perfume, record: &TraitRecord) -> Vec<MatchFactor> {
    let mut factors = Vec::new();
    if perfume.age_group == record.age_group() {
        factors.push(MatchFactor::AgeGroup);
    }
    let gender = record.token(Trait::Gender);
    if perfume.gender_target == gender {
        factors.push(MatchFactor::Gender);
    }
    let purpose = record.token(Trait::Purpose);
    if perfume.purposes.iter().any(|p| *p == purpose) {
        factors.push(MatchFactor::Purpose);
    }
    factors
}

/// Product catalog with formulas
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    perfumes: Vec<Perfume>,
}

impl Catalog {
    pub fn new(perfumes: Vec<Perfume>) -> Self {
        Self { perfumes }
    }

    /// Built-in products: at least one per taxonomy category
    pub fn seeded() -> Self {
        Self::new(SEED_PRODUCTS.iter().map(SeedProduct::build).collect())
    }

    pub fn all(&self) -> &[Perfume] {
        &self.perfumes
    }

    pub fn get(&self, id: Uuid) -> Option<&Perfume> {
        self.perfumes.iter().find(|p| p.id == id)
    }

    pub fn by_category(&self, category: Category) -> Vec<&Perfume> {
        self.perfumes
            .iter()
            .filter(|p| p.category == category)
            .collect()
    }

    /// Best product of `category` for `record`.
    ///
    /// Products outside the person's age group or gender are skipped unless
    /// nothing else is left. Remaining products rank by the number of match
    /// factors, then by name.
    pub fn pick(&self, category: Category, record: &TraitRecord) -> Option<CatalogMatch<'_>> {
        let candidates = self.by_category(category);
        let age_group = record.age_group();
        let gender = record.token(Trait::Gender);

        let suitable: Vec<&Perfume> = candidates
            .iter()
            .copied()
            .filter(|p| p.suits_age_group(age_group) && p.suits_gender(&gender))
            .collect();
        let pool = if suitable.is_empty() {
            tracing::debug!(%category, age_group, %gender, "No exact catalog match, relaxing filters");
            candidates
        } else {
            suitable
        };

        pool.into_iter()
            .map(|perfume| CatalogMatch {
                factors: match_factors(perfume, record),
                perfume,
            })
            .max_by(|a, b| {
                a.factors
                    .len()
                    .cmp(&b.factors.len())
                    .then_with(|| b.perfume.name.cmp(&a.perfume.name))
            })
    }
}

/// Short human-readable explanation of a recommended category
pub fn reason_for(category: Category, record: &TraitRecord) -> String {
    let age = record.age_or_default();
    let gender = record.token(Trait::Gender);
    let purpose = record.token(Trait::Purpose);
    let personality = record.token(Trait::Personality);

    let mut reasons: Vec<&str> = Vec::new();
    match category {
        Category::Citrus | Category::Fruity | Category::Green => {
            if age < 30 {
                reasons.push("A bright, lively opening that matches your energy.");
            }
            if purpose == "daily" {
                reasons.push("Fresh enough to wear every day.");
            }
        }
        Category::Aquatic | Category::Casual => {
            if purpose == "daily" {
                reasons.push("A clean, easygoing scent for everyday wear.");
            }
        }
        Category::Floral | Category::Powdery => {
            if gender == "female" {
                reasons.push("A graceful floral heart that highlights your elegance.");
            }
            if purpose == "date" {
                reasons.push("Soft and romantic, made for a date.");
            }
        }
        Category::Woody | Category::Musk | Category::Chypre => {
            if personality.starts_with('i') {
                reasons.push("A calm, grounded base that reflects your inner depth.");
            }
            if purpose == "work" {
                reasons.push("Understated and polished for the office.");
            }
        }
        Category::Oriental | Category::Amber | Category::Spicy => {
            if age > 40 {
                reasons.push("A warm, mature depth that brings out your charm.");
            }
            if purpose == "special" {
                reasons.push("Rich enough for a special occasion.");
            }
        }
        Category::Gourmand | Category::Cozy => {
            reasons.push("A sweet, comforting warmth that stays close to the skin.");
        }
        Category::Aromatic | Category::Fougere => {
            if purpose == "work" {
                reasons.push("A crisp herbal freshness that keeps you focused.");
            }
        }
        Category::Other => {}
    }

    if reasons.is_empty() {
        format!("This {} scent suits your preferences.", category)
    } else {
        reasons.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(age: u32, gender: &str, purpose: &str) -> TraitRecord {
        TraitRecord {
            age: Some(age),
            gender: Some(gender.to_string()),
            purpose: Some(purpose.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_seeded_catalog_covers_taxonomy() {
        let catalog = Catalog::seeded();
        for category in Category::TAXONOMY {
            assert!(
                !catalog.by_category(category).is_empty(),
                "no product for {category}"
            );
        }
    }

    #[test]
    fn test_recipes_sum_to_one_hundred() {
        for perfume in Catalog::seeded().all() {
            assert!((perfume.recipe_total() - 100.0).abs() < 1e-9, "{}", perfume.name);
            for layer in NoteLayer::ALL {
                assert!(!perfume.notes(layer).is_empty(), "{} lacks {:?} notes", perfume.name, layer);
            }
        }
    }

    #[test]
    fn test_pick_prefers_age_group() {
        let catalog = Catalog::seeded();

        let young = catalog.pick(Category::Floral, &person(22, "female", "daily")).unwrap();
        assert_eq!(young.perfume.name, "Light Lily Whisper");
        assert!(young.factors.contains(&MatchFactor::AgeGroup));
        assert!(young.factors.contains(&MatchFactor::Purpose));

        let mature = catalog.pick(Category::Floral, &person(60, "female", "special")).unwrap();
        assert_eq!(mature.perfume.name, "White Jasmine Aura");
    }

    #[test]
    fn test_pick_relaxes_filters() {
        let catalog = Catalog::seeded();
        // Only female floral products exist
        let pick = catalog.pick(Category::Floral, &person(35, "male", "work")).unwrap();
        assert_eq!(pick.perfume.category, Category::Floral);
    }

    #[test]
    fn test_pick_breaks_ties_by_name() {
        let catalog = Catalog::new(vec![
            Perfume::new("Zephyr", "Brand", Category::Green),
            Perfume::new("Alder", "Brand", Category::Green),
        ]);
        let pick = catalog.pick(Category::Green, &TraitRecord::default()).unwrap();
        assert_eq!(pick.perfume.name, "Alder");
    }

    #[test]
    fn test_pick_without_products() {
        let catalog = Catalog::default();
        assert!(catalog.pick(Category::Woody, &TraitRecord::default()).is_none());
    }

    #[test]
    fn test_get_by_id() {
        let catalog = Catalog::seeded();
        let id = catalog.all()[0].id;
        assert_eq!(catalog.get(id).unwrap().id, id);
        assert!(catalog.get(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_reason_for() {
        let young = person(22, "female", "daily");
        assert!(reason_for(Category::Citrus, &young).contains("energy"));

        let fallback = reason_for(Category::Aromatic, &TraitRecord::default());
        assert_eq!(fallback, "This aromatic scent suits your preferences.");
    }
}
