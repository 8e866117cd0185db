use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::{
    error::ModelResult,
    models::{CorpusRow, TraitRecord},
};

use super::CorpusProvider;

/// A scent profile and the kind of person it was made for
struct Archetype {
    category: &'static str,
    age_group: &'static str,
    /// "male", "female" or "unisex"
    gender: &'static str,
    personalities: &'static [&'static str],
    purpose: &'static str,
    style: &'static str,
    color: &'static str,
}

const ARCHETYPES: &[Archetype] = &[
    Archetype {
        category: "citrus, green",
        age_group: "young",
        gender: "unisex",
        personalities: &["ENFP", "ESTP"],
        purpose: "daily",
        style: "casual",
        color: "yellow",
    },
    Archetype {
        category: "fruity",
        age_group: "young",
        gender: "female",
        personalities: &["ENFP", "INFJ"],
        purpose: "date",
        style: "lovely",
        color: "pink",
    },
    Archetype {
        category: "aquatic (marine)",
        age_group: "young",
        gender: "male",
        personalities: &["ESTP", "ISTJ"],
        purpose: "daily",
        style: "sporty",
        color: "blue",
    },
    Archetype {
        category: "casual, 그린",
        age_group: "young",
        gender: "unisex",
        personalities: &["ESTP", "ISTJ"],
        purpose: "daily",
        style: "sporty",
        color: "green",
    },
    Archetype {
        category: "gourmand / cozy",
        age_group: "young",
        gender: "female",
        personalities: &["INFJ"],
        purpose: "daily",
        style: "casual",
        color: "beige",
    },
    Archetype {
        category: "white floral, powdery",
        age_group: "adult",
        gender: "female",
        personalities: &["INFJ", "ENFP"],
        purpose: "date",
        style: "feminine",
        color: "pink",
    },
    Archetype {
        category: "aromatic, fougere",
        age_group: "adult",
        gender: "male",
        personalities: &["ISTJ", "ESTP"],
        purpose: "work",
        style: "classic",
        color: "navy",
    },
    Archetype {
        category: "spicy",
        age_group: "adult",
        gender: "unisex",
        personalities: &["ESTP", "ENFP"],
        purpose: "special",
        style: "street",
        color: "red",
    },
    Archetype {
        category: "woody, musk",
        age_group: "adult",
        gender: "male",
        personalities: &["ISTJ", "INFJ"],
        purpose: "work",
        style: "minimal",
        color: "black",
    },
    Archetype {
        category: "amber, 오리엔탈",
        age_group: "mature",
        gender: "female",
        personalities: &["INFJ", "ENFP"],
        purpose: "special",
        style: "classic",
        color: "purple",
    },
    Archetype {
        category: "chypre",
        age_group: "mature",
        gender: "female",
        personalities: &["ISTJ"],
        purpose: "work",
        style: "classic",
        color: "brown",
    },
    Archetype {
        category: "머스크, 우디",
        age_group: "mature",
        gender: "male",
        personalities: &["ISTJ", "INFJ"],
        purpose: "daily",
        style: "minimal",
        color: "gray",
    },
];

const AGES: [u32; 9] = [20, 25, 30, 35, 40, 45, 50, 55, 60];
const GENDERS: [&str; 3] = ["male", "female", "other"];
const PERSONALITIES: [&str; 4] = ["ENFP", "ESTP", "INFJ", "ISTJ"];
const PURPOSES: [&str; 4] = ["daily", "date", "work", "special"];
const STYLES: [&str; 8] = [
    "casual", "lovely", "sporty", "feminine", "classic", "street", "minimal", "dandy",
];
const COLORS: [&str; 10] = [
    "white", "black", "pink", "blue", "yellow", "green", "navy", "red", "purple", "beige",
];

/// Rows scoring above this many points are kept
const MATCH_THRESHOLD: u32 = 6;

fn age_group(age: u32) -> &'static str {
    match age {
        0..=29 => "young",
        30..=50 => "adult",
        _ => "mature",
    }
}

/// Deterministic synthetic survey corpus
///
/// Every combination of age, gender, personality and purpose is scored
/// against a fixed set of scent archetypes; matches above the threshold
/// become rows labelled with the archetype's categories. A seeded bonus
/// and style/color jitter keep the data from being perfectly separable.
#[derive(Debug, Clone)]
pub struct SeedCorpus {
    seed: u64,
}

impl Default for SeedCorpus {
    fn default() -> Self {
        Self::new(42)
    }
}

impl SeedCorpus {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Two points per matching trait plus a seeded one-point bonus
    fn match_points(
        archetype: &Archetype,
        age: u32,
        gender: &str,
        personality: &str,
        purpose: &str,
        rng: &mut StdRng,
    ) -> u32 {
        let matches = [
            archetype.age_group == age_group(age),
            archetype.gender == gender || archetype.gender == "unisex",
            archetype.personalities.contains(&personality),
            archetype.purpose == purpose,
        ];
        let points = 2 * matches.iter().filter(|&&m| m).count() as u32;
        if rng.gen_bool(0.5) {
            points + 1
        } else {
            points
        }
    }

    pub fn rows(&self) -> Vec<CorpusRow> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut rows = Vec::new();

        for archetype in ARCHETYPES {
            for &age in &AGES {
                for &gender in &GENDERS {
                    for &personality in &PERSONALITIES {
                        for &purpose in &PURPOSES {
                            let points = Self::match_points(
                                archetype,
                                age,
                                gender,
                                personality,
                                purpose,
                                &mut rng,
                            );
                            if points <= MATCH_THRESHOLD {
                                continue;
                            }

                            let style = if rng.gen_bool(0.7) {
                                archetype.style
                            } else {
                                STYLES.choose(&mut rng).copied().unwrap_or(archetype.style)
                            };
                            let color = if rng.gen_bool(0.7) {
                                archetype.color
                            } else {
                                COLORS.choose(&mut rng).copied().unwrap_or(archetype.color)
                            };

                            let traits = TraitRecord {
                                age: Some(age),
                                gender: Some(gender.to_string()),
                                personality: Some(personality.to_string()),
                                purpose: Some(purpose.to_string()),
                                fashion_style: Some(style.to_string()),
                                prefer_color: Some(color.to_string()),
                                ..Default::default()
                            };
                            rows.push(CorpusRow::new(traits, archetype.category));
                        }
                    }
                }
            }
        }
        rows
    }
}

#[async_trait::async_trait]
impl CorpusProvider for SeedCorpus {
    async fn load_corpus(&self) -> ModelResult<Vec<CorpusRow>> {
        let rows = self.rows();
        tracing::info!(rows = rows.len(), seed = self.seed, "Generated seed corpus");
        Ok(rows)
    }

    fn name(&self) -> &'static str {
        "seed"
    }
}
