use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Category, NoteLayer};

/// One line of a perfume formula
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipeIngredient {
    pub ingredient_name: String,
    /// Share of the formula, in percent
    pub percentage: f64,
    /// Note layer of the ingredient; `None` for the carrier (e.g. alcohol)
    pub layer: Option<NoteLayer>,
}

/// A catalog product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Perfume {
    pub id: Uuid,
    pub name: String,
    pub brand: String,
    pub category: Category,
    pub description: String,
    pub price_range: String,
    /// "young", "adult", "mature" or "all"
    pub age_group: String,
    /// "male", "female" or "unisex"
    pub gender_target: String,
    pub purposes: Vec<String>,
    pub recipe: Vec<RecipeIngredient>,
}

impl Perfume {
    /// Creates a perfume with an empty formula
    pub fn new(name: &str, brand: &str, category: Category) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            brand: brand.to_string(),
            category,
            description: String::new(),
            price_range: "mid-range".to_string(),
            age_group: "all".to_string(),
            gender_target: "unisex".to_string(),
            purposes: Vec::new(),
            recipe: Vec::new(),
        }
    }

    /// Adds a formula line
    pub fn add_ingredient(&mut self, name: &str, percentage: f64, layer: Option<NoteLayer>) {
        self.recipe.push(RecipeIngredient {
            ingredient_name: name.to_string(),
            percentage,
            layer,
        });
    }

    /// Ingredient names of one layer, in formula order
    pub fn notes(&self, layer: NoteLayer) -> Vec<&str> {
        self.recipe
            .iter()
            .filter(|i| i.layer == Some(layer))
            .map(|i| i.ingredient_name.as_str())
            .collect()
    }

    pub fn recipe_total(&self) -> f64 {
        self.recipe.iter().map(|i| i.percentage).sum()
    }

    pub fn suits_age_group(&self, age_group: &str) -> bool {
        self.age_group == "all" || self.age_group == age_group
    }

    pub fn suits_gender(&self, gender: &str) -> bool {
        self.gender_target == "unisex" || gender == "other" || self.gender_target == gender
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Perfume {
        let mut perfume = Perfume::new("Lemon Grove Breeze", "Maison Test", Category::Citrus);
        perfume.add_ingredient("Bergamot Oil", 10.0, Some(NoteLayer::Top));
        perfume.add_ingredient("Lemon Zest", 8.0, Some(NoteLayer::Top));
        perfume.add_ingredient("Neroli", 7.0, Some(NoteLayer::Middle));
        perfume.add_ingredient("Musk", 10.0, Some(NoteLayer::Base));
        perfume.add_ingredient("Alcohol", 65.0, None);
        perfume
    }

    #[test]
    fn test_notes_by_layer() {
        let perfume = sample();
        assert_eq!(perfume.notes(NoteLayer::Top), vec!["Bergamot Oil", "Lemon Zest"]);
        assert_eq!(perfume.notes(NoteLayer::Base), vec!["Musk"]);
    }

    #[test]
    fn test_recipe_total() {
        assert!((sample().recipe_total() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_suitability_filters() {
        let mut perfume = sample();
        assert!(perfume.suits_age_group("mature"));
        perfume.age_group = "young".to_string();
        assert!(!perfume.suits_age_group("mature"));

        perfume.gender_target = "female".to_string();
        assert!(perfume.suits_gender("female"));
        assert!(perfume.suits_gender("other"));
        assert!(!perfume.suits_gender("male"));
    }
}
