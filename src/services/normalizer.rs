use std::collections::BTreeMap;

use crate::models::{canonicalize, Category, CategorySet};

/// Phrase separators inside a free-text category description
const SEPARATORS: &[char] = &[',', '/', '\n', '\r', ';', '|', '·', '、', '+'];

/// Default keyword table: keyword found in a phrase → variant or standard token.
///
/// Variant tokens are folded by the central merge table after matching.
const DEFAULT_KEYWORDS: &[(&str, &str)] = &[
    // English
    ("citrus", "citrus"),
    ("fruity", "fruity"),
    ("fruit", "fruity"),
    ("aquatic", "aquatic"),
    ("aqua", "aquatic"),
    ("ocean", "marine"),
    ("marine", "marine"),
    ("green tea", "green"),
    ("green", "green"),
    ("casual", "casual"),
    ("white floral", "white floral"),
    ("light floral", "light floral"),
    ("soft floral", "soft floral"),
    ("floral fruity", "floral fruity"),
    ("floral", "floral"),
    ("powdery", "powdery"),
    ("powder", "powdery"),
    ("aromatic", "aromatic"),
    ("herbal", "aromatic"),
    ("fougere", "fougere"),
    ("fougère", "fougere"),
    ("warm spicy", "warm spicy"),
    ("fresh spicy", "fresh spicy"),
    ("spicy", "spicy"),
    ("spice", "spicy"),
    ("soft amber", "soft amber"),
    ("woody amber", "woody amber"),
    ("amber", "amber"),
    ("chypre", "chypre"),
    ("gourmand", "gourmand"),
    ("vanilla", "gourmand"),
    ("cozy", "cozy"),
    ("musk", "musk"),
    ("leather", "leather"),
    ("woody", "woody"),
    ("wood", "woody"),
    ("oriental", "oriental"),
    ("fresh", "fresh"),
    // Korean
    ("시트러스", "citrus"),
    ("프루티", "fruity"),
    ("아쿠아틱", "aquatic"),
    ("마린", "marine"),
    ("그린", "green"),
    ("캐쥬얼", "casual"),
    ("캐주얼", "casual"),
    ("화이트 플로럴", "white floral"),
    ("라이트 플로럴", "light floral"),
    ("플로럴", "floral"),
    ("파우더리", "powdery"),
    ("아로마틱", "aromatic"),
    ("푸제르", "fougere"),
    ("스파이시", "spicy"),
    ("앰버", "amber"),
    ("시프레", "chypre"),
    ("구르망", "gourmand"),
    ("코지", "cozy"),
    ("머스크", "musk"),
    ("우디", "woody"),
    ("오리엔탈", "oriental"),
    ("프레시", "fresh"),
];

/// Maps free-text scent descriptions onto the closed category taxonomy
#[derive(Debug, Clone)]
pub struct CategoryNormalizer {
    /// (keyword, category), longest keyword first
    keywords: Vec<(String, Category)>,
}

impl Default for CategoryNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl CategoryNormalizer {
    /// Creates a normalizer with the built-in bilingual keyword table
    pub fn new() -> Self {
        Self::from_table(
            DEFAULT_KEYWORDS
                .iter()
                .map(|(k, t)| (k.to_string(), t.to_string())),
        )
    }

    /// Creates a normalizer from a custom keyword table.
    ///
    /// Entries whose token does not resolve to a category are skipped.
    pub fn from_table(table: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut normalizer = Self {
            keywords: Vec::new(),
        };
        normalizer.extend(table);
        normalizer
    }

    /// Returns a copy extended with additional keyword entries
    pub fn with_keywords(mut self, table: impl IntoIterator<Item = (String, String)>) -> Self {
        self.extend(table);
        self
    }

    fn extend(&mut self, table: impl IntoIterator<Item = (String, String)>) {
        for (keyword, token) in table {
            let keyword = keyword.trim().to_lowercase();
            if keyword.is_empty() {
                continue;
            }
            match canonicalize(&token) {
                Some(category) => self.keywords.push((keyword, category)),
                None => tracing::warn!(keyword = %keyword, token = %token, "Skipping keyword with unknown token"),
            }
        }
        // Stable sort keeps declaration order among keywords of equal length
        self.keywords
            .sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()));
    }

    /// Normalizes a free-text description into a set of categories.
    ///
    /// Empty input yields the empty set; phrases that match nothing yield the
    /// `other` sentinel.
    pub fn normalize(&self, text: &str) -> CategorySet {
        let stripped = strip_parenthetical(text).to_lowercase();

        stripped
            .split(SEPARATORS)
            .map(clean_phrase)
            .filter(|phrase| !phrase.is_empty())
            .map(|phrase| self.match_phrase(&phrase))
            .collect()
    }

    pub fn normalize_opt(&self, text: Option<&str>) -> CategorySet {
        text.map(|t| self.normalize(t)).unwrap_or_default()
    }

    fn match_phrase(&self, phrase: &str) -> Category {
        self.keywords
            .iter()
            .find(|(keyword, _)| phrase.contains(keyword.as_str()))
            .map(|(_, category)| *category)
            .or_else(|| canonicalize(phrase))
            .unwrap_or(Category::Other)
    }

    /// Counts normalized categories over many descriptions
    pub fn tally<'a>(&self, texts: impl IntoIterator<Item = &'a str>) -> BTreeMap<Category, usize> {
        let mut counts = BTreeMap::new();
        for text in texts {
            for category in self.normalize(text) {
                *counts.entry(category).or_insert(0) += 1;
            }
        }
        counts
    }
}

/// Removes bracketed asides, including nested ones
fn strip_parenthetical(text: &str) -> String {
    let mut depth = 0usize;
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | '[' | '（' => depth += 1,
            ')' | ']' | '）' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

/// Replaces non-alphanumeric noise with spaces and collapses whitespace
fn clean_phrase(phrase: &str) -> String {
    let spaced: String = phrase
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(categories: &[Category]) -> CategorySet {
        categories.iter().copied().collect()
    }

    #[test]
    fn test_taxonomy_tokens_are_fixed_points() {
        let normalizer = CategoryNormalizer::new();
        for category in Category::TAXONOMY {
            assert_eq!(
                normalizer.normalize(category.as_str()),
                set(&[category]),
                "{} is not a fixed point",
                category
            );
        }
    }

    #[test]
    fn test_empty_input_is_empty_set() {
        let normalizer = CategoryNormalizer::new();
        assert!(normalizer.normalize("").is_empty());
        assert!(normalizer.normalize("  , / ").is_empty());
        assert!(normalizer.normalize_opt(None).is_empty());
    }

    #[test]
    fn test_parenthetical_noise_invariance() {
        let normalizer = CategoryNormalizer::new();
        assert_eq!(
            normalizer.normalize("white floral (soft)"),
            normalizer.normalize("white floral")
        );
        assert_eq!(
            normalizer.normalize("Woody!! [deep (very)]"),
            set(&[Category::Woody])
        );
    }

    #[test]
    fn test_specific_keyword_wins_over_generic() {
        let normalizer = CategoryNormalizer::new();
        // "floral fruity" is longer than "floral" and maps elsewhere
        assert_eq!(normalizer.normalize("floral fruity"), set(&[Category::Fruity]));
        assert_eq!(normalizer.normalize("fresh spicy"), set(&[Category::Spicy]));
    }

    #[test]
    fn test_variants_are_merged() {
        let normalizer = CategoryNormalizer::new();
        assert_eq!(
            normalizer.normalize("white floral, light floral, floral"),
            set(&[Category::Floral])
        );
        assert_eq!(normalizer.normalize("marine"), set(&[Category::Aquatic]));
    }

    #[test]
    fn test_bilingual_multi_phrase() {
        let normalizer = CategoryNormalizer::new();
        assert_eq!(
            normalizer.normalize("시트러스, 화이트 플로럴 / woody\n머스크"),
            set(&[Category::Citrus, Category::Floral, Category::Woody, Category::Musk])
        );
    }

    #[test]
    fn test_unmatched_phrase_is_other() {
        let normalizer = CategoryNormalizer::new();
        assert_eq!(normalizer.normalize("tobacco"), set(&[Category::Other]));
        assert_eq!(
            normalizer.normalize("tobacco, citrus"),
            set(&[Category::Other, Category::Citrus])
        );
    }

    #[test]
    fn test_custom_keywords_extend_table() {
        let normalizer = CategoryNormalizer::new()
            .with_keywords([("tobacco".to_string(), "woody".to_string())]);
        assert_eq!(normalizer.normalize("tobacco"), set(&[Category::Woody]));
    }

    #[test]
    fn test_phrase_equal_to_token_without_keyword() {
        let normalizer = CategoryNormalizer::from_table(Vec::new());
        assert_eq!(normalizer.normalize("chypre"), set(&[Category::Chypre]));
        assert_eq!(normalizer.normalize("light floral"), set(&[Category::Floral]));
        assert_eq!(normalizer.normalize("chypre note"), set(&[Category::Other]));
    }

    #[test]
    fn test_tally_counts_categories() {
        let normalizer = CategoryNormalizer::new();
        let counts = normalizer.tally(["citrus, woody", "citrus", ""]);
        assert_eq!(counts.get(&Category::Citrus), Some(&2));
        assert_eq!(counts.get(&Category::Woody), Some(&1));
        assert_eq!(counts.len(), 2);
    }
}
