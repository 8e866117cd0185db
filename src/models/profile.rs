use serde::{Deserialize, Serialize};

/// Age assumed when a record does not carry one
pub const DEFAULT_AGE: u32 = 25;

/// Self-reported traits of one user, as received from a survey or request.
///
/// Every field is optional; missing or blank values resolve to the declared
/// default of their trait when the record is encoded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraitRecord {
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<String>,
    /// Personality code, e.g. an MBTI type such as `ISTJ`
    #[serde(default, alias = "mbti")]
    pub personality: Option<String>,
    #[serde(default)]
    pub purpose: Option<String>,
    /// Comma-joined list of fashion styles
    #[serde(default, alias = "fashionstyle")]
    pub fashion_style: Option<String>,
    /// Comma-joined list of preferred colors
    #[serde(default, alias = "prefercolor")]
    pub prefer_color: Option<String>,
    #[serde(default)]
    pub cost: Option<String>,
    #[serde(default)]
    pub durability: Option<String>,
}

/// A categorical trait the encoder knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trait {
    Gender,
    Personality,
    Purpose,
    FashionStyle,
    PreferColor,
    Cost,
    Durability,
}

impl Trait {
    pub fn name(&self) -> &'static str {
        match self {
            Trait::Gender => "gender",
            Trait::Personality => "personality",
            Trait::Purpose => "purpose",
            Trait::FashionStyle => "fashion_style",
            Trait::PreferColor => "prefer_color",
            Trait::Cost => "cost",
            Trait::Durability => "durability",
        }
    }

    /// Token substituted for a missing or unknown value
    pub fn default_token(&self) -> &'static str {
        match self {
            Trait::Gender => "other",
            Trait::Personality => "unknown",
            Trait::Purpose => "daily",
            Trait::FashionStyle => "casual",
            Trait::PreferColor => "white",
            Trait::Cost => "mid",
            Trait::Durability => "moderate",
        }
    }
}

impl TraitRecord {
    pub fn age_or_default(&self) -> u32 {
        self.age.unwrap_or(DEFAULT_AGE)
    }

    /// Raw value of a categorical trait, `None` when absent or blank
    pub fn raw(&self, field: Trait) -> Option<&str> {
        let value = match field {
            Trait::Gender => self.gender.as_deref(),
            Trait::Personality => self.personality.as_deref(),
            Trait::Purpose => self.purpose.as_deref(),
            Trait::FashionStyle => self.fashion_style.as_deref(),
            Trait::PreferColor => self.prefer_color.as_deref(),
            Trait::Cost => self.cost.as_deref(),
            Trait::Durability => self.durability.as_deref(),
        };
        value.map(str::trim).filter(|v| !v.is_empty())
    }

    /// Normalized single-choice token, falling back to the trait default
    pub fn token(&self, field: Trait) -> String {
        self.raw(field)
            .map(normalize_token)
            .unwrap_or_else(|| field.default_token().to_string())
    }

    /// Normalized, deduplicated tokens of a multi-choice trait in input order.
    ///
    /// Returns an empty list when the trait is absent; callers decide on the default.
    pub fn tokens(&self, field: Trait) -> Vec<String> {
        let mut tokens: Vec<String> = Vec::new();
        if let Some(raw) = self.raw(field) {
            for part in raw.split(',') {
                let token = normalize_token(part);
                if !token.is_empty() && !tokens.contains(&token) {
                    tokens.push(token);
                }
            }
        }
        tokens
    }

    /// Age bracket used by the catalog filters
    pub fn age_group(&self) -> &'static str {
        match self.age_or_default() {
            0..=29 => "young",
            30..=50 => "adult",
            _ => "mature",
        }
    }
}

fn normalize_token(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_traits_use_defaults() {
        let record = TraitRecord::default();
        assert_eq!(record.age_or_default(), DEFAULT_AGE);
        assert_eq!(record.token(Trait::Gender), "other");
        assert_eq!(record.token(Trait::Purpose), "daily");
        assert!(record.tokens(Trait::FashionStyle).is_empty());
    }

    #[test]
    fn test_blank_value_is_missing() {
        let record = TraitRecord {
            gender: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(record.raw(Trait::Gender), None);
        assert_eq!(record.token(Trait::Gender), "other");
    }

    #[test]
    fn test_token_is_lowercased() {
        let record = TraitRecord {
            personality: Some(" ISTJ ".to_string()),
            ..Default::default()
        };
        assert_eq!(record.token(Trait::Personality), "istj");
    }

    #[test]
    fn test_multi_tokens_split_and_dedupe() {
        let record = TraitRecord {
            fashion_style: Some("Casual, street ,casual,, Minimal".to_string()),
            ..Default::default()
        };
        assert_eq!(
            record.tokens(Trait::FashionStyle),
            vec!["casual", "street", "minimal"]
        );
    }

    #[test]
    fn test_age_group_brackets() {
        let mut record = TraitRecord::default();
        record.age = Some(22);
        assert_eq!(record.age_group(), "young");
        record.age = Some(30);
        assert_eq!(record.age_group(), "adult");
        record.age = Some(61);
        assert_eq!(record.age_group(), "mature");
    }

    #[test]
    fn test_deserialize_survey_aliases() {
        let record: TraitRecord = serde_json::from_str(
            r#"{"age": 31, "mbti": "ENFP", "fashionstyle": "romantic", "prefercolor": "pink"}"#,
        )
        .unwrap();
        assert_eq!(record.age, Some(31));
        assert_eq!(record.personality.as_deref(), Some("ENFP"));
        assert_eq!(record.fashion_style.as_deref(), Some("romantic"));
        assert_eq!(record.prefer_color.as_deref(), Some("pink"));
    }
}
