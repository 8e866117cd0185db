use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Trait, TraitRecord};

/// Error types for the feature encoder
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Cannot fit an encoder on zero records")]
    NoRecords,
    #[error("Encoding schema has no columns")]
    EmptySchema,
}

/// Numeric trait, standardized with parameters captured at fit time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericFeature {
    Age,
}

impl NumericFeature {
    pub fn name(&self) -> &'static str {
        match self {
            NumericFeature::Age => "age",
        }
    }

    fn extract(&self, record: &TraitRecord) -> f64 {
        match self {
            NumericFeature::Age => record.age_or_default() as f64,
        }
    }
}

/// Which traits are encoded and how
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureLayout {
    pub numeric: Vec<NumericFeature>,
    pub single_choice: Vec<Trait>,
    pub multi_choice: Vec<Trait>,
}

impl FeatureLayout {
    /// Age, gender, personality, purpose, fashion style and preferred color
    pub fn standard() -> Self {
        Self {
            numeric: vec![NumericFeature::Age],
            single_choice: vec![Trait::Gender, Trait::Personality, Trait::Purpose],
            multi_choice: vec![Trait::FashionStyle, Trait::PreferColor],
        }
    }

    /// Standard layout plus cost and durability preferences
    pub fn extended() -> Self {
        let mut layout = Self::standard();
        layout.single_choice.extend([Trait::Cost, Trait::Durability]);
        layout
    }
}

/// Mean/variance standardization parameters of one numeric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub feature: NumericFeature,
    pub mean: f64,
    pub scale: f64,
}

impl ScalerParams {
    fn fit(feature: NumericFeature, values: &[f64]) -> Self {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = variance.sqrt();
        Self {
            feature,
            mean,
            // Constant columns are centered but not scaled
            scale: if std > 1e-12 { std } else { 1.0 },
        }
    }

    fn apply(&self, value: f64) -> f64 {
        (value - self.mean) / self.scale
    }
}

/// Frozen column set of one categorical trait, sorted by value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalColumns {
    pub field: Trait,
    pub values: Vec<String>,
}

impl CategoricalColumns {
    fn index_of(&self, value: &str) -> Option<usize> {
        self.values.binary_search_by(|v| v.as_str().cmp(value)).ok()
    }

    fn default_index(&self) -> Option<usize> {
        self.index_of(self.field.default_token())
    }
}

/// Column layout learned by [`FeatureEncoder::fit`].
///
/// Inference must encode through the same schema so vectors keep the width
/// the classifier was fitted on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingSchema {
    pub scalers: Vec<ScalerParams>,
    pub one_hot: Vec<CategoricalColumns>,
    pub multi_hot: Vec<CategoricalColumns>,
}

impl EncodingSchema {
    /// Number of columns in every encoded vector
    pub fn width(&self) -> usize {
        self.scalers.len()
            + self.one_hot.iter().map(|c| c.values.len()).sum::<usize>()
            + self.multi_hot.iter().map(|c| c.values.len()).sum::<usize>()
    }

    /// Ordered column names, e.g. `age`, `gender=female`, `fashion_style=casual`
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = self
            .scalers
            .iter()
            .map(|s| s.feature.name().to_string())
            .collect();
        for group in self.one_hot.iter().chain(self.multi_hot.iter()) {
            columns.extend(
                group
                    .values
                    .iter()
                    .map(|v| format!("{}={}", group.field.name(), v)),
            );
        }
        columns
    }

    /// Encodes one record. Unseen categorical values fall back to the trait default.
    pub fn transform(&self, record: &TraitRecord) -> Vec<f64> {
        let mut vector = Vec::with_capacity(self.width());

        for scaler in &self.scalers {
            vector.push(scaler.apply(scaler.feature.extract(record)));
        }

        for group in &self.one_hot {
            let offset = vector.len();
            vector.resize(offset + group.values.len(), 0.0);
            let index = group
                .index_of(&record.token(group.field))
                .or_else(|| group.default_index());
            if let Some(i) = index {
                vector[offset + i] = 1.0;
            }
        }

        for group in &self.multi_hot {
            let offset = vector.len();
            vector.resize(offset + group.values.len(), 0.0);
            let mut any_known = false;
            for token in record.tokens(group.field) {
                if let Some(i) = group.index_of(&token) {
                    vector[offset + i] = 1.0;
                    any_known = true;
                }
            }
            if !any_known {
                if let Some(i) = group.default_index() {
                    vector[offset + i] = 1.0;
                }
            }
        }

        vector
    }

    pub fn transform_batch<'a>(&self, records: impl IntoIterator<Item = &'a TraitRecord>) -> Vec<Vec<f64>> {
        records.into_iter().map(|r| self.transform(r)).collect()
    }
}

/// Learns an [`EncodingSchema`] from training records
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    layout: FeatureLayout,
}

impl Default for FeatureEncoder {
    fn default() -> Self {
        Self::new(FeatureLayout::standard())
    }
}

impl FeatureEncoder {
    pub fn new(layout: FeatureLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &FeatureLayout {
        &self.layout
    }

    /// Fits scaler parameters and categorical column sets.
    ///
    /// The declared default of every categorical trait is always reserved as a
    /// column so unseen values have somewhere to go.
    pub fn fit<'a>(
        &self,
        records: impl IntoIterator<Item = &'a TraitRecord>,
    ) -> Result<EncodingSchema, EncodeError> {
        let records: Vec<&TraitRecord> = records.into_iter().collect();
        if records.is_empty() {
            return Err(EncodeError::NoRecords);
        }

        let scalers = self
            .layout
            .numeric
            .iter()
            .map(|feature| {
                let values: Vec<f64> = records.iter().map(|r| feature.extract(r)).collect();
                ScalerParams::fit(*feature, &values)
            })
            .collect();

        let one_hot = self
            .layout
            .single_choice
            .iter()
            .map(|field| {
                let observed = records.iter().map(|r| r.token(*field));
                categorical_columns(*field, observed)
            })
            .collect();

        let multi_hot = self
            .layout
            .multi_choice
            .iter()
            .map(|field| {
                let observed = records.iter().flat_map(|r| r.tokens(*field));
                categorical_columns(*field, observed)
            })
            .collect();

        let schema = EncodingSchema {
            scalers,
            one_hot,
            multi_hot,
        };

        if schema.width() == 0 {
            return Err(EncodeError::EmptySchema);
        }

        tracing::debug!(
            width = schema.width(),
            records = records.len(),
            "Fitted encoding schema"
        );

        Ok(schema)
    }
}

fn categorical_columns(field: Trait, observed: impl Iterator<Item = String>) -> CategoricalColumns {
    let mut values: BTreeSet<String> = observed.collect();
    values.insert(field.default_token().to_string());
    CategoricalColumns {
        field,
        values: values.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(age: u32, gender: &str, style: &str) -> TraitRecord {
        TraitRecord {
            age: Some(age),
            gender: Some(gender.to_string()),
            personality: Some("ENFP".to_string()),
            purpose: Some("date".to_string()),
            fashion_style: Some(style.to_string()),
            prefer_color: Some("pink".to_string()),
            ..Default::default()
        }
    }

    fn fitted() -> EncodingSchema {
        let records = vec![
            record(20, "female", "casual, romantic"),
            record(40, "male", "formal"),
        ];
        FeatureEncoder::default().fit(&records).unwrap()
    }

    #[test]
    fn test_fit_zero_records_fails() {
        let result = FeatureEncoder::default().fit(&Vec::new());
        assert!(matches!(result, Err(EncodeError::NoRecords)));
    }

    #[test]
    fn test_fit_empty_layout_fails() {
        let encoder = FeatureEncoder::new(FeatureLayout {
            numeric: Vec::new(),
            single_choice: Vec::new(),
            multi_choice: Vec::new(),
        });
        let result = encoder.fit(&vec![TraitRecord::default()]);
        assert!(matches!(result, Err(EncodeError::EmptySchema)));
    }

    #[test]
    fn test_columns_are_sorted_with_reserved_defaults() {
        let schema = fitted();
        let columns = schema.columns();
        assert_eq!(columns[0], "age");
        assert!(columns.contains(&"gender=female".to_string()));
        assert!(columns.contains(&"gender=other".to_string()));
        assert!(columns.contains(&"personality=unknown".to_string()));
        assert!(columns.contains(&"fashion_style=romantic".to_string()));
        assert_eq!(columns.len(), schema.width());

        let gender = &schema.one_hot[0];
        assert_eq!(gender.values, vec!["female", "male", "other"]);
    }

    #[test]
    fn test_numeric_scaling_uses_fitted_parameters() {
        let schema = fitted();
        let scaler = &schema.scalers[0];
        assert!((scaler.mean - 30.0).abs() < 1e-9);
        assert!((scaler.scale - 10.0).abs() < 1e-9);

        let vector = schema.transform(&record(50, "female", "casual"));
        assert!((vector[0] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_constant_numeric_column_keeps_unit_scale() {
        let records = vec![record(30, "female", "casual"), record(30, "male", "casual")];
        let schema = FeatureEncoder::default().fit(&records).unwrap();
        assert_eq!(schema.scalers[0].scale, 1.0);
        assert_eq!(schema.transform(&records[0])[0], 0.0);
    }

    #[test]
    fn test_transform_width_is_stable_for_unseen_values() {
        let schema = fitted();
        let unseen = TraitRecord {
            age: Some(99),
            gender: Some("nonbinary".to_string()),
            personality: Some("XXXX".to_string()),
            purpose: Some("wedding".to_string()),
            fashion_style: Some("gothic, punk".to_string()),
            prefer_color: Some("ultraviolet".to_string()),
            cost: Some("luxury".to_string()),
            durability: None,
        };
        assert_eq!(schema.transform(&unseen).len(), schema.width());
        assert_eq!(schema.transform(&TraitRecord::default()).len(), schema.width());
    }

    #[test]
    fn test_unseen_single_choice_maps_to_default_column() {
        let schema = fitted();
        let columns = schema.columns();
        let vector = schema.transform(&TraitRecord {
            gender: Some("nonbinary".to_string()),
            ..Default::default()
        });
        let other = columns.iter().position(|c| c == "gender=other").unwrap();
        assert_eq!(vector[other], 1.0);

        let genders: f64 = columns
            .iter()
            .zip(&vector)
            .filter(|(c, _)| c.starts_with("gender="))
            .map(|(_, v)| *v)
            .sum();
        assert_eq!(genders, 1.0);
    }

    #[test]
    fn test_multi_hot_sets_every_known_value() {
        let schema = fitted();
        let columns = schema.columns();
        let vector = schema.transform(&record(25, "female", "romantic, formal, gothic"));
        let hot: Vec<&String> = columns
            .iter()
            .zip(&vector)
            .filter(|(c, v)| c.starts_with("fashion_style=") && **v == 1.0)
            .map(|(c, _)| c)
            .collect();
        assert_eq!(hot, vec!["fashion_style=formal", "fashion_style=romantic"]);
    }

    #[test]
    fn test_multi_hot_all_unknown_uses_default() {
        let schema = fitted();
        let columns = schema.columns();
        let vector = schema.transform(&record(25, "female", "gothic"));
        let casual = columns.iter().position(|c| c == "fashion_style=casual").unwrap();
        assert_eq!(vector[casual], 1.0);
    }

    #[test]
    fn test_extended_layout_adds_columns() {
        let records = vec![TraitRecord {
            cost: Some("luxury".to_string()),
            ..Default::default()
        }];
        let standard = FeatureEncoder::default().fit(&records).unwrap();
        let extended = FeatureEncoder::new(FeatureLayout::extended()).fit(&records).unwrap();
        assert!(extended.width() > standard.width());
        assert!(extended.columns().contains(&"cost=luxury".to_string()));
    }

    #[test]
    fn test_schema_serde_preserves_layout() {
        let schema = fitted();
        let json = serde_json::to_string(&schema).unwrap();
        let back: EncodingSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(back, schema);
    }
}
