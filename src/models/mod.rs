pub mod category;
pub mod perfume;
pub mod profile;
pub mod recommendation;
pub mod training;

pub use category::{canonicalize, zero_confidence, Category, CategorySet, ConfidenceMap, NoteLayer};
pub use perfume::{Perfume, RecipeIngredient};
pub use profile::{Trait, TraitRecord, DEFAULT_AGE};
pub use recommendation::{NoteChoice, NoteSelection, Prediction, RecommendationRecord};
pub use training::{CorpusRow, FeedbackEvent, Provenance, TrainingExample};
