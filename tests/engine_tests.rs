use std::path::Path;

use perfume_recommender::models::{Category, CorpusRow, NoteLayer, TraitRecord};
use perfume_recommender::services::classifier::{ClassifierConfig, Strategy};
use perfume_recommender::services::engine::EngineConfig;
use perfume_recommender::services::forest::ForestParams;
use perfume_recommender::services::providers::{SeedCorpus, StaticCorpus, StaticFeedback};
use perfume_recommender::services::{LoadOutcome, RecommendationEngine, TrainingOutcome};

fn config(model_path: &Path) -> EngineConfig {
    EngineConfig {
        classifier: ClassifierConfig {
            params: ForestParams {
                n_estimators: 20,
                ..Default::default()
            },
            search: None,
            ..Default::default()
        },
        feedback_threshold: 50,
        model_path: model_path.to_path_buf(),
        ..Default::default()
    }
}

/// Everyone under 30 wears citrus, everyone else woody
fn age_split_corpus() -> StaticCorpus {
    let rows = (15..=54u32)
        .map(|age| {
            let traits = TraitRecord {
                age: Some(age),
                ..Default::default()
            };
            CorpusRow::new(traits, if age < 30 { "citrus" } else { "woody" })
        })
        .collect();
    StaticCorpus::new(rows)
}

async fn trained_engine(dir: &tempfile::TempDir) -> RecommendationEngine {
    let engine = RecommendationEngine::new(config(&dir.path().join("model.json")));
    engine
        .train(&age_split_corpus(), &StaticFeedback::empty(), false)
        .await
        .unwrap();
    engine
}

#[tokio::test]
async fn test_young_person_gets_citrus() {
    let dir = tempfile::tempdir().unwrap();
    let engine = trained_engine(&dir).await;

    let prediction = engine
        .predict(&TraitRecord {
            age: Some(22),
            ..Default::default()
        })
        .unwrap();

    assert!(prediction.categories.contains(&Category::Citrus));
    let citrus = prediction.confidence[&Category::Citrus];
    for (category, confidence) in &prediction.confidence {
        if *category != Category::Citrus {
            assert!(citrus > *confidence, "{} outranks citrus", category);
        }
    }
    assert_eq!(prediction.primary().category, Category::Citrus);
}

#[tokio::test]
async fn test_confidence_covers_taxonomy() {
    let dir = tempfile::tempdir().unwrap();
    let engine = trained_engine(&dir).await;

    let records = [
        TraitRecord::default(),
        TraitRecord {
            age: Some(70),
            gender: Some("nonbinary".to_string()),
            personality: Some("XXXX".to_string()),
            fashion_style: Some("never seen before".to_string()),
            ..Default::default()
        },
    ];
    for record in &records {
        let prediction = engine.predict(record).unwrap();
        let keys: Vec<Category> = prediction.confidence.keys().copied().collect();
        assert_eq!(keys, Category::TAXONOMY.to_vec());
    }
}

#[tokio::test]
async fn test_notes_come_from_their_layers() {
    let dir = tempfile::tempdir().unwrap();
    let engine = trained_engine(&dir).await;

    let prediction = engine
        .predict(&TraitRecord {
            age: Some(45),
            ..Default::default()
        })
        .unwrap();
    let notes = prediction.notes;

    assert_eq!(notes.top.category.layer(), Some(NoteLayer::Top));
    assert_eq!(notes.middle.category.layer(), Some(NoteLayer::Middle));
    assert_eq!(notes.base.category.layer(), Some(NoteLayer::Base));
    assert_eq!(notes.base.category, Category::Woody);
    for choice in [notes.top, notes.middle, notes.base] {
        assert_eq!(choice.confidence, prediction.confidence[&choice.category]);
    }
}

#[tokio::test]
async fn test_feedback_volume_makes_model_stale() {
    let dir = tempfile::tempdir().unwrap();
    let engine = trained_engine(&dir).await;
    assert!(!engine.is_stale());

    for _ in 0..49 {
        engine.observe_feedback();
    }
    assert!(!engine.is_stale());

    for _ in 49..60 {
        engine.observe_feedback();
    }
    assert!(engine.is_stale());
    assert_eq!(engine.status().feedback_since_retrain, 60);
}

#[tokio::test]
async fn test_unforced_retrain_of_fresh_model_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let engine = trained_engine(&dir).await;
    let first = engine.status().last_retrain.unwrap();

    let outcome = engine
        .train(&age_split_corpus(), &StaticFeedback::empty(), false)
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        TrainingOutcome::Skipped { last_retrain } if last_retrain == first
    ));
    assert_eq!(engine.status().last_retrain, Some(first));
}

#[tokio::test]
async fn test_forced_retrain_publishes_new_model() {
    let dir = tempfile::tempdir().unwrap();
    let engine = trained_engine(&dir).await;
    engine.observe_feedback();

    let outcome = engine
        .train(&age_split_corpus(), &StaticFeedback::empty(), true)
        .await
        .unwrap();

    assert!(matches!(outcome, TrainingOutcome::Trained(_)));
    assert_eq!(engine.status().feedback_since_retrain, 0);
}

#[tokio::test]
async fn test_missing_artifact_triggers_training() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("model.json");
    let engine = RecommendationEngine::new(config(&path));

    let outcome = engine
        .load_or_train(&age_split_corpus(), &StaticFeedback::empty())
        .await
        .unwrap();

    assert!(matches!(outcome, LoadOutcome::Trained(_)));
    assert!(path.exists());
    assert!(engine.is_trained());
}

#[tokio::test]
async fn test_saved_model_reloads_with_same_predictions() {
    let dir = tempfile::tempdir().unwrap();
    let engine = trained_engine(&dir).await;
    let path = engine.save().await.unwrap();
    let trained_at = engine.current().unwrap().trained_at();

    let reloaded = RecommendationEngine::new(config(&path));
    let outcome = reloaded
        .load_or_train(&age_split_corpus(), &StaticFeedback::empty())
        .await
        .unwrap();
    assert!(matches!(outcome, LoadOutcome::Loaded { trained_at: at } if at == trained_at));
    assert!(!reloaded.is_stale());

    for age in [18, 29, 31, 60] {
        let record = TraitRecord {
            age: Some(age),
            ..Default::default()
        };
        assert_eq!(
            engine.predict(&record).unwrap(),
            reloaded.predict(&record).unwrap()
        );
    }
}

#[tokio::test]
async fn test_chain_strategy_trains_on_seed_corpus() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(&dir.path().join("model.json"));
    config.classifier.strategy = Strategy::Chain;
    config.classifier.params.n_estimators = 10;
    let engine = RecommendationEngine::new(config);

    let outcome = engine
        .train(&SeedCorpus::default(), &StaticFeedback::empty(), true)
        .await
        .unwrap();
    let TrainingOutcome::Trained(report) = outcome else {
        panic!("expected a training run");
    };

    assert_eq!(report.strategy, Strategy::Chain);
    assert!(report.corpus_examples > 0);
    assert!(report.evaluation.micro_f1 > 0.0);
    assert!(engine.predict(&TraitRecord::default()).is_ok());
}
