use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    canonicalize, Category, CategorySet, ConfidenceMap, NoteLayer, NoteSelection, Perfume,
    RecipeIngredient, RecommendationRecord, TraitRecord,
};
use crate::services::engine::{EngineStatus, TrainingOutcome};
use crate::services::providers::{FeedbackRejection, FeedbackStats};
use crate::services::{reason_for, MatchFactor};

use super::AppState;

/// Oldest age accepted in a request
const MAX_AGE: u32 = 120;

// Request/Response types

#[derive(Debug, Serialize)]
pub struct PerfumeResponse {
    pub id: Uuid,
    pub name: String,
    pub brand: String,
    pub category: Category,
    pub description: String,
    pub price_range: String,
    pub age_group: String,
    pub gender_target: String,
    pub top_notes: Vec<String>,
    pub middle_notes: Vec<String>,
    pub base_notes: Vec<String>,
    pub recipe: Vec<RecipeIngredient>,
}

impl From<&Perfume> for PerfumeResponse {
    fn from(perfume: &Perfume) -> Self {
        let notes = |layer: NoteLayer| -> Vec<String> {
            perfume
                .notes(layer)
                .into_iter()
                .map(str::to_string)
                .collect()
        };
        Self {
            id: perfume.id,
            name: perfume.name.clone(),
            brand: perfume.brand.clone(),
            category: perfume.category,
            description: perfume.description.clone(),
            price_range: perfume.price_range.clone(),
            age_group: perfume.age_group.clone(),
            gender_target: perfume.gender_target.clone(),
            top_notes: notes(NoteLayer::Top),
            middle_notes: notes(NoteLayer::Middle),
            base_notes: notes(NoteLayer::Base),
            recipe: perfume.recipe.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    /// Identifier to submit feedback against
    pub id: Uuid,
    pub category: Category,
    pub confidence: f64,
    pub categories: CategorySet,
    pub confidences: ConfidenceMap,
    pub notes: NoteSelection,
    pub perfume: Option<PerfumeResponse>,
    pub match_factors: Vec<MatchFactor>,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub is_liked: bool,
}

#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub id: Uuid,
    pub is_liked: bool,
    /// Whether the model is now due for a retrain
    pub retrain_due: bool,
}

#[derive(Debug, Deserialize)]
pub struct PerfumeQuery {
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RetrainQuery {
    #[serde(default)]
    pub force: bool,
}

// Handlers

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "healthy", "model_trained": state.engine.is_trained() })),
    )
}

/// Predict scent categories for a person and pick a matching product
pub async fn recommend(
    State(state): State<AppState>,
    Json(traits): Json<TraitRecord>,
) -> AppResult<Json<RecommendationResponse>> {
    if traits.age.is_some_and(|age| age > MAX_AGE) {
        return Err(AppError::InvalidInput(format!(
            "age must be at most {}",
            MAX_AGE
        )));
    }

    let prediction = state.engine.predict(&traits)?;
    let primary = prediction.primary();
    let chosen = state.catalog.pick(primary.category, &traits);

    let record = RecommendationRecord {
        id: Uuid::new_v4(),
        traits: traits.clone(),
        category: primary.category,
        perfume_id: chosen.as_ref().map(|m| m.perfume.id),
        confidence: primary.confidence,
        created_at: Utc::now(),
        is_liked: None,
    };
    state.log.record(record.clone());

    tracing::info!(
        recommendation_id = %record.id,
        category = %primary.category,
        confidence = primary.confidence,
        perfume = chosen.as_ref().map(|m| m.perfume.name.as_str()),
        "Served recommendation"
    );

    Ok(Json(RecommendationResponse {
        id: record.id,
        category: primary.category,
        confidence: primary.confidence,
        categories: prediction.categories,
        confidences: prediction.confidence,
        notes: prediction.notes,
        perfume: chosen.as_ref().map(|m| PerfumeResponse::from(m.perfume)),
        match_factors: chosen.map(|m| m.factors).unwrap_or_default(),
        reason: reason_for(primary.category, &traits),
    }))
}

/// Record a like or dislike for a served recommendation
pub async fn submit_feedback(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<FeedbackRequest>,
) -> AppResult<Json<FeedbackResponse>> {
    let record = state
        .log
        .set_feedback(id, request.is_liked)
        .map_err(|e| match e {
            FeedbackRejection::UnknownRecommendation(_) => AppError::NotFound(e.to_string()),
            FeedbackRejection::AlreadyRated(_) => AppError::InvalidInput(e.to_string()),
        })?;
    state.engine.observe_feedback();

    tracing::info!(recommendation_id = %id, is_liked = request.is_liked, "Feedback received");

    Ok(Json(FeedbackResponse {
        id: record.id,
        is_liked: request.is_liked,
        retrain_due: state.engine.is_stale(),
    }))
}

/// Aggregate feedback statistics
pub async fn feedback_stats(State(state): State<AppState>) -> Json<FeedbackStats> {
    Json(state.log.stats())
}

/// List catalog products, optionally of one category
pub async fn get_perfumes(
    State(state): State<AppState>,
    Query(query): Query<PerfumeQuery>,
) -> AppResult<Json<Vec<PerfumeResponse>>> {
    let perfumes: Vec<PerfumeResponse> = match query.category {
        Some(token) => {
            let category = canonicalize(&token)
                .filter(|c| !c.is_sentinel())
                .ok_or_else(|| AppError::InvalidInput(format!("unknown category '{}'", token)))?;
            state
                .catalog
                .by_category(category)
                .into_iter()
                .map(PerfumeResponse::from)
                .collect()
        }
        None => state.catalog.all().iter().map(PerfumeResponse::from).collect(),
    };
    Ok(Json(perfumes))
}

/// Get one catalog product with its formula
pub async fn get_perfume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PerfumeResponse>> {
    state
        .catalog
        .get(id)
        .map(|p| Json(PerfumeResponse::from(p)))
        .ok_or_else(|| AppError::NotFound(format!("perfume {}", id)))
}

/// Model freshness, feedback counters and the latest training report
pub async fn model_status(State(state): State<AppState>) -> Json<EngineStatus> {
    Json(state.engine.status())
}

/// Retrain now (when stale, or always with `?force=true`) and save the artifact
pub async fn retrain(
    State(state): State<AppState>,
    Query(query): Query<RetrainQuery>,
) -> AppResult<Json<TrainingOutcome>> {
    let feedback = state.feedback();
    let outcome = state
        .engine
        .train_and_save(state.corpus.as_ref(), feedback.as_ref(), query.force)
        .await?;
    Ok(Json(outcome))
}
