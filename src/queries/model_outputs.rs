use sea_query::{Expr, Order, Query, SqliteQueryBuilder};

use crate::schema::{Detections, ModelOutputs, PredictedTags};

/// INSERT INTO model_outputs (id, recording_id, model_name, created_on_ms) VALUES (...)
pub fn insert(id: &str, recording_id: &str, model_name: &str, created_on_ms: i64) -> String {
    Query::insert()
        .into_table(ModelOutputs::Table)
        .columns([
            ModelOutputs::Id,
            ModelOutputs::RecordingId,
            ModelOutputs::ModelName,
            ModelOutputs::CreatedOnMs,
        ])
        .values_panic([
            id.into(),
            recording_id.into(),
            model_name.into(),
            created_on_ms.into(),
        ])
        .to_string(SqliteQueryBuilder)
}

/// INSERT INTO detections (id, model_output_id, location, probability) VALUES (...)
pub fn insert_detection(
    id: &str,
    model_output_id: &str,
    location: Option<&str>,
    probability: f64,
) -> String {
    Query::insert()
        .into_table(Detections::Table)
        .columns([
            Detections::Id,
            Detections::ModelOutputId,
            Detections::Location,
            Detections::Probability,
        ])
        .values_panic([
            id.into(),
            model_output_id.into(),
            location.into(),
            probability.into(),
        ])
        .to_string(SqliteQueryBuilder)
}

/// INSERT INTO predicted_tags (model_output_id, detection_id, key, value, probability)
/// VALUES (...)
///
/// Exactly one of model_output_id / detection_id is set.
pub fn insert_tag(
    model_output_id: Option<&str>,
    detection_id: Option<&str>,
    key: &str,
    value: &str,
    probability: f64,
) -> String {
    Query::insert()
        .into_table(PredictedTags::Table)
        .columns([
            PredictedTags::ModelOutputId,
            PredictedTags::DetectionId,
            PredictedTags::Key,
            PredictedTags::Value,
            PredictedTags::Probability,
        ])
        .values_panic([
            model_output_id.into(),
            detection_id.into(),
            key.into(),
            value.into(),
            probability.into(),
        ])
        .to_string(SqliteQueryBuilder)
}

/// SELECT id, recording_id, model_name, created_on_ms FROM model_outputs
/// WHERE recording_id IN (...) ORDER BY created_on_ms DESC
pub fn select_for_recordings(recording_ids: &[String]) -> String {
    Query::select()
        .columns([
            ModelOutputs::Id,
            ModelOutputs::RecordingId,
            ModelOutputs::ModelName,
            ModelOutputs::CreatedOnMs,
        ])
        .from(ModelOutputs::Table)
        .and_where(Expr::col(ModelOutputs::RecordingId).is_in(recording_ids.iter().cloned()))
        .order_by(ModelOutputs::CreatedOnMs, Order::Desc)
        .to_string(SqliteQueryBuilder)
}

/// SELECT id, model_output_id, location, probability FROM detections
/// WHERE model_output_id IN (...)
pub fn select_detections_for_outputs(output_ids: &[String]) -> String {
    Query::select()
        .columns([
            Detections::Id,
            Detections::ModelOutputId,
            Detections::Location,
            Detections::Probability,
        ])
        .from(Detections::Table)
        .and_where(Expr::col(Detections::ModelOutputId).is_in(output_ids.iter().cloned()))
        .to_string(SqliteQueryBuilder)
}

/// SELECT model_output_id, detection_id, key, value, probability FROM predicted_tags
/// WHERE model_output_id IN (...) OR detection_id IN (...)
pub fn select_tags_for_outputs(output_ids: &[String], detection_ids: &[String]) -> String {
    Query::select()
        .columns([
            PredictedTags::ModelOutputId,
            PredictedTags::DetectionId,
            PredictedTags::Key,
            PredictedTags::Value,
            PredictedTags::Probability,
        ])
        .from(PredictedTags::Table)
        .cond_where(
            sea_query::Cond::any()
                .add(Expr::col(PredictedTags::ModelOutputId).is_in(output_ids.iter().cloned()))
                .add(Expr::col(PredictedTags::DetectionId).is_in(detection_ids.iter().cloned())),
        )
        .to_string(SqliteQueryBuilder)
}
