use sea_query::{Expr, OnConflict, Order, Query, SqliteQueryBuilder};

use crate::schema::Recordings;

fn select_columns() -> [Recordings; 7] {
    [
        Recordings::Id,
        Recordings::DeploymentId,
        Recordings::TimestampMs,
        Recordings::DurationS,
        Recordings::SamplerateHz,
        Recordings::AudioChannels,
        Recordings::Path,
    ]
}

/// INSERT INTO recordings ... ON CONFLICT (id) DO NOTHING
pub fn insert(
    id: &str,
    deployment_id: &str,
    timestamp_ms: i64,
    duration_s: f64,
    samplerate_hz: u32,
    audio_channels: u16,
    path: Option<&str>,
) -> String {
    Query::insert()
        .into_table(Recordings::Table)
        .columns([
            Recordings::Id,
            Recordings::DeploymentId,
            Recordings::TimestampMs,
            Recordings::DurationS,
            Recordings::SamplerateHz,
            Recordings::AudioChannels,
            Recordings::Path,
        ])
        .values_panic([
            id.into(),
            deployment_id.into(),
            timestamp_ms.into(),
            duration_s.into(),
            samplerate_hz.into(),
            audio_channels.into(),
            path.into(),
        ])
        .on_conflict(OnConflict::column(Recordings::Id).do_nothing().to_owned())
        .to_string(SqliteQueryBuilder)
}

/// SELECT ... FROM recordings WHERE id = ?
pub fn select_by_id(id: &str) -> String {
    Query::select()
        .columns(select_columns())
        .from(Recordings::Table)
        .and_where(Expr::col(Recordings::Id).eq(id))
        .to_string(SqliteQueryBuilder)
}

/// SELECT ... FROM recordings WHERE timestamp_ms = ?
pub fn select_by_timestamp(timestamp_ms: i64) -> String {
    Query::select()
        .columns(select_columns())
        .from(Recordings::Table)
        .and_where(Expr::col(Recordings::TimestampMs).eq(timestamp_ms))
        .to_string(SqliteQueryBuilder)
}

/// SELECT ... FROM recordings WHERE id IN (...) ORDER BY timestamp_ms DESC
pub fn select_by_ids(ids: &[String]) -> String {
    Query::select()
        .columns(select_columns())
        .from(Recordings::Table)
        .and_where(Expr::col(Recordings::Id).is_in(ids.iter().cloned()))
        .order_by(Recordings::TimestampMs, Order::Desc)
        .to_string(SqliteQueryBuilder)
}

/// SELECT ... FROM recordings WHERE path IN (...) ORDER BY timestamp_ms DESC
pub fn select_by_paths(paths: &[String]) -> String {
    Query::select()
        .columns(select_columns())
        .from(Recordings::Table)
        .and_where(Expr::col(Recordings::Path).is_in(paths.iter().cloned()))
        .order_by(Recordings::TimestampMs, Order::Desc)
        .to_string(SqliteQueryBuilder)
}

/// UPDATE recordings SET path = ? WHERE id = ?
pub fn update_path(id: &str, path: Option<&str>) -> String {
    Query::update()
        .table(Recordings::Table)
        .value(Recordings::Path, path)
        .and_where(Expr::col(Recordings::Id).eq(id))
        .to_string(SqliteQueryBuilder)
}
