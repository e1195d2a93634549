use sea_query::{Expr, OnConflict, Order, Query, SqliteQueryBuilder};

use crate::schema::Deployments;

/// Columns selected for every deployment read, in a fixed order.
fn select_columns() -> [Deployments; 6] {
    [
        Deployments::Id,
        Deployments::Name,
        Deployments::Latitude,
        Deployments::Longitude,
        Deployments::StartedOnMs,
        Deployments::EndedOnMs,
    ]
}

/// INSERT INTO deployments ... ON CONFLICT (id) DO NOTHING
pub fn insert(
    id: &str,
    name: &str,
    latitude: Option<f64>,
    longitude: Option<f64>,
    started_on_ms: i64,
    ended_on_ms: Option<i64>,
) -> String {
    Query::insert()
        .into_table(Deployments::Table)
        .columns([
            Deployments::Id,
            Deployments::Name,
            Deployments::Latitude,
            Deployments::Longitude,
            Deployments::StartedOnMs,
            Deployments::EndedOnMs,
        ])
        .values_panic([
            id.into(),
            name.into(),
            latitude.into(),
            longitude.into(),
            started_on_ms.into(),
            ended_on_ms.into(),
        ])
        .on_conflict(OnConflict::column(Deployments::Id).do_nothing().to_owned())
        .to_string(SqliteQueryBuilder)
}

/// SELECT ... FROM deployments ORDER BY started_on_ms DESC LIMIT 1
pub fn select_latest() -> String {
    Query::select()
        .columns(select_columns())
        .from(Deployments::Table)
        .order_by(Deployments::StartedOnMs, Order::Desc)
        .limit(1)
        .to_string(SqliteQueryBuilder)
}

/// SELECT ... FROM deployments WHERE id = ?
pub fn select_by_id(id: &str) -> String {
    Query::select()
        .columns(select_columns())
        .from(Deployments::Table)
        .and_where(Expr::col(Deployments::Id).eq(id))
        .to_string(SqliteQueryBuilder)
}

/// UPDATE deployments SET name = ?, latitude = ?, longitude = ? [, ended_on_ms = ?] WHERE id = ?
pub fn update(
    id: &str,
    name: &str,
    latitude: Option<f64>,
    longitude: Option<f64>,
    ended_on_ms: Option<i64>,
) -> String {
    let mut statement = Query::update()
        .table(Deployments::Table)
        .value(Deployments::Name, name)
        .value(Deployments::Latitude, latitude)
        .value(Deployments::Longitude, longitude)
        .and_where(Expr::col(Deployments::Id).eq(id))
        .to_owned();

    if let Some(ended_on_ms) = ended_on_ms {
        statement.value(Deployments::EndedOnMs, ended_on_ms);
    }

    statement.to_string(SqliteQueryBuilder)
}
