use sea_query::{Expr, OnConflict, Order, Query, SqliteQueryBuilder};

use crate::schema::{Messages, Responses};

/// INSERT INTO messages (id, content, created_on_ms) VALUES (...) ON CONFLICT (id) DO NOTHING
pub fn insert(id: &str, content: &str, created_on_ms: i64) -> String {
    Query::insert()
        .into_table(Messages::Table)
        .columns([Messages::Id, Messages::Content, Messages::CreatedOnMs])
        .values_panic([id.into(), content.into(), created_on_ms.into()])
        .on_conflict(OnConflict::column(Messages::Id).do_nothing().to_owned())
        .to_string(SqliteQueryBuilder)
}

/// SELECT id, content, created_on_ms FROM messages
/// WHERE id NOT IN (SELECT message_id FROM responses WHERE status = 0)
/// ORDER BY created_on_ms ASC
///
/// A message is synced once it owns at least one success response; everything
/// else stays eligible for another delivery attempt.
pub fn select_unsent() -> String {
    let synced = Query::select()
        .column(Responses::MessageId)
        .from(Responses::Table)
        .and_where(Expr::col(Responses::Status).eq(0))
        .to_owned();

    Query::select()
        .columns([Messages::Id, Messages::Content, Messages::CreatedOnMs])
        .from(Messages::Table)
        .and_where(Expr::col(Messages::Id).not_in_subquery(synced))
        .order_by(Messages::CreatedOnMs, Order::Asc)
        .to_string(SqliteQueryBuilder)
}

/// INSERT INTO responses (message_id, status, content, received_on_ms) VALUES (...)
pub fn insert_response(
    message_id: &str,
    status: i64,
    content: Option<&str>,
    received_on_ms: i64,
) -> String {
    Query::insert()
        .into_table(Responses::Table)
        .columns([
            Responses::MessageId,
            Responses::Status,
            Responses::Content,
            Responses::ReceivedOnMs,
        ])
        .values_panic([
            message_id.into(),
            status.into(),
            content.into(),
            received_on_ms.into(),
        ])
        .to_string(SqliteQueryBuilder)
}

/// SELECT message_id, status, content, received_on_ms FROM responses
/// WHERE message_id = ? ORDER BY received_on_ms ASC
pub fn select_responses(message_id: &str) -> String {
    Query::select()
        .columns([
            Responses::MessageId,
            Responses::Status,
            Responses::Content,
            Responses::ReceivedOnMs,
        ])
        .from(Responses::Table)
        .and_where(Expr::col(Responses::MessageId).eq(message_id))
        .order_by(Responses::ReceivedOnMs, Order::Asc)
        .to_string(SqliteQueryBuilder)
}
