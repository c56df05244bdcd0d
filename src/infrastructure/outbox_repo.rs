use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::mirror::{MirrorEvent, MirrorTask};
use crate::domain::ports::MirrorOutbox;
use crate::schema::legacy_mirror_outbox;

use super::models::{NewOutboxEventRow, OutboxEventRow};

/// Writes one outbox row on an existing connection, so callers can include it
/// in their own transaction.
pub(crate) fn insert_mirror_event(conn: &mut PgConnection, event: &MirrorEvent) -> QueryResult<Uuid> {
    let id = Uuid::new_v4();
    diesel::insert_into(legacy_mirror_outbox::table)
        .values(&NewOutboxEventRow {
            id,
            aggregate_type: event.aggregate_type.clone(),
            aggregate_id: event.aggregate_id.clone(),
            action: event.action.clone(),
            payload: event.payload.clone(),
        })
        .execute(conn)?;
    Ok(id)
}

#[derive(Clone)]
pub struct DieselMirrorOutbox {
    pool: DbPool,
}

impl DieselMirrorOutbox {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl MirrorOutbox for DieselMirrorOutbox {
    fn enqueue(&self, event: &MirrorEvent) -> Result<Uuid, DomainError> {
        let mut conn = self.pool.get()?;
        Ok(insert_mirror_event(&mut conn, event)?)
    }

    fn pending(&self, limit: i64, max_attempts: i32) -> Result<Vec<MirrorTask>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows = legacy_mirror_outbox::table
            .filter(legacy_mirror_outbox::delivered_at.is_null())
            .filter(legacy_mirror_outbox::attempts.lt(max_attempts))
            .order(legacy_mirror_outbox::created_at.asc())
            .limit(limit)
            .select(OutboxEventRow::as_select())
            .load(&mut conn)?;

        Ok(rows.into_iter().map(MirrorTask::from).collect())
    }

    fn mark_delivered(&self, id: Uuid) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        diesel::update(legacy_mirror_outbox::table.find(id))
            .set((
                legacy_mirror_outbox::delivered_at.eq(Some(Utc::now())),
                legacy_mirror_outbox::last_error.eq(None::<String>),
            ))
            .execute(&mut conn)?;
        Ok(())
    }

    fn mark_failed(&self, id: Uuid, error: &str) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        diesel::update(legacy_mirror_outbox::table.find(id))
            .set((
                legacy_mirror_outbox::attempts.eq(legacy_mirror_outbox::attempts + 1),
                legacy_mirror_outbox::last_error.eq(Some(error)),
            ))
            .execute(&mut conn)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::DieselMirrorOutbox;
    use crate::domain::mirror::MirrorEvent;
    use crate::domain::ports::MirrorOutbox;
    use crate::infrastructure::test_db::setup_db;

    fn event(id: &str) -> MirrorEvent {
        MirrorEvent {
            aggregate_type: "Order".into(),
            aggregate_id: id.into(),
            action: "createOrder".into(),
            payload: json!({ "orderNumber": id }),
        }
    }

    #[tokio::test]
    async fn pending_skips_delivered_and_exhausted_tasks() {
        let (_container, pool) = setup_db().await;
        let outbox = DieselMirrorOutbox::new(pool);

        let delivered = outbox.enqueue(&event("NOV-00000001")).unwrap();
        let exhausted = outbox.enqueue(&event("NOV-00000002")).unwrap();
        let waiting = outbox.enqueue(&event("NOV-00000003")).unwrap();

        outbox.mark_delivered(delivered).unwrap();
        outbox.mark_failed(exhausted, "timeout").unwrap();
        outbox.mark_failed(exhausted, "timeout").unwrap();
        outbox.mark_failed(waiting, "network error").unwrap();

        let tasks = outbox.pending(10, 2).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, waiting);
        assert_eq!(tasks[0].attempts, 1);
        assert_eq!(tasks[0].event, event("NOV-00000003"));
    }

    #[tokio::test]
    async fn pending_respects_limit_and_age() {
        let (_container, pool) = setup_db().await;
        let outbox = DieselMirrorOutbox::new(pool);

        let first = outbox.enqueue(&event("NOV-00000001")).unwrap();
        outbox.enqueue(&event("NOV-00000002")).unwrap();
        outbox.enqueue(&event("NOV-00000003")).unwrap();

        let tasks = outbox.pending(2, 10).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, first);
    }
}
