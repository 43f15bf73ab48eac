//! # Stores
//!
//! `EventStore` and `UserStore` are the persistence seams the API depends on.
//! `PgStore` implements both on top of the SQL repositories, and is where
//! each join or skip becomes a single transaction:
//!
//! 1. share-lock the caller's user row, 401 if the account is gone
//! 2. lock the event row (`FOR UPDATE`), 404 if missing
//! 3. lock the caller's participation row, if any
//! 4. ask `eventdesk_core::ledger` for the transition
//! 5. write the participation and the new counter, then commit
//!
//! Concurrent joins on one event serialise on step 2, so the capacity check
//! and the increment cannot interleave. A first-time insert that still loses
//! a race on the `(user_id, event_id)` constraint surfaces as
//! `EventError::Conflict` and the whole operation is retried, at which point
//! the existing row is found and updated instead.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use eventdesk_core::{
    catalog, clock,
    errors::{EventError, EventResult},
    ledger::{self, Transition},
    models::{
        event::{
            CreateEventRequest, Event, StatusChange, StudentEventResponse, UpdateEventRequest,
        },
        participation::{JoinOutcome, Participation, SkipOutcome},
        user::{NewUser, UserCredentials, UserSummary},
    },
};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{DbEventCapacity, DbParticipation};
use crate::repositories::{event, participation, user};

/// Attempts made for a join or skip before a participation conflict is surfaced.
const MAX_LEDGER_ATTEMPTS: usize = 3;

#[async_trait]
pub trait EventStore: Send + Sync {
    /// All events with fresh statuses, ordered by date then time.
    async fn list_events(&self, today: NaiveDate) -> EventResult<Vec<Event>>;

    async fn get_event(&self, id: Uuid, today: NaiveDate) -> EventResult<Event>;

    async fn create_event(
        &self,
        created_by: Uuid,
        request: CreateEventRequest,
        today: NaiveDate,
    ) -> EventResult<Event>;

    async fn update_event(
        &self,
        id: Uuid,
        changes: UpdateEventRequest,
        today: NaiveDate,
    ) -> EventResult<Event>;

    async fn delete_event(&self, id: Uuid) -> EventResult<()>;

    /// Persists recomputed statuses and reports what changed.
    async fn refresh_statuses(&self, today: NaiveDate) -> EventResult<Vec<StatusChange>>;

    async fn join_event(&self, user_id: Uuid, event_id: Uuid) -> EventResult<JoinOutcome>;

    async fn skip_event(&self, user_id: Uuid, event_id: Uuid) -> EventResult<SkipOutcome>;

    async fn participations_for_user(
        &self,
        user_id: Uuid,
        today: NaiveDate,
    ) -> EventResult<Vec<Participation>>;

    /// All events paired with the viewer's participation status, read from
    /// one snapshot. Anonymous viewers (`None`) see `pending` everywhere.
    async fn list_events_for_viewer(
        &self,
        viewer: Option<Uuid>,
        today: NaiveDate,
    ) -> EventResult<Vec<StudentEventResponse>>;

    async fn ping(&self) -> EventResult<()>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `EventError::Conflict` when the email is taken.
    async fn create_user(&self, user: NewUser) -> EventResult<UserSummary>;

    async fn get_user(&self, id: Uuid) -> EventResult<Option<UserSummary>>;

    async fn find_credentials(&self, email: String) -> EventResult<Option<UserCredentials>>;
}

/// PostgreSQL-backed implementation of both stores.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// A read-only transaction whose statements all see the same snapshot.
    async fn snapshot(&self) -> EventResult<Transaction<'_, Postgres>> {
        let mut tx = self.pool.begin().await.map_err(sqlx_error)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(sqlx_error)?;
        Ok(tx)
    }

    /// Loads one event, persisting its status first if the date has moved past it.
    async fn fresh_event(
        conn: &mut PgConnection,
        id: Uuid,
        today: NaiveDate,
    ) -> EventResult<Event> {
        let row = event::get_event_by_id(&mut *conn, id)
            .await?
            .ok_or_else(|| not_found(id))?;
        let mut fresh = Event::try_from(row)?;

        if let Some(status) = clock::status_change(fresh.status, fresh.date, today) {
            event::update_status(&mut *conn, id, fresh.status.as_str(), status).await?;
            fresh.status = status;
        }

        Ok(fresh)
    }

    async fn join_once(&self, user_id: Uuid, event_id: Uuid) -> EventResult<JoinOutcome> {
        let mut tx = self.pool.begin().await.map_err(sqlx_error)?;

        require_user(&mut tx, user_id).await?;
        let capacity = locked_event(&mut tx, event_id).await?;
        let existing = participation::find_for_update(&mut tx, user_id, event_id).await?;
        let current = existing.as_ref().map(DbParticipation::status).transpose()?;

        let plan = ledger::plan_join(
            current,
            capacity.current_participants,
            capacity.max_participants,
        )?;
        apply_transition(&mut tx, user_id, &capacity, existing.as_ref(), plan.transition).await?;

        tx.commit().await.map_err(sqlx_error)?;

        debug!(
            "Join applied: user={}, event={}, outcome={:?}",
            user_id, event_id, plan.outcome
        );
        Ok(plan.outcome)
    }

    async fn skip_once(&self, user_id: Uuid, event_id: Uuid) -> EventResult<SkipOutcome> {
        let mut tx = self.pool.begin().await.map_err(sqlx_error)?;

        require_user(&mut tx, user_id).await?;
        let capacity = locked_event(&mut tx, event_id).await?;
        let existing = participation::find_for_update(&mut tx, user_id, event_id).await?;
        let current = existing.as_ref().map(DbParticipation::status).transpose()?;

        let plan = ledger::plan_skip(current, capacity.current_participants);
        apply_transition(&mut tx, user_id, &capacity, existing.as_ref(), plan.transition).await?;

        tx.commit().await.map_err(sqlx_error)?;

        debug!("Skip applied: user={}, event={}", user_id, event_id);
        Ok(plan.outcome)
    }
}

#[async_trait]
impl EventStore for PgStore {
    async fn list_events(&self, today: NaiveDate) -> EventResult<Vec<Event>> {
        let mut tx = self.pool.begin().await.map_err(sqlx_error)?;

        event::refresh_statuses(&mut tx, today).await?;
        let rows = event::list_events(&mut *tx).await?;

        tx.commit().await.map_err(sqlx_error)?;

        let events = rows
            .into_iter()
            .map(Event::try_from)
            .collect::<eyre::Result<Vec<_>>>()?;
        Ok(events)
    }

    async fn get_event(&self, id: Uuid, today: NaiveDate) -> EventResult<Event> {
        let mut conn = self.pool.acquire().await.map_err(sqlx_error)?;
        Self::fresh_event(&mut conn, id, today).await
    }

    async fn create_event(
        &self,
        created_by: Uuid,
        request: CreateEventRequest,
        today: NaiveDate,
    ) -> EventResult<Event> {
        let status = clock::compute_status(request.date, today);
        let mut tx = self.pool.begin().await.map_err(sqlx_error)?;

        require_user(&mut tx, created_by).await?;
        let id = event::create_event(&mut *tx, created_by, &request, status).await?;
        let created = Self::fresh_event(&mut tx, id, today).await?;

        tx.commit().await.map_err(sqlx_error)?;
        info!("Event created: id={}, title={}", id, request.title);

        Ok(created)
    }

    async fn update_event(
        &self,
        id: Uuid,
        changes: UpdateEventRequest,
        today: NaiveDate,
    ) -> EventResult<Event> {
        let mut conn = self.pool.acquire().await.map_err(sqlx_error)?;

        if !event::update_event(&mut *conn, id, &changes).await? {
            return Err(not_found(id));
        }
        info!("Event updated: id={}", id);

        Self::fresh_event(&mut conn, id, today).await
    }

    async fn delete_event(&self, id: Uuid) -> EventResult<()> {
        if !event::delete_event(&self.pool, id).await? {
            return Err(not_found(id));
        }
        info!("Event deleted: id={}", id);
        Ok(())
    }

    async fn refresh_statuses(&self, today: NaiveDate) -> EventResult<Vec<StatusChange>> {
        let mut tx = self.pool.begin().await.map_err(sqlx_error)?;
        let changes = event::refresh_statuses(&mut tx, today).await?;
        tx.commit().await.map_err(sqlx_error)?;
        Ok(changes)
    }

    async fn join_event(&self, user_id: Uuid, event_id: Uuid) -> EventResult<JoinOutcome> {
        let mut attempt = 1;
        loop {
            match self.join_once(user_id, event_id).await {
                Err(EventError::Conflict(reason)) if attempt < MAX_LEDGER_ATTEMPTS => {
                    warn!(
                        "Join conflict for user={}, event={} (attempt {}): {}",
                        user_id, event_id, attempt, reason
                    );
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn skip_event(&self, user_id: Uuid, event_id: Uuid) -> EventResult<SkipOutcome> {
        let mut attempt = 1;
        loop {
            match self.skip_once(user_id, event_id).await {
                Err(EventError::Conflict(reason)) if attempt < MAX_LEDGER_ATTEMPTS => {
                    warn!(
                        "Skip conflict for user={}, event={} (attempt {}): {}",
                        user_id, event_id, attempt, reason
                    );
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn participations_for_user(
        &self,
        user_id: Uuid,
        today: NaiveDate,
    ) -> EventResult<Vec<Participation>> {
        self.refresh_statuses(today).await?;

        let mut tx = self.snapshot().await?;

        let owner = user::get_user_by_id(&mut *tx, user_id)
            .await?
            .ok_or_else(|| EventError::NotFound(format!("User with ID {} not found", user_id)))?
            .summary()?;

        let rows = participation::get_participations_by_user(&mut *tx, user_id).await?;
        let event_ids: Vec<Uuid> = rows.iter().map(|row| row.event_id).collect();
        let events = event::get_events_by_ids(&mut *tx, &event_ids).await?;

        tx.commit().await.map_err(sqlx_error)?;

        let mut events_by_id = HashMap::new();
        for row in events {
            let event = Event::try_from(row)?;
            events_by_id.insert(event.id, event);
        }

        let mut participations = Vec::with_capacity(rows.len());
        for row in rows {
            let status = row.status()?;
            let Some(event) = events_by_id.get(&row.event_id).cloned() else {
                continue;
            };
            participations.push(Participation {
                id: row.id,
                user: owner.clone(),
                event,
                status,
                created_at: row.created_at,
                updated_at: row.updated_at,
            });
        }

        Ok(participations)
    }

    async fn list_events_for_viewer(
        &self,
        viewer: Option<Uuid>,
        today: NaiveDate,
    ) -> EventResult<Vec<StudentEventResponse>> {
        self.refresh_statuses(today).await?;

        let mut tx = self.snapshot().await?;
        let rows = event::list_events(&mut *tx).await?;
        let participations = match viewer {
            Some(user_id) => participation::get_participations_by_user(&mut *tx, user_id).await?,
            None => Vec::new(),
        };
        tx.commit().await.map_err(sqlx_error)?;

        let events = rows
            .into_iter()
            .map(Event::try_from)
            .collect::<eyre::Result<Vec<_>>>()?;

        let mut statuses = HashMap::with_capacity(participations.len());
        for row in participations {
            statuses.insert(row.event_id, row.status()?);
        }

        Ok(catalog::with_viewer_status(events, &statuses))
    }

    async fn ping(&self) -> EventResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(sqlx_error)?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, new_user: NewUser) -> EventResult<UserSummary> {
        let db_user = user::create_user(&self.pool, &new_user)
            .await
            .map_err(|err| {
                classify(err, format!("A user with email {} already exists", new_user.email))
            })?;

        info!("User registered: id={}, user_type={}", db_user.id, db_user.user_type);
        Ok(db_user.summary()?)
    }

    async fn get_user(&self, id: Uuid) -> EventResult<Option<UserSummary>> {
        let db_user = user::get_user_by_id(&self.pool, id).await?;
        Ok(db_user.map(|u| u.summary()).transpose()?)
    }

    async fn find_credentials(&self, email: String) -> EventResult<Option<UserCredentials>> {
        let Some(db_user) = user::get_user_by_email(&self.pool, &email).await? else {
            return Ok(None);
        };

        Ok(Some(UserCredentials {
            user: db_user.summary()?,
            password_hash: db_user.password_hash,
        }))
    }
}

/// Rejects callers whose account was deleted after their token was issued.
async fn require_user(conn: &mut PgConnection, user_id: Uuid) -> EventResult<()> {
    if user::lock_user(conn, user_id).await? {
        Ok(())
    } else {
        Err(EventError::Authentication(
            "User account no longer exists".to_string(),
        ))
    }
}

async fn locked_event(conn: &mut PgConnection, event_id: Uuid) -> EventResult<DbEventCapacity> {
    event::lock_event_capacity(conn, event_id)
        .await?
        .ok_or_else(|| not_found(event_id))
}

/// Writes the participation side and the counter side of a planned transition.
async fn apply_transition(
    conn: &mut PgConnection,
    user_id: Uuid,
    capacity: &DbEventCapacity,
    existing: Option<&DbParticipation>,
    transition: Transition,
) -> EventResult<()> {
    if transition.is_noop() {
        return Ok(());
    }

    match existing {
        None => {
            participation::create_participation(&mut *conn, user_id, capacity.id, transition.to)
                .await
                .map_err(|err| classify(err, "Participation already exists".to_string()))?;
        }
        Some(row) => {
            participation::update_participation_status(&mut *conn, row.id, transition.to).await?;
        }
    }

    if transition.delta != 0 {
        let count = ledger::apply_delta(capacity.current_participants, transition.delta);
        event::set_participant_count(&mut *conn, capacity.id, count).await?;
    }

    Ok(())
}

/// Maps a repository error, turning unique violations into `EventError::Conflict`.
fn classify(err: eyre::Report, conflict: String) -> EventError {
    let unique_violation = err
        .downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .is_some_and(|e| e.is_unique_violation());

    if unique_violation {
        EventError::Conflict(conflict)
    } else {
        EventError::Database(err)
    }
}

fn sqlx_error(err: sqlx::Error) -> EventError {
    EventError::Database(err.into())
}

fn not_found(id: Uuid) -> EventError {
    EventError::NotFound(format!("Event with ID {} not found", id))
}

#[cfg(test)]
mod tests {
    //! Run against a disposable database with
    //! `TEST_DATABASE_URL=... cargo test -p eventdesk-db -- --ignored`.

    use super::*;
    use crate::mock::create_test_pool;
    use chrono::{Days, NaiveTime, Utc};
    use eventdesk_core::models::{
        event::EventStatus, participation::ParticipationStatus, user::UserType,
    };
    use fake::{faker::internet::en::SafeEmail, Fake};
    use pretty_assertions::assert_eq;

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    async fn new_user(store: &PgStore, user_type: UserType) -> UserSummary {
        store
            .create_user(NewUser {
                email: SafeEmail().fake(),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                student_id: None,
                user_type,
                password_hash: "not-a-real-hash".to_string(),
            })
            .await
            .expect("Failed to create user")
    }

    async fn new_event(store: &PgStore, admin: &UserSummary, date: NaiveDate, max: i32) -> Event {
        let request = CreateEventRequest {
            title: format!("Event {}", Uuid::new_v4()),
            description: "Integration test event".to_string(),
            date,
            time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            location: "Main Auditorium".to_string(),
            max_participants: max,
            category: "Testing".to_string(),
        };
        store
            .create_event(admin.id, request, today())
            .await
            .expect("Failed to create event")
    }

    async fn participation_rows(store: &PgStore, user_id: Uuid, event_id: Uuid) -> i64 {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM event_participations WHERE user_id = $1 AND event_id = $2",
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_one(store.pool())
        .await
        .unwrap()
    }

    #[tokio::test]
    #[ignore = "requires a PostgreSQL test database"]
    async fn capacity_scenario_round_trips_through_postgres() {
        let store = PgStore::new(create_test_pool().await);
        let admin = new_user(&store, UserType::Admin).await;
        let (a, b, c) = (
            new_user(&store, UserType::Student).await,
            new_user(&store, UserType::Student).await,
            new_user(&store, UserType::Student).await,
        );
        let event = new_event(&store, &admin, today() + Days::new(7), 2).await;

        assert_eq!(store.join_event(a.id, event.id).await.unwrap(), JoinOutcome::Joined);
        store.join_event(b.id, event.id).await.unwrap();
        let full = store.join_event(c.id, event.id).await;
        assert!(matches!(full, Err(EventError::Capacity(_))));
        assert_eq!(store.get_event(event.id, today()).await.unwrap().current_participants, 2);

        store.skip_event(a.id, event.id).await.unwrap();
        assert_eq!(store.get_event(event.id, today()).await.unwrap().current_participants, 1);

        store.join_event(a.id, event.id).await.unwrap();
        assert_eq!(store.get_event(event.id, today()).await.unwrap().current_participants, 2);
        assert_eq!(participation_rows(&store, a.id, event.id).await, 1);
        assert_eq!(participation_rows(&store, c.id, event.id).await, 0);
    }

    #[tokio::test]
    #[ignore = "requires a PostgreSQL test database"]
    async fn concurrent_joins_never_overbook() {
        let store = PgStore::new(create_test_pool().await);
        let admin = new_user(&store, UserType::Admin).await;
        let event = new_event(&store, &admin, today() + Days::new(3), 1).await;
        let first = new_user(&store, UserType::Student).await;
        let second = new_user(&store, UserType::Student).await;

        let (left, right) = tokio::join!(
            store.join_event(first.id, event.id),
            store.join_event(second.id, event.id)
        );

        assert_eq!(left.is_ok() as i32 + right.is_ok() as i32, 1);
        assert_eq!(store.get_event(event.id, today()).await.unwrap().current_participants, 1);
    }

    #[tokio::test]
    #[ignore = "requires a PostgreSQL test database"]
    async fn concurrent_first_joins_by_one_user_create_one_row() {
        let store = PgStore::new(create_test_pool().await);
        let admin = new_user(&store, UserType::Admin).await;
        let event = new_event(&store, &admin, today() + Days::new(3), 10).await;
        let student = new_user(&store, UserType::Student).await;

        let (left, right) = tokio::join!(
            store.join_event(student.id, event.id),
            store.join_event(student.id, event.id)
        );

        let mut outcomes = vec![left.unwrap(), right.unwrap()];
        outcomes.sort_by_key(|outcome| *outcome == JoinOutcome::AlreadyJoined);
        assert_eq!(outcomes, vec![JoinOutcome::Joined, JoinOutcome::AlreadyJoined]);
        assert_eq!(participation_rows(&store, student.id, event.id).await, 1);
        assert_eq!(store.get_event(event.id, today()).await.unwrap().current_participants, 1);
    }

    #[tokio::test]
    #[ignore = "requires a PostgreSQL test database"]
    async fn listing_refreshes_stale_status() {
        let store = PgStore::new(create_test_pool().await);
        let admin = new_user(&store, UserType::Admin).await;
        let event = new_event(&store, &admin, today(), 5).await;

        sqlx::query("UPDATE events SET status = 'upcoming' WHERE id = $1")
            .bind(event.id)
            .execute(store.pool())
            .await
            .unwrap();

        let listed = store.list_events(today()).await.unwrap();
        let fresh = listed.iter().find(|e| e.id == event.id).unwrap();
        assert_eq!(fresh.status, EventStatus::Ongoing);

        let changes = store.refresh_statuses(today()).await.unwrap();
        assert!(changes.iter().all(|change| change.event_id != event.id));
    }

    #[tokio::test]
    #[ignore = "requires a PostgreSQL test database"]
    async fn deleting_event_cascades_participations() {
        let store = PgStore::new(create_test_pool().await);
        let admin = new_user(&store, UserType::Admin).await;
        let student = new_user(&store, UserType::Student).await;
        let event = new_event(&store, &admin, today() + Days::new(1), 5).await;

        store.skip_event(student.id, event.id).await.unwrap();
        store.delete_event(event.id).await.unwrap();

        assert_eq!(participation_rows(&store, student.id, event.id).await, 0);
        assert!(matches!(
            store.get_event(event.id, today()).await,
            Err(EventError::NotFound(_))
        ));
    }

    #[tokio::test]
    #[ignore = "requires a PostgreSQL test database"]
    async fn deleted_account_cannot_join_skip_or_create() {
        let store = PgStore::new(create_test_pool().await);
        let admin = new_user(&store, UserType::Admin).await;
        let event = new_event(&store, &admin, today() + Days::new(2), 5).await;
        let gone = new_user(&store, UserType::Student).await;
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(gone.id)
            .execute(store.pool())
            .await
            .unwrap();

        assert!(matches!(
            store.join_event(gone.id, event.id).await,
            Err(EventError::Authentication(_))
        ));
        assert!(matches!(
            store.skip_event(gone.id, event.id).await,
            Err(EventError::Authentication(_))
        ));
        let request = CreateEventRequest {
            title: "Orphan".to_string(),
            description: "Created by a removed account".to_string(),
            date: today() + Days::new(2),
            time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            location: "Nowhere".to_string(),
            max_participants: 5,
            category: "Testing".to_string(),
        };
        assert!(matches!(
            store.create_event(gone.id, request, today()).await,
            Err(EventError::Authentication(_))
        ));
        assert_eq!(participation_rows(&store, gone.id, event.id).await, 0);
    }

    #[tokio::test]
    #[ignore = "requires a PostgreSQL test database"]
    async fn viewer_listing_pairs_counters_with_status() {
        let store = PgStore::new(create_test_pool().await);
        let admin = new_user(&store, UserType::Admin).await;
        let student = new_user(&store, UserType::Student).await;
        let joined = new_event(&store, &admin, today() + Days::new(4), 5).await;
        let skipped = new_event(&store, &admin, today() + Days::new(5), 5).await;
        store.join_event(student.id, joined.id).await.unwrap();
        store.skip_event(student.id, skipped.id).await.unwrap();

        let listing = store
            .list_events_for_viewer(Some(student.id), today())
            .await
            .unwrap();
        let entry = |id: Uuid| listing.iter().find(|e| e.event.id == id).unwrap();

        assert_eq!(entry(joined.id).user_participation_status, ParticipationStatus::Joined);
        assert_eq!(entry(joined.id).event.current_participants, 1);
        assert_eq!(entry(skipped.id).user_participation_status, ParticipationStatus::Skipped);

        let anonymous = store.list_events_for_viewer(None, today()).await.unwrap();
        assert!(anonymous
            .iter()
            .all(|e| e.user_participation_status == ParticipationStatus::Pending));
    }

    #[tokio::test]
    #[ignore = "requires a PostgreSQL test database"]
    async fn duplicate_email_is_a_conflict() {
        let store = PgStore::new(create_test_pool().await);
        let user = new_user(&store, UserType::Student).await;

        let duplicate = store
            .create_user(NewUser {
                email: user.email.clone(),
                first_name: "Other".to_string(),
                last_name: "User".to_string(),
                student_id: None,
                user_type: UserType::Student,
                password_hash: "hash".to_string(),
            })
            .await;

        assert!(matches!(duplicate, Err(EventError::Conflict(_))));
    }
}
