//! PostgreSQL Enrollment Store
//!
//! `UNIQUE (user_id, course_level)` is the uniqueness constraint; the
//! upsert is a single `INSERT .. ON CONFLICT DO UPDATE`, so concurrent
//! first deliveries for the same key collapse into one row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use uuid::Uuid;

use enroll_core::{
    CourseTier, EnrollError, Enrollment, EnrollmentStore, PaidEnrollment, PaymentLogEntry,
    PaymentStatus, Result, UpsertOutcome,
};

const SCHEMA: [&str; 4] = [
    r"CREATE TABLE IF NOT EXISTS enrollments (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL,
        course_level TEXT NOT NULL,
        payment_status TEXT NOT NULL DEFAULT 'pending',
        amount_paid BIGINT NOT NULL DEFAULT 0,
        stripe_session_id TEXT,
        stripe_payment_intent_id TEXT,
        zoom_link TEXT,
        confirmation_email_sent BOOLEAN NOT NULL DEFAULT FALSE,
        enrolled_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        UNIQUE (user_id, course_level)
    )",
    r"CREATE INDEX IF NOT EXISTS idx_enrollments_session ON enrollments (stripe_session_id)",
    r"CREATE TABLE IF NOT EXISTS payment_logs (
        id UUID PRIMARY KEY,
        user_id UUID,
        enrollment_id UUID,
        event_type TEXT NOT NULL,
        stripe_event_id TEXT,
        stripe_session_id TEXT,
        stripe_payment_intent_id TEXT,
        amount BIGINT,
        currency TEXT,
        status TEXT NOT NULL,
        metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
        error_message TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    r"CREATE INDEX IF NOT EXISTS idx_payment_logs_user ON payment_logs (user_id, created_at)",
];

const COLUMNS: &str = "id, user_id, course_level, payment_status, amount_paid, stripe_session_id, \
                       stripe_payment_intent_id, zoom_link, confirmation_email_sent, enrolled_at";

// A replay (already paid, same session) keeps enrolled_at and the
// confirmation flag; `replayed` is read back from the surviving enrolled_at.
const UPSERT: &str = r"
    INSERT INTO enrollments (id, user_id, course_level, payment_status, amount_paid,
        stripe_session_id, stripe_payment_intent_id, zoom_link, confirmation_email_sent,
        enrolled_at)
    VALUES ($1, $2, $3, 'paid', $4, $5, $6, $7, FALSE, $8)
    ON CONFLICT (user_id, course_level) DO UPDATE SET
        payment_status = 'paid',
        amount_paid = EXCLUDED.amount_paid,
        stripe_session_id = EXCLUDED.stripe_session_id,
        stripe_payment_intent_id = EXCLUDED.stripe_payment_intent_id,
        zoom_link = EXCLUDED.zoom_link,
        confirmation_email_sent = CASE
            WHEN enrollments.payment_status IN ('paid', 'completed')
             AND enrollments.stripe_session_id = EXCLUDED.stripe_session_id
            THEN enrollments.confirmation_email_sent
            ELSE FALSE END,
        enrolled_at = CASE
            WHEN enrollments.payment_status IN ('paid', 'completed')
             AND enrollments.stripe_session_id = EXCLUDED.stripe_session_id
            THEN enrollments.enrolled_at
            ELSE EXCLUDED.enrolled_at END
    RETURNING id, user_id, course_level, payment_status, amount_paid, stripe_session_id,
        stripe_payment_intent_id, zoom_link, confirmation_email_sent, enrolled_at,
        (xmax = 0) AS inserted,
        (NOT (xmax = 0) AND enrolled_at <> $8) AS replayed";

// Row lock on the UPDATE serializes claimants; only the first sees the
// flag unset.
const CLAIM_CONFIRMATION: &str = "UPDATE enrollments SET confirmation_email_sent = TRUE \
                                  WHERE id = $1 AND NOT confirmation_email_sent";

fn db_error(e: sqlx::Error) -> EnrollError {
    EnrollError::upstream("database", e.to_string())
}

fn row_to_enrollment(row: &PgRow) -> Result<Enrollment> {
    let level: String = row.try_get("course_level").map_err(db_error)?;
    let status: String = row.try_get("payment_status").map_err(db_error)?;

    Ok(Enrollment {
        id: row.try_get("id").map_err(db_error)?,
        user_id: row.try_get("user_id").map_err(db_error)?,
        course_tier: level.parse::<CourseTier>()?,
        payment_status: PaymentStatus::parse(&status).ok_or_else(|| {
            EnrollError::upstream("database", format!("unknown payment_status '{status}'"))
        })?,
        amount_paid: row.try_get("amount_paid").map_err(db_error)?,
        payment_session_id: row.try_get("stripe_session_id").map_err(db_error)?,
        payment_intent_id: row.try_get("stripe_payment_intent_id").map_err(db_error)?,
        access_link: row.try_get("zoom_link").map_err(db_error)?,
        confirmation_email_sent: row.try_get("confirmation_email_sent").map_err(db_error)?,
        enrolled_at: row.try_get::<DateTime<Utc>, _>("enrolled_at").map_err(db_error)?,
    })
}

pub struct PostgresEnrollmentStore {
    pool: PgPool,
}

impl PostgresEnrollmentStore {
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(db_error)?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they do not exist
    pub async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(db_error)?;
        }
        tracing::info!("Enrollment schema ready");
        Ok(())
    }
}

#[async_trait]
impl EnrollmentStore for PostgresEnrollmentStore {
    async fn upsert_paid_enrollment(&self, paid: &PaidEnrollment) -> Result<UpsertOutcome> {
        let row = sqlx::query(UPSERT)
            .bind(Uuid::new_v4())
            .bind(paid.user_id)
            .bind(paid.course_tier.as_str())
            .bind(paid.amount_paid)
            .bind(&paid.payment_session_id)
            .bind(paid.payment_intent_id.as_deref())
            .bind(&paid.access_link)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(UpsertOutcome {
            enrollment: row_to_enrollment(&row)?,
            created: row.try_get("inserted").map_err(db_error)?,
            replayed: row.try_get("replayed").map_err(db_error)?,
        })
    }

    async fn find_by_key(&self, user_id: Uuid, tier: CourseTier) -> Result<Option<Enrollment>> {
        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM enrollments WHERE user_id = $1 AND course_level = $2"
        ))
        .bind(user_id)
        .bind(tier.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.as_ref().map(row_to_enrollment).transpose()
    }

    async fn find_by_session(&self, session_id: &str, user_id: Uuid) -> Result<Option<Enrollment>> {
        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM enrollments WHERE stripe_session_id = $1 AND user_id = $2"
        ))
        .bind(session_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.as_ref().map(row_to_enrollment).transpose()
    }

    async fn list_paid_for_user(&self, user_id: Uuid) -> Result<Vec<Enrollment>> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM enrollments \
             WHERE user_id = $1 AND payment_status IN ('paid', 'completed') \
             ORDER BY enrolled_at"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.iter().map(row_to_enrollment).collect()
    }

    async fn claim_confirmation(&self, enrollment_id: Uuid) -> Result<bool> {
        let result = sqlx::query(CLAIM_CONFIRMATION)
            .bind(enrollment_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() == 1)
    }

    async fn release_confirmation(&self, enrollment_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE enrollments SET confirmation_email_sent = FALSE WHERE id = $1")
            .bind(enrollment_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn insert_payment_log(&self, entry: &PaymentLogEntry) -> Result<()> {
        sqlx::query(
            r"INSERT INTO payment_logs (id, user_id, enrollment_id, event_type, stripe_event_id,
                stripe_session_id, stripe_payment_intent_id, amount, currency, status, metadata,
                error_message, created_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(entry.id)
        .bind(entry.user_id)
        .bind(entry.enrollment_id)
        .bind(entry.event_type.as_str())
        .bind(entry.external_event_id.as_deref())
        .bind(entry.session_id.as_deref())
        .bind(entry.payment_intent_id.as_deref())
        .bind(entry.amount)
        .bind(entry.currency.as_deref())
        .bind(entry.status.as_str())
        .bind(&entry.metadata)
        .bind(entry.error_message.as_deref())
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }
}
