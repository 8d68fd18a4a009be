//! Ledger repository implementation
//!
//! SQL for the arrears ledger tables. Every method runs on a caller-supplied
//! connection so that the adapter can compose them inside one transaction.
//! Queries are built at runtime (`sqlx::query_as` with `FromRow` rows).

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::DatabaseError;

/// Row in `leases`
#[derive(Debug, Clone, FromRow)]
pub struct LeaseRow {
    pub lease_id: Uuid,
    pub tenant_id: Uuid,
    pub stall_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub monthly_rent: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Row in `dues`
#[derive(Debug, Clone, FromRow)]
pub struct DueRow {
    pub due_id: Uuid,
    pub lease_id: Uuid,
    pub due_date: NaiveDate,
    pub amount_due: Decimal,
    pub paid: bool,
    pub created_at: DateTime<Utc>,
}

/// Row in `payments`
#[derive(Debug, Clone, FromRow)]
pub struct PaymentRow {
    pub payment_id: Uuid,
    pub lease_id: Uuid,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub method: String,
    pub remarks: Option<String>,
    pub receipt_ref: Option<String>,
    pub transaction_ref: Option<String>,
    pub recorded_by: String,
    pub created_at: DateTime<Utc>,
}

/// Row in `arrears`
#[derive(Debug, Clone, FromRow)]
pub struct ArrearsRow {
    pub lease_id: Uuid,
    pub total_arrears: Decimal,
    pub last_updated: DateTime<Utc>,
}

/// Row in `penalties`
#[derive(Debug, Clone, FromRow)]
pub struct PenaltyRow {
    pub penalty_id: Uuid,
    pub lease_id: Uuid,
    pub due_id: Uuid,
    pub penalty_amount: Decimal,
    pub days_overdue: i32,
    pub applied_on: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Row in `arrear_entries`
#[derive(Debug, Clone, FromRow)]
pub struct ArrearEntryRow {
    pub arrear_entry_id: Uuid,
    pub lease_id: Uuid,
    pub due_id: Option<Uuid>,
    pub due_date: NaiveDate,
    pub source: String,
    pub original_amount: Decimal,
    pub remaining: Decimal,
    pub paid: bool,
    pub created_at: DateTime<Utc>,
}

const LEASE_COLUMNS: &str =
    "lease_id, tenant_id, stall_id, start_date, end_date, monthly_rent, created_at";
const DUE_COLUMNS: &str = "due_id, lease_id, due_date, amount_due, paid, created_at";
const PAYMENT_COLUMNS: &str = "payment_id, lease_id, amount, payment_date, method, remarks, \
     receipt_ref, transaction_ref, recorded_by, created_at";
const PENALTY_COLUMNS: &str =
    "penalty_id, lease_id, due_id, penalty_amount, days_overdue, applied_on, created_at";
const ENTRY_COLUMNS: &str = "arrear_entry_id, lease_id, due_id, due_date, source, \
     original_amount, remaining, paid, created_at";

/// Repository for the arrears ledger
///
/// Holds the pool only to open transactions and answer pool-level probes;
/// all ledger reads and writes take an explicit connection.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: PgPool,
}

impl LedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, DatabaseError> {
        Ok(self.pool.begin().await?)
    }

    pub async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }

    // ========================================================================
    // Leases
    // ========================================================================

    pub async fn find_lease(
        conn: &mut PgConnection,
        lease_id: Uuid,
    ) -> Result<Option<LeaseRow>, DatabaseError> {
        let sql = format!("SELECT {} FROM leases WHERE lease_id = $1", LEASE_COLUMNS);
        Ok(sqlx::query_as::<_, LeaseRow>(&sql)
            .bind(lease_id)
            .fetch_optional(conn)
            .await?)
    }

    pub async fn insert_lease(conn: &mut PgConnection, row: &LeaseRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO leases (
                lease_id, tenant_id, stall_id, start_date, end_date, monthly_rent, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(row.lease_id)
        .bind(row.tenant_id)
        .bind(row.stall_id)
        .bind(row.start_date)
        .bind(row.end_date)
        .bind(row.monthly_rent)
        .bind(row.created_at)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn set_lease_end(
        conn: &mut PgConnection,
        lease_id: Uuid,
        end_date: NaiveDate,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE leases SET end_date = $2 WHERE lease_id = $1")
            .bind(lease_id)
            .bind(end_date)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Lease", lease_id));
        }
        Ok(())
    }

    // ========================================================================
    // Dues
    // ========================================================================

    pub async fn insert_due(conn: &mut PgConnection, row: &DueRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO dues (due_id, lease_id, due_date, amount_due, paid, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(row.due_id)
        .bind(row.lease_id)
        .bind(row.due_date)
        .bind(row.amount_due)
        .bind(row.paid)
        .bind(row.created_at)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn find_due_for_update(
        conn: &mut PgConnection,
        due_id: Uuid,
    ) -> Result<Option<DueRow>, DatabaseError> {
        let sql = format!("SELECT {} FROM dues WHERE due_id = $1 FOR UPDATE", DUE_COLUMNS);
        Ok(sqlx::query_as::<_, DueRow>(&sql)
            .bind(due_id)
            .fetch_optional(conn)
            .await?)
    }

    pub async fn due_exists_on(
        conn: &mut PgConnection,
        lease_id: Uuid,
        due_date: NaiveDate,
    ) -> Result<bool, DatabaseError> {
        Ok(sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM dues WHERE lease_id = $1 AND due_date = $2)",
        )
        .bind(lease_id)
        .bind(due_date)
        .fetch_one(conn)
        .await?)
    }

    pub async fn oldest_unpaid_due(
        conn: &mut PgConnection,
        lease_id: Uuid,
    ) -> Result<Option<DueRow>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM dues WHERE lease_id = $1 AND NOT paid \
             ORDER BY due_date, created_at LIMIT 1 FOR UPDATE",
            DUE_COLUMNS
        );
        Ok(sqlx::query_as::<_, DueRow>(&sql)
            .bind(lease_id)
            .fetch_optional(conn)
            .await?)
    }

    pub async fn unpaid_dues(conn: &mut PgConnection, lease_id: Uuid) -> Result<Vec<DueRow>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM dues WHERE lease_id = $1 AND NOT paid ORDER BY due_date, created_at",
            DUE_COLUMNS
        );
        Ok(sqlx::query_as::<_, DueRow>(&sql)
            .bind(lease_id)
            .fetch_all(conn)
            .await?)
    }

    pub async fn overdue_unpaid_dues(
        conn: &mut PgConnection,
        before: NaiveDate,
    ) -> Result<Vec<DueRow>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM dues WHERE NOT paid AND due_date < $1 ORDER BY due_date, created_at",
            DUE_COLUMNS
        );
        Ok(sqlx::query_as::<_, DueRow>(&sql)
            .bind(before)
            .fetch_all(conn)
            .await?)
    }

    pub async fn mark_due_paid(conn: &mut PgConnection, due_id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE dues SET paid = TRUE WHERE due_id = $1")
            .bind(due_id)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Due", due_id));
        }
        Ok(())
    }

    // ========================================================================
    // Payments
    // ========================================================================

    pub async fn insert_payment(conn: &mut PgConnection, row: &PaymentRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                payment_id, lease_id, amount, payment_date, method, remarks,
                receipt_ref, transaction_ref, recorded_by, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(row.payment_id)
        .bind(row.lease_id)
        .bind(row.amount)
        .bind(row.payment_date)
        .bind(&row.method)
        .bind(&row.remarks)
        .bind(&row.receipt_ref)
        .bind(&row.transaction_ref)
        .bind(&row.recorded_by)
        .bind(row.created_at)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn last_payment(
        conn: &mut PgConnection,
        lease_id: Uuid,
    ) -> Result<Option<PaymentRow>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM payments WHERE lease_id = $1 \
             ORDER BY payment_date DESC, created_at DESC LIMIT 1",
            PAYMENT_COLUMNS
        );
        Ok(sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(lease_id)
            .fetch_optional(conn)
            .await?)
    }

    pub async fn payments(conn: &mut PgConnection, lease_id: Uuid) -> Result<Vec<PaymentRow>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM payments WHERE lease_id = $1 ORDER BY payment_date, created_at",
            PAYMENT_COLUMNS
        );
        Ok(sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(lease_id)
            .fetch_all(conn)
            .await?)
    }

    // ========================================================================
    // Arrears
    // ========================================================================

    pub async fn lock_arrears(
        conn: &mut PgConnection,
        lease_id: Uuid,
    ) -> Result<Option<ArrearsRow>, DatabaseError> {
        Ok(sqlx::query_as::<_, ArrearsRow>(
            "SELECT lease_id, total_arrears, last_updated FROM arrears WHERE lease_id = $1 FOR UPDATE",
        )
        .bind(lease_id)
        .fetch_optional(conn)
        .await?)
    }

    pub async fn upsert_arrears(conn: &mut PgConnection, row: &ArrearsRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO arrears (lease_id, total_arrears, last_updated)
            VALUES ($1, $2, $3)
            ON CONFLICT (lease_id) DO UPDATE
            SET total_arrears = EXCLUDED.total_arrears,
                last_updated = EXCLUDED.last_updated
            "#,
        )
        .bind(row.lease_id)
        .bind(row.total_arrears)
        .bind(row.last_updated)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn insert_arrear_entry(
        conn: &mut PgConnection,
        row: &ArrearEntryRow,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO arrear_entries (
                arrear_entry_id, lease_id, due_id, due_date, source,
                original_amount, remaining, paid, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(row.arrear_entry_id)
        .bind(row.lease_id)
        .bind(row.due_id)
        .bind(row.due_date)
        .bind(&row.source)
        .bind(row.original_amount)
        .bind(row.remaining)
        .bind(row.paid)
        .bind(row.created_at)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn oldest_open_arrear_entry(
        conn: &mut PgConnection,
        lease_id: Uuid,
        due_date: NaiveDate,
    ) -> Result<Option<ArrearEntryRow>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM arrear_entries WHERE lease_id = $1 AND due_date = $2 AND NOT paid \
             ORDER BY created_at LIMIT 1 FOR UPDATE",
            ENTRY_COLUMNS
        );
        Ok(sqlx::query_as::<_, ArrearEntryRow>(&sql)
            .bind(lease_id)
            .bind(due_date)
            .fetch_optional(conn)
            .await?)
    }

    pub async fn update_arrear_entry(
        conn: &mut PgConnection,
        row: &ArrearEntryRow,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE arrear_entries SET remaining = $2, paid = $3 WHERE arrear_entry_id = $1",
        )
        .bind(row.arrear_entry_id)
        .bind(row.remaining)
        .bind(row.paid)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("ArrearEntry", row.arrear_entry_id));
        }
        Ok(())
    }

    pub async fn arrear_entries(
        conn: &mut PgConnection,
        lease_id: Uuid,
    ) -> Result<Vec<ArrearEntryRow>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM arrear_entries WHERE lease_id = $1 ORDER BY due_date, created_at",
            ENTRY_COLUMNS
        );
        Ok(sqlx::query_as::<_, ArrearEntryRow>(&sql)
            .bind(lease_id)
            .fetch_all(conn)
            .await?)
    }

    // ========================================================================
    // Penalties
    // ========================================================================

    /// Inserts a penalty unless the due already has one
    ///
    /// A concurrent insert for the same due blocks on the unique index until
    /// the other transaction finishes, then becomes a no-op.
    pub async fn insert_penalty_once(
        conn: &mut PgConnection,
        row: &PenaltyRow,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            r#"
            INSERT INTO penalties (
                penalty_id, lease_id, due_id, penalty_amount, days_overdue, applied_on, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (due_id) DO NOTHING
            "#,
        )
        .bind(row.penalty_id)
        .bind(row.lease_id)
        .bind(row.due_id)
        .bind(row.penalty_amount)
        .bind(row.days_overdue)
        .bind(row.applied_on)
        .bind(row.created_at)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn penalties(conn: &mut PgConnection, lease_id: Uuid) -> Result<Vec<PenaltyRow>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM penalties WHERE lease_id = $1 ORDER BY applied_on, created_at",
            PENALTY_COLUMNS
        );
        Ok(sqlx::query_as::<_, PenaltyRow>(&sql)
            .bind(lease_id)
            .fetch_all(conn)
            .await?)
    }
}
