//! SQLite customer-data provider.
//!
//! RULE: only store.rs talks to the database.
//! The engine reads customer records through `CustomerSource`; derived
//! scores are written back by the caller via `record_scores`.

use crate::{
    customer::{parse_timestamp, CustomerRecord, CustomerSource},
    error::AnalyticsResult,
    prediction::{RiskLevel, ValueSegment},
    service::CustomerInsights,
    types::CustomerId,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const CUSTOMER_COLUMNS: &str =
    "id, name, email, status, created_at, account_type, country,
     total_transactions, total_revenue, avg_transaction_amount,
     days_since_last_payment, failed_payments, support_tickets,
     subscription_count, communication_frequency, payment_method_diversity,
     churned, lifetime_value";

/// Scores derived for one customer at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerScores {
    pub churn_probability: Option<f64>,
    pub churn_risk_level:  Option<RiskLevel>,
    pub predicted_cltv:    Option<f64>,
    pub value_segment:     Option<ValueSegment>,
    pub health_score:      u8,
    pub scored_at:         DateTime<Utc>,
}

impl CustomerScores {
    pub fn from_insights(insights: &CustomerInsights) -> Self {
        Self {
            churn_probability: insights.churn_analysis.as_ref().map(|c| c.churn_probability),
            churn_risk_level:  insights.churn_analysis.as_ref().map(|c| c.risk_level),
            predicted_cltv:    insights.cltv_analysis.as_ref().map(|c| c.predicted_cltv),
            value_segment:     insights.cltv_analysis.as_ref().map(|c| c.value_segment),
            health_score:      insights.health_score,
            scored_at:         insights.generated_at,
        }
    }
}

pub struct CustomerStore {
    conn: Connection,
}

impl CustomerStore {
    /// Open (or create) the customer database at `path`.
    pub fn open(path: &str) -> AnalyticsResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode: scoring passes read while the billing app writes.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> AnalyticsResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> AnalyticsResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_customers.sql"))?;
        Ok(())
    }

    // ── Customer ───────────────────────────────────────────────

    /// Insert a record and its wallets. Returns the stored id, which is
    /// assigned by SQLite when the record has none. The customer row and its
    /// wallets commit together or not at all.
    pub fn insert_customer(&self, c: &CustomerRecord) -> AnalyticsResult<CustomerId> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO customer (
                id, name, email, status, created_at, account_type, country,
                total_transactions, total_revenue, avg_transaction_amount,
                days_since_last_payment, failed_payments, support_tickets,
                subscription_count, communication_frequency, payment_method_diversity,
                churned, lifetime_value
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18)",
            params![
                c.id,
                c.name,
                c.email,
                c.status,
                c.created_at.map(|ts| ts.to_rfc3339()),
                c.account_type,
                c.country,
                c.total_transactions,
                c.total_revenue,
                c.avg_transaction_amount,
                c.days_since_last_payment,
                c.failed_payments,
                c.support_tickets,
                c.subscription_count,
                c.communication_frequency,
                c.payment_method_diversity,
                c.churned,
                c.lifetime_value,
            ],
        )?;
        let id = tx.last_insert_rowid();

        for address in &c.crypto_wallets {
            tx.execute(
                "INSERT INTO customer_wallet (customer_id, address) VALUES (?1, ?2)",
                params![id, address],
            )?;
        }
        // Dropping `tx` on an early return rolls back.
        tx.commit()?;
        Ok(id)
    }

    pub fn customer_count(&self) -> AnalyticsResult<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM customer", [], |row| row.get(0))
            .map_err(Into::into)
    }

    /// All customers ordered by id, wallets attached.
    pub fn all_customers(&self) -> AnalyticsResult<Vec<CustomerRecord>> {
        let mut wallets = self.wallets_by_customer()?;
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {CUSTOMER_COLUMNS} FROM customer ORDER BY id ASC"))?;
        let mut customers = stmt
            .query_map([], customer_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        for c in &mut customers {
            if let Some(id) = c.id {
                c.crypto_wallets = wallets.remove(&id).unwrap_or_default();
            }
        }
        Ok(customers)
    }

    pub fn customer_by_id(&self, id: CustomerId) -> AnalyticsResult<Option<CustomerRecord>> {
        let found = self
            .conn
            .query_row(
                &format!("SELECT {CUSTOMER_COLUMNS} FROM customer WHERE id = ?1"),
                params![id],
                customer_from_row,
            )
            .optional()?;

        let Some(mut customer) = found else {
            return Ok(None);
        };
        let mut stmt = self.conn.prepare(
            "SELECT address FROM customer_wallet WHERE customer_id = ?1 ORDER BY wallet_id ASC",
        )?;
        customer.crypto_wallets = stmt
            .query_map(params![id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(customer))
    }

    fn wallets_by_customer(&self) -> AnalyticsResult<HashMap<CustomerId, Vec<String>>> {
        let mut stmt = self.conn.prepare(
            "SELECT customer_id, address FROM customer_wallet ORDER BY wallet_id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, CustomerId>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut map: HashMap<CustomerId, Vec<String>> = HashMap::new();
        for row in rows {
            let (customer_id, address) = row?;
            map.entry(customer_id).or_default().push(address);
        }
        Ok(map)
    }

    // ── Derived scores ─────────────────────────────────────────

    pub fn record_scores(&self, customer_id: CustomerId, scores: &CustomerScores) -> AnalyticsResult<()> {
        self.conn.execute(
            "INSERT INTO customer_score (
                customer_id, churn_probability, churn_risk_level,
                predicted_cltv, value_segment, health_score, scored_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(customer_id) DO UPDATE SET
                churn_probability = excluded.churn_probability,
                churn_risk_level  = excluded.churn_risk_level,
                predicted_cltv    = excluded.predicted_cltv,
                value_segment     = excluded.value_segment,
                health_score      = excluded.health_score,
                scored_at         = excluded.scored_at",
            params![
                customer_id,
                scores.churn_probability,
                scores.churn_risk_level.map(|r| r.as_str()),
                scores.predicted_cltv,
                scores.value_segment.map(|v| v.as_str()),
                scores.health_score,
                scores.scored_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn scores_for(&self, customer_id: CustomerId) -> AnalyticsResult<Option<CustomerScores>> {
        self.conn
            .query_row(
                "SELECT churn_probability, churn_risk_level, predicted_cltv,
                        value_segment, health_score, scored_at
                 FROM customer_score WHERE customer_id = ?1",
                params![customer_id],
                |row| {
                    let level: Option<String> = row.get(1)?;
                    let segment: Option<String> = row.get(3)?;
                    let scored_at: String = row.get(5)?;
                    Ok(CustomerScores {
                        churn_probability: row.get(0)?,
                        churn_risk_level:  level.as_deref().and_then(RiskLevel::parse),
                        predicted_cltv:    row.get(2)?,
                        value_segment:     segment.as_deref().and_then(ValueSegment::parse),
                        health_score:      row.get::<_, i64>(4)?.clamp(0, 100) as u8,
                        scored_at:         parse_timestamp(&scored_at).unwrap_or_default(),
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }
}

impl CustomerSource for CustomerStore {
    fn customers(&self) -> AnalyticsResult<Vec<CustomerRecord>> {
        self.all_customers()
    }

    fn customer(&self, id: CustomerId) -> AnalyticsResult<Option<CustomerRecord>> {
        self.customer_by_id(id)
    }
}

/// Negative counts in the table are treated as zero.
fn count(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<u32>> {
    Ok(row
        .get::<_, Option<i64>>(idx)?
        .map(|v| v.clamp(0, u32::MAX as i64) as u32))
}

fn customer_from_row(row: &Row<'_>) -> rusqlite::Result<CustomerRecord> {
    let created_at: Option<String> = row.get(4)?;
    Ok(CustomerRecord {
        id:                       row.get(0)?,
        name:                     row.get(1)?,
        email:                    row.get(2)?,
        status:                   row.get(3)?,
        created_at:               created_at.as_deref().and_then(parse_timestamp),
        account_type:             row.get(5)?,
        country:                  row.get(6)?,
        total_transactions:       count(row, 7)?,
        total_revenue:            row.get(8)?,
        avg_transaction_amount:   row.get(9)?,
        days_since_last_payment:  count(row, 10)?,
        failed_payments:          count(row, 11)?,
        support_tickets:          count(row, 12)?,
        subscription_count:       count(row, 13)?,
        communication_frequency:  count(row, 14)?,
        payment_method_diversity: count(row, 15)?,
        churned:                  row.get::<_, Option<i64>>(16)?.map(|v| v != 0),
        lifetime_value:           row.get(17)?,
        crypto_wallets:           Vec::new(),
    })
}
