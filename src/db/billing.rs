use crate::db::models::{
    DbNotification, DbPayment, DbSubscription, PaymentStatus, PendingPayment, SubscriptionStatus,
};
use crate::db::sqlite::{VaultStorage, is_unique_violation, new_id};
use crate::error::MazeError;
use chrono::{Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct AdminStats {
    pub total_users: i64,
    pub total_vaults: i64,
    pub total_passwords: i64,
    pub payments: BTreeMap<String, i64>,
    pub users_by_plan: BTreeMap<String, i64>,
    pub verified_revenue_paise: i64,
    pub unread_notifications: i64,
}

async fn count(pool: &crate::db::SqlitePool, sql: &str) -> Result<i64, MazeError> {
    let (n,): (i64,) = sqlx::query_as(sql).fetch_one(pool).await?;
    Ok(n)
}

impl VaultStorage {
    pub async fn insert_payment(&self, payment: &DbPayment) -> Result<(), MazeError> {
        sqlx::query(
            r#"INSERT INTO payments (id, user_id, plan, amount_paise, currency, upi_app, status,
                   utr, note, created_at, expires_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&payment.id)
        .bind(&payment.user_id)
        .bind(payment.plan)
        .bind(payment.amount_paise)
        .bind(&payment.currency)
        .bind(&payment.upi_app)
        .bind(payment.status)
        .bind(&payment.utr)
        .bind(&payment.note)
        .bind(payment.created_at)
        .bind(payment.expires_at)
        .bind(payment.updated_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn get_user_payment(
        &self,
        user_id: &str,
        id: &str,
    ) -> Result<Option<DbPayment>, MazeError> {
        let payment =
            sqlx::query_as::<_, DbPayment>("SELECT * FROM payments WHERE id = ? AND user_id = ?")
                .bind(id)
                .bind(user_id)
                .fetch_optional(self.pool())
                .await?;
        Ok(payment)
    }

    pub async fn list_user_payments(&self, user_id: &str) -> Result<Vec<DbPayment>, MazeError> {
        let rows = sqlx::query_as::<_, DbPayment>(
            "SELECT * FROM payments WHERE user_id = ? ORDER BY created_at DESC, id",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Attach a UTR to a `created` order and queue an admin notification.
    /// A UTR already used by another order maps to `Conflict`.
    pub async fn submit_payment(
        &self,
        payment_id: &str,
        utr: &str,
        notification: &str,
    ) -> Result<(), MazeError> {
        let now = Utc::now();
        let mut tx = self.pool().begin().await?;
        let updated = sqlx::query(
            "UPDATE payments SET status = ?, utr = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(PaymentStatus::Submitted)
        .bind(utr)
        .bind(now)
        .bind(payment_id)
        .bind(PaymentStatus::Created)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                MazeError::Conflict("UTR has already been submitted".to_string())
            } else {
                e.into()
            }
        })?
        .rows_affected();
        if updated == 0 {
            return Err(MazeError::Conflict(
                "Order is no longer awaiting payment".to_string(),
            ));
        }

        sqlx::query(
            r#"INSERT INTO admin_notifications (kind, message, payment_id, is_read, created_at)
               VALUES ('payment_submitted', ?, ?, 0, ?)"#,
        )
        .bind(notification)
        .bind(payment_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn list_pending_payments(&self) -> Result<Vec<PendingPayment>, MazeError> {
        let rows = sqlx::query_as::<_, PendingPayment>(
            r#"SELECT p.*, u.email FROM payments p
               JOIN users u ON u.id = p.user_id
               WHERE p.status = ?
               ORDER BY p.updated_at, p.id"#,
        )
        .bind(PaymentStatus::Submitted)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Verify a submitted payment and activate the purchased plan: the
    /// payment, the user's previous subscriptions, the new subscription row,
    /// the user's plan and the payment's notifications change together.
    pub async fn approve_payment(
        &self,
        payment_id: &str,
        subscription_days: i64,
    ) -> Result<DbSubscription, MazeError> {
        let now = Utc::now();
        let mut tx = self.pool().begin().await?;
        let payment = sqlx::query_as::<_, DbPayment>("SELECT * FROM payments WHERE id = ?")
            .bind(payment_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(MazeError::NotFound("Payment"))?;
        if payment.status != PaymentStatus::Submitted {
            return Err(MazeError::Conflict(format!(
                "Payment is {}, only submitted payments can be approved",
                payment.status.as_str()
            )));
        }

        sqlx::query("UPDATE payments SET status = ?, updated_at = ? WHERE id = ?")
            .bind(PaymentStatus::Verified)
            .bind(now)
            .bind(payment_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE subscriptions SET status = ? WHERE user_id = ? AND status = ?")
            .bind(SubscriptionStatus::Expired)
            .bind(&payment.user_id)
            .bind(SubscriptionStatus::Active)
            .execute(&mut *tx)
            .await?;

        let subscription = DbSubscription {
            id: new_id(),
            user_id: payment.user_id.clone(),
            plan: payment.plan,
            status: SubscriptionStatus::Active,
            started_at: now,
            expires_at: now + Duration::days(subscription_days.max(1)),
            payment_id: Some(payment.id.clone()),
        };
        sqlx::query(
            r#"INSERT INTO subscriptions (id, user_id, plan, status, started_at, expires_at, payment_id)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&subscription.id)
        .bind(&subscription.user_id)
        .bind(subscription.plan)
        .bind(subscription.status)
        .bind(subscription.started_at)
        .bind(subscription.expires_at)
        .bind(&subscription.payment_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE users SET subscription_plan = ?, subscription_status = ? WHERE id = ?")
            .bind(subscription.plan)
            .bind(SubscriptionStatus::Active)
            .bind(&subscription.user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE admin_notifications SET is_read = 1 WHERE payment_id = ?")
            .bind(payment_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(subscription)
    }

    pub async fn reject_payment(
        &self,
        payment_id: &str,
        reason: Option<String>,
    ) -> Result<DbPayment, MazeError> {
        let mut tx = self.pool().begin().await?;
        let mut payment = sqlx::query_as::<_, DbPayment>("SELECT * FROM payments WHERE id = ?")
            .bind(payment_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(MazeError::NotFound("Payment"))?;
        if payment.status != PaymentStatus::Submitted {
            return Err(MazeError::Conflict(format!(
                "Payment is {}, only submitted payments can be rejected",
                payment.status.as_str()
            )));
        }

        payment.status = PaymentStatus::Rejected;
        payment.note = reason;
        payment.updated_at = Utc::now();
        sqlx::query("UPDATE payments SET status = ?, note = ?, updated_at = ? WHERE id = ?")
            .bind(payment.status)
            .bind(&payment.note)
            .bind(payment.updated_at)
            .bind(payment_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE admin_notifications SET is_read = 1 WHERE payment_id = ?")
            .bind(payment_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(payment)
    }

    pub async fn latest_subscription(
        &self,
        user_id: &str,
    ) -> Result<Option<DbSubscription>, MazeError> {
        let sub = sqlx::query_as::<_, DbSubscription>(
            "SELECT * FROM subscriptions WHERE user_id = ? ORDER BY started_at DESC, id LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(sub)
    }

    pub async fn list_notifications(
        &self,
        unread_only: bool,
    ) -> Result<Vec<DbNotification>, MazeError> {
        let sql = if unread_only {
            "SELECT * FROM admin_notifications WHERE is_read = 0 ORDER BY id DESC"
        } else {
            "SELECT * FROM admin_notifications ORDER BY id DESC"
        };
        let rows = sqlx::query_as::<_, DbNotification>(sql)
            .fetch_all(self.pool())
            .await?;
        Ok(rows)
    }

    pub async fn mark_notification_read(&self, id: i64) -> Result<bool, MazeError> {
        let affected = sqlx::query("UPDATE admin_notifications SET is_read = 1 WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?
            .rows_affected();
        Ok(affected > 0)
    }

    pub async fn admin_stats(&self) -> Result<AdminStats, MazeError> {
        let pool = self.pool();
        let payments: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM payments GROUP BY status")
                .fetch_all(pool)
                .await?;
        // Same fallback rules as `effective_plan`: a paid plan counts only
        // while the latest subscription is active and unexpired.
        let users_by_plan: Vec<(String, i64)> = sqlx::query_as(
            r#"SELECT CASE
                   WHEN u.subscription_plan = 'free' THEN 'free'
                   WHEN s.id IS NULL THEN u.subscription_plan
                   WHEN s.status = 'active' AND s.expires_at > ? THEN s.plan
                   ELSE 'free'
               END AS plan, COUNT(*)
               FROM users u
               LEFT JOIN subscriptions s ON s.id = (
                   SELECT id FROM subscriptions WHERE user_id = u.id
                   ORDER BY started_at DESC, id LIMIT 1)
               GROUP BY plan"#,
        )
        .bind(Utc::now())
        .fetch_all(pool)
        .await?;
        let (revenue,): (i64,) =
            sqlx::query_as("SELECT IFNULL(SUM(amount_paise), 0) FROM payments WHERE status = ?")
                .bind(PaymentStatus::Verified)
                .fetch_one(pool)
                .await?;

        Ok(AdminStats {
            total_users: count(pool, "SELECT COUNT(*) FROM users").await?,
            total_vaults: count(pool, "SELECT COUNT(*) FROM vaults").await?,
            total_passwords: count(pool, "SELECT COUNT(*) FROM passwords").await?,
            payments: payments.into_iter().collect(),
            users_by_plan: users_by_plan.into_iter().collect(),
            verified_revenue_paise: revenue,
            unread_notifications: count(
                pool,
                "SELECT COUNT(*) FROM admin_notifications WHERE is_read = 0",
            )
            .await?,
        })
    }
}
