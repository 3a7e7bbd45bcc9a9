use crate::db::models::DbScan;
use crate::db::sqlite::VaultStorage;
use crate::error::MazeError;

impl VaultStorage {
    pub async fn insert_scan(&self, scan: &DbScan) -> Result<(), MazeError> {
        sqlx::query(
            r#"INSERT INTO security_scans (id, user_id, email, domain, breach_count,
                   threat_level, security_score, scanned_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&scan.id)
        .bind(&scan.user_id)
        .bind(&scan.email)
        .bind(&scan.domain)
        .bind(scan.breach_count)
        .bind(scan.threat_level)
        .bind(scan.security_score)
        .bind(scan.scanned_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn list_scans(&self, user_id: &str, limit: i64) -> Result<Vec<DbScan>, MazeError> {
        let rows = sqlx::query_as::<_, DbScan>(
            "SELECT * FROM security_scans WHERE user_id = ? ORDER BY scanned_at DESC, id LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }
}
