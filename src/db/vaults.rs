use crate::db::models::{DbPassword, DbVault};
use crate::db::sqlite::{VaultStorage, new_id};
use crate::error::MazeError;
use chrono::Utc;
use serde::Deserialize;

pub const DEFAULT_VAULT_ICON: &str = "🔐";

#[derive(Debug, Clone, Deserialize)]
pub struct NewVault {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VaultPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPassword {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub url: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PasswordPatch {
    pub title: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub url: Option<String>,
    pub notes: Option<String>,
    /// Move the entry to another vault owned by the same user.
    pub vault_id: Option<String>,
}

/// Outcome of a plan-capped entry insert.
#[derive(Debug)]
pub enum EntryInsert {
    Created(DbPassword),
    VaultNotFound,
    LimitReached,
}

const OWNED_PASSWORD: &str = r#"SELECT p.* FROM passwords p
    JOIN vaults v ON v.id = p.vault_id
    WHERE p.id = ? AND v.user_id = ?"#;

impl VaultStorage {
    pub async fn list_vaults(&self, user_id: &str) -> Result<Vec<DbVault>, MazeError> {
        let rows = sqlx::query_as::<_, DbVault>(
            "SELECT * FROM vaults WHERE user_id = ? ORDER BY created_at, id",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn count_vaults(&self, user_id: &str) -> Result<i64, MazeError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM vaults WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }

    /// Fetch a vault only if `user_id` owns it.
    pub async fn get_vault(
        &self,
        user_id: &str,
        vault_id: &str,
    ) -> Result<Option<DbVault>, MazeError> {
        let vault =
            sqlx::query_as::<_, DbVault>("SELECT * FROM vaults WHERE id = ? AND user_id = ?")
                .bind(vault_id)
                .bind(user_id)
                .fetch_optional(self.pool())
                .await?;
        Ok(vault)
    }

    /// Insert a vault unless `user_id` already owns `limit` of them. The
    /// count and the insert are one statement. `None` when the cap is hit.
    pub async fn create_vault(
        &self,
        user_id: &str,
        new: NewVault,
        limit: Option<i64>,
    ) -> Result<Option<DbVault>, MazeError> {
        let now = Utc::now();
        let vault = DbVault {
            id: new_id(),
            user_id: user_id.to_string(),
            name: new.name.trim().to_string(),
            description: new.description,
            icon: new
                .icon
                .filter(|i| !i.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_VAULT_ICON.to_string()),
            password_count: 0,
            created_at: now,
            updated_at: now,
        };
        let inserted = sqlx::query(
            r#"INSERT INTO vaults (id, user_id, name, description, icon, password_count,
                   created_at, updated_at)
               SELECT ?1, ?2, ?3, ?4, ?5, 0, ?6, ?6
               WHERE ?7 IS NULL OR (SELECT COUNT(*) FROM vaults WHERE user_id = ?2) < ?7"#,
        )
        .bind(&vault.id)
        .bind(&vault.user_id)
        .bind(&vault.name)
        .bind(&vault.description)
        .bind(&vault.icon)
        .bind(vault.created_at)
        .bind(limit)
        .execute(self.pool())
        .await?
        .rows_affected();
        Ok((inserted == 1).then_some(vault))
    }

    pub async fn update_vault(
        &self,
        user_id: &str,
        vault_id: &str,
        patch: VaultPatch,
    ) -> Result<Option<DbVault>, MazeError> {
        let Some(mut vault) = self.get_vault(user_id, vault_id).await? else {
            return Ok(None);
        };
        if let Some(name) = patch.name {
            vault.name = name.trim().to_string();
        }
        if patch.description.is_some() {
            vault.description = patch.description;
        }
        if let Some(icon) = patch.icon.filter(|i| !i.trim().is_empty()) {
            vault.icon = icon;
        }
        vault.updated_at = Utc::now();

        sqlx::query(
            "UPDATE vaults SET name = ?, description = ?, icon = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&vault.name)
        .bind(&vault.description)
        .bind(&vault.icon)
        .bind(vault.updated_at)
        .bind(&vault.id)
        .execute(self.pool())
        .await?;
        Ok(Some(vault))
    }

    /// Delete a vault and all its entries. Returns the number of deleted
    /// entries, or `None` when the vault is not owned by `user_id`.
    pub async fn delete_vault(
        &self,
        user_id: &str,
        vault_id: &str,
    ) -> Result<Option<u64>, MazeError> {
        let mut tx = self.pool().begin().await?;
        let owned: Option<(String,)> =
            sqlx::query_as("SELECT id FROM vaults WHERE id = ? AND user_id = ?")
                .bind(vault_id)
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        if owned.is_none() {
            return Ok(None);
        }

        let deleted = sqlx::query("DELETE FROM passwords WHERE vault_id = ?")
            .bind(vault_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM vaults WHERE id = ?")
            .bind(vault_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(Some(deleted))
    }

    /// Total entries across every vault of `user_id`.
    pub async fn count_passwords(&self, user_id: &str) -> Result<i64, MazeError> {
        let (count,): (i64,) = sqlx::query_as(
            r#"SELECT COUNT(*) FROM passwords p
               JOIN vaults v ON v.id = p.vault_id
               WHERE v.user_id = ?"#,
        )
        .bind(user_id)
        .fetch_one(self.pool())
        .await?;
        Ok(count)
    }

    /// Entries of one vault; `None` when the vault is not owned by `user_id`.
    pub async fn list_passwords(
        &self,
        user_id: &str,
        vault_id: &str,
    ) -> Result<Option<Vec<DbPassword>>, MazeError> {
        if self.get_vault(user_id, vault_id).await?.is_none() {
            return Ok(None);
        }
        let rows = sqlx::query_as::<_, DbPassword>(
            "SELECT * FROM passwords WHERE vault_id = ? ORDER BY title COLLATE NOCASE, id",
        )
        .bind(vault_id)
        .fetch_all(self.pool())
        .await?;
        Ok(Some(rows))
    }

    pub async fn list_user_passwords(&self, user_id: &str) -> Result<Vec<DbPassword>, MazeError> {
        let rows = sqlx::query_as::<_, DbPassword>(
            r#"SELECT p.* FROM passwords p
               JOIN vaults v ON v.id = p.vault_id
               WHERE v.user_id = ?
               ORDER BY p.created_at, p.id"#,
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Case-insensitive substring match on title, username and url.
    pub async fn search_passwords(
        &self,
        user_id: &str,
        query: &str,
    ) -> Result<Vec<DbPassword>, MazeError> {
        let escaped = query
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("%{escaped}%");
        let rows = sqlx::query_as::<_, DbPassword>(
            r#"SELECT p.* FROM passwords p
               JOIN vaults v ON v.id = p.vault_id
               WHERE v.user_id = ?1
                 AND (p.title LIKE ?2 ESCAPE '\' OR p.username LIKE ?2 ESCAPE '\'
                      OR IFNULL(p.url, '') LIKE ?2 ESCAPE '\')
               ORDER BY p.title COLLATE NOCASE, p.id"#,
        )
        .bind(user_id)
        .bind(pattern)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Insert an entry and bump the vault's cached count in one transaction.
    /// The ownership check and the per-user `limit` are part of the insert
    /// statement, which is the first write of the transaction.
    pub async fn create_password(
        &self,
        user_id: &str,
        vault_id: &str,
        new: NewPassword,
        limit: Option<i64>,
    ) -> Result<EntryInsert, MazeError> {
        let now = Utc::now();
        let entry = DbPassword {
            id: new_id(),
            vault_id: vault_id.to_string(),
            title: new.title.trim().to_string(),
            username: new.username,
            password: new.password,
            url: new.url.filter(|u| !u.trim().is_empty()),
            notes: new.notes,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.pool().begin().await?;
        let inserted = sqlx::query(
            r#"INSERT INTO passwords (id, vault_id, title, username, password, url, notes,
                   created_at, updated_at)
               SELECT ?1, v.id, ?3, ?4, ?5, ?6, ?7, ?8, ?8 FROM vaults v
               WHERE v.id = ?2 AND v.user_id = ?9
                 AND (?10 IS NULL OR (SELECT COUNT(*) FROM passwords p
                                      JOIN vaults o ON o.id = p.vault_id
                                      WHERE o.user_id = ?9) < ?10)"#,
        )
        .bind(&entry.id)
        .bind(&entry.vault_id)
        .bind(&entry.title)
        .bind(&entry.username)
        .bind(&entry.password)
        .bind(&entry.url)
        .bind(&entry.notes)
        .bind(entry.created_at)
        .bind(user_id)
        .bind(limit)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            let owned: Option<(String,)> =
                sqlx::query_as("SELECT id FROM vaults WHERE id = ? AND user_id = ?")
                    .bind(vault_id)
                    .bind(user_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            return Ok(match owned {
                Some(_) => EntryInsert::LimitReached,
                None => EntryInsert::VaultNotFound,
            });
        }

        sqlx::query(
            "UPDATE vaults SET password_count = password_count + 1, updated_at = ? WHERE id = ?",
        )
        .bind(now)
        .bind(vault_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(EntryInsert::Created(entry))
    }

    pub async fn get_password(
        &self,
        user_id: &str,
        password_id: &str,
    ) -> Result<Option<DbPassword>, MazeError> {
        let entry = sqlx::query_as::<_, DbPassword>(OWNED_PASSWORD)
            .bind(password_id)
            .bind(user_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(entry)
    }

    /// Apply a partial update. Moving to another vault adjusts both cached
    /// counts in the same transaction; a target vault the user does not own
    /// is reported as `NotFound("Vault")`.
    pub async fn update_password(
        &self,
        user_id: &str,
        password_id: &str,
        patch: PasswordPatch,
    ) -> Result<Option<DbPassword>, MazeError> {
        let mut tx = self.pool().begin().await?;
        let Some(mut entry) = sqlx::query_as::<_, DbPassword>(OWNED_PASSWORD)
            .bind(password_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };
        let now = Utc::now();

        if let Some(target) = patch.vault_id.filter(|v| *v != entry.vault_id) {
            let owned: Option<(String,)> =
                sqlx::query_as("SELECT id FROM vaults WHERE id = ? AND user_id = ?")
                    .bind(&target)
                    .bind(user_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            if owned.is_none() {
                return Err(MazeError::NotFound("Vault"));
            }
            sqlx::query(
                "UPDATE vaults SET password_count = MAX(password_count - 1, 0), updated_at = ? WHERE id = ?",
            )
            .bind(now)
            .bind(&entry.vault_id)
            .execute(&mut *tx)
            .await?;
            sqlx::query(
                "UPDATE vaults SET password_count = password_count + 1, updated_at = ? WHERE id = ?",
            )
            .bind(now)
            .bind(&target)
            .execute(&mut *tx)
            .await?;
            entry.vault_id = target;
        }

        if let Some(title) = patch.title {
            entry.title = title.trim().to_string();
        }
        if let Some(username) = patch.username {
            entry.username = username;
        }
        if let Some(password) = patch.password {
            entry.password = password;
        }
        if let Some(url) = patch.url {
            entry.url = Some(url).filter(|u| !u.trim().is_empty());
        }
        if patch.notes.is_some() {
            entry.notes = patch.notes;
        }
        entry.updated_at = now;

        sqlx::query(
            r#"UPDATE passwords SET vault_id = ?, title = ?, username = ?, password = ?,
                   url = ?, notes = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(&entry.vault_id)
        .bind(&entry.title)
        .bind(&entry.username)
        .bind(&entry.password)
        .bind(&entry.url)
        .bind(&entry.notes)
        .bind(entry.updated_at)
        .bind(&entry.id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(Some(entry))
    }

    /// Delete an entry and decrement its vault's cached count.
    pub async fn delete_password(
        &self,
        user_id: &str,
        password_id: &str,
    ) -> Result<bool, MazeError> {
        let mut tx = self.pool().begin().await?;
        let Some(entry) = sqlx::query_as::<_, DbPassword>(OWNED_PASSWORD)
            .bind(password_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(false);
        };

        sqlx::query("DELETE FROM passwords WHERE id = ?")
            .bind(&entry.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "UPDATE vaults SET password_count = MAX(password_count - 1, 0), updated_at = ? WHERE id = ?",
        )
        .bind(Utc::now())
        .bind(&entry.vault_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(true)
    }
}
