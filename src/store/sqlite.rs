use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

const ACCOUNT_COLUMNS: &str = "id, slug, name, created_at, updated_at";
const REPOSITORY_COLUMNS: &str = "id, owner_id, name, slug, description, privacy, has_toc, \
     stars_count, watches_count, created_at, updated_at";
const TOKEN_COLUMNS: &str =
    "id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at, last_used_at";
const MEMBERSHIP_COLUMNS: &str = "user_id, group_id, role, created_at, updated_at";
const DOC_COLUMNS: &str = "id, repository_id, slug, title, body, created_at, updated_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens a private in-memory database. Used by tests and embedders.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn invalid_column(index: usize, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        index,
        rusqlite::types::Type::Text,
        format!("unexpected value '{value}'").into(),
    )
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        slug: row.get(1)?,
        name: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
        updated_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn group_from_row(row: &Row<'_>) -> rusqlite::Result<Group> {
    Ok(Group {
        id: row.get(0)?,
        slug: row.get(1)?,
        name: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
        updated_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

/// Expects the account columns followed by `kind`.
fn owner_from_row(row: &Row<'_>) -> rusqlite::Result<Owner> {
    let kind: String = row.get(5)?;
    match AccountKind::parse(&kind) {
        Some(AccountKind::User) => user_from_row(row).map(Owner::User),
        Some(AccountKind::Group) => group_from_row(row).map(Owner::Group),
        None => Err(invalid_column(5, &kind)),
    }
}

fn repository_from_row(row: &Row<'_>) -> rusqlite::Result<Repository> {
    let privacy: String = row.get(5)?;
    Ok(Repository {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        slug: row.get(3)?,
        description: row.get(4)?,
        privacy: Privacy::parse(&privacy).ok_or_else(|| invalid_column(5, &privacy))?,
        has_toc: row.get(6)?,
        stars_count: row.get(7)?,
        watches_count: row.get(8)?,
        created_at: parse_datetime(&row.get::<_, String>(9)?),
        updated_at: parse_datetime(&row.get::<_, String>(10)?),
    })
}

fn membership_from_row(row: &Row<'_>) -> rusqlite::Result<Membership> {
    let role: String = row.get(2)?;
    Ok(Membership {
        user_id: row.get(0)?,
        group_id: row.get(1)?,
        role: Role::parse(&role).ok_or_else(|| invalid_column(2, &role))?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
        updated_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn token_from_row(row: &Row<'_>) -> rusqlite::Result<Token> {
    Ok(Token {
        id: row.get(0)?,
        token_hash: row.get(1)?,
        token_lookup: row.get(2)?,
        is_admin: row.get(3)?,
        user_id: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        expires_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
        last_used_at: row.get::<_, Option<String>>(7)?.map(|s| parse_datetime(&s)),
    })
}

fn doc_from_row(row: &Row<'_>) -> rusqlite::Result<Doc> {
    Ok(Doc {
        id: row.get(0)?,
        repository_id: row.get(1)?,
        slug: row.get(2)?,
        title: row.get(3)?,
        body: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        updated_at: parse_datetime(&row.get::<_, String>(6)?),
    })
}

impl SqliteStore {
    fn create_account(
        &self,
        kind: AccountKind,
        id: &str,
        slug: &str,
        name: &str,
        created_at: &DateTime<Utc>,
        updated_at: &DateTime<Utc>,
    ) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO accounts (id, kind, slug, name, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id,
                kind.as_str(),
                slug,
                name,
                format_datetime(created_at),
                format_datetime(updated_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::AlreadyExists),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn list_accounts<T>(
        &self,
        kind: AccountKind,
        cursor: &str,
        limit: i32,
        map: fn(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts
             WHERE kind = ?1 AND slug > ?2 ORDER BY slug LIMIT ?3"
        ))?;

        let rows = stmt.query_map(params![kind.as_str(), cursor, limit], map)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_account(&self, kind: AccountKind, id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM accounts WHERE id = ?1 AND kind = ?2",
            params![id, kind.as_str()],
        )?;
        Ok(rows > 0)
    }
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<()> {
        self.create_account(
            AccountKind::User,
            &user.id,
            &user.slug,
            &user.name,
            &user.created_at,
            &user.updated_at,
        )
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1 AND kind = 'user'"),
            params![id],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_users(&self, cursor: &str, limit: i32) -> Result<Vec<User>> {
        self.list_accounts(AccountKind::User, cursor, limit, user_from_row)
    }

    fn delete_user(&self, id: &str) -> Result<bool> {
        self.delete_account(AccountKind::User, id)
    }

    // Group operations

    fn create_group(&self, group: &Group) -> Result<()> {
        self.create_account(
            AccountKind::Group,
            &group.id,
            &group.slug,
            &group.name,
            &group.created_at,
            &group.updated_at,
        )
    }

    fn get_group(&self, id: &str) -> Result<Option<Group>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1 AND kind = 'group'"),
            params![id],
            group_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_groups(&self, cursor: &str, limit: i32) -> Result<Vec<Group>> {
        self.list_accounts(AccountKind::Group, cursor, limit, group_from_row)
    }

    fn delete_group(&self, id: &str) -> Result<bool> {
        self.delete_account(AccountKind::Group, id)
    }

    // Owner lookup

    fn get_owner(&self, id: &str) -> Result<Option<Owner>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {ACCOUNT_COLUMNS}, kind FROM accounts WHERE id = ?1"),
            params![id],
            owner_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_owner_by_slug(&self, slug: &str) -> Result<Option<Owner>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {ACCOUNT_COLUMNS}, kind FROM accounts WHERE slug = ?1"),
            params![slug],
            owner_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    // Membership operations

    fn upsert_membership(&self, membership: &Membership) -> Result<()> {
        let conn = self.conn();

        let kinds: Option<(String, String)> = conn
            .query_row(
                "SELECT u.kind, g.kind FROM accounts u, accounts g WHERE u.id = ?1 AND g.id = ?2",
                params![membership.user_id, membership.group_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match kinds.as_ref().map(|(u, g)| (u.as_str(), g.as_str())) {
            None => return Err(Error::NotFound),
            Some(("user", "group")) => {}
            Some(_) => return Err(Error::NotAGroup),
        }

        conn.execute(
            "INSERT INTO memberships (user_id, group_id, role, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id, group_id) DO UPDATE SET
                role = excluded.role,
                updated_at = excluded.updated_at",
            params![
                membership.user_id,
                membership.group_id,
                membership.role.as_str(),
                format_datetime(&membership.created_at),
                format_datetime(&membership.updated_at),
            ],
        )?;
        Ok(())
    }

    fn delete_membership(&self, user_id: &str, group_id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM memberships WHERE user_id = ?1 AND group_id = ?2",
            params![user_id, group_id],
        )?;
        Ok(rows > 0)
    }

    fn get_membership(&self, user_id: &str, group_id: &str) -> Result<Option<Membership>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {MEMBERSHIP_COLUMNS} FROM memberships WHERE user_id = ?1 AND group_id = ?2"
            ),
            params![user_id, group_id],
            membership_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_group_memberships(&self, group_id: &str) -> Result<Vec<Membership>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM memberships WHERE group_id = ?1 ORDER BY created_at"
        ))?;

        let rows = stmt.query_map(params![group_id], membership_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_user_memberships(&self, user_id: &str) -> Result<Vec<Membership>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM memberships WHERE user_id = ?1 ORDER BY created_at"
        ))?;

        let rows = stmt.query_map(params![user_id], membership_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Token operations

    fn create_token(&self, token: &Token) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO tokens (id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                token.id,
                token.token_hash,
                token.token_lookup,
                token.is_admin,
                token.user_id,
                format_datetime(&token.created_at),
                token.expires_at.as_ref().map(format_datetime),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::TokenLookupCollision),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_token_by_id(&self, id: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE id = ?1"),
            params![id],
            token_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE token_lookup = ?1"),
            params![lookup],
            token_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_tokens(&self, cursor: &str, limit: i32) -> Result<Vec<Token>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TOKEN_COLUMNS} FROM tokens WHERE id > ?1 ORDER BY id LIMIT ?2"
        ))?;

        let rows = stmt.query_map(params![cursor, limit], token_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_user_tokens(&self, user_id: &str) -> Result<Vec<Token>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TOKEN_COLUMNS} FROM tokens WHERE user_id = ?1 ORDER BY created_at DESC"
        ))?;

        let rows = stmt.query_map(params![user_id], token_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_token(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM tokens WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn update_token_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    // Repository operations

    fn create_repository(&self, repo: &Repository) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO repositories (id, owner_id, name, slug, description, privacy, has_toc,
                stars_count, watches_count, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, 0, ?8, ?9)",
            params![
                repo.id,
                repo.owner_id,
                repo.name,
                repo.slug,
                repo.description,
                repo.privacy.as_str(),
                repo.has_toc,
                format_datetime(&repo.created_at),
                format_datetime(&repo.updated_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::AlreadyExists),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_repository(&self, owner_id: &str, slug: &str) -> Result<Option<Repository>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {REPOSITORY_COLUMNS} FROM repositories WHERE owner_id = ?1 AND slug = ?2"
            ),
            params![owner_id, slug],
            repository_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_repository_by_id(&self, id: &str) -> Result<Option<Repository>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {REPOSITORY_COLUMNS} FROM repositories WHERE id = ?1"),
            params![id],
            repository_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    /// Owner and counters are never rewritten here.
    fn update_repository(&self, repo: &Repository) -> Result<()> {
        let result = self.conn().execute(
            "UPDATE repositories SET name = ?1, slug = ?2, description = ?3, privacy = ?4,
                has_toc = ?5, updated_at = ?6
             WHERE id = ?7",
            params![
                repo.name,
                repo.slug,
                repo.description,
                repo.privacy.as_str(),
                repo.has_toc,
                format_datetime(&repo.updated_at),
                repo.id,
            ],
        );

        match result {
            Ok(0) => Err(Error::NotFound),
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::AlreadyExists),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn delete_repository(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM repositories WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Social action operations

    fn get_action_state(
        &self,
        repository_id: &str,
        user_id: &str,
        action_type: ActionType,
    ) -> Result<ActionState> {
        let conn = self.conn();
        let column = action_type.counter_column();

        let count: i64 = conn
            .query_row(
                &format!("SELECT {column} FROM repositories WHERE id = ?1"),
                params![repository_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(Error::NotFound)?;

        let active: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM social_actions
                WHERE repository_id = ?1 AND user_id = ?2 AND action_type = ?3)",
            params![repository_id, user_id, action_type.as_str()],
            |row| row.get(0),
        )?;

        Ok(ActionState { active, count })
    }

    fn set_action(
        &self,
        repository_id: &str,
        user_id: &str,
        action_type: ActionType,
        active: bool,
    ) -> Result<ActionState> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let column = action_type.counter_column();

        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM repositories WHERE id = ?1)",
            params![repository_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(Error::NotFound);
        }

        let changed = if active {
            tx.execute(
                "INSERT OR IGNORE INTO social_actions (repository_id, user_id, action_type, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    repository_id,
                    user_id,
                    action_type.as_str(),
                    format_datetime(&Utc::now()),
                ],
            )?
        } else {
            tx.execute(
                "DELETE FROM social_actions
                 WHERE repository_id = ?1 AND user_id = ?2 AND action_type = ?3",
                params![repository_id, user_id, action_type.as_str()],
            )?
        };

        if changed > 0 {
            tx.execute(
                &format!(
                    "UPDATE repositories SET {column} = (
                        SELECT COUNT(*) FROM social_actions
                        WHERE repository_id = ?1 AND action_type = ?2
                     ) WHERE id = ?1"
                ),
                params![repository_id, action_type.as_str()],
            )?;
        }

        let count: i64 = tx.query_row(
            &format!("SELECT {column} FROM repositories WHERE id = ?1"),
            params![repository_id],
            |row| row.get(0),
        )?;

        tx.commit()?;

        Ok(ActionState { active, count })
    }

    // Doc operations

    fn create_doc(&self, doc: &Doc) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO docs (id, repository_id, slug, title, body, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                doc.id,
                doc.repository_id,
                doc.slug,
                doc.title,
                doc.body,
                format_datetime(&doc.created_at),
                format_datetime(&doc.updated_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::AlreadyExists),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_doc(&self, repository_id: &str, slug: &str) -> Result<Option<Doc>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {DOC_COLUMNS} FROM docs WHERE repository_id = ?1 AND slug = ?2"),
            params![repository_id, slug],
            doc_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_docs(&self, repository_id: &str) -> Result<Vec<Doc>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {DOC_COLUMNS} FROM docs WHERE repository_id = ?1 ORDER BY created_at, slug"
        ))?;

        let rows = stmt.query_map(params![repository_id], doc_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn has_admin_token(&self) -> Result<bool> {
        let conn = self.conn();
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM tokens WHERE is_admin = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}
