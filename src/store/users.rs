//! store::users
//!
//! User rows.

use rusqlite::{params, OptionalExtension, Row};

use super::{now, SqlStore, StoreError};
use crate::core::bus::Event;
use crate::security;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub login: String,
    pub email: String,
    pub password: String,
    pub salt: String,
    pub is_admin: bool,
}

impl User {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            login: row.get("login")?,
            email: row.get("email")?,
            password: row.get("password")?,
            salt: row.get("salt")?,
            is_admin: row.get("is_admin")?,
        })
    }

    /// Check a plaintext password against the stored hash.
    pub fn password_matches(&self, password: &str) -> bool {
        security::verify_password(password, &self.salt, &self.password)
    }
}

impl SqlStore {
    pub fn get_user_by_login(&self, login: &str) -> Result<Option<User>, StoreError> {
        let user = self
            .conn()?
            .query_row(
                "SELECT id, login, email, password, salt, is_admin FROM user WHERE login = ?1",
                params![login],
                User::from_row,
            )
            .optional()?;
        Ok(user)
    }

    /// Insert a user with a freshly salted password hash.
    pub fn create_user(
        &self,
        login: &str,
        email: &str,
        password: &str,
        is_admin: bool,
    ) -> Result<i64, StoreError> {
        let salt = security::random_salt();
        let hash = security::encode_password(password, &salt)?;
        let ts = now();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO user (login, email, password, salt, is_admin, created, updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![login, email, hash, salt, is_admin, ts],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Replace a user's password hash and salt, then announce it on the bus.
    pub fn change_user_password(&self, user: &User, new_password: &str) -> Result<(), StoreError> {
        let salt = security::random_salt();
        let hash = security::encode_password(new_password, &salt)?;
        let changed = self.conn()?.execute(
            "UPDATE user SET password = ?1, salt = ?2, updated = ?3 WHERE id = ?4",
            params![hash, salt, now(), user.id],
        )?;
        if changed == 0 {
            return Err(StoreError::UserNotFound(user.login.clone()));
        }

        self.bus().publish(&Event::UserPasswordChanged {
            user_id: user.id,
            login: user.login.clone(),
        })?;
        Ok(())
    }

    /// Create the configured administrator when it does not exist yet.
    pub(crate) fn ensure_admin_user(&self) -> Result<(), StoreError> {
        let login = self.cfg().admin_user().to_string();
        if self.get_user_by_login(&login)?.is_some() {
            return Ok(());
        }
        let password = self.cfg().admin_password().to_string();
        let id = self.create_user(&login, "admin@localhost", &password, true)?;
        log::info!("Created default admin user '{}' (id {})", login, id);
        Ok(())
    }
}
