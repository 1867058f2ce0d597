//! Registered players.

use crate::declarations::{EMAIL_PATTERN, USERNAME_MAX_LEN, USERNAME_MIN_LEN};
use crate::error::{SchemaError, SchemaResult};
use crate::value::{Document, UnixMillis, Value};
use regex::Regex;
use uuid::Uuid;

/// A registered player.
///
/// `username` is the natural key other records refer to and never changes
/// after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Store-assigned identifier, once persisted.
    pub id: Option<Uuid>,
    username: String,
    /// Optional contact email, unique when present.
    pub email: Option<String>,
    /// Present only when authentication is enabled for the player.
    pub password_hash: Option<String>,
    /// Creation time.
    pub created_at: UnixMillis,
    /// Optional display name.
    pub display_name: Option<String>,
    /// Optional avatar image URL.
    pub avatar_url: Option<String>,
}

impl Player {
    /// Creates a player.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidUsername`] unless the username is 3 to
    /// 64 characters long.
    pub fn new(username: impl Into<String>, created_at: UnixMillis) -> SchemaResult<Self> {
        let username = username.into();
        let len = username.chars().count();
        if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
            return Err(SchemaError::InvalidUsername { username });
        }
        Ok(Self {
            id: None,
            username,
            email: None,
            password_hash: None,
            created_at,
            display_name: None,
            avatar_url: None,
        })
    }

    /// Sets the email.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidEmail`] if it lacks a `local@domain` shape.
    pub fn with_email(mut self, email: impl Into<String>) -> SchemaResult<Self> {
        let email = email.into();
        let valid = Regex::new(EMAIL_PATTERN)
            .map(|re| re.is_match(&email))
            .unwrap_or(false);
        if !valid {
            return Err(SchemaError::InvalidEmail { email });
        }
        self.email = Some(email);
        Ok(self)
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Returns the username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Converts the player into a stored document.
    ///
    /// Absent optional fields are omitted rather than written as null, so
    /// they stay out of sparse indexes.
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        if let Some(id) = self.id {
            doc.insert("_id", id);
        }
        doc.insert("username", self.username.as_str());
        let optional = [
            ("email", &self.email),
            ("password_hash", &self.password_hash),
            ("display_name", &self.display_name),
            ("avatar_url", &self.avatar_url),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                doc.insert(key, value.as_str());
            }
        }
        doc.insert("created_at", Value::Timestamp(self.created_at));
        doc
    }
}
