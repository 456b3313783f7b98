//! `profiles` table over a direct Postgres connection.
//!
//! The pool connects with privileged credentials, so the caller's access token
//! is not used for row-level security here.

use async_trait::async_trait;
use secrecy::SecretString;
use sqlx::{FromRow, PgPool, Row, postgres::PgRow};
use tracing::Instrument;
use uuid::Uuid;

use crate::gateway::{ProviderError, RelationalStore};
use crate::model::{ProfilePatch, ProfileRow};

#[derive(Clone, Debug)]
pub struct PgProfiles {
    pool: PgPool,
}

impl PgProfiles {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Raw `profiles` columns; `name` and `points` may be NULL on rows written by
/// older clients.
#[derive(Debug)]
struct ProfileRecord {
    id: String,
    name: Option<String>,
    avatar_url: Option<String>,
    points: Option<i32>,
}

impl<'r> FromRow<'r, PgRow> for ProfileRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            avatar_url: row.try_get("avatar_url")?,
            points: row.try_get("points")?,
        })
    }
}

impl From<ProfileRecord> for ProfileRow {
    fn from(record: ProfileRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.unwrap_or_default(),
            avatar_ref: record.avatar_url.filter(|value| !value.is_empty()),
            points: record
                .points
                .and_then(|points| u32::try_from(points).ok())
                .unwrap_or(0),
        }
    }
}

fn map_sqlx_error(err: sqlx::Error) -> ProviderError {
    match err {
        sqlx::Error::RowNotFound => ProviderError::NotFound,
        sqlx::Error::Database(db_err) => ProviderError::Rejected {
            status: None,
            message: db_err.message().to_string(),
        },
        err @ (sqlx::Error::ColumnDecode { .. } | sqlx::Error::ColumnNotFound(_)) => {
            ProviderError::Rejected {
                status: None,
                message: err.to_string(),
            }
        }
        other => ProviderError::Unavailable(other.to_string()),
    }
}

#[async_trait]
impl RelationalStore for PgProfiles {
    async fn read_profile(
        &self,
        _access_token: &SecretString,
        id: &str,
    ) -> Result<Option<ProfileRow>, ProviderError> {
        // Ids that are not UUIDs cannot match a row.
        let Ok(id) = Uuid::parse_str(id) else {
            return Ok(None);
        };

        let query = r"
            SELECT id::text AS id, name, avatar_url, points
            FROM profiles
            WHERE id = $1
            LIMIT 1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query_as::<_, ProfileRecord>(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(ProfileRow::from))
    }

    async fn update_profile(
        &self,
        _access_token: &SecretString,
        id: &str,
        patch: &ProfilePatch,
    ) -> Result<Option<ProfileRow>, ProviderError> {
        let Ok(id) = Uuid::parse_str(id) else {
            return Ok(None);
        };

        let query = match patch {
            ProfilePatch::DisplayName(_) => {
                r"
                UPDATE profiles SET name = $1 WHERE id = $2
                RETURNING id::text AS id, name, avatar_url, points
                "
            }
            ProfilePatch::AvatarRef(_) => {
                r"
                UPDATE profiles SET avatar_url = $1 WHERE id = $2
                RETURNING id::text AS id, name, avatar_url, points
                "
            }
        };
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let value: Option<&str> = match patch {
            ProfilePatch::DisplayName(name) => Some(name.as_str()),
            ProfilePatch::AvatarRef(reference) => reference.as_deref(),
        };
        let row = sqlx::query_as::<_, ProfileRecord>(query)
            .bind(value)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(ProfileRow::from))
    }
}
