//! Narrow user-repository contract consumed by the credential workflows.
//!
//! The workflows never see sqlx; they talk to [`UserStore`]. Production
//! wires in [`PgUserStore`]; tests use an in-memory implementation.

use async_trait::async_trait;

use examly_core::error::CoreError;
use examly_core::identifier::Identifier;
use examly_core::types::DbId;
use examly_db::models::user::{CreateUser, User};
use examly_db::repositories::UserRepo;
use examly_db::DbPool;

/// The slice of an account the credential workflows need.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: DbId,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub password_hash: String,
    pub is_superuser: bool,
}

impl From<User> for UserRecord {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            phone: user.phone,
            email: user.email,
            password_hash: user.password_hash,
            is_superuser: user.is_superuser,
        }
    }
}

/// What a registration commit inserts.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub phone: Option<String>,
    pub email: Option<String>,
    pub password_hash: String,
}

/// Account lookup and mutation contract.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_identifier(
        &self,
        identifier: &Identifier,
    ) -> Result<Option<UserRecord>, CoreError>;

    async fn find_by_id(&self, id: DbId) -> Result<Option<UserRecord>, CoreError>;

    /// Insert a new account.
    ///
    /// Fails with [`CoreError::IdentifierTaken`] when a uniqueness
    /// constraint rejects the row -- the authoritative answer to two
    /// concurrent registrations racing past the pre-check.
    async fn create(&self, input: NewUser) -> Result<UserRecord, CoreError>;

    /// Replace the password hash. Returns `true` if a row was updated.
    async fn set_password_hash(&self, id: DbId, password_hash: &str) -> Result<bool, CoreError>;
}

/// Postgres-backed [`UserStore`] over [`UserRepo`].
pub struct PgUserStore {
    pool: DbPool,
}

impl PgUserStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Map a sqlx error, folding `uq_users_*` unique violations into
/// [`CoreError::IdentifierTaken`].
fn map_sqlx_error(err: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(db_err) = &err {
        // PostgreSQL unique constraint violation: error code 23505
        if db_err.code().as_deref() == Some("23505")
            && db_err
                .constraint()
                .is_some_and(|c| c.starts_with("uq_users_"))
        {
            return CoreError::IdentifierTaken;
        }
    }
    CoreError::Repo(err.to_string())
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_identifier(
        &self,
        identifier: &Identifier,
    ) -> Result<Option<UserRecord>, CoreError> {
        let user = match identifier {
            Identifier::Phone(phone) => UserRepo::find_by_phone(&self.pool, phone).await,
            Identifier::Email(email) => UserRepo::find_by_email(&self.pool, email).await,
        }
        .map_err(map_sqlx_error)?;
        Ok(user.map(UserRecord::from))
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<UserRecord>, CoreError> {
        let user = UserRepo::find_by_id(&self.pool, id)
            .await
            .map_err(map_sqlx_error)?;
        Ok(user.map(UserRecord::from))
    }

    async fn create(&self, input: NewUser) -> Result<UserRecord, CoreError> {
        let created = UserRepo::create(
            &self.pool,
            &CreateUser {
                phone: input.phone,
                email: input.email,
                password_hash: input.password_hash,
            },
        )
        .await
        .map_err(map_sqlx_error)?;
        Ok(created.into())
    }

    async fn set_password_hash(&self, id: DbId, password_hash: &str) -> Result<bool, CoreError> {
        UserRepo::update_password(&self.pool, id, password_hash)
            .await
            .map_err(map_sqlx_error)
    }
}
