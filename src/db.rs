use crate::{
    config::Config,
    error::{Error, Result},
    user::{CREATE_USERS_TABLE, DROP_USERS_TABLE, User, UserId},
};
use sqlx::{
    QueryBuilder, Sqlite, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tracing::instrument;

const SELECT_USERS: &str =
    "SELECT id, email, hashed_password, session_id, reset_token FROM users WHERE ";

/// Column a user lookup filters on.
#[derive(Clone, Debug)]
pub enum UserFilter {
    Id(UserId),
    Email(String),
    SessionId(String),
    ResetToken(String),
}

impl UserFilter {
    fn column(&self) -> &'static str {
        match self {
            UserFilter::Id(_) => "id",
            UserFilter::Email(_) => "email",
            UserFilter::SessionId(_) => "session_id",
            UserFilter::ResetToken(_) => "reset_token",
        }
    }
}

/// A single column assignment applied by [`Db::update_user`].
#[derive(Clone, Debug)]
pub enum UserChange {
    HashedPassword(String),
    SessionId(Option<String>),
    ResetToken(Option<String>),
}

impl UserChange {
    fn column(&self) -> &'static str {
        match self {
            UserChange::HashedPassword(_) => "hashed_password",
            UserChange::SessionId(_) => "session_id",
            UserChange::ResetToken(_) => "reset_token",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    #[instrument(level = "debug", skip(config), fields(path = ?config.database_path))]
    pub async fn connect(config: &Config) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(&config.database_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        if config.database_reset_on_start {
            tracing::info!("Dropping users table");
            sqlx::query(DROP_USERS_TABLE).execute(&db.pool).await?;
        }
        db.create_schema().await?;

        Ok(db)
    }

    /// In-memory database backed by a single connection that is never recycled,
    /// since every SQLite in-memory connection opens a distinct database.
    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let db = Self { pool };
        db.create_schema().await?;
        Ok(db)
    }

    async fn create_schema(&self) -> Result<()> {
        sqlx::query(CREATE_USERS_TABLE).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    #[instrument(level = "debug", skip_all)]
    pub async fn add_user(&self, email: &str, hashed_password: &str) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (email, hashed_password) VALUES (?, ?) \
             RETURNING id, email, hashed_password, session_id, reset_token",
        )
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await?;
        tracing::debug!("added user {}", user.id);
        Ok(user)
    }

    /// Returns the one user matching `filter`.
    #[instrument(level = "debug", skip(self, filter), fields(column = filter.column()))]
    pub async fn find_user_by(&self, filter: UserFilter) -> Result<User> {
        let mut builder = QueryBuilder::<Sqlite>::new(SELECT_USERS);
        builder.push(filter.column()).push(" = ");
        match filter {
            UserFilter::Id(id) => builder.push_bind(id),
            UserFilter::Email(value)
            | UserFilter::SessionId(value)
            | UserFilter::ResetToken(value) => builder.push_bind(value),
        };
        builder.push(" LIMIT 2");

        let mut users = builder
            .build_query_as::<User>()
            .fetch_all(&self.pool)
            .await?;

        match users.len() {
            0 => Err(Error::NoResultFound),
            1 => Ok(users.remove(0)),
            _ => Err(Error::MultipleResultsFound),
        }
    }

    #[instrument(level = "debug", skip(self, changes))]
    pub async fn update_user(&self, user_id: UserId, changes: Vec<UserChange>) -> Result<()> {
        let user = self.find_user_by(UserFilter::Id(user_id)).await?;
        if changes.is_empty() {
            return Ok(());
        }

        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE users SET ");
        let mut assignments = builder.separated(", ");
        for change in changes {
            assignments.push(format!("{} = ", change.column()));
            match change {
                UserChange::HashedPassword(value) => assignments.push_bind_unseparated(value),
                UserChange::SessionId(value) | UserChange::ResetToken(value) => {
                    assignments.push_bind_unseparated(value)
                }
            };
        }
        builder.push(" WHERE id = ").push_bind(user.id);

        builder.build().execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    fn file_config(dir: &Path, database_reset_on_start: bool) -> Config {
        Config {
            database_path: dir.join("users.db"),
            database_reset_on_start,
            database_max_connections: 1,
            listen_address: "127.0.0.1:0".to_string(),
        }
    }

    #[tokio::test]
    async fn test_connect_keeps_rows_without_reset() {
        let temp_dir = tempdir().unwrap();

        let db = Db::connect(&file_config(temp_dir.path(), false))
            .await
            .unwrap();
        db.add_user("a@example.com", "h").await.unwrap();
        db.close().await;
        assert!(temp_dir.path().join("users.db").exists());

        let db = Db::connect(&file_config(temp_dir.path(), false))
            .await
            .unwrap();
        let user = db
            .find_user_by(UserFilter::Email("a@example.com".to_string()))
            .await
            .unwrap();
        assert_eq!(user.hashed_password, "h");
        db.close().await;
    }

    #[tokio::test]
    async fn test_connect_with_reset_drops_rows() {
        let temp_dir = tempdir().unwrap();

        let db = Db::connect(&file_config(temp_dir.path(), true))
            .await
            .unwrap();
        db.add_user("a@example.com", "h").await.unwrap();
        db.close().await;

        let db = Db::connect(&file_config(temp_dir.path(), true))
            .await
            .unwrap();
        let result = db
            .find_user_by(UserFilter::Email("a@example.com".to_string()))
            .await;
        assert!(matches!(result, Err(Error::NoResultFound)));

        // the recreated table is usable
        let user = db.add_user("b@example.com", "h").await.unwrap();
        assert_eq!(user.id, 1);
        db.close().await;
    }

    async fn db_with_user(email: &str) -> (Db, User) {
        let db = Db::in_memory().await.unwrap();
        let user = db.add_user(email, "hashed").await.unwrap();
        (db, user)
    }

    #[tokio::test]
    async fn test_add_user_assigns_id() {
        let db = Db::in_memory().await.unwrap();
        let first = db.add_user("a@example.com", "h1").await.unwrap();
        let second = db.add_user("b@example.com", "h2").await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(second.email, "b@example.com");
        assert_eq!(second.hashed_password, "h2");
        assert!(second.session_id.is_none());
        assert!(second.reset_token.is_none());
    }

    #[tokio::test]
    async fn test_find_user_by_each_column() {
        let (db, user) = db_with_user("a@example.com").await;
        db.update_user(
            user.id,
            vec![
                UserChange::SessionId(Some("sid".to_string())),
                UserChange::ResetToken(Some("rt".to_string())),
            ],
        )
        .await
        .unwrap();

        for filter in [
            UserFilter::Id(user.id),
            UserFilter::Email("a@example.com".to_string()),
            UserFilter::SessionId("sid".to_string()),
            UserFilter::ResetToken("rt".to_string()),
        ] {
            let found = db.find_user_by(filter).await.unwrap();
            assert_eq!(found.id, user.id);
        }
    }

    #[tokio::test]
    async fn test_find_user_by_no_result() {
        let (db, _) = db_with_user("a@example.com").await;
        let result = db
            .find_user_by(UserFilter::Email("nobody@example.com".to_string()))
            .await;
        assert!(matches!(result, Err(Error::NoResultFound)));
    }

    #[tokio::test]
    async fn test_find_user_by_multiple_results() {
        let db = Db::in_memory().await.unwrap();
        db.add_user("twin@example.com", "h1").await.unwrap();
        db.add_user("twin@example.com", "h2").await.unwrap();
        let result = db
            .find_user_by(UserFilter::Email("twin@example.com".to_string()))
            .await;
        assert!(matches!(result, Err(Error::MultipleResultsFound)));
    }

    #[tokio::test]
    async fn test_update_user_sets_and_clears() {
        let (db, user) = db_with_user("a@example.com").await;

        db.update_user(
            user.id,
            vec![
                UserChange::HashedPassword("new-hash".to_string()),
                UserChange::SessionId(Some("sid".to_string())),
            ],
        )
        .await
        .unwrap();
        let updated = db.find_user_by(UserFilter::Id(user.id)).await.unwrap();
        assert_eq!(updated.hashed_password, "new-hash");
        assert_eq!(updated.session_id.as_deref(), Some("sid"));

        db.update_user(user.id, vec![UserChange::SessionId(None)])
            .await
            .unwrap();
        let cleared = db.find_user_by(UserFilter::Id(user.id)).await.unwrap();
        assert!(cleared.session_id.is_none());
        assert_eq!(cleared.hashed_password, "new-hash");
    }

    #[tokio::test]
    async fn test_update_missing_user() {
        let db = Db::in_memory().await.unwrap();
        let result = db
            .update_user(42, vec![UserChange::HashedPassword("h".to_string())])
            .await;
        assert!(matches!(result, Err(Error::NoResultFound)));
    }

    #[tokio::test]
    async fn test_update_with_no_changes_checks_existence() {
        let (db, user) = db_with_user("a@example.com").await;
        db.update_user(user.id, Vec::new()).await.unwrap();
        assert!(matches!(
            db.update_user(user.id + 1, Vec::new()).await,
            Err(Error::NoResultFound)
        ));
    }
}
