use std::{env, error::Error};

use async_trait::async_trait;
use model::{
    location::{Location, LocationWithRelations},
    WithId,
};
use queries::convert_error;
use registry::database::{
    Database, DatabaseAutocommit, DatabaseTransaction, LocationRepo, Result,
};
use sqlx::Transaction;
use utility::id::Id;

pub mod data_model;
pub mod queries;

pub struct DatabaseConnectionInfo {
    pub username: String,
    pub password: String,
    pub hostname: String,
    pub port: u16,
    pub database: String,
}

impl DatabaseConnectionInfo {
    pub fn from_env() -> Option<Self> {
        let username = env::var("DATABASE_USER").ok()?;
        let password = env::var("DATABASE_PASSWORD").ok()?;
        let hostname = env::var("DATABASE_HOST").ok()?;
        let port: u16 = env::var("DATABASE_PORT").ok()?.parse().ok()?;
        let database = env::var("DATABASE_NAME").ok()?;
        Some(Self {
            username,
            password,
            hostname,
            port,
            database,
        })
    }

    pub(self) fn postgres_url(self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.hostname, self.port, self.database
        )
    }
}

#[derive(Debug, Clone)]
pub struct PgDatabase {
    connection: sqlx::PgPool,
}

pub struct PgDatabaseTransaction<'a> {
    tx: Transaction<'a, sqlx::Postgres>,
}

#[async_trait]
impl<'a> DatabaseTransaction for PgDatabaseTransaction<'a> {
    async fn commit(self) -> Result<()> {
        self.tx.commit().await.map_err(convert_error)
    }
}

pub struct PgDatabaseAutocommit {
    pool: sqlx::PgPool,
}

impl DatabaseAutocommit for PgDatabaseAutocommit {}

impl PgDatabase {
    pub async fn connect(
        database_connection_info: DatabaseConnectionInfo,
    ) -> std::result::Result<Self, Box<dyn Error>> {
        let url = database_connection_info.postgres_url();
        let pool = sqlx::postgres::PgPool::connect(&url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        log::info!("connected to database, migrations are up to date");

        Ok(Self { connection: pool })
    }
}

#[async_trait]
impl Database for PgDatabase {
    type Transaction = PgDatabaseTransaction<'static>;
    type Autocommit = PgDatabaseAutocommit;

    fn auto(&self) -> Self::Autocommit {
        PgDatabaseAutocommit {
            pool: self.connection.clone(),
        }
    }

    async fn transaction(&self) -> Result<Self::Transaction> {
        let tx: Transaction<'static, sqlx::Postgres> =
            self.connection.begin().await.map_err(convert_error)?;

        Ok(PgDatabaseTransaction { tx })
    }
}

#[async_trait]
impl LocationRepo for PgDatabaseAutocommit {
    async fn insert(&mut self, location: Location) -> Result<WithId<Location>> {
        queries::location::insert(&self.pool, location).await
    }

    async fn find_by_id(
        &mut self,
        id: Id<Location>,
    ) -> Result<Option<WithId<Location>>> {
        queries::location::get(&self.pool, id).await
    }

    async fn find_all_with_relations(&mut self) -> Result<Vec<LocationWithRelations>> {
        queries::location::get_all_with_relations(&self.pool).await
    }

    async fn find_children(
        &mut self,
        id: Id<Location>,
    ) -> Result<Vec<WithId<Location>>> {
        queries::location::get_children(&self.pool, id).await
    }

    async fn find_children_of_set(
        &mut self,
        ids: &[Id<Location>],
    ) -> Result<Vec<WithId<Location>>> {
        queries::location::get_children_of_set(&self.pool, ids).await
    }

    async fn find_roots(&mut self) -> Result<Vec<WithId<Location>>> {
        queries::location::get_roots(&self.pool).await
    }

    async fn update(&mut self, location: WithId<Location>) -> Result<WithId<Location>> {
        queries::location::update(&self.pool, location).await
    }

    async fn delete(&mut self, location: WithId<Location>) -> Result<WithId<Location>> {
        queries::location::delete(&self.pool, location.id).await
    }

    async fn count(&mut self) -> Result<i64> {
        queries::location::count(&self.pool).await
    }

    async fn lock_ancestry(&mut self, _ids: &[Id<Location>]) -> Result<()> {
        // row locks end with the statement outside of a transaction
        Ok(())
    }
}

#[async_trait]
impl<'a> LocationRepo for PgDatabaseTransaction<'a> {
    async fn insert(&mut self, location: Location) -> Result<WithId<Location>> {
        queries::location::insert(&mut *self.tx, location).await
    }

    async fn find_by_id(
        &mut self,
        id: Id<Location>,
    ) -> Result<Option<WithId<Location>>> {
        queries::location::get(&mut *self.tx, id).await
    }

    async fn find_all_with_relations(&mut self) -> Result<Vec<LocationWithRelations>> {
        queries::location::get_all_with_relations(&mut *self.tx).await
    }

    async fn find_children(
        &mut self,
        id: Id<Location>,
    ) -> Result<Vec<WithId<Location>>> {
        queries::location::get_children(&mut *self.tx, id).await
    }

    async fn find_children_of_set(
        &mut self,
        ids: &[Id<Location>],
    ) -> Result<Vec<WithId<Location>>> {
        queries::location::get_children_of_set(&mut *self.tx, ids).await
    }

    async fn find_roots(&mut self) -> Result<Vec<WithId<Location>>> {
        queries::location::get_roots(&mut *self.tx).await
    }

    async fn update(&mut self, location: WithId<Location>) -> Result<WithId<Location>> {
        queries::location::update(&mut *self.tx, location).await
    }

    async fn delete(&mut self, location: WithId<Location>) -> Result<WithId<Location>> {
        queries::location::delete(&mut *self.tx, location.id).await
    }

    async fn count(&mut self) -> Result<i64> {
        queries::location::count(&mut *self.tx).await
    }

    async fn lock_ancestry(&mut self, ids: &[Id<Location>]) -> Result<()> {
        queries::location::lock_ancestry(&mut *self.tx, ids).await
    }
}

#[cfg(test)]
mod tests {
    const CREATE_LOCATIONS: &str =
        include_str!("../migrations/20241001000000_create_locations.sql");

    fn column(name: &str) -> &'static str {
        CREATE_LOCATIONS
            .lines()
            .map(str::trim)
            .find(|line| line.starts_with(name))
            .unwrap_or_else(|| panic!("no column {}", name))
    }

    #[test]
    fn area_keeps_full_precision() {
        // a scale or precision on the column rounds 12.345 and overflows large areas
        assert_eq!(column("area"), "area NUMERIC NOT NULL,");
    }

    #[test]
    fn location_numbers_are_unique_and_parents_referenced() {
        assert!(CREATE_LOCATIONS.contains("UNIQUE (location_number)"));
        assert_eq!(
            column("parent_id"),
            "parent_id INTEGER NULL REFERENCES locations(id),"
        );
    }
}
