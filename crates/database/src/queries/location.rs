use std::collections::HashMap;

use model::{
    location::{Location, LocationWithRelations},
    WithId,
};
use registry::database::{DatabaseError, Result};
use sqlx::{Executor, Postgres};
use utility::{
    id::{Id, IdWrapper},
    let_also::LetAlso,
};

use crate::data_model::{location::LocationRow, with_id, with_ids};

use super::{convert_error, convert_write_error};

// Repo

pub async fn insert<'c, E>(executor: E, location: Location) -> Result<WithId<Location>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO locations(
            building,
            location_name,
            location_number,
            area,
            parent_id
        )
        VALUES ($1, $2, $3, $4::numeric, $5)
        RETURNING
            id, building, location_name, location_number,
            area::float8 AS area, parent_id;
        ",
    )
    .bind(&location.building)
    .bind(&location.location_name)
    .bind(&location.location_number)
    .bind(location.area)
    .bind(location.parent_id.raw())
    .fetch_one(executor)
    .await
    .map(|row: LocationRow| with_id(row))
    .map_err(|why| convert_write_error(why, &location.location_number))
}

pub async fn get<'c, E>(executor: E, id: Id<Location>) -> Result<Option<WithId<Location>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT
            id, building, location_name, location_number,
            area::float8 AS area, parent_id
        FROM
            locations
        WHERE id = $1;
        ",
    )
    .bind(id.raw())
    .fetch_optional(executor)
    .await
    .map_err(convert_error)?
    .map(|row: LocationRow| with_id(row))
    .let_owned(Ok)
}

pub async fn get_all<'c, E>(executor: E) -> Result<Vec<WithId<Location>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT
            id, building, location_name, location_number,
            area::float8 AS area, parent_id
        FROM
            locations
        ORDER BY id ASC;
        ",
    )
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|rows: Vec<LocationRow>| Ok(with_ids(rows)))
}

/// Fetches all locations in one query and resolves parents and children in memory.
pub async fn get_all_with_relations<'c, E>(
    executor: E,
) -> Result<Vec<LocationWithRelations>>
where
    E: Executor<'c, Database = Postgres>,
{
    let locations = get_all(executor).await?;

    let by_id: HashMap<Id<Location>, WithId<Location>> = locations
        .iter()
        .map(|location| (location.id, location.clone()))
        .collect();
    let mut children: HashMap<Id<Location>, Vec<WithId<Location>>> = HashMap::new();
    for location in locations.iter() {
        if let Some(parent_id) = location.content.parent_id {
            children.entry(parent_id).or_default().push(location.clone());
        }
    }

    locations
        .into_iter()
        .map(|location| LocationWithRelations {
            parent: location
                .content
                .parent_id
                .and_then(|parent_id| by_id.get(&parent_id).cloned()),
            children: children.remove(&location.id).unwrap_or_default(),
            location,
        })
        .collect::<Vec<_>>()
        .let_owned(Ok)
}

pub async fn get_children<'c, E>(
    executor: E,
    id: Id<Location>,
) -> Result<Vec<WithId<Location>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT
            id, building, location_name, location_number,
            area::float8 AS area, parent_id
        FROM
            locations
        WHERE parent_id = $1
        ORDER BY id ASC;
        ",
    )
    .bind(id.raw())
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|rows: Vec<LocationRow>| Ok(with_ids(rows)))
}

pub async fn get_children_of_set<'c, E>(
    executor: E,
    ids: &[Id<Location>],
) -> Result<Vec<WithId<Location>>>
where
    E: Executor<'c, Database = Postgres>,
{
    if ids.is_empty() {
        return Ok(vec![]);
    }
    sqlx::query_as(
        "
        SELECT
            id, building, location_name, location_number,
            area::float8 AS area, parent_id
        FROM
            locations
        WHERE parent_id = ANY($1)
        ORDER BY id ASC;
        ",
    )
    .bind(ids.raw())
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|rows: Vec<LocationRow>| Ok(with_ids(rows)))
}

pub async fn get_roots<'c, E>(executor: E) -> Result<Vec<WithId<Location>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT
            id, building, location_name, location_number,
            area::float8 AS area, parent_id
        FROM
            locations
        WHERE parent_id IS NULL
        ORDER BY id ASC;
        ",
    )
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|rows: Vec<LocationRow>| Ok(with_ids(rows)))
}

pub async fn update<'c, E>(
    executor: E,
    location: WithId<Location>,
) -> Result<WithId<Location>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        UPDATE locations
        SET
            building = $2,
            location_name = $3,
            location_number = $4,
            area = $5::numeric,
            parent_id = $6
        WHERE id = $1
        RETURNING
            id, building, location_name, location_number,
            area::float8 AS area, parent_id;
        ",
    )
    .bind(location.id.raw())
    .bind(&location.content.building)
    .bind(&location.content.location_name)
    .bind(&location.content.location_number)
    .bind(location.content.area)
    .bind(location.content.parent_id.raw())
    .fetch_optional(executor)
    .await
    .map_err(|why| convert_write_error(why, &location.content.location_number))?
    .map(|row: LocationRow| with_id(row))
    .ok_or(DatabaseError::NotFound)
}

pub async fn delete<'c, E>(executor: E, id: Id<Location>) -> Result<WithId<Location>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        DELETE FROM locations
        WHERE id = $1
        RETURNING
            id, building, location_name, location_number,
            area::float8 AS area, parent_id;
        ",
    )
    .bind(id.raw())
    .fetch_optional(executor)
    .await
    .map_err(convert_error)?
    .map(|row: LocationRow| with_id(row))
    .ok_or(DatabaseError::NotFound)
}

pub async fn count<'c, E>(executor: E) -> Result<i64>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar("SELECT COUNT(*) FROM locations;")
        .fetch_one(executor)
        .await
        .map_err(convert_error)
}

/// Takes row locks on the given locations and on every ancestor of them, in id
/// order. Only meaningful inside a transaction.
pub async fn lock_ancestry<'c, E>(executor: E, ids: &[Id<Location>]) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    if ids.is_empty() {
        return Ok(());
    }
    // UNION (not UNION ALL) stops at rows already in the chain, so a corrupted,
    // cyclic table can not make this run forever.
    sqlx::query(
        "
        WITH RECURSIVE chain(id, parent_id) AS (
            SELECT id, parent_id FROM locations WHERE id = ANY($1)
            UNION
            SELECT l.id, l.parent_id
            FROM locations l
            JOIN chain c ON l.id = c.parent_id
        )
        SELECT id
        FROM locations
        WHERE id IN (SELECT id FROM chain)
        ORDER BY id ASC
        FOR UPDATE;
        ",
    )
    .bind(ids.raw())
    .execute(executor)
    .await
    .map_err(convert_error)?;
    Ok(())
}
