use anyhow::{Context, Result};
use carwash_core::{Record, Value};
use carwash_store::{PostgresStore, Storage};
use sqlx::postgres::PgPoolOptions;
use std::env;

fn database_url() -> Result<String> {
    env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .context("set TEST_DATABASE_URL or DATABASE_URL for integration tests")
}

const FIXTURE: &[&str] = &[
    "drop schema if exists carwash_it cascade",
    "create schema carwash_it",
    "create table carwash_it.users (id bigint primary key, first_name text not null, age integer)",
    "insert into carwash_it.users values (1, 'George', 40), (2, 'Cosmo', 42), (3, 'Elaine', 35)",
];

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn pages_and_updates_through_postgres() -> Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(10))
        .connect(&database_url()?)
        .await
        .context("connecting to Postgres")?;
    for statement in FIXTURE {
        sqlx::query(statement).execute(&pool).await?;
    }

    let store = PostgresStore::new(pool);
    let tables = store.list_tables().await?;
    assert!(tables.contains(&"carwash_it.users".to_string()));

    let key = store.primary_key("carwash_it.users").await?;
    assert_eq!(key, "id");

    let first = store.page_records("carwash_it.users", &key, 2, None).await?;
    assert_eq!(first.records.len(), 2);
    let second = store
        .page_records("carwash_it.users", &key, 2, first.next.as_ref())
        .await?;
    assert_eq!(second.records.len(), 1);
    assert!(second.next.is_none());
    assert_eq!(second.records[0]["first_name"], Value::from("Elaine"));

    let fields: Record = [
        ("first_name".to_string(), Value::from("Foo")),
        ("age".to_string(), Value::Int(7)),
    ]
    .into_iter()
    .collect();
    store
        .update_record("carwash_it.users", &key, &Value::Int(1), &fields)
        .await?;

    let page = store.page_records("carwash_it.users", &key, 1, None).await?;
    assert_eq!(page.records[0]["first_name"], Value::from("Foo"));
    assert_eq!(page.records[0]["age"], Value::Int(7));
    Ok(())
}
