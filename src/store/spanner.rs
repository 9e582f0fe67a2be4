use anyhow::{Context, Result};
use async_trait::async_trait;
use gcloud_gax::grpc::Code;
use gcloud_googleapis::spanner::admin::database::v1::{
    CreateDatabaseRequest, GetDatabaseDdlRequest, GetDatabaseRequest, UpdateDatabaseDdlRequest,
};
use gcloud_googleapis::spanner::admin::instance::v1::{
    CreateInstanceRequest, GetInstanceRequest, Instance,
};
use gcloud_spanner::admin::client::Client as AdminClient;
use gcloud_spanner::admin::AdminClientConfig;
use gcloud_spanner::client::{Client, ClientConfig, Error as SpannerError};
use gcloud_spanner::mutation::insert_or_update;
use gcloud_spanner::statement::Statement;
use gcloud_spanner::value::CommitTimestamp;
use serde_json::Value as JsonValue;
use std::sync::Arc;

use super::{counter_value, KvStore};
use crate::config::SpannerConfig;

/// One row per stored document, keyed by the document name
const TABLE: &str = "booking_kv";
const COLUMNS: [&str; 3] = ["key", "value", "updated_at"];
const TABLE_DDL: &str = "CREATE TABLE booking_kv (\
    `key` STRING(64) NOT NULL, \
    `value` JSON NOT NULL, \
    updated_at TIMESTAMP NOT NULL OPTIONS (allow_commit_timestamp=true)\
) PRIMARY KEY (`key`)";
const SELECT_VALUE: &str = "SELECT `value` FROM booking_kv WHERE `key` = @key";

/// Shareable Spanner-backed store for use across async handlers
#[derive(Clone)]
pub struct SpannerStore {
    inner: Arc<Client>,
}

impl SpannerStore {
    /// Connect to Spanner, provisioning the instance, database and table first
    ///
    /// The gcloud-spanner library picks up `SPANNER_EMULATOR_HOST` from the
    /// environment and targets the emulator when it is set.
    pub async fn from_config(config: &SpannerConfig) -> Result<Self> {
        provision(config).await?;

        let database_path = config.database_path();

        if let Some(host) = &config.emulator_host {
            tracing::info!("Connecting to Spanner emulator at: {}", host);
        } else {
            tracing::info!("Connecting to production Spanner");
        }

        let client = Client::new(&database_path, ClientConfig::default())
            .await
            .context("Failed to create Spanner client")?;

        tracing::info!("Successfully connected to Spanner database: {}", database_path);

        Ok(Self {
            inner: Arc::new(client),
        })
    }
}

#[async_trait]
impl KvStore for SpannerStore {
    async fn get(&self, key: &str) -> Result<Option<JsonValue>> {
        let key = key.to_string();
        let mut statement = Statement::new(SELECT_VALUE);
        statement.add_param("key", &key);

        let mut tx = self.inner
            .single()
            .await
            .context("Failed to create read transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to query data from Spanner")?;

        if let Some(row) = result_set.next().await? {
            let raw: String = row.column_by_name("value")?;
            let value: JsonValue = serde_json::from_str(&raw)
                .with_context(|| format!("Failed to deserialize JSON stored under '{}'", key))?;

            tracing::debug!("Read key: {}", key);
            Ok(Some(value))
        } else {
            tracing::debug!("Key not found: {}", key);
            Ok(None)
        }
    }

    async fn set(&self, key: &str, value: JsonValue) -> Result<()> {
        let key = key.to_string();
        let raw = serde_json::to_string(&value)
            .context("Failed to serialize JSON data")?;

        let mutation = insert_or_update(
            TABLE,
            &COLUMNS,
            &[&key, &raw, &CommitTimestamp::new()],
        );

        self.inner
            .apply(vec![mutation])
            .await
            .with_context(|| format!("Failed to write '{}' to Spanner", key))?;

        tracing::debug!("Wrote key: {}", key);
        Ok(())
    }

    /// Runs the read and the write in one read-write transaction, which
    /// Spanner retries on abort, so two callers never see the same value
    ///
    /// A counter with no successor is left untouched and reported as an error.
    async fn fetch_and_increment(&self, key: &str, initial: u64) -> Result<u64> {
        let key = key.to_string();

        let result: Result<(_, (u64, Option<u64>)), SpannerError> = self.inner
            .read_write_transaction(|tx| {
                let key = key.clone();
                Box::pin(async move {
                    let current = {
                        let mut statement = Statement::new(SELECT_VALUE);
                        statement.add_param("key", &key);
                        let mut rows = tx.query(statement).await?;
                        match rows.next().await? {
                            Some(row) => {
                                let raw: String = row.column_by_name("value")?;
                                let stored = serde_json::from_str::<JsonValue>(&raw).ok();
                                counter_value(stored.as_ref(), initial)
                            }
                            None => initial,
                        }
                    };

                    let next = current.checked_add(1);
                    if let Some(next) = next {
                        tx.buffer_write(vec![insert_or_update(
                            TABLE,
                            &COLUMNS,
                            &[&key, &next.to_string(), &CommitTimestamp::new()],
                        )]);
                    }
                    Ok((current, next))
                })
            })
            .await;

        let (_, (current, next)) = result
            .with_context(|| format!("Failed to increment '{}' in Spanner", key))?;
        next.with_context(|| format!("Counter '{}' is exhausted at {}", key, current))?;

        tracing::debug!("Incremented key: {} (handed out {})", key, current);
        Ok(current)
    }

    /// Executes `SELECT 1` to confirm the session pool can reach the database
    async fn health_check(&self) -> Result<()> {
        let statement = Statement::new("SELECT 1");

        let mut tx = self.inner
            .single()
            .await
            .context("Failed to create health check transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to execute health check query")?;

        if result_set.next().await?.is_some() {
            tracing::debug!("Health check query succeeded");
            Ok(())
        } else {
            Err(anyhow::anyhow!("Health check query returned no results"))
        }
    }
}

/// Make sure the `booking_kv` table can be used
///
/// Against the emulator the instance is created on demand; in production it
/// must already exist. A missing database is created together with the
/// table, and an existing database gets the table added if it lacks one.
async fn provision(config: &SpannerConfig) -> Result<()> {
    let admin = AdminClient::new(AdminClientConfig::default())
        .await
        .context("Failed to create Spanner admin client")?;

    let project_path = format!("projects/{}", config.project);
    let instance_path = format!("{}/instances/{}", project_path, config.instance);
    let database_path = config.database_path();

    if config.emulator_host.is_some() {
        ensure_emulator_instance(&admin, config, &project_path, &instance_path).await?;
    }

    let lookup = GetDatabaseRequest {
        name: database_path.clone(),
    };
    match admin.database().get_database(lookup, None).await {
        Ok(_) => ensure_table(&admin, &database_path).await,
        Err(status) if status.code() == Code::NotFound => {
            create_database(&admin, config, &instance_path).await
        }
        Err(status) => Err(anyhow::anyhow!(
            "Failed to look up database {}: {}",
            database_path,
            status.message()
        )),
    }
}

async fn ensure_emulator_instance(
    admin: &AdminClient,
    config: &SpannerConfig,
    project_path: &str,
    instance_path: &str,
) -> Result<()> {
    let lookup = GetInstanceRequest {
        name: instance_path.to_string(),
        field_mask: None,
    };
    match admin.instance().get_instance(lookup, None).await {
        Ok(_) => return Ok(()),
        Err(status) if status.code() == Code::NotFound => {}
        Err(status) => {
            return Err(anyhow::anyhow!(
                "Failed to look up instance {}: {}",
                instance_path,
                status.message()
            ));
        }
    }

    tracing::info!("Creating emulator instance: {}", instance_path);
    let request = CreateInstanceRequest {
        parent: project_path.to_string(),
        instance_id: config.instance.clone(),
        instance: Some(Instance {
            name: instance_path.to_string(),
            config: format!("{}/instanceConfigs/emulator-config", project_path),
            display_name: format!("{} bookings", config.instance),
            node_count: 1,
            ..Default::default()
        }),
    };
    admin
        .instance()
        .create_instance(request, None)
        .await
        .context("Failed to start instance creation")?
        .wait(None)
        .await
        .context("Failed to create instance")?;
    Ok(())
}

async fn create_database(
    admin: &AdminClient,
    config: &SpannerConfig,
    instance_path: &str,
) -> Result<()> {
    tracing::info!("Creating database {} with table '{}'", config.database, TABLE);
    let request = CreateDatabaseRequest {
        parent: instance_path.to_string(),
        create_statement: format!("CREATE DATABASE `{}`", config.database),
        extra_statements: vec![TABLE_DDL.to_string()],
        encryption_config: None,
        database_dialect: 1, // GoogleSQL
        proto_descriptors: vec![],
    };
    admin
        .database()
        .create_database(request, None)
        .await
        .context("Failed to start database creation")?
        .wait(None)
        .await
        .context("Failed to create database")?;
    Ok(())
}

async fn ensure_table(admin: &AdminClient, database_path: &str) -> Result<()> {
    let ddl = admin
        .database()
        .get_database_ddl(
            GetDatabaseDdlRequest {
                database: database_path.to_string(),
            },
            None,
        )
        .await
        .context("Failed to read database schema")?
        .into_inner();

    let prefix = format!("CREATE TABLE {} ", TABLE);
    if ddl.statements.iter().any(|stmt| stmt.starts_with(&prefix)) {
        return Ok(());
    }

    tracing::info!("Adding table '{}' to {}", TABLE, database_path);
    let request = UpdateDatabaseDdlRequest {
        database: database_path.to_string(),
        statements: vec![TABLE_DDL.to_string()],
        operation_id: String::new(),
        proto_descriptors: vec![],
        throughput_mode: false,
    };
    admin
        .database()
        .update_database_ddl(request, None)
        .await
        .context("Failed to start table creation")?
        .wait(None)
        .await
        .context("Failed to create table")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn emulator_config(instance: &str) -> SpannerConfig {
        unsafe {
            std::env::set_var("SPANNER_EMULATOR_HOST", "localhost:9010");
        }

        SpannerConfig {
            emulator_host: Some("localhost:9010".to_string()),
            project: "test-project".to_string(),
            instance: instance.to_string(),
            database: format!("{}-db", instance),
        }
    }

    #[test]
    fn test_store_is_clonable_and_send_sync() {
        fn assert_clone<T: Clone>() {}
        fn assert_send_sync<T: Send + Sync>() {}
        assert_clone::<SpannerStore>();
        assert_send_sync::<SpannerStore>();
    }

    #[tokio::test]
    async fn test_store_creation_with_emulator() {
        let config = emulator_config("store-creation-test");

        // Fails when the emulator isn't running; the error must still carry context
        match SpannerStore::from_config(&config).await {
            Ok(_) => {}
            Err(e) => {
                let error_msg = e.to_string();
                assert!(
                    error_msg.starts_with("Failed to"),
                    "Error should have context: {}",
                    error_msg
                );
            }
        }
    }

    #[tokio::test]
    async fn test_set_get_and_increment() {
        let config = emulator_config("booking-kv-test");

        let Ok(store) = SpannerStore::from_config(&config).await else {
            println!("Spanner test skipped (emulator may not be running)");
            return;
        };

        let settings = json!({"welcomeMessage": "hi", "noticeMessage": "n", "afterSubmitNotice": "a"});
        store.set("settings", settings.clone()).await.unwrap();
        assert_eq!(store.get("settings").await.unwrap(), Some(settings));
        assert_eq!(store.get("never-written").await.unwrap(), None);

        store.set("nextOrderNumber", json!(10)).await.unwrap();
        assert_eq!(store.fetch_and_increment("nextOrderNumber", 1).await.unwrap(), 10);
        assert_eq!(store.fetch_and_increment("nextOrderNumber", 1).await.unwrap(), 11);
        assert_eq!(store.get("nextOrderNumber").await.unwrap(), Some(json!(12)));

        store.set("exhausted", json!(u64::MAX)).await.unwrap();
        assert!(store.fetch_and_increment("exhausted", 1).await.is_err());
        assert_eq!(store.get("exhausted").await.unwrap(), Some(json!(u64::MAX)));

        assert!(store.health_check().await.is_ok());
    }

    #[test]
    fn test_table_ddl_matches_columns() {
        for column in COLUMNS {
            assert!(TABLE_DDL.contains(column), "DDL lacks column {column}");
        }
        assert!(TABLE_DDL.starts_with(&format!("CREATE TABLE {} ", TABLE)));
    }
}
