use async_trait::async_trait;
use mongodb::bson::{Bson, doc};
use mongodb::{Client, Collection};
use tracing::info;

use crate::config::Config;
use crate::error::Error;
use crate::ingest::adapters::{InsertAck, PoolSink};
use crate::protocols::raydium_amm::PoolDescriptor;

/// [`PoolSink`] writing one document per pool into a MongoDB collection.
pub struct MongoSink {
    collection: Collection<PoolDescriptor>,
}

impl MongoSink {
    pub fn new(collection: Collection<PoolDescriptor>) -> Self {
        Self { collection }
    }
}

/// Connect and ping the database. Callers treat failure as fatal.
pub async fn connect_database(config: &Config) -> Result<MongoSink, Error> {
    let uri = config
        .mongo_uri
        .as_deref()
        .ok_or_else(|| Error::Persistence {
            reason: "MONGO_URI is not set".into(),
        })?;

    let client = Client::with_uri_str(uri)
        .await
        .map_err(|e| Error::Persistence {
            reason: format!("connect failed: {e}"),
        })?;
    let db = client.database(&config.mongo_database);
    db.run_command(doc! { "ping": 1 })
        .await
        .map_err(|e| Error::Persistence {
            reason: format!("ping {} failed: {e}", config.mongo_database),
        })?;

    info!(
        database = %config.mongo_database,
        collection = %config.mongo_collection,
        "connected to MongoDB"
    );
    Ok(MongoSink::new(db.collection(&config.mongo_collection)))
}

#[async_trait]
impl PoolSink for MongoSink {
    async fn insert(&self, pool: &PoolDescriptor) -> Result<InsertAck, Error> {
        let result = self
            .collection
            .insert_one(pool)
            .await
            .map_err(|e| Error::Persistence {
                reason: format!("insert {}: {e}", pool.amm_id),
            })?;

        let inserted_id = match result.inserted_id {
            Bson::ObjectId(oid) => oid.to_hex(),
            other => other.to_string(),
        };
        Ok(InsertAck {
            acknowledged: true,
            inserted_id: Some(inserted_id),
        })
    }
}
