//! SQLite index backend built on the `sqlite-vec` extension.
//!
//! Unit rows live in a plain `units` table keyed by the rendered
//! [`UnitKey`](crate::types::UnitKey); their embeddings live in
//! `units_embeddings` as `vec_f32` blobs, joined by key for similarity
//! search. `INSERT OR REPLACE` on both tables makes re-ingestion of a
//! filing idempotent.

use std::mem::transmute;
use std::os::raw::c_char;
use std::path::Path;
use std::sync::Once;

use async_trait::async_trait;
use tokio_rusqlite::{Connection, ffi};
use tracing::instrument;

use super::{StoredUnit, VectorStore};
use crate::errors::IngestError;
use crate::types::ContentUnit;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS units (
    id TEXT PRIMARY KEY,
    filing INTEGER NOT NULL,
    item TEXT NOT NULL,
    ordinal INTEGER NOT NULL,
    content TEXT NOT NULL,
    metadata TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS units_filing_idx ON units(filing);
CREATE TABLE IF NOT EXISTS units_embeddings (
    id TEXT PRIMARY KEY,
    embedding BLOB NOT NULL
);
"#;

/// SQLite-backed [`VectorStore`].
#[derive(Clone)]
pub struct SqliteUnitStore {
    conn: Connection,
}

impl SqliteUnitStore {
    /// Open (or create) a store at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, IngestError> {
        Self::register_sqlite_vec()?;
        let conn = Connection::open(path)
            .await
            .map_err(IngestError::storage)?;
        Self::initialize(conn).await
    }

    /// Open an in-memory store; used by the test suite.
    pub async fn open_in_memory() -> Result<Self, IngestError> {
        Self::register_sqlite_vec()?;
        let conn = Connection::open_in_memory()
            .await
            .map_err(IngestError::storage)?;
        Self::initialize(conn).await
    }

    async fn initialize(conn: Connection) -> Result<Self, IngestError> {
        conn.call(|conn| {
            // Fails loudly if the vec extension did not register.
            conn.query_row("SELECT vec_version()", [], |row| row.get::<_, String>(0))
                .map_err(tokio_rusqlite::Error::Rusqlite)?;
            conn.execute_batch(SCHEMA)
                .map_err(tokio_rusqlite::Error::Rusqlite)?;
            Ok(())
        })
        .await
        .map_err(IngestError::storage)?;
        Ok(Self { conn })
    }

    fn register_sqlite_vec() -> Result<(), IngestError> {
        use std::sync::Mutex;

        static INIT: Once = Once::new();
        static INIT_RESULT: Mutex<Option<Result<(), String>>> = Mutex::new(None);

        INIT.call_once(|| {
            let result = unsafe {
                type SqliteExtensionInit = unsafe extern "C" fn(
                    *mut ffi::sqlite3,
                    *mut *mut c_char,
                    *const ffi::sqlite3_api_routines,
                ) -> i32;

                let init: unsafe extern "C" fn() = sqlite_vec::sqlite3_vec_init;
                let init_fn: SqliteExtensionInit =
                    transmute::<unsafe extern "C" fn(), SqliteExtensionInit>(init);
                let rc = ffi::sqlite3_auto_extension(Some(init_fn));
                if rc != 0 {
                    Err(format!(
                        "failed to register sqlite-vec extension (code {rc})"
                    ))
                } else {
                    Ok(())
                }
            };
            *INIT_RESULT.lock().expect("init result mutex poisoned") = Some(result);
        });

        INIT_RESULT
            .lock()
            .expect("init result mutex poisoned")
            .clone()
            .expect("init was called but result not set")
            .map_err(|message| IngestError::Storage { message })
    }
}

#[async_trait]
impl VectorStore for SqliteUnitStore {
    #[instrument(skip(self, units), fields(batch = units.len()))]
    async fn upsert_units(
        &self,
        units: Vec<(ContentUnit, Vec<f32>)>,
    ) -> Result<(), IngestError> {
        if units.is_empty() {
            return Ok(());
        }

        let rows: Vec<(String, i64, String, i64, String, String, String)> = units
            .into_iter()
            .map(|(unit, embedding)| {
                let embedding_json = serde_json::to_string(&embedding)
                    .map_err(IngestError::storage)?;
                let metadata = unit.metadata().to_string();
                Ok((
                    unit.key.to_string(),
                    unit.filing.0,
                    unit.item,
                    unit.key.ordinal as i64,
                    unit.body,
                    metadata,
                    embedding_json,
                ))
            })
            .collect::<Result<_, IngestError>>()?;

        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(tokio_rusqlite::Error::Rusqlite)?;
                for (id, filing, item, ordinal, content, metadata, embedding_json) in &rows {
                    tx.execute(
                        "INSERT OR REPLACE INTO units (id, filing, item, ordinal, content, metadata) \
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                        (id, filing, item, ordinal, content, metadata),
                    )
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                    tx.execute(
                        "INSERT OR REPLACE INTO units_embeddings (id, embedding) \
                         VALUES (?1, vec_f32(?2))",
                        (id, embedding_json),
                    )
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                }
                tx.commit().map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(())
            })
            .await
            .map_err(IngestError::storage)
    }

    async fn count(&self) -> Result<usize, IngestError> {
        self.conn
            .call(|conn| {
                let count: i64 = conn
                    .query_row("SELECT COUNT(*) FROM units", [], |row| row.get(0))
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(count as usize)
            })
            .await
            .map_err(IngestError::storage)
    }

    async fn units_for_filing(&self, filing: i64) -> Result<Vec<StoredUnit>, IngestError> {
        let rows: Vec<(String, i64, String, i64, String, String)> = self
            .conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(
                        "SELECT id, filing, item, ordinal, content, metadata \
                         FROM units WHERE filing = ?1 ORDER BY ordinal",
                    )
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;

                let rows = stmt
                    .query_map([filing], |row| {
                        Ok((
                            row.get(0)?,
                            row.get(1)?,
                            row.get(2)?,
                            row.get(3)?,
                            row.get(4)?,
                            row.get(5)?,
                        ))
                    })
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;

                let mut results = Vec::new();
                for row in rows {
                    results.push(row.map_err(tokio_rusqlite::Error::Rusqlite)?);
                }
                Ok(results)
            })
            .await
            .map_err(IngestError::storage)?;

        rows.into_iter()
            .map(|(id, filing, item, ordinal, content, metadata)| {
                parse_metadata(&id, &metadata).map(|metadata| StoredUnit {
                    id,
                    filing,
                    item,
                    ordinal: ordinal as usize,
                    content,
                    metadata,
                })
            })
            .collect()
    }

    async fn search_similar(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<(StoredUnit, f32)>, IngestError> {
        let embedding_json =
            serde_json::to_string(query_embedding).map_err(IngestError::storage)?;
        let limit = top_k as i64;

        let rows: Vec<(String, i64, String, i64, String, String, f32)> = self
            .conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(
                        "SELECT u.id, u.filing, u.item, u.ordinal, u.content, u.metadata, \
                         vec_distance_cosine(e.embedding, vec_f32(?1)) AS distance \
                         FROM units u \
                         JOIN units_embeddings e ON u.id = e.id \
                         ORDER BY distance ASC \
                         LIMIT ?2",
                    )
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;

                let rows = stmt
                    .query_map((&embedding_json, limit), |row| {
                        Ok((
                            row.get(0)?,
                            row.get(1)?,
                            row.get(2)?,
                            row.get(3)?,
                            row.get(4)?,
                            row.get(5)?,
                            row.get(6)?,
                        ))
                    })
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;

                let mut results = Vec::new();
                for row in rows {
                    results.push(row.map_err(tokio_rusqlite::Error::Rusqlite)?);
                }
                Ok(results)
            })
            .await
            .map_err(IngestError::storage)?;

        rows.into_iter()
            .map(|(id, filing, item, ordinal, content, metadata, distance)| {
                parse_metadata(&id, &metadata).map(|metadata| {
                    (
                        StoredUnit {
                            id,
                            filing,
                            item,
                            ordinal: ordinal as usize,
                            content,
                            metadata,
                        },
                        1.0 - distance,
                    )
                })
            })
            .collect()
    }
}

fn parse_metadata(id: &str, raw: &str) -> Result<serde_json::Value, IngestError> {
    serde_json::from_str(raw).map_err(|err| IngestError::Storage {
        message: format!("corrupt metadata for unit {id}: {err}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{EmbeddingProvider, MockEmbeddingProvider};
    use crate::types::{FilingId, UnitKey, VectorId};

    fn unit(filing: i64, vector: i64, ordinal: usize, body: &str) -> ContentUnit {
        ContentUnit {
            key: UnitKey {
                vector: VectorId(vector),
                ordinal,
            },
            filing: FilingId(filing),
            ticker: "ACME".into(),
            doc_type: "8-K".into(),
            item: "1-1".into(),
            year: 2023,
            link: "https://example.com/f".into(),
            txt: "https://example.com/f.txt".into(),
            keywords: vec!["agreement".into()],
            body: body.into(),
        }
    }

    async fn embedded(provider: &MockEmbeddingProvider, unit: &ContentUnit) -> Vec<f32> {
        provider
            .embed_batch(std::slice::from_ref(&unit.body))
            .await
            .unwrap()
            .remove(0)
    }

    #[tokio::test]
    async fn upsert_and_read_back_by_filing() {
        let store = SqliteUnitStore::open_in_memory().await.unwrap();
        let provider = MockEmbeddingProvider::with_dims(8);

        let a = unit(1, 10, 0, "Material agreement signed");
        let b = unit(1, 10, 1, "with a counterparty in April");
        let other = unit(2, 11, 0, "Financial statements attached");

        let batch = vec![
            (a.clone(), embedded(&provider, &a).await),
            (b.clone(), embedded(&provider, &b).await),
            (other.clone(), embedded(&provider, &other).await),
        ];
        store.upsert_units(batch).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 3);

        let filed = store.units_for_filing(1).await.unwrap();
        assert_eq!(filed.len(), 2);
        assert_eq!(filed[0].id, "v10-0");
        assert_eq!(filed[1].id, "v10-1");
        assert_eq!(filed[0].content, "Material agreement signed");
        assert_eq!(filed[0].metadata["ticker"], "ACME");
    }

    #[tokio::test]
    async fn reingestion_replaces_rows_instead_of_duplicating() {
        let store = SqliteUnitStore::open_in_memory().await.unwrap();
        let provider = MockEmbeddingProvider::with_dims(8);

        let first = unit(1, 10, 0, "original text");
        let replacement = unit(1, 10, 0, "revised text");

        store
            .upsert_units(vec![(first.clone(), embedded(&provider, &first).await)])
            .await
            .unwrap();
        store
            .upsert_units(vec![(
                replacement.clone(),
                embedded(&provider, &replacement).await,
            )])
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let filed = store.units_for_filing(1).await.unwrap();
        assert_eq!(filed[0].content, "revised text");
    }

    #[tokio::test]
    async fn similarity_search_prefers_the_matching_unit() {
        let store = SqliteUnitStore::open_in_memory().await.unwrap();
        let provider = MockEmbeddingProvider::with_dims(8);

        let a = unit(1, 10, 0, "Material definitive agreement with supplier");
        let b = unit(1, 10, 1, "Departure of chief financial officer");

        let a_vec = embedded(&provider, &a).await;
        store
            .upsert_units(vec![
                (a.clone(), a_vec.clone()),
                (b.clone(), embedded(&provider, &b).await),
            ])
            .await
            .unwrap();

        let hits = store.search_similar(&a_vec, 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0.id, "v10-0");
        assert!(hits[0].1 >= hits[1].1);

        // The result window is bounded by the requested size.
        let hits = store.search_similar(&a_vec, 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0.id, "v10-0");
    }

    #[tokio::test]
    async fn corrupt_metadata_surfaces_as_an_error() {
        let store = SqliteUnitStore::open_in_memory().await.unwrap();
        store
            .conn
            .call(|conn| {
                conn.execute(
                    "INSERT INTO units (id, filing, item, ordinal, content, metadata) \
                     VALUES ('v1-0', 1, '1-1', 0, 'text', 'not json')",
                    [],
                )
                .map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(())
            })
            .await
            .unwrap();

        let err = store.units_for_filing(1).await.unwrap_err();
        match err {
            IngestError::Storage { message } => assert!(message.contains("v1-0")),
            other => panic!("expected Storage, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_upsert_is_a_no_op() {
        let store = SqliteUnitStore::open_in_memory().await.unwrap();
        store.upsert_units(Vec::new()).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
