//! SQLite-backed passage index with brute-force cosine similarity search.

use grounded_core::{AppError, AppResult};
use rusqlite::{params, Connection};
use std::path::Path;

/// A passage as stored in the index.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPassage {
    pub id: String,
    pub document_name: String,
    pub page_number: u32,
    pub text: String,
}

fn index_err(context: &str, e: rusqlite::Error) -> AppError {
    AppError::Retrieval(format!("{}: {}", context, e))
}

/// Initialize the SQLite index database.
pub fn init_index(db_path: &Path) -> AppResult<Connection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(db_path).map_err(|e| index_err("Failed to open SQLite index", e))?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS passages (
            id TEXT PRIMARY KEY,
            document_name TEXT NOT NULL,
            page_number INTEGER NOT NULL,
            text TEXT NOT NULL,
            embedding BLOB NOT NULL,
            added_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_passages_document ON passages(document_name);
        "#,
    )
    .map_err(|e| index_err("Failed to create tables", e))?;

    tracing::debug!("Initialized SQLite index at {:?}", db_path);
    Ok(conn)
}

/// Insert a passage with its embedding.
pub fn insert_passage(
    conn: &Connection,
    passage: &StoredPassage,
    embedding: &[f32],
) -> AppResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO passages (id, document_name, page_number, text, embedding, added_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            passage.id,
            passage.document_name,
            passage.page_number as i64,
            passage.text,
            embedding_to_bytes(embedding),
            chrono::Utc::now().to_rfc3339(),
        ],
    )
    .map_err(|e| index_err("Failed to insert passage", e))?;

    Ok(())
}

/// Query the index for the top-k most similar passages, best first.
///
/// Rows whose stored embedding cannot be decoded are skipped.
pub fn query_passages(
    conn: &Connection,
    query_embedding: &[f32],
    top_k: usize,
) -> AppResult<Vec<(StoredPassage, f32)>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, document_name, page_number, text, embedding FROM passages ORDER BY rowid",
        )
        .map_err(|e| index_err("Failed to prepare query", e))?;

    let rows = stmt
        .query_map([], |row| {
            let passage = StoredPassage {
                id: row.get(0)?,
                document_name: row.get(1)?,
                page_number: row.get::<_, i64>(2)? as u32,
                text: row.get(3)?,
            };
            let embedding_bytes: Vec<u8> = row.get(4)?;
            Ok((passage, embedding_bytes))
        })
        .map_err(|e| index_err("Failed to query passages", e))?;

    let mut results: Vec<(StoredPassage, f32)> = rows
        .filter_map(|r| r.ok())
        .filter_map(|(passage, bytes)| {
            let embedding = bytes_to_embedding(&bytes)?;
            Some((passage, cosine_similarity(query_embedding, &embedding)))
        })
        .collect();

    results.sort_by(|a, b| b.1.total_cmp(&a.1));
    results.truncate(top_k);

    tracing::debug!(
        "Retrieved {} passages (requested top-{})",
        results.len(),
        top_k
    );

    Ok(results)
}

/// Count distinct documents and stored passages.
pub fn get_stats(conn: &Connection) -> AppResult<(u32, u32)> {
    let documents_count: u32 = conn
        .query_row(
            "SELECT COUNT(DISTINCT document_name) FROM passages",
            [],
            |row| row.get::<_, i64>(0).map(|v| v as u32),
        )
        .map_err(|e| index_err("Failed to count documents", e))?;

    let passages_count: u32 = conn
        .query_row("SELECT COUNT(*) FROM passages", [], |row| {
            row.get::<_, i64>(0).map(|v| v as u32)
        })
        .map_err(|e| index_err("Failed to count passages", e))?;

    Ok((documents_count, passages_count))
}

/// Reset the index (delete all passages).
pub fn reset_index(conn: &Connection) -> AppResult<()> {
    conn.execute("DELETE FROM passages", [])
        .map_err(|e| index_err("Failed to delete passages", e))?;

    tracing::info!("Reset knowledge base index");
    Ok(())
}

fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn bytes_to_embedding(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }

    Some(
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}

/// Calculate cosine similarity between two vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn passage(id: &str, doc: &str, text: &str) -> StoredPassage {
        StoredPassage {
            id: id.to_string(),
            document_name: doc.to_string(),
            page_number: 1,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_init_index() {
        let temp_file = NamedTempFile::new().unwrap();
        let conn = init_index(temp_file.path()).unwrap();

        let table_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='passages'",
                [],
                |row| row.get(0),
            )
            .unwrap();

        assert_eq!(table_count, 1);
    }

    #[test]
    fn test_insert_and_query() {
        let temp_file = NamedTempFile::new().unwrap();
        let conn = init_index(temp_file.path()).unwrap();

        insert_passage(&conn, &passage("p1", "a.pdf", "x axis"), &[1.0, 0.0, 0.0]).unwrap();
        insert_passage(&conn, &passage("p2", "a.pdf", "y axis"), &[0.0, 1.0, 0.0]).unwrap();
        insert_passage(&conn, &passage("p3", "b.pdf", "diagonal"), &[1.0, 1.0, 0.0]).unwrap();

        let results = query_passages(&conn, &[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0.id, "p1");
        assert!((results[0].1 - 1.0).abs() < 0.001);
        assert_eq!(results[1].0.id, "p3");
    }

    #[test]
    fn test_stats_and_reset() {
        let temp_file = NamedTempFile::new().unwrap();
        let conn = init_index(temp_file.path()).unwrap();

        insert_passage(&conn, &passage("p1", "a.pdf", "one"), &[1.0]).unwrap();
        insert_passage(&conn, &passage("p2", "a.pdf", "two"), &[1.0]).unwrap();
        insert_passage(&conn, &passage("p3", "b.pdf", "three"), &[1.0]).unwrap();
        assert_eq!(get_stats(&conn).unwrap(), (2, 3));

        reset_index(&conn).unwrap();
        assert_eq!(get_stats(&conn).unwrap(), (0, 0));
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 0.001);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 0.001);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_embedding_bytes_roundtrip_rejects_bad_length() {
        assert_eq!(bytes_to_embedding(&[0, 0, 0]), None);
        let bytes = embedding_to_bytes(&[0.5, -1.0]);
        assert_eq!(bytes_to_embedding(&bytes), Some(vec![0.5, -1.0]));
    }
}
