//! The result store (spec §4.5): a content-addressed mixed store over a
//! relational database plus the `crashfiles/`, `crashdata/`, `templates/`
//! directories.

use std::path::{Path, PathBuf};

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};

use fathom_core::DeliveryStatus;

use crate::error::Result;
use crate::files;
use crate::interner::id_for_string;
use crate::schema::MIGRATIONS;

/// Outcome of [`Store::insert_result`]: the `db_id` a producer sees in
/// its second `ack_msg` (spec §8 scenario S1), plus the crash row id
/// when the result was a crash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertedResult {
    pub result_id: String,
    pub crash_id: Option<String>,
}

pub struct Store {
    pool: SqlitePool,
    root: PathBuf,
}

impl Store {
    pub async fn open(database_url: &str, root: impl Into<PathBuf>) -> Result<Self> {
        let pool = SqlitePool::connect(database_url).await?;
        for stmt in MIGRATIONS {
            sqlx::query(stmt).execute(&pool).await?;
        }
        Ok(Self { pool, root: root.into() })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn module_id_for(
        tx: &mut Transaction<'_, Sqlite>,
        name: &str,
        checksum: &str,
        size: Option<&str>,
        timestamp: Option<&str>,
        version: Option<&str>,
    ) -> Result<i64> {
        sqlx::query(
            "INSERT INTO modules (name, checksum, size, timestamp, version) VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(name, checksum) DO NOTHING",
        )
        .bind(name)
        .bind(checksum)
        .bind(size)
        .bind(timestamp)
        .bind(version)
        .execute(&mut *tx)
        .await?;

        let row: (i64,) = sqlx::query_as("SELECT id FROM modules WHERE name = ? AND checksum = ?")
            .bind(name)
            .bind(checksum)
            .fetch_one(&mut *tx)
            .await?;
        Ok(row.0)
    }

    /// Insert one result, transactionally (spec §4.5): allocate
    /// `result_id`; if `status` is crash, also allocate `crash_id`,
    /// intern its string fields, insert modules/frames/registers/
    /// disassembly, and write the two raw files. A file-write failure
    /// rolls back the whole transaction.
    pub async fn insert_result(
        &self,
        test_case_id: &str,
        status: DeliveryStatus,
        payload: &[u8],
        raw_debug_detail: Option<&str>,
    ) -> Result<InsertedResult> {
        let mut tx = self.pool.begin().await?;
        let result_id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let result_string_id = id_for_string(&mut tx, "result_strings", status.as_str()).await?;
        sqlx::query(
            "INSERT INTO results (id, test_case_id, result_string_id, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&result_id)
        .bind(test_case_id)
        .bind(result_string_id)
        .bind(&now)
        .execute(&mut tx)
        .await?;

        let crash_id = if status == DeliveryStatus::Crash {
            let detail = raw_debug_detail.unwrap_or_default();
            let crash_id = uuid::Uuid::new_v4().to_string();

            let hash_string_id = id_for_string(&mut tx, "hash_strings", &fathom_crashparse::hash(detail)).await?;
            let desc_id = id_for_string(&mut tx, "descs", &fathom_crashparse::long_desc(detail)).await?;
            let exception_type_id =
                id_for_string(&mut tx, "exception_types", &fathom_crashparse::exception_type(detail)).await?;
            let exception_subtype_id = id_for_string(
                &mut tx,
                "exception_subtypes",
                &fathom_crashparse::exception_subtype(detail),
            )
            .await?;
            let classification_id =
                id_for_string(&mut tx, "classifications", &fathom_crashparse::classification(detail)).await?;

            let crashfile_path = files::crashfile_path(&self.root, &crash_id);
            let crashdata_path = files::crashdata_path(&self.root, &crash_id);

            sqlx::query(
                "INSERT INTO crashes
                 (id, result_id, timestamp, hash_string_id, desc_id, exception_type_id,
                  exception_subtype_id, classification_id, template_id, raw_crash_path, raw_debug_path)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, NULL, ?, ?)",
            )
            .bind(&crash_id)
            .bind(&result_id)
            .bind(&now)
            .bind(hash_string_id)
            .bind(desc_id)
            .bind(exception_type_id)
            .bind(exception_subtype_id)
            .bind(classification_id)
            .bind(crashfile_path.display().to_string())
            .bind(crashdata_path.display().to_string())
            .execute(&mut tx)
            .await?;

            let stacktrace_id: (i64,) = {
                let result = sqlx::query("INSERT INTO stacktraces (crash_id) VALUES (?)")
                    .bind(&crash_id)
                    .execute(&mut tx)
                    .await?;
                (result.last_insert_rowid(),)
            };

            for (index, raw) in fathom_crashparse::stack_trace(detail) {
                let frame = fathom_crashparse::parse_stack_frame(index, &raw);
                let module_id = match &frame.module {
                    Some(name) => Some(Self::module_id_for(&mut tx, name, "", None, None, None).await?),
                    None => None,
                };
                let function_id = match &frame.func_name {
                    Some(name) => Some(id_for_string(&mut tx, "functions", name).await?),
                    None => None,
                };
                sqlx::query(
                    "INSERT INTO stackframes (stacktrace_id, frame_index, module_id, function_id, offset, raw)
                     VALUES (?, ?, ?, ?, ?, ?)",
                )
                .bind(stacktrace_id.0)
                .bind(index as i64)
                .bind(module_id)
                .bind(function_id)
                .bind(frame.offset.as_deref())
                .bind(&frame.raw)
                .execute(&mut tx)
                .await?;
            }

            for (base_address, module) in fathom_crashparse::loaded_modules(detail) {
                let name = module.name.clone().unwrap_or_default();
                let checksum = module.checksum.clone().unwrap_or_default();
                let module_id = Self::module_id_for(
                    &mut tx,
                    &name,
                    &checksum,
                    module.size.as_deref(),
                    module.timestamp.as_deref(),
                    module.version.as_deref(),
                )
                .await?;
                sqlx::query(
                    "INSERT INTO loaded_modules (crash_id, module_id, base_address, syms_loaded) VALUES (?, ?, ?, ?)",
                )
                .bind(&crash_id)
                .bind(module_id)
                .bind(&base_address)
                .bind(module.syms_loaded)
                .execute(&mut tx)
                .await?;
            }

            for (name, value) in fathom_crashparse::registers(detail) {
                sqlx::query("INSERT INTO register_dumps (crash_id, name, value) VALUES (?, ?, ?)")
                    .bind(&crash_id)
                    .bind(&name)
                    .bind(value as i64)
                    .execute(&mut tx)
                    .await?;
            }

            for (index, text) in fathom_crashparse::disassembly(detail) {
                sqlx::query("INSERT INTO disasm (crash_id, instr_index, text) VALUES (?, ?, ?)")
                    .bind(&crash_id)
                    .bind(index as i64)
                    .bind(&text)
                    .execute(&mut tx)
                    .await?;
            }

            files::write_crashfile(&self.root, &crash_id, payload)?;
            files::write_crashdata(&self.root, &crash_id, detail)?;

            Some(crash_id)
        } else {
            None
        };

        tx.commit().await?;
        Ok(InsertedResult { result_id, crash_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_store() -> (Store, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open("sqlite::memory:", dir.path()).await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn scenario_s1_success_result_has_no_crash_row() {
        let (store, _dir) = open_store().await;
        let inserted = store
            .insert_result("1", DeliveryStatus::Success, b"\x00\x01", None)
            .await
            .unwrap();
        assert!(inserted.crash_id.is_none());
        assert!(!inserted.result_id.is_empty());
    }

    #[tokio::test]
    async fn scenario_s2_crash_writes_files_and_hash() {
        let (store, dir) = open_store().await;
        let detail = "EXCEPTION_TYPE:X\nMAJOR_HASH:a\nMINOR_HASH:b\n";
        let inserted = store
            .insert_result("1", DeliveryStatus::Crash, b"\x00\x01", Some(detail))
            .await
            .unwrap();
        let crash_id = inserted.crash_id.unwrap();

        let crashfile = files::crashfile_path(dir.path(), &crash_id);
        let crashdata = files::crashdata_path(dir.path(), &crash_id);
        assert_eq!(std::fs::read(&crashfile).unwrap(), vec![0, 1]);
        assert_eq!(std::fs::read_to_string(&crashdata).unwrap(), detail);

        let row: (String,) = sqlx::query_as(
            "SELECT hs.value FROM crashes c JOIN hash_strings hs ON hs.id = c.hash_string_id
             WHERE c.id = ?",
        )
        .bind(&crash_id)
        .fetch_one(&store.pool)
        .await
        .unwrap();
        assert_eq!(row.0, "a.b");
    }
}
