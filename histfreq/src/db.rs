use crate::domain::{DbConfig, HistoryRow, QueryFilter};
use crate::error::{Error, Result};
use rusqlite::{Connection, OpenFlags, params_from_iter};
use tracing::debug;

const REQUIRED_COLUMNS: [&str; 5] = ["command", "timestamp", "deleted_at", "cwd", "session"];

/// Open the history store read-only. The file is never created or migrated.
pub fn open_store(cfg: &DbConfig) -> Result<Connection> {
    debug!(path = %cfg.path.display(), "opening history store");
    let conn = Connection::open_with_flags(
        &cfg.path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|source| Error::StoreOpen {
        path: cfg.path.clone(),
        source,
    })?;
    check_schema(&conn, cfg)?;
    Ok(conn)
}

fn check_schema(conn: &Connection, cfg: &DbConfig) -> Result<()> {
    let store_err = |source| Error::StoreOpen {
        path: cfg.path.clone(),
        source,
    };

    // A non-database file only fails here, on first read.
    let mut stmt = conn
        .prepare("SELECT name FROM pragma_table_info('history')")
        .map_err(store_err)?;
    let columns = stmt
        .query_map([], |r| r.get::<_, String>(0))
        .map_err(store_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(store_err)?;

    if columns.is_empty() {
        return Err(Error::InvalidSchema {
            path: cfg.path.clone(),
            detail: "no history table".to_string(),
        });
    }

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|want| !columns.iter().any(|c| c == *want))
        .collect();
    if !missing.is_empty() {
        return Err(Error::InvalidSchema {
            path: cfg.path.clone(),
            detail: format!("history table lacks column(s) {}", missing.join(", ")),
        });
    }

    Ok(())
}

/// Build the SELECT and its bind values. Values are only ever bound.
pub fn build_history_query(filter: &QueryFilter) -> (String, Vec<String>) {
    let mut bind: Vec<String> = vec![];
    let mut sql = String::from("SELECT command, timestamp, deleted_at FROM history WHERE 1=1 ");

    if !filter.include_deleted {
        sql.push_str("AND deleted_at IS NULL ");
    }

    if let Some(cwd) = &filter.cwd {
        sql.push_str("AND cwd = ? ");
        bind.push(cwd.clone());
    }

    if let Some(session) = &filter.session {
        sql.push_str("AND session = ? ");
        bind.push(session.clone());
    }

    (sql, bind)
}

/// Run the filtered query and hand every row to `on_row` along with its
/// 1-based position. The first error from the store or the callback stops
/// the scan.
pub fn scan_history<F>(conn: &Connection, filter: &QueryFilter, mut on_row: F) -> Result<u64>
where
    F: FnMut(HistoryRow, u64) -> Result<()>,
{
    let (sql, bind) = build_history_query(filter);
    debug!(sql = %sql, binds = bind.len(), "querying history");

    let mut stmt = conn.prepare(&sql).map_err(Error::Query)?;
    let mut rows = stmt
        .query(params_from_iter(bind.iter()))
        .map_err(Error::Query)?;

    let mut seen: u64 = 0;
    while let Some(r) = rows.next().map_err(Error::RowIteration)? {
        seen += 1;
        let scan_err = |source| Error::RowScan { row: seen, source };
        let row = HistoryRow {
            command: r.get(0).map_err(scan_err)?,
            timestamp: r.get(1).map_err(scan_err)?,
            deleted_at: r.get(2).map_err(scan_err)?,
        };
        on_row(row, seen)?;
    }

    debug!(rows = seen, "history scan complete");
    Ok(seen)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rusqlite::params;
    use std::path::Path;
    use tempfile::TempDir;

    /// Create an atuin-shaped store at `path`.
    pub(crate) fn create_store(path: &Path) -> Connection {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE history (
              id TEXT PRIMARY KEY,
              timestamp INTEGER NOT NULL,
              duration INTEGER NOT NULL,
              exit INTEGER NOT NULL,
              command TEXT NOT NULL,
              cwd TEXT NOT NULL,
              session TEXT NOT NULL,
              hostname TEXT NOT NULL,
              deleted_at INTEGER
            );
            "#,
        )
        .unwrap();
        conn
    }

    pub(crate) fn insert(
        conn: &Connection,
        command: &str,
        timestamp: i64,
        cwd: &str,
        session: &str,
        deleted_at: Option<i64>,
    ) {
        let id: i64 = conn
            .query_row("SELECT count(*) FROM history", [], |r| r.get(0))
            .unwrap();
        conn.execute(
            r#"
            INSERT INTO history(id, timestamp, duration, exit, command, cwd, session, hostname, deleted_at)
            VALUES (?1, ?2, 0, 0, ?3, ?4, ?5, 'host', ?6)
            "#,
            params![id.to_string(), timestamp, command, cwd, session, deleted_at],
        )
        .unwrap();
    }

    fn collect(conn: &Connection, filter: &QueryFilter) -> Vec<HistoryRow> {
        let mut out = vec![];
        scan_history(conn, filter, |row, _| {
            out.push(row);
            Ok(())
        })
        .unwrap();
        out
    }

    #[test]
    fn query_without_filters_excludes_deleted_only() {
        let (sql, bind) = build_history_query(&QueryFilter::default());
        assert!(sql.contains("deleted_at IS NULL"));
        assert!(!sql.contains("cwd"));
        assert!(bind.is_empty());
    }

    #[test]
    fn query_binds_filters_in_order() {
        let filter = QueryFilter {
            include_deleted: true,
            cwd: Some("/tmp'; DROP TABLE history; --".to_string()),
            session: Some("abc".to_string()),
        };
        let (sql, bind) = build_history_query(&filter);
        assert!(!sql.contains("deleted_at IS NULL"));
        assert!(!sql.contains("DROP"));
        assert!(sql.find("cwd = ?").unwrap() < sql.find("session = ?").unwrap());
        assert_eq!(bind, vec!["/tmp'; DROP TABLE history; --", "abc"]);
    }

    #[test]
    fn scan_applies_filters() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("history.db");
        let conn = create_store(&path);
        insert(&conn, "ls", 100, "/a", "s1", None);
        insert(&conn, "rm x", 110, "/a", "s1", Some(120));
        insert(&conn, "pwd", 130, "/b", "s1", None);
        insert(&conn, "top", 140, "/a", "s2", None);
        drop(conn);

        let conn = open_store(&DbConfig { path }).unwrap();

        let all = collect(&conn, &QueryFilter::default());
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|r| r.deleted_at.is_none()));

        let with_deleted = collect(
            &conn,
            &QueryFilter {
                include_deleted: true,
                ..Default::default()
            },
        );
        assert_eq!(with_deleted.len(), 4);

        let here = collect(
            &conn,
            &QueryFilter {
                cwd: Some("/a".to_string()),
                session: Some("s1".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(
            here,
            vec![HistoryRow {
                command: "ls".to_string(),
                timestamp: 100,
                deleted_at: None
            }]
        );
    }

    #[test]
    fn missing_file_is_store_open_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nope.db");
        let err = open_store(&DbConfig { path: path.clone() }).unwrap_err();
        assert!(matches!(err, Error::StoreOpen { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn non_database_file_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("garbage.db");
        std::fs::write(&path, "not sqlite\n".repeat(1024)).unwrap();
        let err = open_store(&DbConfig { path }).unwrap_err();
        assert!(matches!(
            err,
            Error::StoreOpen { .. } | Error::InvalidSchema { .. }
        ));
    }

    #[test]
    fn missing_history_table_is_invalid_schema() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("other.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE notes (body TEXT);")
            .unwrap();
        let err = open_store(&DbConfig { path }).unwrap_err();
        assert!(matches!(err, Error::InvalidSchema { .. }));
    }

    #[test]
    fn missing_column_is_named() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("old.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE history (command TEXT, timestamp INTEGER, deleted_at INTEGER);")
            .unwrap();
        let err = open_store(&DbConfig { path }).unwrap_err();
        assert!(err.to_string().contains("cwd, session"));
    }

    #[test]
    fn null_command_is_row_scan_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("loose.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch(
                r#"
                CREATE TABLE history (command TEXT, timestamp INTEGER, deleted_at INTEGER, cwd TEXT, session TEXT);
                INSERT INTO history VALUES ('ls', 1, NULL, '/', 's');
                INSERT INTO history VALUES (NULL, 2, NULL, '/', 's');
                "#,
            )
            .unwrap();
        let conn = open_store(&DbConfig { path }).unwrap();
        let err = scan_history(&conn, &QueryFilter::default(), |_, _| Ok(())).unwrap_err();
        assert!(matches!(err, Error::RowScan { row: 2, .. }));
    }

    #[test]
    fn corrupt_table_page_is_row_iteration_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("corrupt.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                r#"
                PRAGMA page_size = 1024;
                CREATE TABLE history (command TEXT, timestamp INTEGER, deleted_at INTEGER, cwd TEXT, session TEXT);
                "#,
            )
            .unwrap();
            for i in 0..200 {
                conn.execute(
                    "INSERT INTO history VALUES (?1, ?2, NULL, '/', 's')",
                    params![format!("echo {i} {}", "x".repeat(64)), i],
                )
                .unwrap();
            }
        }

        // Page 1 holds the schema; the table b-tree starts at page 2.
        let mut bytes = std::fs::read(&path).unwrap();
        assert!(bytes.len() > 4 * 1024);
        bytes[1024..].fill(0xff);
        std::fs::write(&path, bytes).unwrap();

        let conn = open_store(&DbConfig { path }).unwrap();
        let err = scan_history(&conn, &QueryFilter::default(), |_, _| Ok(())).unwrap_err();
        assert!(matches!(err, Error::RowIteration(_)));
    }
}
