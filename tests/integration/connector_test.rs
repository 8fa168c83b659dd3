//! Connector integration tests against on-disk SQLite databases.

use super::common::{open_scratch, scratch_dir, seed_numbers, DB_FILE};
use pretty_assertions::assert_eq;
use sql_connector::{Connector, ErrorKind, ExecuteOutcome, SpecResolver, Value};

#[tokio::test]
async fn test_relative_locator_resolves_against_base_dir() {
    let dir = scratch_dir();
    let spec = SpecResolver::new(dir.path())
        .resolve("sqlite", DB_FILE)
        .unwrap();

    assert_eq!(spec.locator(), dir.path().join(DB_FILE).to_string_lossy());

    let mut connector = Connector::open(spec).unwrap();
    let outcome = connector.execute("SELECT 1").await.unwrap();
    assert_eq!(outcome.headers(), Some(&["1".to_string()][..]));
    connector.close().await.unwrap();
}

#[tokio::test]
async fn test_missing_file_fails_before_any_session() {
    let dir = tempfile::tempdir().unwrap();
    let err = SpecResolver::new(dir.path())
        .resolve("sqlite", "nowhere.sqlite")
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Connection);
    assert!(!dir.path().join("nowhere.sqlite").exists());
}

#[tokio::test]
async fn test_syntax_error_then_fresh_connector() {
    let dir = scratch_dir();

    let mut broken = open_scratch(&dir);
    let err = broken.execute("SELEC 1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::QuerySyntax);
    assert_eq!(err.user_hint(), "Error! Try to check your sql query.");
    assert!(broken.headers().is_none());
    broken.close().await.unwrap();

    let mut fresh = open_scratch(&dir);
    fresh.execute("SELECT 1").await.unwrap();
    assert_eq!(
        fresh.fetch_page(10).await.unwrap(),
        vec![vec![Value::Int(1)]]
    );
    fresh.close().await.unwrap();
}

#[tokio::test]
async fn test_connector_usable_after_failed_statement() {
    let dir = scratch_dir();
    let mut connector = open_scratch(&dir);

    let err = connector.execute("SELECT * FROM missing_table").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::QuerySyntax);
    assert!(err.message().starts_with('N'), "got: {}", err.message());

    connector.execute("SELECT 2").await.unwrap();
    assert_eq!(
        connector.fetch_page(1).await.unwrap(),
        vec![vec![Value::Int(2)]]
    );
    connector.close().await.unwrap();
}

#[tokio::test]
async fn test_ddl_reports_no_result_set() {
    let dir = scratch_dir();
    let mut connector = open_scratch(&dir);

    let outcome = connector.execute("CREATE TABLE t(x INT)").await.unwrap();
    assert_eq!(outcome, ExecuteOutcome::NoResultSet { rows_affected: 0 });
    assert!(connector.headers().is_none());

    let outcome = connector
        .execute("INSERT INTO t VALUES (1), (2), (3)")
        .await
        .unwrap();
    assert_eq!(outcome, ExecuteOutcome::NoResultSet { rows_affected: 3 });

    connector.close().await.unwrap();
}

#[tokio::test]
async fn test_empty_result_keeps_headers() {
    let dir = scratch_dir();
    let mut connector = open_scratch(&dir);
    seed_numbers(&mut connector, 0).await;

    let outcome = connector.execute("SELECT x AS value FROM t").await.unwrap();
    assert_eq!(outcome.headers(), Some(&["value".to_string()][..]));
    assert!(connector.fetch_page(10).await.unwrap().is_empty());

    connector.close().await.unwrap();
}

#[tokio::test]
async fn test_fetch_pages_until_exhausted() {
    let dir = scratch_dir();
    let mut connector = open_scratch(&dir);
    seed_numbers(&mut connector, 7).await;

    connector.execute("SELECT x FROM t ORDER BY x").await.unwrap();

    let first = connector.fetch_page(3).await.unwrap();
    let second = connector.fetch_page(3).await.unwrap();
    let third = connector.fetch_page(3).await.unwrap();
    assert_eq!(first.len(), 3);
    assert_eq!(second.len(), 3);
    assert_eq!(third, vec![vec![Value::Int(7)]]);

    // Cursor order is preserved across pages.
    let seen: Vec<Value> = first
        .iter()
        .chain(&second)
        .chain(&third)
        .map(|row| row[0].clone())
        .collect();
    let expected: Vec<Value> = (1..=7).map(Value::Int).collect();
    assert_eq!(seen, expected);

    // Exhaustion is sticky.
    assert!(connector.fetch_page(3).await.unwrap().is_empty());
    assert!(connector.fetch_page(3).await.unwrap().is_empty());

    connector.close().await.unwrap();
}

#[tokio::test]
async fn test_exact_page_boundary_needs_one_more_fetch() {
    let dir = scratch_dir();
    let mut connector = open_scratch(&dir);
    seed_numbers(&mut connector, 4).await;

    connector.execute("SELECT x FROM t").await.unwrap();
    assert_eq!(connector.fetch_page(4).await.unwrap().len(), 4);
    assert!(connector.fetch_page(4).await.unwrap().is_empty());

    connector.close().await.unwrap();
}

#[tokio::test]
async fn test_two_connectors_are_independent() {
    let dir = scratch_dir();

    let mut writer = open_scratch(&dir);
    seed_numbers(&mut writer, 5).await;

    let mut a = open_scratch(&dir);
    let mut b = open_scratch(&dir);

    a.execute("SELECT x FROM t ORDER BY x").await.unwrap();
    b.execute("SELECT x FROM t ORDER BY x DESC").await.unwrap();

    // Interleaved fetches do not disturb each other's cursors.
    assert_eq!(a.fetch_page(2).await.unwrap(), vec![vec![Value::Int(1)], vec![Value::Int(2)]]);
    assert_eq!(b.fetch_page(2).await.unwrap(), vec![vec![Value::Int(5)], vec![Value::Int(4)]]);
    assert_eq!(a.fetch_page(2).await.unwrap(), vec![vec![Value::Int(3)], vec![Value::Int(4)]]);

    // Closing one leaves the other readable.
    a.close().await.unwrap();
    assert_eq!(
        b.fetch_page(10).await.unwrap(),
        vec![vec![Value::Int(3)], vec![Value::Int(2)], vec![Value::Int(1)]]
    );

    b.close().await.unwrap();
    writer.close().await.unwrap();
}

#[tokio::test]
async fn test_statements_are_autocommitted() {
    let dir = scratch_dir();

    let mut writer = open_scratch(&dir);
    seed_numbers(&mut writer, 3).await;
    writer.close().await.unwrap();

    let mut reader = open_scratch(&dir);
    reader.execute("SELECT count(*) FROM t").await.unwrap();
    assert_eq!(
        reader.fetch_page(1).await.unwrap(),
        vec![vec![Value::Int(3)]]
    );
    reader.close().await.unwrap();
}

#[tokio::test]
async fn test_reexecute_discards_previous_cursor() {
    let dir = scratch_dir();
    let mut connector = open_scratch(&dir);
    seed_numbers(&mut connector, 10).await;

    connector.execute("SELECT x FROM t ORDER BY x").await.unwrap();
    assert_eq!(connector.fetch_page(2).await.unwrap().len(), 2);

    connector.execute("SELECT 'fresh' AS s").await.unwrap();
    assert_eq!(connector.headers(), Some(&["s".to_string()][..]));
    assert_eq!(
        connector.fetch_page(10).await.unwrap(),
        vec![vec![Value::Text("fresh".to_string())]]
    );

    connector.close().await.unwrap();
}

#[tokio::test]
async fn test_dropped_connector_releases_file() {
    let dir = scratch_dir();

    {
        let mut connector = open_scratch(&dir);
        seed_numbers(&mut connector, 3).await;
        connector.execute("SELECT x FROM t").await.unwrap();
        // Dropped with an open cursor and no explicit close.
    }

    let mut other = open_scratch(&dir);
    let outcome = other.execute("DELETE FROM t").await.unwrap();
    assert_eq!(outcome, ExecuteOutcome::NoResultSet { rows_affected: 3 });
    other.close().await.unwrap();
}

#[tokio::test]
async fn test_locked_database_drops_session_then_reconnects() {
    let dir = scratch_dir();

    let mut a = open_scratch(&dir);
    seed_numbers(&mut a, 0).await;
    a.execute("BEGIN IMMEDIATE").await.unwrap();

    // B waits out its busy timeout on A's write lock.
    let mut b = open_scratch(&dir);
    let err = b.execute("INSERT INTO t VALUES (1)").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert_eq!(
        err.user_hint(),
        "Error! Try to check your connection settings."
    );
    assert!(!b.has_session());

    a.execute("ROLLBACK").await.unwrap();

    b.execute("SELECT 1").await.unwrap();
    assert!(b.has_session());
    assert_eq!(b.fetch_page(1).await.unwrap(), vec![vec![Value::Int(1)]]);

    b.close().await.unwrap();
    a.close().await.unwrap();
}
