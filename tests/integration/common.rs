//! Shared helpers for integration tests.

use sql_connector::{Connector, SpecResolver};
use std::fs::File;
use tempfile::TempDir;

/// File name of the scratch database inside each test directory.
pub const DB_FILE: &str = "test.sqlite";

/// Creates a temporary directory holding an empty SQLite database file.
pub fn scratch_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    // SQLite treats an empty file as an empty database.
    File::create(dir.path().join(DB_FILE)).unwrap();
    dir
}

/// Opens a connector on the scratch database, using a relative locator.
pub fn open_scratch(dir: &TempDir) -> Connector {
    let spec = SpecResolver::new(dir.path())
        .resolve("sqlite", DB_FILE)
        .unwrap();
    Connector::open(spec).unwrap()
}

/// Rows inserted per statement when seeding.
const INSERT_CHUNK: usize = 200;

/// Builds an insert of `first..=last` into `t(x)` as one statement.
pub fn insert_numbers(first: usize, last: usize) -> String {
    let values: Vec<String> = (first..=last).map(|i| format!("({i})")).collect();
    format!("INSERT INTO t(x) VALUES {}", values.join(", "))
}

/// Creates `t(x INTEGER)` holding `1..=count`.
pub async fn seed_numbers(connector: &mut Connector, count: usize) {
    connector
        .execute("CREATE TABLE t(x INTEGER)")
        .await
        .unwrap();
    let mut first = 1;
    while first <= count {
        let last = (first + INSERT_CHUNK - 1).min(count);
        connector
            .execute(&insert_numbers(first, last))
            .await
            .unwrap();
        first = last + 1;
    }
}
