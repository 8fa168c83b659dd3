//! Result model integration tests over a real SQLite cursor.

use super::common::{open_scratch, scratch_dir, seed_numbers};
use pretty_assertions::assert_eq;
use sql_connector::{Pagination, ResultModel, Value};

#[tokio::test]
async fn test_load_returns_none_without_result_set() {
    let dir = scratch_dir();
    let mut connector = open_scratch(&dir);

    connector.execute("CREATE TABLE t(x INT)").await.unwrap();
    let model = ResultModel::load(&mut connector, Pagination::default())
        .await
        .unwrap();
    assert!(model.is_none());

    connector.close().await.unwrap();
}

#[tokio::test]
async fn test_row_count_follows_display_batches() {
    let dir = scratch_dir();
    let mut connector = open_scratch(&dir);
    seed_numbers(&mut connector, 60).await;
    connector.execute("SELECT x FROM t ORDER BY x").await.unwrap();

    let pagination = Pagination::new(20, 7).unwrap();
    let mut model = ResultModel::load(&mut connector, pagination)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(model.headers(), &["x".to_string()]);
    assert_eq!(model.column_count(), 1);

    // row_count == min(total, initial + k * display_batch), except that a
    // step never crosses a fetch boundary.
    let mut counts = vec![model.row_count()];
    while model.can_grow().await.unwrap() {
        model.grow_by();
        counts.push(model.row_count());
    }

    assert_eq!(
        counts,
        vec![7, 14, 20, 27, 34, 40, 47, 54, 60]
    );
    assert!(model.is_exhausted());
    assert_eq!(model.cell_at(0, 0), Some(&Value::Int(1)));
    assert_eq!(model.cell_at(59, 0), Some(&Value::Int(60)));
    assert_eq!(model.cell_at(60, 0), None);

    drop(model);
    connector.close().await.unwrap();
}

#[tokio::test]
async fn test_default_pagination_over_large_result() {
    let dir = scratch_dir();
    let mut connector = open_scratch(&dir);
    seed_numbers(&mut connector, 2500).await;
    connector.execute("SELECT x FROM t ORDER BY x").await.unwrap();

    let mut model = ResultModel::load(&mut connector, Pagination::default())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(model.row_count(), 25);
    assert_eq!(model.materialized_count(), 1000);

    let mut steps = 0;
    while model.can_grow().await.unwrap() {
        model.grow_by();
        steps += 1;
        // Never more than one fetch batch ahead of what is shown.
        assert!(model.materialized_count() - model.row_count() < 1000);
    }

    assert_eq!(model.row_count(), 2500);
    assert_eq!(steps, 99);
    assert!(model.is_exhausted());

    drop(model);
    connector.close().await.unwrap();
}

#[tokio::test]
async fn test_small_result_is_exhausted_at_load() {
    let dir = scratch_dir();
    let mut connector = open_scratch(&dir);
    seed_numbers(&mut connector, 3).await;
    connector.execute("SELECT x FROM t ORDER BY x").await.unwrap();

    let mut model = ResultModel::load(&mut connector, Pagination::default())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(model.row_count(), 3);
    assert!(model.is_exhausted());
    assert!(!model.can_grow().await.unwrap());
    assert_eq!(model.grow_by(), 0);

    drop(model);
    connector.close().await.unwrap();
}

#[tokio::test]
async fn test_empty_result_model() {
    let dir = scratch_dir();
    let mut connector = open_scratch(&dir);
    seed_numbers(&mut connector, 0).await;
    connector.execute("SELECT x, x * 2 AS doubled FROM t").await.unwrap();

    let model = ResultModel::load(&mut connector, Pagination::default())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(model.row_count(), 0);
    assert_eq!(model.column_count(), 2);
    assert_eq!(model.cell_at(0, 0), None);
    assert!(model.is_exhausted());

    drop(model);
    connector.close().await.unwrap();
}
