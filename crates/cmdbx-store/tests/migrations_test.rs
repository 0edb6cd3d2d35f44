// Integration tests for the migration framework

use rusqlite::Connection;

fn table_names(conn: &Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
        .unwrap();
    stmt.query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<String>, _>>()
        .unwrap()
}

#[test]
fn test_apply_migrations_on_empty_db() {
    let mut conn = Connection::open_in_memory().unwrap();
    cmdbx_store::migrations::apply_migrations(&mut conn).unwrap();

    let tables = table_names(&conn);
    for expected in [
        "id_sequences",
        "instances",
        "object_definitions",
        "schema_version",
    ] {
        assert!(
            tables.iter().any(|t| t == expected),
            "missing table {}: {:?}",
            expected,
            tables
        );
    }

    let seq: i64 = conn
        .query_row(
            "SELECT value FROM id_sequences WHERE name = 'inst_id'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(seq, 0);
}

#[test]
fn test_migrations_are_idempotent() {
    let mut conn = Connection::open_in_memory().unwrap();
    cmdbx_store::migrations::apply_migrations(&mut conn).unwrap();
    cmdbx_store::migrations::apply_migrations(&mut conn).unwrap();

    let applied = cmdbx_store::migrations::applied_migrations(&conn).unwrap();
    assert_eq!(applied, vec!["001_instance_schema".to_string()]);
}
