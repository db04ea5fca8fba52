use crate::{Dialect, MySqlDialect, PostgresDialect, SqliteDialect, Statements, TableSchema};

fn custom_schema() -> TableSchema {
    TableSchema::new("hilo", "seq_name", "hi", "inc", "chunk").unwrap()
}

fn run_templates_use_schema_identifiers<D: Dialect>(dialect: &D) {
    let statements = Statements::render(dialect, &custom_schema());
    for sql in [
        &statements.select_for_update,
        &statements.update_ceiling,
        &statements.insert_row,
        &statements.create_table,
    ] {
        assert!(sql.contains("hilo"), "{sql}");
        assert!(!sql.contains("id_sequence"), "{sql}");
    }
    assert!(statements.lock_table.contains("hilo"));
    assert!(statements.select_for_update.starts_with("SELECT hi, inc, chunk FROM hilo"));
    assert!(statements.insert_row.contains("(seq_name, hi, inc, chunk)"));
}

#[test]
fn sqlite_templates_use_schema_identifiers() {
    run_templates_use_schema_identifiers(&SqliteDialect);
}

#[test]
fn postgres_templates_use_schema_identifiers() {
    run_templates_use_schema_identifiers(&PostgresDialect);
}

#[test]
fn mysql_templates_use_schema_identifiers() {
    run_templates_use_schema_identifiers(&MySqlDialect);
}

#[test]
fn escalation_flags() {
    assert!(!SqliteDialect.needs_table_lock_when_row_absent());
    assert!(PostgresDialect.needs_table_lock_when_row_absent());
    assert!(MySqlDialect.needs_table_lock_when_row_absent());
}

#[test]
fn placeholders_follow_backend_syntax() {
    let schema = TableSchema::default();

    let sqlite = Statements::render(&SqliteDialect, &schema);
    assert_eq!(
        sqlite.update_ceiling,
        "UPDATE id_sequence SET ceiling = ?1 WHERE entity_name = ?2"
    );

    let postgres = Statements::render(&PostgresDialect, &schema);
    assert_eq!(
        postgres.select_for_update,
        "SELECT ceiling, step, block_size FROM id_sequence WHERE entity_name = $1 FOR UPDATE"
    );
    assert_eq!(postgres.lock_table, "LOCK TABLE id_sequence IN EXCLUSIVE MODE");

    let mysql = Statements::render(&MySqlDialect, &schema);
    assert_eq!(
        mysql.insert_row,
        "INSERT INTO id_sequence (entity_name, ceiling, step, block_size) VALUES (?, ?, ?, ?)"
    );
    assert_eq!(mysql.lock_table, "LOCK TABLES id_sequence WRITE");
}

#[test]
fn render_through_reference() {
    let dialect: &dyn Dialect = &PostgresDialect;
    let statements = Statements::render(&dialect, &TableSchema::default());
    assert!(statements.needs_table_lock_when_row_absent);
}
