//! Conventions every migration must follow.

use sqlx::PgPool;

/// `(table, column, data_type)` for every column of the application schema.
async fn columns(pool: &PgPool) -> Vec<(String, String, String)> {
    sqlx::query_as(
        "SELECT c.table_name::TEXT, c.column_name::TEXT, c.data_type::TEXT
         FROM information_schema.columns c
         JOIN information_schema.tables t
           ON t.table_schema = c.table_schema AND t.table_name = c.table_name
         WHERE c.table_schema = 'public'
           AND t.table_type = 'BASE TABLE'
           AND c.table_name <> '_sqlx_migrations'
         ORDER BY 1, 2",
    )
    .fetch_all(pool)
    .await
    .unwrap()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn column_types_follow_conventions(pool: PgPool) {
    let cols = columns(&pool).await;
    assert!(!cols.is_empty());

    let type_of = |table: &str, column: &str| {
        cols.iter()
            .find(|(t, c, _)| t == table && c == column)
            .map(|(_, _, ty)| ty.as_str())
    };

    let mut tables: Vec<&str> = cols.iter().map(|(t, _, _)| t.as_str()).collect();
    tables.dedup();
    for table in tables {
        assert_eq!(type_of(table, "id"), Some("bigint"), "{table}.id");
        for stamp in ["created_at", "updated_at"] {
            assert_eq!(
                type_of(table, stamp),
                Some("timestamp with time zone"),
                "{table}.{stamp}"
            );
        }
    }

    let varchar: Vec<_> = cols
        .iter()
        .filter(|(_, _, ty)| ty == "character varying")
        .collect();
    assert!(varchar.is_empty(), "use TEXT instead of VARCHAR: {varchar:?}");
}

/// Each foreign key column leads at least one index on its table.
#[sqlx::test(migrations = "../../db/migrations")]
async fn foreign_keys_are_indexed(pool: PgPool) {
    let unindexed: Vec<(String, String)> = sqlx::query_as(
        "SELECT con.conrelid::regclass::TEXT, att.attname::TEXT
         FROM pg_constraint con
         JOIN pg_attribute att
           ON att.attrelid = con.conrelid AND att.attnum = con.conkey[1]
         WHERE con.contype = 'f'
           AND con.connamespace = 'public'::regnamespace
           AND NOT EXISTS (
               SELECT 1 FROM pg_index idx
               WHERE idx.indrelid = con.conrelid AND idx.indkey[0] = con.conkey[1]
           )
         ORDER BY 1, 2",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert!(unindexed.is_empty(), "foreign keys without an index: {unindexed:?}");
}

/// Unique violations map to 409 only for `uq_`-prefixed constraints.
#[sqlx::test(migrations = "../../db/migrations")]
async fn conflict_constraints_are_prefixed(pool: PgPool) {
    let names: Vec<(String,)> = sqlx::query_as(
        "SELECT relname::TEXT FROM pg_class
         WHERE relkind = 'i' AND relname LIKE 'uq\\_%'
         ORDER BY 1",
    )
    .fetch_all(&pool)
    .await
    .unwrap();
    let names: Vec<&str> = names.iter().map(|(n,)| n.as_str()).collect();

    for expected in [
        "uq_appointments_therapist_slot",
        "uq_patients_patient_code",
        "uq_refresh_tokens_token_hash",
        "uq_social_attention_sessions_session_id",
        "uq_therapist_slots_active_date",
        "uq_users_email",
    ] {
        assert!(names.contains(&expected), "missing unique index {expected}");
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn check_constraints_reject_unknown_roles_and_negative_ages(pool: PgPool) {
    let bad_role = sqlx::query(
        "INSERT INTO users (username, email, password_hash, role)
         VALUES ('x', 'x@example.com', 'x', 'superuser')",
    )
    .execute(&pool)
    .await
    .unwrap_err();
    let db_err = bad_role.as_database_error().expect("database error");
    assert_eq!(db_err.constraint(), Some("ck_users_role"));

    let bad_age =
        sqlx::query("INSERT INTO patients (patient_code, name, age) VALUES ('P-1', 'Kid', -1)")
            .execute(&pool)
            .await
            .unwrap_err();
    assert_eq!(
        bad_age.as_database_error().and_then(|e| e.constraint()),
        Some("ck_patients_age")
    );
}

/// The shared trigger bumps `updated_at` on every update.
#[sqlx::test(migrations = "../../db/migrations")]
async fn updated_at_moves_forward_on_update(pool: PgPool) {
    let (id, before): (i64, chrono::DateTime<chrono::Utc>) = sqlx::query_as(
        "INSERT INTO users (username, email, password_hash, role)
         VALUES ('t', 't@example.com', 'x', 'therapist')
         RETURNING id, updated_at",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    let (after,): (chrono::DateTime<chrono::Utc>,) =
        sqlx::query_as("UPDATE users SET status = 'pending' WHERE id = $1 RETURNING updated_at")
            .bind(id)
            .fetch_one(&pool)
            .await
            .unwrap();

    assert!(after > before);
}
