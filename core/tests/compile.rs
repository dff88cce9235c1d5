//! SQL generation tests: clause ordering, parenthesization, parameter
//! binding, and inlined relation sub-selects.

use relq_core::{QueryBuilder, RelationKind, RelationSpec, RelqError, Value};

#[test]
fn empty_state_compiles_to_select_star() {
    let q = QueryBuilder::table("users");
    let compiled = q.compile().unwrap();
    assert_eq!(compiled.sql(), r#"SELECT * FROM "users""#);
    assert!(compiled.params().is_empty());
}

#[test]
fn where_clauses_render_in_declaration_order() {
    let mut q = QueryBuilder::table("users");
    q.select(["id", "name"])
        .r#where("age", ">", 30)
        .where_eq("status", "active");

    let (sql, params) = q.compile().unwrap().into_parts();
    assert_eq!(
        sql,
        r#"SELECT "id", "name" FROM "users" WHERE "age" > ? AND "status" = ?"#
    );
    assert_eq!(params, vec![Value::Integer(30), Value::from("active")]);
}

#[test]
fn or_where_uses_or_combinator() {
    let mut q = QueryBuilder::table("users");
    q.where_eq("a", 1).or_where("b", "<", 2);

    let sql = q.compile().unwrap().sql();
    assert_eq!(sql, r#"SELECT * FROM "users" WHERE "a" = ? OR "b" < ?"#);
}

#[test]
fn groups_parenthesize_exactly() {
    let mut q = QueryBuilder::table("users");
    q.where_eq("a", 1).or_where_group(|group| {
        group.where_eq("b", 2).r#where("c", "<", 3);
    });

    let (sql, params) = q.compile().unwrap().into_parts();
    assert_eq!(
        sql,
        r#"SELECT * FROM "users" WHERE "a" = ? OR ("b" = ? AND "c" < ?)"#
    );
    assert_eq!(
        params,
        vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]
    );
}

#[test]
fn empty_group_is_skipped() {
    let mut q = QueryBuilder::table("users");
    q.where_eq("a", 1).where_group(|_| {});

    let sql = q.compile().unwrap().sql();
    assert_eq!(sql, r#"SELECT * FROM "users" WHERE "a" = ?"#);
}

#[test]
fn where_in_binds_every_value_in_order() {
    let mut q = QueryBuilder::table("users");
    q.where_in("id", [3, 1, 2]);

    let (sql, params) = q.compile().unwrap().into_parts();
    assert_eq!(sql, r#"SELECT * FROM "users" WHERE "id" IN (?, ?, ?)"#);
    assert_eq!(
        params,
        vec![Value::Integer(3), Value::Integer(1), Value::Integer(2)]
    );
}

#[test]
fn empty_in_list_matches_nothing() {
    let mut q = QueryBuilder::table("users");
    q.where_in("id", Vec::<i64>::new());

    let sql = q.compile().unwrap().sql();
    assert_eq!(sql, r#"SELECT * FROM "users" WHERE "id" IN (NULL)"#);
}

#[test]
fn null_predicates_have_no_parameters() {
    let mut q = QueryBuilder::table("users");
    q.where_null("deleted_at").where_not_null("email");

    let (sql, params) = q.compile().unwrap().into_parts();
    assert_eq!(
        sql,
        r#"SELECT * FROM "users" WHERE "deleted_at" IS NULL AND "email" IS NOT NULL"#
    );
    assert!(params.is_empty());
}

#[test]
fn search_builds_grouped_like_predicates() {
    let mut q = QueryBuilder::table("users");
    q.search(["name", "email"], "bob");

    let (sql, params) = q.compile().unwrap().into_parts();
    assert_eq!(
        sql,
        r#"SELECT * FROM "users" WHERE ("name" LIKE ? OR "email" LIKE ?)"#
    );
    assert_eq!(params, vec![Value::from("%bob%"), Value::from("%bob%")]);
}

#[test]
fn clause_order_is_fixed() {
    let mut q = QueryBuilder::table("users");
    q.select(["users.id"])
        .join("posts", r#""posts"."user_id" = "users"."id""#)
        .where_eq("users.status", "active")
        .group_by(["users.id"])
        .having("total", ">", 1)
        .order_by("users.id")
        .limit(10)
        .offset(5);

    let sql = q.compile().unwrap().sql();
    assert_eq!(
        sql,
        r#"SELECT "users"."id" FROM "users" INNER JOIN "posts" ON "posts"."user_id" = "users"."id" WHERE "users"."status" = ? GROUP BY "users"."id" HAVING "total" > ? ORDER BY "users"."id" ASC LIMIT 10 OFFSET 5"#
    );
}

#[test]
fn dotted_identifiers_quote_per_segment() {
    let mut q = QueryBuilder::table("users");
    q.select(["users.*"]).where_eq("users.id", 7);

    let sql = q.compile().unwrap().sql();
    assert_eq!(
        sql,
        r#"SELECT "users".* FROM "users" WHERE "users"."id" = ?"#
    );
}

#[test]
fn exists_relation_inlines_into_base_statement() {
    let mut q = QueryBuilder::table("users");
    q.where_exists_relation("orders", "user_id", "id");

    let sql = q.compile().unwrap().sql();
    assert_eq!(
        sql,
        r#"SELECT * FROM "users" WHERE EXISTS (SELECT 1 FROM "orders" WHERE "orders"."user_id" = "users"."id")"#
    );
}

#[test]
fn scoped_exists_relation_appends_sub_conditions() {
    let mut q = QueryBuilder::table("users");
    q.where_eq("name", "x")
        .where_exists_relation_scoped("orders", "user_id", "id", |sub| {
            sub.where_eq("status", "completed");
        });

    let (sql, params) = q.compile().unwrap().into_parts();
    assert_eq!(
        sql,
        r#"SELECT * FROM "users" WHERE "name" = ? AND EXISTS (SELECT 1 FROM "orders" WHERE "orders"."user_id" = "users"."id" AND "status" = ?)"#
    );
    assert_eq!(params, vec![Value::from("x"), Value::from("completed")]);
}

#[test]
fn not_exists_relation_negates() {
    let mut q = QueryBuilder::table("users");
    q.where_not_exists_relation("orders", "user_id", "id");

    let sql = q.compile().unwrap().sql();
    assert!(sql.contains("NOT EXISTS (SELECT 1 FROM \"orders\""));
}

#[test]
fn count_relation_inlines_correlated_subselect() {
    let mut q = QueryBuilder::table("users");
    q.with_count("posts", "posts", "user_id", "id");

    let sql = q.compile().unwrap().sql();
    assert_eq!(
        sql,
        r#"SELECT *, (SELECT COUNT(*) FROM "posts" WHERE "posts"."user_id" = "users"."id") AS "posts_count" FROM "users""#
    );
}

#[test]
fn sum_relation_uses_aggregate_column_and_suffix() {
    let mut q = QueryBuilder::table("users");
    q.with_sum("amount", "payments", "user_id", "id", "amount");

    let sql = q.compile().unwrap().sql();
    assert_eq!(
        sql,
        r#"SELECT *, (SELECT SUM("amount") FROM "payments" WHERE "payments"."user_id" = "users"."id") AS "amount_sum" FROM "users""#
    );
}

#[test]
fn aggregate_scope_conditions_bind_inside_subselect() {
    let mut q = QueryBuilder::table("users");
    q.attach(
        RelationSpec::new(RelationKind::Count, "published", "posts", "user_id", "id")
            .scope(|sub| {
                sub.where_eq("published", 1);
            }),
    );

    let (sql, params) = q.compile().unwrap().into_parts();
    assert_eq!(
        sql,
        r#"SELECT *, (SELECT COUNT(*) FROM "posts" WHERE "posts"."user_id" = "users"."id" AND "published" = ?) AS "published_count" FROM "users""#
    );
    assert_eq!(params, vec![Value::Integer(1)]);
}

#[test]
fn aggregate_alias_collision_is_a_compile_error() {
    let mut q = QueryBuilder::table("users");
    q.select_as("id", "posts_count")
        .with_count("posts", "posts", "user_id", "id");

    match q.compile() {
        Err(RelqError::Compilation(msg)) => assert!(msg.contains("posts_count")),
        other => panic!("expected compilation error, got {other:?}"),
    }
}

#[test]
fn duplicate_relation_alias_overwrites() {
    let mut q = QueryBuilder::table("users");
    q.with_count("posts", "posts", "user_id", "id");
    q.attach(
        RelationSpec::new(RelationKind::Count, "posts", "posts", "user_id", "id").scope(|sub| {
            sub.where_eq("published", 1);
        }),
    );

    let sql = q.compile().unwrap().sql();
    assert_eq!(sql.matches("posts_count").count(), 1);
    assert!(sql.contains(r#""published" = ?"#));
}

#[test]
fn misconfigured_relation_surfaces_at_compile() {
    let mut q = QueryBuilder::table("users");
    q.attach(RelationSpec::new(
        RelationKind::Sum,
        "amount",
        "payments",
        "user_id",
        "id",
    ));

    match q.compile() {
        Err(RelqError::Configuration(msg)) => assert!(msg.contains("amount")),
        other => panic!("expected configuration error, got {other:?}"),
    }
}

#[test]
fn missing_key_relation_is_deferred_until_compile() {
    let mut q = QueryBuilder::table("users");
    q.with_many("posts", "posts", "", "id");

    assert!(matches!(q.compile(), Err(RelqError::Configuration(_))));
}

#[test]
fn count_query_shares_filtering_and_drops_limit() {
    let mut q = QueryBuilder::table("users");
    q.join("posts", r#""posts"."user_id" = "users"."id""#)
        .where_eq("status", "active")
        .order_by("id")
        .limit(10)
        .offset(20);

    let (sql, params) = q.compile_count().unwrap().into_parts();
    assert_eq!(
        sql,
        r#"SELECT COUNT(*) AS "found_rows" FROM "users" INNER JOIN "posts" ON "posts"."user_id" = "users"."id" WHERE "status" = ?"#
    );
    assert_eq!(params, vec![Value::from("active")]);
}

#[test]
fn grouped_count_query_wraps_as_derived_table() {
    let mut q = QueryBuilder::table("users");
    q.select(["status"]).group_by(["status"]).limit(10);

    let sql = q.compile_count().unwrap().sql();
    assert!(sql.starts_with(r#"SELECT COUNT(*) AS "found_rows" FROM ("#));
    assert!(sql.contains(r#"GROUP BY "status""#));
    assert!(!sql.contains("LIMIT"));
}

#[test]
fn column_to_column_predicates_never_bind() {
    let mut q = QueryBuilder::table("users");
    q.where_column("users.id", "=", "posts.user_id");

    let (sql, params) = q.compile().unwrap().into_parts();
    assert_eq!(
        sql,
        r#"SELECT * FROM "users" WHERE "users"."id" = "posts"."user_id""#
    );
    assert!(params.is_empty());
}

#[test]
fn compile_is_deterministic() {
    let mut q = QueryBuilder::table("users");
    q.where_eq("a", 1).with_count("posts", "posts", "user_id", "id");

    let first = q.compile().unwrap().sql();
    let second = q.compile().unwrap().sql();
    assert_eq!(first, second);
}
