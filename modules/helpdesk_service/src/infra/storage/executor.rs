//! Query executor
//!
//! Translates [`QueryOptions`] into `sea-query` statements, runs them on the
//! sea-orm connection, and hands rows back as JSON objects. Embedded
//! relations are resolved with one follow-up `SELECT ... IN (...)` each and
//! inlined into the parent rows.

use super::catalog::{self, Cardinality, ColumnKind, ColumnSpec, IdStrategy, TableSpec};
use crate::contract::{
    Columns, Filter, FilterOp, Projection, QueryError, QueryOptions, Row, SortDirection,
};
use crate::domain::repository::RowStore;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::{
    Alias, Asterisk, BinOper, ConditionalStatement, Expr, Func, InsertStatement, OnConflict,
    Order, Query, SelectStatement, SimpleExpr, Value as SqlValue,
};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbBackend, DbErr, FromQueryResult, Statement,
    TransactionTrait,
};
use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// sea-orm backed [`RowStore`]
#[derive(Clone)]
pub struct QueryExecutor {
    db: Arc<DatabaseConnection>,
}

impl QueryExecutor {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub fn backend(&self) -> DbBackend {
        self.db.get_database_backend()
    }

    pub(crate) async fn fetch(&self, statement: Statement) -> Result<Vec<Row>, QueryError> {
        fetch_rows(self.db.as_ref(), statement).await
    }

    /// Select `projection` from `spec`, keeping `extra` columns in the output
    /// even when not projected so the caller can join on them.
    fn select_projected<'a>(
        &'a self,
        spec: &'static TableSpec,
        projection: &'a Projection,
        options: &'a QueryOptions,
        extra: &'a [&'static str],
    ) -> BoxFuture<'a, Result<Vec<Row>, QueryError>> {
        Box::pin(async move {
            let mut required: Vec<&'static str> = extra.to_vec();
            for embed in &projection.embeds {
                required.push(spec.relation(&embed.relation)?.local_column);
            }

            let statement = build_select(spec, projection, options, &required, self.backend())?;
            debug!(table = spec.name, kind = "select", "executing statement");
            let mut rows = self.fetch(self.backend().build(&statement)).await?;

            for embed in &projection.embeds {
                let relation = spec.relation(&embed.relation)?;
                let target = catalog::table(relation.target_table)?;
                let keys = distinct_values(&rows, relation.local_column);

                let children = if keys.is_empty() {
                    Vec::new()
                } else {
                    let child_options = QueryOptions::new().filter(
                        relation.target_column,
                        FilterOp::In,
                        JsonValue::Array(keys),
                    );
                    let join_key = [relation.target_column];
                    self.select_projected(target, &embed.projection, &child_options, &join_key)
                        .await?
                };

                let keep_join_key = embed.projection.includes(relation.target_column);
                let mut grouped: HashMap<String, Vec<JsonValue>> = HashMap::new();
                for mut child in children {
                    let key = child
                        .get(relation.target_column)
                        .map(JsonValue::to_string)
                        .unwrap_or_default();
                    if !keep_join_key {
                        child.remove(relation.target_column);
                    }
                    grouped.entry(key).or_default().push(JsonValue::Object(child));
                }

                for row in &mut rows {
                    let matches = row
                        .get(relation.local_column)
                        .filter(|v| !v.is_null())
                        .and_then(|v| grouped.get(&v.to_string()));
                    let embedded = match relation.cardinality {
                        Cardinality::One => matches
                            .and_then(|children| children.first().cloned())
                            .unwrap_or(JsonValue::Null),
                        Cardinality::Many => {
                            JsonValue::Array(matches.cloned().unwrap_or_default())
                        }
                    };
                    row.insert(embed.relation.clone(), embedded);
                }
            }

            let hidden: Vec<&str> = required
                .iter()
                .copied()
                .filter(|c| !projection.includes(c) && !extra.contains(c))
                .collect();
            if !hidden.is_empty() {
                for row in &mut rows {
                    for column in &hidden {
                        row.remove(*column);
                    }
                }
            }

            Ok(rows)
        })
    }

    fn insert_statement(
        &self,
        spec: &'static TableSpec,
        rows: Vec<Row>,
    ) -> Result<InsertStatement, QueryError> {
        let now = Utc::now();
        let rows: Vec<Row> = rows
            .into_iter()
            .map(|row| with_insert_defaults(spec, row, now))
            .collect();

        for row in &rows {
            for key in row.keys() {
                spec.require_column(key)?;
            }
        }

        let columns: Vec<&'static ColumnSpec> = spec
            .columns
            .iter()
            .filter(|c| rows.iter().any(|row| row.contains_key(c.name)))
            .collect();

        let mut statement = Query::insert();
        statement
            .into_table(Alias::new(spec.name))
            .columns(columns.iter().map(|c| Alias::new(c.name)));

        for row in &rows {
            let values = columns
                .iter()
                .map(|c| sql_value(c, row.get(c.name).unwrap_or(&JsonValue::Null)).map(SimpleExpr::from))
                .collect::<Result<Vec<_>, _>>()?;
            statement
                .values(values)
                .map_err(|e| QueryError::Backend(e.to_string()))?;
        }

        Ok(statement)
    }
}

async fn fetch_rows<C: ConnectionTrait>(
    conn: &C,
    statement: Statement,
) -> Result<Vec<Row>, QueryError> {
    let values = JsonValue::find_by_statement(statement)
        .all(conn)
        .await
        .map_err(backend_error)?;

    values
        .into_iter()
        .map(|value| match value {
            JsonValue::Object(row) => Ok(row),
            other => Err(QueryError::Backend(format!("unexpected row shape: {other}"))),
        })
        .collect()
}

#[async_trait]
impl RowStore for QueryExecutor {
    async fn select(&self, table: &str, options: &QueryOptions) -> Result<Vec<Row>, QueryError> {
        let spec = catalog::table(table)?;
        let projection = options.projection()?;
        self.select_projected(spec, &projection, options, &[]).await
    }

    async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>, QueryError> {
        let spec = catalog::table(table)?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let count = rows.len();
        let mut statement = self.insert_statement(spec, rows)?;
        statement.returning_all();

        debug!(table = spec.name, kind = "insert", rows = count, "executing statement");
        self.fetch(self.backend().build(&statement)).await
    }

    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        changes: Row,
    ) -> Result<Vec<Row>, QueryError> {
        let spec = catalog::table(table)?;
        if filters.is_empty() {
            return Err(unscoped_write(spec));
        }

        let mut changes = changes;
        if spec.has_column("updated_at") {
            changes.insert("updated_at".to_string(), timestamp_value(Utc::now()));
        }
        if changes.is_empty() {
            return Err(QueryError::InvalidValue {
                column: "*".to_string(),
                reason: "update payload is empty".to_string(),
            });
        }

        let mut values = Vec::with_capacity(changes.len());
        for (column, value) in &changes {
            let column = spec.require_column(column)?;
            values.push((Alias::new(column.name), SimpleExpr::from(sql_value(column, value)?)));
        }

        let mut statement = Query::update();
        statement.table(Alias::new(spec.name)).values(values);
        for filter in filters {
            statement.and_where(filter_expr(spec, filter, self.backend())?);
        }
        statement.returning_all();

        debug!(table = spec.name, kind = "update", "executing statement");
        self.fetch(self.backend().build(&statement)).await
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<u64, QueryError> {
        let spec = catalog::table(table)?;
        if filters.is_empty() {
            return Err(unscoped_write(spec));
        }

        let mut statement = Query::delete();
        statement.from_table(Alias::new(spec.name));
        for filter in filters {
            statement.and_where(filter_expr(spec, filter, self.backend())?);
        }

        debug!(table = spec.name, kind = "delete", "executing statement");
        let result = self
            .db
            .execute(self.backend().build(&statement))
            .await
            .map_err(backend_error)?;
        Ok(result.rows_affected())
    }

    async fn upsert(&self, table: &str, row: Row, conflict: &[&str]) -> Result<Row, QueryError> {
        let spec = catalog::table(table)?;
        for key in conflict {
            spec.require_column(key)?;
        }

        let mut statement = self.insert_statement(spec, vec![row.clone()])?;
        let update_columns: Vec<Alias> = spec
            .columns
            .iter()
            .filter(|c| !conflict.contains(&c.name))
            .filter(|c| row.contains_key(c.name) || c.name == "updated_at")
            .map(|c| Alias::new(c.name))
            .collect();

        let mut on_conflict = OnConflict::columns(conflict.iter().map(|c| Alias::new(*c)));
        if update_columns.is_empty() {
            on_conflict.do_nothing();
        } else {
            on_conflict.update_columns(update_columns);
        }
        statement.on_conflict(on_conflict).returning_all();

        debug!(table = spec.name, kind = "upsert", "executing statement");
        self.fetch(self.backend().build(&statement))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| QueryError::NoRows {
                table: spec.name.to_string(),
            })
    }

    async fn insert_with_children(
        &self,
        parent_table: &str,
        parent: Row,
        child_table: &str,
        link_column: &str,
        children: Vec<Row>,
    ) -> Result<(Row, Vec<Row>), QueryError> {
        let parent_spec = catalog::table(parent_table)?;
        let child_spec = catalog::table(child_table)?;
        child_spec.require_column(link_column)?;
        let key = parent_spec
            .primary_key
            .first()
            .copied()
            .ok_or_else(|| QueryError::InvalidValue {
                column: "*".to_string(),
                reason: format!("table '{}' has no primary key", parent_spec.name),
            })?;

        let mut parent_insert = self.insert_statement(parent_spec, vec![parent])?;
        parent_insert.returning_all();

        // Dropping the transaction on an early return rolls it back
        let txn = self.db.begin().await.map_err(backend_error)?;

        debug!(table = parent_spec.name, kind = "insert", rows = 1, "executing statement");
        let parent_row = fetch_rows(&txn, self.backend().build(&parent_insert))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| QueryError::NoRows {
                table: parent_spec.name.to_string(),
            })?;
        let parent_id = parent_row.get(key).cloned().unwrap_or(JsonValue::Null);

        let child_rows = if children.is_empty() {
            Vec::new()
        } else {
            let count = children.len();
            let children: Vec<Row> = children
                .into_iter()
                .map(|mut row| {
                    row.insert(link_column.to_string(), parent_id.clone());
                    row
                })
                .collect();
            let mut child_insert = self.insert_statement(child_spec, children)?;
            child_insert.returning_all();

            debug!(table = child_spec.name, kind = "insert", rows = count, "executing statement");
            fetch_rows(&txn, self.backend().build(&child_insert)).await?
        };

        txn.commit().await.map_err(backend_error)?;
        Ok((parent_row, child_rows))
    }
}

// ===== Statement construction =====

/// Build the primary `SELECT` for `options` against `spec`.
///
/// `required` columns are selected even when the projection leaves them out,
/// so embedded relations can be joined afterwards.
pub fn build_select(
    spec: &TableSpec,
    projection: &Projection,
    options: &QueryOptions,
    required: &[&str],
    backend: DbBackend,
) -> Result<SelectStatement, QueryError> {
    let mut statement = Query::select();
    statement.from(Alias::new(spec.name));

    match &projection.columns {
        Columns::All => {
            statement.column(Asterisk);
        }
        Columns::Named(names) => {
            let mut selected: Vec<&'static str> = Vec::new();
            for name in names.iter().map(String::as_str).chain(required.iter().copied()) {
                let column = spec.require_column(name)?;
                if !selected.contains(&column.name) {
                    selected.push(column.name);
                }
            }
            if selected.is_empty() {
                return Err(QueryError::InvalidProjection {
                    select: options.select.clone().unwrap_or_default(),
                    reason: "no columns selected".to_string(),
                });
            }
            statement.columns(selected.into_iter().map(Alias::new));
        }
    }

    for embed in &projection.embeds {
        spec.relation(&embed.relation)?;
    }

    for filter in &options.filters {
        statement.and_where(filter_expr(spec, filter, backend)?);
    }

    for sort in &options.sort {
        let column = spec.require_column(&sort.column)?;
        let order = match sort.direction {
            SortDirection::Asc => Order::Asc,
            SortDirection::Desc => Order::Desc,
        };
        statement.order_by(Alias::new(column.name), order);
    }

    let (limit, offset) = options.window();
    if let Some(limit) = limit {
        statement.limit(bigint_window("limit", limit)?);
    }
    if let Some(offset) = offset {
        statement.offset(bigint_window("offset", offset)?);
    }

    Ok(statement)
}

/// LIMIT/OFFSET are bound as signed 64-bit integers.
fn bigint_window(name: &str, value: u64) -> Result<u64, QueryError> {
    if i64::try_from(value).is_ok() {
        Ok(value)
    } else {
        Err(QueryError::InvalidValue {
            column: name.to_string(),
            reason: format!("{value} exceeds {}", i64::MAX),
        })
    }
}

/// Map one filter onto a SQL predicate.
pub fn filter_expr(
    spec: &TableSpec,
    filter: &Filter,
    backend: DbBackend,
) -> Result<SimpleExpr, QueryError> {
    let column = spec.require_column(&filter.column)?;
    let col = || Expr::col(Alias::new(column.name));
    let value = &filter.value;

    let expr = match filter.operator {
        FilterOp::Eq => col().eq(sql_value(column, value)?),
        FilterOp::Neq => col().ne(sql_value(column, value)?),
        FilterOp::Gt => col().gt(sql_value(column, value)?),
        FilterOp::Lt => col().lt(sql_value(column, value)?),
        FilterOp::Gte => col().gte(sql_value(column, value)?),
        FilterOp::Lte => col().lte(sql_value(column, value)?),
        FilterOp::Like => col().like(pattern(column, value)?),
        FilterOp::Ilike => match backend {
            DbBackend::Postgres => col().ilike(pattern(column, value)?),
            // sqlite LOWER() folds ASCII letters only
            _ => Expr::expr(Func::lower(col())).binary(
                BinOper::Like,
                Func::lower(Expr::val(pattern(column, value)?)),
            ),
        },
        FilterOp::In => {
            let items = value.as_array().ok_or_else(|| invalid(column, "'in' expects an array"))?;
            let values = items
                .iter()
                .map(|item| sql_value(column, item))
                .collect::<Result<Vec<_>, _>>()?;
            col().is_in(values)
        }
        FilterOp::Is => match value {
            JsonValue::Null => col().is_null(),
            JsonValue::Bool(flag) => col().is(*flag),
            JsonValue::String(s) if s == "null" => col().is_null(),
            JsonValue::String(s) if s == "true" || s == "false" => col().is(s == "true"),
            _ => return Err(invalid(column, "'is' expects null, true or false")),
        },
        FilterOp::Not => col().eq(sql_value(column, value)?).not(),
        FilterOp::Contains | FilterOp::Overlaps => array_expr(column, filter, backend)?,
    };

    Ok(expr)
}

fn array_expr(
    column: &ColumnSpec,
    filter: &Filter,
    backend: DbBackend,
) -> Result<SimpleExpr, QueryError> {
    if column.kind != ColumnKind::Json {
        return Err(invalid(column, "array operators need a json column"));
    }
    if !filter.value.is_array() {
        return Err(invalid(column, "array operators expect an array"));
    }

    let name = column.name;
    let sql = match (backend, filter.operator) {
        (DbBackend::Postgres, FilterOp::Contains) => {
            format!(r#"CAST("{name}" AS jsonb) @> CAST(? AS jsonb)"#)
        }
        (DbBackend::Postgres, _) => format!(
            r#"EXISTS (SELECT 1 FROM jsonb_array_elements(CAST("{name}" AS jsonb)) AS a JOIN jsonb_array_elements(CAST(? AS jsonb)) AS b ON a.value = b.value)"#
        ),
        (DbBackend::Sqlite, FilterOp::Contains) => format!(
            r#"NOT EXISTS (SELECT value FROM json_each(?) EXCEPT SELECT value FROM json_each("{name}"))"#
        ),
        (DbBackend::Sqlite, _) => format!(
            r#"EXISTS (SELECT 1 FROM json_each("{name}") AS a JOIN json_each(?) AS b ON a.value = b.value)"#
        ),
        _ => {
            return Err(QueryError::UnsupportedOperator {
                operator: filter.operator.to_string(),
            })
        }
    };

    Ok(Expr::cust_with_values(sql, [filter.value.to_string()]))
}

// ===== Value conversion =====

/// Convert a JSON value into a typed SQL value for `column`.
pub fn sql_value(column: &ColumnSpec, value: &JsonValue) -> Result<SqlValue, QueryError> {
    match (column.kind, value) {
        (ColumnKind::Text, JsonValue::Null) => Ok(SqlValue::String(None)),
        (ColumnKind::Integer, JsonValue::Null) => Ok(SqlValue::BigInt(None)),
        (ColumnKind::Timestamp, JsonValue::Null) => Ok(SqlValue::ChronoDateTimeUtc(None)),
        (ColumnKind::Json, JsonValue::Null) => Ok(SqlValue::Json(None)),

        (ColumnKind::Text, JsonValue::String(s)) => Ok(s.clone().into()),
        (ColumnKind::Text, JsonValue::Number(n)) => Ok(n.to_string().into()),
        (ColumnKind::Text, JsonValue::Bool(b)) => Ok(b.to_string().into()),

        (ColumnKind::Integer, JsonValue::Number(n)) => n
            .as_i64()
            .map(SqlValue::from)
            .ok_or_else(|| invalid(column, "expected an integer")),
        (ColumnKind::Integer, JsonValue::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(SqlValue::from)
            .map_err(|_| invalid(column, "expected an integer")),

        (ColumnKind::Timestamp, JsonValue::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|dt| SqlValue::from(dt.with_timezone(&Utc)))
            .map_err(|e| invalid(column, &format!("expected an RFC 3339 timestamp: {e}"))),

        (ColumnKind::Json, other) => Ok(SqlValue::from(other.clone())),

        _ => Err(invalid(column, "unsupported value type")),
    }
}

fn pattern(column: &ColumnSpec, value: &JsonValue) -> Result<String, QueryError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| invalid(column, "pattern must be a string"))
}

fn with_insert_defaults(spec: &TableSpec, mut row: Row, now: DateTime<Utc>) -> Row {
    if spec.id_strategy == IdStrategy::Uuid && !row.contains_key("id") {
        row.insert("id".to_string(), JsonValue::String(Uuid::new_v4().to_string()));
    }
    for column in ["created_at", "updated_at"] {
        if spec.has_column(column) && row.get(column).map_or(true, JsonValue::is_null) {
            row.insert(column.to_string(), timestamp_value(now));
        }
    }
    row
}

fn timestamp_value(at: DateTime<Utc>) -> JsonValue {
    JsonValue::String(at.to_rfc3339_opts(SecondsFormat::Micros, true))
}

fn distinct_values(rows: &[Row], column: &str) -> Vec<JsonValue> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter_map(|row| row.get(column))
        .filter(|value| !value.is_null())
        .filter(|value| seen.insert(value.to_string()))
        .cloned()
        .collect()
}

fn invalid(column: &ColumnSpec, reason: &str) -> QueryError {
    QueryError::InvalidValue {
        column: column.name.to_string(),
        reason: reason.to_string(),
    }
}

fn unscoped_write(spec: &TableSpec) -> QueryError {
    QueryError::InvalidValue {
        column: spec.name.to_string(),
        reason: "writes must be scoped by at least one filter".to_string(),
    }
}

pub(crate) fn backend_error(error: DbErr) -> QueryError {
    QueryError::Backend(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::storage::catalog::{MESSAGES, TICKETS};
    use sea_orm::sea_query::{PostgresQueryBuilder, QueryStatementWriter, SqliteQueryBuilder};
    use serde_json::json;

    const TAGGED: TableSpec = TableSpec {
        name: "tagged",
        columns: &[
            ColumnSpec {
                name: "id",
                kind: ColumnKind::Text,
            },
            ColumnSpec {
                name: "tags",
                kind: ColumnKind::Json,
            },
        ],
        primary_key: &["id"],
        id_strategy: IdStrategy::Uuid,
        relations: &[],
    };

    fn render(spec: &TableSpec, options: &QueryOptions) -> String {
        let projection = options.projection().unwrap();
        build_select(spec, &projection, options, &[], DbBackend::Sqlite)
            .unwrap()
            .to_string(SqliteQueryBuilder)
    }

    #[test]
    fn defaults_select_everything_unbounded() {
        assert_eq!(
            render(&TICKETS, &QueryOptions::new()),
            r#"SELECT * FROM "tickets""#
        );
    }

    #[test]
    fn filters_sorts_and_window_apply_in_order() {
        let options = QueryOptions::new()
            .eq("status", "open")
            .filter("priority", FilterOp::Neq, "low")
            .order_by("created_at", SortDirection::Desc)
            .order_by("id", SortDirection::Asc)
            .limit(5)
            .offset(10);

        assert_eq!(
            render(&TICKETS, &options),
            r#"SELECT * FROM "tickets" WHERE "status" = 'open' AND "priority" <> 'low' ORDER BY "created_at" DESC, "id" ASC LIMIT 5 OFFSET 10"#
        );
    }

    #[test]
    fn same_options_render_same_shape_for_any_table() {
        let options = QueryOptions::new()
            .filter("created_at", FilterOp::Gte, "2024-01-01T00:00:00Z")
            .order_by("created_at", SortDirection::Desc)
            .offset(0);

        let tickets = render(&TICKETS, &options).replace("\"tickets\"", "T");
        let messages = render(&MESSAGES, &options).replace("\"messages\"", "T");
        assert_eq!(tickets, messages);
        assert!(tickets.ends_with("LIMIT 10 OFFSET 0"));
    }

    #[test]
    fn window_beyond_bigint_is_rejected() {
        let select_err = |options: &QueryOptions| {
            let projection = options.projection().unwrap();
            build_select(&TICKETS, &projection, options, &[], DbBackend::Sqlite).unwrap_err()
        };

        let err = select_err(&QueryOptions::new().limit(10).offset(u64::MAX));
        assert!(matches!(err, QueryError::InvalidValue { ref column, .. } if column == "offset"));

        let err = select_err(&QueryOptions::new().limit(u64::MAX));
        assert!(matches!(err, QueryError::InvalidValue { ref column, .. } if column == "limit"));

        let options = QueryOptions::new().offset(i64::MAX as u64 - 9);
        assert!(render(&TICKETS, &options).ends_with(&format!("LIMIT 10 OFFSET {}", i64::MAX - 9)));
    }

    #[test]
    fn ilike_lowers_both_sides() {
        let options = QueryOptions::new().filter("title", FilterOp::Ilike, "%Printer%");
        assert_eq!(
            render(&TICKETS, &options),
            r#"SELECT * FROM "tickets" WHERE LOWER("title") LIKE LOWER('%Printer%')"#
        );

        let filter = Filter::new("title", FilterOp::Ilike, json!("%Élodie%"));
        let sql = Query::select()
            .column(Asterisk)
            .from(Alias::new("tickets"))
            .and_where(filter_expr(&TICKETS, &filter, DbBackend::Postgres).unwrap())
            .to_string(PostgresQueryBuilder);
        assert_eq!(sql, r#"SELECT * FROM "tickets" WHERE "title" ILIKE '%Élodie%'"#);
    }

    #[test]
    fn in_is_and_not_render() {
        let options = QueryOptions::new()
            .filter("id", FilterOp::In, json!([1, 2, 3]))
            .filter("assigned_agent", FilterOp::Is, JsonValue::Null)
            .filter("status", FilterOp::Not, "closed");
        let sql = render(&TICKETS, &options);

        assert!(sql.contains(r#""id" IN (1, 2, 3)"#), "{sql}");
        assert!(sql.contains(r#""assigned_agent" IS NULL"#), "{sql}");
        assert!(sql.contains(r#"NOT "status" = 'closed'"#) || sql.contains(r#"NOT ("status" = 'closed')"#), "{sql}");
    }

    #[test]
    fn projection_columns_and_join_keys_are_selected() {
        let options = QueryOptions::new().select("chat_id, profiles(full_name)");
        let projection = options.projection().unwrap();
        let sql = build_select(&catalog::CHAT_MEMBERS, &projection, &options, &["profile_id"], DbBackend::Sqlite)
            .unwrap()
            .to_string(SqliteQueryBuilder);
        assert_eq!(sql, r#"SELECT "chat_id", "profile_id" FROM "chat_members""#);
    }

    #[test]
    fn unknown_names_fail_before_sql() {
        let bad_column = QueryOptions::new().eq("password", "x");
        let projection = Projection::all();
        assert!(matches!(
            build_select(&TICKETS, &projection, &bad_column, &[], DbBackend::Sqlite),
            Err(QueryError::UnknownColumn { .. })
        ));

        let bad_relation = QueryOptions::new().select("*, secrets(id)");
        let projection = bad_relation.projection().unwrap();
        assert!(matches!(
            build_select(&TICKETS, &projection, &bad_relation, &[], DbBackend::Sqlite),
            Err(QueryError::UnknownRelation { .. })
        ));

        let bad_sort = QueryOptions::new().order_by("nope", SortDirection::Asc);
        assert!(matches!(
            build_select(&TICKETS, &Projection::all(), &bad_sort, &[], DbBackend::Sqlite),
            Err(QueryError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn values_follow_column_kinds() {
        let id = TICKETS.require_column("id").unwrap();
        assert_eq!(sql_value(id, &json!("42")).unwrap(), SqlValue::from(42i64));
        assert!(sql_value(id, &json!("forty-two")).is_err());

        let created = TICKETS.require_column("created_at").unwrap();
        let value = sql_value(created, &json!("2024-05-01T10:00:00+02:00")).unwrap();
        let expected: DateTime<Utc> = "2024-05-01T08:00:00Z".parse().unwrap();
        assert_eq!(value, SqlValue::from(expected));
        assert!(sql_value(created, &json!("yesterday")).is_err());

        let title = TICKETS.require_column("title").unwrap();
        assert!(sql_value(title, &json!({ "nested": true })).is_err());
    }

    #[test]
    fn array_operators_need_json_columns() {
        let filter = Filter::new("title", FilterOp::Contains, json!(["a"]));
        assert!(filter_expr(&TICKETS, &filter, DbBackend::Sqlite).is_err());

        let filter = Filter::new("tags", FilterOp::Contains, json!(["a", "b"]));
        let sqlite = Query::select()
            .column(Asterisk)
            .from(Alias::new("tagged"))
            .and_where(filter_expr(&TAGGED, &filter, DbBackend::Sqlite).unwrap())
            .to_string(SqliteQueryBuilder);
        assert!(sqlite.contains(r#"json_each("tags")"#), "{sqlite}");

        let filter = Filter::new("tags", FilterOp::Overlaps, json!(["a"]));
        let postgres = Query::select()
            .column(Asterisk)
            .from(Alias::new("tagged"))
            .and_where(filter_expr(&TAGGED, &filter, DbBackend::Postgres).unwrap())
            .to_string(PostgresQueryBuilder);
        assert!(postgres.contains("jsonb_array_elements"), "{postgres}");
    }

    #[test]
    fn insert_defaults_fill_ids_and_timestamps() {
        let now = Utc::now();
        let row = with_insert_defaults(&MESSAGES, Row::new(), now);
        assert!(row.get("id").and_then(JsonValue::as_str).is_some());
        assert_eq!(row.get("created_at"), Some(&timestamp_value(now)));

        let ticket = with_insert_defaults(&TICKETS, Row::new(), now);
        assert!(!ticket.contains_key("id"));
        assert!(ticket.contains_key("updated_at"));
    }
}
