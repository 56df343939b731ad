//! Parameterized statement builders over the two known tables.
//!
//! Only identifiers from [`Table`] and [`Column`] are ever written into SQL
//! text. Every value goes through `push_bind`, so user input never ends up in
//! the statement itself.

use std::fmt;

use sqlx::{PgConnection, Postgres, QueryBuilder};
use tracing::debug;

use crate::error::{CrmError, Result};
use crate::models::ClientPhone;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Clients,
    Phones,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Clients => "clients",
            Table::Phones => "phones",
        }
    }

    /// Alias used in the joined select.
    fn alias(self) -> &'static str {
        match self {
            Table::Clients => "c",
            Table::Phones => "p",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Id,
    FirstName,
    LastName,
    Email,
    Phone,
    ClientId,
}

impl Column {
    pub fn name(self) -> &'static str {
        match self {
            Column::Id => "id",
            Column::FirstName => "first_name",
            Column::LastName => "last_name",
            Column::Email => "email",
            Column::Phone => "phone",
            Column::ClientId => "client_id",
        }
    }

    /// Owning table, or `None` for `id` which every table has.
    fn table(self) -> Option<Table> {
        match self {
            Column::Id => None,
            Column::FirstName | Column::LastName | Column::Email => Some(Table::Clients),
            Column::Phone | Column::ClientId => Some(Table::Phones),
        }
    }

    fn belongs_to(self, table: Table) -> bool {
        self.table().is_none_or(|owner| owner == table)
    }

    /// Alias-qualified name for the joined select. A bare `id` means the client.
    fn qualified(self) -> String {
        let table = self.table().unwrap_or(Table::Clients);
        format!("{}.{}", table.alias(), self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i32),
    Text(String),
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// Column/value pairs where `None` marks a field the caller did not supply.
pub type Fields = Vec<(Column, Option<Value>)>;

/// Result of an insert: the generated key plus the fields that were written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: i32,
    pub fields: Vec<(Column, Value)>,
}

impl Record {
    pub fn get(&self, column: Column) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(col, _)| *col == column)
            .map(|(_, val)| val)
    }

    pub fn text(&self, column: Column) -> Option<&str> {
        match self.get(column) {
            Some(Value::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }
}

fn push_value(builder: &mut QueryBuilder<'static, Postgres>, value: &Value) {
    match value {
        Value::Int(v) => builder.push_bind(*v),
        Value::Text(v) => builder.push_bind(v.clone()),
    };
}

fn present(fields: &[(Column, Option<Value>)]) -> Vec<(Column, &Value)> {
    fields
        .iter()
        .filter_map(|(col, val)| val.as_ref().map(|v| (*col, v)))
        .collect()
}

fn check_columns<'a, I>(table: Table, columns: I) -> Result<()>
where
    I: IntoIterator<Item = &'a Column>,
{
    for column in columns {
        if !column.belongs_to(table) {
            return Err(CrmError::ColumnMismatch {
                column: *column,
                table,
            });
        }
    }
    Ok(())
}

fn push_conjunction(
    builder: &mut QueryBuilder<'static, Postgres>,
    filters: &[(Column, &Value)],
    name: impl Fn(Column) -> String,
) {
    for (i, (column, value)) in filters.iter().enumerate() {
        if i > 0 {
            builder.push(" AND ");
        }
        builder.push(name(*column));
        builder.push(" = ");
        push_value(builder, value);
    }
}

pub fn build_insert(
    table: Table,
    fields: &[(Column, Value)],
) -> Result<QueryBuilder<'static, Postgres>> {
    if fields.is_empty() {
        return Err(CrmError::EmptyFields("insert"));
    }
    check_columns(table, fields.iter().map(|(col, _)| col))?;

    let mut builder = QueryBuilder::new(format!("INSERT INTO {table} ("));
    for (i, (column, _)) in fields.iter().enumerate() {
        if i > 0 {
            builder.push(", ");
        }
        builder.push(column.name());
    }
    builder.push(") VALUES (");
    for (i, (_, value)) in fields.iter().enumerate() {
        if i > 0 {
            builder.push(", ");
        }
        push_value(&mut builder, value);
    }
    builder.push(") RETURNING id");

    Ok(builder)
}

pub fn build_update(
    table: Table,
    id: i32,
    fields: &[(Column, Option<Value>)],
) -> Result<QueryBuilder<'static, Postgres>> {
    let fields = present(fields);
    if fields.is_empty() {
        return Err(CrmError::EmptyFields("update"));
    }
    check_columns(table, fields.iter().map(|(col, _)| col))?;

    let mut builder = QueryBuilder::new(format!("UPDATE {table} SET "));
    for (i, (column, value)) in fields.iter().enumerate() {
        if i > 0 {
            builder.push(", ");
        }
        builder.push(column.name());
        builder.push(" = ");
        push_value(&mut builder, value);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);

    Ok(builder)
}

pub fn build_delete(
    table: Table,
    filters: &[(Column, Option<Value>)],
) -> Result<QueryBuilder<'static, Postgres>> {
    let filters = present(filters);
    // An empty filter would turn into an unconditional DELETE.
    if filters.is_empty() {
        return Err(CrmError::EmptyFields("delete"));
    }
    check_columns(table, filters.iter().map(|(col, _)| col))?;

    let mut builder = QueryBuilder::new(format!("DELETE FROM {table} WHERE "));
    push_conjunction(&mut builder, &filters, |col| col.name().to_string());

    Ok(builder)
}

pub fn build_select(filters: &[(Column, Option<Value>)]) -> QueryBuilder<'static, Postgres> {
    let filters = present(filters);

    let mut builder = QueryBuilder::new(
        "SELECT c.id AS client_id, c.first_name, c.last_name, c.email, p.phone \
         FROM clients c LEFT JOIN phones p ON p.client_id = c.id",
    );
    if !filters.is_empty() {
        builder.push(" WHERE ");
        push_conjunction(&mut builder, &filters, Column::qualified);
    }
    builder.push(" ORDER BY c.id, p.id");

    builder
}

/// Insert one row and return its generated id with the echoed fields.
pub async fn insert(
    conn: &mut PgConnection,
    table: Table,
    fields: Vec<(Column, Value)>,
) -> Result<Record> {
    let mut builder = build_insert(table, &fields)?;
    debug!(sql = builder.sql(), "insert");

    let id: i32 = builder.build_query_scalar().fetch_one(&mut *conn).await?;

    Ok(Record { id, fields })
}

/// Update the supplied fields of row `id`. Returns the number of rows touched.
pub async fn update(
    conn: &mut PgConnection,
    table: Table,
    id: i32,
    fields: &[(Column, Option<Value>)],
) -> Result<u64> {
    let mut builder = build_update(table, id, fields)?;
    debug!(sql = builder.sql(), "update");

    let result = builder.build().execute(&mut *conn).await?;

    Ok(result.rows_affected())
}

/// Delete rows matching every supplied filter. At least one filter is required.
pub async fn delete(
    conn: &mut PgConnection,
    table: Table,
    filters: &[(Column, Option<Value>)],
) -> Result<u64> {
    let mut builder = build_delete(table, filters)?;
    debug!(sql = builder.sql(), "delete");

    let result = builder.build().execute(&mut *conn).await?;

    Ok(result.rows_affected())
}

/// Select joined client/phone rows matching every supplied filter.
pub async fn select(
    conn: &mut PgConnection,
    filters: &[(Column, Option<Value>)],
) -> Result<Vec<ClientPhone>> {
    let mut builder = build_select(filters);
    debug!(sql = builder.sql(), "select");

    let rows = builder
        .build_query_as::<ClientPhone>()
        .fetch_all(&mut *conn)
        .await?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_uses_placeholders() {
        let fields = vec![
            (Column::FirstName, Value::from("Robert'); DROP TABLE clients;--")),
            (Column::LastName, Value::from("Tables")),
            (Column::Email, Value::from("bobby@tables.com")),
        ];
        let builder = build_insert(Table::Clients, &fields).unwrap();
        assert_eq!(
            builder.sql(),
            "INSERT INTO clients (first_name, last_name, email) VALUES ($1, $2, $3) RETURNING id"
        );
    }

    #[test]
    fn test_insert_rejects_foreign_column() {
        let fields = vec![(Column::Email, Value::from("a@b.com"))];
        let err = build_insert(Table::Phones, &fields).err().unwrap();
        assert!(matches!(
            err,
            CrmError::ColumnMismatch {
                column: Column::Email,
                table: Table::Phones
            }
        ));
    }

    #[test]
    fn test_update_skips_absent_fields() {
        let fields = vec![
            (Column::FirstName, Some(Value::from("Sergey"))),
            (Column::LastName, None),
            (Column::Email, Some(Value::from("qwe@qwe.com"))),
        ];
        let builder = build_update(Table::Clients, 1, &fields).unwrap();
        assert_eq!(
            builder.sql(),
            "UPDATE clients SET first_name = $1, email = $2 WHERE id = $3"
        );
    }

    #[test]
    fn test_update_with_nothing_to_set_is_rejected() {
        let fields = vec![(Column::FirstName, None), (Column::Email, None)];
        let err = build_update(Table::Clients, 1, &fields).err().unwrap();
        assert!(matches!(err, CrmError::EmptyFields("update")));
    }

    #[test]
    fn test_delete_joins_filters_with_and() {
        let filters = vec![
            (Column::ClientId, Some(Value::from(1))),
            (Column::Phone, Some(Value::from("77777777777"))),
        ];
        let builder = build_delete(Table::Phones, &filters).unwrap();
        assert_eq!(
            builder.sql(),
            "DELETE FROM phones WHERE client_id = $1 AND phone = $2"
        );
    }

    #[test]
    fn test_delete_without_filters_is_rejected() {
        assert!(matches!(
            build_delete(Table::Phones, &[]),
            Err(CrmError::EmptyFields("delete"))
        ));
        assert!(matches!(
            build_delete(Table::Clients, &[(Column::Id, None)]),
            Err(CrmError::EmptyFields("delete"))
        ));
    }

    #[test]
    fn test_select_all_rows() {
        let builder = build_select(&[(Column::Email, None)]);
        assert_eq!(
            builder.sql(),
            "SELECT c.id AS client_id, c.first_name, c.last_name, c.email, p.phone \
             FROM clients c LEFT JOIN phones p ON p.client_id = c.id ORDER BY c.id, p.id"
        );
    }

    #[test]
    fn test_select_qualifies_filters() {
        let filters = vec![
            (Column::FirstName, Some(Value::from("Ivan"))),
            (Column::Phone, Some(Value::from("88005553555"))),
        ];
        let sql = build_select(&filters).sql().to_string();
        assert!(sql.ends_with(
            "WHERE c.first_name = $1 AND p.phone = $2 ORDER BY c.id, p.id"
        ));
    }

    #[test]
    fn test_record_lookup() {
        let record = Record {
            id: 7,
            fields: vec![
                (Column::ClientId, Value::from(3)),
                (Column::Phone, Value::from("1234567")),
            ],
        };
        assert_eq!(record.get(Column::ClientId), Some(&Value::Int(3)));
        assert_eq!(record.text(Column::Phone), Some("1234567"));
        assert_eq!(record.text(Column::ClientId), None);
        assert_eq!(record.get(Column::Email), None);
    }
}
