pub mod query;
pub mod schema;

use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool};
use tracing::info;

use crate::config::Config;
use crate::error::{CrmError, Result};
use crate::models::{Client, ClientChanges, ClientPhone, ClientSearch, NewClient, Phone};
use crate::validate::{check_email, check_name, check_phone, check_phones};
use query::{Column, Record, Table, Value};

/// Owns the database connection for the lifetime of the program.
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(config: &Config) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(config.database_url())
            .await?;

        Ok(Self { pool })
    }

    /// Close the connection. Pending operations finish first.
    pub async fn close(self) {
        self.pool.close().await;
    }

    // Schema operations
    pub async fn create_schema(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        schema::create_schema(&mut conn).await?;
        info!("schema created");
        Ok(())
    }

    pub async fn drop_schema(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        schema::drop_schema(&mut conn).await?;
        info!("schema dropped");
        Ok(())
    }

    // Client operations
    pub async fn add_client(&self, new_client: &NewClient) -> Result<Client> {
        check_name("first name", &new_client.first_name)?;
        check_name("last name", &new_client.last_name)?;
        check_email(&new_client.email)?;
        check_phones(&new_client.phones)?;

        let mut tx = self.pool.begin().await?;

        let record = query::insert(&mut tx, Table::Clients, new_client.insert_fields()).await?;
        for phone in &new_client.phones {
            insert_phone(&mut tx, record.id, phone).await?;
        }

        tx.commit().await?;

        let client = Client {
            id: record.id,
            first_name: echoed(&record, Column::FirstName),
            last_name: echoed(&record, Column::LastName),
            email: echoed(&record, Column::Email),
        };
        info!(
            client_id = client.id,
            phones = new_client.phones.len(),
            "client created"
        );

        Ok(client)
    }

    pub async fn change_client(&self, client_id: i32, changes: &ClientChanges) -> Result<()> {
        if changes.is_empty() {
            return Err(CrmError::EmptyFields("update"));
        }
        if let Some(first_name) = &changes.first_name {
            check_name("first name", first_name)?;
        }
        if let Some(last_name) = &changes.last_name {
            check_name("last name", last_name)?;
        }
        if let Some(email) = &changes.email {
            check_email(email)?;
        }
        if let Some(phones) = &changes.phones {
            check_phones(phones)?;
        }

        let mut tx = self.pool.begin().await?;

        if changes.touches_client_row() {
            let updated =
                query::update(&mut tx, Table::Clients, client_id, &changes.client_fields()).await?;
            if updated == 0 {
                return Err(client_not_found(client_id));
            }
        } else {
            ensure_client_exists(&mut tx, client_id).await?;
        }

        if let Some(phones) = &changes.phones {
            replace_phones(&mut tx, client_id, phones).await?;
        }

        tx.commit().await?;
        info!(client_id, "client changed");

        Ok(())
    }

    pub async fn change_client_phones(&self, client_id: i32, phones: &[String]) -> Result<()> {
        check_phones(phones)?;

        let mut tx = self.pool.begin().await?;
        ensure_client_exists(&mut tx, client_id).await?;
        replace_phones(&mut tx, client_id, phones).await?;
        tx.commit().await?;

        info!(client_id, phones = phones.len(), "client phones replaced");
        Ok(())
    }

    /// Phones go with the client through `ON DELETE CASCADE`.
    pub async fn delete_client(&self, client_id: i32) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        let deleted = query::delete(
            &mut conn,
            Table::Clients,
            &[(Column::Id, Some(Value::from(client_id)))],
        )
        .await?;

        if deleted == 0 {
            return Err(client_not_found(client_id));
        }
        info!(client_id, "client deleted");
        Ok(())
    }

    // Phone operations
    pub async fn add_phone(&self, client_id: i32, phone: &str) -> Result<Phone> {
        check_phone(phone)?;

        let mut conn = self.pool.acquire().await?;
        let phone = insert_phone(&mut conn, client_id, phone).await?;

        info!(client_id, phone_id = phone.id, "phone added");
        Ok(phone)
    }

    pub async fn delete_phone(&self, client_id: i32, phone: &str) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        let deleted = query::delete(
            &mut conn,
            Table::Phones,
            &[
                (Column::ClientId, Some(Value::from(client_id))),
                (Column::Phone, Some(Value::from(phone))),
            ],
        )
        .await?;

        if deleted == 0 {
            return Err(CrmError::NotFound {
                table: Table::Phones,
                key: format!("client_id = {client_id}, phone = {phone}"),
            });
        }
        info!(client_id, "phone deleted");
        Ok(())
    }

    // Search
    pub async fn find_client(&self, search: &ClientSearch) -> Result<Vec<ClientPhone>> {
        let mut conn = self.pool.acquire().await?;
        query::select(&mut conn, &search.filters()).await
    }

    pub async fn list_clients(&self) -> Result<Vec<ClientPhone>> {
        let mut conn = self.pool.acquire().await?;
        query::select(&mut conn, &[]).await
    }
}

fn client_not_found(client_id: i32) -> CrmError {
    CrmError::NotFound {
        table: Table::Clients,
        key: format!("id = {client_id}"),
    }
}

async fn insert_phone(conn: &mut PgConnection, client_id: i32, phone: &str) -> Result<Phone> {
    let record = query::insert(
        conn,
        Table::Phones,
        vec![
            (Column::ClientId, Value::from(client_id)),
            (Column::Phone, Value::from(phone)),
        ],
    )
    .await?;

    Ok(Phone {
        id: record.id,
        client_id,
        phone: echoed(&record, Column::Phone),
    })
}

fn echoed(record: &Record, column: Column) -> String {
    record.text(column).unwrap_or_default().to_string()
}

async fn replace_phones(conn: &mut PgConnection, client_id: i32, phones: &[String]) -> Result<()> {
    query::delete(
        &mut *conn,
        Table::Phones,
        &[(Column::ClientId, Some(Value::from(client_id)))],
    )
    .await?;

    for phone in phones {
        insert_phone(&mut *conn, client_id, phone).await?;
    }

    Ok(())
}

/// Locks the client row so a concurrent delete cannot slip in before the
/// phones are written.
async fn ensure_client_exists(conn: &mut PgConnection, client_id: i32) -> Result<()> {
    let found: Option<i32> = sqlx::query_scalar("SELECT id FROM clients WHERE id = $1 FOR UPDATE")
        .bind(client_id)
        .fetch_optional(&mut *conn)
        .await?;

    match found {
        Some(_) => Ok(()),
        None => Err(client_not_found(client_id)),
    }
}

/// Initialize the database connection
pub async fn init(config: &Config) -> Result<Database> {
    let db = Database::new(config).await?;

    Ok(db)
}
