use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand};

use crate::db::Database;
use crate::models::{ClientChanges, ClientPhone, ClientSearch, NewClient};

#[derive(Parser, Debug)]
#[command(version, about = "Client manager: clients and their phone numbers in PostgreSQL")]
pub struct Cli {
    /// PostgreSQL connection URL. Falls back to DATABASE_URL (also read from .env).
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the clients and phones tables if they do not exist
    CreateSchema,
    /// Drop the phones and clients tables
    DropSchema,
    /// Add a client, optionally with phone numbers
    AddClient {
        #[arg(long)]
        first: String,
        #[arg(long)]
        last: String,
        #[arg(long)]
        email: String,
        /// Phone number; repeat for several
        #[arg(long = "phone", action = ArgAction::Append)]
        phones: Vec<String>,
    },
    /// Add a phone number to an existing client
    AddPhone {
        #[arg(long)]
        client_id: i32,
        #[arg(long)]
        phone: String,
    },
    /// Change client fields; given phones replace all existing ones
    ChangeClient(ChangeClientArgs),
    /// Remove one phone number from a client
    DeletePhone {
        #[arg(long)]
        client_id: i32,
        #[arg(long)]
        phone: String,
    },
    /// Delete a client together with its phones
    DeleteClient {
        #[arg(long)]
        client_id: i32,
    },
    /// Find clients matching every given field
    FindClient(SearchArgs),
    /// Print every client with its phones
    List,
    /// Run the full walkthrough on a fresh schema
    Demo,
}

#[derive(Args, Debug)]
pub struct ChangeClientArgs {
    #[arg(long)]
    pub client_id: i32,
    #[arg(long)]
    pub first: Option<String>,
    #[arg(long)]
    pub last: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    /// Replacement phone number; repeat for several
    #[arg(long = "phone", action = ArgAction::Append, conflicts_with = "clear_phones")]
    pub phones: Vec<String>,
    /// Remove all phone numbers from the client
    #[arg(long, action = ArgAction::SetTrue)]
    pub clear_phones: bool,
}

impl From<ChangeClientArgs> for ClientChanges {
    fn from(args: ChangeClientArgs) -> Self {
        let phones = if args.clear_phones {
            Some(Vec::new())
        } else if args.phones.is_empty() {
            None
        } else {
            Some(args.phones)
        };
        ClientChanges {
            first_name: args.first,
            last_name: args.last,
            email: args.email,
            phones,
        }
    }
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    #[arg(long)]
    pub first: Option<String>,
    #[arg(long)]
    pub last: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
}

impl From<SearchArgs> for ClientSearch {
    fn from(args: SearchArgs) -> Self {
        ClientSearch {
            first_name: args.first,
            last_name: args.last,
            email: args.email,
            phone: args.phone,
        }
    }
}

pub fn print_rows(rows: &[ClientPhone]) {
    if rows.is_empty() {
        println!("(no clients)");
        return;
    }
    println!(
        "{:>4}  {:<20} {:<20} {:<30} {}",
        "id", "first name", "last name", "email", "phone"
    );
    for row in rows {
        println!("{row}");
    }
}

pub async fn run(db: &Database, command: Commands) -> Result<()> {
    match command {
        Commands::CreateSchema => {
            db.create_schema().await?;
            println!("Schema created");
        }
        Commands::DropSchema => {
            db.drop_schema().await?;
            println!("Schema dropped");
        }
        Commands::AddClient {
            first,
            last,
            email,
            phones,
        } => {
            let client = db
                .add_client(&NewClient::new(&first, &last, &email).with_phones(phones))
                .await?;
            println!("Client created: {client:?}");
        }
        Commands::AddPhone { client_id, phone } => {
            let phone = db.add_phone(client_id, &phone).await?;
            println!("Phone added: {phone:?}");
        }
        Commands::ChangeClient(args) => {
            let client_id = args.client_id;
            db.change_client(client_id, &args.into()).await?;
            println!("Client {client_id} changed");
        }
        Commands::DeletePhone { client_id, phone } => {
            db.delete_phone(client_id, &phone).await?;
            println!("Phone {phone} removed from client {client_id}");
        }
        Commands::DeleteClient { client_id } => {
            db.delete_client(client_id).await?;
            println!("Client {client_id} deleted");
        }
        Commands::FindClient(args) => {
            print_rows(&db.find_client(&args.into()).await?);
        }
        Commands::List => {
            print_rows(&db.list_clients().await?);
        }
        Commands::Demo => demo(db).await?,
    }

    Ok(())
}

/// Drops and recreates the schema, then exercises every operation in turn.
async fn demo(db: &Database) -> Result<()> {
    db.drop_schema().await?;

    println!("\n1. Create the schema");
    db.create_schema().await?;

    println!("\n2. Add clients");
    let sergey = db
        .add_client(&NewClient::new("Sergey", "Medvedev", "asd@asd.com"))
        .await?;
    let mut phones = vec!["88005553555".to_string()];
    db.add_client(&NewClient::new("Stas", "Basov", "asd@asd2.com").with_phones(phones.clone()))
        .await?;
    phones.push("88005553556".to_string());
    let ivan = db
        .add_client(&NewClient::new("Ivan", "Ivanov", "asd@asd3.com").with_phones(phones))
        .await?;
    print_rows(&db.list_clients().await?);

    println!("\n3. Add a phone to an existing client");
    db.add_phone(sergey.id, "88005553557").await?;
    print_rows(&db.list_clients().await?);

    println!("\n4. Change a client");
    let changes = ClientChanges {
        first_name: Some("Serge".to_string()),
        email: Some("qwe@qwe.com".to_string()),
        phones: Some(vec!["12323121323".to_string(), "77777777777".to_string()]),
        ..ClientChanges::default()
    };
    db.change_client(sergey.id, &changes).await?;
    print_rows(&db.list_clients().await?);

    println!("\n5. Delete a phone");
    db.delete_phone(sergey.id, "77777777777").await?;
    print_rows(&db.list_clients().await?);

    println!("\n6. Delete a client");
    db.delete_client(ivan.id).await?;
    print_rows(&db.list_clients().await?);

    println!("\n7. Find a client by phone");
    print_rows(&db.find_client(&ClientSearch::by_phone("12323121323")).await?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_client_collects_phones() {
        let cli = Cli::parse_from([
            "client_manager",
            "add-client",
            "--first",
            "A",
            "--last",
            "B",
            "--email",
            "a@b.com",
            "--phone",
            "1234567",
            "--phone",
            "7654321",
        ]);
        match cli.command {
            Commands::AddClient { phones, .. } => assert_eq!(phones, ["1234567", "7654321"]),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_change_client_without_phones_leaves_them() {
        let cli = Cli::parse_from([
            "client_manager",
            "change-client",
            "--client-id",
            "3",
            "--first",
            "Ivan",
        ]);
        let Commands::ChangeClient(args) = cli.command else {
            panic!("expected change-client");
        };
        let changes: ClientChanges = args.into();
        assert_eq!(changes.first_name.as_deref(), Some("Ivan"));
        assert!(changes.email.is_none());
        assert!(changes.phones.is_none());
    }

    #[test]
    fn test_clear_phones_means_empty_replacement() {
        let cli = Cli::parse_from([
            "client_manager",
            "change-client",
            "--client-id",
            "3",
            "--clear-phones",
        ]);
        let Commands::ChangeClient(args) = cli.command else {
            panic!("expected change-client");
        };
        let changes: ClientChanges = args.into();
        assert_eq!(changes.phones, Some(Vec::new()));
    }

    #[test]
    fn test_clear_phones_conflicts_with_phone() {
        let result = Cli::try_parse_from([
            "client_manager",
            "change-client",
            "--client-id",
            "3",
            "--phone",
            "1234567",
            "--clear-phones",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_database_url() {
        let cli = Cli::parse_from([
            "client_manager",
            "list",
            "--database-url",
            "postgres://localhost/crm",
        ]);
        assert_eq!(cli.database_url.as_deref(), Some("postgres://localhost/crm"));
        assert!(matches!(cli.command, Commands::List));
    }

    #[test]
    fn test_find_client_args() {
        let cli = Cli::parse_from(["client_manager", "find-client", "--phone", "12323121323"]);
        let Commands::FindClient(args) = cli.command else {
            panic!("expected find-client");
        };
        let search: ClientSearch = args.into();
        assert_eq!(search.phone.as_deref(), Some("12323121323"));
        assert!(search.first_name.is_none());
    }
}
