use anyhow::Context;
use clap::{Parser, Subcommand};

use bookstore_app::modules::books::{
    models::{BookId, Quantity, STARTER_CATALOG},
    store::{InventoryStore, PgInventoryStore},
};
use bookstore_app::Application;
use bookstore_kernel::settings::Settings;

/// Operate the bookstore service and its inventory
#[derive(Debug, Parser)]
#[command(name = "bookstore-cli", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server until Ctrl-C or SIGTERM
    Serve,
    /// Apply pending schema migrations
    Migrate,
    /// Apply migrations and insert missing starter catalog titles
    Seed,
    /// Print the inventory as JSON
    Books,
    /// Buy units of a book
    Purchase {
        /// Identifier of the book
        #[arg(allow_negative_numbers = true)]
        book_id: i64,
        /// Units to buy
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Reject bad purchase arguments before touching configuration or the database.
    let purchase_args = match &cli.command {
        Command::Purchase { book_id, quantity } => {
            Some((BookId::new(*book_id)?, Quantity::new(*quantity)?))
        }
        _ => None,
    };

    let settings = Settings::load().with_context(|| "failed to load bookstore settings")?;
    bookstore_telemetry::init(&settings.telemetry)?;

    tracing::info!(env = ?settings.environment, command = ?cli.command, "bookstore-cli starting");

    let app = Application::build(settings).await?;

    match cli.command {
        Command::Serve => app.run().await?,
        Command::Migrate => {
            let applied = app.migrate().await?;
            println!("applied {} migration(s)", applied);
        }
        Command::Seed => {
            app.migrate().await?;
            let inserted = store(&app).seed(STARTER_CATALOG).await?;
            println!("inserted {} book(s)", inserted);
        }
        Command::Books => {
            let books = store(&app).list_books().await?;
            println!("{}", serde_json::to_string_pretty(&books)?);
        }
        Command::Purchase { .. } => {
            let (book_id, quantity) =
                purchase_args.context("purchase arguments were not validated")?;
            let receipt = store(&app).purchase(book_id, quantity).await?;
            println!(
                "{}",
                serde_json::json!({
                    "success": true,
                    "bookId": receipt.book_id.get(),
                    "nombre": receipt.name,
                    "quantity": receipt.quantity.get(),
                    "remaining": receipt.remaining,
                })
            );
        }
    }

    Ok(())
}

fn store(app: &Application) -> PgInventoryStore {
    PgInventoryStore::new(app.pool().clone())
}
