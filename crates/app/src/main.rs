use clap::{Parser, Subcommand};
use migration::{Migrator, MigratorTrait};

mod settings;

#[derive(Parser, Debug)]
#[command(name = "moneytrack")]
#[command(about = "Personal finance tracker: accounts, balance readings and transactions")]
struct Cli {
    /// Settings file, without extension (also read from `MONEYTRACK_CONFIG`).
    #[arg(long, env = "MONEYTRACK_CONFIG", default_value = "settings")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Default)]
enum Command {
    /// Apply migrations and seed the predefined categories.
    #[default]
    Init,
    /// Seed the predefined categories only.
    Seed,
    /// Print income and expense totals.
    Totals,
    /// Print the latest balance of every account.
    LatestReadings,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = settings::Settings::new(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "moneytrack={level},engine={level},migration={level}",
            level = settings.app.level
        ))
        .init();

    let database = sea_orm::Database::connect(settings.database.url()).await?;
    Migrator::up(&database, None).await?;
    tracing::info!("database ready");

    let engine = engine::Engine::builder().database(database).build().await?;

    match cli.command.unwrap_or_default() {
        Command::Init | Command::Seed => {
            let created = engine.seed_predefined_categories().await?;
            println!("seeded {created} categories");
        }
        Command::Totals => {
            let income = engine.income_total().await?;
            let expense = engine.expense_total().await?;
            println!("income:  {}", income.total);
            println!("expense: {}", expense.total);
        }
        Command::LatestReadings => {
            let latest = engine.latest_readings().await?;
            if latest.is_empty() {
                println!("no readings");
            }
            for entry in latest {
                println!(
                    "{}: {} ({})",
                    entry.account_name,
                    entry.reading.amount,
                    entry.reading.reading_date.format("%Y-%m-%d %H:%M")
                );
            }
        }
    }

    Ok(())
}
