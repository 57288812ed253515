use analytics::StatsCalculator;
use clap::{Parser, Subcommand};
use comfy_table::{Table, presets::UTF8_FULL};
use core_types::{OrderDuration, OrderRequest, OrderSide, OrderType};
use database::{PgStore, connect, run_migrations};
use executor::{OrderExecutor, OrderOutcome};
use ledger::{Ledger, MemoryStore};
use market_data::{AlphaVantageClient, PriceOracle, StaticOracle};
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// The main entry point for the paperbroker application.
#[tokio::main]
async fn main() {
    // Respect RUST_LOG; default to info so order flow is visible.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Parse command-line arguments
    let cli = Cli::parse();

    // Execute the appropriate command
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Demo => handle_demo().await,
        Commands::OpenAccount(args) => {
            let app = App::live().await?;
            let balance = args.balance.unwrap_or(app.opening_balance);
            app.ledger.open_account(&args.username, balance).await?;
            println!("Account '{}' opened with balance ${balance}", args.username);
            Ok(())
        }
        Commands::Buy(args) => {
            let app = App::live().await?;
            let outcome = app.executor().buy(&args.to_request()).await;
            print_outcome(&outcome);
            Ok(())
        }
        Commands::Sell(args) => {
            let app = App::live().await?;
            let outcome = app.executor().sell(&args.to_request()).await;
            print_outcome(&outcome);
            Ok(())
        }
        Commands::Portfolio(args) => {
            let app = App::live().await?;
            handle_portfolio(&app, &args.username).await
        }
        Commands::Stats(args) => {
            let app = App::live().await?;
            handle_stats(&app, &args.username).await
        }
        Commands::History(args) => {
            let app = App::live().await?;
            handle_history(&app, &args.username, args.side).await
        }
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// A simulated stock brokerage: cash accounts, market orders, and a
/// portfolio ledger backed by PostgreSQL.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a self-contained in-memory trading session with fixed prices.
    Demo,
    /// Open a new account with the configured opening balance.
    OpenAccount(OpenAccountArgs),
    /// Buy shares at the current market price.
    Buy(OrderArgs),
    /// Sell shares at the current market price.
    Sell(OrderArgs),
    /// Show current holdings with refreshed prices.
    Portfolio(AccountArgs),
    /// Show aggregate portfolio statistics.
    Stats(AccountArgs),
    /// Show transaction history, most recent first.
    History(HistoryArgs),
}

#[derive(Parser)]
struct AccountArgs {
    /// The account to operate on.
    #[arg(long)]
    username: String,
}

#[derive(Parser)]
struct OpenAccountArgs {
    /// The account to create.
    #[arg(long)]
    username: String,

    /// Opening cash balance; defaults to the configured opening balance.
    #[arg(long)]
    balance: Option<rust_decimal::Decimal>,
}

#[derive(Parser)]
struct OrderArgs {
    /// The account placing the order.
    #[arg(long)]
    username: String,

    /// The ticker symbol (e.g., "AAPL").
    #[arg(long)]
    symbol: String,

    /// Number of shares.
    #[arg(long)]
    quantity: i64,

    /// Company display name; resolved from the quote when omitted.
    #[arg(long, default_value = "")]
    name: String,

    /// Order type label recorded on the transaction ("MARKET" or "LIMIT").
    #[arg(long, default_value = "MARKET")]
    order_type: OrderType,

    /// Time-in-force label recorded on the transaction ("IOC" or "FOK").
    #[arg(long, default_value = "IOC")]
    duration: OrderDuration,
}

impl OrderArgs {
    fn to_request(&self) -> OrderRequest {
        let mut request =
            OrderRequest::market(&self.username, &self.symbol, &self.name, self.quantity);
        request.order_type = self.order_type;
        request.duration = self.duration;
        request
    }
}

#[derive(Parser)]
struct HistoryArgs {
    /// The account to query.
    #[arg(long)]
    username: String,

    /// Restrict to one side ("BUY" or "SELL").
    #[arg(long)]
    side: Option<OrderSide>,
}

// ==============================================================================
// Application Wiring
// ==============================================================================

/// The assembled service graph: one ledger, one price oracle.
struct App {
    ledger: Arc<Ledger>,
    oracle: Arc<dyn PriceOracle>,
    opening_balance: rust_decimal::Decimal,
}

impl App {
    /// Connects to PostgreSQL and the live quote provider.
    async fn live() -> anyhow::Result<Self> {
        let config = configuration::load_config()?;

        let pool = connect().await?;
        run_migrations(&pool).await?;
        let store = Arc::new(PgStore::new(pool));

        let ledger = Arc::new(Ledger::new(store.clone(), store.clone(), store));
        let oracle = Arc::new(AlphaVantageClient::new(&config.market_data));

        Ok(Self {
            ledger,
            oracle,
            opening_balance: config.brokerage.opening_balance,
        })
    }

    /// An entirely in-memory instance with fixed demo prices.
    fn demo() -> Self {
        let store = Arc::new(MemoryStore::new());
        let ledger = Arc::new(Ledger::new(store.clone(), store.clone(), store));
        let oracle = Arc::new(
            StaticOracle::new()
                .with_price("AAPL", dec!(150))
                .with_price("TSLA", dec!(200))
                .with_price("XYZ", dec!(100)),
        );
        Self {
            ledger,
            oracle,
            opening_balance: dec!(1000),
        }
    }

    fn executor(&self) -> OrderExecutor {
        OrderExecutor::new(self.oracle.clone(), self.ledger.clone())
    }

    fn stats(&self) -> StatsCalculator {
        StatsCalculator::new(self.ledger.clone(), self.oracle.clone())
    }
}

// ==============================================================================
// Command Handlers
// ==============================================================================

async fn handle_portfolio(app: &App, username: &str) -> anyhow::Result<()> {
    let balance = app.ledger.balance(username).await?;
    let holdings = app.stats().portfolio(username).await?;

    println!("Cash balance: ${balance}");

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Symbol",
        "Name",
        "Quantity",
        "Avg Cost",
        "Last Price",
        "Market Value",
        "Gain/Loss",
    ]);
    for h in &holdings {
        table.add_row(vec![
            h.symbol.clone(),
            h.display_name.clone(),
            h.quantity.to_string(),
            format!("${}", h.average_cost),
            format!("${}", h.last_price),
            format!("${}", h.market_value()),
            format!("${}", h.gain_loss()),
        ]);
    }
    println!("{table}");
    Ok(())
}

async fn handle_stats(app: &App, username: &str) -> anyhow::Result<()> {
    let stats = app.stats().stats(username).await?;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Metric", "Value"]);
    table.add_row(vec!["Total Value".to_string(), format!("${}", stats.total_value)]);
    table.add_row(vec![
        "Total Gain/Loss".to_string(),
        format!("${}", stats.total_gain_loss),
    ]);
    table.add_row(vec![
        "Total Invested".to_string(),
        format!("${}", stats.total_invested),
    ]);
    table.add_row(vec!["Holdings".to_string(), stats.holdings_count.to_string()]);
    table.add_row(vec![
        "Return %".to_string(),
        format!("{}%", stats.annual_return_pct.round_dp(2)),
    ]);
    println!("{table}");
    Ok(())
}

async fn handle_history(
    app: &App,
    username: &str,
    side: Option<OrderSide>,
) -> anyhow::Result<()> {
    let transactions = app.ledger.transactions(username, side).await?;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Id", "Side", "Symbol", "Quantity", "Fill Price", "Total", "Executed At",
    ]);
    for t in &transactions {
        table.add_row(vec![
            t.id.to_string(),
            t.side.to_string(),
            t.symbol.clone(),
            t.quantity.to_string(),
            format!("${}", t.fill_price),
            format!("${}", t.total_amount),
            t.executed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}

/// Runs a short scripted session against the in-memory stack.
async fn handle_demo() -> anyhow::Result<()> {
    let app = App::demo();
    app.ledger.open_account("demo", app.opening_balance).await?;
    println!("Opened account 'demo' with ${}", app.opening_balance);

    let executor = app.executor();

    let outcome = executor
        .buy(&OrderRequest::market("demo", "XYZ", "", 5))
        .await;
    print_outcome(&outcome);

    let outcome = executor
        .sell(&OrderRequest::market("demo", "XYZ", "", 5))
        .await;
    print_outcome(&outcome);

    handle_portfolio(&app, "demo").await?;
    handle_stats(&app, "demo").await?;
    handle_history(&app, "demo", None).await?;
    Ok(())
}

fn print_outcome(outcome: &OrderOutcome) {
    if outcome.success {
        println!("{}", outcome.message);
        if let Some(receipt) = &outcome.receipt {
            println!(
                "  {} {} x {} @ ${} = ${} (new balance: ${})",
                receipt.side,
                receipt.quantity,
                receipt.symbol,
                receipt.fill_price,
                receipt.total_amount,
                receipt.new_balance
            );
        }
    } else {
        println!("Order failed: {}", outcome.message);
    }
}
