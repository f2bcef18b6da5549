//! Load testing tool
//!
//! Exercises the event log store directly with deposit events, bypassing
//! the idempotency/bus/HTTP layers, to measure append throughput under the
//! optimistic-concurrency write path.
//!
//! Run with: cargo run --bin load_test --release -- --events 1000 --wallets 50

use std::time::Instant;

use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use wallet_ledger::aggregate::{Aggregate, Wallet};
use wallet_ledger::domain::Amount;
use wallet_ledger::event_store::EventLogStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    let event_count: u64 = args
        .iter()
        .position(|a| a == "--events")
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(1000);
    let wallet_count: u64 = args
        .iter()
        .position(|a| a == "--wallets")
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(50);

    let database_url = std::env::var("DB_WRITE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("DB_WRITE_URL or DATABASE_URL must be set");

    println!("Load test - appending {event_count} deposit events across {wallet_count} wallets");
    println!("Connecting to database...");

    let pool = PgPoolOptions::new().max_connections(10).connect(&database_url).await?;
    let store = EventLogStore::new(pool);

    let wallet_ids: Vec<Uuid> = (0..wallet_count).map(|_| Uuid::new_v4()).collect();
    let amount = Amount::new(rust_decimal::Decimal::new(100, 0))?;

    let start = Instant::now();
    let mut success_count = 0u64;

    for i in 0..event_count {
        let wallet_id = wallet_ids[(i % wallet_count.max(1)) as usize];

        let existing = store.load(wallet_id).await?;
        let events = EventLogStore::as_wallet_events(&existing)?;
        let wallet = Wallet::fold(wallet_id, events);

        let event = wallet.deposit(amount, Uuid::new_v4());
        let new_event = wallet_ledger::event_store::NewEvent::from_wallet_event(&event)?;

        let result = store
            .append(wallet_id, Wallet::aggregate_type(), vec![new_event], wallet.version())
            .await;

        if result.is_ok() {
            success_count += 1;
        }

        if (i + 1) % 1000 == 0 {
            println!("Appended {} events...", i + 1);
        }
    }

    let elapsed = start.elapsed();
    let rate = success_count as f64 / elapsed.as_secs_f64();

    println!("\n=== Load Test Results ===");
    println!("Total events: {event_count}");
    println!("Successful: {success_count}");
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!("Rate: {rate:.0} events/sec");

    Ok(())
}
