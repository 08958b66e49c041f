use rusqlite::Connection;
use std::env;

use crowdfund_tracker::db::{schema, seed};

const SEED_COLLECTIONS: usize = 10;
const SEED_CONTRIBUTORS_EACH: usize = 5;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let seed_requested = env::args().skip(1).any(|arg| arg == "--seed");
    let database_path = env::var("DATABASE_PATH").unwrap_or_else(|_| "crowdfund.db".to_string());

    println!("Starting database migration on {}...", database_path);
    let mut conn = Connection::open(&database_path)
        .map_err(|e| anyhow::anyhow!("Failed to open {}: {}", database_path, e))?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;

    schema::migrate(&conn)?;
    println!("Schema is up to date.");

    if seed_requested {
        println!(
            "Seeding {} collections with {} contributors each...",
            SEED_COLLECTIONS, SEED_CONTRIBUTORS_EACH
        );
        seed::seed_demo_data(
            &mut conn,
            &mut rand::thread_rng(),
            SEED_COLLECTIONS,
            SEED_CONTRIBUTORS_EACH,
        )?;
        println!("Seed data inserted.");
    }

    println!("Migration completed successfully.");
    Ok(())
}
