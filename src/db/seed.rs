use rand::seq::SliceRandom;
use rand::Rng;
use rusqlite::Connection;

use super::collections::insert_collection;
use super::contributors::insert_contributor;
use super::models::{NewCollection, NewContributor};
use crate::money::Amount;

const WORDS: &[&str] = &[
    "community", "garden", "library", "shelter", "school", "bus", "clinic", "well", "roof", "music",
    "festival", "bridge", "park", "kitchen", "repair", "youth", "art", "river", "cleanup", "books",
];

const NAMES: &[&str] = &[
    "Ada Lovelace", "Grace Hopper", "Alan Turing", "Edsger Dijkstra", "Barbara Liskov",
    "Donald Knuth", "Frances Allen", "Ken Thompson", "Margaret Hamilton", "John Backus",
];

fn words<R: Rng>(rng: &mut R, count: usize) -> String {
    (0..count)
        .filter_map(|_| WORDS.choose(rng).copied())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Inserts `collections` demo collections with `contributors_each` contributors apiece.
///
/// Targets fall between 10 000 and 100 000, contributions between 1 and 1000.
pub fn seed_demo_data<R: Rng>(
    conn: &mut Connection,
    rng: &mut R,
    collections: usize,
    contributors_each: usize,
) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    for _ in 0..collections {
        let title_len = rng.gen_range(1..=5);
        let description_len = rng.gen_range(5..=10);
        let slug = words(rng, 2).replace(' ', "-");
        let collection = insert_collection(
            &tx,
            &NewCollection {
                title: words(rng, title_len),
                description: format!("{}.", words(rng, description_len)),
                target_amount: Amount::from_cents(rng.gen_range(1_000_000..=10_000_000)),
                link: format!("https://example.org/campaigns/{}", slug),
            },
        )?;

        for _ in 0..contributors_each {
            let name = NAMES.choose(rng).copied().unwrap_or("Anonymous");
            insert_contributor(
                &tx,
                collection.id,
                &NewContributor {
                    user_name: name.to_string(),
                    amount: Amount::from_cents(rng.gen_range(100..=100_000)),
                },
            )?;
        }
    }
    tx.commit()
}
