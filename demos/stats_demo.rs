use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;

use clap::Parser;
use perturb_hash::HashTable;
use perturb_hash::hash_table::Entry;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "target_capacity", default_value_t = 1000)]
    target_capacity: usize,

    /// Percentage of the inserted values to remove again afterwards.
    #[arg(short = 'r', long = "remove_percent", default_value_t = 25)]
    remove_percent: u64,
}

fn hash_u64(value: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn main() {
    let args = Args::parse();

    println!(
        "Creating HashTable with target capacity: {}",
        args.target_capacity
    );

    let mut table: HashTable<u64> = HashTable::with_capacity(args.target_capacity);
    let initial_capacity = table.capacity();

    println!("Actual capacity: {}", initial_capacity);
    println!("Filling table with u64 values...");

    let num_values = args.target_capacity as u64;
    for value in 0..num_values {
        match table.entry(hash_u64(value), |&v| v == value) {
            Entry::Vacant(entry) => {
                entry.insert(value);
            }
            Entry::Occupied(_) => {
                panic!("Value already exists in table: {}", value);
            }
        }
    }

    println!("Inserted {} values into table", table.len());
    if table.capacity() != initial_capacity {
        println!("Table grew to {} slots", table.capacity());
    }
    println!(
        "Final load factor: {:.2}%",
        (table.len() as f64 / table.capacity() as f64) * 100.0
    );

    table.print_probe_histogram();
    table.debug_stats().print();

    let mut removed = 0;
    for value in (0..num_values).filter(|v| v % 100 < args.remove_percent) {
        if table.remove(hash_u64(value), |&v| v == value).is_some() {
            removed += 1;
        }
    }

    println!();
    println!("Removed {} values, leaving tombstones behind", removed);
    table.debug_stats().print();
}
