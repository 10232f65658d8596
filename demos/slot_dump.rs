use std::error::Error;

use clap::Parser;
use perturb_hash::HashMap;
use tracing_subscriber::EnvFilter;

/// Walks a small map through inserts, an overwrite, a deletion and a
/// reinsertion, dumping its slots after each step.
#[derive(Parser, Debug)]
struct Args {
    /// Number of keys to insert, starting at "a".
    #[arg(
        short = 'n',
        long = "keys",
        default_value_t = 6,
        value_parser = clap::value_parser!(u8).range(1..=26)
    )]
    keys: u8,

    /// Log filter, e.g. "trace" to see every probe collision.
    #[arg(short = 'l', long = "log", default_value = "debug")]
    log: String,
}

fn main() -> Result<(), Box<dyn Error + Send + Sync + 'static>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&args.log)?)
        .with_writer(std::io::stderr)
        .init();

    let keys: Vec<String> = (b'a'..)
        .take(args.keys.into())
        .map(|c| char::from(c).to_string())
        .collect();

    let mut map = HashMap::new();
    for (value, key) in keys.iter().enumerate() {
        map.insert(key.clone(), value as i64 + 1);
    }
    println!("after inserting {} keys:\n{}\n", map.len(), map.dump());

    if let Some(last) = keys.last() {
        let old = map.insert(last.clone(), 66);
        println!("overwrote {last} (was {old:?}):\n{}\n", map.dump());
    }

    for key in keys.iter().take(2) {
        println!("get {key} -> {:?}", map.get(key.as_str()));
    }
    println!("get missing -> {:?}", map.get("missing"));

    map.delete("a")?;
    println!("\nafter deleting a:\n{}\n", map.dump());

    map.insert("a".to_string(), 11);
    println!("after reinserting a:\n{}", map.dump());

    Ok(())
}
