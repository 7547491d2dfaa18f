//! Command-line front end over [`budstore`]: open a store file, then
//! either traverse it whole or run a glob `find`, printing one line per
//! entry.

use clap::Parser;

use budstore::{Allocator, Store};

/// Print the records of a buddy-allocated per-folder metadata store.
#[derive(Parser, Debug)]
#[command(name = "dsdump", about = "Dump entries from a buddy-allocated metadata store")]
struct Cli {
    /// Path to the store file.
    path: std::path::PathBuf,

    /// Print only entries whose filename matches this shell-glob pattern
    /// (`*`, `?`, `[...]`). Mutually exclusive with `--name`.
    #[arg(long, conflicts_with = "name")]
    find: Option<String>,

    /// Print only entries for this exact filename. Mutually exclusive
    /// with `--find`.
    #[arg(long, conflicts_with = "find")]
    name: Option<String>,
}

fn run(cli: &Cli) -> budstore::Result<()> {
    log::debug!("opening {}", cli.path.display());
    let allocator = Allocator::open(&cli.path)?;
    let store = Store::open(&allocator)?;
    log::info!(
        "opened store: {} records across {} nodes, {} levels",
        store.records(),
        store.nodes(),
        store.levels()
    );

    let print_entry = |entry: &budstore::Entry| {
        println!(
            "{} {} {} {}",
            entry.filename,
            entry.code,
            entry.type_code,
            payload_summary(entry)
        );
    };

    if let Some(pattern) = &cli.find {
        for entry in store.find(pattern)? {
            print_entry(&entry);
        }
    } else if let Some(name) = &cli.name {
        store.traverse(|entry| {
            if &entry.filename == name {
                print_entry(&entry);
            }
            Ok(())
        })?;
    } else {
        store.traverse(|entry| {
            print_entry(&entry);
            Ok(())
        })?;
    }

    Ok(())
}

/// A short human-readable rendering of an entry's payload, used only for
/// display; the typed accessors on `Entry` remain the source of truth.
fn payload_summary(entry: &budstore::Entry) -> String {
    match entry.type_code.as_str() {
        "bool" => entry
            .as_bool()
            .map(|b| b.to_string())
            .unwrap_or_else(|e| format!("<{e}>")),
        "ustr" => entry
            .as_ustring()
            .unwrap_or_else(|e| format!("<{e}>")),
        "dutc" => match entry.as_timestamp() {
            Ok(Some(secs)) => format!("{secs} (unix seconds)"),
            Ok(None) => "<no timestamp>".to_string(),
            Err(e) => format!("<{e}>"),
        },
        "blob" if entry.code == "Iloc" => entry
            .decode_iloc()
            .map(|(x, y)| format!("({x}, {y})"))
            .unwrap_or_else(|e| format!("<{e}>")),
        _ => format!("{} bytes", entry.payload.len()),
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("dsdump: {e}");
        std::process::exit(1);
    }
}
