//! SHELF - Interactive Shell
//! A small REPL over a file-backed store.
//!
//! Usage: `shelf [location] [delay_ms]`

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use shelf::config::Config;
use shelf::engine::Shelf;

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let location = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| Config::default().location);
    let delay_ms = match args.next().map(|s| s.parse::<u64>()) {
        None => 1000,
        Some(Ok(ms)) => ms,
        Some(Err(err)) => {
            eprintln!("[ERROR] Invalid delay_ms: {}", err);
            std::process::exit(2);
        }
    };

    println!();
    println!("  ╔═══════════════════════════════════════════╗");
    println!("  ║              SHELF Store                  ║");
    println!("  ║    Write-Back File Key-Value Store v1     ║");
    println!("  ╚═══════════════════════════════════════════╝");
    println!();
    println!("  File:  {}", location.display());
    println!("  Delay: {} ms", delay_ms);
    println!();
    println!("  Commands:");
    println!("    set <key> <value>  - Store a key-value pair");
    println!("    get <key>          - Retrieve a value by key");
    println!("    del <key>          - Delete a key");
    println!("    scan               - List all key-value pairs");
    println!("    clear              - Delete every key");
    println!("    flush              - Write the file now");
    println!("    info               - Show engine statistics");
    println!("    exit               - Flush and shut down");
    println!();

    let config = Config::new(location).with_delay_ms(delay_ms);
    let shelf = match Shelf::open(config) {
        Ok(s) => s,
        Err(err) => {
            eprintln!("[ERROR] Failed to open store: {}", err);
            std::process::exit(1);
        }
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("shelf> ");
        if stdout.flush().is_err() {
            break;
        }

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break, // EOF
            Ok(_) => {}
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }

        match parts[0].to_lowercase().as_str() {
            "set" | "put" => {
                if parts.len() < 3 {
                    println!("  Usage: set <key> <value>");
                    continue;
                }
                match shelf.put(parts[1], parts[2..].join(" ")) {
                    Ok(()) => println!("  OK"),
                    Err(e) => println!("  ERROR: {}", e),
                }
            }
            "get" => {
                if parts.len() < 2 {
                    println!("  Usage: get <key>");
                    continue;
                }
                match shelf.get(parts[1]) {
                    Ok(Some(value)) => match String::from_utf8(value) {
                        Ok(s) => println!("  \"{}\"", s),
                        Err(_) => println!("  <binary data>"),
                    },
                    Ok(None) => println!("  (nil)"),
                    Err(e) => println!("  ERROR: {}", e),
                }
            }
            "del" | "delete" => {
                if parts.len() < 2 {
                    println!("  Usage: del <key>");
                    continue;
                }
                match shelf.delete(parts[1]) {
                    Ok(()) => println!("  OK (deleted)"),
                    Err(e) => println!("  ERROR: {}", e),
                }
            }
            "scan" | "list" => match shelf.scan() {
                Ok(entries) if entries.is_empty() => println!("  (empty)"),
                Ok(entries) => {
                    for (key, value) in &entries {
                        let k = String::from_utf8_lossy(key);
                        let v = String::from_utf8_lossy(value);
                        println!("  {} -> {}", k, v);
                    }
                    println!("  ({} entries)", entries.len());
                }
                Err(e) => println!("  ERROR: {}", e),
            },
            "clear" => match shelf.clear() {
                Ok(()) => println!("  OK (cleared)"),
                Err(e) => println!("  ERROR: {}", e),
            },
            "flush" | "sync" => match shelf.flush_now() {
                Ok(()) => println!("  OK (flushed)"),
                Err(e) => println!("  ERROR: {}", e),
            },
            "info" | "stats" => {
                match shelf.len() {
                    Ok(n) => println!("  Entries:  {}", n),
                    Err(e) => println!("  ERROR: {}", e),
                }
                println!("  Pending:  {} mutations", shelf.pending_mutations());
                if let Some(err) = shelf.last_flush_error() {
                    println!("  Last flush error: {}", err);
                }
                println!("{}", shelf.metrics().report());
            }
            "exit" | "quit" | "q" => break,
            _ => {
                println!("  Unknown command: '{}'. Type 'exit' to quit.", parts[0]);
            }
        }
    }

    println!("  Shutting down SHELF...");
    if let Err(err) = shelf.close() {
        eprintln!("[ERROR] Final flush failed: {}", err);
        std::process::exit(1);
    }
}
