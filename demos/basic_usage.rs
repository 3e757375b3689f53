//! Basic usage example
//!
//! Demonstrates package loggers, per-package levels, key-value entries and
//! the formatting macros.
//!
//! Run with: cargo run --example basic_usage

use repo_logger::prelude::*;
use repo_logger::{info, kv, warning};
use std::sync::Arc;

fn main() -> Result<()> {
    println!("=== Repo Logger - Basic Usage Example ===\n");

    let registry = Registry::new();
    let server = registry.package_logger("github.com/acme/shop", "server");
    let db = registry.package_logger("github.com/acme/shop", "db");

    println!("1. Logging at different levels (package level INFO):");
    server.critical(&["always shown".into()]);
    server.error(&["payment gateway unreachable".into()]);
    server.warning(&["retrying".into(), 3.into()]);
    server.notice(&["config reloaded".into()]);
    server.info(&["listening".into(), 8080.into()]);
    server.trace(&["hidden".into()]);
    server.debug(&["hidden".into()]);

    println!("\n2. Raising one package to DEBUG:");
    let repo = registry.repo_logger("github.com/acme/shop")?;
    let levels = repo.parse_level_config("*=NOTICE,db=DEBUG")?;
    repo.set_levels(&levels);
    db.debugf(format_args!("query took {}ms", 12));
    server.info(&["hidden now".into()]);

    println!("\n3. Key-value entries and attached values:");
    let request = server.with_values(&["request_id".into(), "r-1001".into()]);
    request.kv(LogLevel::Notice, &["path".into(), "/cart".into(), "status".into(), 200.into()]);
    kv!(request, LogLevel::Warning; "latency_ms" => 950, "slow" => true);

    println!("\n4. Macros:");
    warning!(db, "{} connections idle", 4);
    info!(db, "pool size {}", 16);

    println!("\n5. Switching to the JSON formatter:");
    registry.set_formatter(FormatterKind::Json.build(std::io::stdout()));
    request.notice(&["checkout complete".into()]);
    registry.set_formatter(Arc::new(repo_logger::PrettyFormatter::new(std::io::stderr())));

    println!("\nCurrent levels:");
    for level in registry.levels() {
        println!("   {}/{} = {}", level.repo, level.package, level.level);
    }

    println!("\n=== Example completed successfully! ===");
    Ok(())
}
