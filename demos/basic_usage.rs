//! Basic logger usage example
//!
//! Demonstrates console output, level filtering and the logging macros.
//! The file sink is disabled so nothing is written to disk.
//!
//! Run with: cargo run --example basic_usage

use rust_batch_logger::prelude::*;
use rust_batch_logger::{info, warn};

fn main() -> Result<()> {
    println!("=== Rust Batch Logger - Basic Usage Example ===\n");

    let logger = Logger::builder()
        .level(LogLevel::Debug)
        .without_file_sink()
        .build()?;

    // Log messages at different levels
    println!("1. Logging at different levels:");
    logger.debug("This is a debug message");
    logger.info("This is an info message");
    logger.warn("This is a warning message");
    logger.error("This is an error message");
    logger.fatal("This is a fatal message");

    println!("\n2. Logging with different minimum levels:");
    logger.set_level(LogLevel::Warn);
    println!("   Minimum level set to WARN - debug and info won't show:");
    logger.debug("Debug message (hidden)");
    logger.info("Info message (hidden)");
    logger.warn("Warning message (visible)");

    println!("\n3. Macros format only when the level passes:");
    logger.set_level(LogLevel::Info);
    let port = 8080;
    info!(logger, "Server listening on port {}", port);
    warn!(logger, "{} of {} workers busy", 7, 8);

    println!("\n4. Attaching a cause:");
    let cause = std::io::Error::new(std::io::ErrorKind::NotFound, "settings.toml missing");
    logger.error_with("Could not load settings", &cause);

    println!("\n=== Example completed successfully! ===");

    Ok(())
}
