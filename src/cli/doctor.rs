use crate::storage;
use crate::Config;
use anyhow::Result;
use std::path::Path;

#[derive(Debug)]
enum CheckStatus {
    Ok,
    Warn,
    Fail,
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckStatus::Ok => write!(f, "\x1b[32m✓ OK\x1b[0m"),
            CheckStatus::Warn => write!(f, "\x1b[33m⚠ WARN\x1b[0m"),
            CheckStatus::Fail => write!(f, "\x1b[31m✗ FAIL\x1b[0m"),
        }
    }
}

struct CheckResult {
    name: String,
    status: CheckStatus,
    detail: String,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            detail: detail.into(),
        }
    }
}

pub async fn run(config_path: &Path) -> Result<()> {
    println!("\n  Gallery Doctor: Configuration Check\n");

    let mut results: Vec<CheckResult> = Vec::new();

    // 1. Config validity
    let config = match Config::load(config_path) {
        Ok(c) => {
            let source = if config_path.exists() {
                format!("Loaded from {} and environment", config_path.display())
            } else {
                "Loaded from environment".to_string()
            };
            results.push(CheckResult::new("Configuration", CheckStatus::Ok, source));
            c
        }
        Err(e) => {
            results.push(CheckResult::new(
                "Configuration",
                CheckStatus::Fail,
                format!("Failed to load: {}", e),
            ));
            finish(&results);
            return Ok(());
        }
    };

    // 2. Secrets that fail closed at request time
    results.push(match config.upload.key {
        Some(_) => CheckResult::new("Upload key", CheckStatus::Ok, "UPLOAD_KEY is set"),
        None => CheckResult::new(
            "Upload key",
            CheckStatus::Warn,
            "UPLOAD_KEY is not set; every upload will be refused",
        ),
    });

    results.push(match config.visits.webhook_url {
        Some(_) => CheckResult::new(
            "Visit webhook",
            CheckStatus::Ok,
            format!("Geolocation via {}", config.visits.geolocation_url),
        ),
        None => CheckResult::new(
            "Visit webhook",
            CheckStatus::Warn,
            "DISCORD_WEBHOOK_URL is not set; /api/s will answer 500",
        ),
    });

    // 3. Storage reachability
    match storage::build_store(&config.storage) {
        Ok(store) => match store.list(1).await {
            Ok(objects) => results.push(CheckResult::new(
                "Storage",
                CheckStatus::Ok,
                format!(
                    "{} reachable ({})",
                    store.describe(),
                    if objects.is_empty() { "empty" } else { "has objects" }
                ),
            )),
            Err(e) => results.push(CheckResult::new(
                "Storage",
                CheckStatus::Fail,
                format!("Listing failed: {}", e),
            )),
        },
        Err(e) => results.push(CheckResult::new(
            "Storage",
            CheckStatus::Fail,
            format!("Cannot build client: {}", e),
        )),
    }

    results.push(CheckResult::new(
        "Public URL",
        CheckStatus::Ok,
        format!("{}/<key>", config.storage.public_url),
    ));

    finish(&results);
    Ok(())
}

fn finish(results: &[CheckResult]) {
    print_results(results);

    if results.iter().any(|r| matches!(r.status, CheckStatus::Fail)) {
        println!("\n  \x1b[31mSome checks failed. Fix the issues above before deploying.\x1b[0m\n");
    } else {
        println!("\n  \x1b[32mAll checks passed. Ready to deploy.\x1b[0m\n");
    }
}

fn print_results(results: &[CheckResult]) {
    let max_name_len = results.iter().map(|r| r.name.len()).max().unwrap_or(20);

    for (i, result) in results.iter().enumerate() {
        println!(
            "  {:>2}. {:<width$}  {}  {}",
            i + 1,
            result.name,
            result.status,
            result.detail,
            width = max_name_len,
        );
    }
}
