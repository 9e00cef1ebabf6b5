//! CLI `doctor` command: check the external tools and on-disk state the server depends on.

use anyhow::Result;

use brewdigest::config::AppConfig;
use brewdigest::model::LlamaClient;
use brewdigest::repo::GitCli;

pub async fn doctor(config: &AppConfig) -> Result<()> {
    let git = GitCli::default();
    let model_path = config.resolved_model_path();
    let formula_dir = config.formula_repo_dir();

    println!("brewdigest Health Report");
    println!("========================");
    println!();

    match git.version() {
        Ok(version) => println!("git:               {version}"),
        Err(e) => println!("git:               NOT AVAILABLE ({e})"),
    }
    println!();

    println!("Model:");
    println!("  Path:            {}", model_path.display());
    if model_path.exists() {
        let size = std::fs::metadata(&model_path).map(|m| m.len()).unwrap_or(0);
        println!("  Size:            {}", format_bytes(size));
    } else {
        println!("  Status:          missing. Run `brewdigest model download`.");
    }
    match &config.model.server_url {
        Some(url) => {
            let status = match LlamaClient::with_url(url.clone()).check_health().await {
                Ok(()) => "OK".to_string(),
                Err(e) => format!("UNREACHABLE ({e})"),
            };
            println!("  Runtime:         {url} {status}");
        }
        None => println!("  Runtime:         spawn `{}`", config.model.server_binary),
    }
    println!();

    println!("Formula mirror:");
    println!("  Path:            {}", formula_dir.display());
    if formula_dir.is_dir() {
        match git.head_commit_time(&formula_dir) {
            Some(ts) => println!("  Last commit:     {}", ts.format("%Y-%m-%d %H:%M UTC")),
            None => println!("  Last commit:     (unreadable)"),
        }
    } else {
        println!("  Status:          not cloned yet. Run `brewdigest sync`.");
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
