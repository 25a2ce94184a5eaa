//! Catalog and service command handlers

use anyhow::Result;
use colored::*;

use super::print_json;
use crate::config::Config;

/// Check orchestrator health
pub async fn health(config: &Config) -> Result<()> {
    let health = config.client().health().await?;

    if config.json {
        return print_json(&health);
    }

    println!(
        "{} {} at {} is {}",
        "✓".green(),
        health.service,
        config.orchestrator_url,
        health.status.green()
    );
    Ok(())
}

/// List all playbooks in the catalog
pub async fn list_playbooks(config: &Config) -> Result<()> {
    let list = config.client().list_playbooks().await?;

    if config.json {
        return print_json(&list);
    }

    if list.playbooks.is_empty() {
        println!("{}", "No playbooks found.".yellow());
        return Ok(());
    }

    println!("{}", format!("Found {} playbook(s):", list.count).bold());
    println!();
    for playbook in &list.playbooks {
        println!(
            "  {} {:<40} {:>10}  {}",
            "▸".cyan(),
            playbook.name,
            format_size(playbook.size),
            playbook
                .modified
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
                .dimmed()
        );
    }

    Ok(())
}

fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;

    match bytes {
        b if b >= MIB => format!("{:.1} MiB", b as f64 / MIB as f64),
        b if b >= KIB => format!("{:.1} KiB", b as f64 / KIB as f64),
        b => format!("{} B", b),
    }
}
