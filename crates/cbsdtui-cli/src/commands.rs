//! CLI command implementations

use anyhow::{bail, Result};
use cbsdtui_config::GlobalConfig;
use cbsdtui_core::{poll_code, Container, ContainerKind, Host, NoConsole, Snapshot};
use cbsdtui_runner::{OutputSink, SinkUpdate};
use std::sync::Arc;

/// List the containers of `kind`
pub async fn list(host: &Host, kind: ContainerKind, json: bool) -> Result<()> {
    let containers = host.load_containers(kind).await?;

    if json {
        let summaries: Vec<_> = containers.iter().map(Container::summary).collect();
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if containers.is_empty() {
        println!("No {} found.", kind.title());
        return Ok(());
    }

    print!("{}", format_table(kind, &containers));
    Ok(())
}

/// Print the live status code of one container
pub async fn status(host: &Host, kind: ContainerKind, name: &str) -> Result<()> {
    let container = host.require(kind, name).await?;
    println!("{}", poll_code(container.current_status(host).await));
    Ok(())
}

pub async fn snapshots(host: &Host, kind: ContainerKind, name: &str) -> Result<()> {
    let container = host.require(kind, name).await?;
    print!("{}", format_snapshots(&container.snapshots(host).await));
    Ok(())
}

pub async fn view(host: &Host, kind: ContainerKind, name: &str) -> Result<()> {
    let mut container = host.require(kind, name).await?;
    container.load_params(host)?;
    print!("{}", container.view_text());
    Ok(())
}

/// Start (`start = true`) or stop a container, streaming the command output
pub async fn start_stop(host: Host, kind: ContainerKind, name: &str, start: bool) -> Result<()> {
    let container = host.require(kind, name).await?;

    if container.is_running() == start {
        let state = if start { "running" } else { "stopped" };
        println!("{} {} is already {}", kind.noun(), name, state);
        return Ok(());
    }
    if !container.is_running() && !container.is_runnable() {
        bail!(
            "{} {} is {} and cannot be started or stopped",
            kind.noun(),
            name,
            container.status()
        );
    }

    let (sink, mut rx) = OutputSink::channel();
    let host = Arc::new(host);
    let task = {
        let host = Arc::clone(&host);
        tokio::spawn(async move {
            let mut container = container;
            container.start_stop(&host, &NoConsole, &sink).await;
            sink.finish();
            container
        })
    };

    while let Some(update) = rx.recv().await {
        match update {
            SinkUpdate::Append(text) => println!("{}", text),
            SinkUpdate::Finished => break,
        }
    }

    let container = task.await?;
    println!("{}: {}", container.name(), container.status());
    if container.is_running() != start {
        bail!("{} did not {}", name, if start { "start" } else { "stop" });
    }
    Ok(())
}

/// Show the global configuration
pub fn config() -> Result<()> {
    let config_path = GlobalConfig::config_path()?;

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        println!("# Config file: {:?}\n", config_path);
        println!("{}", content);
    } else {
        println!("# Config file: {:?} (not created yet)\n", config_path);
        println!("# Default configuration:");
        let content = toml::to_string_pretty(&GlobalConfig::default())?;
        println!("{}", content);
    }

    Ok(())
}

/// Column-aligned table with the kind's headers
fn format_table(kind: ContainerKind, containers: &[Container]) -> String {
    let headers = kind.headers();
    let rows: Vec<Vec<String>> = containers.iter().map(Container::row_cells).collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            rows.iter()
                .filter_map(|row| row.get(i))
                .map(String::len)
                .chain(std::iter::once(header.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    for row in std::iter::once(&header_cells).chain(rows.iter()) {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }
    out
}

fn format_snapshots(snapshots: &[Snapshot]) -> String {
    snapshots
        .iter()
        .map(|snap| format!("{}\t{}\n", snap.name, snap.created))
        .collect()
}
