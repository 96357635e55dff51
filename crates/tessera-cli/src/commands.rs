use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use tessera_server::{ServerConfig, StorageBackend, StorageSettings, TesseraServer};
use tessera_store::DicomClassifier;
use tessera_types::ContentKind;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let settings = load_settings(&cli)?;
    let backend = StorageBackend::open(settings, cli.node_id.as_str(), Arc::new(DicomClassifier))
        .context("cannot open the storage backend")?;

    match cli.command {
        Command::Serve(args) => cmd_serve(backend, args),
        Command::Put(args) => cmd_put(&backend, args),
        Command::Get(args) => cmd_get(&backend, args),
        Command::Rm(args) => cmd_rm(&backend, args),
        Command::Path(args) => cmd_path(&backend, args),
        Command::Status => cmd_status(&backend, cli.format),
        Command::Config => cmd_config(&backend, cli.format),
    }
}

fn load_settings(cli: &Cli) -> anyhow::Result<StorageSettings> {
    match &cli.config {
        Some(path) => StorageSettings::load(path)
            .with_context(|| format!("cannot load settings from {}", path.display())),
        None => Ok(StorageSettings::default()),
    }
}

fn cmd_serve(backend: StorageBackend, args: ServeArgs) -> anyhow::Result<()> {
    let bind_addr: SocketAddr = args
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", args.bind))?;
    if !backend.configuration().enable {
        tracing::warn!("storage backend is disabled in the settings; serving endpoints only");
    }

    let server = TesseraServer::new(ServerConfig { bind_addr }, Arc::new(backend));
    println!(
        "Tessera server on {} (node: {})",
        bind_addr.to_string().bold(),
        server.backend().node_identifier().cyan()
    );

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server.serve(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "cannot listen for Ctrl-C");
        }
    }))?;
    Ok(())
}

fn cmd_put(backend: &StorageBackend, args: PutArgs) -> anyhow::Result<()> {
    let content = std::fs::read(&args.file)
        .with_context(|| format!("cannot read {}", args.file.display()))?;
    backend.create(&args.id, &content)?;
    let location = backend.store().resolve(&args.id)?;
    println!("{} Stored {} ({} bytes)", "✓".green().bold(), args.id.yellow(), content.len());
    println!("  Content: {}", location.content.display());
    Ok(())
}

fn cmd_get(backend: &StorageBackend, args: GetArgs) -> anyhow::Result<()> {
    let content = match (args.offset, args.length) {
        (offset, Some(length)) => backend.read_range(&args.id, offset.unwrap_or(0), length)?,
        (_, None) => backend.read_whole(&args.id)?,
    };
    match args.output {
        Some(path) => {
            std::fs::write(&path, &content)
                .with_context(|| format!("cannot write {}", path.display()))?;
            eprintln!("{} Wrote {} bytes to {}", "✓".green(), content.len(), path.display());
        }
        None => std::io::stdout().lock().write_all(&content)?,
    }
    Ok(())
}

fn cmd_rm(backend: &StorageBackend, args: RmArgs) -> anyhow::Result<()> {
    let kind = ContentKind::from(args.kind);
    backend.remove(&args.id, kind)?;
    if backend.deferred_deletion() {
        println!("{} Queued {} ({}) for deletion", "✓".green(), args.id.yellow(), kind);
    } else {
        println!("{} Removed {} ({})", "✓".green(), args.id.yellow(), kind);
    }
    Ok(())
}

fn cmd_path(backend: &StorageBackend, args: PathArgs) -> anyhow::Result<()> {
    println!("{}", backend.path_of(&args.id)?.display());
    Ok(())
}

fn cmd_status(backend: &StorageBackend, format: OutputFormat) -> anyhow::Result<()> {
    let report = backend.status()?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            println!("Node: {}", report.database_server_identifier.cyan());
            let pending = report.files_pending_deletion.to_string();
            if report.files_pending_deletion == 0 {
                println!("Files pending deletion: {}", pending.green());
            } else {
                println!("Files pending deletion: {}", pending.yellow().bold());
            }
            if !backend.deferred_deletion() {
                println!("  {}", "delayed deletion disabled".dimmed());
            }
        }
    }
    Ok(())
}

fn cmd_config(backend: &StorageBackend, format: OutputFormat) -> anyhow::Result<()> {
    let settings = backend.configuration();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&settings)?),
        OutputFormat::Text => {
            let enabled = |on: bool| if on { "yes".green() } else { "no".red() };
            println!("Enabled:            {}", enabled(settings.enable));
            println!("Storage directory:  {}", settings.storage_directory.display());
            println!("Mount directory:    {}", settings.mount_directory.display());
            println!("Path format:        {}", settings.storage_path_format.as_str().cyan());
            println!("Max retry:          {}", settings.max_retry);
            println!("Delayed deletion:   {}", enabled(settings.delayed_deletion.enable));
            if settings.delayed_deletion.enable {
                println!("  Throttle:         {} ms", settings.delayed_deletion.throttle_delay_ms);
                if let Some(path) = &settings.delayed_deletion.path {
                    println!("  Queue:            {}", path.display());
                }
            }
        }
    }
    Ok(())
}
