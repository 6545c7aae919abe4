use anyhow::{Context, Result};
use clap::Parser;
use nylas::cli::{self, Cli, Commands};
use nylas::config::Config;
use nylas::error::NylasError;
use nylas::webhook::WebhookListener;
use nylas::{Client, DeltaFeed};
use std::process;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        display_error(&e);
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    // rustls needs a process-wide provider once more than one is compiled in
    #[cfg(not(windows))]
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    #[cfg(windows)]
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();
    init_tracing(&cli);

    match cli.command {
        Commands::InitConfig { output, force } => {
            if output.exists() && !force {
                return Err(NylasError::ConfigError(format!(
                    "Configuration file already exists at {:?}. Use --force to overwrite.",
                    output
                ))
                .into());
            }

            Config::create_example(&output).await?;
            println!("Created example configuration file at: {:?}", output);
            println!("\nSet api.access_token (or NYLAS_ACCESS_TOKEN) before fetching deltas.");
            Ok(())
        }

        Commands::Cursor => {
            let client = build_client(&cli.config).await?;
            let cursor = client.latest_cursor().await?;
            println!("{}", cursor);
            Ok(())
        }

        Commands::Fetch {
            cursor,
            include,
            exclude,
            view,
            follow,
        } => {
            let client = build_client(&cli.config).await?;
            let opts = cli::deltas_options(include, exclude, view);

            if follow {
                let mut print_error = None;
                let summary = cli::follow_deltas(&client, &cursor, opts.as_ref(), |delta| {
                    match cli::delta_json_line(delta) {
                        Ok(line) => println!("{}", line),
                        Err(e) => {
                            print_error.get_or_insert(e);
                        }
                    }
                })
                .await?;
                if let Some(e) = print_error {
                    return Err(e.into());
                }
                eprintln!(
                    "caught up after {} batches ({} deltas), next cursor:",
                    summary.batches, summary.deltas
                );
                println!("{}", summary.cursor);
            } else {
                let batch = client.deltas(&cursor, opts.as_ref()).await?;
                for delta in &batch.deltas {
                    println!("{}", cli::delta_json_line(delta)?);
                }
                eprintln!(
                    "cursor_start={} cursor_end={} caught_up={}",
                    batch.cursor_start,
                    batch.cursor_end,
                    batch.is_caught_up()
                );
            }
            Ok(())
        }

        Commands::Stream { cursor } => {
            let client = build_client(&cli.config).await?;
            let cursor = match cursor {
                Some(cursor) => cursor,
                None => client.latest_cursor().await?,
            };

            let token = cancel_on_ctrl_c();
            let mut progress = cli::StreamProgress::default();
            let result = client
                .stream_deltas(&cursor, &token, |delta| match progress.record(&delta) {
                    Some(line) => println!("{}", line),
                    None => token.cancel(),
                })
                .await;

            eprintln!(
                "{} deltas printed, resume with: --cursor {}",
                progress.printed,
                progress.resume_cursor(&cursor)
            );
            if let Some(e) = progress.error {
                return Err(e.into());
            }

            // the stream only ends cleanly through Ctrl-C
            match result {
                Ok(()) | Err(NylasError::Cancelled) => Ok(()),
                Err(e) => Err(e.into()),
            }
        }

        Commands::Webhook { addr } => {
            let config = cli::load_config(&cli.config).await?;
            let secret = config
                .api
                .client_secret
                .clone()
                .context("api.client_secret (or NYLAS_CLIENT_SECRET) is required to verify webhooks")?;
            let addr = match addr {
                Some(addr) => addr,
                None => config
                    .webhook
                    .listen_addr
                    .parse()
                    .context("webhook.listen_addr is not a socket address")?,
            };

            let token = cancel_on_ctrl_c();
            WebhookListener::new(secret)
                .listen(addr, &token, |delta| {
                    tracing::info!(
                        trigger = %delta.trigger,
                        object = %delta.object,
                        id = %delta.object_data.id,
                        account_id = %delta.object_data.account_id,
                        date = delta.date,
                        "webhook delta"
                    );
                    Ok::<(), NylasError>(())
                })
                .await?;
            Ok(())
        }
    }
}

fn init_tracing(cli: &Cli) {
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nylas=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nylas=info,warn"))
    };

    // stdout carries the deltas themselves
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if cli.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn build_client(config_path: &std::path::Path) -> Result<Client> {
    let config = cli::load_config(config_path).await?;
    if config.api.access_token.is_none() {
        return Err(NylasError::AccessTokenNotSet)
            .context("set api.access_token in the config or NYLAS_ACCESS_TOKEN");
    }
    Ok(Client::from_config(&config)?)
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, shutting down");
            trigger.cancel();
        }
    });
    token
}

/// Display error with context
fn display_error(error: &anyhow::Error) {
    eprintln!("Error: {}", error);

    let mut cause = error.source();
    while let Some(e) = cause {
        eprintln!("  Caused by: {}", e);
        cause = e.source();
    }

    if let Some(nylas_err) = error.downcast_ref::<NylasError>() {
        match nylas_err {
            NylasError::AccessTokenNotSet => {
                eprintln!("\nHint: Set api.access_token in the config or NYLAS_ACCESS_TOKEN.");
            }
            NylasError::Api(api) if api.status_code == 401 || api.status_code == 403 => {
                eprintln!("\nHint: The access token was rejected. It may have been revoked.");
            }
            NylasError::Timeout(_) | NylasError::NetworkError(_) => {
                eprintln!("\nHint: Check http.connect_timeout_secs and the API base_url.");
            }
            NylasError::ConfigError(_) => {
                eprintln!("\nHint: Check your configuration file for errors.");
                eprintln!("      Run: nylas-delta init-config --force");
            }
            _ => {}
        }
    }
}
