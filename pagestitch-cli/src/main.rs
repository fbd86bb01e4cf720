use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pagestitch_core::{
    probe, CancellationFlag, HttpOptions, HttpPageSource, ProbeReport, StitchConfig, StitchError,
    Stitcher, UrlTemplate,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "pagestitch",
    about = "Download a document viewer's page images and stitch them into a PDF",
    version,
    author
)]
struct Cli {
    /// Log every page as it is processed
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every page behind a URL template and write the PDF
    Fetch {
        /// Page URL containing a {counter} placeholder
        template: String,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Error-content responses tolerated before giving up
        #[arg(long, default_value = "3")]
        retry_budget: u32,

        /// Highest page counter that will be requested
        #[arg(long, default_value = "500")]
        ceiling: u64,

        /// Page counters never requested (e.g. "43,44")
        #[arg(long, value_delimiter = ',', default_value = "43")]
        skip: Vec<u64>,

        /// Request every counter, ignoring --skip
        #[arg(long)]
        no_skip: bool,

        /// JPEG quality for embedded pages (1-100)
        #[arg(short, long, default_value = "30")]
        quality: u8,

        /// Scale factor applied to each page image
        #[arg(short, long, default_value = "1.0")]
        resize: f32,

        /// Document title
        #[arg(long)]
        title: Option<String>,

        /// Accept invalid TLS certificates
        #[arg(long)]
        insecure: bool,

        /// Per-request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Fetch one URL and report whether it looks like a viewer error page
    Probe {
        /// Page URL
        url: String,

        /// Accept invalid TLS certificates
        #[arg(long)]
        insecure: bool,
    },
}

fn http_options(insecure: bool, timeout: Option<u64>) -> HttpOptions {
    let options = HttpOptions::default().with_accept_invalid_certs(insecure);
    match timeout {
        Some(secs) => options.with_timeout(Duration::from_secs(secs)),
        None => options,
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "pagestitch_core=info"
    } else {
        "pagestitch_core=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Fetch {
            template,
            output,
            retry_budget,
            ceiling,
            skip,
            no_skip,
            quality,
            resize,
            title,
            insecure,
            timeout,
        } => {
            let template = UrlTemplate::parse(&template)?;

            let mut config = StitchConfig::default();
            config.acquisition = config
                .acquisition
                .with_retry_budget(retry_budget)
                .with_page_ceiling(ceiling)
                .with_skip_pages(if no_skip { Vec::new() } else { skip });
            config.encode = config
                .encode
                .with_jpeg_quality(quality)
                .with_resize_factor(resize);
            if let Some(title) = title {
                config.assembly = config.assembly.with_title(title);
            }
            config.http = http_options(insecure, timeout);

            let source = HttpPageSource::new(&config.http)?;
            let stitcher = Stitcher::new(source, config)?;

            let cancel = CancellationFlag::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    eprintln!("Interrupted, stopping after the current page");
                    on_interrupt.cancel();
                }
            });

            let document = match stitcher.stitch(&template, &cancel).await {
                Ok(document) => document,
                Err(StitchError::Cancelled) => bail!("Cancelled, nothing written"),
                Err(e) => return Err(e.into()),
            };

            tokio::fs::write(&output, &document.bytes)
                .await
                .with_context(|| format!("cannot write {}", output.display()))?;

            println!(
                "Stitched {} pages into {} ({} requests, stopped: {})",
                document.page_count(),
                output.display(),
                document.requests,
                document.stop
            );
        }

        Commands::Probe { url, insecure } => {
            let config = StitchConfig::default();
            let source = HttpPageSource::new(&http_options(insecure, None))?;

            match probe(&source, &url, &config.acquisition).await? {
                ProbeReport::ErrorContent { marker, body_len } => {
                    println!("Error content: found \"{marker}\" in {body_len} bytes");
                    return Ok(ExitCode::from(2));
                }
                ProbeReport::Clean { body_len } => {
                    println!("Clean: {body_len} bytes, no error marker");
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
