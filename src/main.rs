use anyhow::{bail, Context as _};
use clap::{Parser, Subcommand, ValueEnum};
use rfpreview::{frame, project, Error, PreviewConfig, PreviewSession, SourceBundle, ViewportProfile};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "rfpreview", version, about = "Compose and inspect sandboxed live-preview documents")]
struct Cli {
    /// JSON configuration file (session / sandbox / probe sections)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write the starter project into DIR
    Init {
        dir: PathBuf,
        /// Replace existing project files
        #[arg(long)]
        force: bool,
    },
    /// Compose the project in DIR once
    Compose {
        dir: PathBuf,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Document)]
        format: OutputFormat,
        #[arg(long)]
        viewport: Option<ViewportProfile>,
    },
    /// Re-compose DIR into OUT whenever its files change (debounced)
    Watch {
        dir: PathBuf,
        #[arg(short, long)]
        out: PathBuf,
        /// File polling interval in milliseconds
        #[arg(long, default_value_t = 200)]
        poll_ms: u64,
        #[arg(long)]
        debounce_ms: Option<u64>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Document)]
        format: OutputFormat,
    },
    /// Run the composed document headlessly and print a JSON report
    #[cfg(feature = "probe")]
    Probe {
        dir: PathBuf,
        /// Fragment on the initial URL
        #[arg(long)]
        hash: Option<String>,
        /// Click the element with this id (repeatable, in order)
        #[arg(long = "click")]
        clicks: Vec<String>,
        /// Virtual milliseconds to run timers for after load and clicks
        #[arg(long, default_value_t = 500)]
        wait: u64,
    },
    /// Print the SHA-256 digest of the composed document
    Digest { dir: PathBuf },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Raw document for a frame's srcdoc
    Document,
    /// Standalone host page embedding the sandboxed frame
    Frame,
    /// base64 data: URL
    DataUrl,
}

fn load_config(path: Option<&Path>) -> anyhow::Result<PreviewConfig> {
    match path {
        Some(p) => Ok(PreviewConfig::load(p)?),
        None => Ok(PreviewConfig::default()),
    }
}

fn format_output(
    doc: &rfpreview::RenderedDocument,
    format: OutputFormat,
    viewport: ViewportProfile,
    key: u64,
    config: &PreviewConfig,
) -> String {
    match format {
        OutputFormat::Document => doc.as_str().to_string(),
        OutputFormat::Frame => frame::host_page(doc, viewport, key, &config.sandbox),
        OutputFormat::DataUrl => doc.to_data_url(),
    }
}

fn write_output(out: Option<&Path>, text: &str) -> anyhow::Result<()> {
    match out {
        Some(path) => std::fs::write(path, text).with_context(|| format!("failed to write {}", path.display())),
        None => {
            println!("{}", text);
            Ok(())
        }
    }
}

// Reads all three files; `None` while index.html is temporarily missing
// (editors often replace files by rename). Other read failures are reported
// once per distinct message and also yield `None`.
fn snapshot(dir: &Path, last_error: &mut Option<String>) -> Option<SourceBundle> {
    match project::load_dir(dir) {
        Ok(bundle) => {
            *last_error = None;
            Some(bundle)
        }
        Err(Error::MissingSource(_)) => None,
        Err(e) => {
            let msg = e.to_string();
            if last_error.as_deref() != Some(msg.as_str()) {
                eprintln!("rfpreview: {}", msg);
                *last_error = Some(msg);
            }
            None
        }
    }
}

async fn watch(
    dir: PathBuf,
    out: PathBuf,
    poll: Duration,
    format: OutputFormat,
    config: PreviewConfig,
) -> anyhow::Result<()> {
    let initial = project::load_dir(&dir)?;
    let sandbox_config = config.clone();
    let out_path = out.clone();
    let mut session = PreviewSession::new(config.session.clone(), move |frame| {
        let text = format_output(&frame.document, format, frame.viewport, frame.key, &sandbox_config);
        match std::fs::write(&out_path, text) {
            Ok(()) => eprintln!("render {} -> {}", frame.key, out_path.display()),
            Err(e) => eprintln!("failed to write {}: {}", out_path.display(), e),
        }
    })?;

    session.load(initial.clone())?;
    let mut last = initial;
    let mut last_error = None;
    let mut ticker = tokio::time::interval(poll);
    eprintln!("watching {} (Ctrl-C to stop)", dir.display());

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Some(now) = snapshot(&dir, &mut last_error) {
                    if now != last {
                        session.update(now.clone())?;
                        last = now;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                session.dispose();
                eprintln!("stopped");
                return Ok(());
            }
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Init { dir, force } => {
            project::write_dir(&dir, &SourceBundle::starter(), force)?;
            eprintln!("created starter project in {}", dir.display());
        }
        Command::Compose { dir, out, format, viewport } => {
            let bundle = project::load_dir(&dir)?;
            let doc = rfpreview::render(&bundle);
            let viewport = viewport.unwrap_or(config.session.viewport);
            write_output(out.as_deref(), &format_output(&doc, format, viewport, 1, &config))?;
        }
        Command::Watch { dir, out, poll_ms, debounce_ms, format } => {
            if poll_ms == 0 {
                bail!("--poll-ms must be greater than zero");
            }
            let mut config = config;
            if let Some(ms) = debounce_ms {
                config.session.debounce_ms = ms;
            }
            let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
            runtime.block_on(watch(dir, out, Duration::from_millis(poll_ms), format, config))?;
        }
        #[cfg(feature = "probe")]
        Command::Probe { dir, hash, clicks, wait } => {
            let bundle = project::load_dir(&dir)?;
            let mut probe_config = config.probe.clone();
            if hash.is_some() {
                probe_config.initial_hash = hash;
            }
            let mut probe = rfpreview::PreviewProbe::load(&rfpreview::render(&bundle), probe_config)?;
            probe.advance(wait)?;
            for id in &clicks {
                probe.click(id)?;
                probe.advance(wait)?;
            }
            println!("{}", serde_json::to_string_pretty(&probe.report()?)?);
        }
        Command::Digest { dir } => {
            let bundle = project::load_dir(&dir)?;
            println!("{}", rfpreview::render(&bundle).digest());
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("rfpreview: {:#}", e);
        std::process::exit(1);
    }
}
