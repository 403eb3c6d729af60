//! gitscape - Turn a repository into a single Markdown digest.
//!
//! Usage:
//!   gitscape <SOURCE>                     Digest a local path or git URL to stdout
//!   gitscape <SOURCE> -o digest.md        Write the digest to a file
//!   gitscape <SOURCE> --events            Stream progress events as JSON lines
//!   gitscape --help                       Show help

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{Context, Result, bail};
use humansize::{BINARY, format_size};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use gitscape_session::{
    Credentials, DigestConfig, DigestDocument, DigestRequest, DigestService, ProgressEvent,
    SessionState,
};

#[derive(Parser)]
#[command(
    name = "gitscape",
    version,
    about = "Render a repository as a single Markdown digest",
    long_about = "gitscape walks a repository (a local directory or a git URL), keeps \
                  the text files that fit its size ceilings and writes one Markdown \
                  document with a directory tree followed by every file's content."
)]
struct Cli {
    /// Local directory or git URL (https:// or http://)
    source: String,

    /// Access token for private remotes
    #[arg(long, env = "GITSCAPE_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Digest only this directory inside the repository
    #[arg(long)]
    subpath: Option<PathBuf>,

    /// Write the digest here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print every session event as a JSON line on stdout
    #[arg(long)]
    events: bool,

    /// Configuration file (defaults to the user config file, if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log progress details to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => DigestConfig::load(path)
            .wrap_err_with(|| format!("Failed to load config from {}", path.display()))?,
        None => DigestConfig::load_or_default().context("Failed to load config")?,
    };
    let capacity = config.event_channel_capacity;

    let mut request = DigestRequest::parse(&cli.source).context("Invalid source")?;
    tracing::debug!(source = %request.source, remote = request.source.is_remote(), "Parsed source");
    if let Some(token) = cli.token {
        request = request.with_credentials(Credentials::token(token));
    }
    if let Some(subpath) = cli.subpath {
        request = request.with_subpath(subpath);
    }

    let service = DigestService::new(config).context("Invalid configuration")?;
    let (tx, mut rx) = mpsc::channel(capacity);
    let session = tokio::spawn(async move { service.run_streaming(request, tx).await });

    let mut digest: Option<DigestDocument> = None;
    while let Some(event) = rx.recv().await {
        if cli.events {
            let line = serde_json::to_string(&event)?;
            println!("{line}");
        }
        match event {
            ProgressEvent::Progress { message, percentage } => {
                if !cli.events {
                    eprintln!("[{percentage:>3}%] {message}");
                }
            }
            ProgressEvent::Complete { digest: doc } => digest = Some(doc),
            ProgressEvent::Error { message } => eprintln!("error: {message}"),
        }
    }

    let report = session.await.context("Digest session panicked")?;
    match report.final_state {
        SessionState::Complete => {}
        SessionState::Cancelled => bail!("Digest session was cancelled"),
        state => bail!(
            "Digest session ended in {state}: {}",
            report.error.unwrap_or_else(|| "unknown error".to_string())
        ),
    }

    let Some(digest) = digest else {
        bail!("Session completed without delivering a digest");
    };
    let written = match &cli.output {
        Some(path) => {
            let file = File::create(path)
                .wrap_err_with(|| format!("Failed to create {}", path.display()))?;
            let bytes = write_digest(&digest, file)
                .wrap_err_with(|| format!("Failed to write {}", path.display()))?;
            Some(bytes)
        }
        None if !cli.events => Some(write_digest(&digest, std::io::stdout().lock())?),
        None => None,
    };

    eprintln!(
        "Digest: {} files{}{}",
        digest.content_paths().len(),
        written
            .map(|bytes| format!(", {}", format_size(bytes, BINARY)))
            .unwrap_or_default(),
        cli.output
            .as_ref()
            .map(|p| format!(" written to {}", p.display()))
            .unwrap_or_default()
    );

    Ok(())
}

/// Logs go to stderr so stdout carries only the digest or events.
fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Stream the digest into `out` without building it as one string.
/// Returns the number of bytes written.
fn write_digest(digest: &DigestDocument, out: impl Write) -> io::Result<u64> {
    let mut out = CountingWriter {
        inner: BufWriter::new(out),
        written: 0,
    };
    write!(out, "{digest}")?;
    out.flush()?;
    Ok(out.written)
}

struct CountingWriter<W> {
    inner: W,
    written: u64,
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitscape_session::SectionKind;

    #[test]
    fn test_write_digest_matches_render() {
        let mut doc = DigestDocument::new();
        doc.push_section(SectionKind::Header, "Repository Digest for demo");
        doc.push_section(SectionKind::File, "src/main.rs")
            .push_str("fn main() {}\n");

        let mut out = Vec::new();
        let written = write_digest(&doc, &mut out).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), doc.render());
        assert_eq!(written, doc.render().len() as u64);
    }
}
