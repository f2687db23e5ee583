use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use colored::Colorize;
use doc_context::{AskRequest, GatewayEmbedder, RetrievalConfig, ask};
use doc_index::{DocumentRegistry, EmbeddingsProvider, NoopEmbedder};
use llm_gateway::{
    CancellationToken, ChatClient, EmbeddingsClient, ReasoningEvent, ReasoningLevel, StreamSink,
    config::default_config::{
        active_profile_from_env, embedding_config_from_env, reasoning_level_from_env,
        system_prompt_from_env,
    },
    error_handler::env_opt,
    telemetry,
};
use tracing::{Level, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Ask a question about a plain-text document and stream the answer.
#[derive(Debug, Parser)]
#[command(name = "docqa", version, about)]
struct Args {
    /// UTF-8 text file holding the extracted document.
    file: PathBuf,

    /// Question about the document.
    question: String,

    /// Document title (defaults to the file name).
    #[arg(long)]
    title: Option<String>,

    /// Endpoint profile slot, 1..=4 (defaults to LLM_ACTIVE_PROFILE or 1).
    #[arg(long)]
    profile: Option<usize>,

    /// Reasoning level: default, minimal, low, medium, high, xhigh.
    #[arg(long)]
    reasoning: Option<ReasoningLevel>,

    /// Image URL attached to the question.
    #[arg(long)]
    image: Option<String>,

    /// Wait for the full answer instead of streaming it.
    #[arg(long)]
    no_stream: bool,

    /// Log level for the workspace crates.
    #[arg(long, default_value = "warn")]
    log_level: Level,
}

/// Answer to `out` (stdout), reasoning to stderr.
///
/// A failed write (closed pipe) cancels the request.
struct TerminalSink<W: Write> {
    out: W,
    cancel: CancellationToken,
    in_reasoning: bool,
}

impl<W: Write> TerminalSink<W> {
    fn new(out: W, cancel: CancellationToken) -> Self {
        Self {
            out,
            cancel,
            in_reasoning: false,
        }
    }

    fn end_reasoning(&mut self) {
        if self.in_reasoning {
            eprintln!();
            self.in_reasoning = false;
        }
    }
}

impl<W: Write + Send> StreamSink for TerminalSink<W> {
    fn on_answer_delta(&mut self, delta: &str) {
        self.end_reasoning();
        if self.cancel.is_cancelled() {
            return;
        }
        let written = self
            .out
            .write_all(delta.as_bytes())
            .and_then(|()| self.out.flush());
        if let Err(e) = written {
            warn!(error = %e, "stdout closed, cancelling request");
            self.cancel.cancel();
        }
    }

    fn on_reasoning(&mut self, event: &ReasoningEvent) {
        self.in_reasoning = true;
        for text in [&event.summary, &event.details].into_iter().flatten() {
            eprint!("{}", text.dimmed());
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Optional .env file.
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(telemetry::env_filter_with_level("warn", args.log_level))
        .with(telemetry::layer())
        .init();

    let text = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("cannot read {}", args.file.display()))?;
    let title = args.title.clone().unwrap_or_else(|| {
        args.file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    });

    let profile = active_profile_from_env(args.profile)?;
    let reasoning = match args.reasoning {
        Some(level) => level,
        None => reasoning_level_from_env()?,
    };
    let retrieval = RetrievalConfig::from_env();

    let chat = ChatClient::with_reqwest()?;
    let registry = DocumentRegistry::new(retrieval.index_config());
    let embeddings_configured =
        env_opt("EMBEDDING_URL").is_some() || env_opt("EMBEDDING_MODEL").is_some();
    let embedder: Box<dyn EmbeddingsProvider> = if embeddings_configured {
        let cfg = embedding_config_from_env(&profile);
        let client = EmbeddingsClient::with_reqwest(cfg)?;
        Box::new(GatewayEmbedder::new(Arc::new(client)))
    } else {
        info!("no embedding endpoint configured, lexical retrieval only");
        Box::new(NoopEmbedder)
    };

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, cancelling request");
                cancel.cancel();
            }
        });
    }

    let doc_id = args.file.display().to_string();
    let mut req = AskRequest::new(doc_id, title, text, args.question, profile)
        .with_reasoning(reasoning)
        .with_system_prompt(system_prompt_from_env())
        .with_retrieval(retrieval)
        .with_stream(!args.no_stream);
    if let Some(url) = args.image {
        req = req.with_image(url);
    }

    let mut sink = TerminalSink::new(io::stdout(), cancel.clone());
    let outcome = ask(&req, &chat, &registry, &*embedder, &mut sink, &cancel)
        .await
        .map_err(|e| anyhow!(e.user_message()))?;
    sink.end_reasoning();

    if outcome.cancelled {
        eprintln!("{}", "\n[cancelled]".yellow());
    } else if let Err(e) = writeln!(sink.out) {
        warn!(error = %e, "stdout closed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Accepts `room` writes, then reports a closed pipe.
    struct ClosingPipe {
        room: usize,
        written: Vec<u8>,
    }

    impl Write for ClosingPipe {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.room == 0 {
                return Err(io::ErrorKind::BrokenPipe.into());
            }
            self.room -= 1;
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn closed_stdout_cancels_the_request() {
        let cancel = CancellationToken::new();
        let pipe = ClosingPipe {
            room: 1,
            written: Vec::new(),
        };
        let mut sink = TerminalSink::new(pipe, cancel.clone());

        sink.on_answer_delta("first ");
        assert!(!cancel.is_cancelled());
        sink.on_answer_delta("second");
        assert!(cancel.is_cancelled());
        sink.on_answer_delta("third");

        assert_eq!(sink.out.written, b"first ");
    }

    #[test]
    fn writes_answer_deltas_in_order() {
        let cancel = CancellationToken::new();
        let mut sink = TerminalSink::new(Vec::new(), cancel.clone());
        sink.on_answer_delta("Hel");
        sink.on_answer_delta("lo");
        assert_eq!(sink.out, b"Hello");
        assert!(!cancel.is_cancelled());
    }
}
