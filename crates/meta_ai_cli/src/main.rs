use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use meta_ai::{MetaAi, MetaAiConfig, PromptEvent, PromptOptions, ReconciledAnswer};
use tracing::debug;

mod logging;

#[derive(Parser, Debug)]
#[command(name = "meta-ai")]
#[command(about = "Ask Meta AI from the terminal without an account")]
#[command(version)]
struct Cli {
    /// Prompt to send. Reads prompts from stdin, one per line, when omitted.
    prompt: Vec<String>,

    /// Start a fresh upstream conversation
    #[arg(long)]
    new_conversation: bool,

    /// Skip the sources lookup
    #[arg(long)]
    no_sources: bool,

    /// Print partial text to stderr while the answer streams
    #[arg(long)]
    stream: bool,

    /// Print the answer as JSON
    #[arg(long)]
    json: bool,

    /// Proxy for all requests
    #[arg(long, env = "META_AI_PROXY")]
    proxy: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = "META_AI_TIMEOUT_SECS")]
    timeout: Option<u64>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn config(&self) -> MetaAiConfig {
        let mut config = MetaAiConfig::from_env();
        if let Some(proxy) = &self.proxy {
            config = config.with_proxy(proxy.clone());
        }
        if let Some(secs) = self.timeout {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if self.no_sources {
            config = config.with_fetch_sources(false);
        }
        config
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns `false` when an interactive prompt failed along the way.
fn run(cli: &Cli) -> Result<bool> {
    let mut client = MetaAi::new(cli.config()).context("failed to build the HTTP client")?;
    let mut options = PromptOptions {
        new_conversation: cli.new_conversation,
        ..PromptOptions::default()
    };

    if !cli.prompt.is_empty() {
        let message = cli.prompt.join(" ");
        let answer = ask(&mut client, &message, options, cli.stream)?;
        print_answer(&answer, cli.json)?;
        return Ok(true);
    }

    let mut all_ok = true;
    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read prompt from stdin")?;
        let message = line.trim();
        if message.is_empty() {
            continue;
        }

        match ask(&mut client, message, options, cli.stream) {
            Ok(answer) => print_answer(&answer, cli.json)?,
            Err(error) => {
                eprintln!("error: {error:#}");
                all_ok = false;
            }
        }
        // Only the first prompt of a session opens a new conversation.
        options.new_conversation = false;
    }
    debug!(conversation_id = client.conversation_id(), "stdin closed");
    Ok(all_ok)
}

fn ask(
    client: &mut MetaAi,
    message: &str,
    options: PromptOptions,
    stream: bool,
) -> Result<ReconciledAnswer> {
    let mut printer = PartialPrinter::default();
    let answer = client.prompt_with_handler(message, options, |event| {
        if stream {
            printer.observe(event);
        }
    });
    printer.finish();
    answer.context("prompt failed")
}

/// Echoes the growing answer to stderr, writing only what is new.
#[derive(Default)]
struct PartialPrinter {
    shown: String,
}

impl PartialPrinter {
    fn observe(&mut self, event: PromptEvent) {
        let mut stderr = io::stderr().lock();
        match event {
            PromptEvent::Partial { text } => {
                let _ = match text.strip_prefix(self.shown.as_str()) {
                    Some(delta) => write!(stderr, "{delta}"),
                    None => write!(stderr, "\n{text}"),
                };
                let _ = stderr.flush();
                self.shown = text;
            }
            PromptEvent::Retrying {
                attempt,
                max_attempts,
            } => {
                let _ = writeln!(stderr, "\n[retrying {}/{max_attempts}]", attempt + 1);
                self.shown.clear();
            }
        }
    }

    fn finish(&mut self) {
        if !self.shown.is_empty() && !self.shown.ends_with('\n') {
            eprintln!();
        }
        self.shown.clear();
    }
}

fn print_answer(answer: &ReconciledAnswer, json: bool) -> Result<()> {
    let mut stdout = io::stdout().lock();
    if json {
        let rendered = serde_json::to_string_pretty(answer).context("failed to encode answer")?;
        writeln!(stdout, "{rendered}")?;
        return Ok(());
    }

    write!(stdout, "{}", answer.message)?;
    if !answer.sources.is_empty() {
        writeln!(stdout, "\nSources:")?;
        for source in &answer.sources {
            writeln!(stdout, "- {} <{}>", source.title, source.url)?;
        }
    }
    if !answer.media.is_empty() {
        writeln!(stdout, "\nMedia:")?;
        for media in &answer.media {
            writeln!(stdout, "- {}", media.url)?;
        }
    }
    stdout.flush()?;
    Ok(())
}
