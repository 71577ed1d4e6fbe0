use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use paperchat_core::ChatSession;
use paperchat_schema::{ChatError, ChatbotConfig, UploadReport};

#[derive(Parser)]
#[command(name = "paperchat", version, about = "Chat with your PDF documents")]
struct Cli {
    /// PDF files to index before the chat loop starts.
    #[arg(value_name = "FILES")]
    files: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _guard = init_tracing()?;

    // Fatal configuration problems are reported before any pipeline stage.
    let config = match ChatbotConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    tracing::info!(model = %config.llm_model, embedding = %config.embedding_model, "configuration loaded");

    let mut session = match ChatSession::from_config(config) {
        Ok(session) => session,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    if !cli.files.is_empty() {
        upload(&mut session, &cli.files).await;
    }

    run_repl(&mut session).await
}

/// Stderr log layer plus a daily-rolling file under `~/.paperchat/logs`.
fn init_tracing() -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_dir = std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".paperchat")
        .join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = tracing_appender::rolling::daily(&log_dir, "paperchat.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .init();

    Ok(guard)
}

async fn run_repl(session: &mut ChatSession) -> Result<()> {
    println!("paperchat - ask questions about your PDFs.");
    println!("Commands: :upload <path>...   exit | quit");
    println!("---");

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let mut input = String::new();
        if stdin.read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        if input == "quit" || input == "exit" {
            break;
        }
        if input.is_empty() {
            continue;
        }

        if let Some(paths) = parse_upload_command(input) {
            if paths.is_empty() {
                println!("usage: :upload <path>...");
                continue;
            }
            upload(session, &paths).await;
            continue;
        }

        if !session.has_documents() {
            println!("No documents indexed yet. Use :upload <path> first.");
            continue;
        }

        match session.ask(input).await {
            Ok(answer) => println!("{answer}"),
            Err(err) => report_error(&err),
        }
    }

    Ok(())
}

/// Paths from an `:upload <path>...` line. `None` when the line is not an
/// upload command; the command token must end at a whitespace boundary so
/// `:uploadanything` is treated as a question, not a command.
fn parse_upload_command(input: &str) -> Option<Vec<PathBuf>> {
    let rest = input.strip_prefix(":upload")?;
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.split_whitespace().map(PathBuf::from).collect())
}

async fn upload(session: &mut ChatSession, paths: &[PathBuf]) {
    match session.upload(paths).await {
        Ok(report) => print_report(&report),
        Err(err) => report_error(&err),
    }
}

fn print_report(report: &UploadReport) {
    println!(
        "Indexed {} document(s), {} chunk(s).",
        report.documents_indexed, report.chunks_indexed
    );
    for failure in &report.failures {
        eprintln!("skipped: {failure}");
    }
}

fn report_error(err: &ChatError) {
    eprintln!("Error: {err}");
    if err.is_retryable() {
        eprintln!("The service hiccupped; try the same request again.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_command_collects_paths() {
        let paths = parse_upload_command(":upload a.pdf b.pdf").unwrap();
        assert_eq!(paths, vec![PathBuf::from("a.pdf"), PathBuf::from("b.pdf")]);
    }

    #[test]
    fn bare_upload_command_has_no_paths() {
        let paths = parse_upload_command(":upload").unwrap();
        assert!(paths.is_empty());
    }

    #[test]
    fn glued_upload_prefix_is_not_a_command() {
        assert!(parse_upload_command(":uploadanything").is_none());
        assert!(parse_upload_command(":uploader a.pdf").is_none());
    }

    #[test]
    fn plain_question_is_not_a_command() {
        assert!(parse_upload_command("what does the report say?").is_none());
    }
}
