use std::io::Write as _;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use agentloop::{
    Config,
    cli::{Cli, LineAction, LineReader},
    core::{
        Sandbox,
        agent::{Agent, Conversation, OpenAiProvider, Session, ToolRouter},
    },
    ui::{ConsoleView, banner},
};

const PROMPT: &str = "User: ";

#[tokio::main]
async fn main() -> ExitCode {
    let _cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(config.debug);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so they never interleave with assistant output.
fn init_tracing(debug: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if debug { "agentloop=debug" } else { "warn" })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(config: Config) -> anyhow::Result<()> {
    let session = Arc::new(Session::new());
    let sandbox = Sandbox::new(&config.work_dir);
    let tools = ToolRouter::new(sandbox.clone(), session.clone(), config.result_limit());
    let provider = OpenAiProvider::new(
        config.api_key(),
        &config.base_url,
        config.stream,
        config.request_timeout(),
    )?;

    let endpoint = provider.endpoint().to_string();
    let agent = Agent::new(
        Box::new(provider),
        tools,
        session.clone(),
        &config.model,
        config.max_tokens,
    );

    tracing::info!(
        provider = agent.provider_name(),
        model = %config.model,
        %endpoint,
        stream = config.stream,
        "starting session"
    );

    println!("{}", banner(sandbox.root()));

    let mut view = ConsoleView::stdout();
    let mut conversation = Conversation::new();
    let mut input = LineReader::stdin();

    loop {
        print!("{PROMPT}");
        std::io::stdout().flush()?;

        let line = match input.next_action().await? {
            LineAction::Exit => break,
            LineAction::Skip => continue,
            LineAction::Prompt(line) => line,
        };

        conversation.add_user_message(session.reminders().inject_into(&line));
        let checkpoint = conversation.checkpoint();

        if let Err(e) = agent
            .query(&mut conversation, |event| view.handle(event))
            .await
        {
            tracing::debug!(error = %e, "turn failed, rolling back");
            conversation.rollback(checkpoint);
            view.error(&e.to_string());
        }
    }

    Ok(())
}
