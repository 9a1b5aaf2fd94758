mod app;
mod assist;
mod challenges;
mod code_formatter;
mod db;
mod history;
mod http_client;
mod key_value;
mod request_builder;
mod settings;
mod types;
mod url_params;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::app::Playground;
use crate::assist::flows::{self, DocsInput, MockApiInput, SnippetInput, TestCasesInput};
use crate::assist::gemini::GeminiProvider;
use crate::code_formatter::validate_json;
use crate::db::Store;
use crate::history::format_relative_time;
use crate::key_value::{filter_known_headers, Field, SuggestionKey};
use crate::settings::{Settings, SnippetLanguage, BEARER_TOKEN_KEY};
use crate::types::{Auth, HttpMethod, ResponseOutcome};

#[derive(Parser)]
#[command(name = "playground")]
#[command(about = "API playground - compose, send and replay HTTP requests")]
struct Cli {
    /// Use a custom database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send an HTTP request
    Send(SendArgs),
    /// Inspect, replay or clear the request history
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },
    /// Build a request from a description and optionally send it
    Generate {
        /// What the request should do, e.g. "create a post for user 1"
        instruction: String,
        /// Send the generated request right away
        #[arg(long)]
        send: bool,
    },
    /// Practice challenges
    Challenges {
        #[command(subcommand)]
        command: ChallengeCommand,
    },
    /// Generate a mock API definition
    Mock {
        prompt: String,
    },
    /// Generate Markdown documentation for an endpoint
    Docs {
        prompt: String,
    },
    /// Generate a code snippet calling an endpoint
    Snippet {
        prompt: String,
        /// Defaults to the snippetLanguage setting
        #[arg(short, long)]
        language: Option<String>,
    },
    /// Generate test cases for an API
    Tests {
        api_definition: String,
        /// Data model (e.g. a JSON schema) for requests and responses
        #[arg(long)]
        data_model: Option<String>,
    },
    /// Complete a header name the way the header editor does
    Headers {
        /// Partial header name, e.g. "acc"
        text: String,
        /// Navigation keys to apply, e.g. down,down,enter
        #[arg(long, value_enum, value_delimiter = ',')]
        keys: Vec<NavKey>,
    },
    /// Show or change settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
}

#[derive(clap::Args)]
struct SendArgs {
    /// URL to request; a query string becomes parameter rows
    url: String,
    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET", value_parser = parse_method)]
    method: HttpMethod,
    /// Header as "Name: value", repeatable
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,
    /// Query parameter as "key=value", repeatable
    #[arg(short = 'q', long = "query")]
    query: Vec<String>,
    /// Request body
    #[arg(short = 'd', long = "data")]
    body: Option<String>,
    #[command(flatten)]
    auth: AuthArgs,
    /// Complete -H names that match exactly one known header
    #[arg(long)]
    complete_headers: bool,
    /// Print response headers
    #[arg(short, long)]
    include: bool,
}

#[derive(clap::Args)]
struct AuthArgs {
    #[arg(long, value_enum, default_value_t = AuthKind::None)]
    auth: AuthKind,
    /// Bearer token; defaults to the bearerToken setting
    #[arg(long)]
    token: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum AuthKind {
    None,
    Bearer,
}

#[derive(Clone, Copy, ValueEnum)]
enum NavKey {
    Down,
    Up,
    Enter,
    Escape,
}

impl From<NavKey> for SuggestionKey {
    fn from(key: NavKey) -> Self {
        match key {
            NavKey::Down => SuggestionKey::Down,
            NavKey::Up => SuggestionKey::Up,
            NavKey::Enter => SuggestionKey::Enter,
            NavKey::Escape => SuggestionKey::Escape,
        }
    }
}

#[derive(Subcommand)]
enum HistoryCommand {
    /// List recent requests, newest first
    List,
    /// Show a recorded request and its response
    Show { id: String },
    /// Send a recorded request again
    Replay {
        id: String,
        #[command(flatten)]
        auth: AuthArgs,
        #[arg(short, long)]
        include: bool,
    },
    /// Delete all history
    Clear,
}

#[derive(Subcommand)]
enum ChallengeCommand {
    /// List challenges
    List,
    /// Load a challenge's request and send it
    Start {
        id: String,
        #[command(flatten)]
        auth: AuthArgs,
        #[arg(short, long)]
        include: bool,
    },
    /// Ask the AI mentor for a new challenge
    Generate,
}

#[derive(Subcommand)]
enum SettingsCommand {
    Show,
    Set { key: String, value: String },
    /// Restore every setting to its default
    Reset,
}

fn parse_method(s: &str) -> Result<HttpMethod, String> {
    HttpMethod::from_str(s).ok_or_else(|| {
        let allowed: Vec<_> = HttpMethod::all().iter().map(|m| m.as_str()).collect();
        format!("expected one of {}", allowed.join(", "))
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let store = match &cli.db {
        Some(path) => Store::open(path)?,
        None => Store::open_default()?,
    };
    let mut playground = Playground::open(store).context("Failed to open playground")?;

    match cli.command {
        Commands::Send(args) => send(&mut playground, args).await?,
        Commands::History { command } => history(&mut playground, command).await?,
        Commands::Generate { instruction, send } => {
            let provider = GeminiProvider::from_env()?;
            playground.apply_assist(&provider, &instruction).await?;
            print_draft(&mut playground);
            if send {
                let outcome = playground.send().await;
                print_outcome(outcome, false);
            }
        }
        Commands::Challenges { command } => challenges(&mut playground, command).await?,
        Commands::Mock { prompt } => {
            let provider = GeminiProvider::from_env()?;
            let input = MockApiInput {
                prompt,
                creativity: Some(playground.settings().ai_creativity),
            };
            println!("{}", flows::generate_mock_api(&provider, &input).await?);
        }
        Commands::Docs { prompt } => {
            let provider = GeminiProvider::from_env()?;
            println!("{}", flows::generate_docs(&provider, &DocsInput { prompt }).await?);
        }
        Commands::Snippet { prompt, language } => {
            let language = match language {
                Some(raw) => raw.parse::<SnippetLanguage>().map_err(|_| {
                    let allowed: Vec<_> =
                        SnippetLanguage::all().iter().map(|l| l.as_str()).collect();
                    anyhow::anyhow!(
                        "Unsupported language '{}', expected one of {}",
                        raw,
                        allowed.join(", ")
                    )
                })?,
                None => playground.settings().snippet_language,
            };
            let provider = GeminiProvider::from_env()?;
            let input = SnippetInput {
                prompt,
                language,
                creativity: Some(playground.settings().ai_creativity),
            };
            println!("{}", flows::generate_snippet(&provider, &input).await?);
        }
        Commands::Tests {
            api_definition,
            data_model,
        } => {
            let provider = GeminiProvider::from_env()?;
            let input = TestCasesInput {
                api_definition,
                data_model,
                creativity: Some(playground.settings().ai_creativity),
            };
            let cases = flows::generate_test_cases(&provider, &input).await?;
            println!("{}", serde_json::to_string_pretty(&cases)?);
        }
        Commands::Headers { text, keys } => complete_header(&mut playground, &text, &keys),
        Commands::Settings { command } => settings(&mut playground, command)?,
    }

    Ok(())
}

/// Set bearer auth on the draft, falling back to the stored token.
fn apply_auth(playground: &mut Playground, args: AuthArgs) {
    let token = match args.auth {
        AuthKind::None => return,
        AuthKind::Bearer => args
            .token
            .unwrap_or_else(|| playground.settings().bearer_token.clone()),
    };
    if token.is_empty() {
        eprintln!("Warning: no bearer token given and {} is not set", BEARER_TOKEN_KEY);
    }
    playground.builder().set_auth(Auth::Bearer { token });
}

async fn send(playground: &mut Playground, args: SendArgs) -> Result<()> {
    let builder = playground.builder();
    builder.set_method(args.method);
    builder.paste_url(&args.url);

    for raw in &args.query {
        let (key, value) = raw.split_once('=').unwrap_or((raw.as_str(), ""));
        builder.query_params().push(key.trim(), value.trim());
    }

    let mut headers = builder.headers();
    for raw in &args.headers {
        let Some((name, value)) = raw.split_once(':') else {
            bail!("Invalid header '{}', expected \"Name: value\"", raw);
        };
        headers.add_row();
        let index = headers.rows().len() - 1;
        headers.update_field(index, Field::Key, name.trim());
        if args.complete_headers {
            if let Some(completed) = headers.complete_unique(index) {
                eprintln!("Completed header '{}' to {}", name.trim(), completed);
            }
        }
        let candidates = headers.suggestions().items();
        if !candidates.is_empty() {
            eprintln!("Header '{}': did you mean {}?", name.trim(), candidates.join(", "));
        }
        headers.handle_key(index, SuggestionKey::Escape);
        headers.update_field(index, Field::Value, value.trim());
    }

    if let Some(body) = &args.body {
        if !builder.set_body(body.as_str()) {
            eprintln!("Warning: {} requests carry no body; ignoring --data", args.method);
        } else if let Err(e) = validate_json(body) {
            eprintln!("Warning: {}", e);
        }
    }

    apply_auth(playground, args.auth);
    let outcome = playground.send().await;
    print_outcome(outcome, args.include);
    Ok(())
}

async fn history(playground: &mut Playground, command: HistoryCommand) -> Result<()> {
    match command {
        HistoryCommand::List => {
            if playground.history().is_empty() {
                println!("No history yet");
            }
            for entry in playground.history().iter() {
                println!(
                    "{:<14} {:<7} {:<13} {:<14} {}",
                    entry.id,
                    entry.request.method,
                    entry.outcome.status_line(),
                    format_relative_time(&entry.created_at),
                    entry.request.url
                );
            }
        }
        HistoryCommand::Show { id } => {
            if playground.load_from_history(&id).is_none() {
                bail!("No history entry with id {}", id);
            }
            print_draft(playground);
            println!();
            if let Some(outcome) = playground.last_outcome() {
                print_outcome(outcome, true);
            }
        }
        HistoryCommand::Replay { id, auth, include } => {
            if playground.load_from_history(&id).is_none() {
                bail!("No history entry with id {}", id);
            }
            apply_auth(playground, auth);
            let outcome = playground.send().await;
            print_outcome(outcome, include);
        }
        HistoryCommand::Clear => {
            playground.clear_history()?;
            println!("History cleared");
        }
    }
    Ok(())
}

async fn challenges(playground: &mut Playground, command: ChallengeCommand) -> Result<()> {
    match command {
        ChallengeCommand::List => {
            for challenge in playground.challenges().iter() {
                let marker = if challenge.generated { "*" } else { " " };
                println!(
                    "{}{:<18} {:>4} XP  {:<12} {:>3}%  {}",
                    marker,
                    challenge.id,
                    challenge.xp,
                    challenge.status.to_string(),
                    challenge.progress,
                    challenge.title
                );
            }
        }
        ChallengeCommand::Start { id, auth, include } => {
            let challenge = playground.start_challenge(&id)?;
            println!("{}\n{}\n", challenge.title, challenge.description);
            apply_auth(playground, auth);
            let outcome = playground.send().await;
            print_outcome(outcome, include);
        }
        ChallengeCommand::Generate => {
            let provider = GeminiProvider::from_env()?;
            let challenge = playground.generate_challenge(&provider).await?;
            println!("{} ({} XP)\n{}", challenge.title, challenge.xp, challenge.description);
            println!("Start it with: playground challenges start {}", challenge.id);
        }
    }
    Ok(())
}

fn settings(playground: &mut Playground, command: SettingsCommand) -> Result<()> {
    match command {
        SettingsCommand::Show => {
            let current = playground.settings();
            for key in Settings::KEYS {
                let mut value = current.get(key).unwrap_or_default();
                if key == BEARER_TOKEN_KEY && !value.is_empty() {
                    value = "********".to_string();
                }
                println!("{:<16} {}", key, value);
            }
        }
        SettingsCommand::Set { key, value } => {
            let mut updated = playground.settings().clone();
            updated.set(&key, &value)?;
            playground.save_settings(updated)?;
        }
        SettingsCommand::Reset => playground.save_settings(Settings::default())?,
    }
    Ok(())
}

fn complete_header(playground: &mut Playground, text: &str, keys: &[NavKey]) {
    if keys.is_empty() {
        for name in filter_known_headers(text) {
            println!("{}", name);
        }
        return;
    }

    let mut headers = playground.builder().headers();
    headers.add_row();
    let index = headers.rows().len() - 1;
    headers.update_field(index, Field::Key, text);
    for key in keys {
        headers.handle_key(index, (*key).into());
    }

    let active = headers.suggestions().active_index();
    for (i, name) in headers.suggestions().items().iter().enumerate() {
        let marker = if Some(i) == active { ">" } else { " " };
        println!("{} {}", marker, name);
    }
    println!("{}", headers.rows()[index].key);
}

fn print_draft(playground: &mut Playground) {
    let draft = playground.builder().draft();
    println!("{} {}", draft.method, draft.url);
    for (key, value) in draft.query_params.active_pairs() {
        println!("  ?{}={}", key, value);
    }
    for (key, value) in draft.headers.active_pairs() {
        println!("  {}: {}", key, value);
    }
    if draft.method.allows_body() && !draft.body.is_empty() {
        println!("\n{}", draft.body);
    }
}

fn print_outcome(outcome: &ResponseOutcome, include_headers: bool) {
    let data = outcome.data();
    println!(
        "{}  {}  {}",
        outcome.status_line(),
        data.time_display(),
        data.size_display()
    );
    if include_headers {
        for (name, value) in &data.headers {
            println!("{}: {}", name, value);
        }
    }
    println!();
    println!("{}", data.body_text);
}
