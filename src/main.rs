use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use mentionable_text::{
    mentionable_text_input::{
        mention_utils::parse_canonical,
        render::{render_views, wrap_overlay},
        trigger_query::{classify_query, extract_query},
    },
    BufferSurface, LookupResult, Mention, MentionsConfig, MentionsInput, Responder, SearchRequest, TextSurface,
};


#[derive(Parser, Debug)]
#[clap(name = "mentionable-text", version, about = "Inspect and exercise the mention engine")]
struct Cli {
    /// A JSON file with a mentions config. Defaults apply to every missing field.
    #[clap(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging output.
    #[clap(short, long, action, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a canonical message and print its raw, canonical and highlighted forms.
    Render {
        /// The canonical message, e.g. `hi @[Bob](user:5)`.
        #[clap(value_parser)]
        message: String,

        /// A JSON array of known mentions; tokens not listed stay as literal text.
        #[clap(short, long)]
        mentions: Option<PathBuf>,
    },
    /// Print the mention query found at the caret.
    Query {
        #[clap(value_parser)]
        text: String,

        /// Caret byte offset. Defaults to the end of the text.
        #[clap(long)]
        caret: Option<usize>,
    },
    /// Type text into the engine, run the debounced lookup, and print the dropdown.
    Complete {
        #[clap(value_parser)]
        text: String,

        /// A JSON array of lookup results to search by name.
        #[clap(short, long)]
        results: PathBuf,

        /// Confirm the first candidate and print the resulting text.
        #[clap(long, action)]
        confirm: bool,
    },
}


#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => MentionsConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => MentionsConfig::default(),
    };

    match cli.command {
        Command::Render { message, mentions } => {
            let known = mentions.as_deref().map(read_json::<Vec<Mention>>).transpose()?;
            let parsed = parse_canonical(&message, &config, known.as_deref());
            let views = render_views(&parsed.raw_text, &parsed.mentions, &config);
            println!("raw:         {}", parsed.raw_text);
            println!("canonical:   {}", views.canonical);
            println!("highlighted: {}", wrap_overlay(&views.highlighted, &config.templates));
            println!("mentions:    {}", serde_json::to_string(&parsed.mentions)?);
        }
        Command::Query { text, caret } => {
            let caret = caret.unwrap_or(text.len());
            let found = extract_query(&text, caret, &config);
            match found {
                Some(m) => println!("query: {:?} at bytes {}..{}", m.text, m.start, m.end),
                None => println!("query: none"),
            }
            println!("action: {:?}", classify_query(found, &config, false));
        }
        Command::Complete { text, results, confirm } => {
            let results: Vec<LookupResult> = read_json(&results)?;
            complete(config, &text, results, confirm).await;
        }
    }
    Ok(())
}

async fn complete(config: MentionsConfig, text: &str, results: Vec<LookupResult>, confirm: bool) {
    let delay = config.search_delay();
    let lookup = move |request: SearchRequest, responder: Responder| {
        let query = request.query.to_lowercase();
        let matches = results.iter()
            .filter(|r| r.name.to_lowercase().contains(&query))
            .cloned()
            .collect();
        responder.respond(matches);
    };
    let mut input = MentionsInput::new(config, BufferSurface::new()).lookup(lookup);

    for ch in text.chars() {
        input.surface_mut().type_str(ch.encode_utf8(&mut [0; 4]));
        input.on_input();
    }
    tokio::time::sleep(delay + std::time::Duration::from_millis(1)).await;
    let handled = input.process_events();
    debug!("Handled {handled} engine events");

    match input.candidates() {
        Some(list) => {
            for candidate in list.items() {
                let marker = if list.active().is_some_and(|a| a.uid == candidate.uid) { "*" } else { " " };
                println!("{marker} {}", candidate.item_html);
            }
        }
        None => println!("(no candidates)"),
    }

    if confirm && input.confirm_active() {
        println!("text:      {:?}", input.surface().text());
        input.with_canonical_value(|value| println!("canonical: {value}"));
        println!("overlay:   {}", input.surface().overlay_html());
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse JSON from {}", path.display()))
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
