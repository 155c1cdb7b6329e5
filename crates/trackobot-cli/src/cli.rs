use std::convert::Infallible;
use std::fs::File;
use std::io::{BufReader, BufWriter, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;

use crate::client::Trackobot;
use crate::config;
use crate::history::collect_pages;
use crate::logging;
use crate::params::{Hero, MetadataField, ResetMode, StatsMode, StatsQuery, StatsType, TimeRange, parse_date};
use crate::transport::{DEFAULT_BASE_URL, Transport, UreqTransport};

/// Where a command puts its JSON result. `-` means stdout.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Output {
    Stdout,
    File(PathBuf),
}

impl FromStr for Output {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "-" => Self::Stdout,
            path => Self::File(PathBuf::from(path)),
        })
    }
}

impl Output {
    /// Write `value` as pretty JSON; for files, print `"{summary} to {path}"`.
    fn write(&self, value: &impl Serialize, summary: &str) -> Result<()> {
        match self {
            Self::Stdout => {
                let text = serde_json::to_string_pretty(value).context("failed to serialize result")?;
                println!("{text}");
            }
            Self::File(path) => {
                let file = File::create(path)
                    .with_context(|| format!("failed to create {}", path.display()))?;
                let mut writer = BufWriter::new(file);
                serde_json::to_writer_pretty(&mut writer, value)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                writer
                    .flush()
                    .with_context(|| format!("failed to write {}", path.display()))?;
                tracing::info!(path = %path.display(), "wrote output");
                println!("{summary} to {}", path.display());
            }
        }
        Ok(())
    }
}

#[derive(Parser)]
#[command(name = "tb", version, about = "CLI for the Track-o-Bot API")]
struct Cli {
    /// Track-o-Bot username (overrides TRACKOBOT_USERNAME)
    #[arg(short, long, global = true)]
    username: Option<String>,

    /// Track-o-Bot password (overrides TRACKOBOT_PASSWORD; use '-' to read from stdin)
    #[arg(short, long, global = true)]
    password: Option<String>,

    /// Logging verbosity; repeat to increase, i.e. -vvvv
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Append logs to this file instead of stderr
    #[arg(short, long, global = true)]
    log: Option<PathBuf>,

    /// Service base URL
    #[arg(long, global = true, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Skip confirmation prompts
    #[arg(short = 'y', long = "yes", global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new user on trackobot.com
    Create,
    /// Fetch game history into a JSON file
    History {
        /// Number of pages to fetch (15 games each)
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        num_pages: u32,
        /// Page to start from
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        start: u32,
        /// Only fetch arena games
        #[arg(long)]
        arena: bool,
        /// Only fetch games matching this search
        #[arg(short, long, conflicts_with = "arena")]
        query: Option<String>,
        /// File to write to ('-' for stdout)
        #[arg(short, long, default_value = "history.json")]
        output: Output,
    },
    /// Delete a game
    Delete {
        /// Game ID
        id: u64,
    },
    /// Fetch the supported deck archetypes
    Decks {
        /// File to write to ('-' for stdout)
        #[arg(short, long, default_value = "decks.json")]
        output: Output,
    },
    /// Generate a one-time profile link
    OneTimeAuth,
    /// Rename your user (not supported by the API)
    Rename {
        /// New username
        #[arg(short, long, default_value = "hue-jass")]
        name: String,
    },
    /// Reset game data for MODES; all modes when none are given
    Reset {
        #[arg(value_enum)]
        modes: Vec<ResetMode>,
    },
    /// Enable or disable automatic deck tracking
    Toggle {
        /// Disable tracking instead of enabling it
        #[arg(long)]
        no_track: bool,
    },
    /// Change one metadata field of a game
    Modify {
        /// Game ID
        id: u64,
        /// Field to change
        #[arg(value_enum)]
        field: MetadataField,
        /// New value
        value: String,
    },
    /// Fetch statistics into a JSON file
    Stats {
        /// Type of stats
        #[arg(short = 't', long = "type", value_enum, default_value_t = StatsType::Decks)]
        stats_type: StatsType,
        /// Time range
        #[arg(short, long, value_enum, default_value_t = TimeRange::CurrentMonth)]
        range: TimeRange,
        /// Game mode
        #[arg(short, long, value_enum, default_value_t = StatsMode::Ranked)]
        mode: StatsMode,
        /// Only games played as this hero
        #[arg(long, value_enum)]
        hero: Option<Hero>,
        /// Only games played against this hero
        #[arg(long, value_enum)]
        opponent: Option<Hero>,
        /// Only games played with this deck ID
        #[arg(short, long)]
        deck: Option<String>,
        /// Only games played against this deck ID
        #[arg(long)]
        versus_deck: Option<String>,
        /// Start date for --range custom (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,
        /// End date for --range custom (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,
        /// Also print overall totals
        #[arg(long)]
        summary: bool,
        /// File to write to ('-' for stdout)
        #[arg(short, long, default_value = "stats.json")]
        output: Output,
    },
    /// Upload the game described in FILE
    Upload {
        /// JSON file with the game data
        file: PathBuf,
        /// File to write the created game to ('-' for stdout)
        #[arg(short, long, default_value = "game.json")]
        output: Output,
    },
}

// -- helpers --

/// Extract a count field for display. Returns "-" for missing fields.
fn display_count(value: &Value, key: &str) -> String {
    match value[key].as_u64() {
        Some(n) => n.to_string(),
        None => "-".to_string(),
    }
}

fn print_summary(stats: &Value) {
    let overall = &stats["stats"]["overall"];
    println!(
        "{} total games, with {} wins and {} losses",
        display_count(overall, "total"),
        display_count(overall, "wins"),
        display_count(overall, "losses"),
    );
}

/// Ask the user for confirmation on stderr. Returns Ok(()) if confirmed, Err if declined.
/// Auto-confirms if `--yes` was passed or if stdin is not a terminal.
fn confirm(prompt: &str, yes: bool) -> Result<()> {
    if yes || !std::io::stdin().is_terminal() {
        return Ok(());
    }
    eprint!("{prompt}");
    std::io::stderr()
        .flush()
        .context("failed to flush stderr")?;

    let mut input = String::new();
    std::io::stdin()
        .read_line(&mut input)
        .context("failed to read confirmation")?;
    let answer = input.trim().to_lowercase();
    if answer == "y" || answer == "yes" {
        Ok(())
    } else {
        bail!("aborted")
    }
}

// -- command handlers --

fn handle_create<T: Transport>(transport: &T) -> Result<()> {
    let user = Trackobot::create_user(transport)?;
    tracing::info!(username = %user.username, "created user");
    println!("Username: {}\nPassword: {}", user.username, user.password);
    Ok(())
}

fn handle_history<T: Transport>(
    client: &Trackobot<T>,
    start: u32,
    num_pages: u32,
    arena: bool,
    query: Option<&str>,
    output: &Output,
) -> Result<()> {
    let games = collect_pages(start, num_pages, |page| match (arena, query) {
        (true, _) => client.arena_history(page),
        (false, Some(q)) => client.search_history(q, page),
        (false, None) => client.history(page),
    })
    .context("failed to fetch history")?;
    output.write(&games, &format!("Wrote {} games", games.len()))
}

fn handle_reset<T: Transport>(client: &Trackobot<T>, modes: Vec<ResetMode>, yes: bool) -> Result<()> {
    let selected = if modes.is_empty() { None } else { Some(modes.as_slice()) };
    let label = match selected {
        Some(modes) => modes
            .iter()
            .map(ResetMode::as_api_str)
            .collect::<Vec<_>>()
            .join(", "),
        None => "all modes".to_string(),
    };
    confirm(&format!("Reset game data for {label}? [y/N] "), yes)?;
    client.reset(selected)?;
    println!("Reset {label}");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn build_stats_query(
    stats_type: StatsType,
    range: TimeRange,
    mode: StatsMode,
    hero: Option<Hero>,
    opponent: Option<Hero>,
    deck: Option<String>,
    versus_deck: Option<String>,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<StatsQuery> {
    if range != TimeRange::Custom && (start.is_some() || end.is_some()) {
        bail!("--start and --end only apply to --range custom");
    }
    Ok(StatsQuery {
        stats_type,
        time_range: range,
        mode,
        hero,
        opponent,
        deck,
        opponent_deck: versus_deck,
        start: start.map(parse_date).transpose()?,
        end: end.map(parse_date).transpose()?,
    })
}

fn handle_upload<T: Transport>(client: &Trackobot<T>, file: &Path, output: &Output) -> Result<()> {
    let reader = File::open(file).with_context(|| format!("failed to open {}", file.display()))?;
    let game: Value = serde_json::from_reader(BufReader::new(reader))
        .with_context(|| format!("{} is not valid JSON", file.display()))?;
    tracing::debug!(path = %file.display(), "loaded game data");
    let created = client.upload_game(&game)?;
    let id = &created["result"]["id"];
    tracing::info!(%id, "uploaded game");
    output.write(&created, &format!("Uploaded game {id}; wrote it"))
}

fn dispatch<T: Transport>(client: &Trackobot<T>, command: Commands, yes: bool) -> Result<()> {
    match command {
        Commands::Create => handle_create(client.transport()),
        Commands::History {
            num_pages,
            start,
            arena,
            query,
            output,
        } => handle_history(client, start, num_pages, arena, query.as_deref(), &output),
        Commands::Delete { id } => {
            confirm(&format!("Delete game {id}? [y/N] "), yes)?;
            client.delete_game(id)?;
            println!("Game {id} deleted");
            Ok(())
        }
        Commands::Decks { output } => {
            let decks = client.decks()?;
            output.write(&decks, "Wrote decks")
        }
        Commands::OneTimeAuth => {
            println!("{}", client.one_time_auth()?);
            Ok(())
        }
        Commands::Rename { name } => {
            client.rename_user(&name)?;
            println!("Done");
            Ok(())
        }
        Commands::Reset { modes } => handle_reset(client, modes, yes),
        Commands::Toggle { no_track } => {
            client.toggle_tracking(!no_track)?;
            println!(
                "Deck tracking {}",
                if no_track { "disabled" } else { "enabled" }
            );
            Ok(())
        }
        Commands::Modify { id, field, value } => {
            if !client.modify_metadata(id, field, value)? {
                bail!("the service did not confirm the change to game {id}");
            }
            println!("Updated {field} of game {id}");
            Ok(())
        }
        Commands::Stats {
            stats_type,
            range,
            mode,
            hero,
            opponent,
            deck,
            versus_deck,
            start,
            end,
            summary,
            output,
        } => {
            let query = build_stats_query(
                stats_type,
                range,
                mode,
                hero,
                opponent,
                deck,
                versus_deck,
                start.as_deref(),
                end.as_deref(),
            )?;
            let stats = client.stats(&query)?;
            if summary {
                print_summary(&stats);
            }
            output.write(&stats, "Wrote stats")
        }
        Commands::Upload { file, output } => handle_upload(client, &file, &output),
    }
}

// -- main dispatch --

/// Parse CLI arguments and execute the corresponding Track-o-Bot command.
pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    logging::init(cli.verbose, cli.log.as_deref())?;
    let transport = UreqTransport::new(cli.base_url);

    if matches!(cli.command, Commands::Create) {
        return handle_create(&transport);
    }
    let credentials =
        config::resolve_credentials(cli.username.as_deref(), cli.password.as_deref())?;
    tracing::debug!(username = credentials.username(), "resolved credentials");
    let client = Trackobot::with_transport(transport, credentials);
    dispatch(&client, cli.command, cli.yes)
}
