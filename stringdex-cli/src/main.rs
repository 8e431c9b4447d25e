use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde_json::json;
use stringdex::{
    CancelToken, Config, Error, IndexStore, Scanner, SearchOptions, SearchTarget,
    formats::strings::format_pair, store::default_database_path,
};
use stringdex_cli::{
    output,
    validation::{
        ValidationContext, is_language_identifier, parse_delete_target, validate_context,
    },
};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

const CONFIG_FILE_NAME: &str = "stringdex.toml";

#[derive(Parser, Debug)]
#[command(name = "stringdex", author, version, about, long_about = None)]
struct Args {
    /// Index database (defaults to stringdex.db next to the executable)
    #[arg(long, global = true, env = "STRINGDEX_DB")]
    db: Option<PathBuf>,

    /// Configuration file (defaults to stringdex.toml next to the executable)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    commands: Commands,
}

/// Supported subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Index the localized strings below one or more paths (all or nothing).
    Add {
        /// Bundle or directory to scan
        #[arg(required = true)]
        paths: Vec<String>,

        /// Scan the whole tree instead of a single bundle's resources
        #[arg(short, long)]
        recursive: bool,
    },

    /// Remove bundles from the index by id or path.
    Delete {
        /// Bundle id or bundle path
        #[arg(required = true)]
        targets: Vec<String>,

        /// Also remove every bundle below a given path
        #[arg(short, long)]
        recursive: bool,
    },

    /// Find translations matching a wildcard pattern (`%` any run, `_` one character).
    Search {
        pattern: String,

        /// Language prefix to search in (repeatable; defaults from config)
        #[arg(short, long = "lang")]
        langs: Vec<String>,

        /// Search every language
        #[arg(long, conflicts_with = "langs")]
        any_lang: bool,

        /// Match keys instead of values
        #[arg(long)]
        keys: bool,

        /// Match case exactly
        #[arg(long)]
        case_sensitive: bool,

        /// Stop after this many results
        #[arg(long)]
        limit: Option<usize>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,

        /// Display full values without truncation (even in terminal)
        #[arg(long)]
        full: bool,
    },

    /// Print every translation of one key in one bundle.
    Export {
        file_id: i64,
        key: String,

        /// Write CSV instead of `lang|value` lines
        #[arg(long)]
        csv: bool,
    },

    /// List indexed bundles, languages or keys.
    List {
        #[command(subcommand)]
        what: ListCommands,
    },

    /// Show counts for one bundle.
    Info { file_id: i64 },

    /// Decode a single resource file and print its pairs.
    Parse {
        file: String,

        /// Output form
        #[arg(long, value_enum, default_value_t = Emit::Json)]
        emit: Emit,
    },

    /// Generate shell completions.
    Completions { shell: Shell },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Emit {
    /// Format, pairs and warnings as JSON
    Json,
    /// Legacy `"key" = "value";` lines
    Strings,
}

#[derive(Subcommand, Debug)]
enum ListCommands {
    /// Bundles, optionally filtered by id or name substring
    Files { term: Option<String> },
    /// Languages with their entry counts
    Languages { term: Option<String> },
    /// Keys of one bundle
    Keys { file_id: i64 },
    /// Resource tables of one bundle with their entry counts
    Tables { file_id: i64 },
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e @ Error::Usage(_)) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(args: Args) -> Result<(), Error> {
    let db = match args.db {
        Some(db) => db,
        None => default_database_path()?,
    };
    let config = load_config(args.config.as_deref())?;
    debug!(db = %db.display(), "using index");

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match args.commands {
        Commands::Add { paths, recursive } => {
            let context = paths
                .iter()
                .fold(ValidationContext::new(), |ctx, p| ctx.with_input_path(p.clone()));
            validate_context(&context).map_err(Error::usage)?;

            let cancel = CancelToken::new();
            let handler_token = cancel.clone();
            if let Err(e) = ctrlc::set_handler(move || handler_token.cancel()) {
                warn!(error = %e, "cannot install Ctrl-C handler");
            }

            let mut store = IndexStore::open(&db)?;
            let scanner = Scanner::new(&config.scan, cancel)?;
            let summaries =
                store.add_scans(paths.iter().map(|path| scanner.scan(path, recursive)))?;
            for (path, summary) in paths.iter().zip(&summaries) {
                output::write_add_summary(&mut out, path, summary)?;
            }
        }

        Commands::Delete { targets, recursive } => {
            let targets = targets
                .iter()
                .map(|t| parse_delete_target(t))
                .collect::<Result<Vec<_>, _>>()
                .map_err(Error::usage)?;

            let mut store = IndexStore::open_existing(&db)?;
            let mut deleted = Vec::new();
            for target in &targets {
                let removed = store.delete(target, recursive)?;
                if removed.is_empty() {
                    warn!(target = ?target, "nothing to delete");
                }
                deleted.extend(removed);
            }
            if deleted.is_empty() {
                writeln!(out, "  Nothing found.")?;
            } else {
                output::write_deleted(&mut out, &deleted)?;
            }
        }

        Commands::Search {
            pattern,
            langs,
            any_lang,
            keys,
            case_sensitive,
            limit,
            json,
            full,
        } => {
            let context = langs.iter().fold(
                ValidationContext::new().with_search_pattern(pattern.clone()),
                |ctx, l| ctx.with_language_prefix(l.clone()),
            );
            validate_context(&context).map_err(Error::usage)?;
            for lang in langs.iter().filter(|l| !is_language_identifier(l)) {
                debug!(prefix = %lang, "language prefix is not a BCP 47 tag; matching literally");
            }

            let mut options = SearchOptions::from(&config.search);
            if any_lang {
                options.languages.clear();
            } else if !langs.is_empty() {
                options.languages = langs;
            }
            if keys {
                options.target = SearchTarget::Keys;
            }
            if case_sensitive {
                options.case_insensitive = false;
            }
            options.limit = limit;

            let store = IndexStore::open_existing(&db)?;
            let hits = store.search(&pattern, &options)?;
            if json {
                write_json(&mut out, &hits)?;
            } else {
                output::write_hits(&mut out, &hits, output::terminal_columns(full))?;
            }
        }

        Commands::Export { file_id, key, csv } => {
            let store = IndexStore::open_existing(&db)?;
            let rows = store.export_entry(file_id, &key)?;
            if rows.is_empty() {
                eprintln!("No translations of '{}' in bundle {}", key, file_id);
            } else if csv {
                stringdex::Exporter::write_csv(&rows, &mut out)?;
            } else {
                output::write_export(&mut out, &rows)?;
            }
        }

        Commands::List { what } => {
            let store = IndexStore::open_existing(&db)?;
            match what {
                ListCommands::Files { term } => {
                    output::write_bundles(&mut out, &store.bundles(term.as_deref())?)?
                }
                ListCommands::Languages { term } => {
                    output::write_languages(&mut out, &store.languages(term.as_deref())?)?
                }
                ListCommands::Keys { file_id } => output::write_keys(&mut out, &store.keys(file_id)?)?,
                ListCommands::Tables { file_id } => {
                    output::write_tables(&mut out, &store.tables(file_id)?)?
                }
            }
        }

        Commands::Info { file_id } => {
            let store = IndexStore::open_existing(&db)?;
            match store.info(file_id)? {
                Some(info) => output::write_info(&mut out, &info)?,
                None => return Err(Error::NotFound(format!("bundle id {}", file_id))),
            }
        }

        Commands::Parse { file, emit } => {
            validate_context(&ValidationContext::new().with_input_file(file.clone()))
                .map_err(Error::usage)?;
            let bytes = std::fs::read(&file)?;
            let decoded = stringdex::parse(&bytes, config.scan.fallback_encoding())?;
            match emit {
                Emit::Json => {
                    let document = json!({
                        "file": file,
                        "format": decoded.format.to_string(),
                        "pairs": decoded.pairs,
                        "warnings": decoded.warnings,
                    });
                    write_json(&mut out, &document)?;
                }
                Emit::Strings => {
                    for warning in &decoded.warnings {
                        warn!(offset = warning.offset, "{}", warning.message);
                    }
                    for pair in &decoded.pairs {
                        writeln!(out, "{}", format_pair(pair))?;
                    }
                }
            }
        }

        Commands::Completions { shell } => {
            let mut command = Args::command();
            let name = command.get_name().to_string();
            clap_complete::generate(shell, &mut command, name, &mut out);
        }
    }

    out.flush()?;
    Ok(())
}

fn load_config(explicit: Option<&Path>) -> Result<Config, Error> {
    match explicit {
        Some(path) => {
            if !path.is_file() {
                return Err(Error::config(format!(
                    "config file does not exist: {}",
                    path.display()
                )));
            }
            Config::load_or_default(path)
        }
        None => {
            let exe = std::env::current_exe()?;
            match exe.parent() {
                Some(dir) => Config::load_or_default(dir.join(CONFIG_FILE_NAME)),
                None => Ok(Config::default()),
            }
        }
    }
}

fn write_json<W: Write, T: serde::Serialize>(mut out: W, value: &T) -> Result<(), Error> {
    serde_json::to_writer_pretty(&mut out, value)
        .map_err(|e| Error::Io(io::Error::other(e)))?;
    writeln!(out)?;
    Ok(())
}
