use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mdkw::index::{KeywordIndex, MemoryIndex};
use mdkw::keywords::{KeywordTable, SyncSession};
use mdkw::maildir::{is_system_flag, MaildirInfo};
use mdkw::output;
use mdkw::utils::{get_config_path, AppConfig};
use mdkw::KeywordError;
use regex::Regex;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mdkw")]
#[command(about = "Inspect and update maildir keyword files")]
#[command(
    after_help = "Commands that modify a keyword file assume no other process is syncing the mailbox at the same time."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List keyword slots of a mailbox
    List {
        /// Mailbox control directory
        dir: PathBuf,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,

        /// Only show names matching this regex
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// Show the slot of a keyword (exit status 1 if unknown)
    Lookup {
        /// Mailbox control directory
        dir: PathBuf,

        /// Keyword name (case-insensitive)
        name: String,
    },
    /// Register keywords, allocating slots for new names
    Add {
        /// Mailbox control directory
        dir: PathBuf,

        /// Keyword names
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Print the filename characters for keyword names
    Encode {
        /// Mailbox control directory
        dir: PathBuf,

        /// Keyword names
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Print the keyword names encoded in a maildir filename
    Decode {
        /// Mailbox control directory
        dir: PathBuf,

        /// Message filename, e.g. 1700000000.M1P2.host:2,Sab
        filename: String,
    },
    /// Show the effective configuration
    Config {
        /// Write the default configuration if no config file exists
        #[arg(long)]
        init: bool,
    },
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => get_config_path()?,
    };
    let config = AppConfig::load_from(&config_path)?;
    let color = config.color && !cli.no_color;

    match cli.command {
        Commands::List { dir, json, filter } => {
            let filter = filter
                .map(|f| Regex::new(&f).with_context(|| format!("Invalid filter: {}", f)))
                .transpose()?;

            let mut table = KeywordTable::open(&dir, config.keywords);
            table.refresh()?;

            let entries = output::collect_entries(&table, filter.as_ref());
            if json {
                output::print_entries_json(&entries)?;
            } else if entries.is_empty() {
                println!("No keywords in {}", table.path().display());
            } else {
                output::print_entries(&entries, color)?;
            }
        }

        Commands::Lookup { dir, name } => {
            let mut table = KeywordTable::open(&dir, config.keywords);
            match table.lookup(&name)? {
                Some(slot) => {
                    let code = mdkw::keywords::slot_to_char(slot);
                    output::print_code(code, &format!("slot {}", slot), color)?;
                }
                None => {
                    println!("{}: not found", name);
                    std::process::exit(1);
                }
            }
        }

        Commands::Add { dir, names } => {
            let mut table = KeywordTable::open(&dir, config.keywords);
            for name in &names {
                match table.lookup_or_create(name) {
                    Ok(slot) => output::print_code(mdkw::keywords::slot_to_char(slot), name, color)?,
                    Err(e @ KeywordError::CapacityExhausted { .. }) => {
                        output::print_warning(&format!("{}: {}", name, e), color)?;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            table.commit()?;
        }

        Commands::Encode { dir, names } => {
            let mut table = KeywordTable::open(&dir, config.keywords);
            let mut index = MemoryIndex::with_keywords(&names);
            let keywords = index.keyword_names();

            let mut session = SyncSession::new(&mut table, &mut index);
            for (id, name) in keywords.iter().enumerate() {
                match session.keyword_char(id as u32)? {
                    Some(code) => output::print_code(code, name, color)?,
                    None => output::print_warning(
                        &format!("{}: no free keyword character", name),
                        color,
                    )?,
                }
            }
            session.finish()?;
        }

        Commands::Decode { dir, filename } => {
            let info = MaildirInfo::parse(&filename);
            let mut table = KeywordTable::open(&dir, config.keywords);
            let mut index = MemoryIndex::new();

            let mut session = SyncSession::new(&mut table, &mut index);
            for code in info.keyword_codes() {
                match session.char_keyword(code) {
                    Ok(id) => {
                        let name = session.index().name(id).unwrap_or_default().to_string();
                        output::print_code(code, &name, color)?;
                    }
                    Err(e @ KeywordError::InvalidCode(_)) => {
                        output::print_warning(&e.to_string(), color)?;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            session.finish()?;

            for flag in info.other_flags().filter(|&f| !is_system_flag(f)) {
                output::print_warning(&format!("unknown maildir flag {:?}", flag), color)?;
            }
        }

        Commands::Config { init } => {
            if init && !config_path.exists() {
                AppConfig::default().save_to(&config_path)?;
                println!("Wrote {}", config_path.display());
            }

            println!("Config file: {}", config_path.display());
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn init_tracing() {
    // RUST_LOG overrides; debug builds show our own info logs
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            EnvFilter::new("mdkw=info,warn")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
