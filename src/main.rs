mod api;
mod catalog;
mod clipboard;
mod config;
mod error;
mod executor;
mod matcher;
mod model;
mod signal;
mod sources;

use crate::api::Backend;
use crate::catalog::Manager;
use crate::clipboard::ArboardSource;
use crate::clipboard::store::ClipStore;
use crate::config::{CONFIG_FILE, Config, config_dir, load_config};
use crate::executor::SystemLauncher;
use crate::signal::RefreshSignal;
use crate::sources::fallback::Fallback;
use crate::sources::{HostSource, Os};
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{error, info};
use std::fs::OpenOptions;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

const LOG_FILE: &str = "pal.log";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file to use instead of config.toml in the config directory
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log to stderr instead of pal.log
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every application as JSON, sorted by name
    List,
    /// Print applications matching a query as JSON, best match first
    Search { query: String },
    /// Launch an application by id
    Launch { id: String },
    /// Print captured clipboard history as JSON, newest first
    History,
    /// Capture the clipboard and answer commands read from stdin
    Daemon,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Resolve the per-user directory and start logging into it
    let dir = config_dir()?;
    init_logging(&dir, args.verbose)?;

    // 2. Load Config
    let config_path = args.config.clone().unwrap_or_else(|| dir.join(CONFIG_FILE));
    let config = load_config(&config_path)?;

    // 3. Wire the catalog, clip store and refresh signal
    let os = Os::current();
    let source = HostSource::new(os.clone(), config.catalog.extra_dirs.clone())
        .respect_no_display(config.catalog.respect_no_display);
    let manager = Manager::new(
        Box::new(source),
        Fallback::for_host(),
        Box::new(SystemLauncher::new(os)),
    )
    .with_exclusions(config.catalog.exclusions());
    let store = Arc::new(ClipStore::in_dir(&dir));
    let signal = RefreshSignal::new();
    let backend = Arc::new(Backend::new(Arc::new(manager), store.clone(), signal.clone()));

    // 4. Run the command
    match args.command {
        Command::List => println!("{}", backend.get_all_apps()),
        Command::Search { query } => println!("{}", backend.search_apps(&query)),
        Command::Launch { id } => backend.launch_app(&id)?,
        Command::History => println!("{}", backend.get_clip_history()),
        Command::Daemon => run_daemon(&backend, &config, store, signal)?,
    }

    Ok(())
}

fn init_logging(dir: &Path, verbose: bool) -> Result<()> {
    let env = env_logger::Env::default().default_filter_or("info");
    let mut builder = env_logger::Builder::from_env(env);
    if !verbose {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(LOG_FILE))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

fn run_daemon(
    backend: &Arc<Backend>,
    config: &Config,
    store: Arc<ClipStore>,
    signal: RefreshSignal,
) -> Result<()> {
    // Discovery can take a while, keep it off the command loop
    let manager = backend.manager().clone();
    thread::spawn(move || {
        if let Err(e) = manager.initialize() {
            error!("Failed to initialize application manager: {}", e);
        }
    });

    let capture = if config.clipboard.enabled {
        match clipboard::spawn(ArboardSource::new, store, signal, &config.clipboard) {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!("Clipboard capture disabled: {:#}", e);
                None
            }
        }
    } else {
        info!("Clipboard capture disabled by config");
        None
    };

    let refreshes = backend.subscribe();
    thread::spawn(move || {
        for () in refreshes {
            println!("event: refresh");
        }
    });

    for line in io::stdin().lock().lines() {
        let line = line?;
        let line = line.trim();
        let (command, arg) = line
            .split_once(char::is_whitespace)
            .map(|(c, a)| (c, a.trim()))
            .unwrap_or((line, ""));

        match command {
            "" => continue,
            "list" => println!("{}", backend.get_all_apps()),
            "search" => println!("{}", backend.search_apps(arg)),
            "history" => println!("{}", backend.get_clip_history()),
            "launch" => match backend.launch_app(arg) {
                Ok(()) => println!("ok"),
                Err(e) => println!("error: {}", e),
            },
            "exec" => println!("{}", backend.execute_command(arg).trim_end()),
            "last" => println!(
                "command: {:?}\n{}",
                backend.last_command(),
                backend.last_output()
            ),
            "toggle" => println!("visible: {}", backend.toggle_visibility()),
            "status" => println!(
                "visible: {}, applications: {}",
                backend.is_visible(),
                backend.manager().app_count()
            ),
            "refresh" => match backend.manager().refresh() {
                Ok(()) => println!("ok: {} applications", backend.manager().app_count()),
                Err(e) => println!("error: {}", e),
            },
            "quit" | "exit" => break,
            other => println!("error: unknown command {:?}", other),
        }
    }

    if let Some(handle) = capture {
        handle.stop();
    }
    Ok(())
}
