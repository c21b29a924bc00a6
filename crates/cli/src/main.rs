use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use config::{Settings, SettingsManager};
use eyre::{OptionExt, WrapErr};
use explorer::{Event, FramesExplorer, RenderStyle, SessionId};
use tracing_subscriber::EnvFilter;

mod executor;

use executor::FileExecutor;

#[derive(Debug, Parser)]
#[command(version, about = "Render captured call stacks the way the frames explorer shows them")]
struct Cli {
    /// Settings file (defaults to the user configuration directory)
    #[clap(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render a snapshot file
    Render {
        snapshot: PathBuf,

        #[command(flatten)]
        view: ViewArgs,
    },
    /// Render the fault handler report named in the settings
    Fault {
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Manage the settings file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Args)]
struct ViewArgs {
    /// Sort threads by name instead of capture order
    #[clap(long)]
    sort: bool,

    /// Print the rich text labels instead of plain text
    #[clap(long)]
    markup: bool,

    /// Drop captured locals from the frames
    #[clap(long)]
    no_locals: bool,

    /// Print the locals of the frame at THREAD FRAME as JSON
    #[clap(long, num_args = 2, value_names = ["THREAD", "FRAME"])]
    inspect: Option<Vec<usize>>,

    #[clap(long, default_value = "snapshot")]
    session: String,
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Print the effective settings
    Show,
    /// Write the default settings if no settings file exists
    Init,
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();
    tracing::debug!(?args, "parsed command line arguments");

    let config_path = match args.config {
        Some(path) => path,
        None => config::default_path().ok_or_eyre("cannot determine configuration directory")?,
    };

    match args.command {
        Command::Render { snapshot, view } => {
            let settings = load_settings(&config_path)?;
            render(&settings, &snapshot, view, false)
        }
        Command::Fault { view } => {
            let settings = load_settings(&config_path)?;
            let report = settings.fault_file().into_owned();
            render(&settings, &report, view, true)
        }
        Command::Config { action } => match action {
            ConfigAction::Show => {
                let settings = load_settings(&config_path)?;
                print!(
                    "{}",
                    toml::to_string_pretty(&settings).context("serialising settings")?
                );
                Ok(())
            }
            ConfigAction::Init => {
                let manager = SettingsManager::new(&config_path).context("initialising settings")?;
                println!("{}", manager.path().display());
                Ok(())
            }
        },
    }
}

fn load_settings(path: &Path) -> eyre::Result<Settings> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no settings file, using defaults");
        return Ok(Settings::default());
    }
    Settings::load_from(path).wrap_err("loading settings")
}

fn render(settings: &Settings, source: &Path, view: ViewArgs, fault: bool) -> eyre::Result<()> {
    let (tx, rx) = crossbeam_channel::unbounded();
    let mut explorer = FramesExplorer::new(RenderStyle::default(), settings);
    if view.no_locals {
        explorer.set_capture_locals(false);
    }

    let session = SessionId::new(view.session);
    explorer
        .add_session(session.clone(), Box::new(FileExecutor::new(source, tx)))
        .wrap_err("registering session")?;
    explorer.set_active(&session);
    explorer.set_visible(true);

    let requested = if fault {
        explorer.load_fault_capture()
    } else {
        explorer.refresh()
    };
    eyre::ensure!(requested, "{} is not available", source.display());

    for reply in rx.try_iter() {
        explorer.handle_reply(reply);
    }

    let events = explorer.events();
    let browser = explorer
        .active_browser_mut()
        .ok_or_eyre("session disappeared while rendering")?;
    eyre::ensure!(
        browser.snapshot().is_some(),
        "could not read frames from {}",
        source.display()
    );

    if view.sort {
        browser.sort_by_header();
    }

    if view.markup {
        let tree = browser.tree().ok_or_eyre("frames browser was not set up")?;
        for id in browser.rows() {
            if let Some(node) = tree.node(id) {
                println!("{}", node.label());
            }
        }
    } else {
        for line in browser.plain_lines() {
            println!("{line}");
        }
    }

    if let Some([thread, frame]) = view.inspect.as_deref() {
        browser
            .set_current(*thread, *frame)
            .wrap_err("selecting frame to inspect")?;
        if !browser.inspect_current() {
            eprintln!("no locals captured for frame {thread}:{frame}");
        }
    }

    for event in events.try_iter() {
        match event {
            Event::NavigateTo(nav) => println!("-> {}:{}", nav.filename, nav.lineno),
            Event::ShowNamespace(locals) => println!(
                "{}",
                serde_json::to_string_pretty(&locals).context("serialising locals")?
            ),
            Event::FrameActivated { .. } => {}
        }
    }

    Ok(())
}
