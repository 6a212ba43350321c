//! `skindex`: track which skins you own, browse the catalog and publish a
//! public profile.
//!
//! # Usage
//!
//! ```
//! skindex login you@example.com
//! skindex list --mode theme --rarity Epic
//! skindex own colt_outlaw
//! skindex publish --name "Colt main"
//! skindex --backend sqlite import skins.json
//! skindex                      # interactive browser
//! ```

mod app;
mod auth;
mod client;
mod commands;
mod config;
mod prefs;
mod ui;

use std::{
  io::{self, BufRead, Write},
  path::PathBuf,
  sync::Arc,
  time::Duration,
};

use anyhow::{Context, Result, bail};
use app::App;
use auth::{AuthClient, SessionFile, SignUp};
use clap::{Parser, Subcommand};
use client::{ApiConfig, RestBackend};
use commands::{DraftEdits, ListFilter, Runner};
use config::{BackendKind, Config, Overrides};
use crossterm::{
  event::{self, Event},
  execute,
  terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use prefs::JsonCollapseState;
use ratatui::{Terminal, backend::CrosstermBackend};
use skindex_core::{
  auth::{Credentials, User},
  catalog::CatalogSource,
  facet::GroupMode,
  profile,
  rarity::RarityOrder,
  session::Collection,
  store::Backend,
};
use skindex_store_sqlite::SqliteStore;
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "skindex", about = "Track and share your skin collection")]
struct Args {
  /// Path to a TOML config file.
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Which backend to use.
  #[arg(long, env = "SKINDEX_BACKEND", value_enum)]
  backend: Option<BackendKind>,

  /// Base URL of the hosted API.
  #[arg(long, env = "SKINDEX_URL")]
  url: Option<String>,

  /// Public (anonymous) API key.
  #[arg(long, env = "SKINDEX_ANON_KEY")]
  anon_key: Option<String>,

  /// SQLite database file.
  #[arg(long, env = "SKINDEX_DB", value_name = "FILE")]
  db: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Sign in with email and password.
  Login {
    email:    String,
    /// Read from stdin when omitted.
    #[arg(long, env = "SKINDEX_PASSWORD", hide_env_values = true)]
    password: Option<String>,
  },
  /// Create an account.
  Signup {
    email:    String,
    #[arg(long, env = "SKINDEX_PASSWORD", hide_env_values = true)]
    password: Option<String>,
  },
  /// Send the confirmation email again.
  Resend { email: String },
  /// Sign out and forget the stored session.
  Logout,
  /// Show who is signed in.
  Whoami,
  /// List the catalog.
  List {
    #[command(flatten)]
    filter: FilterArgs,
    #[arg(long)]
    json:   bool,
  },
  /// Mark skins as owned.
  Own {
    #[arg(required = true)]
    ids: Vec<String>,
  },
  /// Mark skins as not owned.
  Disown {
    #[arg(required = true)]
    ids: Vec<String>,
  },
  /// Ownership counts.
  Stats {
    #[arg(long)]
    json: bool,
  },
  /// Public profile commands.
  Profile {
    #[command(subcommand)]
    action: ProfileCommand,
  },
  /// Save the profile and publish the current collection.
  Publish {
    #[command(flatten)]
    edits: DraftArgs,
  },
  /// Load catalog rows from a JSON array (SQLite backend only).
  Import { file: PathBuf },
  /// Interactive browser (the default).
  Tui,
}

#[derive(Subcommand, Debug)]
enum ProfileCommand {
  /// Show a public profile; yours when no id is given.
  Show {
    user_id: Option<String>,
    #[arg(long)]
    rarity:  Option<String>,
    #[arg(long)]
    query:   Option<String>,
    #[arg(long)]
    json:    bool,
  },
  /// Save profile fields without publishing.
  Save {
    #[command(flatten)]
    edits: DraftArgs,
  },
  /// Print your public link.
  Link,
  /// Find public profiles by display name.
  Search { name: String },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default)]
enum ModeArg {
  #[default]
  Brawler,
  Theme,
}

#[derive(clap::Args, Debug)]
struct FilterArgs {
  /// Group by brawler or by theme.
  #[arg(long, value_enum, default_value_t)]
  mode:       ModeArg,
  /// Only this brawler (or theme, with `--mode theme`).
  #[arg(long)]
  group:      Option<String>,
  /// Only this theme; implies `--mode theme`.
  #[arg(long, alias = "category", conflicts_with_all = ["mode", "group"])]
  theme:      Option<String>,
  #[arg(long)]
  rarity:     Option<String>,
  /// Text search over name, brawler, theme and rarity.
  #[arg(long, short)]
  query:      Option<String>,
  #[arg(long)]
  only_owned: bool,
}

impl From<FilterArgs> for ListFilter {
  fn from(a: FilterArgs) -> Self {
    Self {
      mode:       match a.mode {
        ModeArg::Brawler => GroupMode::Brawler,
        ModeArg::Theme => GroupMode::Theme,
      },
      group:      a.group,
      theme:      a.theme,
      rarity:     a.rarity,
      query:      a.query,
      only_owned: a.only_owned,
    }
  }
}

#[derive(clap::Args, Debug)]
struct DraftArgs {
  #[arg(long)]
  name:       Option<String>,
  #[arg(long)]
  bio:        Option<String>,
  #[arg(long, conflicts_with = "private")]
  public:     bool,
  #[arg(long)]
  private:    bool,
  #[arg(long, conflicts_with = "hide_owned")]
  show_owned: bool,
  #[arg(long)]
  hide_owned: bool,
}

fn flag(on: bool, off: bool) -> Option<bool> {
  match (on, off) {
    (true, _) => Some(true),
    (_, true) => Some(false),
    _ => None,
  }
}

impl From<DraftArgs> for DraftEdits {
  fn from(a: DraftArgs) -> Self {
    Self {
      display_name: a.name,
      bio:          a.bio,
      is_public:    flag(a.public, a.private),
      show_owned:   flag(a.show_owned, a.hide_owned),
    }
  }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  let config = Config::load(args.config.as_deref(), Overrides {
    backend:     args.backend,
    url:         args.url,
    anon_key:    args.anon_key,
    sqlite_path: args.db,
  })?;

  let command = args.command.unwrap_or(Command::Tui);
  init_tracing(&config, matches!(command, Command::Tui))?;

  config.check()?;

  match config.backend {
    BackendKind::Rest => run_rest(config, command).await,
    BackendKind::Sqlite => run_sqlite(config, command).await,
  }
}

/// Log to stderr, or to a file while the TUI owns the terminal. One-shot
/// commands only show warnings unless `RUST_LOG` says otherwise.
fn init_tracing(config: &Config, tui: bool) -> Result<()> {
  let default = if tui { LevelFilter::INFO } else { LevelFilter::WARN };
  let filter = EnvFilter::builder()
    .with_default_directive(default.into())
    .from_env_lossy();

  if tui {
    std::fs::create_dir_all(&config.data_dir)
      .with_context(|| format!("creating {}", config.data_dir.display()))?;
    let path = config.log_path();
    let file = std::fs::OpenOptions::new()
      .create(true)
      .append(true)
      .open(&path)
      .with_context(|| format!("opening log file {}", path.display()))?;
    tracing_subscriber::fmt()
      .with_env_filter(filter)
      .with_writer(std::sync::Mutex::new(file))
      .with_ansi(false)
      .init();
  } else {
    tracing_subscriber::fmt()
      .with_env_filter(filter)
      .with_writer(io::stderr)
      .init();
  }
  Ok(())
}

fn read_password(given: Option<String>) -> Result<String> {
  if let Some(p) = given {
    return Ok(p);
  }
  eprint!("Password: ");
  io::stderr().flush()?;
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line).context("reading password")?;
  Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}

// ─── Backends ─────────────────────────────────────────────────────────────────

async fn run_rest(config: Config, command: Command) -> Result<()> {
  let api = ApiConfig::new(
    config.url.as_deref().unwrap_or_default(),
    config.anon_key.as_deref().unwrap_or_default(),
  );
  let auth = AuthClient::new(api.clone(), config.email_redirect_to.clone())?;
  let sessions = SessionFile::new(config.session_path());

  match command {
    Command::Login { email, password } => {
      let creds = Credentials::new(&email, &read_password(password)?)?;
      let session = auth.sign_in(&creds).await?;
      sessions.save(&session)?;
      println!("Signed in as {}.", session.user.label());
    }
    Command::Signup { email, password } => {
      let creds = Credentials::new(&email, &read_password(password)?)?;
      match auth.sign_up(&creds).await? {
        SignUp::SignedIn(session) => {
          sessions.save(&session)?;
          println!("Account created; signed in as {}.", session.user.label());
        }
        SignUp::ConfirmationSent => {
          println!("Account created. Check {email} for a confirmation link, then log in.");
        }
      }
    }
    Command::Resend { email } => {
      auth.resend_confirmation(&email).await?;
      println!("Confirmation email sent to {email}.");
    }
    Command::Logout => {
      if let Some(session) = sessions.load() {
        if let Err(e) = auth.sign_out(&session).await {
          tracing::warn!(error = %e, "remote sign-out failed");
        }
      }
      sessions.clear()?;
      println!("Signed out.");
    }
    Command::Whoami => match auth::current_session(&auth, &sessions).await {
      Some(s) => println!("{} ({})", s.user.label(), s.user.id),
      None => println!("Not signed in."),
    },
    Command::Import { .. } => bail!("import needs the sqlite backend (--backend sqlite)"),
    command => {
      let session = auth::current_session(&auth, &sessions).await;
      let token = session.as_ref().map(|s| s.access_token.clone());
      let backend = RestBackend::new(api)?.with_access_token(token);
      let runner = Runner {
        backend: Arc::new(backend),
        user: session.map(|s| s.user),
        config,
      };
      dispatch(runner, command).await?;
    }
  }
  Ok(())
}

async fn run_sqlite(config: Config, command: Command) -> Result<()> {
  if let Some(dir) = config.sqlite_path.parent().filter(|d| !d.as_os_str().is_empty()) {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
  }
  let mut store = SqliteStore::open(&config.sqlite_path)
    .await
    .with_context(|| format!("opening {}", config.sqlite_path.display()))?;
  if let Some(base) = &config.image_base_url {
    store = store.with_image_base_url(base.clone());
  }

  match command {
    Command::Login { .. } | Command::Signup { .. } | Command::Resend { .. } | Command::Logout => {
      bail!("accounts are only used with the rest backend; the sqlite backend acts as `{}`", config.local_user)
    }
    Command::Whoami => println!("{} (local)", config.local_user),
    Command::Import { file } => {
      let raw = std::fs::read_to_string(&file)
        .with_context(|| format!("reading {}", file.display()))?;
      let n = store.import_skins_json(&raw).await?;
      println!("Imported {n} skin(s).");
    }
    command => {
      let runner = Runner {
        backend: Arc::new(store),
        user: Some(User::new(config.local_user.clone(), None)),
        config,
      };
      dispatch(runner, command).await?;
    }
  }
  Ok(())
}

async fn dispatch<B: Backend + 'static>(runner: Runner<B>, command: Command) -> Result<()> {
  match command {
    Command::List { filter, json } => runner.list(&filter.into(), json).await,
    Command::Own { ids } => runner.set_owned(&ids, true).await,
    Command::Disown { ids } => runner.set_owned(&ids, false).await,
    Command::Stats { json } => runner.stats(json).await,
    Command::Profile { action } => match action {
      ProfileCommand::Show { user_id, rarity, query, json } => {
        runner
          .profile_show(user_id.as_deref(), rarity.as_deref(), query.as_deref(), json)
          .await
      }
      ProfileCommand::Save { edits } => runner.profile_save(edits.into()).await,
      ProfileCommand::Link => runner.profile_link(),
      ProfileCommand::Search { name } => runner.profile_search(&name).await,
    },
    Command::Publish { edits } => runner.publish(edits.into()).await,
    Command::Tui => run_tui(runner).await,
    other => bail!("unsupported command {other:?}"),
  }
}

// ─── TUI ──────────────────────────────────────────────────────────────────────

async fn run_tui<B: Backend + 'static>(runner: Runner<B>) -> Result<()> {
  let Runner { backend, user, config } = runner;

  let source = CatalogSource::new(backend.clone());
  let catalog = source.ready().await;
  let degraded = source.last_error();

  let collection = Collection::new(backend, catalog, RarityOrder::default());
  let share_url = match &user {
    Some(u) => Some(profile::share_url(&config.profile_page_url, &u.id)?),
    None => None,
  };
  if let Some(u) = user {
    // A failed load leaves the message on the status line.
    if let Err(e) = collection.sign_in(u).await {
      tracing::warn!(error = %e, "initial load failed");
    }
  }

  let prefs = JsonCollapseState::load(config.prefs_path());
  let mut app = App::new(collection, prefs, degraded, share_url);

  enable_raw_mode().context("enabling raw mode")?;
  let mut stdout = io::stdout();
  execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;
  let mut terminal = Terminal::new(CrosstermBackend::new(stdout)).context("creating terminal")?;

  // Restore the terminal even on error.
  let result = run_event_loop(&mut terminal, &mut app).await;

  disable_raw_mode().ok();
  execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
  terminal.show_cursor().ok();

  result
}

async fn run_event_loop<B: Backend>(
  terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
  app: &mut App<B>,
) -> Result<()> {
  loop {
    terminal.draw(|f| ui::draw(f, app)).context("drawing frame")?;

    // Poll for an event, yielding control to tokio while waiting.
    let maybe_event = tokio::task::block_in_place(|| {
      if event::poll(Duration::from_millis(50))? {
        Ok::<_, io::Error>(Some(event::read()?))
      } else {
        Ok(None)
      }
    })?;

    match maybe_event {
      Some(Event::Key(key)) => {
        if !app.handle_key(key).await? {
          break;
        }
      }
      // Idle: reveal the next slice of a long list.
      None => {
        app.tick();
      }
      _ => {}
    }
  }

  Ok(())
}
