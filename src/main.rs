use chrono::Utc;
use clap::{Parser, Subcommand};
use muhimmath::admin::{self, AdminAction, NewResultFields};
use muhimmath::config::{self, SiteConfig};
use muhimmath::export::{self, Osc52Clipboard, Rasterizer, SharePayload};
use muhimmath::gateway::auth::{self, Session};
use muhimmath::gateway::{Gateway, MemoryGateway, RestGateway};
use muhimmath::poster::{self, PosterStyle};
use muhimmath::types::BackgroundKind;
use muhimmath::view::{ResultsView, Tab};
use muhimmath::{fetch, generate, output, process};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Shared flags for commands that render posters.
#[derive(clap::Args, Clone)]
struct CacheArgs {
    /// Disable the poster cache and rasterize every poster again
    #[arg(long)]
    no_cache: bool,
}

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "muhimmath")]
#[command(about = "Results site, poster generator and admin tool for the Muhimmath fest")]
#[command(long_about = "\
Results site, poster generator and admin tool for the Muhimmath fest

Results, teams, news, gallery and about content live in the hosted data
service. The build pulls them into a snapshot, renders five poster styles
for every program and writes a static site.

Site directory:

  site/
  ├── config.toml          # Site config (optional, overrides stock defaults)
  ├── assets/              # Copied to dist/assets/
  └── fonts/               # Extra poster fonts (see [posters] font_dirs)

Pipeline:
  fetch      gateway  → <temp>/snapshot.json
  posters    snapshot → <temp>/processed/
  generate   manifest → dist/

Use --seed <file.json> to build from a local table dump instead of the
service. Run 'muhimmath gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Site directory holding config.toml and assets/
    #[arg(long, default_value = "site", global = true)]
    site: PathBuf,

    /// Output directory
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    /// Directory for intermediate files (snapshot, processed posters)
    #[arg(long, default_value = ".muhimmath-temp", global = true)]
    temp_dir: PathBuf,

    /// Read tables from a JSON seed file instead of the data service
    #[arg(long, global = true)]
    seed: Option<PathBuf>,

    /// Public API key of the data service
    #[arg(long, env = "MUHIMMATH_GATEWAY_KEY", default_value = "", global = true, hide_env_values = true)]
    gateway_key: String,

    /// Where the admin session is stored
    #[arg(long, default_value = ".muhimmath-session.json", global = true)]
    session: PathBuf,

    /// More diagnostics on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Pull every collection into a snapshot
    Fetch,
    /// Render every poster style of every program to PNG
    Posters(CacheArgs),
    /// Produce the final HTML site from the processed manifest
    Generate,
    /// Run the full pipeline: fetch → posters → generate
    Build(CacheArgs),
    /// List results for a year, as the results screen shows them
    Results {
        /// Year to show (defaults to [results] default_year)
        #[arg(long)]
        year: Option<String>,
        /// Filter programs by event/category or teams by name
        #[arg(long, default_value = "")]
        search: String,
        /// programs or teams
        #[arg(long, default_value = "programs")]
        tab: Tab,
    },
    /// Export one program's poster as PNG
    Poster {
        #[arg(long)]
        year: Option<String>,
        #[arg(long)]
        event: String,
        #[arg(long)]
        category: String,
        /// Style name or number 1-5 (defaults to [posters] default_style)
        #[arg(long)]
        style: Option<PosterStyle>,
        /// Directory to write the PNG into
        #[arg(long, default_value = ".")]
        out: PathBuf,
        /// Copy the results link to the clipboard after saving
        #[arg(long)]
        share: bool,
    },
    /// Manage the data service (requires `admin login` unless --seed is given)
    #[command(subcommand)]
    Admin(AdminCommand),
    /// Print a stock config.toml with all options documented
    GenConfig,
}

#[derive(Subcommand)]
enum AdminCommand {
    /// Sign in and store the session
    Login {
        email: String,
        #[arg(long, env = "MUHIMMATH_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Send a password recovery email
    ResetPassword {
        email: String,
        /// Page the recovery link should open
        #[arg(long)]
        redirect_to: Option<String>,
    },
    /// Set a new password for the signed-in admin
    UpdatePassword {
        #[arg(long, env = "MUHIMMATH_NEW_PASSWORD", hide_env_values = true)]
        password: String,
        /// Access token from a recovery link, instead of the stored session
        #[arg(long)]
        token: Option<String>,
    },
    /// Homepage backgrounds
    #[command(subcommand)]
    Background(BackgroundCommand),
    /// Result rows
    #[command(subcommand)]
    Result(ResultCommand),
    /// Teams and points
    #[command(subcommand)]
    Team(TeamCommand),
}

#[derive(Subcommand)]
enum BackgroundCommand {
    List,
    Add {
        url: String,
        /// image or video
        #[arg(long, default_value = "image")]
        kind: BackgroundKind,
    },
    Delete {
        id: String,
    },
    /// Make this background the only active one
    Activate {
        id: String,
    },
}

#[derive(Subcommand)]
enum ResultCommand {
    Add {
        #[arg(long)]
        year: String,
        #[arg(long)]
        event: String,
        #[arg(long)]
        category: String,
        /// 1, 2 or 3
        #[arg(long)]
        position: u8,
        #[arg(long)]
        participant: String,
        #[arg(long)]
        school: Option<String>,
        #[arg(long)]
        team: Option<String>,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand)]
enum TeamCommand {
    Add {
        name: String,
        #[arg(long, default_value_t = 0)]
        points: i64,
    },
    SetPoints {
        id: String,
        points: i64,
    },
    Delete {
        id: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Command::Fetch => {
            let config = config::load_config(&cli.site)?;
            let gw = open_gateway(&cli, &config, None)?;
            let snapshot = fetch::fetch(gw.as_ref(), &config);
            snapshot.save(&snapshot_path(&cli))?;
            output::print_fetch_output(&snapshot);
        }
        Command::Posters(cache_args) => {
            let result = run_posters(&cli, cache_args)?;
            println!("Cache: {}", result.cache_stats);
        }
        Command::Generate => {
            let processed_dir = cli.temp_dir.join("processed");
            let site = generate::generate(
                &processed_dir.join("manifest.json"),
                &processed_dir,
                &cli.site,
                &cli.output,
            )?;
            output::print_generate_output(&site);
        }
        Command::Build(cache_args) => {
            std::fs::create_dir_all(&cli.temp_dir)?;

            println!("==> Stage 1: Fetching from {}", source_label(&cli));
            let config = config::load_config(&cli.site)?;
            let gw = open_gateway(&cli, &config, None)?;
            init_thread_pool(&config.processing);
            let snapshot = fetch::fetch(gw.as_ref(), &config);
            snapshot.save(&snapshot_path(&cli))?;
            output::print_fetch_output(&snapshot);

            println!("==> Stage 2: Rendering posters");
            let result = run_posters(&cli, cache_args)?;
            println!("Cache: {}", result.cache_stats);

            println!("==> Stage 3: Generating HTML → {}", cli.output.display());
            let processed_dir = cli.temp_dir.join("processed");
            let site =
                generate::generate_site(&result.manifest, &processed_dir, &cli.site, &cli.output)?;
            output::print_generate_output(&site);

            println!("==> Build complete: {}", cli.output.display());
        }
        Command::Results { year, search, tab } => {
            let config = config::load_config(&cli.site)?;
            let gw = open_gateway(&cli, &config, None)?;
            let mut view = load_view(gw.as_ref(), &config, year.as_deref())?;
            view.set_tab(*tab);
            view.set_search(search);
            output::print_results_view(&view);
        }
        Command::Poster {
            year,
            event,
            category,
            style,
            out,
            share,
        } => {
            let config = config::load_config(&cli.site)?;
            let gw = open_gateway(&cli, &config, None)?;
            let mut view = load_view(gw.as_ref(), &config, year.as_deref())?;
            if let Some(message) = view.error() {
                return Err(format!("Connection Error: {message}").into());
            }
            let program = view
                .program_cards()
                .into_iter()
                .map(|card| card.program)
                .find(|p| {
                    p.event.eq_ignore_ascii_case(event.trim())
                        && p.category.eq_ignore_ascii_case(category.trim())
                })
                .ok_or_else(|| format!("no results for {event} - {category} in {}", view.year()))?;

            let viewer = view.open_poster(&program);
            let style = style.unwrap_or_else(|| viewer.style());
            let svg = poster::render_svg(style, &viewer.data, &config.posters);
            let rasterizer = Rasterizer::new(&font_dirs(&cli.site, &config));
            let path = export::export_png(
                &rasterizer,
                &svg,
                out,
                &program.event,
                config.posters.pixel_ratio,
            )?;

            let shared = if *share {
                let url = config
                    .site
                    .url_for(&format!("results/{}/", view.year()));
                let payload = SharePayload::for_program(&program, &url);
                Some(export::share_with_fallback(None, &Osc52Clipboard, &payload)?)
            } else {
                None
            };
            output::print_poster_export(&path, shared.as_ref());
        }
        Command::Admin(command) => run_admin(&cli, command)?,
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Stage 2 from the saved snapshot, with a printer thread for progress.
fn run_posters(
    cli: &Cli,
    cache_args: &CacheArgs,
) -> Result<process::ProcessResult, Box<dyn std::error::Error>> {
    let snapshot_path = snapshot_path(cli);
    let snapshot = fetch::Snapshot::load(&snapshot_path)?;
    init_thread_pool(&snapshot.config.processing);
    let processed_dir = cli.temp_dir.join("processed");
    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_process_event(&event) {
                println!("{}", line);
            }
        }
    });
    let result = process::process(
        &snapshot_path,
        &cli.site,
        &processed_dir,
        !cache_args.no_cache,
        Some(tx),
    );
    printer
        .join()
        .map_err(|_| "progress printer thread panicked")?;
    let result = result?;
    let json = serde_json::to_string_pretty(&result.manifest)?;
    std::fs::write(processed_dir.join("manifest.json"), json)?;
    Ok(result)
}

fn run_admin(cli: &Cli, command: &AdminCommand) -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load_config(&cli.site)?;
    let action = match command {
        AdminCommand::Login { email, password } => {
            let gw = rest_gateway(cli, &config)?;
            let session = auth::sign_in(&gw, email, password)?;
            session.save(&cli.session)?;
            println!(
                "Signed in as {} (until {})",
                session.email,
                session.expires_at.format("%Y-%m-%d %H:%M UTC")
            );
            return Ok(());
        }
        AdminCommand::Logout => {
            if Session::clear(&cli.session)? {
                println!("Signed out");
            } else {
                println!("Not signed in");
            }
            return Ok(());
        }
        AdminCommand::ResetPassword { email, redirect_to } => {
            let gw = rest_gateway(cli, &config)?;
            auth::request_password_reset(&gw, email, redirect_to.as_deref())?;
            println!("Password reset email sent to {email}");
            return Ok(());
        }
        AdminCommand::UpdatePassword { password, token } => {
            auth::validate_password(password)?;
            let token = match token {
                Some(t) => t.clone(),
                None => Session::require(&cli.session, Utc::now())?.access_token,
            };
            let gw = rest_gateway(cli, &config)?.with_access_token(token);
            auth::update_password(&gw, password)?;
            println!("Password updated");
            return Ok(());
        }
        AdminCommand::Background(cmd) => match cmd {
            BackgroundCommand::List => AdminAction::ListBackgrounds,
            BackgroundCommand::Add { url, kind } => AdminAction::AddBackground {
                kind: *kind,
                url: url.clone(),
            },
            BackgroundCommand::Delete { id } => AdminAction::DeleteBackground { id: id.clone() },
            BackgroundCommand::Activate { id } => {
                AdminAction::ActivateBackground { id: id.clone() }
            }
        },
        AdminCommand::Result(cmd) => match cmd {
            ResultCommand::Add {
                year,
                event,
                category,
                position,
                participant,
                school,
                team,
            } => AdminAction::AddResult(NewResultFields {
                year: year.clone(),
                event: event.clone(),
                category: category.clone(),
                position: *position,
                participant: participant.clone(),
                school: school.clone(),
                team: team.clone(),
            }),
            ResultCommand::Delete { id } => AdminAction::DeleteResult { id: id.clone() },
        },
        AdminCommand::Team(cmd) => match cmd {
            TeamCommand::Add { name, points } => AdminAction::AddTeam {
                name: name.clone(),
                points: *points,
            },
            TeamCommand::SetPoints { id, points } => AdminAction::SetTeamPoints {
                id: id.clone(),
                points: *points,
            },
            TeamCommand::Delete { id } => AdminAction::DeleteTeam { id: id.clone() },
        },
    };

    let token = if cli.seed.is_some() {
        None
    } else {
        Some(Session::require(&cli.session, Utc::now())?.access_token)
    };
    let gw = open_gateway(cli, &config, token)?;
    let outcome = admin::execute(gw.as_ref(), action, &config.gateway)?;
    output::print_admin_outcome(&outcome);
    Ok(())
}

/// The in-memory gateway for `--seed`, otherwise the REST gateway.
fn open_gateway(
    cli: &Cli,
    config: &SiteConfig,
    access_token: Option<String>,
) -> Result<Box<dyn Gateway>, Box<dyn std::error::Error>> {
    if let Some(seed) = &cli.seed {
        return Ok(Box::new(MemoryGateway::from_seed_file(seed)?));
    }
    let gw = rest_gateway(cli, config)?;
    Ok(match access_token {
        Some(token) => Box::new(gw.with_access_token(token)),
        None => Box::new(gw),
    })
}

fn rest_gateway(
    cli: &Cli,
    config: &SiteConfig,
) -> Result<RestGateway, Box<dyn std::error::Error>> {
    Ok(RestGateway::new(
        &config.gateway.url,
        &cli.gateway_key,
        Duration::from_secs(config.gateway.timeout_secs),
    )?)
}

/// A results view for one year, fetched and applied.
fn load_view(
    gw: &dyn Gateway,
    config: &SiteConfig,
    year: Option<&str>,
) -> Result<ResultsView, Box<dyn std::error::Error>> {
    let mut view = ResultsView::new(
        config.results.years.clone(),
        &config.results.default_year,
        config.posters.default_style,
    );
    let ticket = match year {
        Some(y) => view.select_year(y)?,
        None => view.begin_fetch(),
    };
    let (results, teams) = fetch::fetch_year(gw, view.year());
    view.apply(ticket, results, teams);
    Ok(view)
}

fn snapshot_path(cli: &Cli) -> PathBuf {
    cli.temp_dir.join("snapshot.json")
}

fn font_dirs(site: &Path, config: &SiteConfig) -> Vec<PathBuf> {
    config.posters.font_dirs.iter().map(|d| site.join(d)).collect()
}

fn source_label(cli: &Cli) -> String {
    match &cli.seed {
        Some(seed) => seed.display().to_string(),
        None => "the data service".to_string(),
    }
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

/// Diagnostics go to stderr; `RUST_LOG` overrides the `-v` level.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
