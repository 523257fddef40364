mod cli;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, ServerArgs};
use vf_core::config::Config;
use vf_core::UserId;
use vf_server::Role;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise pick defaults from the verbose flag.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "vidforge=trace,vf_jobs=trace,vf_server=debug,vf_av=debug,vf_db=debug,vf_storage=debug,tower_http=debug"
                .to_string()
        } else {
            "vidforge=info,vf_jobs=info,vf_server=info,vf_av=info,vf_db=warn,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt().with_env_filter(&env_filter).init();

    match cli.command {
        Commands::Coordinator(args) => run_server(Role::Coordinator, args, cli.config.as_deref()),
        Commands::Serve(args) => run_server(Role::Frontend, args, cli.config.as_deref()),
        Commands::Reconcile => reconcile(cli.config.as_deref()),
        Commands::IssueSession { user } => issue_session(cli.config.as_deref(), user.as_deref()),
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate { file } => {
            let path = file.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("vidforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn run_server(role: Role, args: ServerArgs, config_path: Option<&Path>) -> Result<()> {
    let mut config = Config::load_or_default(config_path);
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(addr) = args.dispatch_addr {
        config.dispatch.addr = addr;
    }

    tracing::info!(
        %role,
        http = %format!("{}:{}", config.server.host, config.server.port),
        dispatch = %config.dispatch.addr,
        "Starting vidforge"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(vf_server::start(config, role))?;
    Ok(())
}

fn reconcile(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load_or_default(config_path);
    let store = vf_server::open_store(&config)?;
    let report = vf_jobs::reconcile_interrupted(&store)?;

    println!("Scanned {} videos", report.videos_scanned);
    println!("  Resizes marked failed: {}", report.resizes_failed);
    println!("  Audio extractions reset: {}", report.audio_cleared);
    Ok(())
}

fn issue_session(config_path: Option<&Path>, user: Option<&str>) -> Result<()> {
    let config = Config::load_or_default(config_path);
    let user_id = match user {
        Some(raw) => raw
            .parse::<UserId>()
            .with_context(|| format!("invalid user id '{raw}'"))?,
        None => UserId::new(),
    };

    let store = vf_server::open_store(&config)?;
    let session = store.create_session(user_id)?;

    println!("user:  {}", session.user_id);
    println!("token: {}", session.token);
    println!("cookie: token={}", session.token);
    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load_or_default(config_path);
    let statuses = vf_av::ToolRegistry::discover(&config.tools).status();

    for status in &statuses {
        match &status.path {
            Some(path) => println!(
                "✓ {} ({}) - {}",
                status.tool,
                status.version.as_deref().unwrap_or("unknown version"),
                path.display()
            ),
            None => println!("✗ {} - not found", status.tool),
        }
    }

    if statuses.iter().all(|s| s.available()) {
        println!("\nAll required tools are available.");
        Ok(())
    } else {
        anyhow::bail!("ffmpeg and ffprobe are both required for uploads and transcoding")
    }
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {}", p.display());
            let contents = std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))?;
            let config = Config::from_json(&contents)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Database: {}", config.server.db_path.display());
    println!("  Storage root: {}", config.storage.root.display());
    println!("  Dispatch: {}", config.dispatch.addr);
    println!(
        "  Workers: {} slots, {}s job timeout",
        config.workers.slots, config.workers.job_timeout_secs
    );
    println!("  Upload formats: {}", config.upload.formats.join(", "));

    for warning in config.validate() {
        println!("  ! {warning}");
    }

    Ok(())
}
