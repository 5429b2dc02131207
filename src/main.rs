//! Rainmaker - configuration and OTA firmware server for irrigation controllers.
#![forbid(unsafe_code)]

use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use console::style;
use serde::Serialize;

use rainmaker::cli::{Cli, Commands, CompletionsArgs, DataArgs, ServeArgs};
use rainmaker::config::{Overrides, ResolvedPaths, Settings};
use rainmaker::error::{RainError, Result};
use rainmaker::logging::{init_logging, open_access_log};
use rainmaker::server::{ServerState, run_api_server};
use rainmaker::store::StoreReport;

/// Build information embedded at compile time.
mod build_info {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    pub fn git_sha() -> &'static str {
        option_env!("VERGEN_GIT_SHA").unwrap_or("unknown")
    }

    pub fn git_dirty() -> &'static str {
        option_env!("VERGEN_GIT_DIRTY").unwrap_or("false")
    }

    pub fn build_timestamp() -> &'static str {
        option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown")
    }

    pub fn rustc_semver() -> &'static str {
        option_env!("VERGEN_RUSTC_SEMVER").unwrap_or("unknown")
    }

    pub fn target() -> &'static str {
        option_env!("VERGEN_CARGO_TARGET_TRIPLE").unwrap_or("unknown")
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        output_error(&cli, &e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Serve(args) => cmd_serve(cli, args),
        Commands::Check(args) => cmd_check(cli, args),
        Commands::Version => {
            cmd_version(cli);
            Ok(())
        }
        Commands::Completions(args) => {
            cmd_completions(args);
            Ok(())
        }
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}

/// Load settings and resolve document paths.
fn load_settings(cli: &Cli, overrides: &Overrides) -> Result<(Settings, ResolvedPaths)> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    settings.apply_overrides(overrides);
    let paths = settings.resolve_paths()?;
    Ok((settings, paths))
}

fn cmd_serve(cli: &Cli, args: &ServeArgs) -> Result<()> {
    let (settings, paths) = load_settings(cli, &args.overrides())?;
    let access_log = paths
        .access_log
        .as_deref()
        .map(open_access_log)
        .transpose()?;
    init_logging(cli.use_json(), cli.verbose, cli.quiet, access_log);

    tracing::info!(
        version = build_info::VERSION,
        manifolds = %paths.manifolds.display(),
        firmware = %paths.firmware.display(),
        next_run = %paths.next_run.display(),
        "Starting Rainmaker"
    );

    let state = Arc::new(ServerState::new(&paths));
    let listen = settings.listen_addr();
    runtime()?.block_on(async move {
        state.startup_check().await?;
        run_api_server(state, &listen).await
    })
}

// === check ===

#[derive(Serialize)]
struct CheckReport {
    manifolds: DocumentStatus<StoreReport>,
    firmware: DocumentStatus<Option<String>>,
    next_run: DocumentStatus<i64>,
}

#[derive(Serialize)]
struct DocumentStatus<T> {
    path: String,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> DocumentStatus<T> {
    fn from_result(path: &std::path::Path, result: Result<T>) -> Self {
        let path = path.display().to_string();
        match result {
            Ok(value) => Self {
                path,
                ok: true,
                value: Some(value),
                error: None,
            },
            Err(e) => Self {
                path,
                ok: false,
                value: None,
                error: Some(e.to_string()),
            },
        }
    }
}

fn cmd_check(cli: &Cli, args: &DataArgs) -> Result<()> {
    let (_, paths) = load_settings(cli, &args.overrides())?;
    init_logging(cli.use_json(), cli.verbose, cli.quiet, None);

    let state = ServerState::new(&paths);
    let report = runtime()?.block_on(async {
        CheckReport {
            manifolds: DocumentStatus::from_result(&paths.manifolds, state.records.verify().await),
            firmware: DocumentStatus::from_result(
                &paths.firmware,
                state
                    .firmware
                    .current_firmware()
                    .await
                    .map(|fw| fw.file_name().map(str::to_string)),
            ),
            next_run: DocumentStatus::from_result(
                &paths.next_run,
                state.schedule.seconds_until(Utc::now()).await,
            ),
        }
    });

    if cli.use_json() {
        output_json(&report);
    } else {
        print_check_report(&report);
    }

    let failed = [report.manifolds.ok, report.firmware.ok, report.next_run.ok]
        .iter()
        .filter(|ok| !**ok)
        .count();
    if failed > 0 {
        return Err(RainError::Other(format!("{failed} document(s) failed validation")));
    }
    Ok(())
}

fn print_check_report(report: &CheckReport) {
    let mark = |ok: bool| {
        if ok {
            style("ok").green().bold()
        } else {
            style("FAIL").red().bold()
        }
    };

    let m = &report.manifolds;
    println!("{} {}", mark(m.ok), m.path);
    if let Some(r) = &m.value {
        println!("   {} records, {} zones", r.records, r.zones);
        if !r.duplicate_ids.is_empty() {
            println!(
                "   {}: duplicate ids {:?}",
                style("warning").yellow(),
                r.duplicate_ids
            );
        }
        if !r.duplicate_macs.is_empty() {
            println!(
                "   {}: duplicate MAC addresses {:?}",
                style("warning").yellow(),
                r.duplicate_macs
            );
        }
    }

    let f = &report.firmware;
    println!("{} {}", mark(f.ok), f.path);
    if let Some(name) = &f.value {
        println!("   firmware file: {}", name.as_deref().unwrap_or("<none>"));
    }

    let n = &report.next_run;
    println!("{} {}", mark(n.ok), n.path);
    if let Some(seconds) = n.value {
        println!("   next run in {seconds} s");
    }

    for error in [&m.error, &f.error, &n.error].into_iter().flatten() {
        println!("   {}: {error}", style("error").red());
    }
}

// === version / completions ===

fn cmd_version(cli: &Cli) {
    if cli.use_json() {
        output_json(&serde_json::json!({
            "version": build_info::VERSION,
            "git_sha": build_info::git_sha(),
            "git_dirty": build_info::git_dirty() == "true",
            "build_timestamp": build_info::build_timestamp(),
            "rustc_version": build_info::rustc_semver(),
            "target": build_info::target(),
        }));
    } else {
        println!("rainmaker {}", build_info::VERSION);
        println!(
            "git: {}{}",
            build_info::git_sha(),
            if build_info::git_dirty() == "true" {
                " (dirty)"
            } else {
                ""
            }
        );
        println!("built: {}", build_info::build_timestamp());
        println!("rustc: {}", build_info::rustc_semver());
        println!("target: {}", build_info::target());
    }
}

fn cmd_completions(args: &CompletionsArgs) {
    use clap::CommandFactory;

    let mut cmd = Cli::command();
    clap_complete::generate(args.shell, &mut cmd, "rainmaker", &mut std::io::stdout());
}

// === Output helpers ===

fn output_json<T: Serialize>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Failed to encode output: {e}"),
    }
}

fn output_error(cli: &Cli, error: &RainError) {
    if cli.use_json() {
        let json = serde_json::json!({
            "error": true,
            "message": error.to_string(),
            "suggestion": error.suggestion(),
            "recoverable": error.is_user_recoverable(),
        });
        eprintln!("{json:#}");
    } else {
        eprintln!("{}: {}", style("Error").red().bold(), error);
        if let Some(suggestion) = error.suggestion() {
            eprintln!("{}: {}", style("Hint").yellow(), suggestion);
        }
    }
}
