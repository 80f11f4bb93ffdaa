//! Gallery Renamer - rename photos and videos after their capture time
//!
//! Without `--yes` the interactive terminal UI opens; with it the whole batch
//! runs unattended and every group that received a name is renamed.

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use gallery_renamer::workflow::{Notice, NoticeLevel};
use gallery_renamer::{
    Cli, Config, Driver, LocalBackend, LocalOptions, Phase, Session, TuiApp, WorkflowEvent,
    init_locale, is_settled,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{Level, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

// Initialize i18n for this binary
rust_i18n::i18n!("locales", fallback = "en");

/// How long a headless run waits for backend events per poll
const POLL_INTERVAL: Duration = Duration::from_millis(50);

// CLI Output Module
mod cli_output {
    //! CLI 输出美化模块
    //!
    //! 为命令行输出提供统一的颜色和格式样式。

    use crossterm::{
        ExecutableCommand,
        style::{Color, Print, Stylize, style},
    };
    use std::io::stdout;
    use unicode_width::UnicodeWidthStr;

    const WIDTH: usize = 60;

    /// CLI 主题颜色
    pub struct CliTheme;

    impl CliTheme {
        pub const SUCCESS: Color = Color::Green;
        pub const WARNING: Color = Color::Yellow;
        pub const ERROR: Color = Color::Red;
        pub const HINT: Color = Color::DarkGrey;
        pub const ACCENT: Color = Color::Cyan;
    }

    /// 打印分隔线
    pub fn print_separator() {
        let _ = stdout().execute(Print(format!("{}\n", "─".repeat(WIDTH))));
    }

    /// 打印居中的标题（按显示宽度居中）
    pub fn print_title(title: &str) {
        let padding = WIDTH.saturating_sub(title.width() + 4) / 2;
        let _ = stdout().execute(Print(format!(
            "{}{} {} {}\n\n",
            " ".repeat(padding),
            "╔".bold(),
            title.bold(),
            "╗".bold(),
        )));
    }

    pub fn print_warning(msg: &str) {
        let _ = stdout().execute(Print(style("⚠ ").with(CliTheme::WARNING).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_error(msg: &str) {
        let _ = stdout().execute(Print(style("✗ ").with(CliTheme::ERROR).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_hint(msg: &str) {
        let _ = stdout().execute(Print(style("→ ").with(CliTheme::HINT)));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    /// 打印统计项
    pub fn print_stat(key: &str, value: usize, color: Color) {
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(style(key).with(CliTheme::HINT)));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(style(value.to_string()).with(color).bold()));
        let _ = stdout().execute(Print("\n"));
    }

    /// 打印一条重命名计划
    pub fn print_result(status_icon: &str, status_color: Color, source: &str, target: &str) {
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(style(status_icon).with(status_color).bold()));
        let _ = stdout().execute(Print(" "));
        let _ = stdout().execute(Print(style(source).italic()));
        let _ = stdout().execute(Print(" "));
        let _ = stdout().execute(Print(style(format!("→ {}", target)).with(CliTheme::HINT)));
        let _ = stdout().execute(Print("\n"));
    }

    /// 打印日志文件路径
    pub fn print_log_path(label: &str, path: &str) {
        let _ = stdout().execute(Print("\n"));
        let _ = stdout().execute(Print(style("  📁 ").with(CliTheme::ACCENT)));
        let _ = stdout().execute(Print(style(format!("{}: ", label)).with(CliTheme::HINT)));
        let _ = stdout().execute(Print(format!("{}\n", path)));
    }

    pub fn print_blank() {
        let _ = stdout().execute(Print("\n"));
    }
}

/// Convenience macro for translation
macro_rules! t {
    ($key:expr) => {
        rust_i18n::t!($key)
    };
    ($key:expr, $($tt:tt)*) => {
        rust_i18n::t!($key, $($tt)*)
    };
}

fn main() -> Result<()> {
    // Initialize locale based on system settings
    init_locale();

    let cli = Cli::parse();

    if cli.yes {
        run_cli_mode(cli)
    } else {
        run_interactive_mode(cli)
    }
}

/// Run in interactive mode with Ratatui TUI
fn run_interactive_mode(cli: Cli) -> Result<()> {
    let exe_dir = get_executable_dir()?;
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let log_path = exe_dir
        .join("Log")
        .join(format!("Interactive_{}.log", timestamp));

    // Setup file-only logging before TUI starts
    let _guard = setup_file_only_logging(&cli, &log_path)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Gallery Renamer starting in interactive mode"
    );

    let config = load_config(&cli, &exe_dir)?;
    config.validate()?;

    let mut app = TuiApp::new(config, Some(log_path.clone()))?;
    app.run()?;

    info!(log_file = %log_path.display(), "Interactive session complete");
    Ok(())
}

/// Run a whole batch without asking: scan, name, rename everything named
fn run_cli_mode(cli: Cli) -> Result<()> {
    let exe_dir = get_executable_dir()?;
    let log_path = get_log_path(&exe_dir, &cli);
    let _guard = setup_logging(&cli, &log_path)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Gallery Renamer starting"
    );

    let config = load_config(&cli, &exe_dir)?;
    if config.verbose {
        info!(?config, "Configuration loaded");
    }
    info!(log_file = %log_path.display(), "Log file location");

    config.validate()?;
    let Some(source) = config.source.clone() else {
        anyhow::bail!("{}", t!("cli_no_source_error"));
    };
    if !source.exists() {
        anyhow::bail!("{} {}", t!("cli_source_not_found"), source.display());
    }

    let backend = LocalBackend::new(LocalOptions::from_config(&config));
    let session = Session::new(source, config.done_display_delay());
    let mut driver = Driver::new(session, backend);

    driver.start();
    if !driver.pump_until(POLL_INTERVAL, is_settled) {
        return stopped(&mut driver);
    }

    let plan = planned_renames(driver.session());
    let planned_groups = driver.session().registry().commit_candidates().len();
    let unnamed = driver
        .session()
        .registry()
        .items()
        .filter(|item| item.next_stem().is_none())
        .count();

    driver.dispatch(WorkflowEvent::CommitRequested);
    if !driver.pump_until(POLL_INTERVAL, |session| session.phase() == Phase::Done) {
        return stopped(&mut driver);
    }

    print_report(&mut driver, &config, &plan, planned_groups, unnamed, &log_path);
    info!(log_file = %log_path.display(), "Rename complete. Log saved to");
    Ok(())
}

/// Report the failure notices of a batch that could not finish
fn stopped(driver: &mut Driver<LocalBackend>) -> Result<()> {
    let notices: Vec<Notice> = driver.take_notices();
    for notice in &notices {
        error!(message = %notice.message, phase = driver.session().phase().name(), "Batch stopped");
        cli_output::print_error(&notice.message);
    }
    let reason = notices
        .last()
        .map(|n| n.message.clone())
        .unwrap_or_else(|| driver.session().phase().name().to_string());
    anyhow::bail!("{} {}", t!("cli_stopped"), reason)
}

/// `(current file name, new file name)` for every file about to be renamed
fn planned_renames(session: &Session) -> Vec<(String, String)> {
    let registry = session.registry();
    registry
        .commit_candidates()
        .iter()
        .filter_map(|key| registry.get(key))
        .flat_map(|item| {
            let stem = item.next_stem().unwrap_or_default().to_string();
            item.group()
                .files()
                .into_iter()
                .map(move |file| {
                    let target = file
                        .renamed_path(&stem)
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    (file.file_name(), target)
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

fn print_report(
    driver: &mut Driver<LocalBackend>,
    config: &Config,
    plan: &[(String, String)],
    planned_groups: usize,
    unnamed: usize,
    log_path: &Path,
) {
    use cli_output::*;

    let failures: Vec<Notice> = driver
        .take_notices()
        .into_iter()
        .filter(|n| n.level == NoticeLevel::Error)
        .collect();
    let session = driver.session();
    let summary = session.summary();
    let registry = session.registry();

    print_separator();
    print_title(&t!("cli_rename_complete"));
    print_separator();

    print_blank();
    print_stat(&t!("cli_total_files"), summary.total_file_count, CliTheme::ACCENT);
    print_stat(&t!("summary_files"), summary.renamed_file_count, CliTheme::SUCCESS);
    print_stat(&t!("summary_groups"), summary.renamed_group_count, CliTheme::SUCCESS);
    print_stat(&t!("cli_unnamed_groups"), unnamed, CliTheme::WARNING);
    print_stat(&t!("cli_uncertain_groups"), registry.uncertain().len(), CliTheme::WARNING);
    print_stat(&t!("cli_unsupported_groups"), registry.unsupported().len(), CliTheme::HINT);
    print_blank();

    if config.verbose && !plan.is_empty() {
        print_separator();
        print_hint(&t!("cli_detailed_results"));
        print_blank();
        let (icon, color) = if config.dry_run {
            ("~", CliTheme::ACCENT)
        } else {
            ("✓", CliTheme::SUCCESS)
        };
        for (from, to) in plan {
            print_result(icon, color, from, to);
        }
    }

    let not_renamed = planned_groups.saturating_sub(summary.renamed_group_count);
    if not_renamed > 0 {
        print_separator();
        print_error(&format!("{}: {}", t!("cli_not_renamed"), not_renamed));
        for notice in &failures {
            print_error(&notice.message);
        }
    }

    if config.dry_run {
        print_separator();
        print_warning(&t!("dry_run_notice"));
    }

    print_separator();
    print_log_path(&t!("cli_log_file"), &log_path.display().to_string());
}

/// Get the directory where the executable is located
fn get_executable_dir() -> Result<PathBuf> {
    let exe_path = std::env::current_exe()?;
    Ok(exe_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".")))
}

/// Determine the log file path based on config file or timestamp
fn get_log_path(exe_dir: &Path, cli: &Cli) -> PathBuf {
    let log_dir = exe_dir.join("Log");
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");

    match cli.config_name() {
        Some(config_name) => log_dir
            .join(&config_name)
            .join(format!("{}_{}.log", config_name, timestamp)),
        None => log_dir.join(format!("CLIRun_{}.log", timestamp)),
    }
}

/// Resolve config path - supports `name`, `name.toml` and files under `Config/`
fn resolve_config_path(exe_dir: &Path, config_path: &Path) -> PathBuf {
    if config_path.exists() {
        return config_path.to_path_buf();
    }

    let with_extension = if config_path.extension().is_none() {
        config_path.with_extension("toml")
    } else {
        config_path.to_path_buf()
    };
    if with_extension.exists() {
        return with_extension;
    }

    let filename = config_path.file_name().unwrap_or(config_path.as_os_str());
    let mut in_config_dir = exe_dir.join("Config").join(filename);
    if in_config_dir.extension().is_none() {
        in_config_dir = in_config_dir.with_extension("toml");
    }
    if in_config_dir.exists() {
        return in_config_dir;
    }

    config_path.to_path_buf()
}

/// Load configuration from file or CLI arguments
fn load_config(cli: &Cli, exe_dir: &Path) -> Result<Config> {
    match cli.config {
        Some(ref config_path) => {
            let resolved_path = resolve_config_path(exe_dir, config_path);
            info!(config_file = %resolved_path.display(), "Loading configuration from file");
            let file_config = Config::load_from_file(&resolved_path)?;
            Ok(cli.merge_with_config(file_config))
        }
        None => Ok(cli.to_config()),
    }
}

fn env_filter(verbose: bool) -> EnvFilter {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

fn open_log_file(log_path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_path)?)
}

/// Setup logging for CLI mode (file + console)
fn setup_logging(cli: &Cli, log_path: &Path) -> Result<WorkerGuard> {
    let (non_blocking, guard) = tracing_appender::non_blocking(open_log_file(log_path)?);
    let subscriber = tracing_subscriber::registry().with(env_filter(cli.verbose));

    if cli.json_log {
        subscriber
            .with(fmt::layer().json().with_ansi(false).with_writer(non_blocking))
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(guard)
}

/// Setup logging for interactive mode (file only, the terminal belongs to the UI)
fn setup_file_only_logging(cli: &Cli, log_path: &Path) -> Result<WorkerGuard> {
    let (non_blocking, guard) = tracing_appender::non_blocking(open_log_file(log_path)?);

    let subscriber = tracing_subscriber::registry().with(env_filter(cli.verbose));
    if cli.json_log {
        subscriber
            .with(fmt::layer().json().with_ansi(false).with_writer(non_blocking))
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
            .init();
    }

    Ok(guard)
}
