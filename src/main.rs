// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info, warn};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use subtrad::app_config::{self, Config, TranslationProvider};
use subtrad::app_controller::Controller;
use subtrad::errors::AppError;

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    #[value(name = "google_v1")]
    GoogleV1,
    #[value(name = "google_free")]
    GoogleFree,
    #[value(name = "mymemory")]
    MyMemory,
    #[value(name = "libretranslate")]
    LibreTranslate,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::GoogleV1 => TranslationProvider::GoogleBatch,
            CliTranslationProvider::GoogleFree => TranslationProvider::GoogleFree,
            CliTranslationProvider::MyMemory => TranslationProvider::MyMemory,
            CliTranslationProvider::LibreTranslate => TranslationProvider::LibreTranslate,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// Options shared by every command that needs a configuration
#[derive(clap::Args, Debug, Clone)]
struct ConfigArgs {
    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Source language code (e.g., 'en', 'fr') or 'auto'
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g., 'es', 'de')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Number of files translated at the same time
    #[arg(short = 'j', long)]
    max_concurrent_files: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate subtitle files (default command)
    Translate(TranslateArgs),

    /// Copy the timing of an original file onto a translated one
    Timefix {
        /// Subtitle file with the correct timing
        original: PathBuf,

        /// Translated subtitle file whose text is kept
        translated: PathBuf,

        /// Output path (default: <translated>_fixed.srt)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Check that the configured provider is reachable
    Check {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Generate shell completions for subtrad
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Input subtitle file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    #[command(flatten)]
    config: ConfigArgs,
}

/// subtrad - batch subtitle translator
///
/// Translates SRT files through free or self-hosted machine translation services.
#[derive(Parser, Debug)]
#[command(name = "subtrad")]
#[command(version)]
#[command(about = "Batch subtitle translation tool")]
#[command(long_about = "subtrad translates SRT subtitle files through machine translation services.

EXAMPLES:
    subtrad movie.srt                           # Translate using default config
    subtrad -f movie.srt                        # Force overwrite existing files
    subtrad -p libretranslate movie.srt         # Use a specific provider
    subtrad -s en -t es movie.srt               # Translate from English to Spanish
    subtrad -j 3 --log-level debug /series/     # Process a directory, 3 files at a time
    subtrad timefix ep01.srt ep01_es.srt        # Restore timing of a translated file
    subtrad check -p mymemory                   # Check provider reachability
    subtrad completions bash > subtrad.bash     # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.

OUTPUT:
    Translations are written to Subtitles_<lang>/<name>_<lang>.srt next to the input.

SUPPORTED PROVIDERS:
    google_v1      - Google web endpoint, batched requests
    google_free    - Google web endpoint, one request per line (default)
    mymemory       - MyMemory API (needs an explicit or detected source language)
    libretranslate - Self-hosted LibreTranslate server (default: http://127.0.0.1:5000)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input subtitle file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    #[command(flatten)]
    config: ConfigArgs,
}

// @struct: Custom logger implementation
struct CustomLogger;

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Tag for log level
    fn get_tag_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "ERROR",
            Level::Warn => "WARN ",
            Level::Info => "INFO ",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }

    // @returns: ANSI colour for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let level = record.level();
            let _ = writeln!(
                std::io::stderr(),
                "{}{} {} {}\x1B[0m",
                Self::get_color_for_level(level),
                now,
                Self::get_tag_for_level(level),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Info until the config says otherwise
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "subtrad", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Translate(args)) => run_translate(args).await,
        Some(Commands::Timefix {
            original,
            translated,
            output,
            config,
        }) => {
            let controller = Controller::with_config(load_config(&config)?)?;
            let (path, report) = controller.timefix(&original, &translated, output)?;
            info!(
                "Wrote {} ({} blocks, {} timing fixes)",
                path.display(),
                report.aligned,
                report.timing_mismatches
            );
            Ok(())
        }
        Some(Commands::Check { config }) => {
            let controller = Controller::with_config(load_config(&config)?)?;
            let provider = controller.config().translation.provider;
            controller
                .check()
                .await
                .with_context(|| format!("{} is not reachable", provider.display_name()))?;
            info!("{} is reachable", provider.display_name());
            Ok(())
        }
        None => {
            // Default behavior: top-level args translate
            let input_path = cli
                .input_path
                .ok_or_else(|| anyhow!("INPUT_PATH is required when no subcommand is specified"))?;

            run_translate(TranslateArgs {
                input_path,
                force_overwrite: cli.force_overwrite,
                config: cli.config,
            })
            .await
        }
    }
}

/// Load the config file, creating a default one when missing, then apply CLI overrides
fn load_config(options: &ConfigArgs) -> Result<Config> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let config_path = &options.config_path;
    let mut config = if Path::new(config_path).exists() {
        let file = File::open(config_path).context(format!("Failed to open config file: {}", config_path))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).context(format!("Failed to parse config file: {}", config_path))?
    } else {
        warn!("Config file not found at '{}', creating default config.", config_path);
        let config = Config::default();
        let config_json =
            serde_json::to_string_pretty(&config).context("Failed to serialize default config to JSON")?;
        std::fs::write(config_path, config_json)
            .context(format!("Failed to write default config to file: {}", config_path))?;
        config
    };

    apply_overrides(&mut config, options);
    config.validate().context("Configuration validation failed")?;

    // If log level was not set via command line, update it from config now
    if options.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    Ok(config)
}

fn apply_overrides(config: &mut Config, options: &ConfigArgs) {
    if let Some(provider) = &options.provider {
        config.translation.provider = provider.clone().into();
    }
    if let Some(source_lang) = &options.source_language {
        config.source_language = source_lang.clone();
    }
    if let Some(target_lang) = &options.target_language {
        config.target_language = target_lang.clone();
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }
    if let Some(files) = options.max_concurrent_files {
        config.translation.common.max_concurrent_files = files;
    }
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    let config = load_config(&options.config)?;
    info!(
        "Translating {} -> {} with {}",
        config.source_language,
        config.target_language,
        config.translation.provider.display_name()
    );

    let controller = Controller::with_config(config)?;
    let input_path = options.input_path;

    let work = async {
        if input_path.is_file() {
            controller.run(input_path.clone(), options.force_overwrite).await
        } else if input_path.is_dir() {
            controller.run_folder(input_path.clone(), options.force_overwrite).await
        } else {
            Err(AppError::File(format!("Input path does not exist: {:?}", input_path)))
        }
    };
    tokio::pin!(work);

    let summary = tokio::select! {
        result = &mut work => result?,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, cancelling running translations");
            controller.cancel_all();
            work.await?
        }
    };

    if summary.failed > 0 {
        error!("{} file(s) failed", summary.failed);
        return Err(anyhow!("{} file(s) failed to translate", summary.failed));
    }
    Ok(())
}
