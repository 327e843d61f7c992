//! 命令行入口：翻译一个 HTML 文件
//!
//! 解析文档，监听 `<body>`，等待所有批次完成后输出翻译后的文档。

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use i18n_observer::dom::{serialize_document, LiveDocument};
use i18n_observer::env::{self, core::LogLevel, EnvVar};
use i18n_observer::translation::{
    ConfigManager, DictionaryProvider, I18nObserver, LanguageTag, ObserverConfig, ObserverOptions,
    TranslationError, TranslationProvider, TranslationResult,
};

/// Incrementally translate the text of an HTML document.
#[derive(Parser, Debug)]
#[command(name = "i18n-observer")]
#[command(version)]
struct Cli {
    /// HTML file to translate
    #[arg(required_unless_present_any = ["env_docs", "init_config"])]
    input: Option<PathBuf>,

    /// Write the translated document here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Language the document is written in
    #[arg(short = 'd', long)]
    default_language: Option<String>,

    /// Language to translate into
    #[arg(short = 't', long)]
    target_language: Option<String>,

    /// JSON object file mapping source text to translation
    #[arg(long, conflicts_with = "api_url")]
    glossary: Option<PathBuf>,

    /// HTTP translation endpoint
    #[arg(long)]
    api_url: Option<String>,

    /// Configuration file (TOML, or JSON by extension)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Charset of the input document
    #[arg(long, default_value = "utf-8")]
    encoding: String,

    /// Log level: trace, debug, info, warn, error
    #[arg(long)]
    log_level: Option<String>,

    /// Print the environment variable reference and exit
    #[arg(long)]
    env_docs: bool,

    /// Write a configuration file with the default settings and exit
    #[arg(long, value_name = "PATH")]
    init_config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.env_docs {
        print!("{}", env::generate_env_docs());
        return ExitCode::SUCCESS;
    }

    init_logging(cli.log_level.as_deref());

    if let Some(path) = &cli.init_config {
        return match ConfigManager::generate_example_config(path) {
            Ok(()) => {
                tracing::info!("已生成配置文件: {}", path.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: Option<&str>) {
    let level = match level {
        Some(level) => LogLevel::parse(level).unwrap_or_else(|e| {
            eprintln!("Warning: {}", e);
            "info".to_string()
        }),
        None => LogLevel::get_or_default("info".to_string()),
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!("i18n_observer={}", level)))
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> TranslationResult<()> {
    let config = load_config(&cli)?;
    let provider = build_provider(&cli, &config)?;
    let options = ObserverOptions::from_config(&config, provider)?;
    let observer = I18nObserver::new(options)?;

    let input = cli
        .input
        .as_ref()
        .ok_or_else(|| TranslationError::ConfigError("缺少输入文件".to_string()))?;
    let data = fs::read(input).map_err(|e| TranslationError::from(e).with_context(input.display()))?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let local = tokio::task::LocalSet::new();

    let output = local.block_on(&runtime, async {
        let document = LiveDocument::from_html(&data, &cli.encoding);
        observer.observe(&document, None);
        observer.wait_idle().await;
        serialize_document(document.document(), &cli.encoding)
    })?;

    let stats = observer.stats();
    tracing::info!(
        "完成: 请求 {} 段文本，写回 {} 个节点，字典命中 {} 次",
        stats.texts_requested,
        stats.translations_applied,
        stats.fast_path_writes
    );
    if stats.provider_failures > 0 {
        tracing::warn!("{} 次翻译请求失败，部分文本保持原文", stats.provider_failures);
    }

    match &cli.output {
        Some(path) => {
            fs::write(path, &output).map_err(|e| TranslationError::from(e).with_context(path.display()))?
        }
        None => std::io::stdout().write_all(&output)?,
    }

    Ok(())
}

/// 配置文件 → 环境变量 → 命令行参数
fn load_config(cli: &Cli) -> TranslationResult<ObserverConfig> {
    let manager = match &cli.config {
        Some(path) => ConfigManager::from_file(path)?,
        None => ConfigManager::new()?,
    };
    let mut config = manager.into_config();

    if let Some(language) = &cli.default_language {
        config.default_language = Some(LanguageTag::parse(language)?);
    }
    if let Some(language) = &cli.target_language {
        config.target_language = Some(LanguageTag::parse(language)?);
    }
    if let Some(api_url) = &cli.api_url {
        config.api_url = api_url.clone();
        config.validate()?;
    }

    if config.default_language.is_none() {
        return Err(TranslationError::ConfigError(
            "需要指定文档语言 (--default-language)".to_string(),
        ));
    }

    Ok(config)
}

fn build_provider(cli: &Cli, config: &ObserverConfig) -> TranslationResult<Rc<dyn TranslationProvider>> {
    if let Some(path) = &cli.glossary {
        return Ok(Rc::new(DictionaryProvider::from_json_file(path)?));
    }

    #[cfg(feature = "http")]
    {
        tracing::info!("使用 HTTP 翻译服务: {}", config.api_url);
        Ok(Rc::new(i18n_observer::translation::HttpProvider::from_config(config)?))
    }

    #[cfg(not(feature = "http"))]
    {
        let _ = config;
        Err(TranslationError::ConfigError(
            "未启用 http 功能，请使用 --glossary 指定词表".to_string(),
        ))
    }
}
