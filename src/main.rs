use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use clap::Parser;

use live_translate::parsers::{get_charset, RcDomTree};
use live_translate::translation::{
    ConfigManager, Orchestrator, OrchestratorOptions, QueueOrder, TranslationConfig,
    TranslationError, TranslationResult, TranslationWorker,
};
use live_translate::utils::{init_logging, page_host};

const DEFAULT_ENCODING: &str = "utf-8";

#[derive(Parser, Debug)]
#[command(
    name = "live-translate",
    version,
    about = "Translate the visible text of an HTML document in place"
)]
struct Cli {
    /// HTML file to translate
    #[arg(value_name = "INPUT", required_unless_present = "generate_config")]
    input: Option<PathBuf>,

    /// Write the result to this file instead of stdout
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,

    /// Configuration file (TOML or JSON)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Free-text instruction naming the target language
    #[arg(short = 'p', long = "prompt")]
    prompt: Option<String>,

    /// API key for the translation service
    #[arg(short = 'k', long = "api-key")]
    api_key: Option<String>,

    /// Base URL of the translation service
    #[arg(long = "api-url")]
    api_url: Option<String>,

    /// Model name appended to the API URL
    #[arg(short = 'm', long = "model")]
    model: Option<String>,

    /// URL the document was loaded from, used for the restricted-site check
    #[arg(long = "site-url", value_name = "URL")]
    site_url: Option<String>,

    /// Comma-separated list of restricted sites
    #[arg(long = "restricted", value_name = "LIST")]
    restricted: Option<String>,

    /// Upper bound on characters per request
    #[arg(long = "max-batch-chars", value_name = "N")]
    max_batch_chars: Option<usize>,

    /// Order in which discovered regions are processed
    #[arg(long = "order", value_name = "lifo|fifo")]
    order: Option<QueueOrder>,

    /// Character encoding of the input document
    #[arg(short = 'e', long = "encoding")]
    encoding: Option<String>,

    /// Write an example configuration file and exit
    #[arg(long = "generate-config", value_name = "PATH")]
    generate_config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

impl Cli {
    fn load_config(&self) -> TranslationResult<TranslationConfig> {
        let manager = match &self.config {
            Some(path) => ConfigManager::with_path(path)?,
            None => ConfigManager::new()?,
        };
        let mut config = manager.into_config();

        if let Some(prompt) = &self.prompt {
            config.language_prompt = prompt.clone();
        }
        if let Some(api_key) = &self.api_key {
            config.api_key = Some(api_key.clone());
        }
        if let Some(api_url) = &self.api_url {
            config.api_url = api_url.clone();
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(restricted) = &self.restricted {
            config.restricted_sites = restricted.clone();
        }
        if let Some(max_chars) = self.max_batch_chars {
            config.max_batch_chars = max_chars;
        }
        if let Some(order) = self.order {
            config.queue_order = order;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Some(path) = &cli.generate_config {
        match ConfigManager::generate_example_config(path) {
            Ok(()) => {
                eprintln!("已生成示例配置文件: {}", path.display());
                return;
            }
            Err(e) => {
                eprintln!("错误: {}", e);
                process::exit(1);
            }
        }
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("错误: 创建异步运行时失败: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run(&cli)) {
        eprintln!("错误: {}", e);
        process::exit(1);
    }
}

async fn run(cli: &Cli) -> TranslationResult<()> {
    let config = cli.load_config()?;

    let Some(input) = cli.input.as_deref() else {
        return Err(TranslationError::ConfigError("未指定输入文件".to_string()));
    };
    let data = fs::read(input)?;

    let mut tree = RcDomTree::from_bytes(&data, cli.encoding.as_deref().unwrap_or(DEFAULT_ENCODING))?;
    if cli.encoding.is_none() {
        if let Some(charset) = get_charset(&tree.document()) {
            if !charset.eq_ignore_ascii_case(DEFAULT_ENCODING)
                && encoding_rs::Encoding::for_label(charset.as_bytes()).is_some()
            {
                tracing::debug!("按文档声明的字符集 {} 重新解析", charset);
                tree = RcDomTree::from_bytes(&data, &charset)?;
            }
        }
    }

    let host = cli.site_url.as_deref().map(page_host).unwrap_or_default();
    let worker = TranslationWorker::from_config(&config)?;
    let orchestrator = Orchestrator::new(
        tree,
        worker,
        config.site_settings(),
        &host,
        OrchestratorOptions::from(&config),
    );

    if orchestrator.is_armed() {
        let queued = orchestrator
            .tree()
            .body_elements()
            .iter()
            .map(|node| orchestrator.notify_subtree(node))
            .sum::<usize>();
        tracing::info!("发现 {} 个待处理区域", queued);

        let resolved = orchestrator.drain().await;
        let stats = orchestrator.stats();
        tracing::info!(
            "处理完成: {} 个文本单元，{} 次请求，{} 条回退，缓存命中 {}",
            resolved,
            stats.service_requests,
            stats.fallbacks,
            stats.cache_hits
        );
    }

    let output = orchestrator.tree().serialize()?;
    match &cli.output {
        Some(path) => fs::write(path, output)?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&output)?;
            stdout.flush()?;
        }
    }

    Ok(())
}
