use clap::{Parser, Subcommand};
use std::path::PathBuf;
use wxgem::config;
use wxgem::form::PromptForm;
use wxgem::llm::GeminiClient;

#[derive(Parser)]
#[command(name = "wxgem")]
#[command(about = "WeChat official-account webhook backed by Gemini", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config.json (secrets are not written).
    Init {
        /// Config file path (default: WXGEM_CONFIG_PATH or ~/.wxgem/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Run the webhook gateway. Requires WECHAT_TOKEN and GEMINI_API_KEY (or their config keys).
    Gateway {
        /// Config file path (default: WXGEM_CONFIG_PATH or ~/.wxgem/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// HTTP port (default from config or 15152)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Send one prompt to Gemini and print the answer.
    Ask {
        /// Config file path (default: WXGEM_CONFIG_PATH or ~/.wxgem/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Prompt text; multiple words are joined with spaces.
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,
    },

    /// Print the handshake signature the gateway expects, for testing the webhook with curl.
    Sign {
        /// Config file path (default: WXGEM_CONFIG_PATH or ~/.wxgem/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        #[arg(long)]
        timestamp: String,

        #[arg(long)]
        nonce: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = match cli.command {
        Some(Commands::Gateway { .. }) => "info",
        _ => "warn",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match cli.command {
        Some(Commands::Version) => {
            println!("wxgem {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Gateway { config, port }) => {
            if let Err(e) = run_gateway(config, port).await {
                log::error!("gateway failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Ask { config, prompt }) => match run_ask(config, prompt.join(" ")).await {
            Ok(true) => {}
            Ok(false) => std::process::exit(1),
            Err(e) => {
                log::error!("ask failed: {:#}", e);
                std::process::exit(1);
            }
        },
        Some(Commands::Sign {
            config,
            timestamp,
            nonce,
        }) => {
            if let Err(e) = run_sign(config, &timestamp, &nonce) {
                log::error!("sign failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(config::default_config_path);
    let dir = wxgem::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_gateway(config_path: Option<PathBuf>, port: Option<u16>) -> anyhow::Result<()> {
    let (mut config, path) = config::load_config(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    log::info!(
        "starting gateway on {}:{} (config {})",
        config.gateway.bind,
        config.gateway.port,
        path.display()
    );
    wxgem::gateway::run_gateway(config).await
}

/// Returns Ok(false) when the prompt was blank or the model call failed (already reported).
async fn run_ask(config_path: Option<PathBuf>, prompt: String) -> anyhow::Result<bool> {
    let (config, _) = config::load_config(config_path)?;
    let api_key = config::resolve_gemini_api_key(&config).ok_or_else(|| {
        anyhow::anyhow!(
            "Gemini API key not configured (set {} or gemini.apiKey)",
            config::GEMINI_API_KEY_ENV
        )
    })?;
    let client = GeminiClient::new(&config.gemini, api_key)?;

    let mut form = PromptForm::new();
    form.input = prompt;
    if !form.run(&client).await {
        eprintln!("nothing to ask: prompt is empty");
        return Ok(false);
    }
    if let Some(text) = form.response() {
        println!("{}", text.trim_end());
        return Ok(true);
    }
    eprintln!("error: {}", form.error().unwrap_or("unknown error"));
    Ok(false)
}

fn run_sign(config_path: Option<PathBuf>, timestamp: &str, nonce: &str) -> anyhow::Result<()> {
    let (config, _) = config::load_config(config_path)?;
    let token = config::resolve_wechat_token(&config).ok_or_else(|| {
        anyhow::anyhow!(
            "WeChat token not configured (set {} or wechat.token)",
            config::WECHAT_TOKEN_ENV
        )
    })?;
    println!(
        "{}",
        wxgem::wechat::compute_signature(&token, timestamp, nonce)
    );
    Ok(())
}
