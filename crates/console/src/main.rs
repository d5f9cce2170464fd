use std::env;
use std::fs;

use micro_httpclient::client::HttpClientProxy;
use micro_httpclient::config::HttpClientConfig;
use micro_httpclient_console::{AccessLevel, Console};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::LocalSet;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

const CONFIG_ENV: &str = "MICRO_HTTPCLIENT_CONFIG";
const LEVEL_ENV: &str = "MICRO_HTTPCLIENT_LEVEL";

fn load_config() -> Result<HttpClientConfig, Box<dyn std::error::Error>> {
    let Ok(path) = env::var(CONFIG_ENV) else {
        return Ok(HttpClientConfig::default());
    };
    info!(%path, "loading http client config");
    let json = fs::read_to_string(&path)?;
    Ok(HttpClientConfig::from_json(&json)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).with_writer(std::io::stderr).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config = load_config().inspect_err(|e| error!(cause = %e, "invalid http client config"))?;
    let level = match env::var(LEVEL_ENV) {
        Ok(level) => level.parse::<AccessLevel>()?,
        Err(_) => AccessLevel::Admin,
    };
    let console = Console::new(HttpClientProxy::new(config), level)?;

    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    LocalSet::new().block_on(&runtime, async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        while let Some(line) = lines.next_line().await? {
            console.run_command(&line, &mut stdout).await?;
        }
        Ok::<_, Box<dyn std::error::Error>>(())
    })
}
