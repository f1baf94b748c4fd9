use anyhow::Result;
use clap::Args;
use owo_colors::OwoColorize;
use tracing::info;

use crate::config::{self, Credentials};
use crate::data_paths::DataPaths;

#[derive(Args)]
pub struct InitArgs {
    /// API key; prompted for when omitted
    #[arg(long)]
    pub api_key: Option<String>,
}

pub async fn execute(data_paths: &DataPaths, args: InitArgs) -> Result<()> {
    let api_key = match args.api_key {
        Some(key) => key,
        None => {
            let key = rpassword::prompt_password("API key: ")?;
            if key.is_empty() {
                anyhow::bail!("API key cannot be empty");
            }
            key
        }
    };
    let api_secret = rpassword::prompt_password("API secret: ")?;
    if api_secret.is_empty() {
        anyhow::bail!("API secret cannot be empty");
    }

    config::save_credentials(
        data_paths,
        &Credentials {
            api_key,
            api_secret,
        },
    )
    .await?;

    info!("credentials saved");
    println!("{}", "Credentials saved to encrypted storage.".green());
    Ok(())
}
