#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli_config::CliConfig;

#[cfg(feature = "cli")]
mod cli_config {
    use super::cli::Command;
    use super::toml_config::TomlConfig;
    use crate::utils::error::Result;
    use clap::Parser;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize, Parser)]
    #[command(name = "storefront-cart")]
    #[command(about = "Shopping cart for the storefront catalog")]
    pub struct CliConfig {
        #[arg(long, help = "TOML configuration file")]
        pub config: Option<String>,

        #[arg(long, env = "STOREFRONT_CATALOG_URL", help = "Catalog service base URL")]
        pub catalog_url: Option<String>,

        #[arg(long, help = "Directory holding the cart slot")]
        pub store_dir: Option<String>,

        #[arg(long, help = "Enable verbose output")]
        pub verbose: bool,

        #[command(subcommand)]
        pub command: Command,
    }

    impl CliConfig {
        /// File values first, then command-line overrides.
        pub fn resolve(&self) -> Result<TomlConfig> {
            let mut config = match &self.config {
                Some(path) => TomlConfig::from_file(path)?,
                None => TomlConfig::default(),
            };
            if let Some(url) = &self.catalog_url {
                config.catalog.endpoint = url.clone();
            }
            if let Some(dir) = &self.store_dir {
                config.storage.path = dir.clone();
            }
            config.logging.verbose |= self.verbose;
            Ok(config)
        }
    }

}
