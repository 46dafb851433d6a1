use clap::{builder::BoolishValueParser, Parser};

pub const DEFAULT_WEB_ADDRESS: &str = "0.0.0.0:8080";

/// Startup options of the registry server. Every option can also be given
/// through its environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "web", about = "Hierarchical location registry")]
pub struct WebConfig {
    /// Address the HTTP server binds to.
    #[arg(long, env = "WEB_ADDRESS", default_value = DEFAULT_WEB_ADDRESS)]
    pub address: String,

    /// Seed the sample buildings into an empty registry on start.
    #[arg(long, env = "SEED_LOCATIONS", value_parser = BoolishValueParser::new())]
    pub seed_locations: bool,

    /// Keep locations in memory instead of PostgreSQL.
    #[arg(long = "memory")]
    pub in_memory: bool,
}

impl WebConfig {
    pub fn from_env() -> Self {
        Self::parse()
    }
}
