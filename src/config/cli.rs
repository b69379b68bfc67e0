use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use uuid::Uuid;

use crate::domain::types::ContentKind;

/// Command-line arguments for the tidings binary.
#[derive(Debug, Parser)]
#[command(
    name = "tidings",
    version,
    about = "Content publishing backend with newsletter fan-out"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "TIDINGS_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the public and administrative HTTP listeners.
    Serve(Box<ServeArgs>),
    /// Send the newsletter for an existing content item and wait for delivery.
    Broadcast(BroadcastArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct BroadcastArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    /// Content kind of the item (blog, webinar, event, resource, careers).
    #[arg(value_name = "KIND", value_parser = parse_content_kind)]
    pub kind: ContentKind,

    /// Identifier of the content item.
    #[arg(value_name = "ID")]
    pub id: Uuid,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the public listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the administrative listener host.
    #[arg(long = "server-admin-host", value_name = "HOST")]
    pub server_admin_host: Option<String>,

    /// Override the public listener port.
    #[arg(long = "server-public-port", value_name = "PORT")]
    pub public_port: Option<u16>,

    /// Override the administrative listener port.
    #[arg(long = "server-admin-port", value_name = "PORT")]
    pub admin_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override the file storage directory.
    #[arg(long = "uploads-directory", value_name = "PATH")]
    pub uploads_directory: Option<PathBuf>,

    /// Override the maximum request size for uploads in bytes.
    #[arg(long = "uploads-max-request-bytes", value_name = "BYTES")]
    pub uploads_max_request_bytes: Option<u64>,

    /// Override the sender address used for outgoing mail.
    #[arg(long = "mail-from", value_name = "ADDRESS")]
    pub mail_from: Option<String>,

    /// Override the SMTP relay host.
    #[arg(long = "smtp-host", value_name = "HOST")]
    pub smtp_host: Option<String>,

    /// Override the SMTP relay port.
    #[arg(long = "smtp-port", value_name = "PORT")]
    pub smtp_port: Option<u16>,

    /// Override the public site URL used in newsletter links.
    #[arg(long = "newsletter-site-url", value_name = "URL")]
    pub newsletter_site_url: Option<String>,

    /// Override the newsletter queue capacity.
    #[arg(long = "newsletter-queue-capacity", value_name = "COUNT")]
    pub newsletter_queue_capacity: Option<u64>,
}

fn parse_content_kind(value: &str) -> Result<ContentKind, String> {
    ContentKind::parse(value).ok_or_else(|| {
        let known = ContentKind::ALL.map(ContentKind::as_str).join(", ");
        format!("unknown content kind `{value}` (expected one of: {known})")
    })
}
