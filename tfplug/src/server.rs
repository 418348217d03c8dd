//! Server module for running Terraform providers
//!
//! Starts the gRPC server on a random localhost port and prints the go-plugin
//! handshake line Terraform reads from stdout. Logs go to stderr, which
//! Terraform captures into its own log output.

use crate::error::{Result, TfplugError};
use crate::grpc::ProviderService;
use crate::proto::provider_server::ProviderServer;
use crate::provider::ProviderV2;
use std::path::PathBuf;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::{Identity, Server, ServerTlsConfig};

pub const MAGIC_COOKIE_KEY: &str = "TF_PLUGIN_MAGIC_COOKIE";
pub const MAGIC_COOKIE_VALUE: &str =
    "d602bf8f470bc67ca7faa0386276bbdd4330efaf76d1a219cb4d6991ca9872b2";

const PROTOCOL_VERSION: u32 = 6;

/// Log level for the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    /// Reads `TF_LOG_PROVIDER`, falling back to `TF_LOG`. Unset means `Warn`.
    pub fn from_env() -> Self {
        std::env::var("TF_LOG_PROVIDER")
            .or_else(|_| std::env::var("TF_LOG"))
            .map(|value| Self::parse(&value))
            .unwrap_or(LogLevel::Warn)
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "TRACE" | "JSON" => LogLevel::Trace,
            "DEBUG" => LogLevel::Debug,
            "INFO" => LogLevel::Info,
            "WARN" => LogLevel::Warn,
            "ERROR" => LogLevel::Error,
            "OFF" => LogLevel::Off,
            _ => LogLevel::Warn,
        }
    }

    fn filter(self) -> tracing_subscriber::filter::LevelFilter {
        use tracing_subscriber::filter::LevelFilter;
        match self {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Off => LevelFilter::OFF,
        }
    }
}

/// Server configuration for running a Terraform provider
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// PEM certificate; the server runs without TLS unless both paths are set
    pub cert_path: Option<PathBuf>,
    pub key_path: Option<PathBuf>,
    /// Maximum message size in bytes
    pub max_message_size: usize,
    pub enable_logging: bool,
    pub log_level: LogLevel,
    /// Refuse to start unless Terraform's magic cookie is present
    pub require_magic_cookie: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            cert_path: None,
            key_path: None,
            max_message_size: 256 << 20, // 256MB
            enable_logging: true,
            log_level: LogLevel::Warn,
            require_magic_cookie: true,
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults plus `TFPLUG_TLS_CERT`/`TFPLUG_TLS_KEY` and the Terraform log level
    pub fn from_env() -> Self {
        Self {
            cert_path: std::env::var_os("TFPLUG_TLS_CERT").map(PathBuf::from),
            key_path: std::env::var_os("TFPLUG_TLS_KEY").map(PathBuf::from),
            log_level: LogLevel::from_env(),
            ..Self::default()
        }
    }

    pub fn with_tls(mut self, cert_path: PathBuf, key_path: PathBuf) -> Self {
        self.cert_path = Some(cert_path);
        self.key_path = Some(key_path);
        self
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    pub fn without_logging(mut self) -> Self {
        self.enable_logging = false;
        self
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    pub fn without_magic_cookie(mut self) -> Self {
        self.require_magic_cookie = false;
        self
    }
}

/// Installs a stderr subscriber at the given level. A subscriber that is
/// already installed is left alone.
pub fn init_logging(level: LogLevel) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(level.filter())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

fn check_magic_cookie() -> Result<()> {
    match std::env::var(MAGIC_COOKIE_KEY) {
        Ok(value) if value == MAGIC_COOKIE_VALUE => Ok(()),
        _ => Err(TfplugError::InvalidConfiguration(
            "This binary is a plugin. These are not meant to be executed directly. \
             Please execute the program that consumes these plugins, which will load \
             any plugins automatically"
                .to_string(),
        )),
    }
}

async fn tls_config(config: &ServerConfig) -> Result<Option<ServerTlsConfig>> {
    let (Some(cert_path), Some(key_path)) = (&config.cert_path, &config.key_path) else {
        return Ok(None);
    };

    // another component may have installed a provider already
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let cert = tokio::fs::read(cert_path)
        .await
        .map_err(|e| TfplugError::TlsError(format!("Failed to read certificate: {}", e)))?;
    let key = tokio::fs::read(key_path)
        .await
        .map_err(|e| TfplugError::TlsError(format!("Failed to read key: {}", e)))?;

    Ok(Some(
        ServerTlsConfig::new().identity(Identity::from_pem(cert, key)),
    ))
}

/// Main entry point for running a provider
pub async fn serve<P: ProviderV2 + 'static>(provider: P, config: ServerConfig) -> Result<()> {
    if config.enable_logging {
        init_logging(config.log_level);
    }
    if config.require_magic_cookie {
        check_magic_cookie()?;
    }

    let provider_service = ProviderServer::new(ProviderService::new(provider))
        .max_decoding_message_size(config.max_message_size)
        .max_encoding_message_size(config.max_message_size);

    let mut builder = Server::builder();
    if let Some(tls) = tls_config(&config).await? {
        builder = builder.tls_config(tls)?;
    }

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    println!("1|{}|tcp|{}|grpc", PROTOCOL_VERSION, addr);
    tracing::info!(%addr, tls = config.cert_path.is_some(), "Provider server listening");

    builder
        .add_service(provider_service)
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down provider server");
        })
        .await?;

    Ok(())
}

/// Convenience function to run a provider with configuration from the environment
pub async fn serve_default<P: ProviderV2 + 'static>(provider: P) -> Result<()> {
    serve(provider, ServerConfig::from_env()).await
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn log_level_parses_terraform_values() {
        assert_eq!(LogLevel::parse("trace"), LogLevel::Trace);
        assert_eq!(LogLevel::parse("JSON"), LogLevel::Trace);
        assert_eq!(LogLevel::parse("DEBUG"), LogLevel::Debug);
        assert_eq!(LogLevel::parse("off"), LogLevel::Off);
        assert_eq!(LogLevel::parse("verbose"), LogLevel::Warn);
    }

    #[test]
    #[serial]
    fn log_level_prefers_provider_specific_variable() {
        std::env::set_var("TF_LOG", "ERROR");
        std::env::set_var("TF_LOG_PROVIDER", "DEBUG");
        assert_eq!(LogLevel::from_env(), LogLevel::Debug);

        std::env::remove_var("TF_LOG_PROVIDER");
        assert_eq!(LogLevel::from_env(), LogLevel::Error);

        std::env::remove_var("TF_LOG");
        assert_eq!(LogLevel::from_env(), LogLevel::Warn);
    }

    #[test]
    #[serial]
    fn server_config_reads_tls_paths_from_env() {
        std::env::set_var("TFPLUG_TLS_CERT", "/tmp/cert.pem");
        std::env::set_var("TFPLUG_TLS_KEY", "/tmp/key.pem");

        let config = ServerConfig::from_env();
        assert_eq!(config.cert_path, Some(PathBuf::from("/tmp/cert.pem")));
        assert_eq!(config.key_path, Some(PathBuf::from("/tmp/key.pem")));

        std::env::remove_var("TFPLUG_TLS_CERT");
        std::env::remove_var("TFPLUG_TLS_KEY");

        let config = ServerConfig::from_env();
        assert!(config.cert_path.is_none());
    }

    #[test]
    #[serial]
    fn magic_cookie_is_required() {
        std::env::remove_var(MAGIC_COOKIE_KEY);
        assert!(matches!(
            check_magic_cookie(),
            Err(TfplugError::InvalidConfiguration(_))
        ));

        std::env::set_var(MAGIC_COOKIE_KEY, MAGIC_COOKIE_VALUE);
        assert!(check_magic_cookie().is_ok());
        std::env::remove_var(MAGIC_COOKIE_KEY);
    }

    #[tokio::test]
    async fn no_tls_without_both_paths() {
        let config = ServerConfig {
            cert_path: Some(PathBuf::from("/tmp/cert.pem")),
            ..ServerConfig::default()
        };
        assert!(tls_config(&config).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_certificate_is_a_tls_error() {
        let config = ServerConfig::default().with_tls(
            PathBuf::from("/nonexistent/cert.pem"),
            PathBuf::from("/nonexistent/key.pem"),
        );
        assert!(matches!(
            tls_config(&config).await,
            Err(TfplugError::TlsError(_))
        ));
    }
}
