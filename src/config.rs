use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::printer::escpos::TextEncoding;
use crate::printer::models::DefaultPrinterSelection;
use crate::receipt::ReceiptOptions;

pub const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:5173",
    "https://martpos.app",
    "https://app.martpos.app",
];

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub bind: SocketAddr,
    pub enabled: bool,
    pub default_printer: Option<DefaultPrinterSelection>,
    /// Appended to the built-in classifier vocabulary.
    pub extra_keywords: Vec<String>,
    /// Per bulk transfer.
    pub usb_timeout: Duration,
    /// Whole print or enumeration job, lock wait included.
    pub print_timeout: Duration,
    pub encoding: TextEncoding,
    pub receipt: ReceiptOptions,
    pub cors_origins: Vec<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3300)),
            enabled: true,
            default_printer: None,
            extra_keywords: Vec::new(),
            usb_timeout: Duration::from_millis(5000),
            print_timeout: Duration::from_millis(20000),
            encoding: TextEncoding::Utf8,
            receipt: ReceiptOptions::default(),
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
        }
    }
}

/// Load `.env` if present, then read the process environment.
pub fn load_config() -> Result<AgentConfig, ConfigError> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!("Loaded {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("Ignoring unreadable .env: {e}"),
    }
    AgentConfig::from_lookup(|key| std::env::var(key).ok())
}

impl AgentConfig {
    /// Build from a key lookup. Unset or blank keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(raw) = get("PRINT_AGENT_BIND") {
            config.bind = parse("PRINT_AGENT_BIND", &raw)?;
        }
        if let Some(raw) = get("PRINT_AGENT_ENABLED") {
            config.enabled = parse_bool("PRINT_AGENT_ENABLED", &raw)?;
        }
        if let Some(raw) = get("PRINTER_DEFAULT") {
            let selection = DefaultPrinterSelection::parse_hex_pair(&raw).map_err(|e| {
                ConfigError::Invalid {
                    key: "PRINTER_DEFAULT",
                    reason: e.to_string(),
                }
            })?;
            config.default_printer = Some(selection);
        }
        if let Some(raw) = get("PRINTER_KEYWORDS") {
            config.extra_keywords = raw
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(raw) = get("USB_TIMEOUT_MS") {
            config.usb_timeout = parse_millis("USB_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = get("PRINT_TIMEOUT_MS") {
            config.print_timeout = parse_millis("PRINT_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = get("PAPER_WIDTH") {
            config.receipt.width = parse("PAPER_WIDTH", &raw)?;
            if config.receipt.width == 0 {
                return Err(ConfigError::Invalid {
                    key: "PAPER_WIDTH",
                    reason: "must be positive".into(),
                });
            }
        }
        if let Some(raw) = get("PRINTER_ENCODING") {
            config.encoding = raw.parse().map_err(|reason| ConfigError::Invalid {
                key: "PRINTER_ENCODING",
                reason,
            })?;
        }
        if let Some(raw) = get("INVOICE_URL_BASE") {
            config.receipt.invoice_url_base = raw;
        }
        if let Some(raw) = get("RECEIPT_FOOTER") {
            config.receipt.footer = raw;
        }
        if let Some(raw) = get("RECEIPT_BARCODE") {
            config.receipt.barcode = raw.parse().map_err(|reason| ConfigError::Invalid {
                key: "RECEIPT_BARCODE",
                reason,
            })?;
        }
        if let Some(raw) = get("RECEIPT_QR_CORRECTION") {
            config.receipt.qr_correction = raw.parse().map_err(|reason| ConfigError::Invalid {
                key: "RECEIPT_QR_CORRECTION",
                reason,
            })?;
        }
        if let Some(raw) = get("PRINTER_CUT") {
            config.receipt.cut = raw.parse().map_err(|reason| ConfigError::Invalid {
                key: "PRINTER_CUT",
                reason,
            })?;
        }
        if let Some(raw) = get("CORS_ORIGINS") {
            config.cors_origins = raw
                .split(',')
                .map(|o| o.trim().trim_end_matches('/').to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }

        Ok(config)
    }
}

fn parse<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        reason: format!("{raw:?}: {e}"),
    })
}

fn parse_millis(key: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    let ms: u64 = parse(key, raw)?;
    if ms == 0 {
        return Err(ConfigError::Invalid {
            key,
            reason: "must be positive".into(),
        });
    }
    Ok(Duration::from_millis(ms))
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            reason: format!("{raw:?} is not a boolean"),
        }),
    }
}
