//! Runtime configuration
//!
//! Values come from environment variables (optionally seeded from a `.env`
//! file) and may be overridden by command-line flags. Nothing here is global;
//! the loaded [`FilerConfig`] is passed into the components it configures.

use secrecy::{ExposeSecret, SecretString};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::classify::{ClassificationClient, OpenAiClassifier, RetryPolicy};
use crate::clients::{AddressBook, AddressBookError, ClientResolver};
use crate::extract::DocumentParser;
use crate::pipeline::{CancelFlag, ManifestSender, Pipeline, SenderManifestError, DEFAULT_MAX_CONCURRENT};
use crate::routing::{CollisionPolicy, FileRouter};

pub const DEFAULT_INPUT_DIR: &str = "input_files";
pub const DEFAULT_CLIENTS_DIR: &str = "CLIENTS";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 90;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

const API_KEY_VAR: &str = "OPENAI_API_KEY";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingEnvVar(&'static str),
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
    #[error(transparent)]
    AddressBook(#[from] AddressBookError),
    #[error(transparent)]
    SenderManifest(#[from] SenderManifestError),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Everything needed to assemble a [`Pipeline`]
#[derive(Debug)]
pub struct FilerConfig {
    pub input_dir: PathBuf,
    pub clients_dir: PathBuf,
    /// JSON address book; `None` means an empty table
    pub address_book: Option<PathBuf>,
    pub api_key: Option<SecretString>,
    pub model: String,
    pub base_url: String,
    pub max_concurrent: usize,
    pub request_timeout: Duration,
    pub max_attempts: u32,
    pub collision_policy: CollisionPolicy,
    /// Address used for files the sender manifest does not list
    pub default_sender: Option<String>,
    pub dry_run: bool,
}

impl Default for FilerConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            clients_dir: PathBuf::from(DEFAULT_CLIENTS_DIR),
            address_book: None,
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            collision_policy: CollisionPolicy::default(),
            default_sender: None,
            dry_run: false,
        }
    }
}

impl FilerConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(v) = get("FILER_INPUT_DIR") {
            config.input_dir = PathBuf::from(v);
        }
        if let Some(v) = get("FILER_CLIENTS_DIR") {
            config.clients_dir = PathBuf::from(v);
        }
        config.address_book = get("FILER_ADDRESS_BOOK").map(PathBuf::from);
        config.api_key = get(API_KEY_VAR).map(SecretString::from);
        if let Some(v) = get("FILER_MODEL") {
            config.model = v;
        }
        if let Some(v) = get("FILER_BASE_URL") {
            config.base_url = v;
        }
        if let Some(v) = get("FILER_MAX_CONCURRENT") {
            config.max_concurrent = parse_positive("FILER_MAX_CONCURRENT", &v)?;
        }
        if let Some(v) = get("FILER_REQUEST_TIMEOUT_SECS") {
            config.request_timeout =
                Duration::from_secs(parse_positive("FILER_REQUEST_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = get("FILER_MAX_ATTEMPTS") {
            config.max_attempts = parse_positive("FILER_MAX_ATTEMPTS", &v)?;
        }
        if let Some(v) = get("FILER_COLLISION_POLICY") {
            config.collision_policy = v.parse().map_err(|reason| ConfigError::InvalidValue {
                key: "FILER_COLLISION_POLICY",
                reason,
            })?;
        }
        config.default_sender = get("FILER_DEFAULT_SENDER");

        Ok(config)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            ..RetryPolicy::default()
        }
    }

    pub fn load_address_book(&self) -> Result<AddressBook, ConfigError> {
        match &self.address_book {
            Some(path) => Ok(AddressBook::load(path)?),
            None => {
                tracing::warn!("[Config] No address book configured; address matching disabled");
                Ok(AddressBook::default())
            }
        }
    }

    /// Assemble the production pipeline (OpenAI classifier, document parser)
    pub fn build_pipeline(&self, cancel: CancelFlag) -> Result<Pipeline, ConfigError> {
        let api_key = self
            .api_key
            .as_ref()
            .map(|key| SecretString::from(key.expose_secret()))
            .ok_or(ConfigError::MissingEnvVar(API_KEY_VAR))?;

        let classifier = OpenAiClassifier::new(
            api_key,
            self.base_url.clone(),
            self.model.clone(),
            self.max_concurrent,
        )?;
        let client = ClassificationClient::new(Arc::new(classifier))
            .with_retry(self.retry_policy())
            .with_request_timeout(self.request_timeout);

        let resolver = ClientResolver::new(self.clients_dir.clone(), self.load_address_book()?);
        let senders = ManifestSender::from_input_dir(&self.input_dir)?
            .with_fallback(self.default_sender.clone());

        Ok(Pipeline::new(
            Arc::new(DocumentParser::new()),
            Arc::new(client),
            Arc::new(resolver),
            Arc::new(FileRouter::new(self.collision_policy)),
        )
        .with_senders(Arc::new(senders))
        .with_max_concurrent(self.max_concurrent)
        .with_dry_run(self.dry_run)
        .with_cancel_flag(cancel))
    }
}

fn parse_positive<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
    T::Err: std::fmt::Display,
{
    let parsed: T = value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key,
        reason: e.to_string(),
    })?;
    if parsed <= T::default() {
        return Err(ConfigError::InvalidValue {
            key,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(parsed)
}
