use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use std::{env, fmt, str::FromStr, time::Duration};
use url::Url;

/// Longest expiry a SigV4 pre-signed URL may carry (7 days).
pub const MAX_PRESIGN_EXPIRY_SECS: u64 = 604_800;

const DEFAULT_PORT: u16 = 9090;
const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_SIGN_TIMEOUT_MS: u64 = 5_000;

const BUCKET_NAME_MIN_LEN: usize = 3;
const BUCKET_NAME_MAX_LEN: usize = 63;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage: StorageConfig,
    /// Lifetime of every issued URL.
    pub presign_expiry: Duration,
    /// Upper bound on a single signing call.
    pub sign_timeout: Duration,
}

/// Connection settings for the object store, shared read-only by the
/// bootstrapper and the URL issuer.
///
/// Two endpoints are kept apart: the internal one is used for bucket
/// administration from inside the private network, the public one is the
/// host baked into signed URLs handed to external clients.
#[derive(Clone)]
pub struct StorageConfig {
    pub internal_endpoint: String,
    pub public_endpoint: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("internal_endpoint", &self.internal_endpoint)
            .field("public_endpoint", &self.public_endpoint)
            .field("region", &self.region)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .finish()
    }
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Issues pre-signed upload and download URLs")]
pub struct Args {
    /// Host to bind to (overrides FILE_SERVICE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides FILE_SERVICE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Object store endpoint used for bucket administration (overrides FILE_SERVICE_INTERNAL_ENDPOINT)
    #[arg(long)]
    pub internal_endpoint: Option<String>,

    /// Object store endpoint embedded in signed URLs (overrides FILE_SERVICE_PUBLIC_ENDPOINT)
    #[arg(long)]
    pub public_endpoint: Option<String>,

    /// Object store region (overrides FILE_SERVICE_REGION)
    #[arg(long)]
    pub region: Option<String>,

    /// Access key (overrides FILE_SERVICE_ACCESS_KEY)
    #[arg(long)]
    pub access_key: Option<String>,

    /// Secret key (overrides FILE_SERVICE_SECRET_KEY)
    #[arg(long)]
    pub secret_key: Option<String>,

    /// Bucket holding uploaded files (overrides FILE_SERVICE_BUCKET)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Lifetime of issued URLs in seconds (overrides FILE_SERVICE_PRESIGN_EXPIRY_SECS)
    #[arg(long)]
    pub presign_expiry_secs: Option<u64>,

    /// Timeout for a single signing call in milliseconds (overrides FILE_SERVICE_SIGN_TIMEOUT_MS)
    #[arg(long)]
    pub sign_timeout_ms: Option<u64>,

    /// Ensure the bucket exists and exit
    #[arg(long)]
    pub init_bucket_only: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and the
    /// init-bucket-only flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        Self::resolve(Args::parse(), |key| env::var(key).ok())
    }

    /// Merge already-parsed args with an environment lookup. Flags win over
    /// environment values, environment values win over defaults.
    pub fn resolve<F>(args: Args, env: F) -> Result<(Self, bool)>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Environment fallback ---
        let env_host = env("FILE_SERVICE_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let env_port = parse_env(&env, "FILE_SERVICE_PORT", DEFAULT_PORT)?;
        let env_region = env("FILE_SERVICE_REGION").unwrap_or_else(|| DEFAULT_REGION.into());
        let env_expiry = parse_env(
            &env,
            "FILE_SERVICE_PRESIGN_EXPIRY_SECS",
            MAX_PRESIGN_EXPIRY_SECS,
        )?;
        let env_sign_timeout =
            parse_env(&env, "FILE_SERVICE_SIGN_TIMEOUT_MS", DEFAULT_SIGN_TIMEOUT_MS)?;

        let internal_endpoint = required(
            args.internal_endpoint,
            &env,
            "FILE_SERVICE_INTERNAL_ENDPOINT",
            "internal-endpoint",
        )?;
        let public_endpoint = args
            .public_endpoint
            .or_else(|| env("FILE_SERVICE_PUBLIC_ENDPOINT"))
            .unwrap_or_else(|| internal_endpoint.clone());

        // --- Merge ---
        let storage = StorageConfig {
            internal_endpoint,
            public_endpoint,
            region: args.region.unwrap_or(env_region),
            access_key: required(
                args.access_key,
                &env,
                "FILE_SERVICE_ACCESS_KEY",
                "access-key",
            )?,
            secret_key: required(
                args.secret_key,
                &env,
                "FILE_SERVICE_SECRET_KEY",
                "secret-key",
            )?,
            bucket: required(args.bucket, &env, "FILE_SERVICE_BUCKET", "bucket")?,
        };
        storage.validate()?;

        let expiry_secs = args.presign_expiry_secs.unwrap_or(env_expiry);
        if expiry_secs == 0 || expiry_secs > MAX_PRESIGN_EXPIRY_SECS {
            bail!(
                "presign expiry must be between 1 and {} seconds, got {}",
                MAX_PRESIGN_EXPIRY_SECS,
                expiry_secs
            );
        }

        let sign_timeout_ms = args.sign_timeout_ms.unwrap_or(env_sign_timeout);
        if sign_timeout_ms == 0 {
            bail!("sign timeout must be greater than zero");
        }

        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            storage,
            presign_expiry: Duration::from_secs(expiry_secs),
            sign_timeout: Duration::from_millis(sign_timeout_ms),
        };

        Ok((cfg, args.init_bucket_only))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl StorageConfig {
    /// Check that every setting is present and well-formed.
    pub fn validate(&self) -> Result<()> {
        validate_endpoint("internal endpoint", &self.internal_endpoint)?;
        validate_endpoint("public endpoint", &self.public_endpoint)?;
        if self.region.trim().is_empty() {
            bail!("region must not be empty");
        }
        if self.access_key.is_empty() {
            bail!("access key must not be empty");
        }
        if self.secret_key.is_empty() {
            bail!("secret key must not be empty");
        }
        validate_bucket_name(&self.bucket)
    }
}

fn required<F>(arg: Option<String>, env: &F, key: &str, flag: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    arg.or_else(|| env(key))
        .filter(|value| !value.is_empty())
        .ok_or_else(|| anyhow!("missing setting: pass --{} or set {}", flag, key))
}

fn parse_env<F, T>(env: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env(key) {
        Some(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", key, value)),
        None => Ok(default),
    }
}

fn validate_endpoint(label: &str, endpoint: &str) -> Result<()> {
    let url = Url::parse(endpoint).with_context(|| format!("{} `{}`", label, endpoint))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("{} `{}` must use http or https", label, endpoint);
    }
    if url.host_str().is_none() {
        bail!("{} `{}` has no host", label, endpoint);
    }
    Ok(())
}

/// Validate bucket name format.
///
/// Enforces S3 naming rules:
/// - 3–63 characters
/// - lowercase letters, digits, dots, hyphens only
/// - cannot start/end with dot or hyphen
/// - cannot contain consecutive dots or dot-hyphen patterns
/// - cannot look like an IPv4 address
fn validate_bucket_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| anyhow!("bucket `{}` invalid: {}", name, reason);

    let len = name.len();
    if !(BUCKET_NAME_MIN_LEN..=BUCKET_NAME_MAX_LEN).contains(&len) {
        return Err(invalid("must be between 3 and 63 characters"));
    }

    if !name
        .chars()
        .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '.' | '-'))
    {
        return Err(invalid(
            "allowed characters are lowercase letters, digits, dots, and hyphens",
        ));
    }

    if name.starts_with(['.', '-']) || name.ends_with(['.', '-']) {
        return Err(invalid("must start and end with a lowercase letter or digit"));
    }

    if name.contains("..") || name.contains("-.") || name.contains(".-") {
        return Err(invalid(
            "cannot contain consecutive dots or dot-hyphen combinations",
        ));
    }

    if is_ipv4_like(name) {
        return Err(invalid("must not be formatted like an IP address"));
    }

    Ok(())
}

/// Check if a string matches IPv4-like dotted decimal form.
fn is_ipv4_like(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    parts.len() == 4
        && parts.iter().all(|segment| {
            !segment.is_empty()
                && segment.len() <= 3
                && segment.chars().all(|c| c.is_ascii_digit())
                && segment.parse::<u8>().is_ok()
        })
}
