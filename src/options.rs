use std::{fmt, sync::Arc, time::Duration};

use serde::Deserialize;

const DEFAULT_TIMEOUT_SECS: f64 = 30.0;
const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_BACKOFF_BASE_SECS: f64 = 0.5;

/// Delay schedule between a failed attempt and the next retry.
///
/// Wraps a pure function from the 1-based number of the attempt that just
/// failed to a delay in seconds.
#[derive(Clone)]
pub struct Backoff(Arc<dyn Fn(u32) -> f64 + Send + Sync>);

impl Backoff {
    /// `base_secs * 2^(attempt - 1)`: with a base of 0.5 this waits
    /// 0.5s, 1s, 2s, ...
    pub fn exponential(base_secs: f64) -> Self {
        Self::from_fn(move |attempt| {
            let exp = attempt.saturating_sub(1).min(62) as i32;
            base_secs * 2f64.powi(exp)
        })
    }

    pub fn constant(secs: f64) -> Self {
        Self::from_fn(move |_| secs)
    }

    /// Retries immediately.
    pub fn none() -> Self {
        Self::constant(0.0)
    }

    pub fn from_fn(f: impl Fn(u32) -> f64 + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Raw value of the schedule, in seconds, before clamping.
    pub fn seconds(&self, attempt: u32) -> f64 {
        (self.0)(attempt)
    }

    /// Delay after `attempt` failed. Negative and NaN values clamp to zero.
    pub fn delay(&self, attempt: u32) -> Duration {
        let secs = self.seconds(attempt);
        if secs.is_nan() || secs <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::exponential(DEFAULT_BACKOFF_BASE_SECS)
    }
}

impl fmt::Debug for Backoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Backoff").field(&"<fn>").finish()
    }
}

/// Timeout and retry behavior shared by every call made through one client.
#[derive(Clone, Debug)]
pub struct RetryConfiguration {
    /// Per-attempt timeout unless the request overrides it.
    pub default_timeout: Duration,
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl Default for RetryConfiguration {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: Backoff::default(),
        }
    }
}

impl RetryConfiguration {
    /// Default timeout and budget with retries issued back to back.
    pub fn no_delay() -> Self {
        Self::default().with_backoff(Backoff::none())
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Plain-data form of [`RetryConfiguration`], for config files and the
/// environment.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    pub timeout_secs: f64,
    pub max_retries: u32,
    pub backoff_base_secs: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base_secs: DEFAULT_BACKOFF_BASE_SECS,
        }
    }
}

impl RetrySettings {
    /// Parses settings from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> std::result::Result<Self, String> {
        serde_json::from_str(json).map_err(|err| format!("invalid retry settings: {err}"))
    }

    /// Reads settings from environment variables.
    ///
    /// Reads:
    /// - `RESILIENT_HTTP_TIMEOUT_SECS` — default per-attempt timeout in seconds
    /// - `RESILIENT_HTTP_MAX_RETRIES` — retries after the first attempt
    /// - `RESILIENT_HTTP_BACKOFF_BASE_SECS` — first backoff delay in seconds
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> std::result::Result<Self, String> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> std::result::Result<Self, String> {
        let mut settings = Self::default();
        if let Some(raw) = lookup("RESILIENT_HTTP_TIMEOUT_SECS") {
            settings.timeout_secs = parse_var("RESILIENT_HTTP_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = lookup("RESILIENT_HTTP_MAX_RETRIES") {
            settings.max_retries = parse_var("RESILIENT_HTTP_MAX_RETRIES", &raw)?;
        }
        if let Some(raw) = lookup("RESILIENT_HTTP_BACKOFF_BASE_SECS") {
            settings.backoff_base_secs = parse_var("RESILIENT_HTTP_BACKOFF_BASE_SECS", &raw)?;
        }
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if !(self.timeout_secs.is_finite() && self.timeout_secs > 0.0) {
            return Err(format!(
                "timeout must be a positive number of seconds, got {}",
                self.timeout_secs
            ));
        }
        if !(self.backoff_base_secs.is_finite() && self.backoff_base_secs >= 0.0) {
            return Err(format!(
                "backoff base must be a non-negative number of seconds, got {}",
                self.backoff_base_secs
            ));
        }
        Ok(())
    }
}

impl TryFrom<RetrySettings> for RetryConfiguration {
    type Error = String;

    fn try_from(settings: RetrySettings) -> std::result::Result<Self, Self::Error> {
        settings.validate()?;
        Ok(Self {
            default_timeout: Duration::from_secs_f64(settings.timeout_secs),
            max_retries: settings.max_retries,
            backoff: Backoff::exponential(settings.backoff_base_secs),
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, raw: &str) -> std::result::Result<T, String> {
    raw.trim()
        .parse()
        .map_err(|_| format!("{name} is set but not a valid number: '{raw}'"))
}
