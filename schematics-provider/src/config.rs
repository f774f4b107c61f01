//! Provider configuration: credentials, region, endpoints and timeouts

use std::time::Duration;

use schematics_core::provider::{ProviderError, ProviderResult};
use schematics_core::wait::PollOptions;

pub const DEFAULT_REGION: &str = "us-south";

/// Network visibility of the service endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Public,
    Private,
    PublicAndPrivate,
}

impl Visibility {
    pub fn parse(s: &str) -> ProviderResult<Self> {
        match s {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            "public-and-private" => Ok(Visibility::PublicAndPrivate),
            other => Err(ProviderError::session(format!(
                "invalid visibility '{}', expected one of: public, private, public-and-private",
                other
            ))),
        }
    }

    fn uses_private_endpoint(self) -> bool {
        matches!(self, Visibility::Private | Visibility::PublicAndPrivate)
    }
}

/// Per-operation wait limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        let thirty_minutes = Duration::from_secs(30 * 60);
        Self {
            create: thirty_minutes,
            update: thirty_minutes,
            delete: thirty_minutes,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub region: String,
    pub visibility: Visibility,
    /// Replaces every computed endpoint when set
    pub endpoint: Option<String>,
    pub iam_access_token: Option<String>,
    pub iam_refresh_token: Option<String>,
    pub timeouts: Timeouts,
    pub poll_delay: Duration,
    pub poll_interval: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            visibility: Visibility::Public,
            endpoint: None,
            iam_access_token: None,
            iam_refresh_token: None,
            timeouts: Timeouts::default(),
            poll_delay: Duration::from_secs(10),
            poll_interval: Duration::from_secs(10),
        }
    }
}

impl ProviderConfig {
    /// Build a configuration from `IC_*` / `IBMCLOUD_*` environment variables
    pub fn from_env() -> ProviderResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ProviderResult<Self> {
        let first = |keys: &[&str]| {
            keys.iter()
                .find_map(|&k| lookup(k).filter(|v| !v.is_empty()))
        };

        let mut config = Self::default();
        if let Some(region) = first(&["IC_REGION", "IBMCLOUD_REGION"]) {
            config.region = region;
        }
        if let Some(visibility) = first(&["IC_VISIBILITY", "IBMCLOUD_VISIBILITY"]) {
            config.visibility = Visibility::parse(&visibility)?;
        }
        config.endpoint = first(&["IBMCLOUD_SCHEMATICS_API_ENDPOINT"]);
        config.iam_access_token = first(&["IC_IAM_TOKEN"]);
        config.iam_refresh_token = first(&["IC_IAM_REFRESH_TOKEN"]);
        Ok(config)
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_tokens(mut self, access: impl Into<String>, refresh: Option<String>) -> Self {
        self.iam_access_token = Some(access.into());
        self.iam_refresh_token = refresh;
        self
    }

    pub fn with_poll_timing(mut self, delay: Duration, interval: Duration) -> Self {
        self.poll_delay = delay;
        self.poll_interval = interval;
        self
    }

    /// Base URL for a call that targets `location`, or the configured region
    pub fn endpoint_for(&self, location: Option<&str>) -> String {
        if let Some(ref endpoint) = self.endpoint {
            return endpoint.trim_end_matches('/').to_string();
        }
        let region = location
            .filter(|l| !l.is_empty())
            .unwrap_or(&self.region);
        if self.visibility.uses_private_endpoint() {
            format!("https://private-{}.schematics.cloud.ibm.com", region)
        } else {
            format!("https://{}.schematics.cloud.ibm.com", region)
        }
    }

    /// Endpoint for an existing regional object
    ///
    /// Job, action and workspace ids carry their region as the first segment
    /// (`us-east.JOB.yourjob.a1b2c3`).
    pub fn endpoint_for_id(&self, id: &str) -> String {
        let region = id
            .split_once('.')
            .map(|(region, _)| region)
            .filter(|r| !r.is_empty());
        self.endpoint_for(region)
    }

    pub fn poll_options(&self, timeout: Duration) -> PollOptions {
        PollOptions::new(timeout)
            .with_delay(self.poll_delay)
            .with_interval(self.poll_interval)
    }
}
