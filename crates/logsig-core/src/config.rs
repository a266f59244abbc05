//! Process-wide settings, threaded through session construction rather
//! than read from globals.
//!
//! The underlying format keeps these as mutable C globals
//! (`rsksi_read_puburl`, `rsksi_read_showVerified`, ...). This crate
//! keeps the same fields but as constructor-injected data, the way the
//! teacher threads `base_dir` into `HighWatermark::new` rather than
//! reading an environment variable inside the watermark cache itself.

/// Settings a [`crate::verifier::Verifier`] session is constructed with.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Publication service URL, consulted when extending a signature.
    pub publication_url: Option<String>,
    /// Signature-extending service URL.
    pub extender_url: Option<String>,
    /// User id presented to the extending service, if it requires authentication.
    pub user_id: Option<String>,
    /// User key presented to the extending service, if it requires authentication.
    pub user_key: Option<String>,
    /// Verbosity of diagnostic logging, independent of the `log` crate's own level filter.
    pub debug_level: u8,
    /// Whether successfully verified blocks should be reported, not just failures.
    pub show_verified: bool,
}

impl Config {
    /// Start building a `Config` with every field at its default.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Compatibility shim for callers (e.g. a CLI) that still want to
    /// assemble a `Config` from process-wide environment variables,
    /// mirroring the field names of the legacy C globals. This is the
    /// one place in the crate that consults the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            publication_url: std::env::var("LOGSIG_PUBLICATION_URL").ok(),
            extender_url: std::env::var("LOGSIG_EXTENDER_URL").ok(),
            user_id: std::env::var("LOGSIG_USER_ID").ok(),
            user_key: std::env::var("LOGSIG_USER_KEY").ok(),
            debug_level: std::env::var("LOGSIG_DEBUG_LEVEL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            show_verified: std::env::var("LOGSIG_SHOW_VERIFIED").is_ok(),
        }
    }
}

/// Builder for [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the publication service URL.
    #[must_use]
    pub fn publication_url(mut self, url: impl Into<String>) -> Self {
        self.config.publication_url = Some(url.into());
        self
    }

    /// Set the extending service URL.
    #[must_use]
    pub fn extender_url(mut self, url: impl Into<String>) -> Self {
        self.config.extender_url = Some(url.into());
        self
    }

    /// Set the extending service credentials.
    #[must_use]
    pub fn credentials(mut self, user_id: impl Into<String>, user_key: impl Into<String>) -> Self {
        self.config.user_id = Some(user_id.into());
        self.config.user_key = Some(user_key.into());
        self
    }

    /// Set the diagnostic verbosity level.
    #[must_use]
    pub fn debug_level(mut self, level: u8) -> Self {
        self.config.debug_level = level;
        self
    }

    /// Set whether successfully verified blocks are reported.
    #[must_use]
    pub fn show_verified(mut self, show: bool) -> Self {
        self.config.show_verified = show;
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> Config {
        self.config
    }
}
