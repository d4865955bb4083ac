//! TLS trust configuration for the HTTP client.
//!
//! The default mode trusts every server: no chain validation, no hostname
//! check, no expiry check. [`TrustMode::Verify`] switches to WebPKI
//! validation against the system and bundled roots.

use rustls::client::WantsClientCert;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::CertificateDer;
use rustls::{ClientConfig, ConfigBuilder, SupportedProtocolVersion, WantsVerifier};
use once_cell::sync::OnceCell;
use std::sync::Arc;

mod system;
mod trust_all;

pub use system::SystemVerifier;
pub use trust_all::TrustAllVerifier;

/// First Android API level (Android 10) whose platform stack enables TLS 1.3.
pub const TLS13_MIN_API_LEVEL: u32 = 29;

/// How server certificates are checked.
#[derive(Debug, Clone, Default)]
pub enum TrustMode {
    /// Accept any certificate chain and any hostname.
    #[default]
    TrustAll,
    /// Validate against the platform roots, the bundled Mozilla roots and
    /// `extra_roots`.
    Verify {
        /// Additional trust anchors, DER encoded.
        extra_roots: Vec<CertificateDer<'static>>,
    },
}

/// The TLS trust settings of an application, and the client configuration
/// derived from them.
///
/// The [`ClientConfig`] is built on first use and then shared by every
/// connection made with this `TrustConfig`.
#[derive(Debug)]
pub struct TrustConfig {
    mode: TrustMode,
    api_level: Option<u32>,
    crypto_provider: OnceCell<Arc<CryptoProvider>>,
    client_config: OnceCell<Arc<ClientConfig>>,
}

impl TrustConfig {
    /// Trust settings for `mode`, with every protocol version enabled.
    pub fn new(mode: TrustMode) -> Self {
        Self {
            mode,
            api_level: None,
            crypto_provider: OnceCell::new(),
            client_config: OnceCell::new(),
        }
    }

    /// The permissive default: every certificate and hostname is accepted.
    pub fn trust_all() -> Self {
        Self::new(TrustMode::TrustAll)
    }

    /// Chainable setter for the Android API level the protocol allow-list is
    /// derived from. Without one, every version rustls supports is enabled.
    pub fn with_api_level(mut self, api_level: u32) -> Self {
        self.api_level = Some(api_level);
        self
    }

    /// Chainable setter to configure the [`CryptoProvider`].
    ///
    /// This will be used instead of the rustls process-default
    /// `CryptoProvider`, even if one has been installed.
    pub fn with_provider(mut self, crypto_provider: Arc<CryptoProvider>) -> Self {
        self.crypto_provider = crypto_provider.into();
        self
    }

    /// How server certificates are checked.
    pub fn mode(&self) -> &TrustMode {
        &self.mode
    }

    /// The API level the protocol versions are derived from.
    pub fn api_level(&self) -> Option<u32> {
        self.api_level
    }

    /// Returns the shared client configuration, building it on the first call.
    pub fn client_config(&self) -> Result<Arc<ClientConfig>, rustls::Error> {
        self.client_config
            .get_or_try_init(|| self.build_client_config().map(Arc::new))
            .cloned()
    }

    fn build_client_config(&self) -> Result<ClientConfig, rustls::Error> {
        let provider = Arc::clone(self.get_provider());
        let versions = protocol_versions(self.api_level);
        log::debug!(
            "building tls client config ({:?}, {} protocol versions)",
            self.mode,
            versions.len()
        );

        let builder =
            ClientConfig::builder_with_provider(provider.clone()).with_protocol_versions(versions)?;

        let config = match &self.mode {
            TrustMode::TrustAll => builder.with_trust_all(),
            TrustMode::Verify { extra_roots } => builder.dangerous().with_custom_certificate_verifier(
                Arc::new(SystemVerifier::new_with_extra_roots(
                    extra_roots.iter().cloned(),
                    provider,
                )),
            ),
        };

        Ok(config.with_no_client_auth())
    }

    fn get_provider(&self) -> &Arc<CryptoProvider> {
        self.crypto_provider.get_or_init(|| {
            CryptoProvider::get_default()
                .cloned()
                .unwrap_or_else(|| Arc::new(rustls::crypto::ring::default_provider()))
        })
    }
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self::trust_all()
    }
}

/// Protocol versions enabled for a given Android API level.
///
/// Android 10 and later negotiate TLS 1.3; older releases are limited to
/// TLS 1.2. rustls implements neither TLS 1.0 nor 1.1, so those never appear.
pub fn protocol_versions(api_level: Option<u32>) -> &'static [&'static SupportedProtocolVersion] {
    static MODERN: &[&SupportedProtocolVersion] = &[&rustls::version::TLS13, &rustls::version::TLS12];
    static LEGACY: &[&SupportedProtocolVersion] = &[&rustls::version::TLS12];

    match api_level {
        Some(level) if level < TLS13_MIN_API_LEVEL => LEGACY,
        _ => MODERN,
    }
}

/// Extension trait to configure a [`ClientConfig`] builder with the
/// trust-all verifier.
pub trait BuilderTrustExt {
    /// ```rust
    /// use android_app_utils::trust::BuilderTrustExt;
    /// use rustls::ClientConfig;
    ///
    /// let provider = std::sync::Arc::new(rustls::crypto::ring::default_provider());
    /// let config = ClientConfig::builder_with_provider(provider)
    ///     .with_safe_default_protocol_versions()
    ///     .unwrap()
    ///     .with_trust_all()
    ///     .with_no_client_auth();
    /// ```
    fn with_trust_all(self) -> ConfigBuilder<ClientConfig, WantsClientCert>;
}

impl BuilderTrustExt for ConfigBuilder<ClientConfig, WantsVerifier> {
    fn with_trust_all(self) -> ConfigBuilder<ClientConfig, WantsClientCert> {
        let provider = self.crypto_provider().clone();
        self.dangerous()
            .with_custom_certificate_verifier(Arc::new(TrustAllVerifier::new(provider)))
    }
}

// Log the certificate we are looking at so that a user's situation can be
// debugged after the fact.
fn log_server_cert(_end_entity: &CertificateDer<'_>) {
    #[cfg(feature = "cert-logging")]
    {
        use base64::Engine;
        log::debug!(
            "verifying certificate: {}",
            base64::engine::general_purpose::STANDARD.encode(_end_entity.as_ref())
        );
    }
}
