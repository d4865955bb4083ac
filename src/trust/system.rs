use super::log_server_cert;
use once_cell::sync::OnceCell;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::pki_types;
use rustls::{
    crypto::CryptoProvider, DigitallySignedStruct, Error as TlsError, OtherError, SignatureScheme,
};
use std::sync::{Arc, Mutex};

/// A TLS certificate verifier backed by WebPKI, trusting the system's root
/// store, the bundled Mozilla roots and any extra roots handed to it.
#[derive(Debug)]
pub struct SystemVerifier {
    // Roots are only loaded on the first handshake that needs them.
    inner: OnceCell<Arc<WebPkiServerVerifier>>,

    // Extra trust anchors on top of the system and bundled roots. Drained into
    // the root store when `inner` is initialized.
    extra_roots: Mutex<Vec<pki_types::CertificateDer<'static>>>,

    crypto_provider: Arc<CryptoProvider>,
}

impl SystemVerifier {
    /// Creates a verifier using the platform and bundled root certificates.
    pub fn new(crypto_provider: Arc<CryptoProvider>) -> Self {
        Self::new_with_extra_roots(Vec::new(), crypto_provider)
    }

    /// Creates a verifier that additionally trusts `roots`.
    pub fn new_with_extra_roots(
        roots: impl IntoIterator<Item = pki_types::CertificateDer<'static>>,
        crypto_provider: Arc<CryptoProvider>,
    ) -> Self {
        Self {
            inner: OnceCell::new(),
            extra_roots: Mutex::new(roots.into_iter().collect()),
            crypto_provider,
        }
    }

    fn get_or_init_verifier(&self) -> Result<&Arc<WebPkiServerVerifier>, TlsError> {
        self.inner.get_or_try_init(|| self.init_verifier())
    }

    fn init_verifier(&self) -> Result<Arc<WebPkiServerVerifier>, TlsError> {
        let mut root_store = rustls::RootCertStore::empty();

        {
            let mut extra_roots = self
                .extra_roots
                .lock()
                .map_err(|_| TlsError::General("extra root list was poisoned".to_owned()))?;
            if !extra_roots.is_empty() {
                let (added, ignored) = root_store.add_parsable_certificates(extra_roots.drain(..));
                if ignored != 0 {
                    log::warn!("{ignored} extra CA certificates could not be parsed");
                }
                log::debug!("Loaded {added} extra CA certificates");
            }
        }

        #[cfg(not(target_os = "android"))]
        {
            let result = rustls_native_certs::load_native_certs();
            let (added, ignored) = root_store.add_parsable_certificates(result.certs);
            if ignored != 0 {
                log::warn!("Some CA root certificates were ignored due to errors");
            }

            for error in result.errors {
                log::warn!("Error loading CA root certificate: {error}");
            }

            log::debug!("Loaded {added} CA certificates from the system");
        }

        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        WebPkiServerVerifier::builder_with_provider(
            root_store.into(),
            Arc::clone(&self.crypto_provider),
        )
        .build()
        .map_err(|e| TlsError::Other(OtherError(Arc::new(e))))
    }
}

impl ServerCertVerifier for SystemVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &pki_types::CertificateDer<'_>,
        intermediates: &[pki_types::CertificateDer<'_>],
        server_name: &pki_types::ServerName<'_>,
        ocsp_response: &[u8],
        now: pki_types::UnixTime,
    ) -> Result<ServerCertVerified, TlsError> {
        log_server_cert(end_entity);

        self.get_or_init_verifier()?
            .verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)
            .map_err(|e| {
                log::error!("failed to verify TLS certificate: {}", e);
                e
            })
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &pki_types::CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        self.get_or_init_verifier()?
            .verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &pki_types::CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        self.get_or_init_verifier()?
            .verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        // Same provider as the wrapped WebPKI verifier, so the same schemes.
        self.crypto_provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}
