mod server;

mod executor;

use crate::http::{HttpClient, HttpConfig};
use crate::trust::{TrustConfig, TrustMode};
use rcgen::{BasicConstraints, CertificateParams, IsCa, KeyPair};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer, UnixTime};
use std::sync::Arc;
use std::time::Duration;

pub(crate) fn provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

/// A client that trusts every certificate and gives up quickly.
pub(crate) fn test_client(config: HttpConfig) -> HttpClient {
    test_client_with(config, TrustMode::TrustAll)
}

pub(crate) fn test_client_with(config: HttpConfig, mode: TrustMode) -> HttpClient {
    let config = config
        .with_connect_timeout(Duration::from_secs(5))
        .with_read_timeout(Duration::from_secs(5));
    let trust = TrustConfig::new(mode).with_provider(provider());
    HttpClient::new(config, Arc::new(trust))
}

pub(crate) fn verification_time() -> UnixTime {
    // Saturday, April 27, 2024 18:28:07 UTC
    UnixTime::since_unix_epoch(Duration::from_secs(1_714_242_489))
}

/// A server certificate, the key for it and the root it chains to.
pub(crate) struct TestCert {
    pub(crate) root: CertificateDer<'static>,
    pub(crate) chain: Vec<CertificateDer<'static>>,
    pub(crate) key: PrivateKeyDer<'static>,
}

impl TestCert {
    /// A self-signed certificate for `localhost` that expired in 2001.
    pub(crate) fn expired_self_signed() -> Self {
        let mut params = CertificateParams::new(vec!["localhost".to_owned()]).unwrap();
        params.not_before = rcgen::date_time_ymd(2000, 1, 1);
        params.not_after = rcgen::date_time_ymd(2001, 1, 1);
        let key_pair = KeyPair::generate().unwrap();
        let cert = params.self_signed(&key_pair).unwrap();

        Self {
            root: cert.der().clone(),
            chain: vec![cert.der().clone()],
            key: PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der())),
        }
    }

    /// A currently valid `localhost` certificate issued by a fresh test CA.
    pub(crate) fn issued_by_test_ca() -> Self {
        let mut ca_params = CertificateParams::new(Vec::<String>::new()).unwrap();
        ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        ca_params
            .distinguished_name
            .push(rcgen::DnType::CommonName, "android-app-utils test root");
        let ca_key = KeyPair::generate().unwrap();
        let ca = ca_params.self_signed(&ca_key).unwrap();

        let params = CertificateParams::new(vec!["localhost".to_owned()]).unwrap();
        let key_pair = KeyPair::generate().unwrap();
        let cert = params.signed_by(&key_pair, &ca, &ca_key).unwrap();

        Self {
            root: ca.der().clone(),
            chain: vec![cert.der().clone(), ca.der().clone()],
            key: PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der())),
        }
    }
}
