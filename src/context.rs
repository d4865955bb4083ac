use crate::executor::{PoolConfig, WorkerPool};
use crate::http::{HttpClient, HttpConfig};
use crate::lifecycle::{AppInfo, Lifecycle};
use crate::trust::{TrustConfig, TrustMode};
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;

/// Everything an application shares between its components: the HTTP
/// client, its TLS trust settings, the lifecycle registry and the worker
/// pool.
///
/// Build one at startup and pass it (or an `Arc` of it) to whatever needs
/// it.
///
/// ```
/// use android_app_utils::AppContext;
///
/// let context = AppContext::builder()
///     .package_name("com.example.app")
///     .api_level(28)
///     .build();
/// assert_eq!(context.info().api_level, 28);
/// assert_eq!(context.trust().api_level(), Some(28));
/// ```
pub struct AppContext {
    info: AppInfo,
    trust: Arc<TrustConfig>,
    http: HttpClient,
    lifecycle: Lifecycle,
    pool_config: PoolConfig,
    worker_pool: OnceCell<WorkerPool>,
}

impl AppContext {
    /// A builder with every setting at its default.
    pub fn builder() -> AppContextBuilder {
        AppContextBuilder::default()
    }

    /// Package name and API level of the application.
    pub fn info(&self) -> &AppInfo {
        &self.info
    }

    /// The shared HTTP client.
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// TLS trust settings used by [`http`](AppContext::http).
    pub fn trust(&self) -> &Arc<TrustConfig> {
        &self.trust
    }

    /// The lifecycle listener registry.
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// The shared worker pool, started on first use.
    pub fn worker_pool(&self) -> &WorkerPool {
        self.worker_pool
            .get_or_init(|| WorkerPool::with_config(self.pool_config))
    }
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext")
            .field("info", &self.info)
            .field("trust", &self.trust)
            .field("http", &self.http)
            .field("lifecycle", &self.lifecycle)
            .field("worker_pool", &self.worker_pool.get())
            .finish()
    }
}

/// Builder for [`AppContext`]. Every setting has a default.
#[derive(Debug, Clone, Default)]
pub struct AppContextBuilder {
    package_name: String,
    api_level: Option<u32>,
    trust: TrustMode,
    http: HttpConfig,
    pool: PoolConfig,
}

impl AppContextBuilder {
    /// The application package name.
    pub fn package_name(mut self, package_name: impl Into<String>) -> Self {
        self.package_name = package_name.into();
        self
    }

    /// The Android API level the application runs on. It picks the TLS
    /// protocol versions offered to servers; without it every version is
    /// offered and [`AppInfo::api_level`] is `0`.
    pub fn api_level(mut self, api_level: u32) -> Self {
        self.api_level = Some(api_level);
        self
    }

    /// How servers are verified. Defaults to trusting every server.
    pub fn trust(mut self, trust: TrustMode) -> Self {
        self.trust = trust;
        self
    }

    /// Timeouts, redirects and user agent of the HTTP client.
    pub fn http(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }

    /// Sizing of the worker pool.
    pub fn pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    /// Creates the context. The worker pool starts on first use.
    pub fn build(self) -> AppContext {
        log::debug!(
            "creating context for {:?} (api level {:?})",
            self.package_name,
            self.api_level
        );
        let mut trust = TrustConfig::new(self.trust);
        if let Some(api_level) = self.api_level {
            trust = trust.with_api_level(api_level);
        }
        let trust = Arc::new(trust);

        AppContext {
            info: AppInfo {
                package_name: self.package_name,
                api_level: self.api_level.unwrap_or_default(),
            },
            http: HttpClient::new(self.http, Arc::clone(&trust)),
            trust,
            lifecycle: Lifecycle::new(),
            pool_config: self.pool,
            worker_pool: OnceCell::new(),
        }
    }
}
