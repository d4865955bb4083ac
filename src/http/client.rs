use super::config::{HttpConfig, RedirectPolicy};
use super::connection::{self, surface_tls};
use super::request::Request;
use super::response::{Response, ResponseBody};
use super::wire;
use crate::error::Error;
use crate::executor::Executor;
use crate::trust::TrustConfig;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::io::{BufReader, BufWriter, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Receives the outcome of a call: either a `200` response or the error
/// that ended the call.
///
/// Closures taking a `Result<Response, Error>` implement this trait.
pub trait ResponseCallback {
    /// Called with a successful response.
    fn on_response(&mut self, response: Response);
    /// Called with the error that ended the call.
    fn on_failure(&mut self, error: Error);
}

impl<F> ResponseCallback for F
where
    F: FnMut(Result<Response, Error>),
{
    fn on_response(&mut self, response: Response) {
        self(Ok(response))
    }

    fn on_failure(&mut self, error: Error) {
        self(Err(error))
    }
}

/// A blocking HTTP/1.1 client.
///
/// Every call opens a fresh connection and closes it once the response is
/// dropped. The client is cheap to clone and can be shared across threads.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Arc<ClientInner>,
}

#[derive(Debug)]
struct ClientInner {
    config: HttpConfig,
    trust: Arc<TrustConfig>,
}

impl HttpClient {
    /// A client that connects with `config` and verifies servers per `trust`.
    pub fn new(config: HttpConfig, trust: Arc<TrustConfig>) -> Self {
        Self {
            inner: Arc::new(ClientInner { config, trust }),
        }
    }

    /// Settings used for every call.
    pub fn config(&self) -> &HttpConfig {
        &self.inner.config
    }

    /// TLS trust settings used for `https` calls.
    pub fn trust(&self) -> &Arc<TrustConfig> {
        &self.inner.trust
    }

    /// Sends `request` on the calling thread and returns the `200` response.
    ///
    /// Any other outcome, including a non-`200` status, is an `Err`.
    pub fn execute(&self, request: Request) -> Result<Response, Error> {
        self.execute_cancellable(request, &AtomicBool::new(false))
    }

    /// Sends `request` on the calling thread and reports the outcome to
    /// `callback`. The connection is released once the callback returns.
    pub fn call(&self, request: Request, callback: &mut impl ResponseCallback) {
        match self.execute(request) {
            Ok(response) => callback.on_response(response),
            Err(error) => callback.on_failure(error),
        }
    }

    /// Runs `request` on `executor`. The returned handle waits for, polls or
    /// cancels the call.
    pub fn enqueue(&self, request: Request, executor: &dyn Executor) -> Result<PendingCall, Error> {
        let (tx, rx) = channel::bounded(1);
        let cancelled = Arc::new(AtomicBool::new(false));

        let client = self.clone();
        let flag = Arc::clone(&cancelled);
        executor.execute(Box::new(move || {
            let result = client.execute_cancellable(request, &flag);
            // Nobody is waiting anymore, the response is dropped with the message.
            let _ = tx.send(result);
        }))?;

        Ok(PendingCall {
            result: rx,
            cancelled,
        })
    }

    /// Runs `request` on `executor` and reports the outcome to `callback`
    /// from the executor's thread.
    pub fn enqueue_callback<C>(
        &self,
        request: Request,
        executor: &dyn Executor,
        mut callback: C,
    ) -> Result<(), Error>
    where
        C: ResponseCallback + Send + 'static,
    {
        let client = self.clone();
        executor.execute(Box::new(move || client.call(request, &mut callback)))?;
        Ok(())
    }

    fn execute_cancellable(
        &self,
        mut request: Request,
        cancelled: &AtomicBool,
    ) -> Result<Response, Error> {
        let policy = self.inner.config.redirect_policy();
        let mut redirects = 0;

        loop {
            check_cancelled(cancelled)?;
            if !request.body().map_or(true, |body| body.is_replayable()) {
                return Err(Error::BodyNotReplayable);
            }

            let response = self.send_once(&mut request).map_err(surface_tls)?;
            log::debug!(
                "{} {} -> {}",
                request.method().as_str(),
                request.url(),
                response.status()
            );

            match response.status() {
                200 => {
                    check_cancelled(cancelled)?;
                    return Ok(response);
                }
                301 | 302 => match policy {
                    RedirectPolicy::None => return Err(response.into_status_error()),
                    RedirectPolicy::Follow { max } => {
                        if redirects >= max {
                            return Err(Error::TooManyRedirects(max));
                        }
                        let location = response
                            .headers()
                            .get("Location")
                            .ok_or(Error::MissingLocation)?;
                        let target = request.url().join(location)?;
                        response.close();
                        follow(&mut request, target)?;
                    }
                    RedirectPolicy::RetryOriginal { max } => {
                        if redirects >= max {
                            return Err(Error::TooManyRedirects(max));
                        }
                        log::debug!(
                            "retrying {} unchanged, ignoring Location {:?}",
                            request.url(),
                            response.headers().get("Location")
                        );
                        response.close();
                    }
                },
                _ => return Err(response.into_status_error()),
            }
            redirects += 1;
        }
    }

    fn send_once(&self, request: &mut Request) -> Result<Response, Error> {
        let config = &self.inner.config;
        let transport = connection::open(request.url(), config, &self.inner.trust)?;

        let mut writer = BufWriter::new(transport);
        wire::write_head(&mut writer, request, config)?;
        if let Some(body) = request.body_mut() {
            body.write_to(&mut writer)?;
        }
        writer.flush()?;
        let transport = writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;

        let mut reader = BufReader::new(transport);
        let head = wire::read_head(&mut reader)?;
        let framing = wire::framing(head.status, &head.headers)?;
        Ok(Response::new(
            head,
            request.url().clone(),
            ResponseBody::new(framing, Box::new(reader)),
        ))
    }
}

// Turns `request` into the follow-up for a redirect to `target`: a body-less
// GET, without credentials when the host changes.
fn follow(request: &mut Request, target: url::Url) -> Result<(), Error> {
    match target.scheme() {
        "http" | "https" => {}
        other => return Err(Error::UnsupportedScheme(other.to_owned())),
    }
    log::debug!("following redirect from {} to {target}", request.url());

    request.take_body();
    let headers = request.headers_mut();
    headers.remove("Content-Type");
    headers.remove("Content-Length");
    headers.remove("Transfer-Encoding");
    if request.url().host_str() != target.host_str() {
        request.headers_mut().remove("Authorization");
    }
    request.headers_mut().remove("Host");
    request.set_url(target);
    Ok(())
}

fn check_cancelled(cancelled: &AtomicBool) -> Result<(), Error> {
    if cancelled.load(Ordering::Acquire) {
        Err(Error::Cancelled)
    } else {
        Ok(())
    }
}

/// Handle on a call running on an executor.
#[derive(Debug)]
pub struct PendingCall {
    result: Receiver<Result<Response, Error>>,
    cancelled: Arc<AtomicBool>,
}

impl PendingCall {
    /// Blocks until the call finishes.
    pub fn wait(self) -> Result<Response, Error> {
        self.result.recv().unwrap_or(Err(Error::Cancelled))
    }

    /// Blocks for at most `timeout`. `None` means the call is still running.
    ///
    /// The result is handed out once; later calls report [`Error::Cancelled`].
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<Response, Error>> {
        match self.result.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(Error::Cancelled)),
        }
    }

    /// Returns the result if the call has finished.
    pub fn try_result(&self) -> Option<Result<Response, Error>> {
        match self.result.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(Error::Cancelled)),
        }
    }

    /// Asks the call to stop. A call that has not connected yet never will;
    /// one in flight stops before the next redirect or before delivering its
    /// response. Either way the result becomes [`Error::Cancelled`].
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether [`cancel`](PendingCall::cancel) was called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
