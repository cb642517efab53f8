//! In-process dispatch of synthetic HTTP requests.

use std::any::Any;
use std::fmt;
use std::io;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode, Uri};
use tower::ServiceExt as _;

use crate::error::{ScenarioError, ScenarioResult};

/// Builds the application router on demand.
pub type ApplicationFactory = Arc<dyn Fn() -> Router + Send + Sync>;

/// Signals that the client went away mid-request.
///
/// Handlers call this to stop writing a response. The simulator treats the
/// request as completed with nothing further written instead of failing the
/// scenario. The signal is a panic carrying an [`io::Error`] of kind
/// [`io::ErrorKind::ConnectionAborted`], so handlers can raise it without
/// depending on this crate.
pub fn abort_request() -> ! {
    std::panic::panic_any(io::Error::new(
        io::ErrorKind::ConnectionAborted,
        "request aborted",
    ))
}

/// The request half of an exchange, as dispatched.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Request method.
    pub method: Method,
    /// Request target.
    pub uri: Uri,
    /// Headers after merging scenario defaults with per-call headers.
    pub headers: HeaderMap,
    /// Request body.
    pub body: String,
}

/// Status, headers and body written by the handler.
#[derive(Debug, Clone, Default)]
pub struct CapturedResponse {
    pub(crate) status: StatusCode,
    pub(crate) headers: HeaderMap,
    pub(crate) body: String,
}

impl CapturedResponse {
    /// Returns the numeric status code.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status.as_u16()
    }

    /// Returns the first value of `name`, if the header is present.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
    }

    /// Returns the captured headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the captured body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }
}

/// One request paired with the response it produced.
#[derive(Debug, Clone)]
pub struct Exchange {
    /// The dispatched request.
    pub request: RecordedRequest,
    /// The captured response.
    pub response: CapturedResponse,
}

/// Dispatches synthetic requests to a handler and keeps the latest exchange.
#[derive(Default)]
pub struct HttpSimulator {
    handler: Option<Router>,
    application: Option<ApplicationFactory>,
    default_headers: HeaderMap,
    exchange: Option<Exchange>,
}

impl fmt::Debug for HttpSimulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpSimulator")
            .field("handler", &self.handler.is_some())
            .field("application", &self.application.as_ref().map(|_| "<factory>"))
            .field("default_headers", &self.default_headers)
            .field("exchange", &self.exchange)
            .finish()
    }
}

impl HttpSimulator {
    /// Creates a simulator with no handler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Injects a handler that takes precedence over the application router.
    pub fn set_handler(&mut self, handler: Router) {
        self.handler = Some(handler);
    }

    /// Registers the factory used when no handler was injected.
    pub fn set_application(&mut self, factory: ApplicationFactory) {
        self.application = Some(factory);
    }

    /// Records a header applied to every request of the scenario.
    ///
    /// Per-call headers with the same name take precedence.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::InvalidRequest`] when the name or value is
    /// not valid header text.
    pub fn set_default_header(&mut self, name: &str, value: &str) -> ScenarioResult<()> {
        let (name, value) = header_pair(name, value)?;
        self.default_headers.insert(name, value);
        Ok(())
    }

    /// Forgets the current exchange and all default headers.
    pub fn reset(&mut self) {
        self.default_headers.clear();
        self.exchange = None;
    }

    /// Returns the latest exchange, if a request was made.
    #[must_use]
    pub const fn exchange(&self) -> Option<&Exchange> {
        self.exchange.as_ref()
    }

    /// Returns the latest captured response.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::NoRequest`] before the first dispatch.
    pub fn response(&self) -> ScenarioResult<&CapturedResponse> {
        self.exchange
            .as_ref()
            .map(|exchange| &exchange.response)
            .ok_or(ScenarioError::NoRequest)
    }

    /// Dispatches a request and captures the response.
    ///
    /// The previous exchange is discarded first. The handler runs to
    /// completion on a private current-thread runtime, so this must not be
    /// called from inside another async runtime.
    ///
    /// # Errors
    ///
    /// - [`ScenarioError::InvalidRequest`] for an unusable method, path or
    ///   header.
    /// - [`ScenarioError::NoHandler`] when no handler is available.
    /// - [`ScenarioError::HandlerPanicked`] when the handler panics with
    ///   anything but the abort signal.
    /// - [`ScenarioError::Runtime`] when the runtime cannot start.
    pub fn dispatch(
        &mut self,
        method: &str,
        path: &str,
        headers: &[(String, String)],
        body: Option<&str>,
    ) -> ScenarioResult<&CapturedResponse> {
        self.exchange = None;
        let recorded = self.build_request(method, path, headers, body)?;
        let handler = self.resolve_handler()?;
        let request = to_http_request(&recorded);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ScenarioError::Runtime)?;
        let joined = runtime.block_on(async move {
            tokio::spawn(async move {
                let response = match handler.oneshot(request).await {
                    Ok(response) => response,
                    Err(never) => match never {},
                };
                let status = response.status();
                let headers = response.headers().clone();
                let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
                Ok::<_, axum::Error>(CapturedResponse {
                    status,
                    headers,
                    body: String::from_utf8_lossy(&bytes).into_owned(),
                })
            })
            .await
        });

        let response = match joined {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                return Err(ScenarioError::HandlerPanicked {
                    message: format!("failed to read response body: {err}"),
                });
            }
            Err(join_error) => match join_error.try_into_panic() {
                Ok(payload) => match panic_message(payload.as_ref()) {
                    None => {
                        tracing::debug!(path, "handler aborted the request");
                        CapturedResponse::default()
                    }
                    Some(message) => return Err(ScenarioError::HandlerPanicked { message }),
                },
                Err(cancelled) => {
                    return Err(ScenarioError::HandlerPanicked {
                        message: cancelled.to_string(),
                    });
                }
            },
        };

        tracing::debug!(
            method = %recorded.method,
            path,
            status = response.status(),
            "dispatched request"
        );
        let exchange = self.exchange.insert(Exchange {
            request: recorded,
            response,
        });
        Ok(&exchange.response)
    }

    fn resolve_handler(&self) -> ScenarioResult<Router> {
        if let Some(handler) = &self.handler {
            return Ok(handler.clone());
        }
        self.application
            .as_ref()
            .map(|factory| factory())
            .ok_or(ScenarioError::NoHandler)
    }

    fn build_request(
        &self,
        method: &str,
        path: &str,
        headers: &[(String, String)],
        body: Option<&str>,
    ) -> ScenarioResult<RecordedRequest> {
        let parsed_method =
            Method::from_bytes(method.as_bytes()).map_err(|err| invalid(method, &err))?;
        let uri = path.parse::<Uri>().map_err(|err| invalid(path, &err))?;
        let mut merged = self.default_headers.clone();
        for (name, value) in headers {
            let (header_name, header_value) = header_pair(name, value)?;
            merged.insert(header_name, header_value);
        }
        Ok(RecordedRequest {
            method: parsed_method,
            uri,
            headers: merged,
            body: body.unwrap_or_default().to_owned(),
        })
    }
}

fn to_http_request(recorded: &RecordedRequest) -> Request<Body> {
    let mut request = Request::new(Body::from(recorded.body.clone()));
    *request.method_mut() = recorded.method.clone();
    *request.uri_mut() = recorded.uri.clone();
    *request.headers_mut() = recorded.headers.clone();
    request
}

fn header_pair(name: &str, value: &str) -> ScenarioResult<(HeaderName, HeaderValue)> {
    let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|err| invalid(name, &err))?;
    let header_value = HeaderValue::from_str(value).map_err(|err| invalid(value, &err))?;
    Ok((header_name, header_value))
}

fn invalid(input: &str, err: &dyn std::error::Error) -> ScenarioError {
    ScenarioError::InvalidRequest {
        reason: format!("{input:?}: {err}"),
    }
}

/// Renders a panic payload, or `None` for the abort signal.
fn panic_message(payload: &(dyn Any + Send)) -> Option<String> {
    if let Some(err) = payload.downcast_ref::<io::Error>() {
        if err.kind() == io::ErrorKind::ConnectionAborted {
            return None;
        }
        return Some(err.to_string());
    }
    if let Some(message) = payload.downcast_ref::<&str>() {
        return Some((*message).to_owned());
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return Some(message.clone());
    }
    Some("non-string panic payload".to_owned())
}
