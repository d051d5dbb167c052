//! In-memory client driving a [`DispatchPipeline`].

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderName, HeaderValue, Method};
use serde::Serialize;
use tortilla::DispatchPipeline;

use crate::error::TestError;
use crate::response::TestResponse;

/// Sends requests straight into a built pipeline, without a socket.
///
/// # Example
///
/// ```rust
/// use tortilla::{view, App, Response};
/// use tortilla_test::TestClient;
///
/// # tokio_test::block_on(async {
/// let mut app = App::new();
/// app.route("/ping", view("ping", |_req, mut res: Response| async move {
///     res.set_text("pong");
///     Ok(res)
/// })).unwrap();
///
/// let client = TestClient::new(app.build().unwrap());
/// let res = client.get("/ping").send().await;
/// assert_eq!(res.status(), 200);
/// assert_eq!(res.text().unwrap(), "pong");
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct TestClient {
    pipeline: DispatchPipeline,
    default_headers: Vec<(String, String)>,
}

impl TestClient {
    /// Wraps `pipeline`.
    #[must_use]
    pub fn new(pipeline: DispatchPipeline) -> Self {
        Self {
            pipeline,
            default_headers: Vec::new(),
        }
    }

    /// Adds a header sent with every request.
    #[must_use]
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// The wrapped pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &DispatchPipeline {
        &self.pipeline
    }

    /// Starts a GET request.
    pub fn get(&self, uri: &str) -> TestRequest<'_> {
        self.request(Method::GET, uri)
    }

    /// Starts a POST request.
    pub fn post(&self, uri: &str) -> TestRequest<'_> {
        self.request(Method::POST, uri)
    }

    /// Starts a PUT request.
    pub fn put(&self, uri: &str) -> TestRequest<'_> {
        self.request(Method::PUT, uri)
    }

    /// Starts a PATCH request.
    pub fn patch(&self, uri: &str) -> TestRequest<'_> {
        self.request(Method::PATCH, uri)
    }

    /// Starts a DELETE request.
    pub fn delete(&self, uri: &str) -> TestRequest<'_> {
        self.request(Method::DELETE, uri)
    }

    /// Starts an OPTIONS request.
    pub fn options(&self, uri: &str) -> TestRequest<'_> {
        self.request(Method::OPTIONS, uri)
    }

    /// Starts a HEAD request.
    pub fn head(&self, uri: &str) -> TestRequest<'_> {
        self.request(Method::HEAD, uri)
    }

    /// Starts a request with any method.
    pub fn request(&self, method: Method, uri: &str) -> TestRequest<'_> {
        let mut request = TestRequest {
            client: self,
            builder: http::Request::builder().method(method).uri(uri),
            body: Bytes::new(),
            error: None,
        };
        for (name, value) in &self.default_headers {
            request = request.header(name, value);
        }
        request
    }
}

/// A request being assembled for a [`TestClient`].
///
/// Builder errors are kept until the request is sent.
#[must_use]
pub struct TestRequest<'a> {
    client: &'a TestClient,
    builder: http::request::Builder,
    body: Bytes,
    error: Option<TestError>,
}

impl TestRequest<'_> {
    /// Sets a header, replacing any earlier value.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        let parsed = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TestError::InvalidHeader(format!("{name}: {e}")))
            .and_then(|name| {
                HeaderValue::from_str(value)
                    .map(|value| (name, value))
                    .map_err(|e| TestError::InvalidHeader(format!("{value:?}: {e}")))
            });

        match parsed {
            Ok((name, value)) => {
                if let Some(headers) = self.builder.headers_mut() {
                    headers.insert(name, value);
                }
            }
            Err(e) => self.error = self.error.or(Some(e)),
        }
        self
    }

    /// Sets the raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a JSON body and its content type.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.body = Bytes::from(bytes),
            Err(e) => self.error = self.error.or(Some(e.into())),
        }
        self.header(CONTENT_TYPE.as_str(), "application/json")
    }

    /// Dispatches the request.
    ///
    /// # Panics
    ///
    /// Panics if the request could not be built; see [`try_send`](Self::try_send).
    pub async fn send(self) -> TestResponse {
        match self.try_send().await {
            Ok(response) => response,
            Err(e) => panic!("test request failed: {e}"),
        }
    }

    /// Dispatches the request, returning build and read errors.
    pub async fn try_send(self) -> Result<TestResponse, TestError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let request = self.builder.body(self.body)?;
        let response = self.client.pipeline.handle(request).await;
        TestResponse::from_http(response).await
    }
}
