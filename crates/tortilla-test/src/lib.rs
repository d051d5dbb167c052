//! # Tortilla Test
//!
//! In-memory testing for Tortilla applications. A [`TestClient`] feeds
//! requests straight into a built [`DispatchPipeline`](tortilla::DispatchPipeline),
//! so every request runs the full middleware, hook, view and error-handler
//! sequence without binding a port.
//!
//! ```rust
//! use tortilla::{view, App, Response};
//! use tortilla_test::TestClient;
//!
//! # tokio_test::block_on(async {
//! let mut app = App::new();
//! app.route_with_methods("/", &["GET"], view("index", |_req, mut res: Response| async move {
//!     res.set_text("hola");
//!     Ok(res)
//! })).unwrap();
//! let client = TestClient::new(app.build().unwrap());
//!
//! client.get("/").send().await.assert_text("hola");
//! let res = client.put("/").send().await;
//! assert_eq!(res.status_code(), 405);
//! assert_eq!(res.header_str("allow"), Some("GET"));
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/tortilla-test/0.1.0")]

mod client;
mod error;
mod response;

pub use client::{TestClient, TestRequest};
pub use error::TestError;
pub use response::TestResponse;
