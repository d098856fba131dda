//! # statetree-http
//!
//! An HTTP [`Resolver`](statetree::Resolver) for statetree resources.
//!
//! Resource keys are resolved relative to a base URL:
//!
//! ```ignore
//! let store = Store::new();
//! store.set_resolver(HttpResolver::new("https://api.example.com")?);
//!
//! // GET https://api.example.com/users/1
//! let user = until_ready(|| store.get_path("/users/1")).await?;
//!
//! // PATCH https://api.example.com/users/1 with the edited value
//! store.save("/users/1").await?;
//! ```

pub mod error;
pub mod resolver;

pub use error::HttpError;
pub use resolver::HttpResolver;
