//! Client crate for the chessdesk collaborator services.
//!
//! The session controller never computes move legality itself; it consults
//! a remote arbiter for validation and legal-move enumeration, and a remote
//! engine for the automated opponent's replies. This crate defines those
//! contracts ([`MoveAuthority`], [`MoveEngine`]), the HTTP implementation
//! speaking the arbiter's JSON protocol, and a mock for tests.

pub mod error;
pub mod http;
pub mod traits;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::{ClientError, ClientResult};
pub use http::HttpArbiter;
pub use traits::{MoveAuthority, MoveEngine};

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockArbiter, MockCall};
