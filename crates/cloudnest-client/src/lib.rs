//! # cloudnest-client
//!
//! The REST boundary. [`FileApi`] is the seam the service layer talks to;
//! [`HttpFileApi`] implements it over `reqwest` against the flat list and
//! mutation endpoints of the file backend. Every request carries the
//! bearer token kept in durable storage by [`TokenStore`].

pub mod api;
mod envelope;
pub mod http;
pub mod token;

pub use api::{FileApi, ListQuery, MoveDestination, UploadFile};
pub use http::HttpFileApi;
pub use token::TokenStore;
