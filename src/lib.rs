//! Client core for the Insightify analytics console: isolated per-domain
//! fetches, deterministic cross-cutting domain selection, tracked uploads,
//! and view-model assembly over the backend's heterogeneous payloads.

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod output;
pub mod payload;
pub mod session;
pub mod upload;
pub mod view;
