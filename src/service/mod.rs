//! Web service for genomic sequence model predictions
//!
//! This module exposes the orchestrator over a JSON API:
//! - interval and variant track predictions, each rendered to one plot per
//!   output type
//! - paginated variant scoring
//! - metadata (output types, ontology terms) and API key checks
//!
//! Generated plots are served from `/plots/`, and a built frontend can be
//! served for all other routes.

pub mod config;
pub mod handlers;
pub mod server;
pub mod types;
pub mod validation;

pub use config::ServiceConfig;
pub use server::{create_app, create_app_with, spawn_annotation_warmup, AppState};
pub use types::*;
