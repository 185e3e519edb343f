//! OSINT Toolkit Library
//!
//! Company-intelligence helpers built on public registries (Companies House,
//! OpenCorporates, Aleph), the Wayback Machine archive and certificate
//! transparency logs.
//!
//! # Modules
//!
//! - `core`: Scoring, enrichment and network analysis.
//! - `integrations`: External registry and archive clients.
//! - `aleph`: Aleph (OCCRP) entity search.
//! - `companies_house`: Companies House client.
//! - `config`: Configuration management.
//! - `domain`: Domain and HTML text helpers.
//! - `errors`: Error handling types.
//! - `fallback`: Primary-with-fallback registry router.
//! - `http`: Shared HTTP client with retry policy.
//! - `models`: Core data models.
//! - `network`: Company network analyzer.
//! - `opencorporates`: OpenCorporates client.
//! - `output`: Report persistence.
//! - `overlap`: Overlap scoring.
//! - `pagination`: Bounded enrichment of search results.
//! - `registry`: The `CompanyRegistry` trait.
//! - `retry`: Retry policies.
//! - `subdomains`: Subdomain enumeration from certificates and the archive.
//! - `wayback`: Wayback Machine CDX client.

pub mod core;
pub mod integrations;

pub mod aleph;
pub mod companies_house;
pub mod config;
pub mod domain;
pub mod errors;
pub mod fallback;
pub mod http;
pub mod models;
pub mod network;
pub mod opencorporates;
pub mod output;
pub mod overlap;
pub mod pagination;
pub mod registry;
pub mod retry;
pub mod subdomains;
pub mod wayback;
