//! Loan Risk API Library
//!
//! Feature preparation, prediction, grading and explanation for gig-worker
//! loan applications, served over HTTP.
//!
//! # Modules
//!
//! - `api`: HTTP handlers and routing.
//! - `core`: The assessment pipeline and its data models.
//! - `integrations`: Model artifacts and the text-generation service.
//! - `alignment`: One-hot expansion and schema alignment.
//! - `assessment`: End-to-end pipeline for one submission.
//! - `circuit_breaker`: Circuit breaker for text-generation calls.
//! - `classifier`: Model variants, artifacts and the classifier trait.
//! - `config`: Configuration management.
//! - `encoding`: Categorical value to code tables.
//! - `errors`: Error handling types.
//! - `features`: Applicant record assembly and numeric validation.
//! - `grading`: Score to grade bands.
//! - `handlers`: HTTP request handlers.
//! - `models`: Core data models.
//! - `reasons`: Rule-based and model-delegated explanations.
//! - `report`: Report composition and HTML rendering.
//! - `routes`: Router, middleware and API documentation.
//! - `text_generation`: Chat-completions client.

pub mod api;
pub mod core;
pub mod integrations;

pub mod alignment;
pub mod assessment;
pub mod circuit_breaker;
pub mod classifier;
pub mod config;
pub mod encoding;
pub mod errors;
pub mod features;
pub mod grading;
pub mod handlers;
pub mod models;
pub mod reasons;
pub mod report;
pub mod routes;
pub mod text_generation;
