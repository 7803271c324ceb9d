//! Vidtrans - Video Upload & Translation Client
//!
//! Submits a video file (or URL) with a source/target language pair to a
//! translation backend and follows the job through upload, translation and
//! completion.

pub mod artifact;
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod i18n;
pub mod job;
pub mod monitor;
pub mod orchestrator;
pub mod submit;
pub mod view;
