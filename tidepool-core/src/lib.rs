//! Tidepool Core
//!
//! Core types shared by the assessment worker and its API client.
//!
//! This crate contains:
//! - Domain types: job kinds, assignments, criteria bounds, assessment parameters
//! - DTOs: wire bodies exchanged with the job-dispatch API

pub mod domain;
pub mod dto;
