//! DTOs for communication with the job-dispatch API

pub mod auth;
pub mod data_spec;
pub mod result;
