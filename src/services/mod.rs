//! Business logic services

pub mod classifier;
pub mod export;
pub mod normalizer;
pub mod pipeline;
pub mod resolver;
pub mod rules;
pub mod session;
pub mod spreadsheet;
pub mod submitter;
pub mod validator;
