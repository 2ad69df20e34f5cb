pub mod check;
pub mod cli;
pub mod config;
pub mod error;
pub mod gemini;
pub mod git;
pub mod prompts;
pub mod report;
pub mod review_schema;
