pub mod admin;
pub mod api;
pub mod catalog;
pub mod error;
pub mod model;
pub mod query_state;
pub mod redis;
pub mod requirements;
pub mod results;
pub mod scoring;
pub mod sequence;
pub mod software;
pub mod weights;
pub mod wizard;
