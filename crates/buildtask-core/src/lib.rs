pub mod configs;
pub mod crds;
pub mod determiners;
pub mod error;
pub mod formatters;
pub mod implementations;
pub mod job;
pub mod lifecycle;
pub mod models;
pub mod reconciler;
pub mod traits;
pub mod validation;
