pub mod discovery;
pub mod domain;
pub mod faq;
pub mod notify;
pub mod poster;
pub mod schedule;
pub mod store;
pub mod tally;
pub mod themes;
pub mod weather;
mod workflow;

pub use workflow::{
    advance_activity_status, OutingStage, OutingWorkflow, PosterArtifact, WorkflowError,
};
