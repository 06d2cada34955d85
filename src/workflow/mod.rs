//! The upload → configure → pay → generate → refine workflow.
pub mod controller;
pub mod session;
pub mod store;

pub use controller::WorkflowController;
pub use session::{ConfigurationPatch, Session, SessionView, Stage};
pub use store::SessionStore;
