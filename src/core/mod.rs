//! Core agent logic shared by the command-line front end and tests.

pub mod agent;
pub mod sandbox;
pub mod text;
pub mod todo;

pub use agent::Agent;
pub use sandbox::Sandbox;
pub use todo::TaskBoard;
