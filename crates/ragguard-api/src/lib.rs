pub mod auth;
pub mod complaints;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod scans;
pub mod state;
pub mod storage;
mod views;

pub use routes::router;
pub use state::{AppState, AppStateInner};
