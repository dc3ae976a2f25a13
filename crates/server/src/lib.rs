pub mod errors;
pub mod routes;
pub mod startup;
pub mod state;
pub mod views;

pub use routes::build_router;
pub use startup::{run, run_until};
pub use state::AppState;
