pub mod routes;
mod ws;

pub use routes::{arena_routes, handle_rejection, AppState};
