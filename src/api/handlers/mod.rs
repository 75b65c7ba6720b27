//! HTTP request handlers.
//!
//! Every handler has the pipeline signature `(Context, Request) ->
//! HandlerResult`; handlers needing shared state take an [`AppState`]
//! first and are bound with [`crate::api::routes::with_state`].
//!
//! [`AppState`]: crate::state::AppState

pub mod status;
pub mod users;
