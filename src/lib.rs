// Library root
// -----------
// The binary (`main.rs`) wires these modules into the interactive client.
//
// Module responsibilities:
// - `api`: HTTP calls to the Moltbook API, bearer auth and registration.
// - `store`: the local `.env` credential file.
// - `models`: typed request/response records.
// - `ui`: registration prompts and the menu loop.
// - `config`, `error`, `logging`: settings, error types, diagnostics.
pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod store;
pub mod ui;
