#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Visitor map server binary.
//!
//! Set `VISITOR_MAP_INTERACTIVE` to be prompted for the bind address and
//! port before the server starts.

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if std::env::var_os("VISITOR_MAP_INTERACTIVE").is_some() {
        visitor_map_server::interactive::run().await
    } else {
        visitor_map_server::run_server().await
    }
}
