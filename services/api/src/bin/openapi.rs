//! services/api/src/bin/openapi.rs
//!
//! Dumps the OpenAPI document of the mole tracker REST API, the same one
//! served under `/swagger-ui`, so clients can be generated without a running
//! server or database.
//!
//! Usage: `openapi [OUTPUT_PATH]` (defaults to `openapi.json`).

use api_lib::web::rest::ApiDoc;
use utoipa::OpenApi;

const DEFAULT_OUTPUT: &str = "openapi.json";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_OUTPUT.to_string());

    let doc = ApiDoc::openapi();
    let routes = doc.paths.paths.len();
    std::fs::write(&path, doc.to_pretty_json()?)?;
    println!("Wrote {} routes of the mole tracker API to {}", routes, path);
    Ok(())
}
