use crate::api;
use anyhow::Result;
use url::Url;

/// Execute the server action.
///
/// # Errors
///
/// Returns an error if the DSN does not parse or the server fails to start.
pub async fn execute(port: u16, dsn: String) -> Result<()> {
    // Fail on a malformed DSN before touching the network.
    let dsn = Url::parse(&dsn)?;

    api::new(port, dsn.to_string()).await
}
