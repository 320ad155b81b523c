//! Authorize command: ask the health sink for write access.

use std::io::Write;

use anyhow::{Context, Result};
use fsl_health::{Authorization, HealthSink};

pub async fn request<H: HealthSink>(sink: &H) -> Result<Authorization> {
    sink.request_authorization()
        .await
        .context("authorization request failed")
}

pub fn run<W: Write, H: HealthSink>(writer: &mut W, sink: &H, sink_name: &str) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")?;
    let authorization = runtime.block_on(request(sink))?;
    tracing::info!(sink = sink_name, ?authorization, "health authorization");
    match authorization {
        Authorization::Granted => writeln!(writer, "Health sink {sink_name}: access granted")?,
        Authorization::Denied => writeln!(
            writer,
            "Health sink {sink_name}: access denied; sessions will be stored without export"
        )?,
    }
    Ok(())
}
