use anyhow::{Context, Result, bail};
use siteadapt::{AdaptorConfig, CallOverrides, SiteAdaptor, SiteConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(site_path), Some(request_id)) = (args.next(), args.next()) else {
        bail!("usage: siteadapt <site.json> <request-id> [key=value ...]");
    };

    let config = AdaptorConfig::from_env()?;
    let site = SiteConfig::from_path(&site_path)
        .with_context(|| format!("loading site config {site_path}"))?;

    let mut overrides = CallOverrides::request(request_id);
    for pair in args {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("expected key=value, got '{pair}'");
        };
        overrides = overrides.with_env(key, value);
    }

    let adaptor = SiteAdaptor::new(site, config);
    let result = adaptor.extract(&overrides).await?;
    let output = match result.extraction {
        siteadapt::Extraction::List(items) => serde_json::json!({
            "list": items,
            "next_page": result.next_page,
            "request": result.info,
        }),
        siteadapt::Extraction::Data(data) => serde_json::json!({
            "data": data,
            "next_page": result.next_page,
            "request": result.info,
        }),
        siteadapt::Extraction::Raw(bytes) => serde_json::json!({
            "raw": String::from_utf8_lossy(&bytes),
            "next_page": result.next_page,
            "request": result.info,
        }),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
