use interplay::api;
use interplay::client::*;
use interplay::logger::*;
use interplay::settings::*;
use std::sync::Arc;
use tokio::signal;
use warp::Filter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap();

    let project_settings = parse_settings(cli.settings.as_deref())?;
    info!(?project_settings);
    logger.reload_from_config(&LogConfig::from(&project_settings.log))?;

    let address: std::net::SocketAddr = project_settings.http.address.parse()?;

    let client = Arc::new(Client::try_new(&project_settings).await?);

    let api_v1 = warp::path("api")
        .and(warp::path("v1"))
        .and(api::v1::routes(client.clone()))
        .recover(api::v1::recover_error)
        .with(warp::trace::request());

    let (bound, serving) = warp::serve(api_v1).bind_with_graceful_shutdown(address, async {
        if let Err(e) = signal::ctrl_c().await {
            error!("could not listen for ctrl-c: {e}");
        }
    });
    info!(%bound, "sidecar listening");
    serving.await;

    let shutdown_timeout = std::time::Duration::from_secs(10);
    match tokio::time::timeout(shutdown_timeout, client.shutdown()).await {
        Ok(_) => info!("client shutdown successfully"),
        Err(_) => error!("client shutdown timed out"),
    }

    Ok(())
}
