use std::sync::Arc;

use clap::Parser;
use eyre::WrapErr;
use mimalloc::MiMalloc;
use time::UtcOffset;
use tracing::info;
use tracing_subscriber::EnvFilter;

use request_logger::application::sink::TranscriptSink;
use request_logger::application::ServerData;
use request_logger::config::ServerArgs;
use request_logger::infrastructure::listener::{bind, serve};
use request_logger::AnyResult;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> AnyResult<()> {
    let args = ServerArgs::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    // has to happen while this is still the only thread
    let local_offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .wrap_err("could not start the tokio runtime")?;
    runtime.block_on(run(args, local_offset))
}

async fn run(args: ServerArgs, local_offset: UtcOffset) -> AnyResult<()> {
    let response = args.load_response()?;

    let sink = TranscriptSink::new(&args.log_file);
    if args.clear_log {
        sink.clear()?;
    }
    sink.init()?;

    let listener = bind(&args.host, args.port).await?;
    let port = listener.local_addr()?.port();

    let data = Arc::new(ServerData {
        response,
        sink: Arc::new(sink),
        authority: compact_str::format_compact!("{}:{port}", args.host),
        local_offset,
    });

    let response_path = std::path::absolute(&args.response_file)
        .unwrap_or_else(|_| args.response_file.clone());
    data.sink.append(&format!(
        "Starting server on {}:{port}, responding with contents of {} (Content-Type: {})",
        args.host,
        response_path.display(),
        data.response.content_type,
    ))?;
    info!(log_file = %args.log_file.display(), "listening on {}:{port}", args.host);

    serve(listener, data.clone(), shutdown_signal()).await;

    data.sink.append("Stopping server")?;
    info!("listener closed");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("could not listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("could not listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
