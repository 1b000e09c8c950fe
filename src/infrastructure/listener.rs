use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;

use bytes::BytesMut;
use compact_str::CompactString;
use eyre::WrapErr;
use listenfd::ListenFd;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, error, warn};

use crate::application::transcript::Transcript;
use crate::application::ServerData;
use crate::domain::errors::RequestError;
use crate::domain::request::IncomingRequest;
use crate::infrastructure::server_impl::response::{Response, StatusCode};
use crate::infrastructure::server_impl::server::parse_http;
use crate::AnyResult;

const READ_CHUNK: usize = 4096;

/// Body bytes reserved up front; larger bodies grow the buffer as they arrive.
const MAX_BODY_RESERVE: usize = 1024 * 1024;

/// Takes over a socket handed down by systemfd/systemd when present, binds `host:port` otherwise.
pub async fn bind(host: &str, port: u16) -> AnyResult<TcpListener> {
    let mut listenfd = ListenFd::from_env();
    if let Some(inherited) = listenfd
        .take_tcp_listener(0)
        .wrap_err("could not take inherited listener")?
    {
        inherited.set_nonblocking(true)?;
        return TcpListener::from_std(inherited).wrap_err("could not adopt inherited listener");
    }

    TcpListener::bind((host, port))
        .await
        .wrap_err_with(|| format!("could not bind {host}:{port}"))
}

/// Accepts until `shutdown` resolves. Every connection runs in its own task.
pub async fn serve(
    listener: TcpListener,
    data: Arc<ServerData>,
    shutdown: impl Future<Output = ()>,
) {
    tokio::pin!(shutdown);

    debug!("starting TCP accept loop...");
    loop {
        let accept_result = tokio::select! {
            r = listener.accept() => r,
            _ = &mut shutdown => {
                return;
            }
        };
        let (socket, peer) = match accept_result {
            Ok(accepted) => accepted,
            Err(err) => {
                error!("TCP loop: accept result: {}", err);
                continue;
            }
        };

        let data = data.clone();
        tokio::spawn(async move {
            match handle_connection(socket, peer.ip(), &data).await {
                Ok(()) => {}
                Err(RequestError::Incomplete) => {
                    debug!(%peer, "peer left before sending a full request")
                }
                Err(err) => warn!(%peer, "connection dropped: {err}"),
            }
        });
    }
}

/// Reads one request, logs it, then answers with the fixed response.
pub async fn handle_connection<S>(
    mut stream: S,
    client_address: IpAddr,
    data: &ServerData,
) -> Result<(), RequestError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = match read_request(&mut stream, client_address, data).await {
        Ok(request) => request,
        Err(err) if err.is_client_error() => {
            let response = Response::from_status_code(StatusCode::BadRequest).into_http();
            // best effort, the peer is already misbehaving
            let _ = stream.write_all(&response).await;
            let _ = stream.shutdown().await;
            return Err(err);
        }
        Err(err) => return Err(err),
    };

    let transcript = Transcript::new(&request, &data.authority);
    if let Err(err) = data.sink.append_blocking(transcript.to_string()).await {
        error!(url = transcript.url(), "could not record request: {err:#}");
    }

    stream.write_all(&data.response.to_response().into_http()).await?;
    stream.shutdown().await?;
    Ok(())
}

async fn read_request<S>(
    stream: &mut S,
    client_address: IpAddr,
    data: &ServerData,
) -> Result<IncomingRequest, RequestError>
where
    S: AsyncRead + Unpin,
{
    let mut buffer = BytesMut::with_capacity(READ_CHUNK);

    let (method, path, headers, content_length, head_len) = loop {
        if stream.read_buf(&mut buffer).await? == 0 {
            return Err(RequestError::Incomplete);
        }
        if let Some(request) = parse_http(&buffer)? {
            break (
                CompactString::from(request.method.as_str()),
                request.resource.to_owned(),
                request.owned_headers(),
                request.content_length(),
                request.head_len,
            );
        }
    };

    let _head = buffer.split_to(head_len);
    if buffer.len() < content_length {
        buffer.reserve((content_length - buffer.len()).min(MAX_BODY_RESERVE));
    }
    while buffer.len() < content_length {
        if stream.read_buf(&mut buffer).await? == 0 {
            return Err(RequestError::Incomplete);
        }
    }
    // anything past the declared length is not part of this request
    buffer.truncate(content_length);

    Ok(IncomingRequest {
        method,
        path,
        headers,
        body: buffer.freeze(),
        client_address,
        timestamp: data.now(),
    })
}
