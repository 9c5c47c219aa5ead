//! TCP accept loop and per-connection RESP session

use anyhow::Result;
use bytes::BytesMut;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::handler::{ByteCache, CommandHandler};
use crate::resp::RespValue;

/// Accept connections forever, one task per client
pub async fn serve(listener: TcpListener, cache: Arc<ByteCache>) -> Result<()> {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                debug!("New connection from {}", addr);
                let cache = Arc::clone(&cache);

                tokio::spawn(async move {
                    if let Err(e) = handle_client(stream, cache).await {
                        error!("Error handling client {}: {}", addr, e);
                    }
                    debug!("Connection closed: {}", addr);
                });
            }
            Err(e) => {
                error!("Error accepting connection: {}", e);
            }
        }
    }
}

async fn handle_client(mut stream: TcpStream, cache: Arc<ByteCache>) -> Result<()> {
    let handler = CommandHandler::new(cache);
    let mut buffer = BytesMut::with_capacity(4096);
    let mut out = BytesMut::with_capacity(4096);

    loop {
        let n = stream.read_buf(&mut buffer).await?;
        if n == 0 {
            return Ok(());
        }

        // Answer every complete command in the buffer with one write
        loop {
            match RespValue::parse(&mut buffer) {
                Ok(Some(cmd)) => handler.handle(cmd).encode(&mut out),
                Ok(None) => break,
                Err(e) => {
                    warn!("Parse error: {}", e);
                    RespValue::error(format!("ERR Protocol error: {}", e)).encode(&mut out);
                    buffer.clear();
                    break;
                }
            }
        }

        if !out.is_empty() {
            stream.write_all(&out).await?;
            out.clear();
        }
    }
}

/// Bind and log where we listen
pub async fn bind(addr: &str) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr).await?;
    info!("Server listening on {}", listener.local_addr()?);
    Ok(listener)
}
