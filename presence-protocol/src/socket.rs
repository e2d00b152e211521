//! Socket abstractions for presence IPC connections.
//!
//! This module provides the transport used to reach the desktop
//! application's local rich-presence service. On Unix platforms the
//! service listens on a Unix domain socket named `discord-ipc-N`
//! (N in 0..=9) under the runtime or temp directory; [`UnixSocket`]
//! can connect to an explicit path or probe the candidates in order.
//!
//! # Examples
//!
//! ```no_run
//! # #[cfg(unix)]
//! # async fn example() -> std::io::Result<()> {
//! use presence_protocol::socket::{PresenceSocket, UnixSocket};
//!
//! // Probe the standard socket locations
//! let socket = UnixSocket::discover().await?;
//! println!("Connected to: {}", socket.peer_endpoint());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
#[cfg(unix)]
use tokio::net::UnixStream;

/// Number of socket slots the service may listen on (`discord-ipc-0`
/// through `discord-ipc-9`).
const SOCKET_SLOTS: u32 = 10;

/// Core trait for presence IPC socket connections.
///
/// This trait extends [`AsyncRead`] and [`AsyncWrite`] with a way to
/// describe the endpoint for logging. Any duplex byte channel can stand
/// in for the real socket (tests use in-memory pipes).
pub trait PresenceSocket: AsyncRead + AsyncWrite + Send + Unpin {
    /// Get the peer endpoint as a human-readable string.
    ///
    /// For Unix domain sockets this is "unix:path".
    fn peer_endpoint(&self) -> String;
}

/// Unix domain socket connection to the presence service.
#[cfg(unix)]
#[derive(Debug)]
pub struct UnixSocket {
    stream: UnixStream,
    path: PathBuf,
}

#[cfg(unix)]
impl UnixSocket {
    /// Connect to the presence service at an explicit socket path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Socket file doesn't exist
    /// - Permission denied
    /// - Connection refused
    pub async fn connect(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path_ref = path.as_ref();
        let stream = UnixStream::connect(path_ref).await?;
        Ok(Self {
            stream,
            path: path_ref.to_path_buf(),
        })
    }

    /// Locate and connect to the presence service.
    ///
    /// Probes `discord-ipc-0` through `discord-ipc-9` under
    /// `$XDG_RUNTIME_DIR`, `$TMPDIR`, `$TMP`, `$TEMP`, and `/tmp`, in
    /// that order; the first socket that accepts the connection wins.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no candidate socket accepted a connection.
    pub async fn discover() -> std::io::Result<Self> {
        let dirs: Vec<PathBuf> = ["XDG_RUNTIME_DIR", "TMPDIR", "TMP", "TEMP"]
            .iter()
            .filter_map(|var| std::env::var_os(var))
            .map(PathBuf::from)
            .chain(std::iter::once(PathBuf::from("/tmp")))
            .collect();

        Self::discover_in(&dirs).await
    }

    /// Probe the given directories for a listening service socket.
    async fn discover_in(dirs: &[PathBuf]) -> std::io::Result<Self> {
        for dir in dirs {
            for slot in 0..SOCKET_SLOTS {
                let candidate = dir.join(format!("discord-ipc-{}", slot));
                match Self::connect(&candidate).await {
                    Ok(socket) => {
                        tracing::info!("Connected to presence service at {}", candidate.display());
                        return Ok(socket);
                    }
                    Err(e) => {
                        tracing::trace!("No service at {}: {}", candidate.display(), e);
                    }
                }
            }
        }

        Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no presence service socket found",
        ))
    }

    /// Get the underlying Unix stream.
    pub fn into_inner(self) -> UnixStream {
        self.stream
    }
}

#[cfg(unix)]
impl PresenceSocket for UnixSocket {
    fn peer_endpoint(&self) -> String {
        format!("unix:{}", self.path.display())
    }
}

#[cfg(unix)]
impl AsyncRead for UnixSocket {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

#[cfg(unix)]
impl AsyncWrite for UnixSocket {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stream).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stream).poll_shutdown(cx)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::net::UnixListener;

    #[tokio::test]
    async fn test_unix_socket_connection() {
        let temp_dir = TempDir::new().unwrap();
        let socket_path = temp_dir.path().join("discord-ipc-0");

        let listener = UnixListener::bind(&socket_path).unwrap();
        tokio::spawn(async move {
            let (_socket, _addr) = listener.accept().await.unwrap();
        });

        let socket = UnixSocket::connect(&socket_path).await.unwrap();
        assert_eq!(
            socket.peer_endpoint(),
            format!("unix:{}", socket_path.display())
        );
    }

    #[tokio::test]
    async fn test_unix_socket_nonexistent() {
        let result = UnixSocket::connect("/tmp/nonexistent-socket-12345.sock").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_discover_finds_listening_slot() {
        let temp_dir = TempDir::new().unwrap();

        // The service is on slot 3; slots 0..3 have no socket file.
        let socket_path = temp_dir.path().join("discord-ipc-3");
        let listener = UnixListener::bind(&socket_path).unwrap();
        tokio::spawn(async move {
            let (_socket, _addr) = listener.accept().await.unwrap();
        });

        let dirs = vec![temp_dir.path().to_path_buf()];
        let socket = UnixSocket::discover_in(&dirs).await.unwrap();
        assert!(socket.peer_endpoint().ends_with("discord-ipc-3"));
    }

    #[tokio::test]
    async fn test_discover_empty_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let dirs = vec![temp_dir.path().to_path_buf()];

        let err = UnixSocket::discover_in(&dirs).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
