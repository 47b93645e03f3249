//! Unix socket transport for the pseudo-file
//!
//! Each connection is one write followed by one read session: the server
//! collects the client's bytes until EOF (or the read timeout), applies them
//! as a single write, then sends the greeting and closes.
//!
//! ```bash
//! echo "4,1" | socat - UNIX-CONNECT:/run/gpio-dr.sock
//! ```

use super::proc_entry::{ProcEntry, ReadSession, MAX_USER_SIZE};
use crate::config::ChannelConfig;
use crate::error::Result;
use crate::hal::RegisterBlock;
use log::{debug, info, warn};
use std::fs;
use std::future::Future;
use std::io;
use std::os::unix::fs::{FileTypeExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::task::JoinSet;

/// Delay before retrying a failed `accept`, doubling while failures persist
#[derive(Debug)]
struct AcceptBackoff {
    delay: Duration,
}

impl AcceptBackoff {
    const INITIAL: Duration = Duration::from_millis(10);
    const MAX: Duration = Duration::from_secs(1);

    fn new() -> Self {
        Self {
            delay: Self::INITIAL,
        }
    }

    fn next_delay(&mut self) -> Duration {
        let delay = self.delay;
        self.delay = (self.delay * 2).min(Self::MAX);
        delay
    }

    fn reset(&mut self) {
        self.delay = Self::INITIAL;
    }
}

pub struct Server {
    listener: UnixListener,
    path: PathBuf,
    read_timeout: Duration,
}

impl Server {
    /// Bind the socket, replacing a stale socket file, and apply `mode`
    pub fn bind(config: &ChannelConfig) -> Result<Self> {
        let path = config.socket.clone();
        remove_stale_socket(&path)?;

        let listener = UnixListener::bind(&path)?;
        fs::set_permissions(&path, fs::Permissions::from_mode(config.mode))?;

        info!("Listening on {} (mode {:o})", path.display(), config.mode);

        Ok(Self {
            listener,
            path,
            read_timeout: Duration::from_millis(config.read_timeout_ms),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serve connections until `shutdown` resolves.
    ///
    /// In-flight connections are allowed to finish before the socket file is
    /// removed and this returns.
    pub async fn run<R, F>(self, entry: Arc<ProcEntry<R>>, shutdown: F) -> Result<()>
    where
        R: RegisterBlock + Send + 'static,
        F: Future<Output = ()>,
    {
        let Server {
            listener,
            path,
            read_timeout,
        } = self;
        let mut tasks = JoinSet::new();
        let mut backoff = AcceptBackoff::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, _)) => {
                        backoff.reset();
                        let entry = Arc::clone(&entry);
                        tasks.spawn(async move {
                            if let Err(e) = handle_connection(&entry, stream, read_timeout).await {
                                warn!("{}: connection failed: {}", entry.name(), e);
                            }
                        });
                    }
                    Err(e) => {
                        // EMFILE and friends fail again immediately
                        let delay = backoff.next_delay();
                        warn!("accept failed: {} (retrying in {:?})", e, delay);
                        tokio::time::sleep(delay).await;
                    }
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        warn!("connection task aborted: {}", e);
                    }
                }
            }
        }

        drop(listener);
        let pending = tasks.len();
        if pending > 0 {
            debug!("Waiting for {} connection(s) to finish", pending);
        }
        while tasks.join_next().await.is_some() {}

        if let Err(e) = fs::remove_file(&path) {
            warn!("Failed to remove {}: {}", path.display(), e);
        }
        info!("Channel {} closed", path.display());
        Ok(())
    }
}

async fn handle_connection<R: RegisterBlock>(
    entry: &ProcEntry<R>,
    mut stream: UnixStream,
    read_timeout: Duration,
) -> io::Result<()> {
    let mut payload = Vec::with_capacity(MAX_USER_SIZE);
    let received = tokio::time::timeout(read_timeout, read_payload(&mut stream, &mut payload)).await;
    match received {
        Ok(result) => result?,
        Err(_) => debug!("{}: read timed out after {} bytes", entry.name(), payload.len()),
    }

    if !payload.is_empty() {
        entry.write(&payload);
    }

    let mut session = ReadSession::new();
    let mut buf = [0u8; 64];
    loop {
        let n = entry.read(&mut session, &mut buf);
        if n == 0 {
            break;
        }
        stream.write_all(&buf[..n]).await?;
    }
    stream.shutdown().await
}

/// Read until EOF, keeping at most `MAX_USER_SIZE` bytes
async fn read_payload(stream: &mut UnixStream, payload: &mut Vec<u8>) -> io::Result<()> {
    let mut chunk = [0u8; 512];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        let room = MAX_USER_SIZE - payload.len();
        payload.extend_from_slice(&chunk[..n.min(room)]);
    }
}

fn remove_stale_socket(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_socket() => {
            debug!("Removing stale socket {}", path.display());
            fs::remove_file(path)
        }
        Ok(_) => Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} exists and is not a socket", path.display()),
        )),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
