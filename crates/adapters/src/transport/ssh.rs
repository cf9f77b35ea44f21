// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OpenSSH transport with one multiplexed master connection per host

use super::{is_transient_output, RemoteOutput, RemoteTransport, TransportError};
use crate::executor::exit_code_of;
use async_trait::async_trait;
use kit_core::{HostDescriptor, KnownHostsPolicy, SshOptions, TransferObserver, TransferProgress};
use openssh::{Error as SshError, KnownHosts, Session, SessionBuilder, Stdio};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{Mutex, OnceCell};

/// Bytes read from the source file per write to the remote stdin
const UPLOAD_CHUNK: usize = 64 * 1024;

type SessionSlot = Arc<OnceCell<Arc<Session>>>;

/// Runs command lines through the system `ssh` client.
///
/// Sessions are cached by [`HostDescriptor`] for the life of the transport,
/// so every step aimed at the same host reuses one master connection. The map
/// lock only guards slot lookup; connecting happens inside the host's slot, so
/// a slow host never blocks steps aimed elsewhere.
pub struct SshTransport {
    options: SshOptions,
    sessions: Mutex<HashMap<HostDescriptor, SessionSlot>>,
}

impl SshTransport {
    pub fn new(options: SshOptions) -> Self {
        Self {
            options,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    async fn slot(&self, host: &HostDescriptor) -> SessionSlot {
        let mut sessions = self.sessions.lock().await;
        Arc::clone(sessions.entry(host.clone()).or_default())
    }

    async fn session(&self, host: &HostDescriptor) -> Result<Arc<Session>, TransportError> {
        let slot = self.slot(host).await;
        let session = slot.get_or_try_init(|| self.connect(host)).await?;
        Ok(Arc::clone(session))
    }

    async fn connect(&self, host: &HostDescriptor) -> Result<Arc<Session>, TransportError> {
        let mut builder = SessionBuilder::default();
        builder.known_hosts_check(known_hosts(self.options.known_hosts));
        if let Some(user) = &host.user {
            builder.user(user.clone());
        }
        if let Some(port) = host.port {
            builder.port(port);
        }
        if let Some(timeout) = self.options.connect_timeout {
            builder.connect_timeout(timeout);
        }

        tracing::debug!(%host, "opening ssh session");
        let session = builder
            .connect(&host.address)
            .await
            .map_err(|e| classify(host, e))?;
        Ok(Arc::new(session))
    }

    async fn evict(&self, host: &HostDescriptor) {
        if self.sessions.lock().await.remove(host).is_some() {
            tracing::debug!(%host, "dropped broken ssh session");
        }
    }

    /// Map a finished remote process, dropping the session when the failure
    /// came from ssh rather than the remote command
    async fn settle(
        &self,
        host: &HostDescriptor,
        result: Result<std::process::Output, SshError>,
    ) -> Result<RemoteOutput, TransportError> {
        let outcome = result
            .map(|output| RemoteOutput {
                exit_code: exit_code_of(output.status),
                stdout: output.stdout,
                stderr: output.stderr,
            })
            .map_err(|e| classify(host, e));
        let broken = match &outcome {
            Ok(output) => is_transient_output(output),
            Err(e) => e.is_transient(),
        };
        if broken {
            self.evict(host).await;
        }
        outcome
    }
}

#[async_trait]
impl RemoteTransport for SshTransport {
    async fn exec(
        &self,
        host: &HostDescriptor,
        command_line: &str,
    ) -> Result<RemoteOutput, TransportError> {
        let session = self.session(host).await?;
        let result = session.raw_command(command_line).output().await;
        self.settle(host, result).await
    }

    async fn upload(
        &self,
        host: &HostDescriptor,
        command_line: &str,
        source: &Path,
        progress: &dyn TransferObserver,
    ) -> Result<RemoteOutput, TransportError> {
        let unreadable =
            |e: std::io::Error| TransportError::other(host, format!("{}: {}", source.display(), e));
        let mut file = tokio::fs::File::open(source).await.map_err(unreadable)?;
        let total = file.metadata().await.map_err(unreadable)?.len();

        let session = self.session(host).await?;
        let spawned = session
            .raw_command(command_line)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .await;
        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => return self.settle(host, Err(e)).await,
        };

        if let Some(mut stdin) = child.stdin().take() {
            let mut buf = vec![0u8; UPLOAD_CHUNK];
            let mut sent = 0u64;
            loop {
                let n = file.read(&mut buf).await.map_err(unreadable)?;
                if n == 0 {
                    break;
                }
                // A closed stdin means the remote side gave up; its exit status says why
                if let Err(e) = stdin.write_all(&buf[..n]).await {
                    tracing::debug!(%host, error = %e, "remote stdin closed during upload");
                    break;
                }
                sent += n as u64;
                progress.notify(TransferProgress::Update {
                    current: sent,
                    total,
                });
            }
            let _ = stdin.shutdown().await;
        }

        let result = child.wait_with_output().await;
        self.settle(host, result).await
    }

    async fn close(&self) {
        let slots: Vec<_> = self.sessions.lock().await.drain().collect();
        for (host, slot) in slots {
            let Some(session) = Arc::try_unwrap(slot).ok().and_then(OnceCell::into_inner) else {
                continue;
            };
            match Arc::try_unwrap(session) {
                Ok(session) => {
                    if let Err(e) = session.close().await {
                        tracing::warn!(%host, error = %e, "failed to close ssh session");
                    }
                }
                // Still borrowed by an in-flight command; dropping it tears down the master
                Err(_) => tracing::debug!(%host, "ssh session still in use at close"),
            }
        }
    }
}

fn known_hosts(policy: KnownHostsPolicy) -> KnownHosts {
    match policy {
        KnownHostsPolicy::Strict => KnownHosts::Strict,
        KnownHostsPolicy::Add => KnownHosts::Add,
        KnownHostsPolicy::Accept => KnownHosts::Accept,
    }
}

fn classify(host: &HostDescriptor, err: SshError) -> TransportError {
    match err {
        SshError::Connect(_) | SshError::Master(_) | SshError::Disconnected => {
            TransportError::connection(host, err.to_string())
        }
        other => TransportError::other(host, other.to_string()),
    }
}

#[cfg(test)]
#[path = "ssh_tests.rs"]
mod tests;
