// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Command executors and remote transports

pub mod executor;
pub mod shell;
pub mod traced;
pub mod transport;

pub use executor::{CommandExecutor, LocalExecutor, RemoteExecutor, RoutingExecutor};
pub use traced::TracedExecutor;
pub use transport::{RemoteOutput, RemoteTransport, SshTransport, TransportError};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use executor::{ExecCall, FakeExecutor};
#[cfg(any(test, feature = "test-support"))]
pub use transport::{FakeTransport, TransportCall};

/// Executor stack used by the CLI: local or SSH per call, with tracing
pub type DefaultExecutor =
    TracedExecutor<RoutingExecutor<LocalExecutor, RemoteExecutor<SshTransport>>>;
