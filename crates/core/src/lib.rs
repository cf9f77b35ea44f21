// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kit-core: value types shared by the kit task runner
//!
//! This crate provides:
//! - The immutable-by-derivation execution [`Context`]
//! - Remote host descriptors, retry policy and SSH options
//! - Command results, per-call run options and the execution error taxonomy
//! - Pipeline failure policies
//! - A cooperative cancellation flag
//! - File transfer progress notifications

pub mod cancel;
pub mod command;
pub mod context;
pub mod error;
pub mod host;
pub mod policy;
pub mod remote;
pub mod transfer;

pub use cancel::CancelFlag;
pub use command::{CommandResult, RunOptions, Target};
pub use context::{Context, ContextOverrides};
pub use error::ExecError;
pub use host::{HostDescriptor, HostParseError};
pub use policy::FailurePolicy;
pub use remote::{KnownHostsPolicy, RetryPolicy, SshOptions};
pub use transfer::{copy_label, NoProgress, TransferObserver, TransferProgress};
