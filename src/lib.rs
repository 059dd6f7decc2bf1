// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod config;
pub mod generation;
pub mod storage;
pub mod version;

// Re-export main types
pub use api::{create_app, start_server, AppState};
pub use config::RelayConfig;
pub use generation::{
    CompletionPoller, GenerationClient, GenerationJob, GenerationService, GenerationStatus,
    PollPolicy, UploadTarget, WorkflowDriver, WorkflowError,
};
pub use storage::TemporaryAsset;
