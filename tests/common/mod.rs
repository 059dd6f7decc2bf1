// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Shared fakes for workflow and API tests
#![allow(dead_code)]


use async_trait::async_trait;
use controlnet_relay::generation::{
    FormFields, GenerationJob, GenerationService, GenerationStatus, Sleeper, UploadTarget,
    WorkflowError,
};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// In-memory provider that records every call
pub struct FakeService {
    calls: Mutex<Vec<String>>,
    acquire_result: Result<UploadTarget, WorkflowError>,
    upload_result: Result<(), WorkflowError>,
    submit_result: Result<String, WorkflowError>,
    statuses: Mutex<VecDeque<Result<GenerationJob, WorkflowError>>>,
    uploaded_path: Mutex<Option<PathBuf>>,
    file_present_at_submit: Mutex<Option<bool>>,
}

impl FakeService {
    /// Provider where every stage succeeds and the first poll is COMPLETE
    pub fn succeeding(urls: &[&str]) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            acquire_result: Ok(UploadTarget {
                asset_id: "asset-1".to_string(),
                upload_url: "https://uploads.example/bucket".to_string(),
                form_fields: FormFields::Encoded(r#"{"key":"abc","policy":"xyz"}"#.to_string()),
            }),
            upload_result: Ok(()),
            submit_result: Ok("gen-1".to_string()),
            statuses: Mutex::new(VecDeque::from(vec![Ok(job(
                GenerationStatus::Complete,
                urls,
                None,
            ))])),
            uploaded_path: Mutex::new(None),
            file_present_at_submit: Mutex::new(None),
        }
    }

    pub fn with_acquire_error(mut self, err: WorkflowError) -> Self {
        self.acquire_result = Err(err);
        self
    }

    pub fn with_upload_error(mut self, err: WorkflowError) -> Self {
        self.upload_result = Err(err);
        self
    }

    pub fn with_submit_error(mut self, err: WorkflowError) -> Self {
        self.submit_result = Err(err);
        self
    }

    /// Replace the status script; the last answer repeats forever
    pub fn with_statuses(self, statuses: Vec<Result<GenerationJob, WorkflowError>>) -> Self {
        *self.statuses.lock().unwrap() = VecDeque::from(statuses);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn query_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.starts_with("query:"))
            .count()
    }

    pub fn uploaded_path(&self) -> Option<PathBuf> {
        self.uploaded_path.lock().unwrap().clone()
    }

    pub fn file_present_at_submit(&self) -> Option<bool> {
        *self.file_present_at_submit.lock().unwrap()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl GenerationService for FakeService {
    async fn acquire_upload_target(&self, extension: &str) -> Result<UploadTarget, WorkflowError> {
        self.record(format!("acquire:{}", extension));
        self.acquire_result.clone()
    }

    async fn upload_asset(&self, target: &UploadTarget, path: &Path) -> Result<(), WorkflowError> {
        self.record(format!("upload:{}", target.asset_id));
        *self.uploaded_path.lock().unwrap() = Some(path.to_path_buf());
        self.upload_result.clone()
    }

    async fn submit_generation(
        &self,
        asset_id: &str,
        prompt: &str,
    ) -> Result<String, WorkflowError> {
        self.record(format!("submit:{}:{}", asset_id, prompt));
        let present = self.uploaded_path().map(|p| p.exists());
        *self.file_present_at_submit.lock().unwrap() = present;
        self.submit_result.clone()
    }

    async fn query_generation(&self, job_id: &str) -> Result<GenerationJob, WorkflowError> {
        self.record(format!("query:{}", job_id));
        let mut statuses = self.statuses.lock().unwrap();
        if statuses.len() > 1 {
            statuses.pop_front().expect("non-empty status script")
        } else {
            statuses.front().cloned().expect("non-empty status script")
        }
    }
}

/// Sleeper that returns immediately and counts calls
#[derive(Default)]
pub struct InstantSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl InstantSleeper {
    pub fn count(&self) -> usize {
        self.sleeps.lock().unwrap().len()
    }
}

#[async_trait]
impl Sleeper for InstantSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

pub fn job(status: GenerationStatus, urls: &[&str], reason: Option<&str>) -> GenerationJob {
    GenerationJob {
        job_id: "gen-1".to_string(),
        status,
        result_urls: urls.iter().map(|u| u.to_string()).collect(),
        failure_reason: reason.map(str::to_string),
    }
}
