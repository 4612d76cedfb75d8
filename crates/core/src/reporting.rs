//! CI status reporting.
//!
//! The runner announces task lifecycle events through a [`StatusSink`].
//! On AppVeyor the sink posts build messages to the build-worker API so
//! task progress shows up in the build's Messages tab; everywhere else the
//! sink is inert. Reporting is best-effort: a failed announcement prints a
//! warning and never fails the task it describes.
//!
//! Uploading the test-results file is different: that is the job of a
//! dedicated pipeline task, and its errors are real task failures.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::registry::TaskId;
use crate::results::TaskOutcome;
use crate::settings::Settings;
use crate::types::{PipelineError, PipelineResult};

/// Receiver for task lifecycle announcements.
#[allow(async_fn_in_trait)]
pub trait StatusSink {
    async fn task_started(&self, task: TaskId);
    async fn task_finished(&self, task: TaskId, outcome: TaskOutcome, detail: Option<&str>);
}

/// Body of a build-worker message POST.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BuildMessage<'a> {
    message: &'a str,
    category: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a str>,
}

/// Sink that posts build messages to the AppVeyor build-worker API.
///
/// The API root comes from `APPVEYOR_API_URL`, which AppVeyor sets on its
/// build agents. When the variable is absent the sink does nothing, so
/// local runs never attempt any HTTP.
pub struct AppVeyorSink {
    client: reqwest::Client,
    api_url: Option<String>,
}

impl AppVeyorSink {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: settings.env.api_url.clone(),
        }
    }

    /// A sink that never reports anywhere.
    pub fn disabled() -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: None,
        }
    }

    async fn post_message(&self, message: &str, category: &str, details: Option<&str>) {
        let Some(api_url) = &self.api_url else {
            return;
        };
        if let Err(e) = self.try_post(api_url, message, category, details).await {
            eprintln!("Warning: failed to report build status: {:#}", e);
        }
    }

    async fn try_post(
        &self,
        api_url: &str,
        message: &str,
        category: &str,
        details: Option<&str>,
    ) -> Result<()> {
        let url = endpoint(api_url, "api/build/messages");
        let body = BuildMessage {
            message,
            category,
            details,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to POST build message to {}", url))?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "Build message POST to {} returned HTTP {}",
                url,
                response.status()
            ));
        }
        Ok(())
    }
}

impl StatusSink for AppVeyorSink {
    async fn task_started(&self, task: TaskId) {
        self.post_message(&format!("Task {} started", task), "information", None)
            .await;
    }

    async fn task_finished(&self, task: TaskId, outcome: TaskOutcome, detail: Option<&str>) {
        match outcome {
            TaskOutcome::Passed => {
                self.post_message(&format!("Task {} passed", task), "information", detail)
                    .await;
            }
            TaskOutcome::Failed => {
                self.post_message(&format!("Task {} failed", task), "error", detail)
                    .await;
            }
        }
    }
}

/// Upload a test-results file to the AppVeyor ingestion endpoint for the
/// given job, making the results visible in the build's Tests tab.
pub async fn upload_test_results(job_id: &str, results: &Path) -> PipelineResult<()> {
    upload(job_id, results)
        .await
        .map_err(|e| PipelineError::Report(format!("{:#}", e)))
}

async fn upload(job_id: &str, results: &Path) -> Result<()> {
    let url = format!("https://ci.appveyor.com/api/testresults/nunit/{}", job_id);

    let bytes = tokio::fs::read(results)
        .await
        .with_context(|| format!("Failed to read test results from {}", results.display()))?;

    let file_name = results
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("test-results.xml")
        .to_string();
    let part = reqwest::multipart::Part::bytes(bytes)
        .file_name(file_name)
        .mime_str("text/xml")
        .context("Failed to build multipart body")?;
    let form = reqwest::multipart::Form::new().part("file", part);

    let response = reqwest::Client::new()
        .post(&url)
        .multipart(form)
        .send()
        .await
        .with_context(|| format!("Failed to upload test results to {}", url))?;

    if !response.status().is_success() {
        return Err(anyhow::anyhow!(
            "Test results upload returned HTTP {}",
            response.status()
        ));
    }
    Ok(())
}

fn endpoint(api_url: &str, path: &str) -> String {
    format!("{}/{}", api_url.trim_end_matches('/'), path)
}
