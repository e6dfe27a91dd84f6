use url::Url;

use crate::error::{ConsoleError, Result};

use super::types::JobLocator;

fn with_segments<'a>(base: &Url, segments: impl IntoIterator<Item = &'a str>) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| ConsoleError::Config(format!("Base URL cannot have a path: {base}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn locator_segments(locator: &JobLocator) -> [String; 5] {
    [
        locator.pipeline.clone(),
        locator.pipeline_counter.to_string(),
        locator.stage.clone(),
        locator.stage_counter.to_string(),
        locator.job.clone(),
    ]
}

/// Raw console log of a job, starting at `start_line` (0-based).
///
/// e.g. `<https://ci.example.com/go/files/build/12/test/1/unit/cruise-output/console.log?startLineNumber=0>`
pub fn console_log_url(base: &Url, locator: &JobLocator, start_line: usize) -> Result<Url> {
    let job = locator_segments(locator);
    let segments = ["go", "files"]
        .into_iter()
        .chain(job.iter().map(String::as_str))
        .chain(["cruise-output", "console.log"]);

    let mut url = with_segments(base, segments)?;
    url.query_pairs_mut()
        .append_pair("startLineNumber", &start_line.to_string());
    Ok(url)
}

/// Job status JSON carrying `building_info`.
pub fn job_status_url(base: &Url, locator: &JobLocator) -> Result<Url> {
    let mut url = with_segments(base, ["go", "jobStatus.json"])?;
    url.query_pairs_mut()
        .append_pair("pipelineName", &locator.pipeline)
        .append_pair("pipelineCounter", &locator.pipeline_counter.to_string())
        .append_pair("stageName", &locator.stage)
        .append_pair("stageCounter", &locator.stage_counter.to_string())
        .append_pair("jobName", &locator.job);
    Ok(url)
}

/// Job details page in the web console.
pub fn job_details_url(base: &Url, locator: &JobLocator) -> Result<Url> {
    let job = locator_segments(locator);
    let segments = ["go", "tab", "build", "detail"]
        .into_iter()
        .chain(job.iter().map(String::as_str));
    with_segments(base, segments)
}

pub fn login_url(base: &Url) -> Result<Url> {
    with_segments(base, ["go", "auth", "login"])
}
