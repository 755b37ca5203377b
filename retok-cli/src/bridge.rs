//! Bridge to an external model process
//!
//! The model runs as a separate command. Every request spawns it once and
//! exchanges a single JSON document over stdin/stdout.

use crate::error::CliError;
use log::{debug, info};
use retok_engine::{
    AdapterError, CharVocabulary, InferenceAdapter, InferenceOutput, InferenceRequest, Task,
    TaskOptions,
};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::process::{Command, Stdio};

/// What the model reports about itself
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ModelDescription {
    /// Kind of results the model produces
    pub task: Task,
    /// Characters per sequence, markers excluded
    pub max_length: usize,
    /// Token list of generation models (index = id)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vocabulary: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct InferCall<'a> {
    command: &'static str,
    sequences: &'a [&'a str],
    no_spaces: Vec<bool>,
    stripped: Vec<String>,
    options: &'a TaskOptions,
}

#[derive(Debug, Deserialize)]
struct DescribeReply {
    #[serde(flatten)]
    description: Option<ModelDescription>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InferReply {
    results: Option<Vec<InferenceOutput>>,
    error: Option<String>,
}

/// Inference adapter backed by an external command
pub struct CommandAdapter {
    program: String,
    args: Vec<String>,
    description: ModelDescription,
    vocabulary: Option<CharVocabulary>,
}

impl CommandAdapter {
    /// Start talking to `program`, asking it to describe itself first
    pub fn connect(program: &str, args: &[String]) -> Result<Self, CliError> {
        info!("Querying model command: {program}");
        let reply = call(program, args, r#"{"command":"describe"}"#)?;
        let reply: DescribeReply = parse_reply(&reply)?;

        if let Some(err) = reply.error {
            return Err(CliError::ModelError(err));
        }
        let description = reply.description.ok_or_else(|| {
            CliError::ModelError("describe reply lacks task or max_length".to_string())
        })?;

        let vocabulary = description
            .vocabulary
            .clone()
            .map(CharVocabulary::from_tokens)
            .transpose()
            .map_err(|e| CliError::ModelError(e.to_string()))?;
        debug!(
            "Model task {:?}, max length {}, {} tokens",
            description.task,
            description.max_length,
            vocabulary.as_ref().map_or(0, CharVocabulary::len)
        );

        Ok(Self {
            program: program.to_string(),
            args: args.to_vec(),
            description,
            vocabulary,
        })
    }

    /// The model's self description
    pub fn description(&self) -> &ModelDescription {
        &self.description
    }
}

impl InferenceAdapter for CommandAdapter {
    fn task(&self) -> Task {
        self.description.task
    }

    fn vocabulary(&self) -> Option<&CharVocabulary> {
        self.vocabulary.as_ref()
    }

    fn infer(&self, request: &InferenceRequest<'_>) -> Result<Vec<InferenceOutput>, AdapterError> {
        let request_json = serde_json::to_string(&infer_call(request))?;
        debug!("Sending {} sequences to the model", request.len());

        let reply: InferReply = parse_reply(&call(&self.program, &self.args, &request_json)?)?;
        if let Some(err) = reply.error {
            return Err(Box::new(CliError::ModelError(err)));
        }
        reply.results.ok_or_else(|| {
            Box::new(CliError::ModelError("reply has no results".to_string())) as AdapterError
        })
    }
}

fn infer_call<'a>(request: &'a InferenceRequest<'a>) -> InferCall<'a> {
    InferCall {
        command: "infer",
        sequences: request.sequences(),
        no_spaces: request.no_spaces(),
        stripped: request.stripped(),
        options: request.options(),
    }
}

/// Run the model command with one JSON request
fn call(program: &str, args: &[String], request_json: &str) -> Result<String, CliError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| CliError::ModelError(format!("failed to start {program}: {e}")))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(request_json.as_bytes())
            .map_err(|e| CliError::ModelError(format!("failed to write request: {e}")))?;
    }

    let output = child
        .wait_with_output()
        .map_err(|e| CliError::ModelError(format!("model process failed: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CliError::ModelError(format!(
            "{program} exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Parse the first JSON object line of a reply; models may log to stdout
fn parse_reply<T: serde::de::DeserializeOwned>(stdout: &str) -> Result<T, CliError> {
    let json = stdout
        .lines()
        .find(|line| line.trim_start().starts_with('{'))
        .unwrap_or(stdout);

    serde_json::from_str(json)
        .map_err(|e| CliError::ModelError(format!("unreadable reply: {e} - {}", json.trim())))
}
