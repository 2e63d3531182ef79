//! Classifier backed by an external shell command.
//!
//! The command receives the request as one JSON document on stdin and
//! answers on stdout. Anything around the JSON object is ignored.

use std::io::Write;
use std::process::{Command, Stdio};
use vaulttag_core::config::KEY_CLASSIFIER_CMD;
use vaulttag_core::{parse_suggestion_response, Classifier, ClassifyError, ClassifyRequest, Suggestion};

const MAX_STDERR_CHARS: usize = 200;

pub struct CommandClassifier {
    command: Option<String>,
}

impl CommandClassifier {
    pub fn new(command: Option<String>) -> Self {
        Self { command }
    }
}

impl Classifier for CommandClassifier {
    fn classify(&self, request: &ClassifyRequest<'_>) -> Result<Suggestion, ClassifyError> {
        let command = self
            .command
            .as_deref()
            .ok_or_else(|| ClassifyError::Unavailable(format!("{KEY_CLASSIFIER_CMD} is not set")))?;
        let payload = serde_json::to_vec(request)
            .map_err(|err| ClassifyError::Unavailable(format!("request encoding failed: {err}")))?;

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| ClassifyError::Unavailable(format!("failed to spawn `{command}`: {err}")))?;

        // stdin is closed when the handle drops at the end of this block.
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&payload)
                .map_err(|err| ClassifyError::Unavailable(format!("failed to send request: {err}")))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|err| ClassifyError::Unavailable(format!("failed to read response: {err}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr: String = stderr.trim().chars().take(MAX_STDERR_CHARS).collect();
            return Err(ClassifyError::Unavailable(format!(
                "`{command}` exited with {}: {stderr}",
                output.status
            )));
        }

        parse_suggestion_response(&String::from_utf8_lossy(&output.stdout))
    }
}
