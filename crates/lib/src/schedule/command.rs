//! Shell-command builder.
//!
//! Runs one shell command per configuration, each in its own freshly
//! created working directory:
//! - `{dimension}` placeholders in the command are replaced by the
//!   configuration's values (`${VAR}` shell syntax is left alone)
//! - every dimension is exported as `BMX_<NAME>`, plus `BMX_CONFIG_ID` and
//!   `BMX_WORK_DIR`
//! - stdout and stderr go to `build.log` in the working directory
//! - the child is killed on timeout or cancellation

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info};

use crate::consts::{BUILD_LOG_FILE, DIAGNOSTIC_TAIL_LINES, ENV_PREFIX};
use crate::matrix::Configuration;

use super::builder::{BuildContext, BuildReport, Builder, BuilderError};

/// A `Builder` that invokes an external build tool through the shell.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
  command: String,
  work_root: PathBuf,
  timeout: Option<Duration>,
  shell: Option<String>,
}

impl CommandBuilder {
  pub fn new(command: impl Into<String>, work_root: impl Into<PathBuf>) -> Self {
    Self {
      command: command.into(),
      work_root: work_root.into(),
      timeout: None,
      shell: None,
    }
  }

  /// Fail builds that run longer than `timeout`.
  pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
    self.timeout = timeout;
    self
  }

  /// Use a specific shell instead of the platform default.
  pub fn with_shell(mut self, shell: Option<String>) -> Self {
    self.shell = shell;
    self
  }

  pub fn command(&self) -> &str {
    &self.command
  }

  /// Working directory used for the configuration at `index`.
  pub fn work_dir(&self, index: usize, configuration: &Configuration) -> PathBuf {
    self
      .work_root
      .join(format!("{}-{}", index, configuration.slug()))
  }

  /// Substitute `{dimension}` placeholders with the configuration's values.
  pub fn expand(&self, configuration: &Configuration) -> Result<String, BuilderError> {
    expand_placeholders(&self.command, configuration)
  }

  async fn run(&self, configuration: &Configuration, context: &BuildContext) -> Result<BuildReport, BuilderError> {
    let command_line = self.expand(configuration)?;
    let work_dir = self.work_dir(context.index, configuration);
    prepare_work_dir(&work_dir).await?;

    let log_path = work_dir.join(BUILD_LOG_FILE);
    let log = std::fs::File::create(&log_path)?;
    let log_err = log.try_clone()?;

    let (shell_cmd, shell_args) = get_shell(self.shell.as_deref());

    let mut command = Command::new(&shell_cmd);
    command
      .args(&shell_args)
      .arg(&command_line)
      .current_dir(&work_dir)
      .envs(
        configuration
          .iter()
          .map(|(name, value)| (env_var_name(name), value.to_string())),
      )
      .env(format!("{}CONFIG_ID", ENV_PREFIX), configuration.id().0)
      .env(format!("{}WORK_DIR", ENV_PREFIX), &work_dir)
      .stdin(Stdio::null())
      .stdout(Stdio::from(log))
      .stderr(Stdio::from(log_err))
      .kill_on_drop(true);

    info!(configuration = %configuration, cmd = %command_line, "executing build command");
    debug!(shell = %shell_cmd, work_dir = ?work_dir, "spawning process");

    let mut child = command.spawn()?;

    let status = tokio::select! {
      status = child.wait() => status?,
      _ = context.cancel.cancelled() => {
        debug!(configuration = %configuration, "killing build after cancellation");
        child.kill().await?;
        return Err(BuilderError::Cancelled);
      }
      _ = sleep_or_forever(self.timeout) => {
        debug!(configuration = %configuration, "killing build after timeout");
        child.kill().await?;
        return Err(BuilderError::TimedOut {
          // sleep_or_forever only completes when a timeout is set
          timeout: self.timeout.unwrap_or_default(),
          log_path: Some(log_path),
        });
      }
    };

    let tail = read_tail(&log_path, DIAGNOSTIC_TAIL_LINES).await;

    if !status.success() {
      let code = status
        .code()
        .map(|c| format!("exit code {}", c))
        .unwrap_or_else(|| "a signal".to_string());
      let mut message = format!("command failed with {}", code);
      if !tail.is_empty() {
        message.push('\n');
        message.push_str(&tail);
      }
      return Err(BuilderError::Failed {
        message,
        log_path: Some(log_path),
      });
    }

    let summary = tail.lines().last().unwrap_or_default().to_string();
    Ok(BuildReport::new(summary).with_log(log_path))
  }
}

impl Builder for CommandBuilder {
  fn build(
    &self,
    configuration: &Configuration,
    context: &BuildContext,
  ) -> impl Future<Output = Result<BuildReport, BuilderError>> + Send {
    self.run(configuration, context)
  }
}

/// Environment variable a dimension is exported as, e.g. `BMX_BUILD_TYPE`.
pub fn env_var_name(dimension: &str) -> String {
  let name: String = dimension
    .chars()
    .map(|c| {
      if c.is_ascii_alphanumeric() {
        c.to_ascii_uppercase()
      } else {
        '_'
      }
    })
    .collect();
  format!("{}{}", ENV_PREFIX, name)
}

fn expand_placeholders(template: &str, configuration: &Configuration) -> Result<String, BuilderError> {
  let mut out = String::with_capacity(template.len());
  let mut rest = template;

  while let Some(open) = rest.find('{') {
    let (before, after_open) = rest.split_at(open);
    out.push_str(before);

    let shell_expansion = before.ends_with('$');
    let close = after_open.find('}');

    match close {
      Some(close) if !shell_expansion => {
        let name = &after_open[1..close];
        let is_identifier = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if is_identifier {
          let value = configuration
            .get(name)
            .ok_or_else(|| BuilderError::UnknownPlaceholder(name.to_string()))?;
          out.push_str(value);
          rest = &after_open[close + 1..];
        } else {
          // Not a placeholder; a nested one may still follow.
          out.push('{');
          rest = &after_open[1..];
        }
      }
      _ => {
        out.push('{');
        rest = &after_open[1..];
      }
    }
  }

  out.push_str(rest);
  Ok(out)
}

async fn prepare_work_dir(work_dir: &Path) -> Result<(), BuilderError> {
  if tokio::fs::try_exists(work_dir).await? {
    tokio::fs::remove_dir_all(work_dir).await?;
  }
  tokio::fs::create_dir_all(work_dir).await?;
  Ok(())
}

async fn sleep_or_forever(timeout: Option<Duration>) {
  match timeout {
    Some(timeout) => tokio::time::sleep(timeout).await,
    None => std::future::pending().await,
  }
}

/// Last `max_lines` non-empty lines of a log file; empty if unreadable.
async fn read_tail(path: &Path, max_lines: usize) -> String {
  let Ok(bytes) = tokio::fs::read(path).await else {
    return String::new();
  };
  let text = String::from_utf8_lossy(&bytes);
  let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
  let start = lines.len().saturating_sub(max_lines);
  lines[start..].join("\n")
}

/// Get the shell command and arguments for the current platform.
///
/// Defaults to `/bin/sh -c` on Unix and `cmd.exe /C` on Windows.
fn get_shell(override_shell: Option<&str>) -> (String, Vec<String>) {
  if let Some(shell) = override_shell {
    let args = if shell.contains("powershell") || shell.contains("pwsh") {
      vec!["-NoProfile".to_string(), "-Command".to_string()]
    } else if shell.contains("cmd") {
      vec!["/C".to_string()]
    } else {
      vec!["-c".to_string()]
    };
    return (shell.to_string(), args);
  }

  #[cfg(unix)]
  {
    ("/bin/sh".to_string(), vec!["-c".to_string()])
  }

  #[cfg(windows)]
  {
    ("cmd.exe".to_string(), vec!["/C".to_string()])
  }
}
