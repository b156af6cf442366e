//! Run external commands with a bounded execution time.

use std::process::Stdio;
use std::time::Duration;

use log::debug;
use tokio::process::Command;

use crate::error::{FabricNetError, FabricNetResult};
use crate::wrap;

pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

fn command_line(program: &str, args: &[&str]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

/// Run program with args and return its stdout.
///
/// The process is killed when it did not exit within timeout, in which case
/// CommandTimeout is returned. A non zero exit status is returned as
/// CommandFailed carrying the stderr of the process.
pub fn run(program: &str, args: &[&str], timeout: Duration) -> FabricNetResult<String> {
    let line = command_line(program, args);
    debug!("running command [{}]", line);

    let runtime = wrap!(
        tokio::runtime::Builder::new_current_thread()
            .enable_io()
            .enable_time()
            .build(),
        "unable to build command runtime"
    )?;

    let output = runtime.block_on(async {
        // kill_on_drop makes sure the process does not outlive the timeout
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| FabricNetError::wrap(format!("spawn [{}]", line), e.into()))?;

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(output) => {
                output.map_err(|e| FabricNetError::wrap(format!("wait for [{}]", line), e.into()))
            }
            Err(_) => Err(FabricNetError::CommandTimeout {
                command: line.clone(),
                timeout,
            }),
        }
    })?;

    if !output.status.success() {
        return Err(FabricNetError::CommandFailed {
            command: line,
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_stdout() {
        let out = run("echo", &["hello", "fabric"], DEFAULT_COMMAND_TIMEOUT).unwrap();
        assert_eq!(out, "hello fabric\n");
    }

    #[test]
    fn test_run_failure() {
        let err = run("sh", &["-c", "echo boom >&2; exit 3"], DEFAULT_COMMAND_TIMEOUT)
            .expect_err("command must fail");
        match err {
            FabricNetError::CommandFailed {
                command,
                code,
                stderr,
            } => {
                assert_eq!(command, "sh -c echo boom >&2; exit 3");
                assert_eq!(code, Some(3));
                assert_eq!(stderr.trim(), "boom");
            }
            e => panic!("unexpected error {}", e),
        }
    }

    #[test]
    fn test_run_timeout() {
        let start = std::time::Instant::now();
        let err = run("sleep", &["10"], Duration::from_millis(200)).expect_err("must time out");
        assert!(
            matches!(err, FabricNetError::CommandTimeout { .. }),
            "unexpected error {}",
            err
        );
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_run_missing_binary() {
        let err = run("/nonexistent/fabricnet-binary", &[], DEFAULT_COMMAND_TIMEOUT)
            .expect_err("spawn must fail");
        assert!(matches!(err.unwrap(), FabricNetError::Io(_)));
    }
}
