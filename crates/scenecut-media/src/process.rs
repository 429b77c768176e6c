//! Child-process helpers shared by the decoder and the stream copier.

use scenecut_core::{Result, SceneCutError};
use std::io::Read;
use std::process::{Child, ExitStatus};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Wait for `child` to exit, killing it once `timeout` has elapsed.
pub(crate) fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<ExitStatus> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(SceneCutError::Timeout(format!(
                "process did not finish within {:.1}s",
                timeout.as_secs_f64()
            )));
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// Drain a pipe on a background thread so the child never blocks on it.
/// Joining the handle yields everything that was read.
pub(crate) fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

/// Last non-empty line of tool output, used as a short failure reason.
pub(crate) fn last_line(output: &str) -> &str {
    output
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("")
}
