use super::SpeechBackend;

use std::io::{Error, ErrorKind, Read, Result};
use std::process::{Command, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Upper bound for one synthesis run.
const SYNTH_TIMEOUT: Duration = Duration::from_secs(10);

pub struct EspeakBackend {
    binary: String,
}

impl EspeakBackend {
    pub fn new(binary: &str) -> Self {
        Self {
            binary: binary.to_string(),
        }
    }
}

impl SpeechBackend for EspeakBackend {
    fn id(&self) -> &'static str {
        "espeak-ng"
    }

    fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let mut child = Command::new(&self.binary)
            .arg("--stdout")
            .arg(text)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Drain stdout while waiting, long sentences overflow the pipe buffer
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::new(ErrorKind::Other, "espeak stdout not captured"))?;
        let reader = std::thread::spawn(move || {
            let mut wav = Vec::new();
            stdout.read_to_end(&mut wav).map(|_| wav)
        });

        match child.wait_timeout(SYNTH_TIMEOUT)? {
            Some(status) => {
                let wav = reader
                    .join()
                    .map_err(|_| Error::new(ErrorKind::Other, "espeak reader panicked"))??;
                if status.success() {
                    Ok(wav)
                } else {
                    let mut err_msg = String::new();
                    if let Some(mut stderr) = child.stderr.take() {
                        let _ = stderr.read_to_string(&mut err_msg);
                    }
                    Err(Error::new(
                        ErrorKind::Other,
                        format!("espeak error: {}", err_msg.trim()),
                    ))
                }
            }
            None => {
                // Timeout occurred, kill the process
                let _ = child.kill();
                let _ = child.wait();
                Err(Error::new(
                    ErrorKind::TimedOut,
                    format!("Backend timed out after {}s", SYNTH_TIMEOUT.as_secs()),
                ))
            }
        }
    }
}
