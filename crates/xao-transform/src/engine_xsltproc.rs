//! xsltproc engine wrapper
//!
//! Runs the `xsltproc` command from libxslt. The source document is piped
//! through standard input; the stylesheet is passed by path, either the file
//! it came from (so relative imports resolve) or a temporary copy.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{Result, TransformError};
use crate::params::XslParams;
use crate::traits::{Stylesheet, XsltEngine, XsltVersion};

const DEFAULT_PROGRAM: &str = "xsltproc";

/// xsltproc engine wrapper
#[derive(Debug, Clone)]
pub struct XsltprocEngine {
    program: PathBuf,
}

impl Default for XsltprocEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl XsltprocEngine {
    /// Use `xsltproc` from the search path.
    pub fn new() -> Self {
        Self::with_program(DEFAULT_PROGRAM)
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Whether the program can be started at all.
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok()
    }

    fn run(&self, source: &str, stylesheet: &Path, params: &XslParams) -> Result<String> {
        let mut command = Command::new(&self.program);
        for (name, value) in params.iter() {
            command.arg("--stringparam").arg(name).arg(value);
        }
        command.arg(stylesheet).arg("-");

        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| TransformError::ProcessorUnavailable {
                program: self.program.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(source.as_bytes())?;
        }
        // stdin is dropped here, signaling EOF

        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let code = output.status.code().unwrap_or(-1);
            debug!(code, "xsltproc failed");
            return Err(TransformError::xslt(if stderr.is_empty() {
                format!("xsltproc exited with status {code}")
            } else {
                stderr
            }));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl XsltEngine for XsltprocEngine {
    fn transform(
        &mut self,
        source: &str,
        stylesheet: Stylesheet<'_>,
        params: &XslParams,
    ) -> Result<String> {
        if let Some(path) = stylesheet.path {
            return self.run(source, path, params);
        }

        let mut temp_file = tempfile::Builder::new().suffix(".xsl").tempfile()?;
        temp_file.write_all(stylesheet.text.as_bytes())?;
        temp_file.flush()?;
        self.run(source, temp_file.path(), params)
    }

    fn xslt_version(&self) -> XsltVersion {
        XsltVersion::V1_0
    }

    fn name(&self) -> &'static str {
        "xsltproc"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_program_is_reported() {
        let mut engine = XsltprocEngine::with_program("/no/such/xsltproc");
        assert!(!engine.is_available());
        let result = engine.transform(
            "<root/>",
            Stylesheet::new("<xsl:stylesheet/>"),
            &XslParams::new(),
        );
        assert!(matches!(
            result,
            Err(TransformError::ProcessorUnavailable { .. })
        ));
    }
}
