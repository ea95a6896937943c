// Copyright 2022 Ryan Seipp
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! CGI-style script execution.
//!
//! Dynamic resources are plain script files run under an external
//! interpreter; the request's query string or body is handed over as a
//! single process argument and the process's combined output becomes the
//! response body.

use std::process::{Command, Stdio};

use super::HttpError;

/// Longest CGI response body that will be sent; anything past this is
/// silently truncated.
pub(crate) const MAX_CGI_OUTPUT: usize = 3072;

/// Interpreters the server knows how to invoke, keyed by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Interpreter {
    /// `.py` scripts, run under `python3`.
    Python,
    /// `.php` scripts, run under `php`.
    Php,
}

impl Interpreter {
    /// Picks an interpreter from the resource path's extension, if any.
    pub(crate) fn for_path(path: &str) -> Option<Self> {
        if path.ends_with(".py") {
            Some(Interpreter::Python)
        } else if path.ends_with(".php") {
            Some(Interpreter::Php)
        } else {
            None
        }
    }

    fn program(self) -> &'static str {
        match self {
            Interpreter::Python => "python3",
            Interpreter::Php => "php",
        }
    }
}

/// Runs `script` under `interpreter` and returns its combined stdout and
/// stderr, truncated to [`MAX_CGI_OUTPUT`] bytes.
///
/// A missing or broken script is the interpreter's problem: its diagnostics
/// simply become the body. Only failure to launch the interpreter itself is
/// reported, as not-found.
pub(crate) fn run(
    interpreter: Interpreter,
    script: &str,
    argument: Option<&str>,
) -> Result<Vec<u8>, HttpError> {
    let mut command = Command::new(interpreter.program());
    command.arg(script).stdin(Stdio::null());
    if let Some(argument) = argument {
        command.arg(argument);
    }

    let output = command.output().map_err(|_| HttpError::NotFound)?;

    let mut body = output.stdout;
    body.extend_from_slice(&output.stderr);
    body.truncate(MAX_CGI_OUTPUT);
    Ok(body)
}

#[cfg(test)]
mod test {
    use super::{run, Interpreter, MAX_CGI_OUTPUT};
    use crate::http::HttpError;

    fn python3_available() -> bool {
        std::process::Command::new("python3")
            .arg("--version")
            .output()
            .is_ok()
    }

    #[test]
    fn picks_interpreter_by_extension() {
        assert_eq!(Some(Interpreter::Python), Interpreter::for_path("./www/a.py"));
        assert_eq!(Some(Interpreter::Php), Interpreter::for_path("./www/a.php"));
        assert_eq!(None, Interpreter::for_path("./www/a.html"));
        assert_eq!(None, Interpreter::for_path("./www/py"));
    }

    #[test]
    fn captures_script_output() {
        if !python3_available() {
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("echo.py");
        std::fs::write(&script, "import sys\nprint(sys.argv[1])\n").unwrap();

        let body = run(Interpreter::Python, script.to_str().unwrap(), Some("a=1")).unwrap();
        assert_eq!(b"a=1\n".to_vec(), body);
    }

    #[test]
    fn long_output_is_truncated() {
        if !python3_available() {
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("big.py");
        std::fs::write(&script, "print('x' * 10000)\n").unwrap();

        let body = run(Interpreter::Python, script.to_str().unwrap(), None).unwrap();
        assert_eq!(MAX_CGI_OUTPUT, body.len());
    }

    #[test]
    fn unlaunchable_interpreter_is_not_found() {
        let php_present = std::process::Command::new("php")
            .arg("--version")
            .output()
            .is_ok();
        if php_present {
            return;
        }
        assert_eq!(Err(HttpError::NotFound), run(Interpreter::Php, "x.php", None));
    }
}
