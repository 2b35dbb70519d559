//! Python generator execution.
//!
//! There is no safe in-process way to host Python from Rust, so the script
//! runs out-of-process under `python3 -I` through an embedded driver that
//! rebuilds the language-level confinement: a curated builtins allowlist
//! (no `open`), a guarded `__import__` limited to a fixed module set, an
//! `os` facade reduced to `getcwd`/`listdir`/`path`/depth-bounded `walk`,
//! and a `subprocess` facade whose `run` rejects base commands outside a
//! fixed allowlist. The script must assign a dict to a variable named
//! `placeholders`; values are coerced with `str()` and handed back to Rust
//! as JSON through a result file, keeping stdout free for the script's own
//! `print` calls.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::io::Write;

use super::{run_interpreter, GeneratorError};

const DRIVER: &str = r##"
import builtins as _builtins
import json
import sys

_SAFE_BUILTINS = (
    "len", "str", "int", "float", "bool", "list", "dict", "tuple", "set",
    "range", "enumerate", "zip", "print", "abs", "min", "max", "sum",
    "sorted", "reversed",
)
_SAFE_MODULES = ("glob", "json", "re", "datetime")
_SUBPROCESS_ALLOWED = {
    "ls", "cat", "head", "tail", "wc", "grep", "find", "git", "date",
    "whoami", "pwd", "echo", "which", "file", "test", "tr", "sed", "cut",
    "du", "sort", "uniq", "rev", "awk", "xargs", "stat", "basename", "sh",
    "bc",
}


def _safe_import(name, *args, **kwargs):
    if name in _SAFE_MODULES:
        return _builtins.__import__(name, *args, **kwargs)
    raise ImportError("import of %r is not allowed" % name)


def _restricted_os():
    import os

    class RestrictedOS:
        getcwd = staticmethod(os.getcwd)
        listdir = staticmethod(os.listdir)
        path = os.path

        @staticmethod
        def walk(top, **kwargs):
            depth = 0
            for entry in os.walk(top, **kwargs):
                yield entry
                depth += 1
                if depth > 10:
                    break

    return RestrictedOS()


def _restricted_subprocess():
    import os
    import subprocess

    class RestrictedSubprocess:
        PIPE = subprocess.PIPE
        STDOUT = subprocess.STDOUT

        @staticmethod
        def run(args, **kwargs):
            if isinstance(args, (list, tuple)) and args:
                command = args[0]
            elif isinstance(args, str) and args.split():
                command = args.split()[0]
            else:
                command = ""
            if command not in _SUBPROCESS_ALLOWED:
                raise PermissionError("command %r is not allowed" % command)
            kwargs.setdefault("timeout", 10)
            kwargs.setdefault("cwd", os.getcwd())
            return subprocess.run(args, **kwargs)

    return RestrictedSubprocess()


def main():
    script_path, result_path = sys.argv[1], sys.argv[2]
    with open(script_path) as handle:
        source = handle.read()

    safe_builtins = {name: getattr(_builtins, name) for name in _SAFE_BUILTINS}
    safe_builtins["__import__"] = _safe_import
    script_globals = {
        "__builtins__": safe_builtins,
        "os": _restricted_os(),
        "subprocess": _restricted_subprocess(),
    }
    for name in _SAFE_MODULES:
        script_globals[name] = _builtins.__import__(name)

    local_vars = {}
    exec(source, script_globals, local_vars)

    placeholders = local_vars.get("placeholders")
    if not isinstance(placeholders, dict):
        raise SystemExit("script must assign a dict to 'placeholders'")

    with open(result_path, "w") as handle:
        json.dump({str(k): str(v) for k, v in placeholders.items()}, handle)


main()
"##;

pub(crate) async fn run(
    script: &str,
    timeout_secs: u64,
) -> Result<HashMap<String, String>, GeneratorError> {
    // Both temp files are removed on drop, on every exit path.
    let mut script_file = tempfile::Builder::new()
        .prefix("crucible-gen-")
        .suffix(".py")
        .tempfile()?;
    script_file.write_all(script.as_bytes())?;
    script_file.flush()?;

    let result_file = tempfile::Builder::new()
        .prefix("crucible-gen-")
        .suffix(".json")
        .tempfile()?;

    let output = run_interpreter(
        "python3",
        &[
            OsStr::new("-I"),
            OsStr::new("-c"),
            OsStr::new(DRIVER),
            script_file.path().as_os_str(),
            result_file.path().as_os_str(),
        ],
        timeout_secs,
    )
    .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GeneratorError::ScriptFailed(stderr.trim().to_string()));
    }

    let raw = std::fs::read_to_string(result_file.path())?;
    serde_json::from_str(&raw).map_err(|err| GeneratorError::BadOutput(err.to_string()))
}
