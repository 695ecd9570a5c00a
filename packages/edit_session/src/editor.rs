//! Editor command templating and process lifecycle.
//!
//! Templates are JSON arrays of strings. These tokens are substituted in
//! every argument:
//!
//! | token | value |
//! |-------|-------|
//! | `%s`  | absolute path of the temp file |
//! | `%l`  | caret line, 1-indexed |
//! | `%L`  | caret line, 0-indexed |
//! | `%c`  | caret column, 1-indexed |
//! | `%C`  | caret column, 0-indexed |
//!
//! If no argument mentions `%s`, the path is appended as a final argument.

use std::path::Path;
use std::process::Stdio;
use tracing::{debug, info};

use crate::error::{EditorError, TemplateError};
use crate::position::CaretPosition;

/// Decode the `editor` payload field into an argument template.
pub fn parse_template(raw: &str) -> Result<Vec<String>, TemplateError> {
    let template: Vec<String> = serde_json::from_str(raw)?;
    if template.is_empty() {
        return Err(TemplateError::Empty);
    }
    Ok(template)
}

/// Substitute placeholders in one argument. Returns whether `%s` was present.
fn substitute(arg: &str, path: &str, caret: CaretPosition) -> (String, bool) {
    let mut out = String::with_capacity(arg.len() + path.len());
    let mut has_path = false;
    let mut chars = arg.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let value = match chars.peek() {
            Some('s') => {
                has_path = true;
                path.to_string()
            }
            Some('l') => (caret.line + 1).to_string(),
            Some('L') => caret.line.to_string(),
            Some('c') => (caret.column + 1).to_string(),
            Some('C') => caret.column.to_string(),
            _ => {
                out.push('%');
                continue;
            }
        };
        chars.next();
        out.push_str(&value);
    }
    (out, has_path)
}

/// Build the final argument list for the editor.
pub fn resolve_args(template: &[String], path: &Path, caret: CaretPosition) -> Vec<String> {
    let path = path.to_string_lossy();
    let mut path_added = false;
    let mut args = Vec::with_capacity(template.len() + 1);

    for arg in template {
        let (resolved, has_path) = substitute(arg, &path, caret);
        path_added |= has_path;
        args.push(resolved);
    }
    if !path_added {
        args.push(path.into_owned());
    }
    args
}

/// Launch the editor and wait for it to exit.
///
/// The editor never sees this process's stdio: stdout carries the protocol.
pub async fn run(args: &[String]) -> Result<(), EditorError> {
    let Some((program, rest)) = args.split_first() else {
        return Err(EditorError::Launch {
            program: String::new(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "no program"),
        });
    };

    info!(program = %program, args = ?rest, "launching editor");
    let mut child = tokio::process::Command::new(program)
        .args(rest)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| EditorError::Launch {
            program: program.clone(),
            source,
        })?;

    let status = child.wait().await.map_err(|source| EditorError::Wait {
        program: program.clone(),
        source,
    })?;
    debug!(program = %program, %status, "editor exited");

    if status.success() {
        Ok(())
    } else {
        Err(EditorError::Exited {
            program: program.clone(),
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn path_inside_argument_counts_as_added() {
        let args = resolve_args(
            &strings(&["-g", "%s:%l:%c"]),
            &PathBuf::from("/tmp/x.txt"),
            CaretPosition { line: 2, column: 5 },
        );
        assert_eq!(args, strings(&["-g", "/tmp/x.txt:3:6"]));
    }

    #[test]
    fn missing_path_is_appended() {
        let args = resolve_args(
            &strings(&["--wait"]),
            &PathBuf::from("/tmp/x.txt"),
            CaretPosition::default(),
        );
        assert_eq!(args, strings(&["--wait", "/tmp/x.txt"]));
    }

    #[test]
    fn path_in_first_argument_is_not_appended_again() {
        let args = resolve_args(
            &strings(&["%s", "--nofork"]),
            &PathBuf::from("/tmp/x.txt"),
            CaretPosition::default(),
        );
        assert_eq!(args, strings(&["/tmp/x.txt", "--nofork"]));
    }

    #[test]
    fn zero_and_one_indexed_tokens() {
        let args = resolve_args(
            &strings(&["gvim", "+call cursor(%l,%c)", "%L/%C", "%s"]),
            &PathBuf::from("/t/f"),
            CaretPosition { line: 4, column: 0 },
        );
        assert_eq!(args, strings(&["gvim", "+call cursor(5,1)", "4/0", "/t/f"]));
    }

    #[test]
    fn substituted_text_is_not_rescanned() {
        let args = resolve_args(
            &strings(&["%s"]),
            &PathBuf::from("/tmp/100%l.txt"),
            CaretPosition::default(),
        );
        assert_eq!(args, strings(&["/tmp/100%l.txt"]));
    }

    #[test]
    fn unknown_tokens_are_kept() {
        let args = resolve_args(
            &strings(&["50%", "%x%%"]),
            &PathBuf::from("/f"),
            CaretPosition::default(),
        );
        assert_eq!(args, strings(&["50%", "%x%%", "/f"]));
    }

    #[test]
    fn parse_template_rejects_bad_json() {
        assert!(matches!(
            parse_template("[\"gedit\""),
            Err(TemplateError::Decode(_))
        ));
        assert!(matches!(
            parse_template("\"gedit\""),
            Err(TemplateError::Decode(_))
        ));
    }

    #[test]
    fn parse_template_rejects_empty() {
        assert!(matches!(parse_template("[]"), Err(TemplateError::Empty)));
    }

    #[test]
    fn parse_template_accepts_array() {
        assert_eq!(
            parse_template(r#"["gedit", "+%l:%c"]"#).unwrap(),
            strings(&["gedit", "+%l:%c"])
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_succeeds_on_zero_exit() {
        run(&strings(&["true"])).await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_reports_nonzero_exit() {
        let err = run(&strings(&["false"])).await.unwrap_err();
        assert!(matches!(err, EditorError::Exited { .. }));
    }

    #[tokio::test]
    async fn run_reports_missing_binary() {
        let err = run(&strings(&["definitely-not-an-editor-7c1f"]))
            .await
            .unwrap_err();
        assert!(matches!(err, EditorError::Launch { .. }));
    }
}
