//! Shell helpers available to every template.
//!
//! - `sh(cmd="...", args=[...])` - function running `cmd` through the
//!   configured shell with `args` as positional parameters (`$1`, `$2`, ...).
//!   Evaluates to stdout without its trailing newline, or to `"true"`/`"false"`
//!   (the exit status) when the command prints nothing.
//! - `value | shpipe(cmd="...")` - filter piping `value` into `cmd` on stdin and
//!   evaluating to its output (stdout followed by stderr, without the trailing
//!   newline). A non-zero exit status fails the render.
//!
//! # Examples
//!
//! ```toml
//! user = "{{ sh(cmd='whoami') }}"
//! has_git = "{{ sh(cmd='command -v git >/dev/null') }}"
//! shout = "{{ .user | shpipe(cmd='tr a-z A-Z') }}"
//! greeting = "{{ sh(cmd='echo $1, $2', args=['hello', 'world']) }}"
//! ```

use std::collections::HashMap;
use std::io::Write;
use std::process::{Command, Stdio};

use tera::Value;

/// Render a template value as a command-line argument or stdin payload.
fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn command_arg<'a>(helper: &str, args: &'a HashMap<String, Value>) -> tera::Result<&'a str> {
    args.get("cmd")
        .and_then(Value::as_str)
        .ok_or_else(|| tera::Error::msg(format!("{helper} requires a string `cmd` argument")))
}

fn strip_trailing_newline(text: &str) -> &str {
    text.strip_suffix('\n').map_or(text, |t| t.strip_suffix('\r').unwrap_or(t))
}

/// Creates the `sh` template function bound to `shell`.
pub fn create_sh_function(shell: String) -> impl tera::Function + 'static {
    move |args: &HashMap<String, Value>| -> tera::Result<Value> {
        let command = command_arg("sh", args)?;
        let positional: Vec<String> = match args.get("args") {
            None => Vec::new(),
            Some(Value::Array(items)) => items.iter().map(value_to_text).collect(),
            Some(single) => vec![value_to_text(single)],
        };

        tracing::debug!("sh: {} -c '{}' {:?}", shell, command, positional);
        let output = Command::new(&shell)
            .arg("-c")
            .arg(command)
            .arg("--")
            .args(&positional)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| tera::Error::msg(format!("sh: failed to start '{shell}': {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let result = strip_trailing_newline(&stdout);
        if result.trim().is_empty() {
            Ok(Value::String(output.status.success().to_string()))
        } else {
            Ok(Value::String(result.to_string()))
        }
    }
}

/// Creates the `shpipe` template filter bound to `shell`.
pub fn create_shpipe_filter(shell: String) -> impl tera::Filter + 'static {
    move |value: &Value, args: &HashMap<String, Value>| -> tera::Result<Value> {
        let command = command_arg("shpipe", args)?;
        let input = value_to_text(value);

        tracing::debug!("shpipe: {} -c '{}'", shell, command);
        let mut child = Command::new(&shell)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| tera::Error::msg(format!("shpipe: failed to start '{shell}': {e}")))?;

        // Stdin is written from a separate thread while output is collected.
        let writer = child.stdin.take().map(|mut stdin| {
            std::thread::spawn(move || {
                let _ = stdin.write_all(input.as_bytes());
            })
        });

        let output = child
            .wait_with_output()
            .map_err(|e| tera::Error::msg(format!("shpipe: '{command}' failed: {e}")))?;
        if let Some(writer) = writer {
            let _ = writer.join();
        }

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(tera::Error::msg(format!(
                "shpipe: '{command}' exited with {}: {}",
                output.status,
                combined.trim()
            )));
        }

        Ok(Value::String(strip_trailing_newline(&combined).to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tera::{Context, Tera};

    fn render(template: &str) -> tera::Result<String> {
        let mut tera = Tera::default();
        tera.register_function("sh", create_sh_function("sh".to_string()));
        tera.register_filter("shpipe", create_shpipe_filter("sh".to_string()));
        let mut context = Context::new();
        context.insert("name", "world");
        tera.render_str(template, &context)
    }

    #[test]
    fn test_sh_returns_stdout_without_trailing_newline() {
        assert_eq!(render("{{ sh(cmd='echo hello') }}").unwrap(), "hello");
    }

    #[test]
    fn test_sh_positional_args() {
        assert_eq!(render("{{ sh(cmd='echo $1-$2', args=['a', 'b']) }}").unwrap(), "a-b");
        assert_eq!(render("{{ sh(cmd='echo $1', args=name) }}").unwrap(), "world");
    }

    #[test]
    fn test_sh_blank_output_reports_exit_status() {
        assert_eq!(render("{{ sh(cmd='true') }}").unwrap(), "true");
        assert_eq!(render("{{ sh(cmd='exit 3') }}").unwrap(), "false");
    }

    #[test]
    fn test_sh_requires_cmd() {
        assert!(render("{{ sh() }}").is_err());
    }

    #[test]
    fn test_shpipe_pipes_value() {
        assert_eq!(render("{{ name | shpipe(cmd='tr a-z A-Z') }}").unwrap(), "WORLD");
    }

    #[test]
    fn test_shpipe_failure_fails_render() {
        assert!(render("{{ name | shpipe(cmd='cat >/dev/null; exit 1') }}").is_err());
    }
}
