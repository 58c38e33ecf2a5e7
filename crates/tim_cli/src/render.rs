//! `tim render` — render one template to stdout.

use std::error::Error;

use tim_common::Value;

use crate::{Cli, RenderArgs};

/// Runs the `tim render` command.
pub fn run(args: &RenderArgs, cli: &Cli) -> Result<i32, Box<dyn Error>> {
    let engine = crate::pipeline::init_engine(cli)?;
    let data = read_data(args)?;
    let output = engine.render(&args.template, args.layout.as_deref(), data)?;
    print!("{output}");
    Ok(0)
}

/// Parses render data from `--data` or `--data-file`; defaults to null.
fn read_data(args: &RenderArgs) -> Result<Value, Box<dyn Error>> {
    if let Some(inline) = &args.data {
        let value = serde_json::from_str(inline)
            .map_err(|e| format!("invalid JSON in --data: {e}"))?;
        return Ok(value);
    }
    if let Some(path) = &args.data_file {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        let value = serde_json::from_str(&content)
            .map_err(|e| format!("invalid JSON in {}: {e}", path.display()))?;
        return Ok(value);
    }
    Ok(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn render_args(argv: &[&str]) -> RenderArgs {
        match Cli::parse_from(argv).command {
            crate::Command::Render(args) => args,
            other => panic!("expected render, got {other:?}"),
        }
    }

    #[test]
    fn inline_data_parses() {
        let args = render_args(&["tim", "render", "t", "--data", r#"{"a":1}"#]);
        let value = read_data(&args).unwrap();
        assert_eq!(value.get("a"), Some(&Value::Int(1)));
    }

    #[test]
    fn data_file_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, r#"{"name":"file"}"#).unwrap();
        let args = render_args(&[
            "tim",
            "render",
            "t",
            "--data-file",
            path.to_str().unwrap(),
        ]);
        let value = read_data(&args).unwrap();
        assert_eq!(value.get("name"), Some(&Value::Str("file".into())));
    }

    #[test]
    fn missing_data_defaults_to_null() {
        let args = render_args(&["tim", "render", "t"]);
        assert_eq!(read_data(&args).unwrap(), Value::Null);
    }

    #[test]
    fn bad_inline_data_errors() {
        let args = render_args(&["tim", "render", "t", "--data", "{broken"]);
        assert!(read_data(&args).is_err());
    }
}
