use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

use base64::prelude::{Engine as _, BASE64_STANDARD};
use pagerender_lib::{ErrorOutput, RenderError, RenderOutput, OUTPUT_VERSION};

use crate::cli::OutputFormat;

/// A finished render, ready to be written in either output format.
pub struct Rendered {
    /// Document bytes as produced by the renderer.
    pub body: Vec<u8>,
    /// JSON descriptor. `data`/`html` are filled in here when no output path is set.
    pub descriptor: RenderOutput,
}

/// Write output in the requested format.
///
/// Raw mode writes the document itself to `output` or stdout. JSON mode writes
/// the document to `output` (if given) and the descriptor to stdout; without an
/// output path the document is inlined into the descriptor.
pub fn write_output(
    rendered: Rendered,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<(), RenderError> {
    match format {
        OutputFormat::Raw => write_raw(&rendered.body, output)?,
        OutputFormat::Json => {
            if let Some(path) = output {
                std::fs::write(path, &rendered.body)?;
            }
            let descriptor = inline_body(rendered.descriptor, &rendered.body, output.is_none());
            let content = serde_json::to_string(&descriptor)?;
            println!("{content}");
        }
    }
    Ok(())
}

/// Render an error and return the fatal exit code.
pub fn render_error(err: RenderError, format: OutputFormat) -> ExitCode {
    let error_payload = err.to_payload();
    match format {
        OutputFormat::Json => {
            let payload = RenderOutput::Error(ErrorOutput {
                version: OUTPUT_VERSION.to_string(),
                error: error_payload,
            });
            let content =
                serde_json::to_string(&payload).unwrap_or_else(|_| "{\"mode\":\"error\"}".into());
            println!("{content}");
        }
        OutputFormat::Raw => {
            eprintln!("Error: {}", error_payload.message);
            if let Some(remediation) = &error_payload.remediation {
                eprintln!("Hint: {}", remediation);
            }
        }
    }

    ExitCode::from(2)
}

fn write_raw(body: &[u8], output: Option<&Path>) -> io::Result<()> {
    match output {
        Some(path) => std::fs::write(path, body),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(body)?;
            stdout.flush()
        }
    }
}

fn inline_body(descriptor: RenderOutput, body: &[u8], inline: bool) -> RenderOutput {
    if !inline {
        return descriptor;
    }
    match descriptor {
        RenderOutput::Html(mut out) => {
            out.html = Some(String::from_utf8_lossy(body).into_owned());
            RenderOutput::Html(out)
        }
        RenderOutput::Pdf(mut out) => {
            out.data = Some(BASE64_STANDARD.encode(body));
            RenderOutput::Pdf(out)
        }
        RenderOutput::Screenshot(mut out) => {
            out.data = Some(BASE64_STANDARD.encode(body));
            RenderOutput::Screenshot(out)
        }
        other => other,
    }
}
