//! Compiled command templates and parameter substitution.
//!
//! A compiled command is a template: `{name}` marks a parameter and `{{`/`}}`
//! stand for literal braces. Anything else in braces is copied as is.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{CompileError, CompileResult};

/// A piece of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Piece<'a> {
    Text(&'a str),
    Placeholder(&'a str),
}

/// Length of a `name}` placeholder body at the start of `rest`.
fn placeholder_len(rest: &str) -> Option<usize> {
    let bytes = rest.as_bytes();
    let len = bytes
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
        .count();
    if len == 0 || bytes[0].is_ascii_digit() || bytes.get(len) != Some(&b'}') {
        return None;
    }
    Some(len)
}

fn split_template(template: &str) -> Vec<Piece<'_>> {
    let bytes = template.as_bytes();
    let mut pieces = Vec::new();
    let mut text_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' | b'}' if bytes.get(i + 1) == Some(&bytes[i]) => {
                // Keep one brace of the pair.
                pieces.push(Piece::Text(&template[text_start..i + 1]));
                i += 2;
                text_start = i;
            }
            b'{' => match placeholder_len(&template[i + 1..]) {
                Some(len) => {
                    pieces.push(Piece::Text(&template[text_start..i]));
                    pieces.push(Piece::Placeholder(&template[i + 1..i + 1 + len]));
                    i += len + 2;
                    text_start = i;
                }
                None => i += 1,
            },
            _ => i += 1,
        }
    }
    pieces.push(Piece::Text(&template[text_start..]));
    pieces
}

/// Find the distinct parameter names of a template, in order of first use.
pub fn extract_parameters(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for piece in split_template(template) {
        if let Piece::Placeholder(name) = piece {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }
    names
}

/// Substitute placeholders using `lookup`.
fn render_with<'v, F>(template: &str, mut lookup: F) -> CompileResult<String>
where
    F: FnMut(&str) -> Option<&'v str>,
{
    let mut out = String::with_capacity(template.len());
    for piece in split_template(template) {
        match piece {
            Piece::Text(text) => out.push_str(text),
            Piece::Placeholder(name) => {
                let value =
                    lookup(name).ok_or_else(|| CompileError::MissingArgument(name.to_string()))?;
                out.push_str(value);
            }
        }
    }
    Ok(out)
}

/// Render a template with positional arguments matching `parameters`.
pub fn render_positional<S: AsRef<str>>(
    template: &str,
    parameters: &[S],
    args: &[&str],
) -> CompileResult<String> {
    if args.len() != parameters.len() {
        return Err(CompileError::ArgumentCount {
            expected: parameters.len(),
            actual: args.len(),
        });
    }
    render_with(template, |name| {
        parameters
            .iter()
            .position(|p| p.as_ref() == name)
            .map(|idx| args[idx])
    })
}

/// A command template produced by the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledCommand {
    /// One-line command with `{name}` placeholders.
    pub template: String,
    /// Parameter names in order of first appearance.
    pub parameters: Vec<String>,
    /// Template file this command was compiled from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<PathBuf>,
}

impl CompiledCommand {
    /// Create a command from a compiled template, extracting its parameters.
    pub fn new(template: String, source_path: Option<PathBuf>) -> Self {
        let parameters = extract_parameters(&template);
        CompiledCommand {
            template,
            parameters,
            source_path,
        }
    }

    /// Build a ready-to-send command from positional arguments.
    pub fn render(&self, args: &[&str]) -> CompileResult<String> {
        render_positional(&self.template, &self.parameters, args)
    }

    /// Build a ready-to-send command from named arguments.
    pub fn render_named(&self, args: &[(&str, &str)]) -> CompileResult<String> {
        render_with(&self.template, |name| {
            args.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
        })
    }
}

/// A compiled command embedded in the binary at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticCommand {
    pub name: &'static str,
    pub template: &'static str,
    pub parameters: &'static [&'static str],
}

impl StaticCommand {
    /// Build a ready-to-send command from positional arguments.
    pub fn render(&self, args: &[&str]) -> CompileResult<String> {
        render_positional(self.template, self.parameters, args)
    }

    /// Convert to an owned command.
    pub fn to_compiled(&self) -> CompiledCommand {
        CompiledCommand {
            template: self.template.to_string(),
            parameters: self.parameters.iter().map(|p| p.to_string()).collect(),
            source_path: None,
        }
    }
}
