//! Compiling template directories into command sets.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CompileError, CompileResult};
use crate::passes::compile_source;
use crate::template::CompiledCommand;

/// File extension of command templates.
pub const TEMPLATE_EXTENSION: &str = "py";

/// A named collection of compiled commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandSet {
    /// When the set was compiled.
    pub generated_at: DateTime<Utc>,
    /// Commands by name (the template file stem).
    pub commands: BTreeMap<String, CompiledCommand>,
}

impl Default for CommandSet {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandSet {
    /// Create an empty command set stamped with the current time.
    pub fn new() -> Self {
        CommandSet {
            generated_at: Utc::now(),
            commands: BTreeMap::new(),
        }
    }

    /// Add a command, replacing any previous command with the same name.
    pub fn insert(&mut self, name: impl Into<String>, command: CompiledCommand) {
        self.commands.insert(name.into(), command);
    }

    /// Get a command by name.
    pub fn get(&self, name: &str) -> CompileResult<&CompiledCommand> {
        self.commands
            .get(name)
            .ok_or_else(|| CompileError::UnknownCommand(name.to_string()))
    }

    /// Number of commands in the set.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Serialize the set as pretty-printed JSON.
    pub fn to_json(&self) -> CompileResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a set from JSON.
    pub fn from_json(json: &str) -> CompileResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the set to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> CompileResult<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Read a set from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> CompileResult<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}

/// Compile a template source string.
pub fn compile(source: &str) -> CompileResult<CompiledCommand> {
    Ok(CompiledCommand::new(compile_source(source)?, None))
}

/// Compile a single template file.
pub fn compile_file(path: impl AsRef<Path>) -> CompileResult<CompiledCommand> {
    let path = path.as_ref();
    let source = fs::read_to_string(path)?;
    let command = CompiledCommand::new(compile_source(&source)?, Some(path.to_path_buf()));
    debug!(
        "compiled {} ({} parameters: {})",
        path.display(),
        command.parameters.len(),
        command.parameters.join(", ")
    );
    Ok(command)
}

/// Check if a name can be used as a command name (and a Rust constant).
pub fn is_valid_command_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Compile every template in a directory.
///
/// Commands are named after the file stem. Files without the template
/// extension are ignored.
pub fn compile_dir(dir: impl AsRef<Path>) -> CompileResult<CommandSet> {
    let dir = dir.as_ref();
    let mut set = CommandSet::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(TEMPLATE_EXTENSION)
        {
            continue;
        }
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        if !is_valid_command_name(&name) {
            return Err(CompileError::InvalidName(name));
        }
        set.insert(name, compile_file(&path)?);
    }

    info!("compiled {} commands from {}", set.len(), dir.display());
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_command_names() {
        assert!(is_valid_command_name("DELETE_PATH"));
        assert!(is_valid_command_name("_x1"));
        assert!(!is_valid_command_name("1abc"));
        assert!(!is_valid_command_name("my-command"));
        assert!(!is_valid_command_name(""));
    }

    #[test]
    fn test_compile_source_string() {
        let cmd = compile("import os\nos.mkdir(\"{directory}\")\n").unwrap();
        assert_eq!(cmd.parameters, vec!["directory"]);
        assert!(cmd.source_path.is_none());
    }

    #[test]
    fn test_unknown_command() {
        let set = CommandSet::new();
        assert!(matches!(set.get("NOPE"), Err(CompileError::UnknownCommand(_))));
        assert!(set.is_empty());
    }

    #[test]
    fn test_json_round_trip_keeps_commands() {
        let mut set = CommandSet::new();
        set.insert("CREATE_DIR", compile("import os\nos.mkdir('{d}')").unwrap());
        let json = set.to_json().unwrap();
        assert!(json.contains("\"CREATE_DIR\""));
        let loaded = CommandSet::from_json(&json).unwrap();
        assert_eq!(loaded, set);
    }
}
