//! Rust source generation for build scripts.
//!
//! Build scripts compile a template directory and embed the result as
//! `StaticCommand` constants, so the binary ships without template files.

use crate::artifact::CommandSet;

/// Generate Rust source declaring one constant per command plus `ALL`.
pub fn generate_rust(set: &CommandSet) -> String {
    let mut out = String::new();
    out.push_str("// @generated by picox-compiler. Do not edit.\n\n");

    for (name, command) in &set.commands {
        let params: Vec<String> = command
            .parameters
            .iter()
            .map(|p| format!("{:?}", p))
            .collect();
        out.push_str(&format!(
            "pub const {const_name}: ::picox_compiler::StaticCommand = ::picox_compiler::StaticCommand {{\n    name: {name:?},\n    template: {template:?},\n    parameters: &[{params}],\n}};\n\n",
            const_name = name.to_uppercase(),
            name = name,
            template = command.template,
            params = params.join(", "),
        ));
    }

    let names: Vec<String> = set.commands.keys().map(|n| n.to_uppercase()).collect();
    out.push_str(&format!(
        "pub const ALL: &[::picox_compiler::StaticCommand] = &[{}];\n",
        names.join(", ")
    ));
    out
}
