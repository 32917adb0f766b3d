//! End-to-end compilation of command templates.

use std::fs;

use picox_compiler::{compile, compile_dir, generate_rust, CommandSet, CompileError};

const DOWNLOAD_FILE: &str = "\
with open('{pico_filename}', 'r') as f:
    print(f.read(), end='')
";

const CREATE_DIR: &str = "\
import os
os.mkdir(\"{directory}\")
";

#[test]
fn test_download_file_matches_known_output() {
    let cmd = compile(DOWNLOAD_FILE).unwrap();
    assert_eq!(
        cmd.template,
        r#"exec('try:\n    with open(\'{pico_filename}\', \'r\') as f:\n        print(f.read(), end=\'\')\n\nexcept Exception as e:\n    print(f\"{{str(e)}}FAILED---0dfe99a5-4543-4fc0-8986-5d7fd5e51d7b---ERROR\")')"#
    );
    assert_eq!(cmd.parameters, vec!["pico_filename"]);
}

#[test]
fn test_create_dir_matches_known_output() {
    let cmd = compile(CREATE_DIR).unwrap();
    assert_eq!(
        cmd.template,
        r#"exec('try:\n    import os\n    os.mkdir(\"{directory}\")\n\nexcept Exception as e:\n    print(f\"{{str(e)}}FAILED---0dfe99a5-4543-4fc0-8986-5d7fd5e51d7b---ERROR\")')"#
    );
}

#[test]
fn test_rendering_keeps_failure_handler_braces() {
    let cmd = compile(CREATE_DIR).unwrap();
    let line = cmd.render(&["logs"]).unwrap();
    assert!(line.contains(r#"os.mkdir(\"logs\")"#));
    assert!(line.contains(r#"print(f\"{str(e)}FAILED---"#));
    assert!(!line.contains('\n'));
}

#[test]
fn test_comments_and_fstrings() {
    let src = "# header\nname = '{who}'  # who to greet\nprint(f'hello {name}')\n";
    let cmd = compile(src).unwrap();
    assert_eq!(cmd.parameters, vec!["who"]);
    assert!(!cmd.template.contains("header"));
    assert!(!cmd.template.contains("greet"));

    let line = cmd.render_named(&[("who", "pico")]).unwrap();
    assert!(line.contains(r#"name = \'pico\'"#));
    assert!(line.contains(r#"print(f\'hello {name}\')"#));
}

#[test]
fn test_argument_count_mismatch() {
    let cmd = compile(DOWNLOAD_FILE).unwrap();
    assert!(matches!(
        cmd.render(&[]),
        Err(CompileError::ArgumentCount { expected: 1, actual: 0 })
    ));
}

#[test]
fn test_unterminated_string_is_reported() {
    assert!(matches!(
        compile("x = 'oops\n"),
        Err(CompileError::UnterminatedString { line: 1, .. })
    ));
}

#[test]
fn test_compile_dir() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("CREATE_DIR.py"), CREATE_DIR).unwrap();
    fs::write(dir.path().join("DOWNLOAD_FILE.py"), DOWNLOAD_FILE).unwrap();
    fs::write(dir.path().join("notes.txt"), "not a template").unwrap();

    let set = compile_dir(dir.path()).unwrap();
    assert_eq!(set.len(), 2);
    assert_eq!(set.get("CREATE_DIR").unwrap().parameters, vec!["directory"]);
    assert!(set.get("DOWNLOAD_FILE").unwrap().source_path.is_some());

    let json_path = dir.path().join("commands.json");
    set.save(&json_path).unwrap();
    let loaded = CommandSet::load(&json_path).unwrap();
    assert_eq!(loaded.commands, set.commands);

    let rust = generate_rust(&set);
    assert!(rust.contains("pub const ALL: &[::picox_compiler::StaticCommand] = &[CREATE_DIR, DOWNLOAD_FILE];"));
}

#[test]
fn test_compile_dir_rejects_bad_names() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("make-dir.py"), CREATE_DIR).unwrap();
    assert!(matches!(compile_dir(dir.path()), Err(CompileError::InvalidName(name)) if name == "make-dir"));
}
