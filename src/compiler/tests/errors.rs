use std::path::Path;

use crate::{DirectiveKind, ErrorKind, Options, TemplateCompiler, TemplateError};

fn compile_error(src: &str) -> TemplateError {
    TemplateCompiler::default()
        .compile(src)
        .expect_err("compilation should fail")
}

#[test]
fn unterminated_directive_is_a_syntax_error() {
    let err = compile_error("Hello <?= name");
    assert_eq!(err.kind, ErrorKind::Syntax);
    assert_eq!(err.directive, Some(DirectiveKind::WriteEscaped));
    let position = err.position.expect("should carry a position");
    assert_eq!((position.offset, position.line, position.column), (6, 1, 7));
}

#[test]
fn failing_compiler_control_points_at_its_directive() {
    let err = compile_error("first line\n  <?: no_such_binding() ?>");
    assert_eq!(err.kind, ErrorKind::Evaluation);
    assert_eq!(err.directive, Some(DirectiveKind::CompilerControl));
    let position = err.position.expect("should carry a position");
    assert_eq!(position.line, 2);
    assert!(err.info.contains("no_such_binding"), "got {err}");
}

#[test]
fn multi_line_compiler_control_maps_to_its_directive() {
    let err = compile_error("<?: let a = 1; ?>\n<?:\nlet b = 2;\nthrow \"boom\";\n?>");
    assert_eq!(err.kind, ErrorKind::Evaluation);
    let position = err.position.expect("should carry a position");
    assert_eq!(position.line, 2);
    assert!(err.info.contains("boom"), "got {err}");
}

#[test]
fn compiler_programs_cannot_catch_errors() {
    let err = compile_error(r#"<?: try { include("p", "x.html"); } catch (e) { } ?>"#);
    assert_eq!(err.kind, ErrorKind::Evaluation);
}

#[test]
fn eval_is_unavailable_at_compile_time() {
    let err = compile_error(r#"<?: eval("write(\"const x = 1;\")") ?>"#);
    assert_eq!(err.kind, ErrorKind::Evaluation);
}

#[test]
fn eval_is_unavailable_at_render_time() {
    let err = compile_error(r#"<?= eval("1 + 1") ?>"#);
    assert_eq!(err.kind, ErrorKind::Evaluation);
}

#[test]
fn broken_injected_code_fails_when_loaded() {
    let compiler = TemplateCompiler::default();
    let src = r#"<?: write("let = ;") ?>"#;

    let code = compiler.code(src).expect("the program itself runs");
    assert!(code.contains("let = ;"));

    let err = compiler.compile(src).expect_err("the artifact does not parse");
    assert_eq!(err.kind, ErrorKind::Evaluation);
}

#[test]
fn invalid_binding_names_are_rejected() {
    for src in [
        r#"<?: embed_object("not valid", 1) ?>"#,
        r#"<?: template("1st", || { }) ?>"#,
    ] {
        let err = compile_error(src);
        assert_eq!(err.kind, ErrorKind::Configuration, "{src}");
    }
}

#[test]
fn unknown_template_options_are_rejected() {
    let err = compile_error(r#"<?: template("d", #{strict: true}, || { }) ?>"#);
    assert_eq!(err.kind, ErrorKind::Configuration);
}

#[test]
fn unknown_encoding_is_a_configuration_error() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("page.html");
    std::fs::write(&path, "x").expect("Failed to write template");

    let err = TemplateCompiler::new(Options::new().with_encoding("klingon"))
        .compile_file(&path)
        .expect_err("should fail");
    assert_eq!(err.kind, ErrorKind::Configuration);
}

#[test]
fn display_names_the_file_and_directive() {
    let err = TemplateCompiler::new(Options::new().with_filename("views/page.html"))
        .compile("\n<?- value")
        .expect_err("should fail");
    let message = err.to_string();
    assert!(message.starts_with("syntax error in "), "got {message}");
    assert!(
        message.contains(&Path::new("views/page.html").display().to_string()),
        "got {message}"
    );
    assert!(message.contains("directive at line 2, column 1"), "got {message}");
}

#[test]
fn conflicting_markers_are_rejected() {
    let mut syntax = crate::Syntax::default();
    syntax.set_markers(DirectiveKind::Control, crate::Markers::new("<?=", "?>"));
    let err = TemplateCompiler::new(Options::new().with_syntax(syntax))
        .code("text")
        .expect_err("should fail");
    assert_eq!(err.kind, ErrorKind::Configuration);
}
