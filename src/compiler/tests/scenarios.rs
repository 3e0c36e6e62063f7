use rhai::Dynamic;

use super::{compile, compile_with, render, render_with, write_files};
use crate::{ErrorKind, Locals, Options, TemplateCompiler};

#[test]
fn escaped_write_of_a_local() {
    let rendered = render("Hello <?= name ?>!", Locals::new().with("name", "World"));
    assert_eq!(rendered, "Hello World!");
}

#[test]
fn compile_time_write_defines_a_constant() {
    assert_eq!(render(r#"<?: write("const v = 42;") ?><?= v ?>"#, Locals::new()), "42");
}

#[test]
fn include_from_disk() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    write_files(dir.path(), &[("simple.html", "<p><?= text ?></p>\n")]);

    let options = Options::new().with_filename(dir.path().join("test.html"));
    let rendered = render_with(
        r#"<?: include("s", "simple.html") ?><?- s.call(#{text: "X"}) ?>"#,
        options,
        Locals::new(),
    );
    assert!(rendered.starts_with("<p>X</p>"), "got {rendered:?}");
}

#[test]
fn nested_template_called_twice() {
    let rendered = render(
        r#"<?: template("d", || { ?><?= value ?><?: }) ?><?- d.call(#{value: 7}) ?>, <?- d.call(#{value: 14}) ?>"#,
        Locals::new(),
    );
    assert_eq!(rendered, "7, 14");
}

#[tokio::test]
async fn asynchronous_template_waits_for_pending_values() {
    let template = compile_with("<?= value ?>", Options::new().asynchronous(true));
    let locals = Locals::new().with_pending("value", async { Ok(Dynamic::from_int(42)) });
    let rendered = template.render_async(locals).await.expect("render failed");
    assert_eq!(rendered, "42");
}

#[test]
fn unterminated_directive_fails_to_compile() {
    let err = TemplateCompiler::default()
        .compile("before <?= name")
        .expect_err("should fail");
    assert_eq!(err.kind, ErrorKind::Syntax);
}

#[test]
fn compilation_is_deterministic() {
    let src = "<ul><? for item in items { ?><li><?= item ?></li><? } ?></ul>";
    assert_eq!(compile(src).source(), compile(src).source());
}
