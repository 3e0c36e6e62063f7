use rhai::Dynamic;

use super::write_files;
use crate::{ErrorKind, Locals, Options, TemplateCompiler, TemplateError};

fn async_compiler() -> TemplateCompiler {
    TemplateCompiler::new(Options::new().asynchronous(true))
}

#[tokio::test]
async fn compile_async_matches_compile() {
    let compiler = TemplateCompiler::default();
    let src = "<?: output(\"static \") ?><?= word ?>";
    let blocking = compiler.compile(src).expect("should compile");
    let offloaded = compiler.compile_async(src).await.expect("should compile");
    assert_eq!(blocking.source(), offloaded.source());
    assert!(!offloaded.is_async());
}

#[tokio::test]
async fn compile_file_async_reads_from_disk() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    write_files(
        dir.path(),
        &[
            ("page.html", r#"<?: include("p", "part.html") ?>[<?- p.call(locals) ?>]"#),
            ("part.html", "<?= who ?>"),
        ],
    );

    let template = async_compiler()
        .compile_file_async(dir.path().join("page.html"))
        .await
        .expect("should compile");
    assert!(template.is_async());
    assert!(template.source().starts_with("/* async */ |locals|"));

    let rendered = template
        .render_async(Locals::new().with("who", "me"))
        .await
        .expect("should render");
    assert_eq!(rendered, "[me]");
}

#[tokio::test]
async fn compile_async_reports_errors() {
    let err = TemplateCompiler::default()
        .compile_async("<?= never closed")
        .await
        .expect_err("should fail");
    assert_eq!(err.kind, ErrorKind::Syntax);
}

#[tokio::test]
async fn pending_values_resolve_before_rendering() {
    let template = async_compiler()
        .compile("<?= a ?> and <?= b ?>")
        .expect("should compile");
    let locals = Locals::new()
        .with_pending("a", async { Ok::<_, TemplateError>(Dynamic::from_int(1)) })
        .with_pending("b", async {
            tokio::task::yield_now().await;
            Ok::<_, TemplateError>(Dynamic::from("two".to_string()))
        });
    assert_eq!(template.render_async(locals).await.expect("should render"), "1 and two");
}

#[tokio::test]
async fn pending_failure_fails_the_render() {
    let template = async_compiler().compile("<?= a ?>").expect("should compile");
    let locals = Locals::new().with_pending("a", async {
        Err::<Dynamic, _>(TemplateError::resolution("lookup failed"))
    });
    let err = template.render_async(locals).await.expect_err("should fail");
    assert_eq!(err.kind, ErrorKind::Resolution);
    assert_eq!(err.info, "lookup failed");
}

#[tokio::test]
async fn synchronous_templates_reject_pending_values() {
    let template = TemplateCompiler::default()
        .compile("<?= a ?>")
        .expect("should compile");
    let locals = Locals::new().with_pending("a", async { Ok::<_, TemplateError>(Dynamic::UNIT) });
    let err = template.render_async(locals).await.expect_err("should fail");
    assert_eq!(err.kind, ErrorKind::Evaluation);
    assert!(err.info.contains("`a`"), "got {err}");
}

#[tokio::test]
async fn async_templates_render_plain_records() {
    let template = async_compiler().compile("<?= n * 2 ?>").expect("should compile");
    let rendered = template
        .render_async(Locals::new().with("n", 21_i64))
        .await
        .expect("should render");
    assert_eq!(rendered, "42");
}

#[test]
fn async_templates_still_render_synchronously_without_pending_values() {
    let template = async_compiler().compile("sync").expect("should compile");
    assert_eq!(template.render(Locals::new()).expect("should render"), "sync");
}
