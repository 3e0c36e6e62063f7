use super::{events_with, record};
use crate::error::{ErrorKind, SourcePosition};
use crate::parser::Parser;
use crate::syntax::{DirectiveKind, Syntax};

#[test]
fn unterminated_directive_is_a_syntax_error() {
    let syntax = Syntax::default();
    let err = events_with("line one\n  <?= name", &syntax).expect_err("should fail");
    assert_eq!(err.kind, ErrorKind::Syntax);
    assert_eq!(err.directive, Some(DirectiveKind::WriteEscaped));
    assert_eq!(
        err.position,
        Some(SourcePosition {
            offset: 11,
            line: 2,
            column: 3
        })
    );
}

#[test]
fn iterator_stops_after_error() {
    let syntax = Syntax::default();
    let mut parser = Parser::new("ok <? never closed", &syntax);
    assert!(matches!(parser.next(), Some(Ok(_))), "Leading text comes first");
    assert!(matches!(parser.next(), Some(Err(_))), "Then the error");
    assert!(parser.next().is_none(), "Nothing after the error");
    assert!(parser.next().is_none());
}

#[test]
fn parse_rejects_empty_markers() {
    let syntax = Syntax::default().with_markers(DirectiveKind::WriteUnescaped, "<?-", "");
    let err = record("anything", &syntax).expect_err("should fail");
    assert_eq!(err.kind, ErrorKind::Configuration);
}

#[test]
fn error_message_names_the_markers() {
    let err = events_with("<?: unclosed", &Syntax::default()).expect_err("should fail");
    let message = err.to_string();
    assert!(message.starts_with("syntax error"), "got: {message}");
    assert!(message.contains("`<?:`"), "got: {message}");
    assert!(message.contains("line 1, column 1"), "got: {message}");
}
