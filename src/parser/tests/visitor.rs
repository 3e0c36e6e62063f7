use super::record;
use crate::syntax::Syntax;

#[test]
fn visitor_receives_text_and_offsets() {
    let calls = record("Hi <?= who ?><? if x { ?>!<? } ?>", &Syntax::default())
        .expect("parse failed");
    assert_eq!(
        calls,
        vec![
            "plain:Hi @0",
            "write_escaped: who @3",
            "control: if x { @13",
            "plain:!@25",
            "control: } @26",
        ]
    );
}

#[test]
fn visitor_sees_events_before_the_error() {
    let mut recorder = super::Recorder::default();
    let result = crate::parser::parse("a<?- b ?><?", &Syntax::default(), &mut recorder);
    assert!(result.is_err());
    assert_eq!(recorder.calls, vec!["plain:a@0", "write_unescaped: b @1"]);
}
