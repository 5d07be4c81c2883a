//! Property tests for the lexer and expression parser

use proptest::prelude::*;

use aiql::ast::{Expression, MathOp};
use aiql::{parse_expression, tokenize, TokenKind};

fn single(text: &str) -> (TokenKind, String) {
    let tokens = tokenize(text).unwrap();
    assert_eq!(tokens.len(), 2, "{:?} lexed as {:?}", text, tokens);
    assert_eq!(tokens[1].kind, TokenKind::Eof);
    (tokens[0].kind, tokens[0].value.clone())
}

/// Source text for one token of each sigil-carrying or quoted kind
fn marked_token() -> impl Strategy<Value = String> {
    prop_oneof![
        "![A-Z][a-z]{0,8}",
        "\\$[a-z][a-z0-9_]{0,8}",
        "\\$\\$[a-z][a-z0-9_]{0,8}",
        "##[0-9]{1,5}",
        "#[a-z][a-z_]{0,8}",
        "~[0-9]{1,2}\\.[0-9]{1,3}",
        "~~[0-9]{1,2}\\.[0-9]{1,3}",
        "@[0-9]\\.[0-9]{1,3}",
        "\"[A-Za-z0-9 ,.]{0,20}\"",
        "\\[[a-z][a-z_]{0,10}(:past|:future)?\\]",
    ]
}

proptest! {
    #[test]
    fn concept_round_trip(name in "[A-Za-z][A-Za-z0-9_]{0,30}") {
        let text = format!("<{}>", name);
        prop_assert_eq!(single(&text), (TokenKind::Concept, text.clone()));
    }

    #[test]
    fn relation_round_trip(name in "[a-z][a-z_]{0,20}") {
        let text = format!("[{}]", name);
        prop_assert_eq!(single(&text), (TokenKind::Relation, text.clone()));
    }

    #[test]
    fn integer_round_trip(n in 0u32..1_000_000) {
        let text = n.to_string();
        prop_assert_eq!(single(&text), (TokenKind::Number, text.clone()));
    }

    #[test]
    fn decimal_round_trip(whole in 0u32..10_000, frac in 0u32..1000) {
        let text = format!("{}.{}", whole, frac);
        prop_assert_eq!(single(&text), (TokenKind::Number, text.clone()));
    }

    #[test]
    fn lexeme_relexes_to_same_token(text in marked_token()) {
        let tokens = tokenize(&text).unwrap();
        prop_assert_eq!(tokens.len(), 2);
        prop_assert_eq!(&tokens[0].lexeme, &text);

        let again = tokenize(&tokens[0].lexeme).unwrap();
        prop_assert_eq!(again.len(), 2);
        prop_assert_eq!(again[0].kind, tokens[0].kind);
        prop_assert_eq!(&again[0].value, &tokens[0].value);
    }

    #[test]
    fn identifier_round_trip(name in "[a-z][a-z0-9_]{0,15}") {
        prop_assume!(TokenKind::keyword(&name).is_none());
        prop_assert_eq!(single(&name), (TokenKind::Identifier, name.clone()));
    }

    #[test]
    fn subtraction_chains_fold_left(values in prop::collection::vec(0u32..1000, 2..8)) {
        let source = values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(" - ");

        let expected = values[1..].iter().fold(
            Expression::number(f64::from(values[0])),
            |acc, v| Expression::math(MathOp::Sub, acc, Expression::number(f64::from(*v))),
        );

        prop_assert_eq!(parse_expression(&source).unwrap(), expected);
    }
}
