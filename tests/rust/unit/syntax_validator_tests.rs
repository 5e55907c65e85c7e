//! Unit tests for the constructs cross-project queries refuse.

#[cfg(test)]
mod syntax_validator_tests {
    use cardquery::query_tree::{kinds, Node};
    use cardquery::query_validator::SyntaxValidator;
    use cardquery::sql_plan::CompileError;

    fn select_status_where(condition: Node) -> Node {
        Node::new(kinds::STATEMENTS)
            .with_child(Node::new(kinds::SELECT).with_child(Node::property("Status")))
            .with_child(Node::new(kinds::WHERE).with_child(condition))
    }

    #[test]
    fn test_plain_query_passes() {
        let tree = select_status_where(Node::comparison(
            Node::property("Status"),
            "=",
            Node::value("open"),
        ));
        assert!(SyntaxValidator::new().validate(&tree).is_empty());
    }

    #[test]
    fn test_every_unsupported_construct_is_reported() {
        let tree = Node::new(kinds::STATEMENTS)
            .with_child(
                Node::new(kinds::SELECT)
                    .with_child(Node::property("Status"))
                    .with_child(Node::aggregate("median", Some("Size"))),
            )
            .with_child(
                Node::new(kinds::WHERE)
                    .with_child(Node::new(kinds::NOT).with_child(Node::new(kinds::THIS_CARD))),
            )
            .with_child(Node::new(kinds::ORDER_BY));

        let errors = SyntaxValidator::new().validate(&tree);
        let constructs: Vec<String> = errors
            .iter()
            .filter_map(|error| match error {
                CompileError::SyntaxUnsupported { construct, .. } => Some(construct.clone()),
                _ => None,
            })
            .collect();

        assert_eq!(constructs.len(), 4);
        assert!(constructs.contains(&"THIS CARD".to_string()));
        assert!(constructs.contains(&"NOT".to_string()));
        assert!(constructs.contains(&"ORDER BY".to_string()));
    }

    #[test]
    fn test_number_property_is_rejected_in_any_case() {
        let tree = select_status_where(Node::comparison(
            Node::property("NUMBER"),
            "=",
            Node::value(12_i64),
        ));

        let result = SyntaxValidator::new().validate_strict(&tree);
        match result {
            Err(CompileError::SyntaxUnsupported { construct, message }) => {
                assert_eq!(construct, "NUMBER");
                assert!(message.contains("not supported in cross-project queries"));
            }
            other => panic!("expected SyntaxUnsupported, got {:?}", other),
        }
    }
}
