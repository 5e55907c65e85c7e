//! Unit tests for the tagged query tree: JSON interchange and rewriting
//! through the public rule API.

#[cfg(test)]
mod query_tree_tests {
    use cardquery::query_tree::{
        kinds, transform, Attr, AttrMatch, Node, Pattern, RewriteFn, RuleSet,
    };

    const PARSED_QUERY: &str = r#"{
        "name": "statements",
        "children": [
            {
                "name": "select",
                "children": [
                    { "name": "property", "attrs": { "name": "Status" } },
                    {
                        "name": "aggregate",
                        "attrs": { "function": "count" },
                        "children": [ { "name": "star" } ]
                    }
                ]
            },
            {
                "name": "where",
                "children": [
                    {
                        "name": "comparison",
                        "attrs": { "operator": ">=" },
                        "children": [
                            { "name": "property", "attrs": { "name": "Size" } },
                            { "name": "value", "attrs": { "value": 3 } }
                        ]
                    }
                ]
            }
        ]
    }"#;

    #[test]
    fn test_parser_json_matches_builder_api() {
        let parsed: Node = serde_json::from_str(PARSED_QUERY).unwrap();

        let built = Node::new(kinds::STATEMENTS)
            .with_child(
                Node::new(kinds::SELECT)
                    .with_child(Node::property("Status"))
                    .with_child(Node::aggregate("count", None)),
            )
            .with_child(Node::new(kinds::WHERE).with_child(Node::comparison(
                Node::property("Size"),
                ">=",
                Node::value(3_i64),
            )));

        assert_eq!(parsed, built);
    }

    #[test]
    fn test_attr_kinds_survive_json() {
        let node: Node = serde_json::from_str(
            r#"{ "name": "value", "attrs": { "a": true, "b": 2, "c": 2.5, "d": "x" } }"#,
        )
        .unwrap();

        assert_eq!(node.attr("a"), Some(&Attr::Bool(true)));
        assert_eq!(node.attr("b"), Some(&Attr::Int(2)));
        assert_eq!(node.attr("c"), Some(&Attr::Float(2.5)));
        assert_eq!(node.attr_str("d"), Some("x"));
    }

    #[test]
    fn test_descendants_are_pre_order() {
        let tree: Node = serde_json::from_str(PARSED_QUERY).unwrap();
        let properties: Vec<&str> = tree
            .descendants()
            .into_iter()
            .filter(|node| node.is(kinds::PROPERTY))
            .filter_map(|node| node.attr_str("name"))
            .collect();

        assert_eq!(properties, vec!["Status", "Size"]);
    }

    fn rename_size(_node: Node, renamed: &mut usize) -> Result<Node, String> {
        *renamed += 1;
        Ok(Node::property("Estimate"))
    }

    #[test]
    fn test_transform_rewrites_matching_nodes_only() {
        let tree: Node = serde_json::from_str(PARSED_QUERY).unwrap();
        let rules = RuleSet::<RewriteFn<usize, String>>::new().rule(
            "rename-size",
            Pattern::new(kinds::PROPERTY).with_attr("name", AttrMatch::EqualsIgnoreCase("size".into())),
            rename_size,
        );

        let mut renamed = 0;
        let outcome = transform(tree, &rules, &mut renamed).unwrap();
        assert!(outcome.is_yes());
        assert_eq!(renamed, 1);

        let rewritten = outcome.get_plan();
        assert!(rewritten.to_string().contains("property[name=Estimate]"));
        assert!(rewritten.to_string().contains("property[name=Status]"));
    }

    #[test]
    fn test_transform_without_match_reports_no_change() {
        let tree = Node::property("Status");
        let rules = RuleSet::<RewriteFn<usize, String>>::new().rule(
            "rename-size",
            Pattern::new(kinds::PROPERTY).with_attr("name", AttrMatch::Equals("Size".into())),
            rename_size,
        );

        let mut renamed = 0;
        let outcome = transform(tree.clone(), &rules, &mut renamed).unwrap();
        assert!(!outcome.is_yes());
        assert_eq!(outcome.get_plan(), tree);
    }
}
