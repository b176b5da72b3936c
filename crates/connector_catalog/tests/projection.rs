use connector_catalog::{
    render_operation, selection_to_fields, selection_to_tree, tree_to_fields, FieldPath,
    OperationKind, Query, QueryField, SelectionMask,
};
use serde_json::json;

fn mask(entries: &[(&str, bool)]) -> SelectionMask {
    entries
        .iter()
        .map(|(path, selected)| (FieldPath::new(path.split('.')), *selected))
        .collect()
}

fn leaf(name: &str) -> QueryField {
    QueryField::new(name)
}

fn branch(name: &str, fields: Vec<QueryField>) -> QueryField {
    QueryField::new(name).with_fields(fields)
}

#[test]
fn empty_mask_yields_no_fields() {
    let mask = SelectionMask::new();
    assert!(selection_to_tree(&mask).is_empty());
    assert!(selection_to_fields(&mask).is_empty());
}

#[test]
fn mask_with_nothing_selected_yields_no_fields() {
    let mask = mask(&[("a", false), ("a.b", false)]);
    assert!(selection_to_fields(&mask).is_empty());
}

#[test]
fn nested_selection_implies_its_ancestors() {
    let mask = mask(&[("a.b.c", true)]);
    assert_eq!(
        selection_to_fields(&mask),
        vec![branch("a", vec![branch("b", vec![leaf("c")])])]
    );
}

#[test]
fn ancestor_and_descendant_share_one_node() {
    let mask = mask(&[("x", true), ("x.y", true)]);
    let fields = selection_to_fields(&mask);
    assert_eq!(fields, vec![branch("x", vec![leaf("y")])]);
}

#[test]
fn descendant_listed_before_ancestor_still_merges() {
    let mask = mask(&[("x.y", true), ("x", true), ("z", true)]);
    assert_eq!(
        selection_to_fields(&mask),
        vec![branch("x", vec![leaf("y")]), leaf("z")]
    );
}

#[test]
fn every_selected_path_is_present_and_nothing_else() {
    let mask = mask(&[
        ("code", true),
        ("name", true),
        ("native", false),
        ("continent", true),
        ("continent.code", true),
        ("continent.name", false),
        ("languages", true),
        ("languages.code", true),
        ("languages.name", true),
    ]);
    let fields = selection_to_fields(&mask);

    assert_eq!(
        fields,
        vec![
            leaf("code"),
            leaf("name"),
            branch("continent", vec![leaf("code")]),
            branch("languages", vec![leaf("code"), leaf("name")]),
        ]
    );

    let tree = selection_to_tree(&mask);
    for path in mask.selected_paths() {
        let mut node = &tree;
        for segment in path.segments() {
            node = node
                .get(segment)
                .unwrap_or_else(|| panic!("missing {segment} along {path}"));
        }
    }
}

#[test]
fn projection_is_repeatable_and_leaves_the_mask_untouched() {
    let mask = mask(&[("a.b", true), ("c", true), ("d", false)]);
    let before = mask.clone();

    let first = tree_to_fields(&selection_to_tree(&mask));
    let second = tree_to_fields(&selection_to_tree(&mask));

    assert_eq!(first, second);
    assert_eq!(mask, before);
    assert_eq!(
        mask.iter().map(|(p, s)| (p.to_string(), s)).collect::<Vec<_>>(),
        vec![
            ("a.b".to_string(), true),
            ("c".to_string(), true),
            ("d".to_string(), false)
        ]
    );
}

#[test]
fn intermediate_fields_are_never_collapsed() {
    let mask = mask(&[("outer.inner.leaf", true), ("outer.inner", true)]);
    let fields = selection_to_fields(&mask);
    assert!(!fields[0].is_leaf());
    assert!(!fields[0].fields[0].is_leaf());
    assert!(fields[0].fields[0].fields[0].is_leaf());
}

#[test]
fn catalog_breadcrumbs_project_into_a_countries_query() {
    let mask = SelectionMask::from_breadcrumbs([
        (vec!["properties", "code"], true),
        (vec!["properties", "emoji"], false),
        (vec!["properties", "continent"], true),
        (vec!["properties", "continent", "properties", "name"], true),
        (vec!["properties", "languages"], true),
        (
            vec!["properties", "languages", "items", "properties", "name"],
            true,
        ),
    ]);
    let query = Query::new("countries", selection_to_fields(&mask));
    assert_eq!(
        render_operation(OperationKind::Query, &[query]),
        "query { countries { code continent { name } languages { name } } }"
    );
}

#[test]
fn schema_default_selects_the_whole_shape() {
    let schema = json!({
        "type": "object",
        "properties": {
            "code": {"type": "string"},
            "continent": {
                "type": "object",
                "properties": {
                    "code": {"type": "string"},
                    "name": {"type": "string"}
                }
            },
            "languages": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {"code": {"type": "string"}}
                }
            }
        }
    });
    let fields = selection_to_fields(&SelectionMask::from_schema(&schema));
    let rendered: Vec<String> = fields.iter().map(ToString::to_string).collect();
    assert_eq!(
        rendered,
        vec!["code", "continent { code name }", "languages { code }"]
    );
}
