use rrk_ckan_sync::domain::{CategoryNode, CategoryRef};
use rrk_ckan_sync::taxonomy::{find_by_name, find_category, is_unique_title};

fn hierarchy() -> Vec<CategoryNode> {
    serde_json::from_str(
        r#"[
            {
                "taxonomy_item_name": "Fire Dynamics",
                "key": "0",
                "label": "Fire Dynamics",
                "children": [
                    {
                        "taxonomy_item_name": "Fire Return Interval Departure (FRID)",
                        "key": "0-0",
                        "label": "Fire Return Interval Departure (FRID)",
                        "children": [
                            {"dataset_id": 11, "dataset_name": "Mean Percent FRID"},
                            {"dataset_id": 12, "dataset_name": "Mean Condition Class"}
                        ]
                    },
                    {"dataset_id": 10, "dataset_name": "Burn Probability"}
                ]
            },
            {"label": "stray node"},
            {
                "taxonomy_item_name": "Forest Structure",
                "key": "1",
                "label": "Forest Structure",
                "children": [
                    {"dataset_id": 11, "dataset_name": "Mean Percent FRID"},
                    {
                        "taxonomy_item_name": "Empty",
                        "key": "1-0",
                        "label": "Empty",
                        "children": []
                    }
                ]
            }
        ]"#,
    )
    .unwrap()
}

fn category(key: &str, label: &str) -> Option<CategoryRef> {
    Some(CategoryRef {
        key: key.to_string(),
        label: label.to_string(),
    })
}

#[test]
fn leaf_listed_after_subcategory_still_belongs_to_parent() {
    assert_eq!(
        find_category(10, &hierarchy()),
        category("0", "Fire Dynamics")
    );
}

#[test]
fn nested_leaf_resolves_to_its_immediate_parent() {
    assert_eq!(
        find_category(12, &hierarchy()),
        category("0-0", "Fire Return Interval Departure (FRID)")
    );
}

#[test]
fn duplicate_id_resolves_depth_first() {
    assert_eq!(
        find_category(11, &hierarchy()),
        category("0-0", "Fire Return Interval Departure (FRID)")
    );
}

#[test]
fn missing_id_and_empty_forest() {
    assert_eq!(find_category(99, &hierarchy()), None);
    assert_eq!(find_category(10, &[]), None);
}

#[test]
fn titles_by_name() {
    let forest = hierarchy();
    assert_eq!(find_by_name("Mean Percent FRID", &forest), vec![11, 11]);
    assert_eq!(find_by_name("Nope", &forest), Vec::<i64>::new());
    assert!(is_unique_title("Burn Probability", &forest));
    assert!(!is_unique_title("Mean Percent FRID", &forest));
}
