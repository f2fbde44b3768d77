use crate::domain::{CategoryNode, CategoryRef};

/// Finds the category that directly contains the leaf for `dataset_id`.
///
/// Depth-first and left-to-right: a category's own dataset leaves are checked
/// before any of its sub-categories are searched, and the first match wins
/// when an id appears under several categories.
pub fn find_category(dataset_id: i64, forest: &[CategoryNode]) -> Option<CategoryRef> {
    for node in forest {
        let CategoryNode::Category {
            key,
            label,
            children,
            ..
        } = node
        else {
            continue;
        };

        let mut subcategories = Vec::new();
        for child in children {
            match child {
                CategoryNode::Dataset { dataset_id: id, .. } if *id == dataset_id => {
                    return Some(CategoryRef {
                        key: key.clone(),
                        label: label.clone(),
                    });
                }
                CategoryNode::Dataset { .. } => {}
                other => subcategories.push(other),
            }
        }

        if let Some(found) = find_in(dataset_id, &subcategories) {
            return Some(found);
        }
    }
    None
}

fn find_in(dataset_id: i64, nodes: &[&CategoryNode]) -> Option<CategoryRef> {
    nodes
        .iter()
        .find_map(|node| find_category(dataset_id, std::slice::from_ref(*node)))
}

/// Ids of every dataset leaf named `name`, shallowest level first.
pub fn find_by_name(name: &str, forest: &[CategoryNode]) -> Vec<i64> {
    let mut found = Vec::new();
    let mut level: Vec<&CategoryNode> = forest.iter().collect();
    while !level.is_empty() {
        let mut next = Vec::new();
        for node in level {
            match node {
                CategoryNode::Category { children, .. } => next.extend(children.iter()),
                CategoryNode::Dataset {
                    dataset_id,
                    dataset_name,
                } if dataset_name == name => found.push(*dataset_id),
                _ => {}
            }
        }
        level = next;
    }
    found
}

pub fn is_unique_title(name: &str, forest: &[CategoryNode]) -> bool {
    find_by_name(name, forest).len() == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forest() -> Vec<CategoryNode> {
        vec![
            CategoryNode::category(
                "0",
                "Fire Dynamics",
                vec![
                    CategoryNode::dataset(1, "Burn Probability"),
                    CategoryNode::category(
                        "0-0",
                        "Fire Return Interval Departure (FRID)",
                        vec![CategoryNode::dataset(2, "Mean Percent FRID")],
                    ),
                ],
            ),
            CategoryNode::category(
                "1",
                "Forest Structure",
                vec![CategoryNode::dataset(3, "Mean Percent FRID")],
            ),
        ]
    }

    #[test]
    fn immediate_parent_is_returned() {
        let found = find_category(2, &forest()).unwrap();
        assert_eq!(found.key, "0-0");
        assert_eq!(found.label, "Fire Return Interval Departure (FRID)");
    }

    #[test]
    fn absent_id_yields_none() {
        assert_eq!(find_category(99, &forest()), None);
    }

    #[test]
    fn names_collected_across_categories() {
        assert_eq!(find_by_name("Mean Percent FRID", &forest()), vec![3, 2]);
        assert!(is_unique_title("Burn Probability", &forest()));
        assert!(!is_unique_title("Mean Percent FRID", &forest()));
    }
}
