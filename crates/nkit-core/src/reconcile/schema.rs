use crate::model::{CategoryMap, RemoteSchema, SelectOption};

/// Colors assigned to new options, cycling by index.
pub const PALETTE: [&str; 9] = [
    "red", "blue", "green", "yellow", "purple", "pink", "orange", "brown", "gray",
];

/// Result of comparing the tag column schema against the category names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaPlan {
    /// Options missing from the schema, with their assigned colors.
    pub new_options: Vec<SelectOption>,
    /// Full option list to persist: existing options untouched, then the new ones.
    pub options: Vec<SelectOption>,
}

impl SchemaPlan {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.new_options.is_empty()
    }

    pub fn new_names(&self) -> impl Iterator<Item = &str> {
        self.new_options.iter().map(|o| o.name.as_str())
    }
}

/// Plan the schema growth needed for `categories`.
///
/// Name matching is exact and case-sensitive. A missing category at position
/// `i` of the category map gets `PALETTE[i % PALETTE.len()]`, so colors stay
/// stable as categories are added over several runs.
#[must_use]
pub fn plan_schema(schema: &RemoteSchema, categories: &CategoryMap) -> SchemaPlan {
    let new_options: Vec<SelectOption> = categories
        .names()
        .enumerate()
        .filter(|(_, name)| !schema.has_option(name))
        .map(|(i, name)| SelectOption::new(name, PALETTE[i % PALETTE.len()]))
        .collect();

    let mut options = schema.options.clone();
    options.extend(new_options.iter().cloned());

    SchemaPlan {
        new_options,
        options,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(options: &[(&str, &str)]) -> RemoteSchema {
        RemoteSchema {
            column: "tags".to_string(),
            exists: true,
            options: options
                .iter()
                .map(|(name, color)| SelectOption {
                    id: Some(format!("id-{name}")),
                    name: (*name).to_string(),
                    color: Some((*color).to_string()),
                })
                .collect(),
        }
    }

    #[test]
    fn new_categories_are_appended_with_palette_colors() {
        let plan = plan_schema(
            &schema(&[("X", "gray")]),
            &CategoryMap::from_pairs([("A", Vec::<String>::new()), ("B", Vec::new())]),
        );
        let names: Vec<&str> = plan.options.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["X", "A", "B"]);
        assert_eq!(plan.options[0].color.as_deref(), Some("gray"));
        assert_eq!(plan.options[0].id.as_deref(), Some("id-X"));
        assert_eq!(plan.options[1].color.as_deref(), Some("red"));
        assert_eq!(plan.options[2].color.as_deref(), Some("blue"));
        assert_eq!(plan.new_names().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn existing_categories_need_no_write() {
        let plan = plan_schema(
            &schema(&[("A", "pink")]),
            &CategoryMap::from_pairs([("A", vec!["g1"])]),
        );
        assert!(plan.is_noop());
        assert_eq!(plan.options, schema(&[("A", "pink")]).options);
    }

    #[test]
    fn matching_is_case_sensitive() {
        let plan = plan_schema(
            &schema(&[("a", "red")]),
            &CategoryMap::from_pairs([("A", vec!["g"])]),
        );
        assert_eq!(plan.new_names().collect::<Vec<_>>(), vec!["A"]);
    }

    #[test]
    fn color_follows_position_in_category_map() {
        let plan = plan_schema(
            &schema(&[("A", "red")]),
            &CategoryMap::from_pairs([("A", vec!["g1"]), ("B", vec!["g2"])]),
        );
        assert_eq!(plan.new_names().collect::<Vec<_>>(), vec!["B"]);
        assert_eq!(plan.new_options[0].color.as_deref(), Some("blue"));
    }

    #[test]
    fn palette_wraps_around() {
        let names: Vec<String> = (0..11).map(|i| format!("c{i}")).collect();
        let map = CategoryMap::from_pairs(names.iter().map(|n| (n.clone(), Vec::<String>::new())));
        let plan = plan_schema(&schema(&[]), &map);
        assert_eq!(plan.new_options[9].color.as_deref(), Some("red"));
        assert_eq!(plan.new_options[10].color.as_deref(), Some("blue"));
    }
}
