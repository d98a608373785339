use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A detection category, named by its `<supercategory>/<category>` folders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Category {
    pub id: u32,
    pub name: String,
    pub supercategory: String,
}

impl Category {
    pub fn key(&self) -> CategoryKey {
        CategoryKey::new(&self.supercategory, &self.name)
    }
}

/// Identity of a category independent of any numbering
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CategoryKey {
    pub supercategory: String,
    pub name: String,
}

impl CategoryKey {
    pub fn new(supercategory: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            supercategory: supercategory.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.supercategory, self.name)
    }
}

/// Ordered category list with contiguous 1-based IDs
#[derive(Debug, Clone, Default)]
pub struct Taxonomy {
    categories: Vec<Category>,
    index: HashMap<CategoryKey, u32>,
}

impl Taxonomy {
    /// Register `key`, returning its ID. First-seen keys get the next ID.
    pub fn insert(&mut self, key: CategoryKey) -> u32 {
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        let id = self.categories.len() as u32 + 1;
        self.categories.push(Category {
            id,
            name: key.name.clone(),
            supercategory: key.supercategory.clone(),
        });
        self.index.insert(key, id);
        id
    }

    /// Re-index an existing category list into 1..=N, keeping its order.
    ///
    /// Fails on empty names or a repeated `(supercategory, name)` pair.
    pub fn reindex(categories: &[Category]) -> std::result::Result<Self, String> {
        let mut taxonomy = Self::default();
        for category in categories {
            if category.name.trim().is_empty() || category.supercategory.trim().is_empty() {
                return Err(format!("category {} has an empty name or supercategory", category.id));
            }
            let key = category.key();
            if taxonomy.index.contains_key(&key) {
                return Err(format!("category {key} is listed more than once"));
            }
            taxonomy.insert(key);
        }
        Ok(taxonomy)
    }

    pub fn id_of(&self, key: &CategoryKey) -> Option<u32> {
        self.index.get(key).copied()
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(id: u32, supercategory: &str, name: &str) -> Category {
        Category {
            id,
            name: name.to_string(),
            supercategory: supercategory.to_string(),
        }
    }

    #[test]
    fn test_first_seen_order() {
        let mut taxonomy = Taxonomy::default();
        assert_eq!(taxonomy.insert(CategoryKey::new("vehicle", "car")), 1);
        assert_eq!(taxonomy.insert(CategoryKey::new("bird", "owl")), 2);
        assert_eq!(taxonomy.insert(CategoryKey::new("vehicle", "car")), 1);
        assert_eq!(taxonomy.len(), 2);
        assert_eq!(taxonomy.categories()[1], category(2, "bird", "owl"));
    }

    #[test]
    fn test_same_name_different_supercategory() {
        let mut taxonomy = Taxonomy::default();
        let a = taxonomy.insert(CategoryKey::new("toy", "bear"));
        let b = taxonomy.insert(CategoryKey::new("animal", "bear"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_reindex_is_contiguous() {
        let listed = vec![category(7, "bird", "eagle"), category(3, "bird", "owl")];
        let taxonomy = Taxonomy::reindex(&listed).unwrap();
        assert_eq!(taxonomy.id_of(&CategoryKey::new("bird", "eagle")), Some(1));
        assert_eq!(taxonomy.id_of(&CategoryKey::new("bird", "owl")), Some(2));
        assert_eq!(taxonomy.id_of(&CategoryKey::new("bird", "crow")), None);
    }

    #[test]
    fn test_reindex_rejects_duplicates() {
        let listed = vec![category(1, "bird", "owl"), category(2, "bird", "owl")];
        assert!(Taxonomy::reindex(&listed).is_err());
        assert!(Taxonomy::reindex(&[category(1, "bird", " ")]).is_err());
    }
}
