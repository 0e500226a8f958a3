//! Name → position index over a graph's template list

use rustc_hash::FxHashMap;

use crate::error::{CredflowError, Result};

use super::Template;

/// O(1) template lookup by name
///
/// The template `Vec` is the arena; the index stores positions into it and
/// must be kept in step with inserts through [`TemplateIndex::upsert`].
#[derive(Debug, Default)]
pub struct TemplateIndex {
    by_name: FxHashMap<String, usize>,
}

impl TemplateIndex {
    /// Index `templates`; duplicate names are rejected
    pub fn build(templates: &[Template]) -> Result<Self> {
        let mut by_name =
            FxHashMap::with_capacity_and_hasher(templates.len(), Default::default());
        for (position, template) in templates.iter().enumerate() {
            if by_name.insert(template.name.clone(), position).is_some() {
                return Err(CredflowError::DuplicateTemplate {
                    name: template.name.clone(),
                });
            }
        }
        Ok(Self { by_name })
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Replace the template of the same name, or append it
    pub fn upsert(&mut self, templates: &mut Vec<Template>, template: Template) -> usize {
        match self.get(&template.name) {
            Some(position) => {
                templates[position] = template;
                position
            }
            None => {
                let position = templates.len();
                self.by_name.insert(template.name.clone(), position);
                templates.push(template);
                position
            }
        }
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
