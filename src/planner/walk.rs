//! Traversal from an injection target down to its leaf containers

use tracing::warn;

use crate::error::{CredflowError, Result};
use crate::graph::{Template, TemplateIndex, TemplateType};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Container/Script templates reachable from `root`, each listed once
///
/// Three-colour DFS: reaching a Gray node means the references loop back
/// into the current path.
pub(super) fn reachable_leaves(templates: &[Template], index: &TemplateIndex, root: usize) -> Result<Vec<usize>> {
    let mut colors = vec![Color::White; templates.len()];
    let mut stack: Vec<usize> = Vec::new();
    let mut leaves = Vec::new();

    fn dfs(
        node: usize,
        templates: &[Template],
        index: &TemplateIndex,
        colors: &mut [Color],
        stack: &mut Vec<usize>,
        leaves: &mut Vec<usize>,
    ) -> Result<()> {
        colors[node] = Color::Gray;
        stack.push(node);

        let template = &templates[node];
        match template.template_type() {
            TemplateType::Container | TemplateType::Script => leaves.push(node),
            TemplateType::Steps | TemplateType::Dag => {
                for step in template.external_refs() {
                    warn!(
                        template = %template.name,
                        step = %step,
                        "skipping step that references an external template"
                    );
                }
                for child in template.child_refs() {
                    let next = index.get(child).ok_or_else(|| CredflowError::MissingTemplate {
                        name: child.to_string(),
                    })?;
                    match colors[next] {
                        Color::Gray => {
                            let start = stack.iter().position(|&n| n == next).unwrap_or(0);
                            let cycle: Vec<&str> = stack[start..]
                                .iter()
                                .map(|&n| templates[n].name.as_str())
                                .collect();
                            return Err(CredflowError::CycleDetected {
                                cycle: format!("{} → {}", cycle.join(" → "), child),
                            });
                        }
                        Color::White => dfs(next, templates, index, colors, stack, leaves)?,
                        Color::Black => {}
                    }
                }
            }
            TemplateType::Suspend | TemplateType::Resource | TemplateType::Unknown => {}
        }

        stack.pop();
        colors[node] = Color::Black;
        Ok(())
    }

    dfs(root, templates, index, &mut colors, &mut stack, &mut leaves)?;
    Ok(leaves)
}
