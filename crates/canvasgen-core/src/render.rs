//! Mermaid flowchart rendering.
//!
//! A [`RelationshipGraph`] is rendered as one fenced `flowchart LR` block per
//! lane. Roots are grouped by their lane key in first-seen order; each root is
//! walked depth first through its causal successors, so downstream facts land
//! in the lane of the root that reaches them.
//!
//! Within a block the output is, in order:
//!
//! 1. `classDef` lines for the node categories present in that block
//! 2. node declarations, per fact: the fact, its collaborators, its policy
//! 3. edges, per fact: collaborator edges, the policy edge, causal edges
//!
//! Nothing here iterates a hash container, so output is byte-for-byte stable.

use std::collections::HashSet;
use std::fmt::Write as _;

use tracing::info;

use crate::error::CanvasError;
use crate::facts::TypeFact;
use crate::graph::{RelationshipGraph, Role};
use crate::label::{command_label, escape_label, humanize, node_id};

const INDENT: &str = "    ";

const COLLABORATOR_FILL: &str = "fill:#FFE5FF;";
const POLICY_STYLE: &str = "classDef policies fill:#FFFFAD, font-style:italic;";
const DOMAIN_EVENT_STYLE: &str = "classDef domainEvents fill:#FFA431;";
const INTEGRATION_EVENT_STYLE: &str = "classDef integrationEvents fill:#FFDC5C;";

/// One fenced flowchart block and the lane it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaneDiagram {
    pub lane: String,
    pub flowchart: String,
}

/// Lane key of a fact.
///
/// The first namespace segment below the fact's module, or the second dotted
/// segment of the namespace when the module is not a namespace prefix.
pub fn default_lane_key(fact: &TypeFact) -> String {
    let namespace = fact.namespace();
    let below_module = if fact.module.is_empty() {
        None
    } else {
        namespace
            .strip_prefix(fact.module.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
    };
    match below_module {
        Some(rest) => rest.split('.').next().unwrap_or(rest).to_string(),
        None => namespace
            .split('.')
            .nth(1)
            .unwrap_or(namespace)
            .to_string(),
    }
}

/// Render the graph into lane diagrams.
///
/// Fails with `EmptyInput` when the graph has no root fact.
pub fn render<F>(graph: &RelationshipGraph<'_>, lane_key: F) -> Result<Vec<LaneDiagram>, CanvasError>
where
    F: Fn(&TypeFact) -> String,
{
    let roots = graph.roots();
    if roots.is_empty() {
        return Err(CanvasError::empty_input("flowchart"));
    }

    let mut lanes: Vec<(String, Vec<&TypeFact>)> = Vec::new();
    for &root in roots {
        let key = lane_key(root);
        match lanes.iter_mut().find(|(lane, _)| *lane == key) {
            Some((_, members)) => members.push(root),
            None => lanes.push((key, vec![root])),
        }
    }

    let diagrams: Vec<LaneDiagram> = lanes
        .into_iter()
        .map(|(lane, members)| LaneDiagram {
            flowchart: Flowchart::new(graph).build(&members),
            lane,
        })
        .collect();

    info!(
        roots = roots.len(),
        lanes = diagrams.len(),
        "flowchart rendered"
    );
    Ok(diagrams)
}

/// Join lane diagrams into markdown.
///
/// A single lane is emitted bare; several lanes each get a `###` heading and
/// a horizontal rule.
pub fn lanes_to_markdown(diagrams: &[LaneDiagram]) -> String {
    match diagrams {
        [single] => single.flowchart.clone(),
        _ => diagrams
            .iter()
            .map(|d| format!("### {}\n\n---\n\n{}", d.lane, d.flowchart))
            .collect::<Vec<_>>()
            .join("\n\n"),
    }
}

/// Render with [`default_lane_key`] and join into markdown.
pub fn render_markdown(graph: &RelationshipGraph<'_>) -> Result<String, CanvasError> {
    render(graph, default_lane_key).map(|diagrams| lanes_to_markdown(&diagrams))
}

/// Builder for a single lane block.
struct Flowchart<'g, 'a> {
    graph: &'g RelationshipGraph<'a>,
    declared: Vec<&'a TypeFact>,
    visited: HashSet<&'a str>,
}

impl<'g, 'a> Flowchart<'g, 'a> {
    fn new(graph: &'g RelationshipGraph<'a>) -> Self {
        Flowchart {
            graph,
            declared: Vec::new(),
            visited: HashSet::new(),
        }
    }

    fn build(mut self, roots: &[&'a TypeFact]) -> String {
        for &root in roots {
            self.visit(root);
        }

        let mut lines = self.style_lines();
        lines.extend(self.node_lines());
        lines.extend(self.edge_lines());

        let mut out = String::from("```mermaid\nflowchart LR\n");
        for line in lines {
            let _ = writeln!(out, "{}{}", INDENT, line);
        }
        out.push_str("```");
        out
    }

    /// Depth-first declaration order; the visited set breaks cycles.
    fn visit(&mut self, fact: &'a TypeFact) {
        if !self.visited.insert(fact.full_name.as_str()) {
            return;
        }
        self.declared.push(fact);
        for successor in self.graph.successors(&fact.full_name) {
            self.visit(successor);
        }
    }

    fn style_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();

        let present: HashSet<&str> = self
            .declared
            .iter()
            .flat_map(|f| self.graph.collaborators_of(&f.full_name))
            .map(|c| c.style_class.as_str())
            .collect();
        for class in self.graph.collaborator_classes() {
            if present.contains(class.as_str()) {
                lines.push(format!("classDef {} {}", class, COLLABORATOR_FILL));
            }
        }

        if self
            .declared
            .iter()
            .any(|f| self.graph.policy_of(&f.full_name).is_some())
        {
            lines.push(POLICY_STYLE.to_string());
        }
        if self.any_in_role(Role::DomainEvent) {
            lines.push(DOMAIN_EVENT_STYLE.to_string());
        }
        if self.any_in_role(Role::IntegrationEvent) {
            lines.push(INTEGRATION_EVENT_STYLE.to_string());
        }
        lines
    }

    fn any_in_role(&self, role: Role) -> bool {
        self.declared
            .iter()
            .any(|f| self.graph.role_of(&f.full_name) == Some(role))
    }

    fn node_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for fact in &self.declared {
            let id = node_id(&fact.full_name);
            let role = self.graph.role_of(&fact.full_name);
            let label = match role {
                Some(Role::Command) => command_label(fact.short_name()),
                _ => humanize(fact.short_name()),
            };
            lines.push(format!("{}[\"{}\"]", id, escape_label(&label)));
            if let Some(class) = role.and_then(|r| r.style_class()) {
                lines.push(format!("class {} {};", id, class));
            }

            for collaborator in self.graph.collaborators_of(&fact.full_name) {
                let collaborator_id = collaborator_node_id(&id, &collaborator.name);
                lines.push(format!(
                    "{}>\"{}\"]",
                    collaborator_id,
                    escape_label(&humanize(&collaborator.name))
                ));
                lines.push(format!(
                    "class {} {};",
                    collaborator_id, collaborator.style_class
                ));
            }

            if let Some(policy) = self.graph.policy_of(&fact.full_name) {
                let policy_id = policy_node_id(&id);
                let text = policy
                    .methods
                    .iter()
                    .map(|m| escape_label(&humanize(m)))
                    .collect::<Vec<_>>()
                    .join("<br/>");
                lines.push(format!("{}[/\"{}\"/]", policy_id, text));
                lines.push(format!("class {} policies;", policy_id));
            }
        }
        lines
    }

    fn edge_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        let mut seen = HashSet::new();
        let mut push = |line: String, lines: &mut Vec<String>| {
            if seen.insert(line.clone()) {
                lines.push(line);
            }
        };

        for fact in &self.declared {
            let id = node_id(&fact.full_name);
            for collaborator in self.graph.collaborators_of(&fact.full_name) {
                push(
                    format!("{} --> {}", collaborator_node_id(&id, &collaborator.name), id),
                    &mut lines,
                );
            }
            if self.graph.policy_of(&fact.full_name).is_some() {
                push(format!("{} --- {}", id, policy_node_id(&id)), &mut lines);
            }
            for successor in self.graph.successors(&fact.full_name) {
                push(
                    format!("{} -.-> {}", id, node_id(&successor.full_name)),
                    &mut lines,
                );
            }
        }
        lines
    }
}

fn collaborator_node_id(fact_id: &str, name: &str) -> String {
    format!("{}{}Collaborator", fact_id, node_id(name))
}

fn policy_node_id(fact_id: &str) -> String {
    format!("{}Policies", fact_id)
}
