//! Relationship graph: role sets, collaborators, policies and the edges
//! between them.
//!
//! The builder runs once over a [`FactStore`]:
//!
//! 1. Every configured role selector is evaluated into a [`RoleSet`].
//! 2. Role sets with a handler spec are linked to their handler facts
//!    through the link template (`handles` edges).
//! 3. Facts of later role sets constructed by one of those handlers are
//!    connected to the source fact (`instantiates` edges). The handler is
//!    an intermediate and never becomes a rendered node.
//! 4. Call sites whose caller matches a collaborator definition produce a
//!    collaborator node per (collaborator, consuming fact).
//! 5. Call sites whose method markers match a policy definition add the
//!    method to the single policy node of the consuming fact.
//!
//! Every collection is an ordered `Vec`; hash sets are used for membership
//! checks only, so the graph is identical across runs for identical input.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::error::CanvasError;
use crate::facts::{CallSite, FactStore, TypeFact};
use crate::label::{humanize, node_id};
use crate::link::{self, LinkTemplate};
use crate::selector::{Predicate, Selector, SelectorError};

// ============================================================================
// Definitions
// ============================================================================

/// Position of a role set in the causal chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Command,
    DomainEvent,
    IntegrationEvent,
}

impl Role {
    /// Roles in chain order.
    pub const CHAIN: [Role; 3] = [Role::Command, Role::DomainEvent, Role::IntegrationEvent];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Command => "commands",
            Role::DomainEvent => "domain events",
            Role::IntegrationEvent => "integration events",
        }
    }

    /// Style class of rendered facts in this role, if any.
    pub fn style_class(&self) -> Option<&'static str> {
        match self {
            Role::Command => None,
            Role::DomainEvent => Some("domainEvents"),
            Role::IntegrationEvent => Some("integrationEvents"),
        }
    }
}

/// Handler selection and the template linking handlers to sources.
#[derive(Debug, Clone)]
pub struct HandlerSpec {
    pub selector: Selector,
    pub link: LinkTemplate,
}

/// A configured role selector.
#[derive(Debug, Clone)]
pub struct RoleDefinition {
    pub role: Role,
    pub selector: Selector,
    pub handler: Option<HandlerSpec>,
    /// Fail with `EmptyInput` when the selector matches nothing.
    pub required: bool,
}

impl RoleDefinition {
    pub fn new(role: Role, selector: Selector) -> Self {
        RoleDefinition {
            role,
            selector,
            handler: None,
            required: false,
        }
    }

    pub fn with_handler(mut self, selector: Selector, link: LinkTemplate) -> Self {
        self.handler = Some(HandlerSpec { selector, link });
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// A named class of callers shown as collaborators.
#[derive(Debug, Clone)]
pub struct CollaboratorDefinition {
    pub name: String,
    /// Optional collaborator type; selects the `<type>Collaborators` style.
    pub kind: Option<String>,
    pub selector: Selector,
}

impl CollaboratorDefinition {
    pub fn new(name: impl Into<String>, selector: Selector) -> Self {
        CollaboratorDefinition {
            name: name.into(),
            kind: None,
            selector,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn style_class(&self) -> String {
        match &self.kind {
            Some(kind) => format!("{}Collaborators", kind),
            None => "collaborators".to_string(),
        }
    }
}

/// Marker pattern turning a calling method into a policy.
#[derive(Debug, Clone)]
pub struct PolicyDefinition {
    predicate: Predicate,
}

impl PolicyDefinition {
    pub fn new(marker_pattern: &str) -> Result<Self, SelectorError> {
        Ok(PolicyDefinition {
            predicate: Predicate::method_marker(marker_pattern)?,
        })
    }

    pub fn matches(&self, site: &CallSite) -> bool {
        self.predicate.matches(site)
    }
}

/// Everything the builder needs, already compiled.
#[derive(Debug, Clone, Default)]
pub struct GraphDefinition {
    pub roles: Vec<RoleDefinition>,
    pub collaborators: Vec<CollaboratorDefinition>,
    pub policies: Vec<PolicyDefinition>,
}

impl GraphDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_role(mut self, role: RoleDefinition) -> Self {
        self.roles.push(role);
        self
    }

    pub fn with_collaborator(mut self, collaborator: CollaboratorDefinition) -> Self {
        self.collaborators.push(collaborator);
        self
    }

    pub fn with_policy(mut self, policy: PolicyDefinition) -> Self {
        self.policies.push(policy);
        self
    }

    /// True when no role is configured; such a canvas has no flowchart.
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

// ============================================================================
// Graph
// ============================================================================

/// Facts matching one role selector, in store order.
#[derive(Debug, Clone)]
pub struct RoleSet<'a> {
    pub role: Role,
    pub members: Vec<&'a TypeFact>,
}

impl RoleSet<'_> {
    pub fn contains(&self, full_name: &str) -> bool {
        self.members.iter().any(|m| m.full_name == full_name)
    }
}

/// Endpoint of an edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Fact(String),
    Collaborator { name: String, consumer: String },
    Policy { consumer: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    Instantiates,
    Handles,
    PolicyOf,
}

/// Directed, derived relation. Identity is the whole triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: NodeRef,
    pub to: NodeRef,
    pub kind: EdgeKind,
}

/// Collaborator instance attached to one consuming fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollaboratorNode {
    pub name: String,
    pub style_class: String,
    pub consumer: String,
}

/// Policies attached to one consuming fact, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyNode {
    pub consumer: String,
    pub methods: Vec<String>,
}

/// Role-tagged, edge-tagged graph ready for rendering.
#[derive(Debug, Clone)]
pub struct RelationshipGraph<'a> {
    role_sets: Vec<RoleSet<'a>>,
    edges: Vec<Edge>,
    collaborators: Vec<CollaboratorNode>,
    policies: Vec<PolicyNode>,
    collaborator_classes: Vec<String>,
}

impl<'a> RelationshipGraph<'a> {
    pub fn role_sets(&self) -> &[RoleSet<'a>] {
        &self.role_sets
    }

    pub fn role_set(&self, role: Role) -> Option<&RoleSet<'a>> {
        self.role_sets.iter().find(|set| set.role == role)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn collaborators(&self) -> &[CollaboratorNode] {
        &self.collaborators
    }

    pub fn policies(&self) -> &[PolicyNode] {
        &self.policies
    }

    /// Collaborator style classes in configuration order, without duplicates.
    pub fn collaborator_classes(&self) -> &[String] {
        &self.collaborator_classes
    }

    /// Chain roots: members of the first non-empty role set in chain order.
    pub fn roots(&self) -> &[&'a TypeFact] {
        Role::CHAIN
            .iter()
            .filter_map(|&role| self.role_set(role))
            .find(|set| !set.members.is_empty())
            .map(|set| set.members.as_slice())
            .unwrap_or(&[])
    }

    /// Earliest role a fact plays.
    pub fn role_of(&self, full_name: &str) -> Option<Role> {
        Role::CHAIN
            .iter()
            .copied()
            .find(|&role| self.role_set(role).is_some_and(|set| set.contains(full_name)))
    }

    /// Look up a member of any role set.
    pub fn fact(&self, full_name: &str) -> Option<&'a TypeFact> {
        self.role_sets
            .iter()
            .flat_map(|set| set.members.iter().copied())
            .find(|m| m.full_name == full_name)
    }

    /// Facts caused by `full_name` through a handler, in discovery order.
    pub fn successors(&self, full_name: &str) -> Vec<&'a TypeFact> {
        self.edges
            .iter()
            .filter(|e| e.kind == EdgeKind::Instantiates)
            .filter_map(|e| match (&e.from, &e.to) {
                (NodeRef::Fact(from), NodeRef::Fact(to)) if from == full_name => self.fact(to),
                _ => None,
            })
            .collect()
    }

    /// Handler facts resolved for `full_name`.
    pub fn handlers_of(&self, full_name: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.kind == EdgeKind::Handles)
            .filter_map(|e| match (&e.from, &e.to) {
                (NodeRef::Fact(from), NodeRef::Fact(to)) if from == full_name => Some(to.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn collaborators_of(&self, full_name: &str) -> Vec<&CollaboratorNode> {
        self.collaborators
            .iter()
            .filter(|c| c.consumer == full_name)
            .collect()
    }

    pub fn policy_of(&self, full_name: &str) -> Option<&PolicyNode> {
        self.policies.iter().find(|p| p.consumer == full_name)
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Accumulates edges without duplicates, keeping first-insertion order.
#[derive(Default)]
struct EdgeList {
    edges: Vec<Edge>,
    seen: HashSet<Edge>,
}

impl EdgeList {
    fn push(&mut self, edge: Edge) -> bool {
        if self.seen.insert(edge.clone()) {
            self.edges.push(edge);
            true
        } else {
            false
        }
    }
}

/// Build the relationship graph for a fact store.
pub fn build_graph<'a>(
    store: &'a FactStore,
    definition: &GraphDefinition,
) -> Result<RelationshipGraph<'a>, CanvasError> {
    let mut role_sets = Vec::with_capacity(definition.roles.len());
    for role_def in &definition.roles {
        let members: Vec<&TypeFact> = store
            .iter()
            .filter(|fact| role_def.selector.matches(*fact))
            .collect();
        if members.is_empty() && role_def.required {
            return Err(CanvasError::empty_input(role_def.role.as_str()));
        }
        info!(
            role = role_def.role.as_str(),
            selector = role_def.selector.source(),
            members = members.len(),
            "role set resolved"
        );
        role_sets.push(RoleSet {
            role: role_def.role,
            members,
        });
    }
    // Chain order is fixed regardless of configuration order.
    role_sets.sort_by_key(|set| set.role);

    let mut edges = EdgeList::default();
    link_chain(store, definition, &role_sets, &mut edges)?;

    let rendered = rendered_facts(&role_sets);
    let collaborators = attach_collaborators(&rendered, &definition.collaborators, &mut edges);
    let policies = attach_policies(&rendered, &definition.policies, &mut edges);

    let mut collaborator_classes: Vec<String> = Vec::new();
    for def in &definition.collaborators {
        let class = def.style_class();
        if !collaborator_classes.contains(&class) {
            collaborator_classes.push(class);
        }
    }

    Ok(RelationshipGraph {
        role_sets,
        edges: edges.edges,
        collaborators,
        policies,
        collaborator_classes,
    })
}

/// Steps 2 and 3: source → handler, then handler-constructed facts of later
/// roles back to the source.
fn link_chain(
    store: &FactStore,
    definition: &GraphDefinition,
    role_sets: &[RoleSet<'_>],
    edges: &mut EdgeList,
) -> Result<(), CanvasError> {
    for (index, set) in role_sets.iter().enumerate() {
        let Some(spec) = definition
            .roles
            .iter()
            .find(|d| d.role == set.role)
            .and_then(|d| d.handler.as_ref())
        else {
            continue;
        };

        let handlers: Vec<&TypeFact> = store
            .iter()
            .filter(|fact| spec.selector.matches(*fact))
            .collect();
        let later = &role_sets[index + 1..];

        for (source, resolved) in link::resolve(&set.members, &handlers, &spec.link)? {
            for handler in resolved {
                edges.push(Edge {
                    from: NodeRef::Fact(source.full_name.clone()),
                    to: NodeRef::Fact(handler.full_name.clone()),
                    kind: EdgeKind::Handles,
                });
                for caused in later
                    .iter()
                    .flat_map(|s| s.members.iter())
                    .filter(|m| constructed_by(m, &handler.full_name))
                {
                    edges.push(Edge {
                        from: NodeRef::Fact(source.full_name.clone()),
                        to: NodeRef::Fact(caused.full_name.clone()),
                        kind: EdgeKind::Instantiates,
                    });
                }
            }
        }
    }
    Ok(())
}

fn constructed_by(fact: &TypeFact, caller: &str) -> bool {
    fact.call_sites.iter().any(|site| site.caller == caller)
}

/// Members of every role set, each once, in chain then store order.
fn rendered_facts<'a>(role_sets: &[RoleSet<'a>]) -> Vec<&'a TypeFact> {
    let mut seen = HashSet::new();
    role_sets
        .iter()
        .flat_map(|set| set.members.iter().copied())
        .filter(|fact| seen.insert(fact.full_name.as_str()))
        .collect()
}

/// Step 4. A call site belongs to the first collaborator definition it
/// matches; sites of collaborators sharing a node id into the same fact
/// collapse onto the first one.
fn attach_collaborators(
    facts: &[&TypeFact],
    definitions: &[CollaboratorDefinition],
    edges: &mut EdgeList,
) -> Vec<CollaboratorNode> {
    let mut nodes = Vec::new();
    if definitions.is_empty() {
        return nodes;
    }
    let mut claimed = HashSet::new();
    for fact in facts {
        for site in &fact.call_sites {
            let Some(def) = definitions.iter().find(|d| d.selector.matches(site)) else {
                debug!(fact = %fact.full_name, caller = %site.caller, "caller is not a collaborator");
                continue;
            };
            if !claimed.insert((node_id(&def.name), fact.full_name.as_str())) {
                continue;
            }
            let added = edges.push(Edge {
                from: NodeRef::Collaborator {
                    name: def.name.clone(),
                    consumer: fact.full_name.clone(),
                },
                to: NodeRef::Fact(fact.full_name.clone()),
                kind: EdgeKind::Instantiates,
            });
            if added {
                nodes.push(CollaboratorNode {
                    name: def.name.clone(),
                    style_class: def.style_class(),
                    consumer: fact.full_name.clone(),
                });
            }
        }
    }
    nodes
}

/// Step 5. One policy node per fact, one entry per distinct method label.
fn attach_policies(
    facts: &[&TypeFact],
    definitions: &[PolicyDefinition],
    edges: &mut EdgeList,
) -> Vec<PolicyNode> {
    let mut nodes = Vec::new();
    if definitions.is_empty() {
        return nodes;
    }
    for fact in facts {
        let mut seen = HashSet::new();
        let methods: Vec<String> = fact
            .call_sites
            .iter()
            .filter(|site| definitions.iter().any(|d| d.matches(site)))
            .filter(|site| seen.insert(humanize(&site.method)))
            .map(|site| site.method.clone())
            .collect();
        if methods.is_empty() {
            continue;
        }
        edges.push(Edge {
            from: NodeRef::Policy {
                consumer: fact.full_name.clone(),
            },
            to: NodeRef::Fact(fact.full_name.clone()),
            kind: EdgeKind::PolicyOf,
        });
        nodes.push(PolicyNode {
            consumer: fact.full_name.clone(),
            methods,
        });
    }
    nodes
}
