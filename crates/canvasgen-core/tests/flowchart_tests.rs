//! Integration tests for the graph builder and flowchart renderer.
//!
//! Each test builds facts in memory, runs them through `build_graph` and
//! `render_markdown`, and compares the exact flowchart text.

use canvasgen_core::error::CanvasError;
use canvasgen_core::facts::{CallSite, FactStore, TypeFact};
use canvasgen_core::graph::{
    build_graph, CollaboratorDefinition, GraphDefinition, PolicyDefinition, Role, RoleDefinition,
};
use canvasgen_core::link::LinkTemplate;
use canvasgen_core::render::{default_lane_key, render, render_markdown};
use canvasgen_core::selector::parse_selector;

const POLICY_MARKER: &str = r#"Trait("Category", "BoundedContextCanvasPolicy")"#;
const POLICY_PATTERN: &str = r#"Trait\("Category", "BoundedContextCanvasPolicy"\)"#;

/// Every fact is a command.
fn commands() -> GraphDefinition {
    GraphDefinition::new().with_role(RoleDefinition::new(
        Role::Command,
        parse_selector("type").unwrap(),
    ))
}

fn collaborator(name: &str, named: &str) -> CollaboratorDefinition {
    CollaboratorDefinition::new(
        name,
        parse_selector(&format!("class named '{}'", named)).unwrap(),
    )
}

fn flowchart(facts: Vec<TypeFact>, definition: &GraphDefinition) -> Result<String, CanvasError> {
    let store = FactStore::new(facts);
    let graph = build_graph(&store, definition)?;
    render_markdown(&graph)
}

/// A fenced flowchart block with the given body lines.
fn block(lines: &[&str]) -> String {
    let mut out = String::from("```mermaid\nflowchart LR\n");
    for line in lines {
        out.push_str("    ");
        out.push_str(line);
        out.push('\n');
    }
    out.push_str("```");
    out
}

// ============================================================================
// Single facts and collaborators
// ============================================================================

#[test]
fn test_empty_collection_cannot_be_rendered() {
    let err = flowchart(Vec::new(), &commands()).unwrap_err();
    assert!(matches!(err, CanvasError::EmptyInput { .. }));
}

#[test]
fn test_simple_command() {
    let text = flowchart(
        vec![TypeFact::class("Test.Namespace.OrderNewProductCommand")],
        &commands(),
    )
    .unwrap();
    assert_eq!(
        text,
        block(&[r#"TestNamespaceOrderNewProductCommand["Order new product"]"#])
    );
}

#[test]
fn test_non_configured_collaborator_ignored() {
    let facts = vec![TypeFact::class("Test.Namespace.OrderNewProductCommand")
        .instantiated_by(CallSite::new("UserController", "Post"))];
    assert_eq!(
        flowchart(facts, &commands()).unwrap(),
        block(&[r#"TestNamespaceOrderNewProductCommand["Order new product"]"#])
    );
}

#[test]
fn test_collaborator_instantiating_command() {
    let facts = vec![TypeFact::class("Test.Namespace.OrderNewProductCommand")
        .instantiated_by(CallSite::new("UserController", "Post"))];
    let definition = commands().with_collaborator(collaborator("WebApp", ".*Controller$"));
    assert_eq!(
        flowchart(facts, &definition).unwrap(),
        block(&[
            "classDef collaborators fill:#FFE5FF;",
            r#"TestNamespaceOrderNewProductCommand["Order new product"]"#,
            r#"TestNamespaceOrderNewProductCommandWebAppCollaborator>"Web app"]"#,
            "class TestNamespaceOrderNewProductCommandWebAppCollaborator collaborators;",
            "TestNamespaceOrderNewProductCommandWebAppCollaborator --> TestNamespaceOrderNewProductCommand",
        ])
    );
}

#[test]
fn test_two_collaborators_of_same_command() {
    let facts = vec![TypeFact::class("Test.Namespace.OrderNewProductCommand")
        .instantiated_by(CallSite::new("UserController", "Post"))
        .instantiated_by(CallSite::new("MobileController", "Post"))];
    let definition = commands()
        .with_collaborator(collaborator("WebApp", "UserController"))
        .with_collaborator(collaborator("MobileApp", "MobileController"));
    assert_eq!(
        flowchart(facts, &definition).unwrap(),
        block(&[
            "classDef collaborators fill:#FFE5FF;",
            r#"TestNamespaceOrderNewProductCommand["Order new product"]"#,
            r#"TestNamespaceOrderNewProductCommandWebAppCollaborator>"Web app"]"#,
            "class TestNamespaceOrderNewProductCommandWebAppCollaborator collaborators;",
            r#"TestNamespaceOrderNewProductCommandMobileAppCollaborator>"Mobile app"]"#,
            "class TestNamespaceOrderNewProductCommandMobileAppCollaborator collaborators;",
            "TestNamespaceOrderNewProductCommandWebAppCollaborator --> TestNamespaceOrderNewProductCommand",
            "TestNamespaceOrderNewProductCommandMobileAppCollaborator --> TestNamespaceOrderNewProductCommand",
        ])
    );
}

#[test]
fn test_collaborator_duplicated_per_command() {
    let facts = vec![
        TypeFact::class("Test.Namespace.OrderNewProductCommand")
            .instantiated_by(CallSite::new("UserController", "OrderNewProduct")),
        TypeFact::class("Test.Namespace.CancelOrderCommand")
            .instantiated_by(CallSite::new("UserController", "CancelOrder")),
    ];
    let definition = commands().with_collaborator(collaborator("WebApp", ".*Controller$"));
    assert_eq!(
        flowchart(facts, &definition).unwrap(),
        block(&[
            "classDef collaborators fill:#FFE5FF;",
            r#"TestNamespaceOrderNewProductCommand["Order new product"]"#,
            r#"TestNamespaceOrderNewProductCommandWebAppCollaborator>"Web app"]"#,
            "class TestNamespaceOrderNewProductCommandWebAppCollaborator collaborators;",
            r#"TestNamespaceCancelOrderCommand["Cancel order"]"#,
            r#"TestNamespaceCancelOrderCommandWebAppCollaborator>"Web app"]"#,
            "class TestNamespaceCancelOrderCommandWebAppCollaborator collaborators;",
            "TestNamespaceOrderNewProductCommandWebAppCollaborator --> TestNamespaceOrderNewProductCommand",
            "TestNamespaceCancelOrderCommandWebAppCollaborator --> TestNamespaceCancelOrderCommand",
        ])
    );
}

#[test]
fn test_two_callers_of_same_collaborator_create_single_link() {
    let facts = vec![TypeFact::class("Test.Namespace.OrderNewProductCommand")
        .instantiated_by(CallSite::new("UserController", "OrderNewProduct"))
        .instantiated_by(CallSite::new("AdminController", "OrderNewProduct"))];
    let definition = commands().with_collaborator(collaborator("WebApp", ".*Controller$"));
    assert_eq!(
        flowchart(facts, &definition).unwrap(),
        block(&[
            "classDef collaborators fill:#FFE5FF;",
            r#"TestNamespaceOrderNewProductCommand["Order new product"]"#,
            r#"TestNamespaceOrderNewProductCommandWebAppCollaborator>"Web app"]"#,
            "class TestNamespaceOrderNewProductCommandWebAppCollaborator collaborators;",
            "TestNamespaceOrderNewProductCommandWebAppCollaborator --> TestNamespaceOrderNewProductCommand",
        ])
    );
}

#[test]
fn test_typed_collaborator_style_class() {
    let facts = vec![TypeFact::class("Test.Namespace.OrderNewProductCommand")
        .instantiated_by(CallSite::new("UserController", "Post"))];
    let definition = commands()
        .with_collaborator(collaborator("WebApp", ".*Controller$").with_kind("front"));
    let text = flowchart(facts, &definition).unwrap();
    assert!(text.contains("    classDef frontCollaborators fill:#FFE5FF;\n"));
    assert!(text.contains(
        "    class TestNamespaceOrderNewProductCommandWebAppCollaborator frontCollaborators;\n"
    ));
    assert!(!text.contains("classDef collaborators"));
}

// ============================================================================
// Policies
// ============================================================================

fn with_policies() -> GraphDefinition {
    commands().with_policy(PolicyDefinition::new(POLICY_PATTERN).unwrap())
}

#[test]
fn test_command_policy_is_test_method_name() {
    let facts = vec![TypeFact::class("Test.Namespace.OrderNewProductCommand").instantiated_by(
        CallSite::new(
            "Tests.OrderNewProductCommandTests",
            "Must_contains_at_least_one_item_to_order",
        )
        .with_marker("Fact")
        .with_marker(POLICY_MARKER),
    )];
    assert_eq!(
        flowchart(facts, &with_policies()).unwrap(),
        block(&[
            "classDef policies fill:#FFFFAD, font-style:italic;",
            r#"TestNamespaceOrderNewProductCommand["Order new product"]"#,
            r#"TestNamespaceOrderNewProductCommandPolicies[/"Must contains at least one item to order"/]"#,
            "class TestNamespaceOrderNewProductCommandPolicies policies;",
            "TestNamespaceOrderNewProductCommand --- TestNamespaceOrderNewProductCommandPolicies",
        ])
    );
}

#[test]
fn test_command_policies_separated_with_line_break() {
    let facts = vec![TypeFact::class("Test.Namespace.OrderNewProductCommand")
        .instantiated_by(
            CallSite::new(
                "Tests.OrderNewProductCommandTests",
                "Must_contains_at_least_one_item_to_order",
            )
            .with_marker("Fact")
            .with_marker(POLICY_MARKER),
        )
        .instantiated_by(
            CallSite::new("Tests.OrderNewProductCommandTests", "Cannot_be_altered")
                .with_marker("Fact")
                .with_marker(POLICY_MARKER),
        )];
    assert_eq!(
        flowchart(facts, &with_policies()).unwrap(),
        block(&[
            "classDef policies fill:#FFFFAD, font-style:italic;",
            r#"TestNamespaceOrderNewProductCommand["Order new product"]"#,
            r#"TestNamespaceOrderNewProductCommandPolicies[/"Must contains at least one item to order<br/>Cannot be altered"/]"#,
            "class TestNamespaceOrderNewProductCommandPolicies policies;",
            "TestNamespaceOrderNewProductCommand --- TestNamespaceOrderNewProductCommandPolicies",
        ])
    );
}

#[test]
fn test_unmarked_method_is_not_a_policy() {
    let facts = vec![TypeFact::class("Test.Namespace.OrderNewProductCommand").instantiated_by(
        CallSite::new("Tests.OrderNewProductCommandTests", "Builds_command").with_marker("Fact"),
    )];
    assert_eq!(
        flowchart(facts, &with_policies()).unwrap(),
        block(&[r#"TestNamespaceOrderNewProductCommand["Order new product"]"#])
    );
}

// ============================================================================
// Lanes
// ============================================================================

#[test]
fn test_split_into_lanes() {
    let facts = vec![
        TypeFact::class("Test.Namespace.Order.OrderNewProductCommand").in_module("Test.Namespace"),
        TypeFact::class("Test.Namespace.Contact.EditContactDetailsCommand")
            .in_module("Test.Namespace"),
    ];
    let expected = format!(
        "### Order\n\n---\n\n{}\n\n### Contact\n\n---\n\n{}",
        block(&[r#"TestNamespaceOrderOrderNewProductCommand["Order new product"]"#]),
        block(&[r#"TestNamespaceContactEditContactDetailsCommand["Edit contact details"]"#]),
    );
    assert_eq!(flowchart(facts, &commands()).unwrap(), expected);
}

#[test]
fn test_lanes_follow_first_seen_order() {
    let facts = vec![
        TypeFact::class("Shop.B.One").in_module("Shop"),
        TypeFact::class("Shop.A.Two").in_module("Shop"),
        TypeFact::class("Shop.B.Three").in_module("Shop"),
    ];
    let store = FactStore::new(facts);
    let graph = build_graph(&store, &commands()).unwrap();
    let lanes: Vec<String> = render(&graph, default_lane_key)
        .unwrap()
        .into_iter()
        .map(|d| d.lane)
        .collect();
    assert_eq!(lanes, vec!["B", "A"]);
}

#[test]
fn test_custom_lane_key() {
    let facts = vec![
        TypeFact::class("Shop.Orders.PlaceOrder"),
        TypeFact::class("Shop.Billing.Charge"),
    ];
    let store = FactStore::new(facts);
    let graph = build_graph(&store, &commands()).unwrap();
    let diagrams = render(&graph, |_| "All".to_string()).unwrap();
    assert_eq!(diagrams.len(), 1);
    assert_eq!(diagrams[0].lane, "All");
}

// ============================================================================
// Handler chains
// ============================================================================

fn chain_definition() -> GraphDefinition {
    GraphDefinition::new()
        .with_role(
            RoleDefinition::new(
                Role::Command,
                parse_selector("class implementing '.*ICommand$'").unwrap(),
            )
            .with_handler(
                parse_selector("class implementing '.*ICommandHandler<.*>$'").unwrap(),
                LinkTemplate::parse("T -> .*ICommandHandler<T>$").unwrap(),
            ),
        )
        .with_role(
            RoleDefinition::new(
                Role::DomainEvent,
                parse_selector("class implementing 'IDomainEvent$'").unwrap(),
            )
            .with_handler(
                parse_selector("class implementing '.*IDomainEventListener<.*>$'").unwrap(),
                LinkTemplate::parse("T -> .*IDomainEventListener<T>$").unwrap(),
            ),
        )
        .with_role(RoleDefinition::new(
            Role::IntegrationEvent,
            parse_selector("class implementing 'IIntegrationEvent'").unwrap(),
        ))
}

fn register_user_facts() -> Vec<TypeFact> {
    vec![
        TypeFact::class("App.RegisterUserCommand").implementing("App.ICommand"),
        TypeFact::class("App.RegisterUserCommandHandler")
            .implementing("App.ICommandHandler<App.RegisterUserCommand>"),
        TypeFact::class("App.UserRegistered")
            .implementing("App.IDomainEvent")
            .instantiated_by(CallSite::new("App.RegisterUserCommandHandler", "Handle")),
        TypeFact::class("App.UserRegisteredListener")
            .implementing("App.IDomainEventListener<App.UserRegistered>"),
        TypeFact::class("App.UserCreatedIntegrationEvent")
            .implementing("App.IIntegrationEvent")
            .instantiated_by(CallSite::new("App.UserRegisteredListener", "On")),
    ]
}

#[test]
fn test_command_to_event_through_handler() {
    let facts = register_user_facts().into_iter().take(3).collect();
    assert_eq!(
        flowchart(facts, &chain_definition()).unwrap(),
        block(&[
            "classDef domainEvents fill:#FFA431;",
            r#"AppRegisterUserCommand["Register user"]"#,
            r#"AppUserRegistered["User registered"]"#,
            "class AppUserRegistered domainEvents;",
            "AppRegisterUserCommand -.-> AppUserRegistered",
        ])
    );
}

#[test]
fn test_two_hop_chain() {
    assert_eq!(
        flowchart(register_user_facts(), &chain_definition()).unwrap(),
        block(&[
            "classDef domainEvents fill:#FFA431;",
            "classDef integrationEvents fill:#FFDC5C;",
            r#"AppRegisterUserCommand["Register user"]"#,
            r#"AppUserRegistered["User registered"]"#,
            "class AppUserRegistered domainEvents;",
            r#"AppUserCreatedIntegrationEvent["User created integration event"]"#,
            "class AppUserCreatedIntegrationEvent integrationEvents;",
            "AppRegisterUserCommand -.-> AppUserRegistered",
            "AppUserRegistered -.-> AppUserCreatedIntegrationEvent",
        ])
    );
}

#[test]
fn test_missing_handler_renders_command_alone() {
    let facts = vec![
        TypeFact::class("App.RegisterUserCommand").implementing("App.ICommand"),
        TypeFact::class("App.UserRegistered")
            .implementing("App.IDomainEvent")
            .instantiated_by(CallSite::new("App.RegisterUserCommandHandler", "Handle")),
    ];
    assert_eq!(
        flowchart(facts, &chain_definition()).unwrap(),
        block(&[r#"AppRegisterUserCommand["Register user"]"#])
    );
}

#[test]
fn test_events_render_as_roots_without_commands() {
    let facts: Vec<TypeFact> = register_user_facts().into_iter().skip(2).collect();
    assert_eq!(
        flowchart(facts, &chain_definition()).unwrap(),
        block(&[
            "classDef domainEvents fill:#FFA431;",
            "classDef integrationEvents fill:#FFDC5C;",
            r#"AppUserRegistered["User registered"]"#,
            "class AppUserRegistered domainEvents;",
            r#"AppUserCreatedIntegrationEvent["User created integration event"]"#,
            "class AppUserCreatedIntegrationEvent integrationEvents;",
            "AppUserRegistered -.-> AppUserCreatedIntegrationEvent",
        ])
    );
}

#[test]
fn test_shared_event_declared_once() {
    let facts = vec![
        TypeFact::class("App.A").implementing("App.ICommand"),
        TypeFact::class("App.B").implementing("App.ICommand"),
        TypeFact::class("App.AHandler").implementing("App.ICommandHandler<App.A>"),
        TypeFact::class("App.BHandler").implementing("App.ICommandHandler<App.B>"),
        TypeFact::class("App.Changed")
            .implementing("App.IDomainEvent")
            .instantiated_by(CallSite::new("App.AHandler", "Handle"))
            .instantiated_by(CallSite::new("App.BHandler", "Handle")),
    ];
    let text = flowchart(facts, &chain_definition()).unwrap();
    assert_eq!(text.matches(r#"AppChanged["Changed"]"#).count(), 1);
    assert!(text.contains("    AppA -.-> AppChanged\n"));
    assert!(text.contains("    AppB -.-> AppChanged\n"));
}

#[test]
fn test_rendering_is_idempotent() {
    let store = FactStore::new(register_user_facts());
    let graph = build_graph(&store, &chain_definition()).unwrap();
    let first = render_markdown(&graph).unwrap();
    let second = render_markdown(&graph).unwrap();
    assert_eq!(first, second);

    let rebuilt = build_graph(&store, &chain_definition()).unwrap();
    assert_eq!(render_markdown(&rebuilt).unwrap(), first);
}
