//! End-to-end behaviour of the container through the public facade.

use std::sync::Arc;

use crate::prelude::*;

trait TestInterface: Send + Sync {
    fn kind(&self) -> &'static str;
}

#[derive(Injectable)]
struct TestImplSingleCtor;

impl TestInterface for TestImplSingleCtor {
    fn kind(&self) -> &'static str {
        "single"
    }
}

impl From<TestImplSingleCtor> for Arc<dyn TestInterface> {
    fn from(value: TestImplSingleCtor) -> Self {
        Arc::new(value)
    }
}

#[derive(Injectable)]
struct TestImplSingleCtor2;

impl TestInterface for TestImplSingleCtor2 {
    fn kind(&self) -> &'static str {
        "single2"
    }
}

impl From<TestImplSingleCtor2> for Arc<dyn TestInterface> {
    fn from(value: TestImplSingleCtor2) -> Self {
        Arc::new(value)
    }
}

struct TestImplMultipleCtors {
    value: Option<String>,
}

impl TestImplMultipleCtors {
    fn with_value(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
        }
    }
}

impl Injectable for TestImplMultipleCtors {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![
            Constructor::new(|| TestImplMultipleCtors { value: None }),
            Constructor::new(|value: String| TestImplMultipleCtors::with_value(value)),
        ]
    }
}

impl TestInterface for TestImplMultipleCtors {
    fn kind(&self) -> &'static str {
        "multiple"
    }
}

impl From<TestImplMultipleCtors> for Arc<dyn TestInterface> {
    fn from(value: TestImplMultipleCtors) -> Self {
        Arc::new(value)
    }
}

struct TestImplNoPublicCtors;

impl Injectable for TestImplNoPublicCtors {
    fn constructors() -> Vec<Constructor<Self>> {
        Vec::new()
    }
}

impl TestInterface for TestImplNoPublicCtors {
    fn kind(&self) -> &'static str {
        "hidden"
    }
}

impl From<TestImplNoPublicCtors> for Arc<dyn TestInterface> {
    fn from(value: TestImplNoPublicCtors) -> Self {
        Arc::new(value)
    }
}

#[derive(Injectable)]
struct ClassWithDependency {
    dep: Arc<dyn TestInterface>,
}

#[derive(Injectable)]
struct ClassWithMultipleDependencies {
    test_interface_dep: Arc<dyn TestInterface>,
    class_with_dependency_dep: Arc<ClassWithDependency>,
}

fn with_graph(dependency: Lifetime) -> Container {
    let container = Container::new();
    container
        .register::<Arc<ClassWithMultipleDependencies>, ClassWithMultipleDependencies>(
            Lifetime::Transient,
        )
        .unwrap()
        .register::<Arc<ClassWithDependency>, ClassWithDependency>(Lifetime::Transient)
        .unwrap()
        .register::<Arc<dyn TestInterface>, TestImplSingleCtor>(dependency)
        .unwrap();
    container
}

#[test]
fn should_activate_registered_type() {
    let container = Container::new();
    container
        .register::<Arc<dyn TestInterface>, TestImplSingleCtor>(Lifetime::Transient)
        .unwrap();

    let result: Arc<dyn TestInterface> = container.resolve().unwrap();
    assert_eq!(result.kind(), "single");
}

#[test]
fn should_fail_to_register_type_without_public_ctors() {
    let container = Container::new();

    let err = container
        .register::<Arc<dyn TestInterface>, TestImplNoPublicCtors>(Lifetime::Transient)
        .err()
        .unwrap();
    assert!(err.to_string().contains("single public constructor"));
}

#[test]
fn should_fail_to_register_type_with_multiple_ctors() {
    let container = Container::new();

    let err = container
        .register::<Arc<dyn TestInterface>, TestImplMultipleCtors>(Lifetime::Transient)
        .err()
        .unwrap();
    assert!(err.to_string().contains("single public constructor"));
}

#[test]
fn should_register_type_with_multiple_ctors_using_factory() {
    let container = Container::new();
    container.register_with::<Arc<TestImplMultipleCtors>>(
        |_| Ok(Arc::new(TestImplMultipleCtors::with_value("42"))),
        Lifetime::Transient,
    );

    let result: Arc<TestImplMultipleCtors> = container.resolve().unwrap();
    assert_eq!(result.value.as_deref(), Some("42"));
    assert_eq!(result.kind(), "multiple");
}

#[test]
fn should_resolve_dependencies() {
    let container = Container::new();
    container
        .register::<Arc<dyn TestInterface>, TestImplSingleCtor>(Lifetime::Transient)
        .unwrap()
        .register::<Arc<ClassWithDependency>, ClassWithDependency>(Lifetime::Transient)
        .unwrap();

    let result: Arc<ClassWithDependency> = container.resolve().unwrap();
    assert_eq!(result.dep.kind(), "single");
}

#[test]
fn should_resolve_dependency_in_factory() {
    let container = Container::new();
    container
        .register::<Arc<dyn TestInterface>, TestImplSingleCtor>(Lifetime::Transient)
        .unwrap();
    container.register_with::<Arc<ClassWithDependency>>(
        |r| Ok(Arc::new(ClassWithDependency { dep: r.resolve()? })),
        Lifetime::Transient,
    );

    let result: Arc<ClassWithDependency> = container.resolve().unwrap();
    assert_eq!(result.dep.kind(), "single");
}

#[test]
fn transient_returns_new_instance_for_each_request() {
    let container = with_graph(Lifetime::Transient);

    let first: Arc<dyn TestInterface> = container.resolve().unwrap();
    let second: Arc<dyn TestInterface> = container.resolve().unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
}

#[test]
fn transient_returns_new_instance_within_same_request() {
    let container = with_graph(Lifetime::Transient);

    let result: Arc<ClassWithMultipleDependencies> = container.resolve().unwrap();
    assert!(!Arc::ptr_eq(
        &result.test_interface_dep,
        &result.class_with_dependency_dep.dep
    ));
}

#[test]
fn singleton_returns_same_instance_for_each_request() {
    let container = with_graph(Lifetime::Singleton);

    let first: Arc<dyn TestInterface> = container.resolve().unwrap();
    let second: Arc<dyn TestInterface> = container.resolve().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn singleton_returns_same_instance_within_same_request() {
    let container = with_graph(Lifetime::Singleton);

    let result: Arc<ClassWithMultipleDependencies> = container.resolve().unwrap();
    assert!(Arc::ptr_eq(
        &result.test_interface_dep,
        &result.class_with_dependency_dep.dep
    ));
}

#[test]
fn per_scope_returns_new_instance_for_each_request() {
    let container = with_graph(Lifetime::PerScope);

    let first: Arc<dyn TestInterface> = container.resolve().unwrap();
    let second: Arc<dyn TestInterface> = container.resolve().unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
}

#[test]
fn per_scope_returns_same_instance_within_same_request() {
    let container = with_graph(Lifetime::PerScope);

    let result: Arc<ClassWithMultipleDependencies> = container.resolve().unwrap();
    assert!(Arc::ptr_eq(
        &result.test_interface_dep,
        &result.class_with_dependency_dep.dep
    ));
}

#[test]
fn per_scope_is_shared_with_factory_resolves() {
    let container = Container::new();
    container
        .register::<Arc<ClassWithDependency>, ClassWithDependency>(Lifetime::Transient)
        .unwrap()
        .register::<Arc<dyn TestInterface>, TestImplSingleCtor>(Lifetime::PerScope)
        .unwrap();
    container.register_with::<Arc<ClassWithMultipleDependencies>>(
        |r| {
            Ok(Arc::new(ClassWithMultipleDependencies {
                test_interface_dep: r.resolve()?,
                class_with_dependency_dep: r.resolve()?,
            }))
        },
        Lifetime::Transient,
    );

    let result: Arc<ClassWithMultipleDependencies> = container.resolve().unwrap();
    assert!(Arc::ptr_eq(
        &result.test_interface_dep,
        &result.class_with_dependency_dep.dep
    ));
}

#[test]
fn repeated_register_uses_new_registration() {
    let container = Container::new();
    container
        .register::<Arc<dyn TestInterface>, TestImplSingleCtor>(Lifetime::Transient)
        .unwrap()
        .register::<Arc<dyn TestInterface>, TestImplSingleCtor2>(Lifetime::Transient)
        .unwrap();

    let result: Arc<dyn TestInterface> = container.resolve().unwrap();
    assert_eq!(result.kind(), "single2");
}

#[test]
fn customize_creates_new_container() {
    let container = Container::new();
    let fork = container.customize();
    assert!(!Container::ptr_eq(&container, &fork));
}

#[test]
fn customize_does_not_modify_original() {
    let container = Container::new();
    container
        .register::<Arc<dyn TestInterface>, TestImplSingleCtor>(Lifetime::Transient)
        .unwrap();

    let fork = container.customize();
    fork.register::<Arc<dyn TestInterface>, TestImplSingleCtor2>(Lifetime::Transient)
        .unwrap();

    let original: Arc<dyn TestInterface> = container.resolve().unwrap();
    let forked: Arc<dyn TestInterface> = fork.resolve().unwrap();
    assert_eq!(original.kind(), "single");
    assert_eq!(forked.kind(), "single2");
}

#[test]
fn fork_without_customizations_resolves_from_parent() {
    let container = Container::new();
    container
        .register::<Arc<dyn TestInterface>, TestImplSingleCtor>(Lifetime::Transient)
        .unwrap();

    let fork = container.customize().customize().customize();
    let result: Arc<dyn TestInterface> = fork.resolve().unwrap();
    assert_eq!(result.kind(), "single");
}

#[test]
fn unresolvable_type_fails_with_meaningful_error() {
    let container = Container::new();

    let err = container.resolve::<Arc<dyn TestInterface>>().err().unwrap();
    let msg = err.to_string();
    assert!(msg.contains("not registered"));
    assert!(msg.contains(std::any::type_name::<Arc<dyn TestInterface>>()));
}

#[test]
fn explicit_scope_returns_same_value_within_scope() {
    let container = Container::new();
    container
        .register::<Arc<dyn TestInterface>, TestImplSingleCtor>(Lifetime::PerScope)
        .unwrap()
        .register::<Arc<ClassWithDependency>, ClassWithDependency>(Lifetime::Transient)
        .unwrap();

    let scope = container.create_scope();
    let first: Arc<ClassWithDependency> = scope.resolve().unwrap();
    let second: Arc<ClassWithDependency> = scope.resolve().unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&first.dep, &second.dep));
}

#[test]
fn derive_fills_default_fields() {
    #[derive(Injectable)]
    struct Retrying {
        dep: Arc<dyn TestInterface>,
        #[injectable(default)]
        attempts: u32,
    }

    let container = Container::new();
    container
        .register::<Arc<dyn TestInterface>, TestImplSingleCtor>(Lifetime::Singleton)
        .unwrap()
        .register::<Arc<Retrying>, Retrying>(Lifetime::Transient)
        .unwrap();

    let retrying: Arc<Retrying> = container.resolve().unwrap();
    assert_eq!(retrying.attempts, 0);
    assert_eq!(retrying.dep.kind(), "single");

    let parameters = Retrying::constructors()[0].parameters().to_vec();
    assert_eq!(parameters, vec![DependencyKey::of::<Arc<dyn TestInterface>>()]);
}
