//! End-to-end build and invocation tests

use std::sync::{Arc, Mutex};

use trellis_core::arena::{ArenaRead, SharedValue};
use trellis_core::bean::{Bean, BeanSource, Instantiation};
use trellis_core::element::{ClassDescriptor, ElementDescriptor, ElementKind, Marker, ParamDescriptor};
use trellis_core::error::Error;
use trellis_core::graph::Accessor;
use trellis_core::key::BindingKey;
use trellis_core::operation::InvocationContext;
use trellis_core::service::Visibility;
use trellis_runtime::{AppBuilder, RuntimeConfig};

fn string_value(s: &str) -> SharedValue {
    Arc::new(s.to_string())
}

fn arg_string(args: &[Option<SharedValue>], index: usize) -> String {
    args[index]
        .clone()
        .expect("argument was defaulted")
        .downcast::<String>()
        .expect("argument is not a String")
        .as_str()
        .to_string()
}

/// Singleton class bean whose constructor takes no parameters and
/// produces the given string.
fn leaf_bean(key: &str, value: &'static str) -> Bean {
    let class = ClassDescriptor::new(format!("{}Class", key)).with_element(
        ElementDescriptor::new("new", ElementKind::Constructor)
            .with_body(Arc::new(move |_args| Ok(string_value(value)))),
    );
    Bean::new(
        BindingKey::named(key),
        Instantiation::Singleton,
        BeanSource::Class(class),
    )
}

/// Singleton class bean whose constructor consumes the bean bound under
/// `dep` and wraps its string value.
fn wrapping_bean(key: &str, dep: &str) -> Bean {
    let class = ClassDescriptor::new(format!("{}Class", key)).with_element(
        ElementDescriptor::new("new", ElementKind::Constructor)
            .with_param(ParamDescriptor::new("dep", BindingKey::named(dep)))
            .with_body(Arc::new(|args: &[Option<SharedValue>]| {
                Ok(string_value(&format!("wrap({})", arg_string(args, 0))))
            })),
    );
    Bean::new(
        BindingKey::named(key),
        Instantiation::Singleton,
        BeanSource::Class(class),
    )
}

#[test]
fn test_dependency_resolved_across_declaration_order() {
    // X is installed before Y yet depends on it; the declare pass makes
    // the forward reference resolvable and the resolver populates Y's
    // slot first.
    let mut builder = AppBuilder::new();
    let root = builder.root();
    builder.install(root, wrapping_bean("X", "Y")).unwrap();
    builder.install(root, leaf_bean("Y", "y-service")).unwrap();

    let app = builder.build().unwrap();
    assert_eq!(app.slot_count(), 2);
    assert_eq!(
        app.get::<String>(&BindingKey::named("X")).unwrap().as_str(),
        "wrap(y-service)"
    );
    assert_eq!(
        app.get::<String>(&BindingKey::named("Y")).unwrap().as_str(),
        "y-service"
    );

    // The producer hands out the stored instance, not a fresh value.
    let once = app.resolve(&BindingKey::named("Y")).unwrap();
    let again = app.resolve(&BindingKey::named("Y")).unwrap();
    assert!(Arc::ptr_eq(&once, &again));
}

#[test]
fn test_beans_resolve_across_containers() {
    let mut builder = AppBuilder::new();
    let root = builder.root();
    let child = builder.add_container(root, "web").unwrap();
    builder.install(root, wrapping_bean("X", "Y")).unwrap();
    builder.install(child, leaf_bean("Y", "y-service")).unwrap();

    let app = builder.build().unwrap();
    assert_eq!(
        app.get::<String>(&BindingKey::named("X")).unwrap().as_str(),
        "wrap(y-service)"
    );
}

#[test]
fn test_cycle_aborts_build_with_minimal_chain() {
    let mut builder = AppBuilder::new();
    let root = builder.root();
    builder.install(root, wrapping_bean("A", "B")).unwrap();
    builder.install(root, wrapping_bean("B", "A")).unwrap();

    let e = builder.build().unwrap_err();
    match e {
        Error::Cycle { chain } => assert_eq!(chain, vec!["A".to_string(), "B".to_string()]),
        other => panic!("Expected Cycle, got {:?}", other),
    }
}

#[test]
fn test_cyclic_build_runs_no_constructor() {
    // The cycle sits between A and B; the unrelated leaf bean is valid on
    // its own. The failed build must abort before any constructor runs,
    // leaving no side effect behind.
    let events: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&events);
    let leaf_class = ClassDescriptor::new("QuietLeaf").with_element(
        ElementDescriptor::new("new", ElementKind::Constructor).with_body(Arc::new(
            move |_args| {
                log.lock().unwrap().push("leaf constructed");
                Ok(string_value("leaf"))
            },
        )),
    );

    let mut builder = AppBuilder::new();
    let root = builder.root();
    builder
        .install(
            root,
            Bean::new(
                BindingKey::named("leaf"),
                Instantiation::Singleton,
                BeanSource::Class(leaf_class),
            ),
        )
        .unwrap();
    builder.install(root, wrapping_bean("A", "B")).unwrap();
    builder.install(root, wrapping_bean("B", "A")).unwrap();

    let e = builder.build().unwrap_err();
    match e {
        Error::Cycle { .. } => {}
        other => panic!("Expected Cycle, got {:?}", other),
    }
    assert!(events.lock().unwrap().is_empty());
}

#[test]
fn test_unresolved_constructor_parameter_fails_build() {
    let mut builder = AppBuilder::new();
    let root = builder.root();
    builder.install(root, wrapping_bean("X", "Nowhere")).unwrap();

    let e = builder.build().unwrap_err();
    match e {
        Error::UnresolvedBinding { element, key } => {
            assert_eq!(element, "XClass#new");
            assert_eq!(key, "Nowhere");
        }
        other => panic!("Expected UnresolvedBinding, got {:?}", other),
    }
}

#[test]
fn test_optional_parameter_defaults_when_unbound() {
    let class = ClassDescriptor::new("Fallback").with_element(
        ElementDescriptor::new("new", ElementKind::Constructor)
            .with_param(ParamDescriptor::new("dep", BindingKey::named("Nowhere")).optional())
            .with_body(Arc::new(|args: &[Option<SharedValue>]| {
                Ok(string_value(if args[0].is_none() { "default" } else { "bound" }))
            })),
    );
    let mut builder = AppBuilder::new();
    let root = builder.root();
    builder
        .install(
            root,
            Bean::new(
                BindingKey::named("F"),
                Instantiation::Singleton,
                BeanSource::Class(class),
            ),
        )
        .unwrap();

    let app = builder.build().unwrap();
    assert_eq!(
        app.get::<String>(&BindingKey::named("F")).unwrap().as_str(),
        "default"
    );
}

#[test]
fn test_duplicate_bean_key_fails_build() {
    let mut builder = AppBuilder::new();
    let root = builder.root();
    builder.install(root, leaf_bean("K", "first")).unwrap();
    builder.install(root, leaf_bean("K", "second")).unwrap();

    let e = builder.build().unwrap_err();
    match e {
        Error::DuplicateServiceKey { key } => assert_eq!(key, "K"),
        other => panic!("Expected DuplicateServiceKey, got {:?}", other),
    }
}

#[test]
fn test_post_construct_runs_after_instance_is_stored() {
    let events: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    let construct_log = Arc::clone(&events);
    let init_log = Arc::clone(&events);

    let class = ClassDescriptor::new("Widget")
        .with_element(
            ElementDescriptor::new("new", ElementKind::Constructor).with_body(Arc::new(
                move |_args| {
                    construct_log.lock().unwrap().push("construct");
                    Ok(string_value("widget"))
                },
            )),
        )
        .with_element(
            ElementDescriptor::new("init", ElementKind::Method)
                .with_marker(Marker::new("lifecycle", "init"))
                .with_param(ParamDescriptor::new("self", BindingKey::named("widget")))
                .with_body(Arc::new(move |args: &[Option<SharedValue>]| {
                    // The parameter reads the bean's own slot, so the
                    // instance must already be stored.
                    assert_eq!(arg_string(args, 0), "widget");
                    init_log.lock().unwrap().push("init");
                    Ok(string_value("ignored"))
                })),
        );

    let mut builder = AppBuilder::new();
    let root = builder.root();
    builder
        .install(
            root,
            Bean::new(
                BindingKey::named("widget"),
                Instantiation::Singleton,
                BeanSource::Class(class),
            ),
        )
        .unwrap();

    let app = builder.build().unwrap();
    assert_eq!(*events.lock().unwrap(), vec!["construct", "init"]);
    assert_eq!(
        app.get::<String>(&BindingKey::named("widget")).unwrap().as_str(),
        "widget"
    );
}

#[test]
fn test_produces_method_publishes_a_binding() {
    let class = ClassDescriptor::new("UrlFactory")
        .with_element(
            ElementDescriptor::new("new", ElementKind::Constructor)
                .with_body(Arc::new(|_args| Ok(string_value("factory")))),
        )
        .with_element(
            ElementDescriptor::new("make_url", ElementKind::Method)
                .with_marker(
                    Marker::new("produces", "value").with_attr("key", "config.url"),
                )
                .with_body(Arc::new(|_args| Ok(string_value("https://example.test")))),
        );

    let mut builder = AppBuilder::new();
    let root = builder.root();
    builder
        .install(
            root,
            Bean::new(
                BindingKey::named("factory"),
                Instantiation::Singleton,
                BeanSource::Class(class),
            ),
        )
        .unwrap();
    builder.export(BindingKey::named("config.url"), Visibility::Exported);

    let app = builder.build().unwrap();
    assert_eq!(
        app.get::<String>(&BindingKey::named("config.url")).unwrap().as_str(),
        "https://example.test"
    );

    // Repeated lookups on the unchanged registry return the same entry.
    let first = app.lookup_service(&BindingKey::named("config.url")).unwrap();
    let second = app.lookup_service(&BindingKey::named("config.url")).unwrap();
    assert_eq!(first.producer(), second.producer());
    assert_eq!(first.visibility(), Visibility::Exported);
}

#[test]
fn test_conflicting_claims_fail_build() {
    // Two markers that both want to own the invocation of one element.
    let class = ClassDescriptor::new("Torn")
        .with_element(
            ElementDescriptor::new("new", ElementKind::Constructor)
                .with_body(Arc::new(|_args| Ok(string_value("torn")))),
        )
        .with_element(
            ElementDescriptor::new("both", ElementKind::Method)
                .with_marker(Marker::new("lifecycle", "init"))
                .with_marker(Marker::new("produces", "value").with_attr("key", "torn.value"))
                .with_body(Arc::new(|_args| Ok(string_value("?")))),
        );

    let mut builder = AppBuilder::new();
    let root = builder.root();
    builder
        .install(
            root,
            Bean::new(
                BindingKey::named("torn"),
                Instantiation::Singleton,
                BeanSource::Class(class),
            ),
        )
        .unwrap();

    let e = builder.build().unwrap_err();
    match e {
        Error::IncompatibleHooks { element, .. } => assert_eq!(element, "TornClass#both"),
        other => panic!("Expected IncompatibleHooks, got {:?}", other),
    }
}

#[test]
fn test_unknown_marker_fails_build() {
    let class = ClassDescriptor::new("Odd")
        .with_element(
            ElementDescriptor::new("new", ElementKind::Constructor)
                .with_body(Arc::new(|_args| Ok(string_value("odd")))),
        )
        .with_element(
            ElementDescriptor::new("weird", ElementKind::Method)
                .with_marker(Marker::new("nobody", "home"))
                .with_body(Arc::new(|_args| Ok(string_value("?")))),
        );

    let mut builder = AppBuilder::new();
    let root = builder.root();
    builder
        .install(
            root,
            Bean::new(
                BindingKey::named("odd"),
                Instantiation::Singleton,
                BeanSource::Class(class),
            ),
        )
        .unwrap();

    let e = builder.build().unwrap_err();
    match e {
        Error::UnknownHandler { marker, .. } => assert_eq!(marker, "nobody.home"),
        other => panic!("Expected UnknownHandler, got {:?}", other),
    }
}

fn dead_constant_bean(class_name: &str, bean_key: &str) -> Bean {
    // The constant's key matches no parameter of the element.
    let class = ClassDescriptor::new(class_name)
        .with_element(
            ElementDescriptor::new("new", ElementKind::Constructor)
                .with_body(Arc::new(|_args| Ok(string_value("tool")))),
        )
        .with_element(
            ElementDescriptor::new("setup", ElementKind::Method)
                .with_marker(Marker::new("lifecycle", "init"))
                .with_marker(
                    Marker::new("config", "constant")
                        .with_attr("key", "nobody.asks")
                        .with_attr("value", "wasted"),
                )
                .with_body(Arc::new(|_args| Ok(string_value("done")))),
        );
    Bean::new(
        BindingKey::named(bean_key),
        Instantiation::Singleton,
        BeanSource::Class(class),
    )
}

#[test]
fn test_unmatched_constant_fails_strict_build() {
    let mut config = RuntimeConfig::default();
    config.build.strict_unused_constants = true;

    let mut builder = AppBuilder::with_config(config);
    let root = builder.root();
    builder
        .install(root, dead_constant_bean("StrictTool", "strict_tool"))
        .unwrap();

    let e = builder.build().unwrap_err();
    match e {
        Error::Config { message, .. } => {
            assert!(message.contains("StrictTool#setup"));
            assert!(message.contains("nobody.asks"));
        }
        other => panic!("Expected Config, got {:?}", other),
    }
}

#[test]
fn test_unmatched_constant_only_warns_by_default() {
    let mut builder = AppBuilder::new();
    let root = builder.root();
    builder
        .install(root, dead_constant_bean("LenientTool", "lenient_tool"))
        .unwrap();

    let app = builder.build().unwrap();
    assert_eq!(
        app.get::<String>(&BindingKey::named("lenient_tool")).unwrap().as_str(),
        "tool"
    );
}

#[test]
fn test_factory_and_instance_beans() {
    let accessor: Accessor = Arc::new(|_: &dyn ArenaRead| Ok(Arc::new(42u32) as SharedValue));
    let mut builder = AppBuilder::new();
    let root = builder.root();
    builder
        .install(
            root,
            Bean::new(
                BindingKey::named("Answer"),
                Instantiation::Singleton,
                BeanSource::Factory(accessor),
            ),
        )
        .unwrap();
    builder
        .install(
            root,
            Bean::new(
                BindingKey::named("Seven"),
                Instantiation::Singleton,
                BeanSource::Instance(Arc::new(7u32)),
            ),
        )
        .unwrap();

    let app = builder.build().unwrap();
    assert_eq!(*app.get::<u32>(&BindingKey::named("Answer")).unwrap(), 42);
    assert_eq!(*app.get::<u32>(&BindingKey::named("Seven")).unwrap(), 7);
}

#[test]
fn test_deferred_operation_with_context_and_constant() {
    let element = ElementDescriptor::new("greet", ElementKind::Method)
        .with_marker(
            Marker::new("config", "constant")
                .with_attr("key", "greet.prefix")
                .with_attr("value", "Hello"),
        )
        .with_marker(Marker::new("context", "param").with_attr("key", "request.name"))
        .with_param(ParamDescriptor::new("prefix", BindingKey::named("greet.prefix")))
        .with_param(ParamDescriptor::new("name", BindingKey::named("request.name")))
        .with_body(Arc::new(|args: &[Option<SharedValue>]| {
            Ok(string_value(&format!(
                "{}, {}",
                arg_string(args, 0),
                arg_string(args, 1)
            )))
        }));
    let class = ClassDescriptor::new("Greeter");

    let mut builder = AppBuilder::new();
    let handle = builder.request_operation(class, element);
    let app = builder.build().unwrap();

    let ctx = InvocationContext::new().provide(BindingKey::named("request.name"), string_value("Ada"));
    let result = app.invoke(&handle, &ctx).unwrap().unwrap();
    assert_eq!(result.downcast::<String>().unwrap().as_str(), "Hello, Ada");

    // The same compiled operation fails fast when the context omits a
    // declared key.
    let e = app.invoke(&handle, &InvocationContext::new()).unwrap_err();
    match e {
        Error::UnresolvedBinding { key, .. } => assert_eq!(key, "request.name"),
        other => panic!("Expected UnresolvedBinding, got {:?}", other),
    }
}

#[test]
fn test_operation_can_consume_bean_producers() {
    let element = ElementDescriptor::new("read", ElementKind::Method)
        .with_param(ParamDescriptor::new("value", BindingKey::named("Y")))
        .with_body(Arc::new(|args: &[Option<SharedValue>]| {
            Ok(string_value(&format!("read:{}", arg_string(args, 0))))
        }));
    let class = ClassDescriptor::new("Reader");

    let mut builder = AppBuilder::new();
    let root = builder.root();
    builder.install(root, leaf_bean("Y", "y-service")).unwrap();
    let handle = builder.request_operation(class, element);

    let app = builder.build().unwrap();
    let result = app.invoke(&handle, &InvocationContext::new()).unwrap().unwrap();
    assert_eq!(result.downcast::<String>().unwrap().as_str(), "read:y-service");
}

#[test]
fn test_registered_producer_readable_through_handle() {
    let mut builder = AppBuilder::new();
    let handle = builder
        .register_constant(BindingKey::named("numbers.pi"), Arc::new(314u32))
        .unwrap();
    let app = builder.build().unwrap();

    let value = app.value_of(&handle).unwrap();
    assert_eq!(*value.downcast::<u32>().unwrap(), 314);
}
