//! 组件容器组合层测试

use di_abstractions::{ComponentDefinition, ConstructorDescriptor, TypeDescriptor};
use infrastructure_common::{ComponentInstance, DefinitionError, DependencyError};
use infrastructure_composition::{ComponentContainer, ContainerStatus, InfrastructureError};
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;

type Events = Arc<Mutex<Vec<&'static str>>>;

trait Channel: Send + Sync {
    fn id(&self) -> &'static str;
}

struct Database;

struct Cache;

impl Channel for Cache {
    fn id(&self) -> &'static str {
        "cache"
    }
}

struct Console;

impl Channel for Console {
    fn id(&self) -> &'static str {
        "console"
    }
}

fn database(events: &Events) -> TypeDescriptor {
    let created = Arc::clone(events);
    let destroyed = Arc::clone(events);
    TypeDescriptor::of::<Database>()
        .constructor(ConstructorDescriptor::sync(Vec::new(), move |_| {
            created.lock().push("database:create");
            Ok(Database)
        }))
        .on_destroy(move |_db: Arc<Database>| {
            let destroyed = Arc::clone(&destroyed);
            async move {
                destroyed.lock().push("database:destroy");
                Ok(())
            }
        })
}

#[tokio::test]
async fn test_start_and_stop_drive_singleton_lifecycle() {
    let events: Events = Arc::default();
    let container = ComponentContainer::builder()
        .describe(database(&events))
        .add_definition("database", ComponentDefinition::of::<Database>())
        .build()
        .await
        .unwrap();

    assert_eq!(container.get_status().await, ContainerStatus::Initialized);
    assert!(events.lock().is_empty());

    container.start().await.unwrap();
    assert_eq!(container.get_status().await, ContainerStatus::Running);
    assert_eq!(*events.lock(), vec!["database:create"]);

    let metrics = container.get_metrics().await;
    assert_eq!(metrics.definition_count, 1);
    assert_eq!(metrics.singleton_count, 1);
    assert!(metrics.uptime().is_some());

    let first = container.resolve::<Database>().await.unwrap();
    let second = container.resolve::<Database>().await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    container.stop().await.unwrap();
    assert_eq!(container.get_status().await, ContainerStatus::Stopped);
    assert_eq!(*events.lock(), vec!["database:create", "database:destroy"]);
    assert!(container.factory().singleton_names().is_empty());

    let err = container.resolve::<Database>().await.err().unwrap();
    assert!(matches!(err, InfrastructureError::BootstrapFailed { .. }));
}

#[tokio::test]
async fn test_failed_start_destroys_created_singletons() {
    let events: Events = Arc::default();
    let container = ComponentContainer::builder()
        .describe(database(&events))
        .describe(TypeDescriptor::of::<Cache>().constructor(ConstructorDescriptor::sync(
            Vec::new(),
            |_| -> anyhow::Result<Cache> { Err(anyhow::anyhow!("连接被拒绝")) },
        )))
        .add_definition("database", ComponentDefinition::of::<Database>())
        .add_definition("cache", ComponentDefinition::of::<Cache>())
        .build()
        .await
        .unwrap();

    let err = container.start().await.unwrap_err();
    assert!(matches!(err, InfrastructureError::ComponentError { .. }));
    assert_eq!(container.get_status().await, ContainerStatus::Failed);
    assert_eq!(*events.lock(), vec!["database:create", "database:destroy"]);
    assert!(container.factory().singleton_names().is_empty());
}

#[tokio::test]
async fn test_configuration_is_frozen_after_build() {
    let container = ComponentContainer::builder()
        .describe(TypeDescriptor::of::<Console>())
        .add_singleton("console", ComponentInstance::new(Console))
        .build()
        .await
        .unwrap();

    let err = container
        .factory()
        .register_definition("late", ComponentDefinition::of::<Console>())
        .await
        .unwrap_err();
    assert!(matches!(err, DefinitionError::Frozen { .. }));

    let open = ComponentContainer::builder()
        .freeze_configuration(false)
        .build()
        .await
        .unwrap();
    assert!(!open.factory().is_configuration_frozen());
}

#[tokio::test]
async fn test_resolve_all_follows_registration_order() {
    let container = ComponentContainer::builder()
        .describe(
            TypeDescriptor::of::<Console>()
                .implements(|c: Arc<Console>| c as Arc<dyn Channel>)
                .constructor(ConstructorDescriptor::sync(Vec::new(), |_| Ok(Console))),
        )
        .describe(
            TypeDescriptor::of::<Cache>()
                .implements(|c: Arc<Cache>| c as Arc<dyn Channel>)
                .constructor(ConstructorDescriptor::sync(Vec::new(), |_| Ok(Cache))),
        )
        .add_definition("console", ComponentDefinition::of::<Console>())
        .add_definition("cache", ComponentDefinition::of::<Cache>())
        .build()
        .await
        .unwrap();
    container.start().await.unwrap();

    let channels = container.resolve_all::<dyn Channel>().await.unwrap();
    let ids: Vec<_> = channels.iter().map(|c| c.id()).collect();
    assert_eq!(ids, vec!["console", "cache"]);

    let err = container.resolve::<dyn Channel>().await.err().unwrap();
    let InfrastructureError::ComponentError { source } = err else {
        panic!("应为组件错误");
    };
    assert!(matches!(
        source.dependency_error(),
        Some(DependencyError::NotUnique { .. })
    ));
    assert!(container.is_component_registered("cache"));
    assert!(!container.is_component_registered("queue"));
}

#[tokio::test]
async fn test_options_are_loaded_from_file() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "allow_circular_references = false").unwrap();
    writeln!(file, "allow_raw_injection_despite_wrapping = true").unwrap();

    let container = ComponentContainer::builder()
        .add_options_file(file.path())
        .unwrap()
        .build()
        .await
        .unwrap();

    let options = container.factory().options();
    assert!(!options.allow_circular_references);
    assert!(options.allow_raw_injection_despite_wrapping);
    assert!(options.allow_definition_overriding);
}

#[tokio::test]
async fn test_missing_options_file_is_rejected() {
    let result = ComponentContainer::builder().add_options_file("/nonexistent/container.toml");
    assert!(matches!(
        result,
        Err(InfrastructureError::BootstrapFailed { .. })
    ));
}
