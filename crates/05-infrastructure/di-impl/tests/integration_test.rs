//! 组件容器的集成测试

use di_abstractions::{
    AutowireMode, ComponentDefinition, ComponentPostProcessor, ConstructorDescriptor,
    DependencyCheck, MethodDescriptor, ParameterDescriptor, ProcessingContext,
    ProcessorCapabilities, PropertyDescriptor, TypeDescriptor,
};
use di_impl::{ContainerOptions, DefaultComponentFactory, DescriptorTable, MapScope};
use infrastructure_common::{
    ComponentError, ComponentInstance, ComponentProvider, DefinitionError, DependencyError,
    InjectionValue, PropertyValue, TypeInfo,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

trait Greeter: Send + Sync {
    fn greet(&self) -> String;
}

#[derive(Default)]
struct English;

impl Greeter for English {
    fn greet(&self) -> String {
        "hello".to_string()
    }
}

#[derive(Default)]
struct French;

impl Greeter for French {
    fn greet(&self) -> String {
        "bonjour".to_string()
    }
}

fn greeters(table: DescriptorTable) -> DescriptorTable {
    table
        .with(
            TypeDescriptor::of::<English>()
                .implements(|g: Arc<English>| g as Arc<dyn Greeter>)
                .constructor(ConstructorDescriptor::default_of::<English>()),
        )
        .with(
            TypeDescriptor::of::<French>()
                .implements(|g: Arc<French>| g as Arc<dyn Greeter>)
                .constructor(ConstructorDescriptor::default_of::<French>()),
        )
}

fn factory(table: DescriptorTable) -> DefaultComponentFactory {
    DefaultComponentFactory::new(Arc::new(table))
}

/// 沿错误链取出循环引用报告的创建链
fn creation_chain(err: &ComponentError) -> Option<Vec<String>> {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(ComponentError::CurrentlyInCreation { chain, .. }) = e.downcast_ref::<ComponentError>() {
            return Some(chain.clone());
        }
        current = e.source();
    }
    None
}

/// 沿错误链查找满足条件的组件错误
fn caused_by(err: &ComponentError, matches: impl Fn(&ComponentError) -> bool) -> bool {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = current {
        if e.downcast_ref::<ComponentError>().is_some_and(&matches) {
            return true;
        }
        current = e.source();
    }
    false
}

// ---- 单例 ----

#[tokio::test]
async fn test_concurrent_singleton_lookups_create_once() {
    let created = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&created);
    let table = DescriptorTable::new().with(TypeDescriptor::of::<English>().constructor(
        ConstructorDescriptor::new(Vec::new(), move |_| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(English)
            }
        }),
    ));
    let factory = factory(table);
    factory
        .register_definition("greeter", ComponentDefinition::of::<English>())
        .await
        .unwrap();

    let lookups = (0..8).map(|_| factory.get_named("greeter"));
    let instances = futures::future::join_all(lookups).await;

    assert_eq!(created.load(Ordering::SeqCst), 1);
    let first = instances[0].as_ref().unwrap();
    for instance in &instances {
        assert!(instance.as_ref().unwrap().ptr_eq(first));
    }
    assert_eq!(factory.singleton_names(), vec!["greeter".to_string()]);
}

#[tokio::test]
async fn test_prototypes_are_fresh_and_not_cached() {
    let factory = factory(greeters(DescriptorTable::new()));
    factory
        .register_definition("greeter", ComponentDefinition::of::<English>().prototype())
        .await
        .unwrap();

    let first = factory.get_named("greeter").await.unwrap();
    let second = factory.get_named("greeter").await.unwrap();
    assert!(!first.ptr_eq(&second));
    assert!(factory.singleton_names().is_empty());
}

#[tokio::test]
async fn test_failed_creation_leaves_nothing_and_can_retry() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let table = DescriptorTable::new().with(TypeDescriptor::of::<English>().constructor(
        ConstructorDescriptor::sync(Vec::new(), move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(anyhow::anyhow!("连接尚未就绪"))
            } else {
                Ok(English)
            }
        }),
    ));
    let factory = factory(table);
    factory
        .register_definition("greeter", ComponentDefinition::of::<English>())
        .await
        .unwrap();

    let err = factory.get_named("greeter").await.unwrap_err();
    assert!(matches!(err, ComponentError::Creation { ref name, .. } if name == "greeter"));
    assert!(factory.singleton_names().is_empty());
    assert!(!factory.is_currently_in_creation("greeter"));

    let instance = factory.get_named("greeter").await.unwrap();
    assert!(instance.downcast::<English>().is_some());
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

// ---- 循环引用 ----

#[derive(Default)]
struct Alpha {
    beta: Mutex<Option<Arc<Beta>>>,
}

#[derive(Default)]
struct Beta {
    alpha: Mutex<Option<Arc<Alpha>>>,
}

fn alpha_descriptor() -> TypeDescriptor {
    TypeDescriptor::of::<Alpha>()
        .constructor(ConstructorDescriptor::default_of::<Alpha>())
        .property(
            PropertyDescriptor::component::<Alpha, Beta>("beta", |a, b| {
                *a.beta.lock() = Some(b);
            })
            .autowired(),
        )
}

fn beta_descriptor() -> TypeDescriptor {
    TypeDescriptor::of::<Beta>()
        .constructor(ConstructorDescriptor::default_of::<Beta>())
        .property(
            PropertyDescriptor::component::<Beta, Alpha>("alpha", |b, a| {
                *b.alpha.lock() = Some(a);
            })
            .autowired(),
        )
}

fn setter_cycle() -> DescriptorTable {
    DescriptorTable::new().with(alpha_descriptor()).with(beta_descriptor())
}

async fn register_cycle(factory: &DefaultComponentFactory) {
    factory
        .register_definition("alpha", ComponentDefinition::of::<Alpha>())
        .await
        .unwrap();
    factory
        .register_definition("beta", ComponentDefinition::of::<Beta>())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_setter_cycle_resolves_through_early_reference() {
    let factory = factory(setter_cycle());
    register_cycle(&factory).await;

    let alpha = factory.get_named_as::<Alpha>("alpha").await.unwrap();
    let beta = alpha.beta.lock().clone().expect("beta 应当已注入");
    let back = beta.alpha.lock().clone().expect("alpha 应当已注入");
    assert!(Arc::ptr_eq(&alpha, &back));

    let cached = factory.get_named_as::<Beta>("beta").await.unwrap();
    assert!(Arc::ptr_eq(&beta, &cached));
    assert_eq!(factory.dependents_of("alpha"), vec!["beta".to_string()]);
}

#[tokio::test]
async fn test_setter_cycle_rejected_when_circular_references_disabled() {
    let factory = factory(setter_cycle());
    factory.set_allow_circular_references(false);
    register_cycle(&factory).await;

    let err = factory.get_named("alpha").await.unwrap_err();
    assert!(err.is_currently_in_creation());
    let chain = creation_chain(&err).expect("应报告创建链");
    assert!(chain.iter().any(|n| n == "alpha"));
    assert!(chain.iter().any(|n| n == "beta"));
    assert!(factory.singleton_names().is_empty());
}

#[tokio::test]
async fn test_failed_cycle_member_evicts_dependents_holding_early_reference() {
    let destroyed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&destroyed);
    let table = DescriptorTable::new()
        .with(alpha_descriptor().on_init(|_alpha: Arc<Alpha>| async {
            Err::<(), _>(anyhow::anyhow!("校验失败"))
        }))
        .with(beta_descriptor().on_destroy(move |_beta: Arc<Beta>| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }));
    let factory = factory(table);
    register_cycle(&factory).await;

    let err = factory.get_named("alpha").await.unwrap_err();
    assert_eq!(err.component_name(), Some("alpha"));
    assert!(factory.singleton_names().is_empty());
    assert!(factory.dependents_of("alpha").is_empty());
    assert!(factory.dependencies_of("beta").is_empty());
    assert_eq!(destroyed.load(Ordering::SeqCst), 1);
}

struct Service {
    repository: Mutex<Option<ComponentProvider>>,
    resolved: Mutex<Option<Arc<Repository>>>,
}

struct Repository {
    service: Mutex<Option<Arc<Service>>>,
}

#[tokio::test]
async fn test_provider_inside_init_sees_component_in_creation() {
    let table = DescriptorTable::new()
        .with(
            TypeDescriptor::of::<Service>()
                .constructor(ConstructorDescriptor::sync(Vec::new(), |_| {
                    Ok(Service {
                        repository: Mutex::new(None),
                        resolved: Mutex::new(None),
                    })
                }))
                .property(
                    PropertyDescriptor::provider::<Service, Repository>("repository", |s, p| {
                        *s.repository.lock() = Some(p);
                    })
                    .autowired(),
                )
                .on_init(|service: Arc<Service>| async move {
                    let provider = service
                        .repository
                        .lock()
                        .clone()
                        .ok_or_else(|| anyhow::anyhow!("仓储提供者未注入"))?;
                    let repository = provider.get_as::<Repository>().await?;
                    *service.resolved.lock() = Some(repository);
                    Ok(())
                }),
        )
        .with(
            TypeDescriptor::of::<Repository>()
                .constructor(ConstructorDescriptor::sync(Vec::new(), |_| {
                    Ok(Repository {
                        service: Mutex::new(None),
                    })
                }))
                .property(
                    PropertyDescriptor::component::<Repository, Service>("service", |r, s| {
                        *r.service.lock() = Some(s);
                    })
                    .autowired(),
                ),
        );
    let factory = factory(table);
    factory
        .register_definition("service", ComponentDefinition::of::<Service>())
        .await
        .unwrap();
    factory
        .register_definition("repository", ComponentDefinition::of::<Repository>())
        .await
        .unwrap();

    let service = tokio::time::timeout(Duration::from_secs(3), factory.get_named_as::<Service>("service"))
        .await
        .expect("提供者解析不应阻塞")
        .unwrap();
    let repository = service.resolved.lock().clone().expect("init 应当已解析仓储");
    let back = repository.service.lock().clone().expect("仓储应当已注入服务");
    assert!(Arc::ptr_eq(&service, &back));
    assert_eq!(factory.dependents_of("service"), vec!["repository".to_string()]);
}

struct Left {
    _right: Arc<Right>,
}

struct Right {
    _left: Arc<Left>,
}

#[tokio::test]
async fn test_constructor_cycle_is_rejected_and_nothing_cached() {
    let table = DescriptorTable::new()
        .with(TypeDescriptor::of::<Left>().constructor(ConstructorDescriptor::sync(
            vec![ParameterDescriptor::component::<Right>("right")],
            |args| {
                Ok(Left {
                    _right: args.component::<Right>(0)?,
                })
            },
        )))
        .with(TypeDescriptor::of::<Right>().constructor(ConstructorDescriptor::sync(
            vec![ParameterDescriptor::component::<Left>("left")],
            |args| {
                Ok(Right {
                    _left: args.component::<Left>(0)?,
                })
            },
        )));
    let factory = factory(table);
    factory
        .register_definition("left", ComponentDefinition::of::<Left>())
        .await
        .unwrap();
    factory
        .register_definition("right", ComponentDefinition::of::<Right>())
        .await
        .unwrap();

    let err = factory.get_named("left").await.unwrap_err();
    assert!(err.is_currently_in_creation());
    let chain = creation_chain(&err).expect("应报告创建链");
    assert!(chain.iter().any(|n| n == "left"));
    assert!(chain.iter().any(|n| n == "right"));
    assert!(factory.singleton_names().is_empty());
    assert!(!factory.is_currently_in_creation("left"));
    assert!(!factory.is_currently_in_creation("right"));
}

/// 对 alpha 的最终实例做包装的处理器
struct Wrapping;

#[async_trait::async_trait]
impl ComponentPostProcessor for Wrapping {
    fn name(&self) -> &str {
        "wrapping"
    }

    fn capabilities(&self) -> ProcessorCapabilities {
        ProcessorCapabilities::AFTER_INIT
    }

    async fn after_initialization(
        &self,
        ctx: &ProcessingContext<'_>,
        instance: ComponentInstance,
    ) -> anyhow::Result<ComponentInstance> {
        if ctx.name == "alpha" {
            return Ok(ComponentInstance::new(Alpha::default()));
        }
        Ok(instance)
    }
}

#[tokio::test]
async fn test_wrapping_after_raw_injection_is_reported() {
    let factory = factory(setter_cycle());
    factory.add_processor(Arc::new(Wrapping));
    register_cycle(&factory).await;

    let err = factory.get_named("alpha").await.unwrap_err();
    assert!(matches!(
        err,
        ComponentError::RawInjectionDespiteWrapping { ref name, ref dependents }
            if name == "alpha" && dependents == &vec!["beta".to_string()]
    ));
    assert!(factory.singleton_names().is_empty());

    let tolerant = DefaultComponentFactory::with_options(
        Arc::new(setter_cycle()),
        ContainerOptions {
            allow_raw_injection_despite_wrapping: true,
            ..ContainerOptions::default()
        },
    );
    tolerant.add_processor(Arc::new(Wrapping));
    register_cycle(&tolerant).await;

    let alpha = tolerant.get_named_as::<Alpha>("alpha").await.unwrap();
    let beta = tolerant.get_named_as::<Beta>("beta").await.unwrap();
    let injected = beta.alpha.lock().clone().unwrap();
    assert!(!Arc::ptr_eq(&alpha, &injected));
}

// ---- 候选选择 ----

#[tokio::test]
async fn test_ambiguous_type_lookup_and_primary() {
    let factory = factory(greeters(DescriptorTable::new()));
    factory
        .register_definition("english", ComponentDefinition::of::<English>())
        .await
        .unwrap();
    factory
        .register_definition("french", ComponentDefinition::of::<French>())
        .await
        .unwrap();

    let err = factory.get_typed::<dyn Greeter>().await.err().unwrap();
    assert!(matches!(
        err.dependency_error(),
        Some(DependencyError::NotUnique { candidates, .. })
            if candidates == &vec!["english".to_string(), "french".to_string()]
    ));

    factory
        .modify_definition("french", |definition| definition.primary = true)
        .unwrap();
    let greeter = factory.get_typed::<dyn Greeter>().await.unwrap();
    assert_eq!(greeter.greet(), "bonjour");
}

#[tokio::test]
async fn test_priority_breaks_ties_and_orders_lists() {
    struct Chorus {
        voices: Vec<Arc<dyn Greeter>>,
    }

    let table = greeters(DescriptorTable::new()).with(TypeDescriptor::of::<Chorus>().constructor(
        ConstructorDescriptor::sync(vec![ParameterDescriptor::list::<dyn Greeter>("voices")], |args| {
            Ok(Chorus {
                voices: args.list::<dyn Greeter>(0)?,
            })
        }),
    ));
    let factory = factory(table);
    factory
        .register_definition("english", ComponentDefinition::of::<English>().with_order(1))
        .await
        .unwrap();
    factory
        .register_definition("french", ComponentDefinition::of::<French>().with_order(5))
        .await
        .unwrap();
    factory
        .register_definition("chorus", ComponentDefinition::of::<Chorus>())
        .await
        .unwrap();

    let greeter = factory.get_typed::<dyn Greeter>().await.unwrap();
    assert_eq!(greeter.greet(), "bonjour");

    let chorus = factory.get_named_as::<Chorus>("chorus").await.unwrap();
    let voices: Vec<String> = chorus.voices.iter().map(|g| g.greet()).collect();
    assert_eq!(voices, vec!["bonjour", "hello"]);

    let all = factory.get_all_of_type(&TypeInfo::of::<dyn Greeter>()).await.unwrap();
    assert_eq!(all.keys().cloned().collect::<Vec<_>>(), vec!["english", "french"]);
    assert_eq!(factory.dependents_of("english"), vec!["chorus".to_string()]);
}

#[tokio::test]
async fn test_parameter_name_and_qualifier_select_candidate() {
    struct Host {
        greeter: Arc<dyn Greeter>,
    }

    let table = greeters(DescriptorTable::new()).with(TypeDescriptor::of::<Host>().constructor(
        ConstructorDescriptor::sync(vec![ParameterDescriptor::component::<dyn Greeter>("french")], |args| {
            Ok(Host {
                greeter: args.component::<dyn Greeter>(0)?,
            })
        }),
    ));
    let factory = factory(table);
    factory
        .register_definition("english", ComponentDefinition::of::<English>())
        .await
        .unwrap();
    factory
        .register_definition("french", ComponentDefinition::of::<French>())
        .await
        .unwrap();
    factory
        .register_definition("host", ComponentDefinition::of::<Host>())
        .await
        .unwrap();

    let host = factory.get_named_as::<Host>("host").await.unwrap();
    assert_eq!(host.greeter.greet(), "bonjour");
}

#[tokio::test]
async fn test_ignored_dependency_resolves_to_nothing() {
    struct Host {
        greeter: Option<Arc<dyn Greeter>>,
    }

    let table = greeters(DescriptorTable::new()).with(TypeDescriptor::of::<Host>().constructor(
        ConstructorDescriptor::sync(vec![ParameterDescriptor::optional::<dyn Greeter>("greeter")], |args| {
            Ok(Host {
                greeter: args.optional::<dyn Greeter>(0)?,
            })
        }),
    ));
    let factory = factory(table);
    factory.register_ignored_dependency(TypeInfo::of::<dyn Greeter>());
    factory
        .register_definition("english", ComponentDefinition::of::<English>())
        .await
        .unwrap();
    factory
        .register_definition("host", ComponentDefinition::of::<Host>())
        .await
        .unwrap();

    let host = factory.get_named_as::<Host>("host").await.unwrap();
    assert!(host.greeter.is_none());
    assert!(factory.get_named("english").await.is_ok());

    let err = factory.get_by_type(&TypeInfo::of::<dyn Greeter>()).await.unwrap_err();
    assert!(matches!(
        err.dependency_error(),
        Some(DependencyError::NoMatchingComponent { .. })
    ));
}

// ---- 属性与工厂方法 ----

#[derive(Default)]
struct Server {
    port: Mutex<u16>,
    host: Mutex<String>,
    greeter: Mutex<Option<Arc<dyn Greeter>>>,
}

fn server_table() -> DescriptorTable {
    greeters(DescriptorTable::new()).with(
        TypeDescriptor::of::<Server>()
            .constructor(ConstructorDescriptor::default_of::<Server>())
            .property(PropertyDescriptor::value::<Server, u16>("port", |s, port| {
                *s.port.lock() = port;
            }))
            .property(PropertyDescriptor::value::<Server, String>("host", |s, host| {
                *s.host.lock() = host;
            }))
            .property(PropertyDescriptor::component::<Server, dyn Greeter>(
                "greeter",
                |s, greeter| {
                    *s.greeter.lock() = Some(greeter);
                },
            )),
    )
}

#[tokio::test]
async fn test_literal_properties_are_converted() {
    let factory = factory(server_table());
    factory
        .register_definition(
            "server",
            ComponentDefinition::of::<Server>()
                .with_property("port", PropertyValue::literal("8080"))
                .with_property("host", PropertyValue::literal("localhost")),
        )
        .await
        .unwrap();

    let server = factory.get_named_as::<Server>("server").await.unwrap();
    assert_eq!(*server.port.lock(), 8080);
    assert_eq!(*server.host.lock(), "localhost");
    assert!(server.greeter.lock().is_none());
}

#[tokio::test]
async fn test_autowire_by_type_and_references() {
    let factory = factory(server_table());
    factory
        .register_definition("english", ComponentDefinition::of::<English>())
        .await
        .unwrap();
    factory
        .register_definition(
            "server",
            ComponentDefinition::of::<Server>().with_autowire_mode(AutowireMode::ByType),
        )
        .await
        .unwrap();
    factory
        .register_definition("french", ComponentDefinition::of::<French>().with_autowire_candidate(false))
        .await
        .unwrap();
    factory
        .register_definition(
            "explicit",
            ComponentDefinition::of::<Server>().with_property("greeter", PropertyValue::reference("french")),
        )
        .await
        .unwrap();

    let server = factory.get_named_as::<Server>("server").await.unwrap();
    assert_eq!(server.greeter.lock().as_ref().unwrap().greet(), "hello");

    let explicit = factory.get_named_as::<Server>("explicit").await.unwrap();
    assert_eq!(explicit.greeter.lock().as_ref().unwrap().greet(), "bonjour");
    assert_eq!(factory.dependencies_of("explicit"), vec!["french".to_string()]);
}

#[tokio::test]
async fn test_dependency_check_reports_unset_properties() {
    let factory = factory(server_table());
    factory
        .register_definition(
            "server",
            ComponentDefinition::of::<Server>()
                .with_property("port", PropertyValue::literal(80))
                .with_dependency_check(DependencyCheck::Simple),
        )
        .await
        .unwrap();

    let err = factory.get_named("server").await.unwrap_err();
    assert!(caused_by(&err, |e| matches!(
        e,
        ComponentError::Dependency(DependencyError::UnsatisfiedProperty { property, .. }) if property == "host"
    )));
}

struct Pool {
    url: String,
}

struct Connection {
    url: String,
}

#[tokio::test]
async fn test_instance_and_static_factory_methods() {
    let table = DescriptorTable::new()
        .with(
            TypeDescriptor::of::<Pool>()
                .method(MethodDescriptor::factory(
                    "open",
                    Vec::new(),
                    |pool: Arc<Pool>, _args| async move {
                        Ok(Connection {
                            url: pool.url.clone(),
                        })
                    },
                ))
                .method(MethodDescriptor::static_factory(
                    "local",
                    vec![ParameterDescriptor::value::<String>("url")],
                    |args| async move { args.value::<String>(0).map(|url| Pool { url }) },
                )),
        )
        .with(TypeDescriptor::of::<Connection>());
    let factory = factory(table);
    factory
        .register_definition(
            "pool",
            ComponentDefinition::from_static_method::<Pool>("local")
                .with_constructor_arg(0, PropertyValue::literal("postgres://localhost")),
        )
        .await
        .unwrap();
    factory
        .register_definition("connection", ComponentDefinition::from_factory_method("pool", "open"))
        .await
        .unwrap();

    let connection = factory.get_named_as::<Connection>("connection").await.unwrap();
    assert_eq!(connection.url, "postgres://localhost");
    assert_eq!(factory.dependents_of("pool"), vec!["connection".to_string()]);

    let by_type = factory.get_typed::<Connection>().await.unwrap();
    assert!(Arc::ptr_eq(&connection, &by_type));
}

#[tokio::test]
async fn test_explicit_arguments_override_constructor_parameters() {
    struct Named {
        name: String,
    }

    let table = DescriptorTable::new().with(TypeDescriptor::of::<Named>().constructor(
        ConstructorDescriptor::sync(vec![ParameterDescriptor::value::<String>("name")], |args| {
            Ok(Named {
                name: args.value::<String>(0)?,
            })
        }),
    ));
    let factory = factory(table);
    factory
        .register_definition("named", ComponentDefinition::of::<Named>().prototype())
        .await
        .unwrap();

    let instance = factory
        .get_named_with_args("named", vec![InjectionValue::Literal("worker".into())])
        .await
        .unwrap();
    assert_eq!(instance.downcast::<Named>().unwrap().name, "worker");

    let err = factory.get_named("named").await.unwrap_err();
    assert!(err.dependency_error().is_some());
}

// ---- depends-on 与生命周期 ----

type Events = Arc<Mutex<Vec<&'static str>>>;

#[derive(Default)]
struct Database;

#[derive(Default)]
struct Migrator;

fn lifecycle_table(events: &Events) -> DescriptorTable {
    let created = Arc::clone(events);
    let destroyed = Arc::clone(events);
    let migrated = Arc::clone(events);
    let stopped = Arc::clone(events);
    DescriptorTable::new()
        .with(
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
                }),
        )
        .with(
            TypeDescriptor::of::<Migrator>()
                .constructor(ConstructorDescriptor::sync(Vec::new(), move |_| {
                    migrated.lock().push("migrator:create");
                    Ok(Migrator)
                }))
                .on_destroy(move |_m: Arc<Migrator>| {
                    let stopped = Arc::clone(&stopped);
                    async move {
                        stopped.lock().push("migrator:destroy");
                        Ok(())
                    }
                }),
        )
}

#[tokio::test]
async fn test_depends_on_orders_creation_and_destruction() {
    let events: Events = Arc::default();
    let factory = factory(lifecycle_table(&events));
    factory
        .register_definition("migrator", ComponentDefinition::of::<Migrator>().depends_on("database"))
        .await
        .unwrap();
    factory
        .register_definition("database", ComponentDefinition::of::<Database>())
        .await
        .unwrap();

    factory.pre_instantiate_singletons().await.unwrap();
    factory.destroy_singletons().await;

    assert_eq!(
        *events.lock(),
        vec![
            "database:create",
            "migrator:create",
            "migrator:destroy",
            "database:destroy"
        ]
    );
    assert!(factory.singleton_names().is_empty());
}

#[tokio::test]
async fn test_circular_depends_on_is_rejected() {
    let events: Events = Arc::default();
    let factory = factory(lifecycle_table(&events));
    factory
        .register_definition("migrator", ComponentDefinition::of::<Migrator>().depends_on("database"))
        .await
        .unwrap();
    factory
        .register_definition("database", ComponentDefinition::of::<Database>().depends_on("migrator"))
        .await
        .unwrap();

    let err = factory.get_named("migrator").await.unwrap_err();
    assert!(caused_by(&err, |e| matches!(
        e,
        ComponentError::Definition(DefinitionError::CircularDependsOn { .. })
    )));
    assert!(events.lock().is_empty());
}

#[tokio::test]
async fn test_lazy_and_abstract_definitions_are_skipped() {
    let events: Events = Arc::default();
    let factory = factory(lifecycle_table(&events));
    factory
        .register_definition("database", ComponentDefinition::of::<Database>().lazy())
        .await
        .unwrap();
    factory
        .register_definition("template", ComponentDefinition::of::<Migrator>().abstract_definition())
        .await
        .unwrap();

    factory.pre_instantiate_singletons().await.unwrap();
    assert!(events.lock().is_empty());

    let err = factory.get_named("template").await.unwrap_err();
    assert!(matches!(
        err,
        ComponentError::Definition(DefinitionError::AbstractWithoutFactory { .. })
    ));
}

#[tokio::test]
async fn test_frozen_configuration_rejects_registration() {
    let factory = factory(greeters(DescriptorTable::new()));
    factory
        .register_definition("english", ComponentDefinition::of::<English>())
        .await
        .unwrap();
    factory.freeze_configuration();
    assert!(factory.is_configuration_frozen());

    let err = factory
        .register_definition("french", ComponentDefinition::of::<French>())
        .await
        .unwrap_err();
    assert!(matches!(err, DefinitionError::Frozen { .. }));
    assert!(factory.get_named("english").await.is_ok());
}

#[tokio::test]
async fn test_custom_scope_caches_until_cleared() {
    let events: Events = Arc::default();
    let factory = factory(lifecycle_table(&events));
    let session = Arc::new(MapScope::new());
    factory.register_scope("session", session.clone()).unwrap();
    factory
        .register_definition("database", ComponentDefinition::of::<Database>().with_scope("session"))
        .await
        .unwrap();

    let first = factory.get_named("database").await.unwrap();
    let second = factory.get_named("database").await.unwrap();
    assert!(first.ptr_eq(&second));
    assert!(factory.singleton_names().is_empty());

    session.clear().await;
    let third = factory.get_named("database").await.unwrap();
    assert!(!third.ptr_eq(&first));
    assert_eq!(
        *events.lock(),
        vec!["database:create", "database:destroy", "database:create"]
    );
}

// ---- 提供者与父容器 ----

#[tokio::test]
async fn test_provider_resolves_lazily() {
    struct Lazy {
        greeters: ComponentProvider,
    }

    let table = greeters(DescriptorTable::new()).with(TypeDescriptor::of::<Lazy>().constructor(
        ConstructorDescriptor::sync(vec![ParameterDescriptor::provider::<dyn Greeter>("greeters")], |args| {
            Ok(Lazy {
                greeters: args.provider(0)?,
            })
        }),
    ));
    let factory = factory(table);
    factory
        .register_definition("lazy", ComponentDefinition::of::<Lazy>())
        .await
        .unwrap();

    let lazy = factory.get_named_as::<Lazy>("lazy").await.unwrap();
    assert!(lazy.greeters.get_if_available().await.unwrap().is_none());
    assert!(lazy.greeters.get().await.is_err());

    factory
        .register_definition("english", ComponentDefinition::of::<English>())
        .await
        .unwrap();
    let greeter = lazy.greeters.get_as::<dyn Greeter>().await.unwrap();
    assert_eq!(greeter.greet(), "hello");

    factory
        .register_definition("french", ComponentDefinition::of::<French>())
        .await
        .unwrap();
    assert!(lazy.greeters.get_if_unique().await.unwrap().is_none());
    assert_eq!(lazy.greeters.stream().await.unwrap().len(), 2);

    factory
        .modify_definition("french", |definition| definition.order = Some(2))
        .unwrap();
    let unique = lazy.greeters.get_if_unique().await.unwrap().unwrap();
    assert_eq!(unique.cast::<dyn Greeter>().unwrap().greet(), "bonjour");

    let ordered = lazy.greeters.ordered_stream().await.unwrap();
    let voices: Vec<String> = ordered
        .iter()
        .map(|instance| instance.cast::<dyn Greeter>().unwrap().greet())
        .collect();
    assert_eq!(voices, vec!["bonjour", "hello"]);
}

#[tokio::test]
async fn test_child_factory_delegates_to_parent() {
    let parent = factory(greeters(DescriptorTable::new()));
    parent
        .register_definition("english", ComponentDefinition::of::<English>())
        .await
        .unwrap();

    let child = DefaultComponentFactory::with_parent(
        Arc::new(parent.clone()),
        Arc::new(greeters(DescriptorTable::new())),
        ContainerOptions::default(),
    );
    assert!(child.contains_component("english"));

    let from_child = child.get_typed::<dyn Greeter>().await.unwrap();
    let from_parent = parent.get_typed::<dyn Greeter>().await.unwrap();
    assert!(Arc::ptr_eq(&from_child, &from_parent));
    assert_eq!(child.is_singleton("english"), Ok(true));
    assert!(child.singleton_names().is_empty());
}
