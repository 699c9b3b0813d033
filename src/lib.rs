//! # Weft IoC
//!
//! A scope-aware Inversion of Control (IoC) container for Rust.
//!
//! Weft separates wiring into a build phase and a run phase. At build
//! time, a scanner enumerates candidate component types and the markers
//! declared on them; the classifier assigns each type a wiring role, the
//! injector graph orders their creation (with provider indirection for
//! lazy values and cycle breaking), and the result is emitted as a batched
//! wiring program. At run time, executing that program populates the bean
//! manager, which resolves lookups by type and qualifying metadata and
//! tracks which instances were created together so they can be destroyed
//! together.
//!
//! ## Core Concepts
//!
//! - **Bean manager**: the runtime index from (type, qualifiers, name) to
//!   definitions and live instances.
//! - **Creational context**: a scoped set of co-created instances with
//!   shared teardown; the root context is the application-lifetime
//!   singleton scope.
//! - **Markers**: capability tags read by the classifier, including
//!   composite ("stereotype") markers resolved recursively.
//! - **Providers**: indirection nodes that materialize a value once and
//!   serve cached reads afterwards, which is also how construction cycles
//!   are broken.
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use weft_ioc::{BeanInstance, Container, StaticScanner, TypeDescriptor};
//!
//! struct AppConfig {
//!   database_url: String,
//! }
//!
//! struct UserService {
//!   config: Arc<AppConfig>,
//! }
//!
//! fn main() {
//!   let mut scanner = StaticScanner::new();
//!
//!   // A shared configuration object, one instance for the application.
//!   scanner.add_type(TypeDescriptor::new::<AppConfig, AppConfig>(
//!     "app.AppConfig",
//!     |manager, context| {
//!       let instance: BeanInstance = Arc::new(AppConfig {
//!         database_url: "postgres://localhost/app".into(),
//!       });
//!       manager.register_creation(context, instance.clone(), None);
//!       instance
//!     },
//!   ));
//!   scanner.mark("app.AppConfig", &["ApplicationScoped"]);
//!
//!   // A service built fresh per lookup, resolving the config through the
//!   // manager.
//!   scanner.add_type(TypeDescriptor::new::<UserService, UserService>(
//!     "app.UserService",
//!     |manager, context| {
//!       let config = manager.instance_of::<AppConfig>(&[]).unwrap();
//!       let instance: BeanInstance = Arc::new(UserService { config });
//!       manager.register_creation(context, instance.clone(), None);
//!       instance
//!     },
//!   ));
//!   scanner.mark("app.UserService", &["Dependent"]);
//!
//!   let app = Container::new(Arc::new(scanner)).bootstrap().unwrap();
//!   let manager = app.bean_manager();
//!
//!   let service = manager.instance_of::<UserService>(&[]).unwrap();
//!   assert_eq!(service.config.database_url, "postgres://localhost/app");
//! }
//! ```

mod classifier;
mod container;
mod context;
mod definition;
mod emitter;
mod error;
mod graph;
mod manager;
mod pipeline;
mod qualifier;
mod reachability;
mod scanner;

pub use classifier::{
  apply_default_roles, default_role_map, markers, process_stereotypes, RoleMap, WiringRole,
};
pub use container::{ApplicationContext, Container, Disposer};
pub use context::{CreationalContext, APPLICATION_SCOPE};
pub use definition::{
  Anything, BeanDef, BeanInstance, BeanScope, CreationalCallback, DestructionCallback, TypeKey,
};
pub use emitter::{
  classpath_fingerprint, Bootstrapper, CodeEmitter, Exposure, ExposureKind, GenerationCache,
  InProcessEmitter, PrivateAccess, WiringProgram, DECLARATION_BATCH_SIZE,
};
pub use error::{BootstrapError, ResolutionError};
pub use graph::{GraphBuilder, Injector, InjectorGraph, InjectorId, InjectorKind, WiringStatement};
pub use manager::BeanManager;
pub use pipeline::{
  assemble_program, CodeDecorator, DecoratorBinding, ExtensionConfigurator, InjectionContext,
  ProcessingContext, ENABLED_ALTERNATIVES_PROPERTY, PROPERTIES_FILE,
  QUALIFYING_METADATA_FACTORY_PROPERTY,
};
pub use qualifier::{
  matches_qualifiers, metadata_factory, MarkerOnlyMetadata, Qualifier, QualifyingMetadata,
  ValueEqualityMetadata,
};
pub use reachability::{analyze_reachability, ReachableTypes, SourceArtifact};
pub use scanner::{BootstrapTaskFn, StaticScanner, TypeDescriptor, TypeScanner};
