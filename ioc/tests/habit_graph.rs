//! Wires the habit-tracker object graph: an application context, a database
//! singleton, an unscoped DAO, a repository and per-screen view models.

use pretty_assertions::assert_eq;
use std::sync::Arc;
use vita_ioc::{
  injectable, Container, ContainerConfig, DynError, GraphBuilder, Inject, Lifetime, Named, Qualifier, Resolver,
  ScopeName,
};

// --- Test Fixtures ---

struct ApplicationContext;
impl Qualifier for ApplicationContext {
  const NAME: &'static str = "application_context";
}

struct AppContext {
  package: String,
}

struct HabitsDatabase {
  path: String,
}

impl Inject for HabitsDatabase {
  type Deps = (Named<AppContext, ApplicationContext>,);

  fn inject((context,): Self::Deps) -> Result<Self, DynError> {
    Ok(HabitsDatabase {
      path: format!("/data/{}/habits.db", context.package),
    })
  }
}

trait HabitDao: Send + Sync {
  fn database_path(&self) -> &str;
}

struct SqlHabitDao {
  db: Arc<HabitsDatabase>,
}

impl HabitDao for SqlHabitDao {
  fn database_path(&self) -> &str {
    &self.db.path
  }
}

struct HabitRepository {
  dao: Arc<dyn HabitDao>,
}

impl HabitRepository {
  fn new(dao: Arc<dyn HabitDao>) -> Self {
    HabitRepository { dao }
  }
}

injectable!(HabitRepository => HabitRepository::new; dao: dyn HabitDao);

struct HabitListViewModel {
  repository: Arc<HabitRepository>,
}

struct HabitDetailViewModel {
  repository: Arc<HabitRepository>,
}

fn habit_graph() -> Container {
  let mut builder = GraphBuilder::from_config(&ContainerConfig::with_standard_scopes()).unwrap();
  builder
    .add_instance_with_name(
      ApplicationContext::NAME,
      AppContext {
        package: "org.vita.habits".to_string(),
      },
    )
    .unwrap()
    .add_injectable::<HabitsDatabase>(Lifetime::Singleton)
    .unwrap()
    .register(
      vita_ioc::Binding::builder::<dyn HabitDao>(Lifetime::Unscoped)
        .depends_on::<HabitsDatabase>()
        .to_arc(|args| Ok(Arc::new(SqlHabitDao { db: args.next()? }))),
    )
    .unwrap()
    .add_injectable::<HabitRepository>(Lifetime::Singleton)
    .unwrap()
    .register(
      vita_ioc::Binding::builder::<dyn std::any::Any + Send + Sync>(Lifetime::scoped(ScopeName::VIEW_MODEL))
        .named("HabitListViewModel")
        .depends_on::<HabitRepository>()
        .to_arc(|args| Ok(Arc::new(HabitListViewModel { repository: args.next()? }))),
    )
    .unwrap()
    .register(
      vita_ioc::Binding::builder::<dyn std::any::Any + Send + Sync>(Lifetime::scoped(ScopeName::VIEW_MODEL))
        .named("HabitDetailViewModel")
        .depends_on::<HabitRepository>()
        .to_arc(|args| Ok(Arc::new(HabitDetailViewModel { repository: args.next()? }))),
    )
    .unwrap();
  match builder.build() {
    Ok(container) => container,
    Err(errors) => panic!("{}", errors),
  }
}

// --- Habit Graph Tests ---

#[test]
fn test_database_uses_qualified_context() {
  // Arrange
  let container = habit_graph();

  // Act
  let db = container.resolve::<HabitsDatabase>().unwrap();

  // Assert
  assert_eq!(db.path, "/data/org.vita.habits/habits.db");
}

#[test]
fn test_dao_is_unscoped_over_singleton_database() {
  // Arrange
  let container = habit_graph();

  // Act
  let d1 = container.resolve::<dyn HabitDao>().unwrap();
  let d2 = container.resolve::<dyn HabitDao>().unwrap();

  // Assert
  assert!(!Arc::ptr_eq(&d1, &d2));
  assert_eq!(d1.database_path(), d2.database_path());
}

#[test]
fn test_repository_is_a_singleton() {
  // Arrange
  let container = habit_graph();

  // Act
  let r1 = container.resolve::<HabitRepository>().unwrap();
  let r2 = container.resolve::<HabitRepository>().unwrap();

  // Assert
  assert!(Arc::ptr_eq(&r1, &r2));
  assert_eq!(r1.dao.database_path(), "/data/org.vita.habits/habits.db");
}

#[test]
fn test_view_models_live_in_view_model_scope() {
  // Arrange
  let container = habit_graph();
  let retained = container.enter_scope(ScopeName::ACTIVITY_RETAINED).unwrap();
  let screen = retained.enter_scope(ScopeName::VIEW_MODEL).unwrap();

  // Act
  let names = container.names_for::<dyn std::any::Any + Send + Sync>();
  let list = screen
    .resolve_named::<dyn std::any::Any + Send + Sync>("HabitListViewModel")
    .unwrap();
  let again = screen
    .resolve_named::<dyn std::any::Any + Send + Sync>("HabitListViewModel")
    .unwrap();
  let detail = screen
    .resolve_named::<dyn std::any::Any + Send + Sync>("HabitDetailViewModel")
    .unwrap();

  // Assert
  assert_eq!(names, vec!["HabitDetailViewModel", "HabitListViewModel"]);
  assert!(Arc::ptr_eq(&list, &again));
  let list = list.downcast::<HabitListViewModel>().ok().unwrap();
  let detail = detail.downcast::<HabitDetailViewModel>().ok().unwrap();
  assert!(Arc::ptr_eq(&list.repository, &detail.repository));
}

#[test]
fn test_view_models_are_not_available_at_root() {
  // Arrange
  let container = habit_graph();

  // Act
  let result = container.resolve_named::<dyn std::any::Any + Send + Sync>("HabitListViewModel");

  // Assert
  assert!(result.is_err());
}
