use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use vita_ioc::{injectable, Binding, Container, ContainerConfig, GraphBuilder, Lifetime, Resolver, ScopeName};

// 1. The persistence layer: a database and a DAO abstraction over it.
struct HabitsDatabase {
  path: String,
}

trait HabitDao: Send + Sync {
  fn list(&self) -> Vec<String>;
}

struct SqlHabitDao {
  db: Arc<HabitsDatabase>,
}

impl HabitDao for SqlHabitDao {
  fn list(&self) -> Vec<String> {
    vec![format!("Drink water (from {})", self.db.path)]
  }
}

// 2. The repository depends only on the abstraction.
struct HabitRepository {
  dao: Arc<dyn HabitDao>,
}

impl HabitRepository {
  fn new(dao: Arc<dyn HabitDao>) -> Self {
    HabitRepository { dao }
  }
}

injectable!(HabitRepository => HabitRepository::new; dao: dyn HabitDao);

// 3. A screen's view model, one per view-model scope.
struct HabitListViewModel {
  repository: Arc<HabitRepository>,
}

fn main() -> vita_ioc::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vita_ioc=debug")))
    .init();

  // --- Registration ---
  let mut builder = GraphBuilder::from_config(&ContainerConfig::with_standard_scopes())?;
  builder
    .add_instance(HabitsDatabase {
      path: "/data/habits.db".to_string(),
    })?
    .register(
      Binding::builder::<dyn HabitDao>(Lifetime::Unscoped)
        .depends_on::<HabitsDatabase>()
        .to_arc(|args| Ok(Arc::new(SqlHabitDao { db: args.next()? }))),
    )?
    .add_injectable::<HabitRepository>(Lifetime::Singleton)?
    .register(
      Binding::builder::<HabitListViewModel>(Lifetime::scoped(ScopeName::VIEW_MODEL))
        .depends_on::<HabitRepository>()
        .on_release(|_| println!("HabitListViewModel cleared"))
        .to(|args| {
          Ok(HabitListViewModel {
            repository: args.next()?,
          })
        }),
    )?;

  // The whole graph is validated here, before anything is constructed.
  let container: Container = builder.build()?;
  container.warm_up()?;

  // --- Usage ---
  let retained = container.enter_scope(ScopeName::ACTIVITY_RETAINED)?;
  let screen = retained.enter_scope(ScopeName::VIEW_MODEL)?;
  let view_model = screen.resolve::<HabitListViewModel>()?;
  for habit in view_model.repository.dao.list() {
    println!("Habit: {}", habit);
  }

  // Leaving the screen releases its view model.
  screen.exit();
  retained.exit();
  container.shutdown();
  Ok(())
}
