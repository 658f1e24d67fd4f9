use std::sync::Arc;
use vita_ioc::{Container, GraphError};

struct Clock;

struct Scheduler {
  _clock: Arc<Clock>,
}

struct Reporter {
  _scheduler: Arc<Scheduler>,
}

fn main() {
  let mut builder = Container::builder();
  // `Clock` is never bound.
  builder
    .add_singleton(|(clock,): (Arc<Clock>,)| Ok(Scheduler { _clock: clock }))
    .and_then(|b| b.add_transient(|(scheduler,): (Arc<Scheduler>,)| Ok(Reporter { _scheduler: scheduler })))
    .expect("each key is registered once");

  // Assembly reports every problem at once instead of failing on first use.
  match builder.build() {
    Ok(_) => println!("Unexpectedly assembled an incomplete graph."),
    Err(errors) => {
      println!("{}", errors);
      for error in &errors {
        if let GraphError::UnresolvedDependency { dependency, required_by } = error {
          println!("Bind '{}' to satisfy '{}'.", dependency, required_by);
        }
      }
    }
  }
}
