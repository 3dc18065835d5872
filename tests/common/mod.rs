#![allow(dead_code)]

use std::sync::Arc;

use deepcheck::exec::Check;
use deepcheck::runner::CheckRegistry;

pub use deepcheck_test_utils::builders::definition;
pub use deepcheck_test_utils::fake_check::{FakeBehaviour, FakeCheck};
pub use deepcheck_test_utils::{init_tracing, with_timeout};

/// Registry holding the given fake checks.
pub fn registry_of(checks: &[Arc<FakeCheck>]) -> Arc<CheckRegistry> {
    let mut registry = CheckRegistry::new();
    for check in checks {
        registry.register(Arc::clone(check) as Arc<dyn Check>);
    }
    Arc::new(registry)
}
