//! BoxActivity -- object-safe dynamic dispatch wrapper for Activity.
//!
//! 1. Define an object-safe `ActivityDyn` trait with boxed futures
//! 2. Blanket-impl `ActivityDyn` for all `T: Activity`
//! 3. `BoxActivity` wraps `Box<dyn ActivityDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use orcha_types::orchestration::JobExecutionContext;
use serde_json::Value;

use super::{Activity, ActivityError};

/// Object-safe version of [`Activity`] with boxed futures.
pub trait ActivityDyn: Send + Sync {
    fn name(&self) -> &str;

    fn run_boxed(
        &self,
        context: JobExecutionContext,
    ) -> Pin<Box<dyn Future<Output = Result<Value, ActivityError>> + Send + '_>>;
}

impl<T: Activity> ActivityDyn for T {
    fn name(&self) -> &str {
        Activity::name(self)
    }

    fn run_boxed(
        &self,
        context: JobExecutionContext,
    ) -> Pin<Box<dyn Future<Output = Result<Value, ActivityError>> + Send + '_>> {
        Box::pin(self.run(context))
    }
}

/// Type-erased activity, storable in a registry.
pub struct BoxActivity {
    inner: Box<dyn ActivityDyn>,
}

impl BoxActivity {
    pub fn new<T: Activity + 'static>(activity: T) -> Self {
        Self {
            inner: Box::new(activity),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub async fn run(&self, context: JobExecutionContext) -> Result<Value, ActivityError> {
        self.inner.run_boxed(context).await
    }
}

impl std::fmt::Debug for BoxActivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxActivity")
            .field("name", &self.name())
            .finish()
    }
}
