//! Built-in leaf activities.
//!
//! - `Delay` -- sleeps for `DelayMilliseconds`
//! - `EchoJobName` -- greets with the job name
//! - `Skip` -- logs and does nothing

pub mod delay;
pub mod echo_job_name;
pub mod skip;

use orcha_core::activity::registry::ActivityRegistry;

pub use delay::DelayActivity;
pub use echo_job_name::EchoJobNameActivity;
pub use skip::SkipActivity;

/// A registry holding every built-in activity.
pub fn builtin_registry() -> ActivityRegistry {
    let mut registry = ActivityRegistry::new();
    registry
        .register(DelayActivity)
        .register(EchoJobNameActivity)
        .register(SkipActivity);
    registry
}
