// Callback hooks around agent runs
//
// A bag of handlers indexed by (moment, kind). The runner fires
// (Before, "agent") and (After, "agent") around every run; other kinds are
// free for callers. Handlers run synchronously in registration order and
// the manager does not catch their failures - the first error stops the
// firing and is returned to whoever fired.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::agent::{Agent, RunContext};
use crate::error::Result;
use crate::trace::Trace;

/// When a hook fires relative to the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Moment {
    Before,
    After,
}

/// Context handed to every handler
pub struct HookContext<'a> {
    pub moment: Moment,
    pub kind: &'a str,
    pub trace: &'a Trace,
    pub agent: &'a dyn Agent,
    pub ctx: &'a RunContext,
}

pub type Handler = Arc<dyn Fn(&HookContext<'_>) -> Result<()> + Send + Sync>;

/// Registry of lifecycle hooks.
///
/// Registration is expected during startup; the lock exists so a shared
/// manager can still accept late registrations without an exclusive
/// bootstrap phase. Handlers are invoked outside the lock.
#[derive(Default)]
pub struct CallbackManager {
    handlers: RwLock<HashMap<(Moment, String), Vec<Handler>>>,
}

impl CallbackManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler for (moment, kind)
    pub fn register(
        &self,
        moment: Moment,
        kind: impl Into<String>,
        handler: impl Fn(&HookContext<'_>) -> Result<()> + Send + Sync + 'static,
    ) {
        self.handlers
            .write()
            .unwrap()
            .entry((moment, kind.into()))
            .or_default()
            .push(Arc::new(handler));
    }

    /// Invoke every handler registered for (moment, kind), in registration
    /// order. Stops at the first failing handler and returns its error.
    pub fn fire(&self, moment: Moment, kind: &str, cx: &HookContext<'_>) -> Result<()> {
        let handlers: Vec<Handler> = self
            .handlers
            .read()
            .unwrap()
            .get(&(moment, kind.to_string()))
            .cloned()
            .unwrap_or_default();
        for handler in handlers {
            handler(cx)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::EchoAgent;
    use crate::error::Error;
    use crate::trace::Trace;
    use std::sync::Mutex;

    fn fire_with_dummy_context(
        manager: &CallbackManager,
        moment: Moment,
        kind: &str,
    ) -> Result<()> {
        let agent = EchoAgent;
        let trace = Trace::new("agent", "echo", "v1", Default::default());
        let ctx = RunContext::new("s1");
        let cx = HookContext {
            moment,
            kind,
            trace: &trace,
            agent: &agent,
            ctx: &ctx,
        };
        manager.fire(moment, kind, &cx)
    }

    #[test]
    fn handlers_fire_in_registration_order() {
        let manager = CallbackManager::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            manager.register(Moment::Before, "agent", move |_| {
                order.lock().unwrap().push(tag);
                Ok(())
            });
        }

        fire_with_dummy_context(&manager, Moment::Before, "agent").unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn kinds_and_moments_are_independent() {
        let manager = CallbackManager::new();
        let hits = Arc::new(Mutex::new(0usize));

        let h = Arc::clone(&hits);
        manager.register(Moment::Before, "agent", move |_| {
            *h.lock().unwrap() += 1;
            Ok(())
        });

        fire_with_dummy_context(&manager, Moment::After, "agent").unwrap();
        fire_with_dummy_context(&manager, Moment::Before, "tool").unwrap();
        assert_eq!(*hits.lock().unwrap(), 0);

        fire_with_dummy_context(&manager, Moment::Before, "agent").unwrap();
        assert_eq!(*hits.lock().unwrap(), 1);
    }

    #[test]
    fn first_failing_handler_stops_the_firing() {
        let manager = CallbackManager::new();
        let reached = Arc::new(Mutex::new(false));

        manager.register(Moment::Before, "agent", |_| {
            Err(Error::callback("instrumentation broke"))
        });
        let r = Arc::clone(&reached);
        manager.register(Moment::Before, "agent", move |_| {
            *r.lock().unwrap() = true;
            Ok(())
        });

        let err = fire_with_dummy_context(&manager, Moment::Before, "agent").unwrap_err();
        assert!(err.to_string().contains("instrumentation broke"));
        assert!(!*reached.lock().unwrap());
    }
}
