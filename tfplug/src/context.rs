//! Request-scoped cancellation, deadlines and values
//!
//! Contexts form a tree. The gRPC service owns a root that StopProvider
//! cancels, and every RPC receives a child of it. A child is cancelled when
//! it is cancelled itself, when its deadline passes, or when any ancestor is
//! cancelled. Values set on an ancestor are visible to its children.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::time::{self, Instant};

/// Pass this to every long-running operation so it can stop early
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    parent: Option<Context>,
    deadline: Option<Instant>,
    values: RwLock<HashMap<String, Arc<dyn Any + Send + Sync>>>,
    cancelled: watch::Sender<bool>,
}

impl Context {
    pub fn new() -> Self {
        Self::derive(None, None)
    }

    fn derive(parent: Option<Context>, deadline: Option<Instant>) -> Self {
        let (cancelled, _) = watch::channel(false);
        Self {
            inner: Arc::new(ContextInner {
                parent,
                deadline,
                values: RwLock::new(HashMap::new()),
                cancelled,
            }),
        }
    }

    /// A context that can be cancelled on its own but also ends with `self`
    pub fn child(&self) -> Self {
        Self::derive(Some(self.clone()), self.inner.deadline)
    }

    /// A child that is cancelled `timeout` from now. An earlier deadline
    /// inherited from the parent still applies.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let own = Instant::now() + timeout;
        let deadline = match self.inner.deadline {
            Some(inherited) if inherited < own => inherited,
            _ => own,
        };
        Self::derive(Some(self), Some(deadline))
    }

    pub async fn with_value<T: Send + Sync + 'static>(self, key: &str, value: T) -> Self {
        self.inner
            .values
            .write()
            .await
            .insert(key.to_string(), Arc::new(value));
        self
    }

    /// Looks `key` up here first, then in each ancestor
    pub async fn get_value<T>(&self, key: &str) -> Option<T>
    where
        T: Send + Sync + Clone + 'static,
    {
        let mut current = Some(self);
        while let Some(ctx) = current {
            if let Some(value) = ctx.inner.values.read().await.get(key) {
                return value.downcast_ref::<T>().cloned();
            }
            current = ctx.inner.parent.as_ref();
        }
        None
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancelled.borrow()
            || self.inner.deadline.is_some_and(|d| Instant::now() >= d)
            || self.inner.parent.as_ref().is_some_and(Context::is_cancelled)
    }

    /// Cancels this context and its children. Ancestors are unaffected.
    pub fn cancel(&self) {
        self.inner.cancelled.send_replace(true);
    }

    /// Resolves once the context is cancelled or its deadline passes
    pub async fn cancelled(&self) {
        let own = async {
            let mut rx = self.inner.cancelled.subscribe();
            loop {
                let done = *rx.borrow_and_update();
                if done {
                    break;
                }
                if rx.changed().await.is_err() {
                    std::future::pending::<()>().await;
                }
            }
        };
        let deadline = async {
            match self.inner.deadline {
                Some(deadline) => time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };
        let parent = async {
            match &self.inner.parent {
                Some(parent) => parent.cancelled_boxed().await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = own => {}
            _ = deadline => {}
            _ = parent => {}
        }
    }

    fn cancelled_boxed(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(self.cancelled())
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
