//! The strategy contract: how a value becomes a comparable, persistable artifact

use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::marker::PhantomData;
use thiserror::Error;

/// Failure reported by a strategy while encoding or decoding an artifact.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct StrategyError(String);

impl StrategyError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Auxiliary artifact produced alongside a diff, e.g. a highlighted image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// File-name suffix, e.g. `difference.png`
    pub name: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// A discrepancy between reference and candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Difference {
    pub message: String,
    pub attachments: Vec<Attachment>,
}

impl Difference {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

/// Handle to an artifact that may still be in production.
///
/// Resolves to `None` when the strategy gave up without an artifact.
pub struct Rendering<F> {
    state: RenderState<F>,
}

pub(crate) enum RenderState<F> {
    Ready(Option<F>),
    Pending(BoxFuture<'static, Option<F>>),
}

impl<F: Send + 'static> Rendering<F> {
    pub fn ready(format: F) -> Self {
        Self {
            state: RenderState::Ready(Some(format)),
        }
    }

    pub fn failed() -> Self {
        Self {
            state: RenderState::Ready(None),
        }
    }

    /// An artifact produced asynchronously. The engine drives the future on
    /// its own runtime and stops waiting after the call's timeout.
    pub fn deferred(future: impl Future<Output = Option<F>> + Send + 'static) -> Self {
        Self {
            state: RenderState::Pending(future.boxed()),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, RenderState::Ready(_))
    }

    pub fn map<G: Send + 'static>(self, f: impl FnOnce(F) -> G + Send + 'static) -> Rendering<G> {
        match self.state {
            RenderState::Ready(format) => Rendering {
                state: RenderState::Ready(format.map(f)),
            },
            RenderState::Pending(future) => Rendering::deferred(async move { future.await.map(f) }),
        }
    }

    pub fn into_future(self) -> BoxFuture<'static, Option<F>> {
        match self.state {
            RenderState::Ready(format) => futures::future::ready(format).boxed(),
            RenderState::Pending(future) => future,
        }
    }

    pub(crate) fn into_state(self) -> RenderState<F> {
        self.state
    }
}

/// Renders values of type `V` into a `Format` that can be persisted and
/// diffed.
///
/// `from_bytes(to_bytes(f))` must diff as equal to `f`, otherwise every
/// comparison against a stored reference reports drift.
pub trait Snapshotting<V> {
    type Format: Send + 'static;

    /// Extension of reference files; `None` for extensionless files.
    fn path_extension(&self) -> Option<&str> {
        None
    }

    fn render(&self, value: V) -> Rendering<Self::Format>;

    fn to_bytes(&self, format: &Self::Format) -> Result<Vec<u8>, StrategyError>;

    fn from_bytes(&self, bytes: &[u8]) -> Result<Self::Format, StrategyError>;

    /// `None` when the two are equivalent under this strategy's policy.
    fn diff(&self, reference: &Self::Format, candidate: &Self::Format) -> Option<Difference>;
}

impl<V, S: Snapshotting<V> + ?Sized> Snapshotting<V> for &S {
    type Format = S::Format;

    fn path_extension(&self) -> Option<&str> {
        (**self).path_extension()
    }

    fn render(&self, value: V) -> Rendering<Self::Format> {
        (**self).render(value)
    }

    fn to_bytes(&self, format: &Self::Format) -> Result<Vec<u8>, StrategyError> {
        (**self).to_bytes(format)
    }

    fn from_bytes(&self, bytes: &[u8]) -> Result<Self::Format, StrategyError> {
        (**self).from_bytes(bytes)
    }

    fn diff(&self, reference: &Self::Format, candidate: &Self::Format) -> Option<Difference> {
        (**self).diff(reference, candidate)
    }
}

/// A strategy for `U` built from a strategy for `V` and a `U -> V` transform.
pub struct Pullback<S, G, V> {
    strategy: S,
    transform: G,
    _value: PhantomData<fn(V)>,
}

impl<U, V, S, G> Snapshotting<U> for Pullback<S, G, V>
where
    S: Snapshotting<V>,
    G: Fn(U) -> V,
{
    type Format = S::Format;

    fn path_extension(&self) -> Option<&str> {
        self.strategy.path_extension()
    }

    fn render(&self, value: U) -> Rendering<Self::Format> {
        self.strategy.render((self.transform)(value))
    }

    fn to_bytes(&self, format: &Self::Format) -> Result<Vec<u8>, StrategyError> {
        self.strategy.to_bytes(format)
    }

    fn from_bytes(&self, bytes: &[u8]) -> Result<Self::Format, StrategyError> {
        self.strategy.from_bytes(bytes)
    }

    fn diff(&self, reference: &Self::Format, candidate: &Self::Format) -> Option<Difference> {
        self.strategy.diff(reference, candidate)
    }
}

pub trait SnapshottingExt<V>: Snapshotting<V> + Sized {
    /// Reuse this strategy for another value type.
    fn pullback<U, G>(self, transform: G) -> Pullback<Self, G, V>
    where
        G: Fn(U) -> V,
    {
        Pullback {
            strategy: self,
            transform,
            _value: PhantomData,
        }
    }
}

impl<V, S: Snapshotting<V>> SnapshottingExt<V> for S {}
