//! Isolated registration namespaces and the manager that owns them.

use crate::manager::DependencyManager;
use crate::store::ConcurrentStore;

use std::fmt;
use std::sync::Arc;

/// Environment variable read by [`ExecutionMode::from_env`].
pub const MODE_ENV_VAR: &str = "FIBRE_INJECT_MODE";

/// An isolated namespace of registrations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Context {
  /// The default context shared by the whole application.
  #[default]
  Global,
  /// A per-test-file context; duplicate registrations update instead of failing.
  Tests(String),
  /// A named context for callers that want their own namespace.
  Custom(String),
}

impl Context {
  pub fn tests(name: impl Into<String>) -> Self {
    Context::Tests(name.into())
  }

  pub fn custom(name: impl Into<String>) -> Self {
    Context::Custom(name.into())
  }

  /// The key the context is stored under. Distinct contexts never share one.
  pub fn id(&self) -> String {
    self.to_string()
  }

  pub fn is_test(&self) -> bool {
    matches!(self, Context::Tests(_))
  }
}

impl fmt::Display for Context {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Context::Global => f.write_str("global"),
      Context::Tests(name) => write!(f, "tests:{}", name),
      Context::Custom(name) => write!(f, "custom:{}", name),
    }
  }
}

/// Whether the process runs application code or a test harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
  #[default]
  Application,
  /// Global lookups may be redirected to per-test-file contexts.
  Testing,
}

impl ExecutionMode {
  /// Reads [`MODE_ENV_VAR`]; `test` or `testing` (any case) selects
  /// [`ExecutionMode::Testing`].
  pub fn from_env() -> Self {
    match std::env::var(MODE_ENV_VAR) {
      Ok(value) => Self::parse(&value),
      Err(_) => ExecutionMode::Application,
    }
  }

  fn parse(value: &str) -> Self {
    match value.trim().to_ascii_lowercase().as_str() {
      "test" | "testing" => ExecutionMode::Testing,
      _ => ExecutionMode::Application,
    }
  }
}

/// Owns one [`DependencyManager`] per context id.
pub struct ContextManager {
  managers: ConcurrentStore<Arc<DependencyManager>>,
  mode: ExecutionMode,
  test_overwrite: bool,
}

impl Default for ContextManager {
  fn default() -> Self {
    ContextManagerBuilder::default().build()
  }
}

impl ContextManager {
  /// A manager running in [`ExecutionMode::Application`].
  pub fn new() -> Self {
    Self::default()
  }

  pub fn builder() -> ContextManagerBuilder {
    ContextManagerBuilder::default()
  }

  pub fn execution_mode(&self) -> ExecutionMode {
    self.mode
  }

  /// Returns the manager for `context`, creating an empty one on first access.
  ///
  /// Concurrent first accesses all receive the same manager.
  pub fn get(&self, context: &Context) -> Arc<DependencyManager> {
    self
      .managers
      .get_or_insert_with(&context.id(), || self.create(context))
  }

  /// Installs a fresh, empty manager for `context`, replacing any existing one.
  ///
  /// Observers of a replaced manager are failed and move to the new one the
  /// next time they are read.
  pub fn register(&self, context: &Context) -> Arc<DependencyManager> {
    let manager = self.create(context);
    if let Some(previous) = self.managers.set(context.id(), manager.clone()) {
      previous.detach();
    }
    manager
  }

  /// Drops the manager for `context`. Returns whether one existed.
  ///
  /// Resolutions already holding the old manager finish against it; the next
  /// [`Self::get`] starts from an empty one. Observers of the removed manager
  /// lose their values.
  pub fn remove(&self, context: &Context) -> bool {
    let Some(removed) = self.managers.remove(&context.id()) else {
      return false;
    };
    removed.detach();
    if crate::diagnostics::verbose() {
      tracing::trace!(target: crate::diagnostics::TARGET, context = %context, "context removed");
    }
    true
  }

  pub fn contains(&self, context: &Context) -> bool {
    self.managers.contains(&context.id())
  }

  /// Ids of every live context, sorted.
  pub fn contexts(&self) -> Vec<String> {
    let mut ids = Vec::with_capacity(self.managers.count());
    self.managers.for_each(|id, _| ids.push(id.to_owned()));
    ids.sort();
    ids
  }

  pub fn len(&self) -> usize {
    self.managers.count()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Picks the context a lookup should actually use.
  ///
  /// Under [`ExecutionMode::Testing`], a request for [`Context::Global`] is
  /// redirected to `Context::Tests(source_file_id)`, but only if that context
  /// already exists. Every other request is returned unchanged.
  pub fn transform_to_valid_context(&self, context: &Context, source_file_id: &str) -> Context {
    if self.mode != ExecutionMode::Testing || *context != Context::Global {
      return context.clone();
    }
    let candidate = Context::tests(source_file_id);
    if self.contains(&candidate) {
      candidate
    } else {
      Context::Global
    }
  }

  /// [`Self::transform_to_valid_context`] followed by [`Self::get`].
  pub fn resolve(&self, context: &Context, source_file_id: &str) -> Arc<DependencyManager> {
    self.get(&self.transform_to_valid_context(context, source_file_id))
  }

  fn create(&self, context: &Context) -> Arc<DependencyManager> {
    Arc::new(DependencyManager::new(context.clone(), self.test_overwrite))
  }
}

impl fmt::Debug for ContextManager {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ContextManager")
      .field("mode", &self.mode)
      .field("contexts", &self.managers.count())
      .finish()
  }
}

/// Configures a [`ContextManager`].
#[derive(Debug, Clone)]
pub struct ContextManagerBuilder {
  mode: ExecutionMode,
  test_overwrite: bool,
}

impl Default for ContextManagerBuilder {
  fn default() -> Self {
    Self {
      mode: ExecutionMode::Application,
      test_overwrite: true,
    }
  }
}

impl ContextManagerBuilder {
  pub fn execution_mode(mut self, mode: ExecutionMode) -> Self {
    self.mode = mode;
    self
  }

  /// Whether `register` in a test context updates an existing registration
  /// instead of rejecting it. Enabled by default.
  pub fn test_contexts_allow_overwrite(mut self, allow: bool) -> Self {
    self.test_overwrite = allow;
    self
  }

  pub fn build(self) -> ContextManager {
    ContextManager {
      managers: ConcurrentStore::new(),
      mode: self.mode,
      test_overwrite: self.test_overwrite,
    }
  }
}
