use std::fmt;
use std::panic::Location;

/// Where an injection was requested from.
///
/// The text is only ever echoed in diagnostics. The file part doubles as the
/// id of the per-test-file context a global lookup may be redirected to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
  text: String,
  file: String,
}

impl SourceLocation {
  pub fn new(file: impl Into<String>, line: u32) -> Self {
    let file = file.into();
    Self {
      text: format!("{}:{}", file, line),
      file,
    }
  }

  /// Uses `text` verbatim, both for diagnostics and as the file id.
  pub fn verbatim(text: impl Into<String>) -> Self {
    let text = text.into();
    Self {
      file: text.clone(),
      text,
    }
  }

  /// The location of the code calling this function (or the nearest caller
  /// not marked `#[track_caller]`).
  #[track_caller]
  pub fn caller() -> Self {
    let location = Location::caller();
    Self::new(location.file(), location.line())
  }

  pub fn file_id(&self) -> &str {
    &self.file
  }

  pub fn as_str(&self) -> &str {
    &self.text
  }
}

impl Default for SourceLocation {
  fn default() -> Self {
    Self::verbatim("<unknown>")
  }
}

impl fmt::Display for SourceLocation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.text)
  }
}

impl From<&str> for SourceLocation {
  fn from(text: &str) -> Self {
    Self::verbatim(text)
  }
}

impl From<String> for SourceLocation {
  fn from(text: String) -> Self {
    Self::verbatim(text)
  }
}
