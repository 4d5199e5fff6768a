//! Error types and result definitions for the CDC core.
//!
//! Provides a kind-classified error system with captured diagnostic metadata for
//! the collect/decode pipeline. [`CdcError`] carries a static description plus
//! optional dynamic detail (offending key, schema version, table name) so that
//! failures can be matched on [`ErrorKind`] instead of string patterns.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use crate::codec::datum::DatumDecodeError;

/// Convenient result type for CDC operations using [`CdcError`] as the error type.
pub type CdcResult<T> = Result<T, CdcError>;

/// Detailed payload stored inside a [`CdcError`].
#[derive(Debug, Clone)]
struct ErrorPayload {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

/// Main error type for CDC operations.
///
/// Every failure in the core surfaces as a [`CdcError`]; nothing is retried or
/// swallowed internally. Retry and backoff, where desired, belong to the
/// system driving these calls with fresh input.
#[derive(Debug, Clone)]
pub struct CdcError {
    payload: ErrorPayload,
}

/// Specific categories of errors that can occur in the CDC core.
///
/// The enumeration is closed over the failure modes of the collect/decode
/// pipeline; callers branch on kinds rather than rendered messages.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The upstream feed is exhausted or its transport failed.
    StreamEnded,
    /// The downstream sink refused a transaction.
    EmitRejected,
    /// A schema-change job could not be applied; the registry did not move
    /// past the failing job.
    SchemaAdvanceFailed,
    /// A table was not known at the active schema version.
    UnknownTable,
    /// No schema version governs the requested commit timestamp.
    UnknownSchemaVersion,
    /// A raw key or value could not be parsed against the resolved table
    /// definition.
    DecodeCorruption,
    /// An operation was attempted in a state that does not permit it.
    InvalidState,
    /// Invalid construction-time input.
    ConfigError,
    /// Unknown / uncategorized.
    Unknown,
}

impl CdcError {
    /// Returns the [`ErrorKind`] of this error.
    pub fn kind(&self) -> ErrorKind {
        self.payload.kind
    }

    /// Returns the detailed error information if available.
    pub fn detail(&self) -> Option<&str> {
        self.payload.detail.as_deref()
    }

    /// Returns the captured backtrace for this error.
    pub fn backtrace(&self) -> &Backtrace {
        self.payload.backtrace.as_ref()
    }

    /// Returns the captured callsite location for this error.
    pub fn location(&self) -> &'static Location<'static> {
        self.payload.location
    }

    /// Attaches an originating [`error::Error`] to this error and returns the
    /// modified instance. The stored source is preserved across clones and
    /// exposed via [`error::Error::source`].
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        self.payload.source = Some(Arc::new(source));
        self
    }

    /// Creates a [`CdcError`] from its components.
    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        CdcError {
            payload: ErrorPayload {
                kind,
                description,
                detail,
                source,
                location: Location::caller(),
                backtrace: Arc::new(Backtrace::capture()),
            },
        }
    }
}

impl PartialEq for CdcError {
    fn eq(&self, other: &CdcError) -> bool {
        self.payload.kind == other.payload.kind
    }
}

impl fmt::Display for CdcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        let location = self.payload.location;
        write!(
            f,
            "[{:?}] {} @ {}:{}:{}",
            self.payload.kind,
            self.payload.description,
            location.file(),
            location.line(),
            location.column()
        )?;

        if let Some(detail) = self.payload.detail.as_deref() {
            write!(f, "\n  Detail: {detail}")?;
        }

        Ok(())
    }
}

impl error::Error for CdcError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.payload
            .source
            .as_ref()
            .map(|source| source as &(dyn error::Error + 'static))
    }
}

/// Creates a [`CdcError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for CdcError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> CdcError {
        CdcError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

/// Creates a [`CdcError`] from an error kind, static description, and dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for CdcError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> CdcError {
        CdcError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Converts [`DatumDecodeError`] to [`CdcError`] with [`ErrorKind::DecodeCorruption`].
impl From<DatumDecodeError> for CdcError {
    #[track_caller]
    fn from(err: DatumDecodeError) -> CdcError {
        let detail = err.to_string();
        let source = Arc::new(err);
        CdcError::from_components(
            ErrorKind::DecodeCorruption,
            Cow::Borrowed("Datum decoding failed"),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

/// Converts [`std::str::Utf8Error`] to [`CdcError`] with [`ErrorKind::DecodeCorruption`].
impl From<std::str::Utf8Error> for CdcError {
    #[track_caller]
    fn from(err: std::str::Utf8Error) -> CdcError {
        let detail = err.to_string();
        let source = Arc::new(err);
        CdcError::from_components(
            ErrorKind::DecodeCorruption,
            Cow::Borrowed("UTF-8 conversion failed"),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

/// Converts [`serde_json::Error`] to [`CdcError`] with [`ErrorKind::DecodeCorruption`].
///
/// JSON only appears in this crate as the serialized form of schema-change job
/// records inside DDL-log values, so any JSON failure is a decode failure.
impl From<serde_json::Error> for CdcError {
    #[track_caller]
    fn from(err: serde_json::Error) -> CdcError {
        let detail = err.to_string();
        let source = Arc::new(err);
        CdcError::from_components(
            ErrorKind::DecodeCorruption,
            Cow::Borrowed("Schema-change job deserialization failed"),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}
