//! # `key(selector, value)` — Call Entry Point
//!
//! One [`KeyFunction`] exists per connection and function instance. It is
//! created when the host prepares the function for a connection and dropped
//! when that connection finalizes.
//!
//! ## Per-call state machine
//!
//! ```text
//! Bind ──▶ value null? ──yes──▶ Ok(None)
//!              │ no
//!              ▼
//!          Extract (inline text | blob via Stream Reader)
//!              ▼
//!          Digest (selector null ⇒ InvalidAlgorithm)
//!              ▼
//!          Respond (key ≤ 128 chars)
//! ```
//!
//! Any failure is raised through the status sink (custom exception if the
//! connection defines one, generic otherwise) and returned as `Err`.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use hashudr_core::{ConnectionId, UdrError, MAX_KEY_LENGTH};
use hashudr_host::{
    read_all, ExecutionContext, LayoutError, MessageLayout, MessageWriter, SqlType, StatusSink,
};
use hashudr_registry::ConnectionResources;

use crate::HashUdr;

/// Input parameter index of the algorithm selector.
pub const SELECTOR_PARAM: usize = 0;

/// Input parameter index of the value.
pub const VALUE_PARAM: usize = 1;

/// Character set id of NONE, the only accepted text encoding.
pub const CHARSET_NONE: u16 = 0;

/// Blob sub-type of unstructured binary data, the only accepted blob kind.
pub const BLOB_SUBTYPE_BINARY: i16 = 0;

/// A `key` function bound to one connection.
pub struct KeyFunction<'m> {
    module: &'m HashUdr,
    connection_id: ConnectionId,
    input: MessageLayout,
    output: MessageLayout,
}

impl<'m> KeyFunction<'m> {
    /// Bind the connection of `context` and validate the input metadata.
    ///
    /// The input must declare exactly two parameters with a SMALLINT
    /// selector first. Failures are raised through `status` and returned.
    pub fn new(
        module: &'m HashUdr,
        status: Arc<dyn StatusSink>,
        context: Arc<dyn ExecutionContext>,
        input: MessageLayout,
    ) -> Result<Self, UdrError> {
        let bound = validate_input(&input)
            .and_then(|()| module.registry().resolve_or_create(context.as_ref()));
        match bound {
            Ok(connection_id) => Ok(Self {
                module,
                connection_id,
                input,
                output: Self::output_layout(),
            }),
            Err(err) => {
                module.raise(&err, status.as_ref(), None);
                Err(err)
            }
        }
    }

    /// Input layout for a `VARCHAR(length) CHARACTER SET NONE` value.
    pub fn varchar_input(length: usize) -> MessageLayout {
        MessageLayout::builder()
            .field("HASH_METHOD", SqlType::Short, 0)
            .field("VAL", SqlType::Varying, length)
            .char_set(CHARSET_NONE)
            .build()
    }

    /// Input layout for a `BLOB SUB_TYPE BINARY` value.
    pub fn blob_input() -> MessageLayout {
        MessageLayout::builder()
            .field("HASH_METHOD", SqlType::Short, 0)
            .field("VAL", SqlType::Blob, 0)
            .sub_type(BLOB_SUBTYPE_BINARY)
            .build()
    }

    /// Output layout: `VARCHAR(128)`.
    pub fn output_layout() -> MessageLayout {
        MessageLayout::builder()
            .field("KEY", SqlType::Varying, MAX_KEY_LENGTH)
            .build()
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn input_layout(&self) -> &MessageLayout {
        &self.input
    }

    /// Run one call over the input message `input`.
    ///
    /// `Ok(None)` is the null result of a null value. The call holds the
    /// connection's call gate throughout, so calls on one connection never
    /// interleave and errors always reach this call's `status`.
    pub fn execute(
        &self,
        status: Arc<dyn StatusSink>,
        context: Arc<dyn ExecutionContext>,
        input: &[u8],
    ) -> Result<Option<String>, UdrError> {
        let Some(resources) = self.module.registry().get(self.connection_id) else {
            return Err(self.undefined(status.as_ref()));
        };
        let Some(_call) = resources.begin_call() else {
            return Err(self.undefined(status.as_ref()));
        };
        resources.refresh_call_context(Some(Arc::clone(&status)), Some(Arc::clone(&context)));

        self.compute(&resources, context.as_ref(), input)
            .map_err(|err| {
                self.module.raise(&err, status.as_ref(), Some(resources.as_ref()));
                err
            })
    }

    /// Like [`execute`](Self::execute), writing the result into an output
    /// message laid out by [`output_layout`](Self::output_layout).
    pub fn execute_message(
        &self,
        status: Arc<dyn StatusSink>,
        context: Arc<dyn ExecutionContext>,
        input: &[u8],
    ) -> Result<Vec<u8>, UdrError> {
        let key = self.execute(status, context, input)?;
        let mut writer = MessageWriter::new(&self.output);
        if let Some(key) = key {
            writer
                .write_text(0, key.as_bytes())
                .map_err(|_| UdrError::KeyOverflow(key.len()))?;
        }
        Ok(writer.into_bytes())
    }

    fn undefined(&self, status: &dyn StatusSink) -> UdrError {
        let err = UdrError::ResourcesUndefined(self.connection_id);
        self.module.raise(&err, status, None);
        err
    }

    fn compute(
        &self,
        resources: &ConnectionResources,
        context: &dyn ExecutionContext,
        input: &[u8],
    ) -> Result<Option<String>, UdrError> {
        if self.input.is_null(input, VALUE_PARAM).map_err(malformed)? {
            tracing::debug!(connection_id = %self.connection_id, "null value, null key");
            return Ok(None);
        }

        let value = self.extract(resources, context, input)?;
        let selector = self
            .input
            .read_short(input, SELECTOR_PARAM)
            .map_err(malformed)?;
        let key = self.module.engine().digest_selector(selector, &value)?;

        let len = key.chars().count();
        if len > MAX_KEY_LENGTH {
            return Err(UdrError::KeyOverflow(len));
        }
        tracing::debug!(
            connection_id = %self.connection_id,
            selector = ?selector,
            bytes = value.len(),
            "key computed"
        );
        Ok(Some(key))
    }

    fn extract<'i>(
        &self,
        resources: &ConnectionResources,
        context: &dyn ExecutionContext,
        input: &'i [u8],
    ) -> Result<Cow<'i, [u8]>, UdrError> {
        let field = self.input.field(VALUE_PARAM).map_err(malformed)?;
        match field.sql_type {
            SqlType::Text | SqlType::Varying => {
                if field.char_set != CHARSET_NONE {
                    return Err(UdrError::UnsupportedEncoding(format!(
                        "character set {} (only NONE is accepted)",
                        field.char_set
                    )));
                }
                let text = self
                    .input
                    .read_text(input, VALUE_PARAM)
                    .map_err(malformed)?
                    .unwrap_or_default();
                Ok(Cow::Borrowed(text))
            }
            SqlType::Blob => {
                if field.sub_type != BLOB_SUBTYPE_BINARY {
                    return Err(UdrError::UnsupportedEncoding(format!(
                        "blob sub_type {} (only BINARY is accepted)",
                        field.sub_type
                    )));
                }
                let blob_id = self
                    .input
                    .read_blob_id(input, VALUE_PARAM)
                    .map_err(malformed)?
                    .unwrap_or_default();
                let transaction = resources
                    .current_transaction(None)
                    .map_err(UdrError::BlobRead)?;
                read_all(
                    context,
                    transaction,
                    blob_id,
                    self.module.config().segment_size,
                )
                .map(Cow::Owned)
            }
            other => Err(UdrError::UnsupportedDatatype(format!(
                "{other:?} (only [VAR]CHAR or BLOB are accepted)"
            ))),
        }
    }
}

impl Drop for KeyFunction<'_> {
    fn drop(&mut self) {
        self.module.registry().finalize(self.connection_id);
    }
}

impl fmt::Debug for KeyFunction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyFunction")
            .field("connection_id", &self.connection_id)
            .field("input_fields", &self.input.fields().len())
            .finish()
    }
}

fn validate_input(layout: &MessageLayout) -> Result<(), UdrError> {
    let count = layout.fields().len();
    if count != 2 {
        return Err(UdrError::MalformedMessage(format!(
            "expected 2 input parameters, got {count}"
        )));
    }
    let selector = layout.field(SELECTOR_PARAM).map_err(malformed)?;
    if selector.sql_type != SqlType::Short {
        return Err(UdrError::MalformedMessage(format!(
            "selector parameter {:?} must be SMALLINT, is {:?}",
            selector.name, selector.sql_type
        )));
    }
    Ok(())
}

fn malformed(err: LayoutError) -> UdrError {
    UdrError::MalformedMessage(err.to_string())
}
