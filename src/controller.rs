use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::validation::{FieldLens, RuleSet};

/// Message shown next to a field or as the top-level submit error.
pub type ErrorMessage = Cow<'static, str>;

/// Absent key means the field has no error.
pub type FormErrors = BTreeMap<FieldKey, ErrorMessage>;

pub const DEFAULT_SUBMIT_ERROR: &str = "An error occurred";

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FieldKey(&'static str);

impl FieldKey {
    pub const fn new(value: &'static str) -> Self {
        Self(value)
    }

    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

impl Display for FieldKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ValidationTicket(pub u64);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FormStatus {
    Idle,
    Submitting,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FormError {
    StatePoisoned(&'static str),
}

impl Display for FormError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FormError::StatePoisoned(context) => {
                write!(f, "form state lock poisoned while {context}")
            }
        }
    }
}

impl std::error::Error for FormError {}

pub type FormResult<T> = Result<T, FormError>;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type ValidateFn<T> = Arc<dyn Fn(&T) -> FormErrors + Send + Sync>;
pub type BoxedSubmitFuture =
    Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send + 'static>>;
pub type SubmitFn<T> = Arc<dyn Fn(T) -> BoxedSubmitFuture + Send + Sync>;

/// Optional collaborators supplied by the screen owning the form. Both slots
/// may stay empty; `validate()` then always passes and `submit()` is a no-op.
pub struct FormConfig<T> {
    pub(crate) validate: Option<ValidateFn<T>>,
    pub(crate) submit: Option<SubmitFn<T>>,
}

impl<T> FormConfig<T> {
    pub fn new() -> Self {
        Self {
            validate: None,
            submit: None,
        }
    }

    pub fn with_validate<F>(mut self, validate: F) -> Self
    where
        F: Fn(&T) -> FormErrors + Send + Sync + 'static,
    {
        self.validate = Some(Arc::new(validate));
        self
    }

    pub fn with_rules(self, rules: RuleSet<T>) -> Self
    where
        T: Send + Sync + 'static,
    {
        Self {
            validate: Some(rules.into_validate_fn()),
            submit: self.submit,
        }
    }

    pub fn with_submit<F, Fut>(mut self, submit: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.submit = Some(Arc::new(move |values| Box::pin(submit(values))));
        self
    }
}

impl<T> Default for FormConfig<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for FormConfig<T> {
    fn clone(&self) -> Self {
        Self {
            validate: self.validate.clone(),
            submit: self.submit.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct FormSnapshot<T> {
    pub values: T,
    pub errors: FormErrors,
    pub status: FormStatus,
    pub submit_error: Option<ErrorMessage>,
    pub submit_count: u32,
    pub is_dirty: bool,
    pub is_valid: bool,
}

pub(crate) struct FormState<T> {
    pub(crate) initial: T,
    pub(crate) values: T,
    pub(crate) errors: FormErrors,
    pub(crate) submitting: bool,
    pub(crate) submit_error: Option<ErrorMessage>,
    pub(crate) submit_count: u32,
    pub(crate) dirty_fields: BTreeSet<FieldKey>,
    pub(crate) tickets: BTreeMap<FieldKey, ValidationTicket>,
}

#[derive(Clone)]
pub struct FormController<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) config: FormConfig<T>,
    pub(crate) state: Arc<RwLock<FormState<T>>>,
}

impl<T> FormController<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(initial: T, config: FormConfig<T>) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(FormState {
                initial: initial.clone(),
                values: initial,
                errors: FormErrors::new(),
                submitting: false,
                submit_error: None,
                submit_count: 0,
                dirty_fields: BTreeSet::new(),
                tickets: BTreeMap::new(),
            })),
        }
    }

    /// Overwrites a single field and clears that field's error, leaving every
    /// other field's error in place. Does not re-run validation; cross-field
    /// errors stay until the next `validate()`.
    pub fn set<L>(&self, lens: L, value: L::Value) -> FormResult<()>
    where
        L: FieldLens<T>,
    {
        let key = lens.key();
        let mut state = write_lock(&self.state, "writing form values")?;
        lens.set(&mut state.values, value);
        let is_dirty = lens.get(&state.values) != lens.get(&state.initial);
        if is_dirty {
            state.dirty_fields.insert(key);
        } else {
            state.dirty_fields.remove(&key);
        }
        state.errors.remove(&key);
        Ok(())
    }

    /// Direct per-field error write, for feedback a pure validator cannot
    /// express (server rejection of one field, async checks).
    pub fn set_field_error<L>(&self, lens: L, message: impl Into<ErrorMessage>) -> FormResult<()>
    where
        L: FieldLens<T>,
    {
        let mut state = write_lock(&self.state, "writing field error")?;
        state.errors.insert(lens.key(), message.into());
        Ok(())
    }

    pub fn clear_errors(&self) -> FormResult<()> {
        let mut state = write_lock(&self.state, "clearing errors")?;
        state.errors.clear();
        state.submit_error = None;
        Ok(())
    }

    /// Runs the configured whole-form validator and replaces the error map
    /// wholesale with its result. Valid when no validator is configured.
    pub fn validate(&self) -> FormResult<bool> {
        let Some(validate) = self.config.validate.clone() else {
            return Ok(true);
        };
        let values = read_lock(&self.state, "reading values for validation")?
            .values
            .clone();
        let errors = validate(&values);
        let mut state = write_lock(&self.state, "applying validation result")?;
        state.errors = errors;
        Ok(state.errors.is_empty())
    }

    /// Guarded submit orchestration. No-op without a configured action and
    /// while a submission is already in flight. Validation failure stops
    /// silently with the errors populated; action failure surfaces one
    /// top-level message; success resets to the initial snapshot. The
    /// submitting flag is dropped on every exit path, and no lock is held
    /// across the await, so edits during a slow action remain possible.
    pub async fn submit(&self) -> FormResult<()> {
        let Some(submit) = self.config.submit.clone() else {
            return Ok(());
        };

        {
            let mut state = write_lock(&self.state, "preparing submit")?;
            if state.submitting {
                return Ok(());
            }
            state.submitting = true;
            state.submit_error = None;
            state.submit_count = state.submit_count.saturating_add(1);
        }

        if !self.validate()? {
            let mut state = write_lock(&self.state, "finishing submit after invalid form")?;
            state.submitting = false;
            return Ok(());
        }

        let values = read_lock(&self.state, "reading values for submit")?
            .values
            .clone();
        let result = submit(values).await;

        let mut state = write_lock(&self.state, "completing submit")?;
        state.submitting = false;
        match result {
            Ok(()) => {
                state.values = state.initial.clone();
                state.errors.clear();
                state.submit_error = None;
                state.dirty_fields.clear();
                state.tickets.clear();
            }
            Err(error) => {
                state.submit_error = Some(submit_failure_message(error.as_ref()));
            }
        }
        Ok(())
    }

    pub fn reset(&self) -> FormResult<()> {
        let mut state = write_lock(&self.state, "resetting form")?;
        state.values = state.initial.clone();
        state.errors.clear();
        state.submit_error = None;
        state.submitting = false;
        state.dirty_fields.clear();
        state.tickets.clear();
        Ok(())
    }

    pub fn snapshot(&self) -> FormResult<FormSnapshot<T>> {
        let state = read_lock(&self.state, "creating form snapshot")?;
        Ok(FormSnapshot {
            values: state.values.clone(),
            errors: state.errors.clone(),
            status: status_of(&state),
            submit_error: state.submit_error.clone(),
            submit_count: state.submit_count,
            is_dirty: !state.dirty_fields.is_empty(),
            is_valid: state.errors.is_empty(),
        })
    }

    pub fn values(&self) -> FormResult<T> {
        Ok(read_lock(&self.state, "reading form values")?.values.clone())
    }

    pub fn status(&self) -> FormResult<FormStatus> {
        let state = read_lock(&self.state, "reading form status")?;
        Ok(status_of(&state))
    }

    pub fn is_submitting(&self) -> FormResult<bool> {
        Ok(read_lock(&self.state, "reading submitting flag")?.submitting)
    }

    pub fn submit_error(&self) -> FormResult<Option<ErrorMessage>> {
        Ok(read_lock(&self.state, "reading submit error")?
            .submit_error
            .clone())
    }

    pub fn field_error<L>(&self, lens: L) -> FormResult<Option<ErrorMessage>>
    where
        L: FieldLens<T>,
    {
        Ok(read_lock(&self.state, "reading field error")?
            .errors
            .get(&lens.key())
            .cloned())
    }
}

fn status_of<T>(state: &FormState<T>) -> FormStatus {
    if state.submitting {
        FormStatus::Submitting
    } else {
        FormStatus::Idle
    }
}

fn submit_failure_message(error: &(dyn std::error::Error + Send + Sync)) -> ErrorMessage {
    let message = error.to_string();
    if message.trim().is_empty() {
        Cow::Borrowed(DEFAULT_SUBMIT_ERROR)
    } else {
        Cow::Owned(message)
    }
}

pub(crate) fn read_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockReadGuard<'a, T>> {
    lock.read().map_err(|_| FormError::StatePoisoned(context))
}

pub(crate) fn write_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockWriteGuard<'a, T>> {
    lock.write().map_err(|_| FormError::StatePoisoned(context))
}
