use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures_timer::Delay;

use crate::controller::{
    ErrorMessage, FieldKey, FormController, FormErrors, FormResult, ValidateFn, ValidationTicket,
    read_lock, write_lock,
};
use crate::validators::Rule;

pub trait FieldLens<T>: Copy + Send + Sync + 'static {
    type Value: Clone + PartialEq + Send + Sync + 'static;

    fn key(self) -> FieldKey;
    fn get<'a>(self, model: &'a T) -> &'a Self::Value;
    fn set(self, model: &mut T, value: Self::Value);
}

pub trait FormModel: Clone + Send + Sync + 'static {
    type Fields;

    fn fields() -> Self::Fields;
}

type FieldCheck<T> = Arc<dyn Fn(&T) -> Option<ErrorMessage> + Send + Sync>;

/// Assembles per-field rules into the whole-form validator the controller
/// consumes. The first failing rule per field wins; later entries for the
/// same field are skipped.
pub struct RuleSet<T> {
    checks: Vec<(FieldKey, FieldCheck<T>)>,
}

impl<T> RuleSet<T>
where
    T: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self { checks: Vec::new() }
    }

    pub fn field<L>(mut self, lens: L, rule: Rule) -> Self
    where
        L: FieldLens<T>,
        L::Value: AsRef<str>,
    {
        self.checks.push((
            lens.key(),
            Arc::new(move |model: &T| rule(lens.get(model).as_ref())),
        ));
        self
    }

    /// Model-aware check, for cross-field constraints or non-string values.
    pub fn field_with<L, F>(mut self, lens: L, check: F) -> Self
    where
        L: FieldLens<T>,
        F: Fn(&T, &L::Value) -> Option<ErrorMessage> + Send + Sync + 'static,
    {
        self.checks.push((
            lens.key(),
            Arc::new(move |model: &T| check(model, lens.get(model))),
        ));
        self
    }

    pub fn validate(&self, model: &T) -> FormErrors {
        let mut errors = FormErrors::new();
        for (key, check) in &self.checks {
            if errors.contains_key(key) {
                continue;
            }
            if let Some(message) = check(model) {
                errors.insert(*key, message);
            }
        }
        errors
    }

    pub fn into_validate_fn(self) -> ValidateFn<T> {
        Arc::new(move |model: &T| self.validate(model))
    }
}

impl<T> Default for RuleSet<T>
where
    T: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

pub type BoxedCheckFuture<'a> = Pin<Box<dyn Future<Output = Option<ErrorMessage>> + Send + 'a>>;

pub trait AsyncRule<V>: Send + Sync {
    fn check<'a>(&'a self, value: &'a V) -> BoxedCheckFuture<'a>;
}

impl<V, F> AsyncRule<V> for F
where
    F: for<'a> Fn(&'a V) -> BoxedCheckFuture<'a> + Send + Sync,
{
    fn check<'a>(&'a self, value: &'a V) -> BoxedCheckFuture<'a> {
        (self)(value)
    }
}

impl<T> FormController<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Runs one async check against the current value of a field and writes
    /// its outcome into the error map, unless a later check on the same field
    /// started in the meantime.
    pub async fn check_field_async<L, R>(&self, lens: L, rule: &R) -> FormResult<ValidationTicket>
    where
        L: FieldLens<T>,
        R: AsyncRule<L::Value>,
    {
        self.check_field_async_debounced(lens, 0, rule).await
    }

    pub async fn check_field_async_debounced<L, R>(
        &self,
        lens: L,
        debounce_ms: u64,
        rule: &R,
    ) -> FormResult<ValidationTicket>
    where
        L: FieldLens<T>,
        R: AsyncRule<L::Value>,
    {
        let key = lens.key();
        let (ticket, value) = {
            let mut state = write_lock(&self.state, "starting async field check")?;
            let next = ValidationTicket(state.tickets.get(&key).map_or(0, |ticket| ticket.0) + 1);
            state.tickets.insert(key, next);
            (next, lens.get(&state.values).clone())
        };

        let debounce = Duration::from_millis(debounce_ms);
        if !debounce.is_zero() {
            Delay::new(debounce).await;
            if !self.is_latest_ticket(key, ticket)? {
                return Ok(ticket);
            }
        }

        let outcome = rule.check(&value).await;
        self.finish_async_check(key, ticket, outcome)?;
        Ok(ticket)
    }

    fn is_latest_ticket(&self, key: FieldKey, ticket: ValidationTicket) -> FormResult<bool> {
        Ok(read_lock(&self.state, "checking latest validation ticket")?
            .tickets
            .get(&key)
            .copied()
            == Some(ticket))
    }

    fn finish_async_check(
        &self,
        key: FieldKey,
        ticket: ValidationTicket,
        outcome: Option<ErrorMessage>,
    ) -> FormResult<()> {
        let mut state = write_lock(&self.state, "finishing async field check")?;
        if state.tickets.get(&key).copied() != Some(ticket) {
            return Ok(());
        }
        match outcome {
            Some(message) => {
                state.errors.insert(key, message);
            }
            None => {
                state.errors.remove(&key);
            }
        }
        Ok(())
    }
}
