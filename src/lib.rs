mod controller;
mod validation;
mod validators;


pub use uform_derive::FormModel;

pub use controller::{
    BoxError, BoxedSubmitFuture, DEFAULT_SUBMIT_ERROR, ErrorMessage, FieldKey, FormConfig,
    FormController, FormError, FormErrors, FormResult, FormSnapshot, FormStatus, SubmitFn,
    ValidateFn, ValidationTicket,
};
pub use validation::{AsyncRule, BoxedCheckFuture, FieldLens, FormModel, RuleSet};
pub use validators::{
    Rule, combine, email, max_length, min_length, number, phone, positive_number, required,
};
