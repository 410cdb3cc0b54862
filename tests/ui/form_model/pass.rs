use uform::{FieldLens, FormModel};

#[derive(Clone, uform::FormModel)]
struct DemoForm {
    email: String,
    #[form(skip)]
    cached_display_name: Option<String>,
}

fn main() {
    let fields = DemoForm::fields();
    let lens = fields.email();
    let mut model = DemoForm {
        email: "a@example.com".to_string(),
        cached_display_name: None,
    };
    lens.set(&mut model, "b@example.com".to_string());
    assert_eq!(lens.key().as_str(), "email");
    assert_eq!(lens.get(&model), "b@example.com");
    assert_eq!(fields.keys().len(), 1);
    let _ = model.cached_display_name;
}
