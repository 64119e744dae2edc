#![forbid(unsafe_code)]

/// An ordered walk into nested record types, outermost field first.
///
/// Built by prepending while an access chain is unwound from the outside in,
/// then consumed by index while the declared type is resolved from the inside
/// out. Transient: never stored beyond one resolution call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldPath {
    fields: Vec<String>,
}

impl FieldPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_field(name: impl Into<String>) -> Self {
        Self {
            fields: vec![name.into()],
        }
    }

    pub fn prepend(&mut self, name: impl Into<String>) {
        self.fields.insert(0, name.into());
    }

    pub fn push(&mut self, name: impl Into<String>) {
        self.fields.push(name.into());
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    pub fn first(&self) -> Option<&str> {
        self.get(0)
    }

    pub fn last(&self) -> Option<&str> {
        self.fields.last().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}
