//! Properties and property parameters.

use std::fmt;

use super::primitive::{Value, ValueType};

/// A single property parameter: a name and one or more decoded values.
///
/// Values are stored after RFC 6868 decoding and quote removal; the writer
/// re-applies both. The name keeps its source spelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub values: Vec<String>,
}

impl Param {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: vec![value.into()],
        }
    }

    /// The first (usually only) value of the parameter.
    pub fn value(&self) -> &str {
        self.values.first().map_or("", String::as_str)
    }
}

/// An ordered parameter list with case-insensitive unique names.
///
/// Pushing a parameter whose name is already present appends the new values
/// to the existing entry instead of introducing a duplicate key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<Param>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.0.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Param> {
        self.0.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// The first value of the named parameter, when present.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name).map(Param::value)
    }

    pub fn push(&mut self, param: Param) {
        match self
            .0
            .iter_mut()
            .find(|p| p.name.eq_ignore_ascii_case(&param.name))
        {
            Some(existing) => existing.values.extend(param.values),
            None => self.0.push(param),
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        match self.0.iter_mut().find(|p| p.name.eq_ignore_ascii_case(&name)) {
            Some(existing) => existing.values = vec![value.into()],
            None => self.0.push(Param::new(name, value)),
        }
    }

    /// The declared value type from a `VALUE=` parameter, when present.
    pub fn value_type(&self) -> Option<ValueType> {
        self.first("VALUE").map(ValueType::from_name)
    }

    /// The `TZID` parameter, when present.
    pub fn tz_id(&self) -> Option<&str> {
        self.first("TZID")
    }

    /// Returns `true` iff the property carries `DERIVED=TRUE` (RFC 9073).
    pub fn is_derived(&self) -> bool {
        self.first("DERIVED")
            .is_some_and(|v| v.eq_ignore_ascii_case("TRUE"))
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = &'a Param;
    type IntoIter = std::slice::Iter<'a, Param>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<Param> for Params {
    fn from_iter<T: IntoIterator<Item = Param>>(iter: T) -> Self {
        let mut params = Self::new();
        for param in iter {
            params.push(param);
        }
        params
    }
}

/// The value slot of a property: a single value, or an ordered list for the
/// multi-valued properties (CATEGORIES, RESOURCES, RDATE, EXDATE, FREEBUSY).
#[derive(Debug, Clone, PartialEq)]
pub enum ValueSlot {
    Single(Value),
    List(Vec<Value>),
}

impl ValueSlot {
    /// The single value, or the first of a list.
    pub fn first(&self) -> Option<&Value> {
        match self {
            ValueSlot::Single(value) => Some(value),
            ValueSlot::List(values) => values.first(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        match self {
            ValueSlot::Single(value) => std::slice::from_ref(value).iter(),
            ValueSlot::List(values) => values.iter(),
        }
    }
}

impl From<Value> for ValueSlot {
    fn from(value: Value) -> Self {
        Self::Single(value)
    }
}

/// A property: an upper-case name, ordered parameters, and a value slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub params: Params,
    pub value: ValueSlot,
}

impl Property {
    pub fn new(name: impl Into<String>, value: impl Into<ValueSlot>) -> Self {
        Self {
            name: name.into().to_ascii_uppercase(),
            params: Params::new(),
            value: value.into(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push(Param::new(name.into(), value));
        self
    }

    /// The single value, or the first of a multi-valued property.
    pub fn value(&self) -> Option<&Value> {
        self.value.first()
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.value.iter()
    }

    /// The property's text content, when its value is TEXT.
    pub fn as_text(&self) -> Option<&str> {
        match self.value()? {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for Property {
    /// Prints the unfolded content line for diagnostics. The writer, not
    /// this impl, is responsible for wire output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for param in &self.params {
            write!(f, ";{}={}", param.name, param.values.join(","))?;
        }
        f.write_str(":")?;

        for (i, value) in self.values().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            crate::codec::write_value(value, f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_case_insensitive_lookup() {
        let mut params = Params::new();
        params.push(Param::new("TzId", "Europe/Berlin"));

        assert_eq!(params.first("TZID"), Some("Europe/Berlin"));
        assert_eq!(params.tz_id(), Some("Europe/Berlin"));
        assert!(params.get("tzid").is_some());
        assert_eq!(params.get("TzId").unwrap().name, "TzId");
    }

    #[test]
    fn duplicate_param_appends() {
        let mut params = Params::new();
        params.push(Param::new("MEMBER", "mailto:a@b"));
        params.push(Param::new("member", "mailto:c@d"));

        assert_eq!(params.len(), 1);
        assert_eq!(
            params.get("MEMBER").unwrap().values,
            vec!["mailto:a@b", "mailto:c@d"]
        );
    }

    #[test]
    fn derived_flag() {
        let mut params = Params::new();
        assert!(!params.is_derived());
        params.set("DERIVED", "true");
        assert!(params.is_derived());
        params.set("DERIVED", "FALSE");
        assert!(!params.is_derived());
    }

    #[test]
    fn property_accessors() {
        let prop = Property::new("summary", Value::Text("Hi".into()));
        assert_eq!(prop.name, "SUMMARY");
        assert_eq!(prop.as_text(), Some("Hi"));
    }
}
