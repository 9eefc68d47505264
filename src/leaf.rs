//! Leaf and leaf-list storage
//!
//! A [`YLeaf`] holds the value of one schema leaf together with its
//! requested edit operation. A [`YLeafList`] holds an ordered sequence of
//! such leaves sharing one type and name.

use std::fmt;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::error::{Result, YdkError};
use crate::filter::YFilter;
use crate::value::{Bits, EnumLookup, ScalarValue, YType};

/// Encoded snapshot of a leaf: value text, operation and set flag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafData {
    pub value: String,
    pub operation: YFilter,
    pub is_set: bool,
}

impl LeafData {
    pub fn new(value: impl Into<String>, operation: YFilter, is_set: bool) -> Self {
        Self {
            value: value.into(),
            operation,
            is_set,
        }
    }

    /// Whether this entry should be serialized: a value or an operation is present
    pub fn is_relevant(&self) -> bool {
        self.is_set || self.operation.is_set()
    }
}

impl fmt::Display for LeafData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, is_set={})", self.value, self.operation, self.is_set)
    }
}

/// Typed holder of one leaf value
#[derive(Debug, Clone)]
pub struct YLeaf {
    name: String,
    ytype: YType,
    value: Option<ScalarValue>,
    /// Whether a value has been assigned since construction or the last `clear`
    pub is_set: bool,
    /// Requested edit operation for this leaf
    pub operation: YFilter,
}

impl YLeaf {
    /// Create an unset leaf of the given type
    pub fn new(ytype: YType, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ytype,
            value: None,
            is_set: false,
            operation: YFilter::NotSet,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ytype(&self) -> YType {
        self.ytype
    }

    /// Current value, if one was assigned
    pub fn value(&self) -> Option<&ScalarValue> {
        self.value.as_ref()
    }

    /// Canonical text of the current value, empty while unset
    pub fn get(&self) -> String {
        self.value.as_ref().map(ToString::to_string).unwrap_or_default()
    }

    /// Assign a value; its kind must match the leaf's type.
    ///
    /// On mismatch the leaf is left untouched.
    pub fn set(&mut self, value: impl Into<ScalarValue>) -> Result<()> {
        let value = value.into();
        self.check_type(value.ytype())?;
        self.value = Some(value);
        self.is_set = true;
        Ok(())
    }

    /// Assign from canonical text (enumerations need [`YLeaf::set_str_with`])
    pub fn set_str(&mut self, text: &str) -> Result<()> {
        let value = ScalarValue::decode(self.ytype, text, None)?;
        self.set(value)
    }

    /// Assign from canonical text, resolving enumeration names with `lookup`
    pub fn set_str_with(&mut self, text: &str, lookup: &EnumLookup<'_>) -> Result<()> {
        let value = ScalarValue::decode(self.ytype, text, Some(lookup))?;
        self.set(value)
    }

    /// Mutable access to one named bit of a `bits` leaf.
    ///
    /// Bits assigned this way accumulate in a single map; the leaf counts as
    /// set from this call on.
    pub fn bit_mut(&mut self, name: &str) -> Result<&mut bool> {
        self.check_type(YType::Bits)?;
        match self
            .value
            .get_or_insert_with(|| ScalarValue::Bits(Bits::new()))
        {
            ScalarValue::Bits(bits) => {
                self.is_set = true;
                Ok(bits.entry(name))
            }
            other => Err(YdkError::TypeMismatch {
                name: self.name.clone(),
                expected: YType::Bits,
                found: other.ytype(),
            }),
        }
    }

    pub fn filter(&self) -> YFilter {
        self.operation
    }

    pub fn set_filter(&mut self, filter: YFilter) {
        self.operation = filter;
    }

    /// Drop the value and the operation
    pub fn clear(&mut self) {
        self.value = None;
        self.is_set = false;
        self.operation = YFilter::NotSet;
    }

    /// `(name, LeafData)` pair for serialization.
    ///
    /// An unset leaf yields empty text with `is_set == false`.
    pub fn get_name_leafdata(&self) -> (String, LeafData) {
        let value = if self.is_set { self.get() } else { String::new() };
        (
            self.name.clone(),
            LeafData::new(value, self.operation, self.is_set),
        )
    }

    fn check_type(&self, found: YType) -> Result<()> {
        if found != self.ytype {
            return Err(YdkError::TypeMismatch {
                name: self.name.clone(),
                expected: self.ytype,
                found,
            });
        }
        Ok(())
    }
}

impl PartialEq for YLeaf {
    fn eq(&self, other: &Self) -> bool {
        self.ytype == other.ytype
            && self.name == other.name
            && self.get() == other.get()
            && self.operation == other.operation
    }
}

impl fmt::Display for YLeaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.get())
    }
}

/// Ordered list of leaf values sharing one type and name
#[derive(Debug, Clone)]
pub struct YLeafList {
    name: String,
    ytype: YType,
    values: Vec<YLeaf>,
    /// Requested edit operation for the list as a whole
    pub operation: YFilter,
}

impl YLeafList {
    pub fn new(ytype: YType, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ytype,
            values: Vec::new(),
            operation: YFilter::NotSet,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ytype(&self) -> YType {
        self.ytype
    }

    /// Append a value; its kind must match the list's type
    pub fn append(&mut self, value: impl Into<ScalarValue>) -> Result<()> {
        let mut leaf = YLeaf::new(self.ytype, self.name.clone());
        leaf.set(value)?;
        self.values.push(leaf);
        Ok(())
    }

    /// Append from canonical text
    pub fn append_str(&mut self, text: &str) -> Result<()> {
        let mut leaf = YLeaf::new(self.ytype, self.name.clone());
        leaf.set_str(text)?;
        self.values.push(leaf);
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&YLeaf> {
        self.values.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut YLeaf> {
        self.values.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, YLeaf> {
        self.values.iter()
    }

    pub fn leaves(&self) -> &[YLeaf] {
        &self.values
    }

    pub fn filter(&self) -> YFilter {
        self.operation
    }

    pub fn set_filter(&mut self, filter: YFilter) {
        self.operation = filter;
    }

    /// Remove every element; type and name are kept
    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// One `(path, LeafData)` pair per set element, in list order.
    ///
    /// Each path selects the element by value: `name[.='value']`. A list
    /// with no set element but an operation yields a single `(name, "")`
    /// entry carrying that operation, like an unset leaf.
    pub fn get_name_leafdata(&self) -> Vec<(String, LeafData)> {
        let entries: Vec<(String, LeafData)> = self
            .values
            .iter()
            .filter(|leaf| leaf.is_set)
            .map(|leaf| {
                let (name, mut data) = leaf.get_name_leafdata();
                if !data.operation.is_set() {
                    data.operation = self.operation;
                }
                (value_predicate(&name, &data.value), data)
            })
            .collect();

        if entries.is_empty() && self.operation.is_set() {
            return vec![(
                self.name.clone(),
                LeafData::new("", self.operation, false),
            )];
        }
        entries
    }
}

/// `name[.=<literal>]` with `value` as an XPath string literal.
///
/// XPath 1.0 literals cannot escape quotes, so a value holding both kinds
/// is spelled with `concat()`.
fn value_predicate(name: &str, value: &str) -> String {
    if !value.contains('\'') {
        format!("{}[.='{}']", name, value)
    } else if !value.contains('"') {
        format!("{}[.=\"{}\"]", name, value)
    } else {
        let parts: Vec<String> = value.split('\'').map(|part| format!("'{}'", part)).collect();
        format!("{}[.=concat({})]", name, parts.join(", \"'\", "))
    }
}

impl Index<usize> for YLeafList {
    type Output = YLeaf;

    fn index(&self, index: usize) -> &YLeaf {
        &self.values[index]
    }
}

impl IndexMut<usize> for YLeafList {
    fn index_mut(&mut self, index: usize) -> &mut YLeaf {
        &mut self.values[index]
    }
}

impl<'a> IntoIterator for &'a YLeafList {
    type Item = &'a YLeaf;
    type IntoIter = std::slice::Iter<'a, YLeaf>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl PartialEq for YLeafList {
    fn eq(&self, other: &Self) -> bool {
        self.ytype == other.ytype
            && self.name == other.name
            && self.operation == other.operation
            && self.values == other.values
    }
}

impl fmt::Display for YLeafList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: Vec<String> = self.values.iter().map(YLeaf::get).collect();
        write!(f, "[{}]", values.join(", "))
    }
}
