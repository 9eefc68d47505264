//! Hand-written stand-in for generated `ydktest-sanity` classes

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use rust_ydk::entity::link_children;
use rust_ydk::rpc::NETCONF_BASE_NS;
use rust_ydk::xml::escape;
use rust_ydk::{
    Entity, EntityData, EntityRef, LeafData, Result, YLeaf, YLeafList, YType, YdkError,
};

pub const SANITY_NS: &str = "http://cisco.com/ns/yang/ydktest-sanity";

fn invalid_path(entity: &str, path: &str) -> YdkError {
    YdkError::InvalidValuePath {
        entity: entity.to_string(),
        path: path.to_string(),
    }
}

/// Values of the `ydk-enum-test` enumeration
pub fn ydk_enum(name: &str) -> Option<i32> {
    match name {
        "none" => Some(0),
        "local" => Some(1),
        "remote" => Some(2),
        _ => None,
    }
}

#[derive(Debug)]
pub struct Runner {
    data: EntityData,
    pub ytypes: Rc<RefCell<Ytypes>>,
    pub ldata: Vec<Rc<RefCell<Ldata>>>,
}

impl Runner {
    /// A fresh, linked `runner` tree
    pub fn new() -> Rc<RefCell<Runner>> {
        let runner = Rc::new(RefCell::new(Runner {
            data: EntityData::new("runner", "ydktest-sanity"),
            ytypes: Ytypes::new(),
            ldata: Vec::new(),
        }));
        let handle: EntityRef = runner.clone();
        link_children(&handle);
        runner
    }
}

impl Entity for Runner {
    fn entity_data(&self) -> &EntityData {
        &self.data
    }

    fn entity_data_mut(&mut self) -> &mut EntityData {
        &mut self.data
    }

    fn segment_path(&self) -> String {
        "ydktest-sanity:runner".to_string()
    }

    fn name_leaf_data(&self) -> Vec<(String, LeafData)> {
        Vec::new()
    }

    fn set_value(&mut self, value_path: &str, _value: &str) -> Result<()> {
        Err(invalid_path("runner", value_path))
    }

    fn child_by_name(&mut self, yang_name: &str, segment_path: &str) -> Option<EntityRef> {
        match yang_name {
            "ytypes" => Some(self.ytypes.clone()),
            "ldata" => {
                let existing = self
                    .ldata
                    .iter()
                    .find(|entry| entry.borrow().segment_path() == segment_path);
                if let Some(entry) = existing {
                    return Some(entry.clone());
                }
                let entry = Rc::new(RefCell::new(Ldata::new()));
                self.ldata.push(entry.clone());
                Some(entry)
            }
            _ => None,
        }
    }

    fn children(&self) -> BTreeMap<String, EntityRef> {
        let mut children: BTreeMap<String, EntityRef> = BTreeMap::new();
        children.insert("ytypes".to_string(), self.ytypes.clone());
        for entry in &self.ldata {
            let segment = entry.borrow().segment_path();
            children.insert(segment, entry.clone());
        }
        children
    }

    fn clone_entity(&self) -> EntityRef {
        Rc::new(RefCell::new(Runner {
            data: self.data.clone(),
            ytypes: Rc::new(RefCell::new(self.ytypes.borrow().deep_clone())),
            ldata: self
                .ldata
                .iter()
                .map(|entry| Rc::new(RefCell::new(entry.borrow().deep_clone())))
                .collect(),
        }))
    }
}

#[derive(Debug)]
pub struct Ytypes {
    data: EntityData,
    pub built_in_t: Rc<RefCell<BuiltInT>>,
}

impl Ytypes {
    fn new() -> Rc<RefCell<Ytypes>> {
        Rc::new(RefCell::new(Ytypes {
            data: EntityData::new("ytypes", "runner"),
            built_in_t: Rc::new(RefCell::new(BuiltInT::new())),
        }))
    }

    fn deep_clone(&self) -> Ytypes {
        Ytypes {
            data: self.data.clone(),
            built_in_t: Rc::new(RefCell::new(self.built_in_t.borrow().deep_clone())),
        }
    }
}

impl Entity for Ytypes {
    fn entity_data(&self) -> &EntityData {
        &self.data
    }

    fn entity_data_mut(&mut self) -> &mut EntityData {
        &mut self.data
    }

    fn segment_path(&self) -> String {
        "ytypes".to_string()
    }

    fn name_leaf_data(&self) -> Vec<(String, LeafData)> {
        Vec::new()
    }

    fn set_value(&mut self, value_path: &str, _value: &str) -> Result<()> {
        Err(invalid_path("ytypes", value_path))
    }

    fn child_by_name(&mut self, yang_name: &str, _segment_path: &str) -> Option<EntityRef> {
        (yang_name == "built-in-t").then(|| self.built_in_t.clone() as EntityRef)
    }

    fn children(&self) -> BTreeMap<String, EntityRef> {
        let mut children: BTreeMap<String, EntityRef> = BTreeMap::new();
        children.insert("built-in-t".to_string(), self.built_in_t.clone());
        children
    }

    fn clone_entity(&self) -> EntityRef {
        Rc::new(RefCell::new(self.deep_clone()))
    }
}

#[derive(Debug, Clone)]
pub struct BuiltInT {
    data: EntityData,
    pub number8: YLeaf,
    pub number16: YLeaf,
    pub u_number64: YLeaf,
    pub name: YLeaf,
    pub deci64: YLeaf,
    pub bits_value: YLeaf,
    pub enum_value: YLeaf,
    pub identity_ref_value: YLeaf,
    pub emptyv: YLeaf,
    pub bool_value: YLeaf,
    pub llstring: YLeafList,
}

impl BuiltInT {
    fn new() -> Self {
        BuiltInT {
            data: EntityData::new("built-in-t", "ytypes"),
            number8: YLeaf::new(YType::Int8, "number8"),
            number16: YLeaf::new(YType::Int16, "number16"),
            u_number64: YLeaf::new(YType::Uint64, "u_number64"),
            name: YLeaf::new(YType::Str, "name"),
            deci64: YLeaf::new(YType::Decimal64, "deci64"),
            bits_value: YLeaf::new(YType::Bits, "bits-value"),
            enum_value: YLeaf::new(YType::Enumeration, "enum-value"),
            identity_ref_value: YLeaf::new(YType::Identityref, "identity-ref-value"),
            emptyv: YLeaf::new(YType::Empty, "emptyv"),
            bool_value: YLeaf::new(YType::Boolean, "bool-value"),
            llstring: YLeafList::new(YType::Str, "llstring"),
        }
    }

    fn deep_clone(&self) -> BuiltInT {
        self.clone()
    }

    fn leaves(&self) -> [&YLeaf; 10] {
        [
            &self.number8,
            &self.number16,
            &self.u_number64,
            &self.name,
            &self.deci64,
            &self.bits_value,
            &self.enum_value,
            &self.identity_ref_value,
            &self.emptyv,
            &self.bool_value,
        ]
    }
}

impl Entity for BuiltInT {
    fn entity_data(&self) -> &EntityData {
        &self.data
    }

    fn entity_data_mut(&mut self) -> &mut EntityData {
        &mut self.data
    }

    fn segment_path(&self) -> String {
        "built-in-t".to_string()
    }

    fn name_leaf_data(&self) -> Vec<(String, LeafData)> {
        let mut out: Vec<(String, LeafData)> = self
            .leaves()
            .iter()
            .map(|leaf| leaf.get_name_leafdata())
            .collect();
        out.extend(self.llstring.get_name_leafdata());
        out
    }

    fn set_value(&mut self, value_path: &str, value: &str) -> Result<()> {
        match value_path {
            "number8" => self.number8.set_str(value),
            "number16" => self.number16.set_str(value),
            "u_number64" => self.u_number64.set_str(value),
            "name" => self.name.set_str(value),
            "deci64" => self.deci64.set_str(value),
            "bits-value" => self.bits_value.set_str(value),
            "enum-value" => self.enum_value.set_str_with(value, &ydk_enum),
            "identity-ref-value" => self.identity_ref_value.set_str(value),
            "emptyv" => self.emptyv.set_str(value),
            "bool-value" => self.bool_value.set_str(value),
            "llstring" => self.llstring.append_str(value),
            _ => Err(invalid_path("built-in-t", value_path)),
        }
    }

    fn child_by_name(&mut self, _yang_name: &str, _segment_path: &str) -> Option<EntityRef> {
        None
    }

    fn children(&self) -> BTreeMap<String, EntityRef> {
        BTreeMap::new()
    }

    fn clone_entity(&self) -> EntityRef {
        Rc::new(RefCell::new(self.deep_clone()))
    }
}

#[derive(Debug, Clone)]
pub struct Ldata {
    data: EntityData,
    pub number: YLeaf,
    pub name: YLeaf,
}

impl Ldata {
    pub fn new() -> Self {
        Ldata {
            data: EntityData::new("ldata", "runner"),
            number: YLeaf::new(YType::Int32, "number"),
            name: YLeaf::new(YType::Str, "name"),
        }
    }

    fn deep_clone(&self) -> Ldata {
        self.clone()
    }
}

impl Entity for Ldata {
    fn entity_data(&self) -> &EntityData {
        &self.data
    }

    fn entity_data_mut(&mut self) -> &mut EntityData {
        &mut self.data
    }

    fn segment_path(&self) -> String {
        format!("ldata[number='{}']", self.number.get())
    }

    fn name_leaf_data(&self) -> Vec<(String, LeafData)> {
        vec![self.number.get_name_leafdata(), self.name.get_name_leafdata()]
    }

    fn set_value(&mut self, value_path: &str, value: &str) -> Result<()> {
        match value_path {
            "number" => self.number.set_str(value),
            "name" => self.name.set_str(value),
            _ => Err(invalid_path("ldata", value_path)),
        }
    }

    fn child_by_name(&mut self, _yang_name: &str, _segment_path: &str) -> Option<EntityRef> {
        None
    }

    fn children(&self) -> BTreeMap<String, EntityRef> {
        BTreeMap::new()
    }

    fn clone_entity(&self) -> EntityRef {
        Rc::new(RefCell::new(self.deep_clone()))
    }
}

/// Render the subtree below `entity` as NETCONF config XML.
///
/// Stands in for the external codec: operations become `xc:operation`
/// attributes, so the `xc` prefix must be bound by the enclosing payload.
pub fn encode(entity: &EntityRef) -> Result<String> {
    let node = entity.borrow();
    let path = node.get_entity_path(None)?;
    let segment = node.segment_path();
    let (local, namespace) = match segment.split_once(':') {
        Some((_, local)) => (local, Some(SANITY_NS)),
        None => (segment.as_str(), None),
    };
    let name = element_name(local);

    let mut out = format!("<{}", name);
    if let Some(ns) = namespace {
        out.push_str(&format!(" xmlns=\"{}\"", ns));
    }
    if node.filter().is_set() {
        out.push_str(&format!(" xc:operation=\"{}\"", node.filter()));
    }
    out.push('>');

    for (leaf_path, data) in &path.value_paths {
        out.push_str(&encode_leaf(element_name(leaf_path), data));
    }
    for child in node.children().values() {
        let relevant = {
            let child = child.borrow();
            child.has_data() || child.has_operation()
        };
        if relevant {
            out.push_str(&encode(child)?);
        }
    }
    out.push_str(&format!("</{}>", name));
    Ok(out)
}

fn element_name(path: &str) -> &str {
    path.split('[').next().unwrap_or(path)
}

fn encode_leaf(name: &str, data: &LeafData) -> String {
    let operation = if data.operation.is_set() {
        format!(" xc:operation=\"{}\"", data.operation)
    } else {
        String::new()
    };
    if data.value.is_empty() {
        format!("<{}{}/>", name, operation)
    } else {
        format!("<{}{}>{}</{}>", name, operation, escape(&data.value), name)
    }
}

/// `<edit-config>` of `entity` against the candidate datastore
pub fn edit_config_payload(entity: &EntityRef) -> Result<String> {
    Ok(format!(
        concat!(
            r#"<rpc xmlns="{ns}" xmlns:xc="{ns}">"#,
            "<edit-config><target><candidate/></target><config>{config}</config></edit-config>",
            "</rpc>"
        ),
        ns = NETCONF_BASE_NS,
        config = encode(entity)?
    ))
}

/// `<get-config>` of the candidate datastore filtered to `runner`
pub fn get_config_payload() -> String {
    format!(
        concat!(
            r#"<rpc xmlns="{}"><get-config><source><candidate/></source>"#,
            r#"<filter><runner xmlns="{}"/></filter></get-config></rpc>"#
        ),
        NETCONF_BASE_NS, SANITY_NS
    )
}

/// Simple `<rpc>` wrapping a base operation with datastore `target`
pub fn datastore_rpc(operation: &str, role: &str, datastore: &str) -> String {
    format!(
        r#"<rpc xmlns="{}"><{op}><{role}><{ds}/></{role}></{op}></rpc>"#,
        NETCONF_BASE_NS,
        op = operation,
        role = role,
        ds = datastore
    )
}
