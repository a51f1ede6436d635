//! Enclosing object and sub-object for findings

use std::collections::BTreeSet;

use crate::parser::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectAttribute {
    /// A trigger fired by more than one DML event.
    MultiEventTrigger,
    /// A DDL or logon trigger (no inserted/deleted tables).
    ServerLevelTrigger,
}

#[derive(Debug, Clone)]
struct ObjectFrame {
    node: NodeId,
    kind: &'static str,
    name: String,
    attributes: BTreeSet<ObjectAttribute>,
}

#[derive(Debug, Clone)]
struct SubObjectFrame {
    node: NodeId,
    description: String,
}

/// Stack of named objects (tables, views, routines, triggers) and of the
/// sub-objects (columns, parameters, constraints) being walked.
#[derive(Debug, Default)]
pub struct ObjectContext {
    objects: Vec<ObjectFrame>,
    sub_objects: Vec<SubObjectFrame>,
}

impl ObjectContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter_object(&mut self, node: NodeId, kind: &'static str, name: &str) {
        self.objects.push(ObjectFrame {
            node,
            kind,
            name: name.to_string(),
            attributes: BTreeSet::new(),
        });
    }

    pub fn enter_sub_object(&mut self, node: NodeId, description: String) {
        self.sub_objects.push(SubObjectFrame { node, description });
    }

    /// Closes the frames opened for `node`.
    pub fn leave(&mut self, node: NodeId) {
        while self.sub_objects.last().is_some_and(|f| f.node == node) {
            self.sub_objects.pop();
        }
        while self.objects.last().is_some_and(|f| f.node == node) {
            self.objects.pop();
        }
    }

    pub fn set_attribute(&mut self, attribute: ObjectAttribute) {
        if let Some(top) = self.objects.last_mut() {
            top.attributes.insert(attribute);
        }
    }

    /// Whether the innermost object carries `attribute`.
    pub fn has_attribute(&self, attribute: ObjectAttribute) -> bool {
        self.objects
            .last()
            .is_some_and(|top| top.attributes.contains(&attribute))
    }

    /// `PROCEDURE dbo.p`, or empty outside any object.
    pub fn describe(&self) -> String {
        self.objects
            .last()
            .map(|f| format!("{} {}", f.kind, f.name))
            .unwrap_or_default()
    }

    pub fn describe_sub_object(&self) -> String {
        self.sub_objects
            .last()
            .map(|f| f.description.clone())
            .unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.objects.clear();
        self.sub_objects.clear();
    }
}
