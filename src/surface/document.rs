//! In-memory document implementing [`RenderSurface`]
//!
//! There is no layout engine here. Heights and margins come from
//! [`LayoutMetrics`] registered per element or per class, which is enough to
//! drive the anchoring decision of the dialog controller.

use super::{ClickAction, ElementId, RenderSurface, SurfaceError, SurfaceResult};
use std::collections::HashMap;

/// Simulated box metrics for an element, in pixels
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayoutMetrics {
    pub height: f64,
    pub margin_top: f64,
    pub margin_bottom: f64,
}

impl LayoutMetrics {
    pub fn new(height: f64) -> Self {
        Self {
            height,
            ..Self::default()
        }
    }

    pub fn with_margins(mut self, top: f64, bottom: f64) -> Self {
        self.margin_top = top;
        self.margin_bottom = bottom;
        self
    }
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    classes: Vec<String>,
    styles: Vec<(String, String)>,
    markup: Option<String>,
    children: Vec<ElementId>,
    parent: Option<ElementId>,
    actions: Vec<ClickAction>,
}

impl Node {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            classes: Vec::new(),
            styles: Vec::new(),
            markup: None,
            children: Vec::new(),
            parent: None,
            actions: Vec::new(),
        }
    }
}

/// Headless element tree with `html`, `head` and `body` roots
#[derive(Debug, Clone)]
pub struct HeadlessDocument {
    nodes: HashMap<ElementId, Node>,
    next_id: u64,
    root: ElementId,
    head: ElementId,
    body: ElementId,
    viewport_height: f64,
    element_metrics: HashMap<ElementId, LayoutMetrics>,
    class_metrics: Vec<(String, LayoutMetrics)>,
}

impl HeadlessDocument {
    /// Create an empty document with the given viewport height
    pub fn new(viewport_height: f64) -> Self {
        let mut document = Self {
            nodes: HashMap::new(),
            next_id: 0,
            root: ElementId(0),
            head: ElementId(0),
            body: ElementId(0),
            viewport_height,
            element_metrics: HashMap::new(),
            class_metrics: Vec::new(),
        };

        document.root = document.allocate("html");
        document.head = document.allocate("head");
        document.body = document.allocate("body");
        document.link(document.root, document.head);
        document.link(document.root, document.body);
        document
    }

    /// Register metrics for every element carrying `class`
    pub fn with_class_metrics(mut self, class: impl Into<String>, metrics: LayoutMetrics) -> Self {
        self.set_class_metrics(class, metrics);
        self
    }

    pub fn set_class_metrics(&mut self, class: impl Into<String>, metrics: LayoutMetrics) {
        let class = class.into();
        self.class_metrics.retain(|(name, _)| *name != class);
        self.class_metrics.push((class, metrics));
    }

    /// Register metrics for one element; takes precedence over class metrics
    pub fn set_element_metrics(&mut self, element: ElementId, metrics: LayoutMetrics) {
        self.element_metrics.insert(element, metrics);
    }

    pub fn set_viewport_height(&mut self, height: f64) {
        self.viewport_height = height;
    }

    /// Number of live elements, attached or not
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn root(&self) -> ElementId {
        self.root
    }

    /// Attached elements carrying `class`, in document order
    pub fn find_by_class(&self, class: &str) -> Vec<ElementId> {
        let mut found = Vec::new();
        self.collect(self.root, &mut |id, node| {
            if node.classes.iter().any(|c| c == class) {
                found.push(id);
            }
        });
        found
    }

    /// Attached elements with the given tag name, in document order
    pub fn find_by_tag(&self, tag: &str) -> Vec<ElementId> {
        let mut found = Vec::new();
        self.collect(self.root, &mut |id, node| {
            if node.tag == tag {
                found.push(id);
            }
        });
        found
    }

    pub fn children(&self, element: ElementId) -> Vec<ElementId> {
        self.nodes
            .get(&element)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    pub fn parent(&self, element: ElementId) -> Option<ElementId> {
        self.nodes.get(&element).and_then(|node| node.parent)
    }

    pub fn classes(&self, element: ElementId) -> Vec<String> {
        self.nodes
            .get(&element)
            .map(|node| node.classes.clone())
            .unwrap_or_default()
    }

    pub fn tag(&self, element: ElementId) -> Option<&str> {
        self.nodes.get(&element).map(|node| node.tag.as_str())
    }

    /// Serialize the whole document
    pub fn to_html(&self) -> String {
        let mut out = String::from("<!DOCTYPE html>");
        self.write_outer(self.root, &mut out);
        out
    }

    fn allocate(&mut self, tag: &str) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, Node::new(tag));
        id
    }

    fn link(&mut self, parent: ElementId, child: ElementId) {
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(child);
        }
    }

    fn node(&self, element: ElementId) -> SurfaceResult<&Node> {
        self.nodes
            .get(&element)
            .ok_or(SurfaceError::UnknownElement(element))
    }

    fn node_mut(&mut self, element: ElementId) -> SurfaceResult<&mut Node> {
        self.nodes
            .get_mut(&element)
            .ok_or(SurfaceError::UnknownElement(element))
    }

    fn detach(&mut self, element: ElementId) {
        let parent = self.nodes.get_mut(&element).and_then(|node| node.parent.take());
        if let Some(parent) = parent.and_then(|id| self.nodes.get_mut(&id)) {
            parent.children.retain(|child| *child != element);
        }
    }

    /// Drop an element and its descendants from the arena
    fn free(&mut self, element: ElementId) {
        let mut stack = vec![element];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.remove(&id) {
                stack.extend(node.children);
            }
            self.element_metrics.remove(&id);
        }
    }

    fn is_ancestor(&self, candidate: ElementId, element: ElementId) -> bool {
        let mut current = Some(element);
        while let Some(id) = current {
            if id == candidate {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    fn metrics(&self, element: ElementId, node: &Node) -> Option<LayoutMetrics> {
        if let Some(metrics) = self.element_metrics.get(&element) {
            return Some(*metrics);
        }
        self.class_metrics
            .iter()
            .find(|(class, _)| node.classes.iter().any(|c| c == class))
            .map(|(_, metrics)| *metrics)
    }

    fn collect(&self, element: ElementId, visit: &mut dyn FnMut(ElementId, &Node)) {
        if let Some(node) = self.nodes.get(&element) {
            visit(element, node);
            for child in &node.children {
                self.collect(*child, visit);
            }
        }
    }

    fn write_outer(&self, element: ElementId, out: &mut String) {
        let Some(node) = self.nodes.get(&element) else {
            return;
        };

        out.push('<');
        out.push_str(&node.tag);
        if !node.classes.is_empty() {
            out.push_str(" class=\"");
            out.push_str(&escape_attribute(&node.classes.join(" ")));
            out.push('"');
        }
        if !node.styles.is_empty() {
            let style = node
                .styles
                .iter()
                .map(|(property, value)| format!("{}: {};", property, value))
                .collect::<Vec<_>>()
                .join(" ");
            out.push_str(" style=\"");
            out.push_str(&escape_attribute(&style));
            out.push('"');
        }
        out.push('>');
        self.write_inner(element, out);
        out.push_str("</");
        out.push_str(&node.tag);
        out.push('>');
    }

    fn write_inner(&self, element: ElementId, out: &mut String) {
        let Some(node) = self.nodes.get(&element) else {
            return;
        };
        match &node.markup {
            Some(markup) => out.push_str(markup),
            None => {
                for child in &node.children {
                    self.write_outer(*child, out);
                }
            }
        }
    }
}

impl Default for HeadlessDocument {
    fn default() -> Self {
        Self::new(1080.0)
    }
}

impl RenderSurface for HeadlessDocument {
    fn body(&self) -> ElementId {
        self.body
    }

    fn head(&self) -> ElementId {
        self.head
    }

    fn create_element(&mut self, tag: &str) -> ElementId {
        self.allocate(tag)
    }

    fn set_class_name(&mut self, element: ElementId, class_name: &str) -> SurfaceResult<()> {
        let node = self.node_mut(element)?;
        node.classes = class_name.split_whitespace().map(str::to_string).collect();
        Ok(())
    }

    fn add_class(&mut self, element: ElementId, class: &str) -> SurfaceResult<()> {
        let node = self.node_mut(element)?;
        if !node.classes.iter().any(|c| c == class) {
            node.classes.push(class.to_string());
        }
        Ok(())
    }

    fn remove_class(&mut self, element: ElementId, class: &str) -> SurfaceResult<()> {
        self.node_mut(element)?.classes.retain(|c| c != class);
        Ok(())
    }

    fn has_class(&self, element: ElementId, class: &str) -> bool {
        self.nodes
            .get(&element)
            .is_some_and(|node| node.classes.iter().any(|c| c == class))
    }

    fn set_style(&mut self, element: ElementId, property: &str, value: &str) -> SurfaceResult<()> {
        let node = self.node_mut(element)?;
        match node.styles.iter_mut().find(|(name, _)| name == property) {
            Some(entry) => entry.1 = value.to_string(),
            None => node.styles.push((property.to_string(), value.to_string())),
        }
        Ok(())
    }

    fn style(&self, element: ElementId, property: &str) -> Option<String> {
        self.nodes.get(&element).and_then(|node| {
            node.styles
                .iter()
                .find(|(name, _)| name == property)
                .map(|(_, value)| value.clone())
        })
    }

    fn set_inner_markup(&mut self, element: ElementId, markup: &str) -> SurfaceResult<()> {
        let children = std::mem::take(&mut self.node_mut(element)?.children);
        for child in children {
            self.free(child);
        }
        self.node_mut(element)?.markup = Some(markup.to_string());
        Ok(())
    }

    fn append_child(&mut self, parent: ElementId, child: ElementId) -> SurfaceResult<()> {
        self.node(parent)?;
        self.node(child)?;
        if self.is_ancestor(child, parent) {
            return Err(SurfaceError::InvalidHierarchy(child));
        }

        self.detach(child);
        // Appending structure replaces any raw markup previously set
        self.node_mut(parent)?.markup = None;
        self.link(parent, child);
        Ok(())
    }

    fn remove(&mut self, element: ElementId) -> SurfaceResult<()> {
        self.node(element)?;
        if [self.root, self.head, self.body].contains(&element) {
            return Err(SurfaceError::InvalidHierarchy(element));
        }
        self.detach(element);
        self.free(element);
        Ok(())
    }

    fn is_attached(&self, element: ElementId) -> bool {
        self.nodes.contains_key(&element) && self.is_ancestor(self.root, element)
    }

    fn offset_height(&self, element: ElementId) -> SurfaceResult<f64> {
        let node = self.node(element)?;
        Ok(self.metrics(element, node).map(|m| m.height).unwrap_or(0.0))
    }

    fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    fn computed_style(&self, element: ElementId, property: &str) -> SurfaceResult<Option<String>> {
        let node = self.node(element)?;
        if let Some(value) = self.style(element, property) {
            return Ok(Some(value));
        }

        let metrics = self.metrics(element, node);
        Ok(match property {
            "margin-top" => metrics.map(|m| format!("{}px", m.margin_top)),
            "margin-bottom" => metrics.map(|m| format!("{}px", m.margin_bottom)),
            "height" => metrics.map(|m| format!("{}px", m.height)),
            _ => None,
        })
    }

    fn inner_markup(&self, element: ElementId) -> SurfaceResult<String> {
        self.node(element)?;
        let mut out = String::new();
        self.write_inner(element, &mut out);
        Ok(out)
    }

    fn outer_markup(&self, element: ElementId) -> SurfaceResult<String> {
        self.node(element)?;
        let mut out = String::new();
        self.write_outer(element, &mut out);
        Ok(out)
    }

    fn add_click_action(&mut self, element: ElementId, action: ClickAction) -> SurfaceResult<()> {
        self.node_mut(element)?.actions.push(action);
        Ok(())
    }

    fn dispatch_click(&mut self, target: ElementId) -> Vec<ClickAction> {
        let mut reached = Vec::new();
        if !self.is_attached(target) {
            return reached;
        }

        let mut current = Some(target);
        while let Some(id) = current {
            let Some(node) = self.nodes.get(&id) else {
                break;
            };
            reached.extend(node.actions.iter().copied());
            if node.actions.contains(&ClickAction::StopPropagation) {
                break;
            }
            current = node.parent;
        }
        reached
    }
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}
