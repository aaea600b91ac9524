use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::dom::NodeId;

/// What a bound listener does when its event reaches the element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerAction {
    Increment(String),
    Decrement(String),
    Post(String),
}

impl ListenerAction {
    pub fn increment(ticket_id: impl fmt::Display) -> Self {
        Self::Increment(ticket_id.to_string())
    }

    pub fn decrement(ticket_id: impl fmt::Display) -> Self {
        Self::Decrement(ticket_id.to_string())
    }
}

#[derive(Debug, Default, Clone)]
pub(crate) struct ListenerStore {
    map: HashMap<NodeId, HashMap<String, Vec<ListenerAction>>>,
}

impl ListenerStore {
    pub(crate) fn add(&mut self, node_id: NodeId, event: &str, action: ListenerAction) {
        self.map
            .entry(node_id)
            .or_default()
            .entry(event.to_string())
            .or_default()
            .push(action);
    }

    pub(crate) fn remove(&mut self, node_id: NodeId, event: &str, action: &ListenerAction) -> bool {
        let Some(events) = self.map.get_mut(&node_id) else {
            return false;
        };
        let Some(listeners) = events.get_mut(event) else {
            return false;
        };

        if let Some(pos) = listeners.iter().position(|listener| listener == action) {
            listeners.remove(pos);
            if listeners.is_empty() {
                events.remove(event);
            }
            if events.is_empty() {
                self.map.remove(&node_id);
            }
            return true;
        }

        false
    }

    pub(crate) fn get(&self, node_id: NodeId, event: &str) -> Vec<ListenerAction> {
        self.map
            .get(&node_id)
            .and_then(|events| events.get(event))
            .cloned()
            .unwrap_or_default()
    }
}

/// A custom event as observed at its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchedEvent {
    pub event_type: String,
    pub target_id: String,
    pub detail: BTreeMap<String, String>,
}

/// Before-request event of an HTML-over-the-wire render: `detail.target` is
/// the element about to be populated, and preventing the default suppresses
/// the network request. The target is named by id and resolved against the
/// page that handles the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    target_id: String,
    path: Option<String>,
    default_prevented: bool,
}

impl RenderRequest {
    pub(crate) fn new(target_id: &str, path: Option<String>) -> Self {
        Self {
            target_id: target_id.to_string(),
            path,
            default_prevented: false,
        }
    }

    pub fn detail_target(&self) -> &str {
        &self.target_id
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// Splits an `hx-trigger` value such as `"click, increment"` into event
/// names, dropping trigger modifiers.
pub(crate) fn trigger_events(value: &str) -> Vec<String> {
    value
        .split(',')
        .filter_map(|trigger| trigger.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Dom;
    use crate::{Error, Result};

    fn first_node() -> Result<NodeId> {
        let dom = Dom::parse(r#"<button id="inc_1"></button>"#)?;
        dom.by_id("inc_1")
            .ok_or_else(|| Error::ElementNotFound("inc_1".into()))
    }

    #[test]
    fn listeners_are_kept_per_node_and_event() -> Result<()> {
        let node = first_node()?;
        let mut store = ListenerStore::default();
        store.add(node, "increment", ListenerAction::increment(1));
        store.add(node, "increment", ListenerAction::Post("/x".into()));
        assert_eq!(store.get(node, "increment").len(), 2);
        assert!(store.get(node, "click").is_empty());

        assert!(store.remove(node, "increment", &ListenerAction::increment(1)));
        assert!(!store.remove(node, "increment", &ListenerAction::increment(1)));
        assert_eq!(
            store.get(node, "increment"),
            vec![ListenerAction::Post("/x".into())]
        );
        Ok(())
    }

    #[test]
    fn trigger_list_drops_modifiers() {
        assert_eq!(trigger_events("click, increment"), vec!["click", "increment"]);
        assert_eq!(trigger_events("load delay:1s"), vec!["load"]);
        assert!(trigger_events(" , ").is_empty());
    }

    #[test]
    fn render_request_default_can_be_prevented() {
        let mut request = RenderRequest::new("qr_0", Some("/qr?ticket=1".into()));
        assert_eq!(request.detail_target(), "qr_0");
        assert_eq!(request.path(), Some("/qr?ticket=1"));
        assert!(!request.default_prevented());
        request.prevent_default();
        assert!(request.default_prevented());
    }
}
