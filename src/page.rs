use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::config::PageConfig;
use crate::cookie::{CookieJar, CookieSource, read_cookie};
use crate::countdown::{self, CountdownState, CountdownTask, Countdowns};
use crate::dom::{Dom, NodeId};
use crate::events::{
    DispatchedEvent, ListenerAction, ListenerStore, RenderRequest, trigger_events,
};
use crate::network::{HttpMethod, NetworkSink, OutboundRequest, SimulatedNetwork, ticket_path};
use crate::qr_cache::{QrCodeCache, cache_key};
use crate::scheduler::{PendingTimer, ScheduledTask, Scheduler, TimerHandle};
use crate::storage::{KeyValueStorage, MemoryStorage, StorageKind, is_storage_available};
use crate::trace::{TraceCategory, TraceState};
use crate::{Error, Result};

const INCREMENT_EVENT: &str = "increment";

/// Element ids of one ticket card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketCardIds {
    pub qr: String,
    pub timer: String,
    pub increment: String,
    pub usages: String,
}

impl TicketCardIds {
    /// `index` is the card position on the page, `ticket_id` the ticket.
    pub fn new(index: usize, ticket_id: impl fmt::Display) -> Self {
        Self {
            qr: format!("qr_{index}"),
            timer: format!("timer_{index}"),
            increment: format!("inc_{ticket_id}"),
            usages: format!("usages_{ticket_id}"),
        }
    }
}

/// In-memory ticket page: document, cookies, storage, network and clock.
pub struct Page {
    dom: Dom,
    listeners: ListenerStore,
    config: PageConfig,
    cookies: Box<dyn CookieSource>,
    storages: HashMap<StorageKind, Box<dyn KeyValueStorage>>,
    network: Box<dyn NetworkSink>,
    network_calls: Vec<OutboundRequest>,
    dropped_network_calls: Vec<OutboundRequest>,
    dispatched_events: Vec<DispatchedEvent>,
    scheduler: Scheduler<CountdownTask>,
    countdowns: Countdowns,
    trace: TraceState,
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("config", &self.config)
            .field("now_ms", &self.scheduler.now_ms())
            .field("pending_timers", &self.scheduler.len())
            .finish_non_exhaustive()
    }
}

impl Page {
    pub fn from_html(html: &str) -> Result<Self> {
        Self::from_html_with_config(html, PageConfig::default())
    }

    pub fn from_html_with_config(html: &str, config: PageConfig) -> Result<Self> {
        config.validate()?;
        let dom = Dom::parse(html)?;

        let mut storages: HashMap<StorageKind, Box<dyn KeyValueStorage>> = HashMap::new();
        storages.insert(StorageKind::Local, Box::new(MemoryStorage::new()));
        storages.insert(StorageKind::Session, Box::new(MemoryStorage::new()));

        let trace = TraceState {
            log_limit: config.trace_log_limit,
            ..TraceState::default()
        };

        let mut page = Self {
            dom,
            listeners: ListenerStore::default(),
            scheduler: Scheduler::new(config.timer_step_limit),
            config,
            cookies: Box::new(CookieJar::new()),
            storages,
            network: Box::new(SimulatedNetwork::online()),
            network_calls: Vec::new(),
            dropped_network_calls: Vec::new(),
            dispatched_events: Vec::new(),
            countdowns: Countdowns::default(),
            trace,
        };
        page.bind_hx_listeners();
        Ok(page)
    }

    /// Binds every `hx-post` element to the events listed in its
    /// `hx-trigger` (`click` when absent).
    fn bind_hx_listeners(&mut self) {
        for (_, node) in self.dom.element_ids() {
            let Some(path) = self.dom.attr(node, "hx-post") else {
                continue;
            };
            let triggers = self
                .dom
                .attr(node, "hx-trigger")
                .map(|value| trigger_events(&value))
                .filter(|events| !events.is_empty())
                .unwrap_or_else(|| vec!["click".to_string()]);
            for event in triggers {
                self.listeners
                    .add(node, &event, ListenerAction::Post(path.clone()));
            }
        }
    }

    pub fn config(&self) -> &PageConfig {
        &self.config
    }

    /// Uses `header` verbatim as the document cookie.
    pub fn set_cookie_header(&mut self, header: &str) {
        self.cookies = Box::new(header.to_string());
    }

    pub fn set_cookie_source(&mut self, source: impl CookieSource + 'static) {
        self.cookies = Box::new(source);
    }

    pub fn set_storage(&mut self, kind: StorageKind, storage: impl KeyValueStorage + 'static) {
        self.storages.insert(kind, Box::new(storage));
    }

    /// Drops the facility entirely, as if `window[kind]` were undefined.
    pub fn remove_storage(&mut self, kind: StorageKind) {
        self.storages.remove(&kind);
    }

    pub fn storage(&self, kind: StorageKind) -> Option<&dyn KeyValueStorage> {
        self.storages.get(&kind).map(|storage| storage.as_ref())
    }

    pub fn set_network(&mut self, network: impl NetworkSink + 'static) {
        self.network = Box::new(network);
    }

    pub fn enable_trace(&mut self, enabled: bool) {
        self.trace.enabled = enabled;
    }

    pub fn take_trace_logs(&mut self) -> Vec<String> {
        self.trace.take_logs()
    }

    pub fn set_trace_stderr(&mut self, enabled: bool) {
        self.trace.to_stderr = enabled;
    }

    pub fn set_trace_events(&mut self, enabled: bool) {
        self.trace.events = enabled;
    }

    pub fn set_trace_timers(&mut self, enabled: bool) {
        self.trace.timers = enabled;
    }

    pub fn set_trace_storage(&mut self, enabled: bool) {
        self.trace.storage = enabled;
    }

    pub fn set_trace_network(&mut self, enabled: bool) {
        self.trace.network = enabled;
    }

    pub fn set_trace_log_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::InvalidConfig(
                "set_trace_log_limit requires at least 1 entry".into(),
            ));
        }
        self.config.trace_log_limit = max_entries;
        self.trace.set_log_limit(max_entries);
        Ok(())
    }

    pub fn set_timer_step_limit(&mut self, max_steps: usize) -> Result<()> {
        if max_steps == 0 {
            return Err(Error::InvalidConfig(
                "set_timer_step_limit requires at least 1 step".into(),
            ));
        }
        self.config.timer_step_limit = max_steps;
        self.scheduler.step_limit = max_steps;
        Ok(())
    }

    fn trace_line(&mut self, category: TraceCategory, line: String) {
        self.trace.line(category, line);
    }

    fn element_by_id(&self, id: &str) -> Result<NodeId> {
        self.dom
            .by_id(id)
            .ok_or_else(|| Error::ElementNotFound(id.to_string()))
    }

    // Cookies

    pub fn cookie_header(&self) -> String {
        self.cookies.cookie_header()
    }

    pub fn read_cookie(&self, key: &str) -> Result<Option<String>> {
        read_cookie(&self.cookies.cookie_header(), key)
    }

    pub fn current_session(&self) -> Result<Option<String>> {
        self.read_cookie(&self.config.session_cookie)
    }

    // QR code cache

    pub fn is_storage_available(&mut self, kind: StorageKind) -> bool {
        self.storages
            .get_mut(&kind)
            .map(|storage| is_storage_available(storage.as_mut()))
            .unwrap_or(false)
    }

    /// Caches the markup of the first child of `source_id` (the rendered
    /// SVG) under [`cache_key`]`(index)`. A missing or unusable storage makes
    /// this a no-op; a missing child is an error only when storage works.
    pub fn save_rendered_svg(&mut self, source_id: &str, index: impl fmt::Display) -> Result<()> {
        let source = self.element_by_id(source_id)?;
        let kind = self.config.storage_kind;
        let key = cache_key(&index);

        let Some(storage) = self.storages.get_mut(&kind) else {
            self.trace_line(
                TraceCategory::Storage,
                format!("[storage] save skipped key={key} reason=no-{kind}"),
            );
            return Ok(());
        };
        let mut cache = QrCodeCache::new(storage.as_mut());
        if !cache.is_available() {
            self.trace.line(
                TraceCategory::Storage,
                format!("[storage] save skipped key={key} reason=unavailable"),
            );
            return Ok(());
        }

        let svg = self.dom.first_child(source).ok_or_else(|| {
            Error::MissingNode(format!("#{source_id} has no rendered child to cache"))
        })?;
        let markup = self.dom.outer_html(svg);
        let outcome = cache.save(&index, &markup);

        match outcome {
            Ok(_) => self.trace_line(
                TraceCategory::Storage,
                format!("[storage] save key={key} bytes={}", markup.len()),
            ),
            Err(err) => self.trace_line(
                TraceCategory::Storage,
                format!("[storage] save failed key={key} error={err}"),
            ),
        }
        Ok(())
    }

    /// Serves a render request from the cache.
    ///
    /// With a cached entry the request's default is prevented and `true` is
    /// returned; the markup is injected only when the target is still empty.
    /// Without one nothing happens and the network render should proceed.
    pub fn try_restore_svg(
        &mut self,
        request: &mut RenderRequest,
        index: impl fmt::Display,
    ) -> Result<bool> {
        let target = self.element_by_id(request.detail_target())?;
        let kind = self.config.storage_kind;
        let key = cache_key(&index);

        let loaded = match self.storages.get_mut(&kind) {
            Some(storage) => QrCodeCache::new(storage.as_mut()).load(&index),
            None => Ok(None),
        };
        let markup = match loaded {
            Ok(Some(markup)) => markup,
            Ok(None) => {
                self.trace_line(TraceCategory::Storage, format!("[storage] miss key={key}"));
                return Ok(false);
            }
            Err(err) => {
                self.trace_line(
                    TraceCategory::Storage,
                    format!("[storage] read failed key={key} error={err}"),
                );
                return Ok(false);
            }
        };

        if self.dom.children(target).is_empty() {
            self.dom.set_inner_html(target, &markup)?;
            self.trace_line(
                TraceCategory::Storage,
                format!(
                    "[storage] restore key={key} target=#{}",
                    request.detail_target()
                ),
            );
        } else {
            self.trace_line(
                TraceCategory::Storage,
                format!(
                    "[storage] hit key={key} target=#{} kept-existing",
                    request.detail_target()
                ),
            );
        }
        request.prevent_default();
        Ok(true)
    }

    /// Clears the whole configured storage facility. Returns whether a clear
    /// happened.
    pub fn clear_local_storage(&mut self) -> bool {
        let kind = self.config.storage_kind;
        let cleared = match self.storages.get_mut(&kind) {
            Some(storage) => QrCodeCache::new(storage.as_mut()).clear_all(),
            None => Ok(false),
        };
        match cleared {
            Ok(cleared) => {
                self.trace_line(
                    TraceCategory::Storage,
                    format!("[storage] clear {kind} cleared={cleared}"),
                );
                cleared
            }
            Err(err) => {
                self.trace_line(
                    TraceCategory::Storage,
                    format!("[storage] clear {kind} failed error={err}"),
                );
                false
            }
        }
    }

    // Render requests

    pub fn begin_render_request(&self, target_id: &str, path: &str) -> Result<RenderRequest> {
        self.element_by_id(target_id)?;
        Ok(RenderRequest::new(target_id, Some(path.to_string())))
    }

    /// Sends the request's GET unless its default was prevented.
    pub fn issue_render_request(&mut self, request: &RenderRequest) -> bool {
        if request.default_prevented() {
            return false;
        }
        let Some(path) = request.path() else {
            return false;
        };
        self.send_request(OutboundRequest {
            method: HttpMethod::Get,
            path: path.to_string(),
        });
        true
    }

    /// Swaps `markup` in as the content of `target_id`, as a completed
    /// network render would.
    pub fn swap_inner_html(&mut self, target_id: &str, markup: &str) -> Result<()> {
        let target = self.element_by_id(target_id)?;
        self.dom.set_inner_html(target, markup)
    }

    // Network

    pub fn increment(&mut self, ticket_id: impl fmt::Display) {
        let path = ticket_path(&self.config.tickets_endpoint, ticket_id, "inc");
        self.send_request(OutboundRequest::post(path));
    }

    pub fn decrement(&mut self, ticket_id: impl fmt::Display) {
        let path = ticket_path(&self.config.tickets_endpoint, ticket_id, "dec");
        self.send_request(OutboundRequest::post(path));
    }

    fn send_request(&mut self, request: OutboundRequest) {
        match self.network.send(request.clone()) {
            Ok(()) => {
                self.trace_line(TraceCategory::Network, format!("[network] send {request}"));
                self.network_calls.push(request);
            }
            Err(err) => {
                self.trace_line(TraceCategory::Network, format!("[network] dropped {err}"));
                self.dropped_network_calls.push(request);
            }
        }
    }

    pub fn take_network_calls(&mut self) -> Vec<OutboundRequest> {
        std::mem::take(&mut self.network_calls)
    }

    pub fn take_dropped_network_calls(&mut self) -> Vec<OutboundRequest> {
        std::mem::take(&mut self.dropped_network_calls)
    }

    // Events

    pub fn add_listener(
        &mut self,
        element_id: &str,
        event_type: &str,
        action: ListenerAction,
    ) -> Result<()> {
        let node = self.element_by_id(element_id)?;
        self.listeners.add(node, event_type, action);
        Ok(())
    }

    pub fn remove_listener(
        &mut self,
        element_id: &str,
        event_type: &str,
        action: &ListenerAction,
    ) -> Result<bool> {
        let node = self.element_by_id(element_id)?;
        Ok(self.listeners.remove(node, event_type, action))
    }

    pub fn click(&mut self, element_id: &str) -> Result<()> {
        self.dispatch_custom_event(element_id, "click", BTreeMap::new())
    }

    /// Dispatches `event_type` at `element_id` and runs the listeners bound
    /// there. The dispatch is recorded for [`Page::take_dispatched_events`].
    pub fn dispatch_custom_event(
        &mut self,
        element_id: &str,
        event_type: &str,
        detail: BTreeMap<String, String>,
    ) -> Result<()> {
        let node = self.element_by_id(element_id)?;
        let listeners = self.listeners.get(node, event_type);
        self.trace_line(
            TraceCategory::Events,
            format!(
                "[event] dispatch {event_type} target=#{element_id} listeners={}",
                listeners.len()
            ),
        );
        self.dispatched_events.push(DispatchedEvent {
            event_type: event_type.to_string(),
            target_id: element_id.to_string(),
            detail,
        });

        for action in listeners {
            match action {
                ListenerAction::Increment(ticket_id) => self.increment(ticket_id),
                ListenerAction::Decrement(ticket_id) => self.decrement(ticket_id),
                ListenerAction::Post(path) => self.send_request(OutboundRequest::post(path)),
            }
        }
        Ok(())
    }

    pub fn take_dispatched_events(&mut self) -> Vec<DispatchedEvent> {
        std::mem::take(&mut self.dispatched_events)
    }

    // Countdown

    /// Starts the QR countdown: the timer animation plays and, after the
    /// configured delay, the QR code is removed and `increment` is
    /// dispatched at `increment_id`.
    ///
    /// A call for a timer that is already running is ignored and returns the
    /// running countdown's handle.
    pub fn show_for_duration(
        &mut self,
        qr_id: &str,
        timer_id: &str,
        increment_id: &str,
    ) -> Result<TimerHandle> {
        let timer = self.element_by_id(timer_id)?;
        if let Some(handle) = self.countdowns.running_handle(timer_id) {
            self.trace_line(
                TraceCategory::Timers,
                format!("[countdown] ignored overlapping start timer=#{timer_id} running={handle}"),
            );
            return Ok(handle);
        }

        let original_animation = countdown::current_animation(&self.dom, timer)?;
        countdown::start_animation(&mut self.dom, timer)?;

        let delay_ms = self.config.countdown_ms;
        let (handle, due_at) = self.scheduler.schedule(
            delay_ms,
            CountdownTask {
                qr_id: qr_id.to_string(),
                timer_id: timer_id.to_string(),
                increment_id: increment_id.to_string(),
            },
        );
        self.countdowns.start(timer_id, handle, original_animation);
        self.trace_line(
            TraceCategory::Timers,
            format!(
                "[timer] schedule id={} due_at={due_at} delay_ms={delay_ms} timer=#{timer_id}",
                handle.id()
            ),
        );
        Ok(handle)
    }

    pub fn show_ticket(&mut self, ids: &TicketCardIds) -> Result<TimerHandle> {
        self.show_for_duration(&ids.qr, &ids.timer, &ids.increment)
    }

    /// Cancels a pending countdown and returns its timer to idle. `false`
    /// when the handle is unknown or already fired.
    pub fn cancel_countdown(&mut self, handle: TimerHandle) -> Result<bool> {
        if self.scheduler.cancel(handle).is_none() {
            return Ok(false);
        }
        self.settle_cancelled(handle)?;
        self.trace_line(TraceCategory::Timers, format!("[timer] cancel id={}", handle.id()));
        Ok(true)
    }

    fn settle_cancelled(&mut self, handle: TimerHandle) -> Result<()> {
        let Some((timer_id, original)) = self.countdowns.cancel(handle) else {
            return Ok(());
        };
        if let Some(timer) = self.dom.by_id(&timer_id) {
            countdown::reset_animation(&mut self.dom, timer, &original)?;
        }
        Ok(())
    }

    pub fn countdown_state(&self, timer_id: &str) -> CountdownState {
        self.countdowns.state(timer_id)
    }

    // Clock

    pub fn now_ms(&self) -> i64 {
        self.scheduler.now_ms()
    }

    pub fn is_timer_pending(&self, handle: TimerHandle) -> bool {
        self.scheduler.is_pending(handle)
    }

    pub fn pending_timers(&self) -> Vec<PendingTimer> {
        self.scheduler.pending()
    }

    pub fn clear_all_timers(&mut self) -> Result<usize> {
        let cleared = self.scheduler.clear();
        for task in &cleared {
            self.settle_cancelled(task.handle)?;
        }
        self.trace_line(
            TraceCategory::Timers,
            format!("[timer] clear_all cleared={}", cleared.len()),
        );
        Ok(cleared.len())
    }

    pub fn advance_time(&mut self, delta_ms: i64) -> Result<()> {
        if delta_ms < 0 {
            return Err(Error::InvalidConfig(
                "advance_time requires non-negative milliseconds".into(),
            ));
        }
        let from = self.scheduler.now_ms();
        self.scheduler.set_now_ms(from.saturating_add(delta_ms));
        let ran = self.run_timer_queue(Some(self.scheduler.now_ms()), false)?;
        self.trace_line(
            TraceCategory::Timers,
            format!(
                "[timer] advance delta_ms={delta_ms} from={from} to={} ran_due={ran}",
                self.scheduler.now_ms()
            ),
        );
        Ok(())
    }

    pub fn advance_time_to(&mut self, target_ms: i64) -> Result<()> {
        let from = self.scheduler.now_ms();
        if target_ms < from {
            return Err(Error::InvalidConfig(format!(
                "advance_time_to requires target >= now_ms (target={target_ms}, now_ms={from})"
            )));
        }
        self.scheduler.set_now_ms(target_ms);
        let ran = self.run_timer_queue(Some(target_ms), false)?;
        self.trace_line(
            TraceCategory::Timers,
            format!("[timer] advance_to from={from} to={target_ms} ran_due={ran}"),
        );
        Ok(())
    }

    pub fn run_due_timers(&mut self) -> Result<usize> {
        let ran = self.run_timer_queue(Some(self.scheduler.now_ms()), false)?;
        self.trace_line(
            TraceCategory::Timers,
            format!("[timer] run_due now_ms={} ran={ran}", self.scheduler.now_ms()),
        );
        Ok(ran)
    }

    /// Runs every pending task, moving the clock to each due time.
    pub fn flush(&mut self) -> Result<usize> {
        let from = self.scheduler.now_ms();
        let ran = self.run_timer_queue(None, true)?;
        self.trace_line(
            TraceCategory::Timers,
            format!("[timer] flush from={from} to={} ran={ran}", self.scheduler.now_ms()),
        );
        Ok(ran)
    }

    /// Runs the earliest pending task, moving the clock to its due time.
    pub fn run_next_timer(&mut self) -> Result<bool> {
        let Some(task) = self.scheduler.pop_next(None) else {
            self.trace_line(TraceCategory::Timers, "[timer] run_next none".into());
            return Ok(false);
        };
        if task.due_at > self.scheduler.now_ms() {
            self.scheduler.set_now_ms(task.due_at);
        }
        self.execute_timer_task(task)?;
        Ok(true)
    }

    fn run_timer_queue(&mut self, due_limit: Option<i64>, advance_clock: bool) -> Result<usize> {
        let mut steps = 0usize;
        while self.scheduler.peek_next(due_limit).is_some() {
            steps += 1;
            if steps > self.scheduler.step_limit {
                return Err(self.timer_step_limit_error(steps, due_limit));
            }
            let Some(task) = self.scheduler.pop_next(due_limit) else {
                break;
            };
            if advance_clock && task.due_at > self.scheduler.now_ms() {
                self.scheduler.set_now_ms(task.due_at);
            }
            self.execute_timer_task(task)?;
        }
        Ok(steps)
    }

    fn timer_step_limit_error(&self, steps: usize, due_limit: Option<i64>) -> Error {
        let due_limit_desc = due_limit
            .map(|value| value.to_string())
            .unwrap_or_else(|| "none".into());
        let next_task_desc = self
            .scheduler
            .peek_next(due_limit)
            .map(|task| format!("id={},due_at={}", task.handle.id(), task.due_at))
            .unwrap_or_else(|| "none".into());
        Error::TimerStepLimit(format!(
            "timer queue exceeded max task steps: limit={}, steps={steps}, now_ms={}, due_limit={due_limit_desc}, pending_tasks={}, next_task={next_task_desc}",
            self.scheduler.step_limit,
            self.scheduler.now_ms(),
            self.scheduler.len(),
        ))
    }

    fn execute_timer_task(&mut self, task: ScheduledTask<CountdownTask>) -> Result<()> {
        let ScheduledTask {
            handle,
            due_at,
            payload,
            ..
        } = task;
        self.trace_line(
            TraceCategory::Timers,
            format!(
                "[timer] run id={} due_at={due_at} now_ms={}",
                handle.id(),
                self.scheduler.now_ms()
            ),
        );
        self.expire_countdown(payload)
    }

    fn expire_countdown(&mut self, task: CountdownTask) -> Result<()> {
        let original = self
            .countdowns
            .expire(&task.timer_id)
            .unwrap_or_default();

        let timer = self.element_by_id(&task.timer_id)?;
        countdown::reset_animation(&mut self.dom, timer, &original)?;
        self.trace_line(
            TraceCategory::Timers,
            format!("[countdown] reset-animation timer=#{}", task.timer_id),
        );

        let qr = self.element_by_id(&task.qr_id)?;
        let code = self.dom.first_child(qr).ok_or_else(|| {
            Error::MissingNode(format!("#{} has no QR code to remove", task.qr_id))
        })?;
        self.dom.remove_child(qr, code)?;
        self.trace_line(
            TraceCategory::Timers,
            format!("[countdown] removed-qr qr=#{}", task.qr_id),
        );

        self.dispatch_custom_event(&task.increment_id, INCREMENT_EVENT, BTreeMap::new())
    }

    // Document inspection

    pub fn exists(&self, element_id: &str) -> bool {
        self.dom.by_id(element_id).is_some()
    }

    pub fn inner_html(&self, element_id: &str) -> Result<String> {
        let node = self.element_by_id(element_id)?;
        self.dom.inner_html(node)
    }

    pub fn outer_html(&self, element_id: &str) -> Result<String> {
        let node = self.element_by_id(element_id)?;
        Ok(self.dom.outer_html(node))
    }

    pub fn text(&self, element_id: &str) -> Result<String> {
        let node = self.element_by_id(element_id)?;
        Ok(self.dom.text_content(node))
    }

    pub fn child_count(&self, element_id: &str) -> Result<usize> {
        let node = self.element_by_id(element_id)?;
        Ok(self.dom.children(node).len())
    }

    pub fn style(&self, element_id: &str, property: &str) -> Result<String> {
        let node = self.element_by_id(element_id)?;
        self.dom.style_get(node, property)
    }

    pub fn attr(&self, element_id: &str, name: &str) -> Result<Option<String>> {
        let node = self.element_by_id(element_id)?;
        Ok(self.dom.attr(node, name))
    }

    pub fn layout_pass_count(&self) -> u64 {
        self.dom.layout_passes()
    }

    pub fn assert_exists(&self, element_id: &str) -> Result<()> {
        self.element_by_id(element_id).map(|_| ())
    }

    pub fn assert_inner_html(&self, element_id: &str, expected: &str) -> Result<()> {
        let actual = self.inner_html(element_id)?;
        if actual != expected {
            return Err(Error::AssertionFailed {
                target: format!("#{element_id}"),
                expected: expected.to_string(),
                actual,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARD: &str = r##"
        <main>
          <div id="qr_0"></div>
          <div><div id="timer_0" class="progress-bar"></div></div>
          <button id="inc_7" hx-post="/tickets/7/inc" hx-target="#usages_7" hx-trigger="click, increment">+</button>
          <p id="usages_7">0</p>
        </main>
    "##;

    fn quiet_trace(page: &mut Page) {
        page.enable_trace(true);
        page.set_trace_stderr(false);
    }

    #[test]
    fn ticket_card_ids_follow_card_markup() {
        let ids = TicketCardIds::new(0, 7);
        assert_eq!(ids.qr, "qr_0");
        assert_eq!(ids.timer, "timer_0");
        assert_eq!(ids.increment, "inc_7");
        assert_eq!(ids.usages, "usages_7");
    }

    #[test]
    fn hx_trigger_binds_custom_events_to_post() -> Result<()> {
        let mut page = Page::from_html(CARD)?;
        page.dispatch_custom_event("inc_7", "increment", BTreeMap::new())?;
        page.click("inc_7")?;
        assert_eq!(
            page.take_network_calls(),
            vec![
                OutboundRequest::post("/tickets/7/inc"),
                OutboundRequest::post("/tickets/7/inc"),
            ]
        );
        Ok(())
    }

    #[test]
    fn restore_is_traced() -> Result<()> {
        let mut page = Page::from_html(CARD)?;
        quiet_trace(&mut page);
        page.swap_inner_html("qr_0", "<svg>A</svg>")?;
        page.save_rendered_svg("qr_0", 7)?;

        let mut fresh = page.begin_render_request("usages_7", "/qr?ticket=7")?;
        assert!(page.try_restore_svg(&mut fresh, 7)?);
        let logs = page.take_trace_logs();
        assert!(logs.iter().any(|line| line == "[storage] save key=qrCodeSVG_7 bytes=12"));
        assert!(
            logs.iter()
                .any(|line| line == "[storage] hit key=qrCodeSVG_7 target=#usages_7 kept-existing")
        );
        Ok(())
    }

    #[test]
    fn expiry_failure_surfaces_from_the_clock() -> Result<()> {
        let mut page = Page::from_html(CARD)?;
        page.show_for_duration("qr_0", "timer_0", "inc_7")?;
        match page.advance_time(10_000) {
            Err(Error::MissingNode(message)) => {
                assert!(message.contains("#qr_0"), "unexpected message: {message}");
            }
            other => panic!("expected missing QR node, got: {other:?}"),
        }
        assert!(page.take_dispatched_events().is_empty());
        assert_eq!(page.countdown_state("timer_0"), CountdownState::Expired);
        Ok(())
    }

    #[test]
    fn timer_step_limit_is_enforced() -> Result<()> {
        let html = r#"<div id="qr_0"><svg></svg></div><div id="timer_0"></div><div id="timer_1"></div><b id="inc"></b>"#;
        let mut page = Page::from_html(html)?;
        page.set_timer_step_limit(1)?;
        page.show_for_duration("qr_0", "timer_0", "inc")?;
        page.show_for_duration("qr_0", "timer_1", "inc")?;
        match page.flush() {
            Err(Error::TimerStepLimit(message)) => {
                assert!(message.contains("limit=1, steps=2"), "unexpected message: {message}");
                assert!(message.contains("pending_tasks=1"), "unexpected message: {message}");
            }
            other => panic!("expected timer step limit error, got: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn invalid_limits_are_rejected() -> Result<()> {
        let mut page = Page::from_html(CARD)?;
        assert!(matches!(
            page.set_timer_step_limit(0),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            page.set_trace_log_limit(0),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(page.advance_time(-1), Err(Error::InvalidConfig(_))));
        Ok(())
    }

    #[test]
    fn render_request_for_unknown_target_fails() -> Result<()> {
        let page = Page::from_html(CARD)?;
        assert!(matches!(
            page.begin_render_request("qr_9", "/qr?ticket=9"),
            Err(Error::ElementNotFound(id)) if id == "qr_9"
        ));
        Ok(())
    }
}
