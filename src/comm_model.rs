//! Per-notebook comm model.
//!
//! [`NotebookCommModel`] owns every [`ChatInstance`] of one notebook, the
//! loader registry the kernel advertises and the [`CommLink`] all instances
//! send through. It bootstraps the kernel-side counterpart, decodes every
//! inbound payload and routes it to the addressed instance.
//!
//! The kernel is authoritative for the instance set: `sync-meta` removes
//! local instances the kernel no longer lists and creates (then refreshes)
//! the ones it lists that are missing locally.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::chat::ChatInstance;
use crate::config::{KernelMatcher, Settings};
use crate::context::SessionContext;
use crate::error::ChatError;
use crate::events::ChatEvent;
use crate::protocol::wire::kernel::SyncMeta;
use crate::protocol::{
    ChatMessage, ClientRequest, KernelMessage, KernelOperation, LoaderForm, META_INSTANCE,
    MessagePatch,
};
use crate::reporter::ErrorReporter;
use crate::status::KernelStatus;
use crate::transport::{CommChannel, CommLink, InstancePort, KernelSession};

/// Loader forms by mode name.
pub type Loaders = BTreeMap<String, LoaderForm>;

pub struct NotebookCommModel<S: KernelSession> {
    session: Arc<S>,
    settings: Settings,
    config_defaults: BTreeMap<String, Value>,
    matcher: KernelMatcher,
    instances: BTreeMap<String, ChatInstance>,
    loaders: Loaders,
    link: CommLink,
    status: KernelStatus,
    connection_ready: bool,
    context: SessionContext,
    reporter: ErrorReporter,
    events: mpsc::UnboundedSender<ChatEvent>,
}

impl<S: KernelSession> NotebookCommModel<S> {
    /// Create a model holding only the base instance.
    pub fn new(session: Arc<S>, settings: Settings, events: mpsc::UnboundedSender<ChatEvent>) -> Self {
        let context = SessionContext::new(settings.wizard_mode);
        let reporter = ErrorReporter::new(events.clone());
        let config_defaults = settings.config_variable_defaults();
        let mut model = Self {
            session,
            config_defaults,
            matcher: KernelMatcher::generic(),
            instances: BTreeMap::new(),
            loaders: Loaders::new(),
            link: CommLink::new(),
            status: KernelStatus::default(),
            connection_ready: false,
            context,
            reporter,
            events,
            settings,
        };
        let base = model.new_instance(&model.settings.base_instance, &model.settings.base_mode);
        model.instances.insert(base.name().to_string(), base);
        model
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn session(&self) -> &Arc<S> {
        &self.session
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Language of the detected kernel, `None` for the generic matcher.
    pub fn language(&self) -> Option<&str> {
        self.matcher.language.as_deref()
    }

    pub fn matcher(&self) -> &KernelMatcher {
        &self.matcher
    }

    pub fn instance(&self, name: &str) -> Option<&ChatInstance> {
        self.instances.get(name)
    }

    pub fn instance_mut(&mut self, name: &str) -> Option<&mut ChatInstance> {
        self.instances.get_mut(name)
    }

    pub fn instances(&self) -> &BTreeMap<String, ChatInstance> {
        &self.instances
    }

    pub fn instance_names(&self) -> Vec<String> {
        self.instances.keys().cloned().collect()
    }

    pub fn loaders(&self) -> &Loaders {
        &self.loaders
    }

    pub fn status(&self) -> KernelStatus {
        self.status
    }

    pub fn is_connection_ready(&self) -> bool {
        self.connection_ready
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn reporter(&self) -> &ErrorReporter {
        &self.reporter
    }

    pub fn link(&self) -> &CommLink {
        &self.link
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Wait for the session and bootstrap the kernel counterpart.
    pub async fn connect_notebook(&mut self) -> Result<(), ChatError> {
        log::info!("Connecting notebook {} to newton-chat", self.session.name());
        self.reset_data();

        if let Err(e) = self.session.ready().await {
            return Err(self.report_error(e, "connect_notebook", json!([self.session.name()])));
        }
        self.update_status(|status| status.connected_once = true);
        self.init_bot().await?;
        self.set_connection_ready(true);
        Ok(())
    }

    /// Re-run the bootstrap after a kernel restart.
    pub async fn reconnect(&mut self) -> Result<(), ChatError> {
        self.init_bot().await?;
        self.set_connection_ready(true);
        Ok(())
    }

    /// Detect the kernel language, register the comm target and run the bootstrap.
    pub async fn init_bot(&mut self) -> Result<(), ChatError> {
        if !self.session.has_kernel() {
            return Err(self.report_error(
                ChatError::NoKernel(self.session.name()),
                "init_bot",
                json!([]),
            ));
        }

        self.set_kernel_language().await;
        self.update_status(|status| {
            status.connected_once = true;
            status.connected_now = true;
        });
        self.session
            .register_comm_target(&self.settings.comm_target, self.link.clone())?;
        self.init_on_kernel().await
    }

    async fn set_kernel_language(&mut self) {
        let info = self.session.kernel_info().await.unwrap_or_default();
        self.matcher = self.settings.matcher_for(&info.name, &info.language);
        log::info!(
            "Kernel {} ({}) uses {} matcher",
            info.name,
            info.language,
            self.matcher.language.as_deref().unwrap_or("generic")
        );
    }

    /// Execute the bootstrap statement, then send `init` regardless of its outcome.
    ///
    /// Only the matcher's exact failure text is reported; any other error is
    /// treated as success.
    async fn init_on_kernel(&mut self) -> Result<(), ChatError> {
        let Some(code) = self.matcher.init_script.clone() else {
            log::debug!("Generic matcher, skipping bootstrap");
            return Ok(());
        };

        match self.session.execute_silent(&code).await {
            Ok(outcome) => {
                if let Some(error) = outcome.error {
                    if self.matcher.is_known_failure(&error.evalue) {
                        let params = json!([error.ename, error.evalue, error.traceback]);
                        self.report_error(
                            ChatError::Bootstrap {
                                ename: error.ename,
                                evalue: error.evalue,
                                traceback: error.traceback,
                            },
                            "init_on_kernel",
                            params,
                        );
                    } else {
                        log::warn!(
                            "Bootstrap raised {}: {} (not a known failure, continuing)",
                            error.ename,
                            error.evalue
                        );
                    }
                }
            }
            Err(e) => {
                self.report_error(e, "init_on_kernel", json!([code]));
            }
        }

        self.send_init_kernel();
        Ok(())
    }

    /// React to a kernel status change. Returns `true` when the kernel is
    /// restarting and the caller must run [`Self::reconnect`]. Until then
    /// every send is dropped.
    pub fn handle_status(&mut self, status: &str) -> bool {
        if !status.ends_with("restarting") {
            return false;
        }
        self.update_status(|status| status.has_kernel = false);
        log::info!("Resetting data on kernel restart");
        self.reset_data();
        // The restarted kernel opens a new comm once the target is registered again.
        self.detach_comm();
        true
    }

    /// Forget all kernel-derived state.
    pub fn reset_data(&mut self) {
        self.set_connection_ready(false);
        self.update_status(KernelStatus::reset);
        for instance in self.instances.values_mut() {
            instance.reset();
            instance.reset_config();
        }
    }

    pub fn attach_comm(&self, channel: Arc<dyn CommChannel>) {
        self.link.attach(channel);
    }

    pub fn detach_comm(&mut self) {
        self.link.detach();
        self.update_status(|status| status.connected_now = false);
    }

    /// Ask the kernel to resend the registry and every instance.
    pub fn refresh(&self) {
        log::debug!("refresh {}", self.session.name());
        self.send_refresh_loaders();
        for instance in self.instances.keys() {
            self.send_refresh_instance(instance);
        }
    }

    // -----------------------------------------------------------------------
    // Outbound
    // -----------------------------------------------------------------------

    pub fn send_init_kernel(&self) -> bool {
        self.link.send(&ClientRequest::init_all())
    }

    pub fn send_message_kernel(&self, instance: &str, message: ChatMessage) -> bool {
        self.link.send(&ClientRequest::message(instance, message))
    }

    pub fn send_refresh_loaders(&self) -> bool {
        self.link.send(&ClientRequest::refresh_loaders())
    }

    pub fn send_refresh_instance(&self, instance: &str) -> bool {
        self.link.send(&ClientRequest::refresh(instance))
    }

    /// Ask the kernel to create an instance and show it right away.
    ///
    /// The local instance is inserted before the kernel confirms it; a later
    /// `sync-meta` that does not list it removes it again.
    pub fn create_instance(
        &mut self,
        name: &str,
        mode: &str,
        data: BTreeMap<String, Option<String>>,
    ) -> bool {
        let sent = self
            .link
            .send(&ClientRequest::new_instance(name, mode, data));
        if !self.instances.contains_key(name) {
            let instance = self.new_instance(name, mode);
            instance.refresh();
            self.instances.insert(name.to_string(), instance);
            self.emit(ChatEvent::InstancesChanged);
        }
        sent
    }

    /// Ask the kernel to remove an instance. The local copy goes away with
    /// the next `sync-meta`.
    pub fn remove_instance(&self, name: &str) -> bool {
        self.link.send(&ClientRequest::remove_instance(name))
    }

    /// Write a config variable of `instance`.
    pub fn send_config(&mut self, instance: &str, key: &str, value: Value) -> Result<(), ChatError> {
        self.instances
            .get_mut(instance)
            .ok_or_else(|| ChatError::UnknownInstance(instance.to_string()))?
            .set_config(key, value)
    }

    pub fn send_sync_message(&self, instance: &str, patch: MessagePatch) -> bool {
        self.link.send(&ClientRequest::sync_message(instance, patch))
    }

    /// Send an auto-complete query and remember its id on the instance.
    pub fn send_auto_complete_query(
        &mut self,
        instance: &str,
        request_id: i64,
        query: &str,
    ) -> Result<bool, ChatError> {
        let chat = self
            .instances
            .get_mut(instance)
            .ok_or_else(|| ChatError::UnknownInstance(instance.to_string()))?;
        Ok(chat.send_auto_complete(request_id, query))
    }

    /// Ask the kernel for a snapshot of all instances (answered with `instances`).
    pub fn send_save_instances(&self) -> bool {
        self.link.send(&ClientRequest::save_instances())
    }

    /// Replace the kernel's instances with a saved snapshot.
    pub fn send_load_instances(&self, data: Value) -> bool {
        self.link.send(&ClientRequest::load_instances(data))
    }

    // -----------------------------------------------------------------------
    // Inbound
    // -----------------------------------------------------------------------

    /// Decode and apply one kernel payload.
    pub fn receive(&mut self, payload: &Value) -> Result<(), ChatError> {
        let message = KernelMessage::decode(payload)?;
        log::debug!("MSG {} {}", message.instance, message.operation.name());
        self.dispatch(message)
    }

    /// Apply a decoded kernel message.
    ///
    /// A message for an instance this model does not hold fails with
    /// [`ChatError::UnknownInstance`] before any state changes.
    pub fn dispatch(&mut self, message: KernelMessage) -> Result<(), ChatError> {
        let KernelMessage {
            instance,
            operation,
        } = message;

        if instance == META_INSTANCE {
            match operation {
                KernelOperation::SyncMeta(meta) => self.sync_meta(meta),
                KernelOperation::Instances(data) => self.emit(ChatEvent::InstancesSnapshot(data)),
                other => log::debug!("Ignoring {} on {}", other.name(), META_INSTANCE),
            }
            return Ok(());
        }

        if !self.instances.contains_key(&instance) {
            return Err(ChatError::UnknownInstance(instance));
        }
        if operation.confirms_kernel() {
            self.update_status(|status| status.has_kernel = true);
        }

        if let KernelOperation::Error(error) = operation {
            let params = json!([error.command, error.message]);
            self.report_error(
                ChatError::Kernel {
                    command: error.command,
                    message: error.message,
                },
                "receive",
                params,
            );
            return Ok(());
        }

        let Some(chat) = self.instances.get_mut(&instance) else {
            return Err(ChatError::UnknownInstance(instance));
        };
        match operation {
            KernelOperation::Init(state) | KernelOperation::Refresh(state) => {
                log::debug!("Load {} ({} messages)", instance, state.history.len());
                chat.load(state.history);
                chat.load_config(&state.config);
            }
            KernelOperation::Reply(message) => chat.push(message),
            KernelOperation::UpdateMessage(message) => chat.update_message(message)?,
            KernelOperation::UpdateConfig(config) => chat.load_config(&config),
            KernelOperation::AutocompleteResponse(response) => {
                chat.apply_auto_complete(response.response_id, response.items);
            }
            KernelOperation::Unknown(name) => {
                log::debug!("Ignoring unknown operation {} for {}", name, instance);
            }
            other @ (KernelOperation::SyncMeta(_)
            | KernelOperation::Instances(_)
            | KernelOperation::Error(_)) => {
                log::warn!("Ignoring {} addressed to {}", other.name(), instance);
            }
        }
        Ok(())
    }

    fn sync_meta(&mut self, meta: SyncMeta) {
        self.loaders = meta.loaders;
        self.emit(ChatEvent::LoadersChanged);
        self.load_instances(meta.instances);
    }

    /// Mirror the kernel's instance set.
    fn load_instances(&mut self, instances: BTreeMap<String, String>) {
        let before = self.instances.len();
        self.instances.retain(|name, _| instances.contains_key(name));
        let mut changed = self.instances.len() != before;

        for (name, mode) in instances {
            if self.instances.contains_key(&name) {
                continue;
            }
            let instance = self.new_instance(&name, &mode);
            instance.refresh();
            self.instances.insert(name, instance);
            changed = true;
        }

        if changed {
            self.emit(ChatEvent::InstancesChanged);
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Record an error with the reporter and return it wrapped.
    pub fn report_error(&self, error: ChatError, source: &str, params: Value) -> ChatError {
        self.reporter.report(error, source, params)
    }

    fn new_instance(&self, name: &str, mode: &str) -> ChatInstance {
        ChatInstance::new(
            name,
            mode,
            self.config_defaults.clone(),
            InstancePort::new(name, self.link.clone()),
            self.context.clone(),
            self.events.clone(),
        )
    }

    fn set_connection_ready(&mut self, ready: bool) {
        if self.connection_ready != ready {
            self.connection_ready = ready;
            self.emit(ChatEvent::ConnectionReady(ready));
        }
    }

    fn update_status(&mut self, update: impl FnOnce(&mut KernelStatus)) {
        let before = self.status;
        update(&mut self.status);
        if self.status != before {
            self.emit(ChatEvent::KernelStatusChanged(self.status));
        }
    }

    fn emit(&self, event: ChatEvent) {
        let _ = self.events.send(event);
    }
}
