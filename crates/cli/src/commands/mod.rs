use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;

use crate::api::ServerApi;
use crate::fleet::{ControllerConfig, FileDumpSink, FleetController};
use crate::notify::{drain, ChannelNotifier, Notification, Severity};
use crate::settings::Settings;
use crate::transport::DynFleetTransport;

pub mod machines;
pub mod menu;
pub mod token;

#[derive(Clone)]
pub struct CommandContext {
    pub settings: Settings,
    transport: DynFleetTransport,
}

impl CommandContext {
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;
        let api = ServerApi::new(
            client,
            settings.server_url.clone(),
            settings.session_header.clone(),
            settings.session_token.clone(),
        );
        Ok(Self::with_transport(settings, Arc::new(api)))
    }

    pub fn with_transport(settings: Settings, transport: DynFleetTransport) -> Self {
        Self {
            settings,
            transport,
        }
    }

    /// Build a controller wired to a channel notifier. `dump_dir` overrides
    /// the configured directory.
    pub fn fleet(
        &self,
        config: ControllerConfig,
        dump_dir: Option<PathBuf>,
    ) -> anyhow::Result<FleetSession> {
        let (notifier, notifications) = ChannelNotifier::new();
        let dir = dump_dir.unwrap_or_else(|| self.settings.dump_dir.clone());
        let controller = FleetController::new(
            self.transport.clone(),
            Arc::new(notifier),
            Arc::new(FileDumpSink::new(dir)),
            config,
        )?;
        Ok(FleetSession {
            controller,
            notifications,
        })
    }
}

pub struct FleetSession {
    pub controller: FleetController,
    notifications: UnboundedReceiver<Notification>,
}

impl FleetSession {
    /// Fail with every error notification raised so far.
    pub fn finish(&mut self) -> anyhow::Result<()> {
        let errors = drain(&mut self.notifications)
            .into_iter()
            .filter(|n| n.severity == Severity::Error)
            .map(|n| n.to_string())
            .collect::<Vec<_>>();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(anyhow::anyhow!(errors.join("\n")))
        }
    }
}
