use std::{ops::ControlFlow, path::PathBuf, time::Duration};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::{error, info, warn};
use syslog::{BasicLogger, Facility, Formatter3164};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    time::interval,
};
use tokio_stream::{StreamExt, wrappers::IntervalStream};
use tokio_util::sync::CancellationToken;

use wheel_ffb::{
    calibration::{CalibrationPanel, CalibrationView},
    cli::Cli,
    config::{ConfigManager, ProviderCfg},
    debug_shell::{DebugShell, DebugTriggers, ShellCommand, StationaryBody},
    force_feedback::{ForceFeedback, WheelHit},
    manager::WheelManager,
    registry,
    session::{ServerState, StaticSession},
};

fn init_log(cli: &Cli) -> Result<()> {
    if cli.syslog {
        return syslog::unix(Formatter3164 {
            facility: Facility::LOG_USER,
            hostname: None,
            process: "wheel-debug".into(),
            pid: std::process::id(),
        })
        .map_err(|e| anyhow!("{e}"))
        .and_then(|logger| {
            log::set_boxed_logger(Box::new(BasicLogger::new(logger)))
                .map(|_| log::set_max_level(cli.log_level))
                .map_err(|e| anyhow!("{e}"))
        });
    }

    env_logger::Builder::new()
        .filter_level(cli.log_level)
        .parse_default_env()
        .try_init()
        .map_err(|e| anyhow!("{e}"))
}

fn install_provider(provider: &ProviderCfg, library_override: Option<PathBuf>) -> Result<()> {
    match provider {
        ProviderCfg::Null => {
            if library_override.is_some() {
                warn!("--library ignored: no steering wheel provider configured");
            }
            info!("No steering wheel provider configured");
            Ok(())
        }
        ProviderCfg::Logitech { library, buttons } => registry::install_logitech(
            library_override.or_else(|| library.clone()),
            buttons.clone().unwrap_or_default(),
        )
        .context("Failed to install steering wheel provider"),
    }
}

/// Everything the console drives between ticks.
struct Harness {
    config: ConfigManager,
    manager: WheelManager,
    model: ForceFeedback<StationaryBody, Option<WheelHit>>,
    shell: DebugShell,
    panel: CalibrationPanel,
    session: StaticSession,
    triggers: DebugTriggers,
}

impl Harness {
    fn tick(&mut self, dt: Duration) {
        self.manager.tick_with_session(dt, &self.session);
        if let Some(outcome) = self.panel.poll(&mut self.manager, self.session.state) {
            info!("Calibration: {:?}", outcome);
        }
        self.model.tick(&mut self.manager, self.session.state);
        let triggers = std::mem::take(&mut self.triggers);
        self.shell.tick(&mut self.manager, triggers);
    }

    async fn handle(&mut self, command: ShellCommand) -> ControlFlow<()> {
        if let Some(t) = command.triggers() {
            self.triggers.log |= t.log;
            self.triggers.ffb_pressed |= t.ffb_pressed;
            self.triggers.ffb_released |= t.ffb_released;
            return ControlFlow::Continue(());
        }

        match command {
            ShellCommand::State(state) => {
                info!("Server state -> {}", state);
                self.session.set_state(state);
            }
            ShellCommand::Target(participant) => self.panel.select_target(participant),
            ShellCommand::Index(participant, text) => {
                match self.panel.edit_index(&mut self.manager, participant, &text) {
                    Some(outcome) => info!("{} -> device {}: {:?}", participant, text, outcome),
                    None => warn!("Device index '{}' ignored", text),
                }
            }
            ShellCommand::Gain(gain) => {
                info!("FFB gain -> {}", gain);
                self.manager.set_ffb_gain(gain);
            }
            ShellCommand::Restart => self.manager.restart_spring_force(),
            ShellCommand::StopSpring => self.manager.stop_spring_force(),
            ShellCommand::Reload => {
                if let Err(e) = self.reload().await {
                    warn!("Config reload from {} failed: {e:#}", self.config.path().display());
                }
            }
            ShellCommand::Save => {
                if let Err(e) = self.save().await {
                    error!("Config save failed: {e:#}");
                }
            }
            ShellCommand::Status => self.status(),
            ShellCommand::Quit => return ControlFlow::Break(()),
            ShellCommand::Log | ShellCommand::Ffb(_) => {}
        }
        ControlFlow::Continue(())
    }

    async fn reload(&mut self) -> Result<()> {
        self.config.reload().await?;
        let config = self.config.clone_config().await;
        self.manager.apply_settings(config.manager_settings());
        *self.model.settings_mut() = config.force_feedback;
        Ok(())
    }

    /// Persists the live gain.
    async fn save(&mut self) -> Result<()> {
        let mut config = self.config.clone_config().await;
        config.ffb_gain = self.manager.ffb_gain();
        self.config.update_config(config).await?;
        self.config.save().await
    }

    fn status(&self) {
        let manager = &self.manager;
        info!(
            "{} {:?}: {} connected, gain {}, {} pending task(s)",
            manager.provider_name(),
            manager.state(),
            manager.connected_device_count(),
            manager.ffb_gain(),
            manager.pending_tasks()
        );
        for (participant, entry) in manager.entries() {
            info!(
                "  {} -> device {} ({}) spring {:?}",
                participant,
                entry.device_index,
                manager.product_name(entry.device_index),
                entry.spring
            );
        }
        match self.panel.render(manager, self.session.state) {
            Some(CalibrationView::Prompt { text, .. }) => info!("  {}", text),
            Some(CalibrationView::Rows(rows)) => {
                for row in rows {
                    info!("  [{}] index '{}'", row.participant, row.index_text);
                }
            }
            None => {}
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_log(&cli)?;

    let config_manager = ConfigManager::load_or_default(cli.config.clone()).await?;
    let config = config_manager.clone_config().await;
    install_provider(&config.provider, cli.library.clone())?;

    let sdk = registry::global().take();
    let manager = WheelManager::new(sdk, config.manager_settings())?;
    let model = ForceFeedback::new(
        cli.participant,
        config.force_feedback.clone(),
        StationaryBody,
        vec![None; 4],
    );
    let mut harness = Harness {
        config: config_manager,
        manager,
        model,
        shell: DebugShell::new(cli.participant, cli.log_every_frame),
        panel: CalibrationPanel::new(),
        session: StaticSession::running(ServerState::WaitingRoom),
        triggers: DebugTriggers::default(),
    };
    harness.shell.start(&mut harness.manager);
    harness.model.init(Some(&mut harness.manager));

    let token = CancellationToken::new();
    tokio::spawn({
        let token = token.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Received Ctrl+C, shutting down..."),
                Err(e) => error!("Failed to listen for shutdown signal: {e}"),
            }
            token.cancel();
        }
    });

    let dt = config.tick_interval();
    let mut ticks = IntervalStream::new(interval(dt));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    info!(
        "Ticking at {} Hz; commands: log, ffb on|off, state <s>, target <p>, index <p> <n>, gain <g>, restart, stop-spring, reload, save, status, quit",
        config.tick_hz
    );

    loop {
        tokio::select! {
            _ = token.cancelled() => break,

            Some(_) = ticks.next() => harness.tick(dt),

            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => match line.parse::<ShellCommand>() {
                    Ok(command) => {
                        if harness.handle(command).await.is_break() {
                            break;
                        }
                    }
                    Err(e) => warn!("{e}"),
                },
                Ok(None) => {
                    info!("Console closed; running until Ctrl+C");
                    stdin_open = false;
                }
                Err(e) => {
                    error!("Console read error: {e}");
                    stdin_open = false;
                }
            },
        }
    }

    harness.manager.shutdown();
    info!("Wheel manager shut down");
    Ok(())
}
