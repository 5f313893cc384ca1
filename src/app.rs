//! Run orchestration: preflight, the scenario loop, checkpoints and the final report

use crate::{
    client::{ClientSettings, NodeApi, NodeClient},
    config::RunSettings,
    error::Result,
    executor::{ScenarioRunner, ScenarioSettings, TargetPlan, TrialRunner},
    logging::{Logger, LoggerFactory},
    models::{HarnessInfo, RunReport, ScenarioSummary, TrialResult},
    network::{
        CommandRunner, FleetManager, FleetSettings, NetworkConditioner, ProcessRunner,
        ShapingSettings,
    },
    output::{OutputCoordinator, OutputFormatterFactory, ReportWriter, RunOverview},
    stats::StatisticsEngine,
};
use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Run-wide state owned by one orchestrator run
pub struct RunContext {
    started_at: DateTime<Local>,
    clock: Instant,
    results: Mutex<Vec<TrialResult>>,
    writer: ReportWriter,
}

impl RunContext {
    pub fn new(output_directory: impl Into<PathBuf>, started_at: DateTime<Local>) -> Self {
        Self {
            started_at,
            clock: Instant::now(),
            results: Mutex::new(Vec::new()),
            writer: ReportWriter::new(output_directory, started_at),
        }
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn writer(&self) -> &ReportWriter {
        &self.writer
    }

    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }

    /// Append a scenario's results and return the whole run so far
    pub async fn record(&self, results: Vec<TrialResult>) -> Vec<TrialResult> {
        let mut all = self.results.lock().await;
        all.extend(results);
        all.clone()
    }

    pub async fn snapshot(&self) -> Vec<TrialResult> {
        self.results.lock().await.clone()
    }
}

/// What a finished run produced
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report_path: PathBuf,
    pub csv_path: Option<PathBuf>,
    pub results: Vec<TrialResult>,
    pub summary: Vec<ScenarioSummary>,
    pub overview: RunOverview,
}

/// Components built by `init` and consumed by `teardown`
struct Session {
    scenarios: ScenarioRunner,
    conditioner: NetworkConditioner,
    fleet: FleetManager,
    context: RunContext,
}

/// Top-level driver of a benchmark run
pub struct BenchmarkOrchestrator {
    settings: RunSettings,
    api: Arc<dyn NodeApi>,
    commands: Arc<dyn CommandRunner>,
    loggers: LoggerFactory,
    logger: Logger,
}

impl BenchmarkOrchestrator {
    /// Orchestrator talking HTTP to the nodes and running real scripts
    pub async fn new(settings: RunSettings, loggers: LoggerFactory) -> Result<Self> {
        let client = NodeClient::new(
            ClientSettings::from_config(&settings.config),
            loggers.create_logger("CLIENT").await,
        )?;
        let commands = ProcessRunner::new(settings.config.harness.command_timeout());

        Ok(Self::with_backends(settings, loggers, Arc::new(client), Arc::new(commands)).await)
    }

    /// Orchestrator over caller-supplied node and command backends
    pub async fn with_backends(
        settings: RunSettings,
        loggers: LoggerFactory,
        api: Arc<dyn NodeApi>,
        commands: Arc<dyn CommandRunner>,
    ) -> Self {
        let logger = loggers.create_logger("BENCH").await;
        Self {
            settings,
            api,
            commands,
            loggers,
            logger,
        }
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Run every selected scenario and write the final report
    pub async fn run(&self) -> Result<RunOutcome> {
        let mut session = self.init().await?;

        if let Err(error) = self.run_scenarios(&mut session).await {
            session.conditioner.finish().await;
            self.logger
                .error("Run aborted")
                .error_info(&error)
                .log()
                .await;
            return Err(error);
        }

        self.teardown(session).await
    }

    /// Check the fleet and build the scenario machinery
    async fn init(&self) -> Result<Session> {
        let config = &self.settings.config;

        let fleet = FleetManager::new(
            self.commands.clone(),
            FleetSettings::from_config(config),
            self.loggers.create_logger("FLEET").await,
        );
        if self.settings.skip_preflight {
            self.logger.info("Skipping preflight checks").log().await;
        } else {
            fleet.preflight().await?;
        }

        let plan = TargetPlan::from_config(config)?;
        let trials = TrialRunner::new(
            self.api.clone(),
            config.harness.effective_write_mode(),
            config.harness.propagation_delay(),
            self.loggers.create_logger("TRIAL").await,
        );
        let scenarios = ScenarioRunner::new(
            trials,
            self.api.clone(),
            plan,
            ScenarioSettings::from_config(config, self.settings.restart_fleet),
            self.loggers.create_logger("SCENARIO").await,
        )
        .with_sweep_nodes(config.test_targets.clone())
        .with_shaping_targets(config.shaping_targets());

        let conditioner = NetworkConditioner::new(
            self.commands.clone(),
            ShapingSettings::from_config(config),
            self.loggers.create_logger("SHAPING").await,
        );

        let context = RunContext::new(&config.test_configuration.output_directory, Local::now());

        self.logger
            .add_context_field("run", &config.test_configuration.name)
            .await;
        self.logger
            .info(&format!("Starting {}", config.test_configuration.name))
            .field("scenarios", self.settings.selected_scenarios().len())
            .field("files", config.test_files.len())
            .field("iterations", config.iterations())
            .field("target_plan", format!("{:?}", scenarios.plan().kind()))
            .field("report", context.writer().path().display().to_string())
            .log()
            .await;

        Ok(Session {
            scenarios,
            conditioner,
            fleet,
            context,
        })
    }

    async fn run_scenarios(&self, session: &mut Session) -> Result<()> {
        let config = &self.settings.config;

        for scenario in self.settings.selected_scenarios() {
            let results = session
                .scenarios
                .run(
                    scenario,
                    &config.test_files,
                    &mut session.conditioner,
                    Some(&session.fleet),
                )
                .await?;
            self.checkpoint(&session.context, results).await;
        }

        Ok(())
    }

    /// Persist the run so far; a failed checkpoint is only logged
    async fn checkpoint(&self, context: &RunContext, results: Vec<TrialResult>) {
        let snapshot = context.record(results).await;
        let report = RunReport::checkpoint(self.settings.config.clone(), snapshot)
            .with_harness(HarnessInfo::current(self.loggers.session_id()));

        match context.writer().write(&report) {
            Ok(path) => {
                self.logger
                    .debug("Saved intermediate results")
                    .field("path", path.display().to_string())
                    .field("results", report.results.len())
                    .log()
                    .await;
            }
            Err(error) => {
                self.logger
                    .warn("Failed to save intermediate results")
                    .error_info(&error)
                    .log()
                    .await;
            }
        }
    }

    /// Clear leftover shaping and write the final report
    async fn teardown(&self, mut session: Session) -> Result<RunOutcome> {
        session.conditioner.finish().await;

        let context = &session.context;
        let results = context.snapshot().await;
        let summary = StatisticsEngine::new().summarize_run(&results);
        let runtime = context.elapsed();

        let report = RunReport::checkpoint(self.settings.config.clone(), results.clone())
            .with_harness(HarnessInfo::current(self.loggers.session_id()))
            .finalize(summary.clone(), runtime);
        let report_path = context.writer().write(&report)?.to_path_buf();

        let csv_path = if self.settings.export_csv {
            match context.writer().write_csv(&results) {
                Ok(path) => Some(path),
                Err(error) => {
                    self.logger
                        .warn("Failed to export CSV")
                        .error_info(&error)
                        .log()
                        .await;
                    None
                }
            }
        } else {
            None
        };

        let overview = RunOverview {
            name: self.settings.config.test_configuration.name.clone(),
            scenarios: summary.len(),
            trials: results.len(),
            successful: report.success_count(),
            runtime_secs: runtime.as_secs_f64(),
            report_path: Some(report_path.display().to_string()),
        };

        self.logger
            .info("Run complete")
            .field("trials", overview.trials)
            .field("successful", overview.successful)
            .field("runtime_secs", overview.runtime_secs)
            .log()
            .await;

        Ok(RunOutcome {
            report_path,
            csv_path,
            results,
            summary,
            overview,
        })
    }

    /// Console summary of a finished run
    pub fn render_summary(&self, outcome: &RunOutcome) -> Result<String> {
        let coordinator =
            OutputCoordinator::new(OutputFormatterFactory::create_formatter(self.settings.use_color));
        coordinator.display_summary(&outcome.overview, &outcome.summary)
    }
}
