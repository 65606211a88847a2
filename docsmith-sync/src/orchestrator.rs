//! Revision orchestrator: the per-project state machine.
//!
//! ```text
//! Empty --scaffold--> Scaffolded(r0) --revise--> Revised(1) --revise--> Revised(2) …
//! ```
//!
//! Every transition runs under the project's lock:
//!
//! 1. Load the committed project (blocking pool).
//! 2. Assemble the prompt context and render the template.
//! 3. Generate (bounded retry) and reconcile. A rejected candidate gets one
//!    more full generation cycle; a second rejection is surfaced as a conflict.
//! 4. Commit the successor project (blocking pool). The store commit is the
//!    only write, so any earlier failure leaves the project untouched.

use std::sync::Arc;

use serde::Serialize;

use docsmith_core::{
    ChecklistPolicy, Config, Project, ProjectName, ProjectStore, RevisionRequest, ScaffoldRequest,
    StoreError,
};
use docsmith_renderer::{build_context, PromptContext, RenderError, TemplateEngine, TemplateId};

use crate::diff::unified_diff;
use crate::error::OrchestratorError;
use crate::generation::{GenerationClient, GenerationRequest};
use crate::locks::ProjectLocks;
use crate::readme::ReadmeDocument;
use crate::reconciler::{reconcile, ReconcileMode, Rejection};

/// Reconciliation cycles per transition: the first try plus one silent retry.
pub const MAX_CYCLES: u32 = 2;

// ---------------------------------------------------------------------------
// Conflict report
// ---------------------------------------------------------------------------

/// Everything a human needs to resolve a rejected transition by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictReport {
    pub project: ProjectName,
    /// The revision the rejected candidate would have become.
    pub revision: u32,
    #[serde(skip)]
    pub reason: Rejection,
    /// Stable code of `reason`.
    pub code: String,
    /// Human-readable `reason`.
    pub message: String,
    pub previous: String,
    pub candidate: String,
    pub diff: String,
}

impl ConflictReport {
    fn new(project: &ProjectName, revision: u32, reason: Rejection, previous: &str, candidate: String) -> Self {
        let diff = unified_diff(previous, &candidate, "a/README.md", "b/README.md");
        ConflictReport {
            project: project.clone(),
            revision,
            code: reason.code().to_string(),
            message: reason.to_string(),
            reason,
            previous: previous.to_string(),
            candidate,
            diff,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} revision {} rejected after {} attempts: {}",
            self.project, self.revision, MAX_CYCLES, self.reason
        )
    }
}

/// One generate-and-reconcile cycle. Only logged.
#[derive(Debug, Clone)]
struct GenerationAttempt<'a> {
    cycle: u32,
    prompt_chars: usize,
    response_chars: usize,
    rejection: Option<&'a Rejection>,
}

impl GenerationAttempt<'_> {
    fn log(&self, project: &ProjectName, revision: u32) {
        match self.rejection {
            None => tracing::debug!(
                project = %project,
                revision,
                attempt = self.cycle,
                prompt_chars = self.prompt_chars,
                response_chars = self.response_chars,
                "candidate accepted",
            ),
            Some(reason) => tracing::warn!(
                project = %project,
                revision,
                attempt = self.cycle,
                prompt_chars = self.prompt_chars,
                response_chars = self.response_chars,
                reason = %reason,
                "candidate rejected",
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Settings taken from [`Config`] at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub checklist_policy: ChecklistPolicy,
    pub author: Option<String>,
    pub license: Option<String>,
}

impl OrchestratorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            checklist_policy: config.reconcile.checklist_policy,
            author: Some(config.author.name.clone()),
            license: Some(config.license.name.clone()),
        }
    }
}

/// Drives scaffold and revision transitions. Share it behind an `Arc`.
pub struct RevisionOrchestrator {
    store: Arc<dyn ProjectStore>,
    engine: Arc<TemplateEngine>,
    client: GenerationClient,
    locks: ProjectLocks,
    settings: OrchestratorSettings,
}

impl RevisionOrchestrator {
    pub fn new(
        store: Arc<dyn ProjectStore>,
        engine: Arc<TemplateEngine>,
        client: GenerationClient,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            store,
            engine,
            client,
            locks: ProjectLocks::new(),
            settings,
        }
    }

    pub fn store(&self) -> Arc<dyn ProjectStore> {
        Arc::clone(&self.store)
    }

    pub fn engine(&self) -> &TemplateEngine {
        &self.engine
    }

    /// Committed state of `name`, if any.
    pub async fn project(&self, name: &ProjectName) -> Result<Option<Project>, OrchestratorError> {
        let name = name.clone();
        self.blocking(move |store| store.load(&name)).await
    }

    pub async fn projects(&self) -> Result<Vec<Project>, OrchestratorError> {
        self.blocking(|store| store.list()).await
    }

    /// `Empty → Scaffolded`: generate and commit the first README.
    pub async fn scaffold(&self, request: ScaffoldRequest) -> Result<Project, OrchestratorError> {
        let name = request.validate()?;
        let _guard = self.locks.acquire(&name).await;
        tracing::info!(project = %name, revision = 0, "scaffold started");

        if self.project(&name).await?.is_some() {
            return Err(OrchestratorError::AlreadyScaffolded { project: name });
        }

        let ctx = PromptContext::from_request(&request)
            .with_attribution(self.settings.author.as_deref(), self.settings.license.as_deref());
        let prompt = self.engine.render(TemplateId::Scaffold, &ctx)?;
        let criteria: &[String] = match self.settings.checklist_policy {
            ChecklistPolicy::Off => &[],
            ChecklistPolicy::Original | ChecklistPolicy::Current => &request.checklist,
        };

        let doc = self
            .generate_accepted(
                &name,
                0,
                GenerationRequest { template: TemplateId::Scaffold, prompt },
                "",
                ReconcileMode::Scaffold { criteria },
            )
            .await?;

        let project = Project::scaffolded(&request, name, doc.into_string());
        self.commit(&project).await?;
        tracing::info!(project = %project.name, revision = 0, "scaffold accepted");
        Ok(project)
    }

    /// `Scaffolded | Revised(n) → Revised(n+1)`: update the README for a brief.
    pub async fn revise(&self, request: RevisionRequest) -> Result<Project, OrchestratorError> {
        request.validate()?;
        let name = request.project.clone();
        let _guard = self.locks.acquire(&name).await;

        let Some(current) = self.project(&name).await? else {
            return Err(OrchestratorError::NotScaffolded { project: name });
        };
        let revision = current.revision + 1;
        tracing::info!(project = %name, revision, "revision started");

        let ctx = build_context(&current, Some(&request.brief)).map_err(|e| match e {
            RenderError::NoReadme { project } => OrchestratorError::NotScaffolded { project },
            other => OrchestratorError::Render(other),
        })?;
        let prompt = self.engine.render(TemplateId::Update, &ctx)?;
        let criteria: &[String] = match self.settings.checklist_policy {
            ChecklistPolicy::Off => &[],
            ChecklistPolicy::Original => &current.original_checklist,
            ChecklistPolicy::Current => request.checklist.as_deref().unwrap_or(&current.checklist),
        };

        let doc = self
            .generate_accepted(
                &name,
                revision,
                GenerationRequest { template: TemplateId::Update, prompt },
                &current.readme,
                ReconcileMode::Update {
                    revision_brief: &request.brief,
                    criteria,
                },
            )
            .await?;

        let next = current.revised(&request.brief, request.checklist.as_deref(), doc.into_string());
        self.commit(&next).await?;
        tracing::info!(project = %name, revision, "revision accepted");
        Ok(next)
    }

    async fn generate_accepted(
        &self,
        name: &ProjectName,
        revision: u32,
        request: GenerationRequest,
        previous: &str,
        mode: ReconcileMode<'_>,
    ) -> Result<ReadmeDocument, OrchestratorError> {
        let mut cycle = 0;
        loop {
            cycle += 1;
            let raw = self.client.generate(&request).await.map_err(|source| {
                tracing::error!(project = %name, revision, reason = %source, "generation gave up");
                OrchestratorError::GenerationUnavailable {
                    project: name.clone(),
                    source,
                }
            })?;

            let outcome = reconcile(mode, previous, &raw);
            GenerationAttempt {
                cycle,
                prompt_chars: request.prompt.len(),
                response_chars: raw.len(),
                rejection: outcome.as_ref().err(),
            }
            .log(name, revision);

            match outcome {
                Ok(doc) => return Ok(doc),
                Err(_) if cycle < MAX_CYCLES => continue,
                Err(rejection) => {
                    let candidate = crate::readme::normalize_candidate(&raw);
                    let drift = rejection.is_drift();
                    let report = Box::new(ConflictReport::new(name, revision, rejection, previous, candidate));
                    tracing::warn!(project = %name, revision, reason = %report.reason, "transition rejected");
                    return Err(if drift {
                        OrchestratorError::SectionDrift(report)
                    } else {
                        OrchestratorError::Rejected(report)
                    });
                }
            }
        }
    }

    async fn commit(&self, project: &Project) -> Result<(), OrchestratorError> {
        let project = project.clone();
        self.blocking(move |store| store.commit(&project)).await
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, OrchestratorError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn ProjectStore) -> Result<T, StoreError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| OrchestratorError::Join(e.to_string()))?
            .map_err(OrchestratorError::from)
    }
}
