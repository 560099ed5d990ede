//! Reconciliation orchestrator
//!
//! A `Monitor` owns the providers and the state store. Each call to `apply`
//! runs one reconciliation inside a state session:
//!
//! 1. wrap the desired objects and recover known remote ids
//! 2. route every resource to its provider
//! 3. sync mapped resources with their backends (concurrently across providers)
//! 4. classify each resource as create, update, delete or skip
//! 5. apply the changes provider by provider and commit the new mapping

use crate::context::{AutoConfirm, ConfirmCallback, NoProgress, ProgressCallback};
use crate::diff;
use crate::error::{Error, Result};
use crate::object::{LocalId, MonitoringObject};
use crate::provider::{BoxedProvider, Provider};
use crate::registry::ProviderRegistry;
use crate::resource::{
    Identified, LocalResource, MappedResource, ObsoleteResource, Resource, SyncResult,
    SyncedResource,
};
use crate::state::{State, StateBackend};
use crate::types::{Action, ApplyReport, PlannedAction};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};

/// Reconciles desired objects against the backends of its providers
pub struct Monitor<O: MonitoringObject, B> {
    providers: Vec<BoxedProvider<O>>,
    registry: ProviderRegistry,
    state: State<B>,
}

impl<O: MonitoringObject, B: StateBackend> Monitor<O, B> {
    /// Register providers; fails if two of them claim the same type
    pub fn new(providers: Vec<BoxedProvider<O>>, state: State<B>) -> Result<Self> {
        let registry = ProviderRegistry::build(&providers)?;
        log::debug!("Monitor created with {} providers", providers.len());
        Ok(Self {
            providers,
            registry,
            state,
        })
    }

    pub fn state(&self) -> &State<B> {
        &self.state
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Names of the registered providers, in registration order
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Check a desired set without opening the state or contacting backends
    ///
    /// Catches invalid and duplicated identifiers and types no provider owns.
    pub fn check(&self, objects: Vec<O>) -> Result<Vec<LocalId>> {
        let locals = wrap(objects)?;
        let ids = locals.iter().map(|r| r.local_id().clone()).collect();
        self.registry.partition(locals)?;
        Ok(ids)
    }

    /// Reconcile `objects`, applying changes without asking
    pub fn apply(&mut self, objects: Vec<O>, dry_run: bool) -> Result<ApplyReport> {
        self.apply_with(objects, dry_run, &mut NoProgress, &mut AutoConfirm)
    }

    /// Reconcile `objects` with progress reporting and confirmation
    ///
    /// A dry run stops after classification. So does a declined
    /// confirmation. In both cases nothing is mutated and nothing committed.
    pub fn apply_with<P, C>(
        &mut self,
        objects: Vec<O>,
        dry_run: bool,
        progress: &mut P,
        confirm: &mut C,
    ) -> Result<ApplyReport>
    where
        P: ProgressCallback,
        C: ConfirmCallback,
    {
        let locals = wrap(objects)?;

        let Self {
            providers,
            registry,
            state,
        } = self;

        state.session(|state| {
            let mut used = Vec::new();
            let outcome = run(
                providers, registry, state, locals, dry_run, progress, confirm, &mut used,
            );
            for index in used {
                providers[index].dispose();
            }
            outcome
        })
    }

    /// Give back the providers and the state store
    pub fn into_parts(self) -> (Vec<BoxedProvider<O>>, State<B>) {
        (self.providers, self.state)
    }
}

/// Wrap desired objects, rejecting invalid and duplicated identifiers
fn wrap<O: MonitoringObject>(objects: Vec<O>) -> Result<Vec<LocalResource<O>>> {
    let locals = objects
        .into_iter()
        .map(LocalResource::new)
        .collect::<Result<Vec<_>>>()?;

    let mut seen = HashSet::new();
    let mut duplicated = Vec::new();
    for resource in &locals {
        let id = resource.local_id();
        if !seen.insert(id) && !duplicated.contains(id) {
            duplicated.push(id.clone());
        }
    }

    if duplicated.is_empty() {
        Ok(locals)
    } else {
        Err(Error::DuplicatedIdentifier {
            resources: duplicated,
        })
    }
}

/// Work planned for one provider
struct ProviderPlan<O> {
    to_create: Vec<LocalResource<O>>,
    to_update: Vec<SyncedResource<O>>,
    to_skip: Vec<SyncedResource<O>>,
    to_remove: Vec<ObsoleteResource>,
}

impl<O> ProviderPlan<O> {
    fn new() -> Self {
        Self {
            to_create: Vec::new(),
            to_update: Vec::new(),
            to_skip: Vec::new(),
            to_remove: Vec::new(),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run<O, B, P, C>(
    providers: &mut [BoxedProvider<O>],
    registry: &ProviderRegistry,
    state: &mut State<B>,
    locals: Vec<LocalResource<O>>,
    dry_run: bool,
    progress: &mut P,
    confirm: &mut C,
    used: &mut Vec<usize>,
) -> Result<ApplyReport>
where
    O: MonitoringObject,
    B: StateBackend,
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let (plans, mut report) = plan(providers, registry, state, locals, used)?;

    if dry_run {
        log::info!(
            "Dry run: {} changes planned, nothing applied",
            report.summary.total_changes()
        );
        report.dry_run = true;
        return Ok(report);
    }

    if report.summary.has_changes() && !confirm.confirm(&report).map_err(Error::Confirm)? {
        log::info!("Changes declined, nothing applied");
        report.declined = true;
        return Ok(report);
    }

    execute(providers, state, plans, progress)?;
    report.applied = true;
    Ok(report)
}

/// Load identities, sync with the backends and classify every resource
fn plan<O: MonitoringObject, B: StateBackend>(
    providers: &mut [BoxedProvider<O>],
    registry: &ProviderRegistry,
    state: &State<B>,
    locals: Vec<LocalResource<O>>,
    used: &mut Vec<usize>,
) -> Result<(Vec<ProviderPlan<O>>, ApplyReport)> {
    let desired: Vec<LocalId> = locals.iter().map(|r| r.local_id().clone()).collect();
    let untracked = state.untracked_resources(&desired)?;
    let (locals, mapped) = state.fill_identifiers(locals);

    log::debug!(
        "{} new, {} tracked, {} untracked resources",
        locals.len(),
        mapped.len(),
        untracked.len()
    );

    let resources: Vec<Resource<O>> = locals
        .into_iter()
        .map(Resource::Local)
        .chain(mapped.into_iter().map(Resource::Mapped))
        .chain(untracked.into_iter().map(Resource::Obsolete))
        .collect();

    let buckets = registry.partition(resources)?;
    used.extend(
        buckets
            .iter()
            .enumerate()
            .filter(|(_, bucket)| !bucket.is_empty())
            .map(|(index, _)| index),
    );

    let buckets = sync(providers, buckets)?;

    let mut plans = Vec::with_capacity(buckets.len());
    let mut report = ApplyReport::default();
    let mut unexpected = Vec::new();

    for (provider, bucket) in providers.iter().zip(buckets) {
        plans.push(classify(provider.as_ref(), bucket, &mut report, &mut unexpected)?);
    }

    if !unexpected.is_empty() {
        return Err(Error::UnexpectedState {
            resources: unexpected,
        });
    }

    Ok((plans, report))
}

/// Sync the mapped resources of every bucket with its provider
///
/// Providers run in parallel; each provider only sees its own bucket.
fn sync<O: MonitoringObject>(
    providers: &mut [BoxedProvider<O>],
    buckets: Vec<Vec<Resource<O>>>,
) -> Result<Vec<Vec<Resource<O>>>> {
    let pending: Vec<Vec<MappedResource<O>>> = buckets
        .iter()
        .map(|bucket| {
            bucket
                .iter()
                .filter_map(|resource| match resource {
                    Resource::Mapped(r) => Some(r.clone()),
                    _ => None,
                })
                .collect()
        })
        .collect();

    let results: Vec<anyhow::Result<Vec<SyncResult<O>>>> = providers
        .par_iter_mut()
        .zip(pending)
        .map(|(provider, mapped)| {
            if mapped.is_empty() {
                return Ok(Vec::new());
            }
            log::debug!("Syncing {} resources with {}", mapped.len(), provider.name());
            provider.sync_resources(mapped)
        })
        .collect();

    buckets
        .into_iter()
        .zip(results)
        .zip(providers.iter())
        .map(|((bucket, result), provider)| {
            let synced = result.map_err(|source| Error::Provider {
                provider: provider.name().to_string(),
                operation: "sync",
                source,
            })?;
            Ok(merge(provider.name(), bucket, synced))
        })
        .collect()
}

/// Put sync results in place of the mapped resources they answer
///
/// Mapped resources without an answer stay mapped.
fn merge<O>(
    provider: &str,
    bucket: Vec<Resource<O>>,
    synced: Vec<SyncResult<O>>,
) -> Vec<Resource<O>> {
    let mut answers: HashMap<LocalId, SyncResult<O>> = synced
        .into_iter()
        .map(|result| (result.local_id().clone(), result))
        .collect();

    let merged = bucket
        .into_iter()
        .map(|resource| match resource {
            Resource::Mapped(r) => match answers.remove(r.local_id()) {
                Some(result) => Resource::from(result),
                None => Resource::Mapped(r),
            },
            other => other,
        })
        .collect();

    for local_id in answers.keys() {
        log::warn!("{provider} returned {local_id}, which was not requested; ignoring it");
    }

    merged
}

fn classify<O: MonitoringObject>(
    provider: &dyn Provider<O>,
    bucket: Vec<Resource<O>>,
    report: &mut ApplyReport,
    unexpected: &mut Vec<LocalId>,
) -> Result<ProviderPlan<O>> {
    let name = provider.name();
    let mut plan = ProviderPlan::new();

    for resource in bucket {
        let local_id = resource.local_id().clone();
        let remote_id = resource.remote_id().map(ToString::to_string);

        let (action, lines) = match resource {
            Resource::Local(r) => {
                let exclusions = provider.exclusions(r.object());
                let lines = diff::diff(None, Some(r.object()), &exclusions)?;
                plan.to_create.push(r);
                (Action::Create, lines)
            }
            Resource::Synced(r) => {
                let lines = provider.diff(&r).map_err(|source| Error::Provider {
                    provider: name.to_string(),
                    operation: "diff",
                    source,
                })?;
                if lines.is_empty() {
                    plan.to_skip.push(r);
                    (Action::Skip, lines)
                } else {
                    plan.to_update.push(r);
                    (Action::Update, lines)
                }
            }
            Resource::Obsolete(r) => {
                plan.to_remove.push(r);
                (Action::Delete, Vec::new())
            }
            Resource::Mapped(_) => {
                unexpected.push(local_id.clone());
                (Action::Ignore, Vec::new())
            }
        };

        match action {
            Action::Create | Action::Update => {
                log::info!("{local_id} ({action}):\n{}", lines.join("\n"));
            }
            Action::Delete => log::info!("{local_id} deleted"),
            Action::Skip => log::debug!("{local_id} is up to date"),
            Action::Ignore => log::warn!("{local_id} was neither found nor reported missing by {name}"),
        }

        report.push(PlannedAction {
            local_id,
            remote_id,
            provider: name.to_string(),
            action,
            diff: lines,
        });
    }

    Ok(plan)
}

/// Apply every provider's plan and commit the outcome
///
/// Stops at the first failing provider. Providers that finished before it
/// are already committed, and the session saves those commits. Only the
/// failing provider's resources go uncommitted.
fn execute<O, B, P>(
    providers: &mut [BoxedProvider<O>],
    state: &mut State<B>,
    plans: Vec<ProviderPlan<O>>,
    progress: &mut P,
) -> Result<()>
where
    O: MonitoringObject,
    B: StateBackend,
    P: ProgressCallback,
{
    for (provider, plan) in providers.iter_mut().zip(plans) {
        let ProviderPlan {
            to_create,
            to_update,
            to_skip,
            to_remove,
        } = plan;

        let changes = to_create.len() + to_update.len() + to_remove.len();
        if changes == 0 {
            state.commit(&to_skip, &[]);
            continue;
        }

        let name = provider.name().to_string();
        log::debug!(
            "{name}: {} to create, {} to update, {} to delete",
            to_create.len(),
            to_update.len(),
            to_remove.len()
        );
        progress.on_apply_start(&name, changes);

        let removed = to_remove.clone();
        let applied = match provider.apply_actions(to_create, to_update, to_remove) {
            Ok(applied) => applied,
            Err(source) => {
                progress.on_apply_failed(&name);
                return Err(Error::Provider {
                    provider: name,
                    operation: "apply",
                    source,
                });
            }
        };

        state.commit(&applied, &removed);
        state.commit(&to_skip, &[]);
        progress.on_apply_complete(&name, changes);
    }

    Ok(())
}
