//! The analysis driver
//!
//! An [`Analyzer`] runs reachability and synthesis over a validated
//! [`Model`]. It owns the worker pool and the two control-point caches (one
//! for reachability images, one for synthesis predicates); both caches live
//! for the duration of one analysis problem.

use std::sync::Mutex;

use log::{debug, info};

use polyreach_geometry::{Bundle, GeometryError, PolytopesUnion};

use crate::batch::WorkerPool;
use crate::error::EngineError;
use crate::model::Model;
use crate::progress::ProgressAccounter;
use crate::reach::Flowpipe;
use polyreach_geometry::ControlPointCache;

/// Candidate templates tried by one randomized decomposition pass
pub(crate) const DECOMPOSITION_ITERS: u32 = 100;

/// Reachability and synthesis driver over one model
#[derive(Debug)]
pub struct Analyzer<'m> {
    pub(crate) model: &'m Model,
    pub(crate) pool: WorkerPool,
    pub(crate) reach_points: ControlPointCache,
    pub(crate) synth_points: ControlPointCache,
}

impl<'m> Analyzer<'m> {
    /// Create an analyzer with `threads` worker threads (0 for one per
    /// core)
    pub fn new(model: &'m Model, threads: usize) -> Result<Self, EngineError> {
        Ok(Analyzer {
            model,
            pool: WorkerPool::new(threads)?,
            reach_points: ControlPointCache::new(),
            synth_points: ControlPointCache::new(),
        })
    }

    /// The model under analysis
    pub fn model(&self) -> &Model {
        self.model
    }

    /// The worker pool of the analyzer
    pub fn worker_pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Intersect assumptions and invariant into a freshly computed set
    pub(crate) fn apply_step_constraints(&self, bundle: Bundle) -> Result<Bundle, EngineError> {
        let mut result = bundle;
        if let Some(assumptions) = &self.model.assumptions {
            result = result.intersect_with_constraints(assumptions)?;
        }
        if let Some(invariant) = &self.model.invariant {
            result = result.intersect_with_constraints(invariant)?;
        }
        Ok(result)
    }

    /// Flowpipe of the model over its configured horizon
    pub fn reach(&self, progress: Option<&ProgressAccounter>) -> Result<Flowpipe, EngineError> {
        self.reach_from(
            &self.model.initial_set,
            &self.model.parameter_set,
            self.model.options.horizon,
            progress,
        )
    }

    /// Flowpipe from an explicit initial set and parameter region
    ///
    /// With no parameters (or an empty parameter region) the computation
    /// degenerates to the non-parametric one.
    pub fn reach_from(
        &self,
        initial: &Bundle,
        parameter_set: &PolytopesUnion,
        horizon: u32,
        progress: Option<&ProgressAccounter>,
    ) -> Result<Flowpipe, EngineError> {
        if self.model.system.parameters().is_empty() || parameter_set.is_empty() {
            self.reach_nonparametric(initial, horizon, progress)
        } else {
            self.reach_parametric(initial, parameter_set, horizon, progress)
        }
    }

    fn reach_nonparametric(
        &self,
        initial: &Bundle,
        horizon: u32,
        progress: Option<&ProgressAccounter>,
    ) -> Result<Flowpipe, EngineError> {
        let system = &self.model.system;
        let mode = self.model.options.transform_mode;

        let mut bundle = self.apply_step_constraints(initial.clone())?;
        let mut flowpipe = Flowpipe::new();
        flowpipe.push(PolytopesUnion::from_polytope(bundle.get_polytope()));

        info!("reachability over {horizon} steps ({mode})");
        for step in 0..horizon {
            if bundle.is_empty() {
                // the empty set is a fixed point of the image operator
                flowpipe.push(PolytopesUnion::new());
                continue;
            }
            bundle = bundle.transform(
                system.variables(),
                system.dynamics(),
                &self.reach_points,
                mode,
            )?;
            if let Some(weight) = self.model.options.decomposition {
                bundle = bundle.decompose(weight, DECOMPOSITION_ITERS);
            }
            bundle = self.apply_step_constraints(bundle)?;
            flowpipe.push(PolytopesUnion::from_polytope(bundle.get_polytope()));
            if let Some(p) = progress {
                p.increase_performed_by(1);
            }
            debug!("reach step {} done", step + 1);
        }
        Ok(flowpipe)
    }

    fn reach_parametric(
        &self,
        initial: &Bundle,
        parameter_set: &PolytopesUnion,
        horizon: u32,
        progress: Option<&ProgressAccounter>,
    ) -> Result<Flowpipe, EngineError> {
        let system = &self.model.system;
        let mode = self.model.options.transform_mode;

        let mut bundles = vec![self.apply_step_constraints(initial.clone())?];
        let mut flowpipe = Flowpipe::new();
        let mut first = PolytopesUnion::new();
        first.add(bundles[0].get_polytope())?;
        flowpipe.push(first);

        info!(
            "parametric reachability over {horizon} steps, {} parameter polytopes",
            parameter_set.size()
        );
        for step in 0..horizon {
            // the per-member images of the step are independent
            let images: Mutex<Vec<Result<Bundle, GeometryError>>> = Mutex::new(Vec::new());
            let mut batch = self.pool.create_batch();
            for bundle in &bundles {
                for member in parameter_set {
                    let images = &images;
                    let cache = &self.reach_points;
                    batch.submit(move || {
                        let image = bundle.transform_parametric(
                            system.variables(),
                            system.parameters(),
                            system.dynamics(),
                            member,
                            cache,
                            mode,
                        );
                        images.lock().unwrap().push(image);
                    });
                }
            }
            batch.join();

            // keep the bundle set inclusion-minimal, like the flowpipe
            // union itself
            let mut next: Vec<Bundle> = Vec::new();
            for image in images.into_inner().unwrap_or_else(|e| e.into_inner()) {
                let image = self.apply_step_constraints(image?)?;
                if image.is_empty() {
                    continue;
                }
                if next.iter().any(|b| b.includes(&image)) {
                    continue;
                }
                next.retain(|b| !b.is_subset_of(&image));
                next.push(image);
            }

            let mut union = PolytopesUnion::new();
            for bundle in &next {
                union.add(bundle.get_polytope())?;
            }
            flowpipe.push(union);
            bundles = next;

            if let Some(p) = progress {
                p.increase_performed_by(1);
            }
            debug!("parametric reach step {} done", step + 1);
        }
        Ok(flowpipe)
    }
}
