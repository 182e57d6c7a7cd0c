//! End-to-end predictor preparation
//!
//! occurrences → deduplicate → mask/clip environment → center over the
//! occurrence footprint → PCA → predictor stack → Spearman matrix

use crate::algebra::{clip, mask_where};
use crate::correlation::{correlation_matrix, CorrelationMatrix};
use crate::pca::{center, compute_pca, PcaParams, PcaResult};
use crate::statistics::ReduceParams;
use crate::thinning::{deduplicate, DedupParams, Representative};
use nicheprep_core::{Error, Grid, PipelineConfig, PointSet, Region, Result};
use tracing::info;

/// Everything a run produces
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// One occurrence per grain cell
    pub occurrences: PointSet,
    /// Band means removed before PCA, in `pca_bands` order
    pub means: Vec<f64>,
    pub pca: PcaResult,
    /// `pc1..pck` followed by the extra predictors
    pub predictors: Grid,
    pub correlation: CorrelationMatrix,
}

/// Runs the full preparation for one configuration
#[derive(Debug, Clone)]
pub struct PredictorPipeline {
    config: PipelineConfig,
}

impl PredictorPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn check_bands(&self, environment: &Grid) -> Result<()> {
        let land_band = self.config.land_mask.as_ref().map(|m| &m.band);
        self.config
            .pca_bands
            .iter()
            .chain(&self.config.extra_predictors)
            .chain(land_band)
            .try_for_each(|name| environment.band_index(name).map(|_| ()))
    }

    /// Deduplicate occurrences on the grain grid anchored at the corner of
    /// `environment`
    pub fn deduplicate(&self, points: &PointSet, environment: &Grid) -> Result<PointSet> {
        let representative = match self.config.seed {
            Some(seed) => Representative::Seeded(seed),
            None => Representative::First,
        };
        let params = DedupParams::aligned_with(&environment.geometry(), self.config.grain())
            .with_representative(representative);
        deduplicate(points, &params)
    }

    /// Land mask (when configured) then clip to the analysis region
    pub fn prepare_environment(&self, environment: &Grid) -> Result<Grid> {
        let masked = match &self.config.land_mask {
            Some(mask) => {
                let threshold = mask.greater_than;
                mask_where(environment, &mask.band, |v| v > threshold)?
            }
            None => environment.clone(),
        };
        clip(&masked, &self.config.region()?)
    }

    /// Execute every stage.
    ///
    /// # Errors
    /// Whatever a stage reports; notably `BandNotFound` for a configured band
    /// missing from `environment`, `InsufficientData` when fewer occurrences
    /// survive than components are retained, and `ResourceExceeded` from the
    /// reductions.
    pub fn run(&self, points: &PointSet, environment: &Grid) -> Result<PipelineOutput> {
        let config = &self.config;
        self.check_bands(environment)?;

        let occurrences = self.deduplicate(points, environment)?;
        info!("{} occurrences, {} after deduplication", points.len(), occurrences.len());
        if occurrences.len() < config.retained_components {
            return Err(Error::InsufficientData {
                needed: config.retained_components,
                found: occurrences.len(),
                context: "deduplicated occurrences for the retained components".into(),
            });
        }

        let environment = self.prepare_environment(environment)?;
        info!("{} valid environment pixels after masking", environment.valid_pixel_count());

        let footprint = Region::footprint(&occurrences);
        let pca_input = environment.select(&config.pca_bands)?;
        let (centered, means) = center(
            &pca_input,
            &footprint,
            &ReduceParams::at_scale(config.mean_resolution(), config.max_pixels),
        )?;

        let params = PcaParams {
            reduce: ReduceParams::at_scale(config.grain(), config.max_pixels),
            ..PcaParams::default()
        };
        let pca = compute_pca(&centered, &footprint, &params)?;

        let predictors = pca
            .select_leading(config.retained_components)?
            .add_bands(&environment.select(&config.extra_predictors)?)?;
        info!("predictor stack: {:?}", predictors.band_names());

        let correlation = correlation_matrix(&predictors, &occurrences, Some(config.grain()))?;

        Ok(PipelineOutput {
            occurrences,
            means,
            pca,
            predictors,
            correlation,
        })
    }
}
