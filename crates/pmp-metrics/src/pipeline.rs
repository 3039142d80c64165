//! Variability-mode run over the configured observations and models.

use std::collections::BTreeMap;

use diagnostics::EofMode;
use pmp_common::{Field, Regridder, TimeWindow};
use pmp_io::{DatasetDescriptor, FetchOptions, FieldReader, ObsCatalog};
use tracing::{debug, info, instrument, warn};

use crate::analysis;
use crate::error::Result;
use crate::modes::VariabilityMode;
use crate::observation::{observation_list, ObservationResolver};
use crate::parameter::Parameter;
use crate::results::{ModeStatistics, ResultsSummary};
use crate::sftlf::{self, LandSeaMaskGenerator, MaskCacheSlot};

/// Frequency label of the model data.
pub const MODEL_FREQUENCY: &str = "mo";

/// Realm label of the model data.
pub const MODEL_REALM: &str = "atm";

/// Descriptor of a model version's monthly output for `variable`.
pub fn model_descriptor(parameter: &Parameter, model_version: &str, variable: &str) -> Result<DatasetDescriptor> {
    let mut d = DatasetDescriptor::from_pattern(&parameter.mod_data_path, &parameter.filename_template)?;
    d.model_version = Some(model_version.to_string());
    d.variable = Some(variable.to_string());
    d.table = Some("Amon".to_string());
    d.realm = Some("atmos".to_string());
    d.frequency = Some(MODEL_FREQUENCY.to_string());
    d.realization = Some(parameter.realization.clone());
    d.period = parameter.period.clone();
    d.case_id = parameter.case_id.clone();
    d.ext = Some("nc".to_string());
    d.set_custom("mip", parameter.mip.as_str());
    d.set_custom("exp", parameter.exp.as_str());
    Ok(d)
}

/// One run of a variability mode: observed EOF per selected observation,
/// then every model version compared against it.
pub struct ModePipeline<'a> {
    parameter: &'a Parameter,
    catalog: &'a ObsCatalog,
    reader: &'a dyn FieldReader,
    regridder: &'a dyn Regridder,
    mode: VariabilityMode,
    masks: MaskCacheSlot<'a>,
    weighting: bool,
    land_fractions: BTreeMap<String, Option<Field>>,
}

impl<'a> ModePipeline<'a> {
    /// The generator is only needed for observation regions that select
    /// cells by land fraction.
    pub fn new(
        parameter: &'a Parameter,
        catalog: &'a ObsCatalog,
        reader: &'a dyn FieldReader,
        regridder: &'a dyn Regridder,
        generator: Option<&'a dyn LandSeaMaskGenerator>,
    ) -> Result<Self> {
        let mode = VariabilityMode::by_name(&parameter.variability_mode)?;

        let masks = match generator {
            Some(generator) => MaskCacheSlot::lazy(move || sftlf::build(parameter, reader, generator)),
            None => MaskCacheSlot::empty(),
        };
        let weighting = parameter.land_fraction_weighting && mode.ocean_only;

        Ok(Self {
            parameter,
            catalog,
            reader,
            regridder,
            mode,
            masks,
            weighting,
            land_fractions: BTreeMap::new(),
        })
    }

    pub fn mode(&self) -> &VariabilityMode {
        &self.mode
    }

    /// Run every selection against every model version.
    ///
    /// Observation failures abort the run. A failing model is logged and
    /// skipped.
    pub fn run(&mut self) -> Result<ResultsSummary> {
        let parameter = self.parameter;
        let window = parameter.time_window()?;
        let selections = observation_list(parameter, self.catalog, &self.mode.variable);
        let mut summary = ResultsSummary::new();

        info!(
            mode = %self.mode.name,
            selections = ?selections,
            models = parameter.model_versions.len(),
            "Starting variability mode run"
        );

        for selection in &selections {
            let obs = self.obs_eof(selection, window)?;

            for model_version in &parameter.model_versions {
                match self.model_statistics(model_version, &obs, window) {
                    Ok(stats) => {
                        info!(
                            model = %model_version,
                            selection = %selection,
                            cor = stats.cor,
                            rms = stats.rms,
                            frac = stats.frac,
                            "Model mode computed"
                        );
                        summary.record(model_version, selection, &self.mode.name, stats);
                    }
                    Err(e) => {
                        warn!(model = %model_version, selection = %selection, error = %e, "Skipping model");
                    }
                }
            }
        }

        Ok(summary)
    }

    /// Observed leading EOF for one selection.
    #[instrument(skip(self, window), fields(mode = %self.mode.name))]
    pub fn obs_eof(&mut self, selection: &str, window: TimeWindow) -> Result<EofMode> {
        let resolver = ObservationResolver::new(
            self.parameter,
            &self.mode.variable,
            Some(self.mode.region()),
            selection,
            self.catalog,
            &mut self.masks,
        )?;
        let field = resolver.get_within(self.reader, self.regridder, Some(window))?;
        debug!(reference = %resolver.entry.reference_name, nt = field.nt(), "Read observation");
        analysis::obs_mode(&field, &self.mode)
    }

    /// Statistics of one model version against the observed mode.
    #[instrument(skip(self, obs, window), fields(mode = %self.mode.name))]
    pub fn model_statistics(&mut self, model_version: &str, obs: &EofMode, window: TimeWindow) -> Result<ModeStatistics> {
        let descriptor = model_descriptor(self.parameter, model_version, &self.mode.variable)?;
        let field = descriptor.get(
            self.reader,
            self.regridder,
            &self.mode.variable,
            FetchOptions {
                window: Some(window),
                ..Default::default()
            },
        )?;

        let sftlf = self.land_fraction(model_version)?;
        let eof = analysis::model_mode(&field, sftlf.as_ref(), &self.mode)?;
        analysis::compare(
            obs,
            &eof,
            self.regridder,
            self.parameter.regrid_tool,
            self.parameter.regrid_method,
        )
    }

    /// The model's own land fraction, for ocean-only modes.
    ///
    /// Read per version and remembered; the target-grid mask is not needed.
    fn land_fraction(&mut self, model_version: &str) -> Result<Option<Field>> {
        if !self.weighting {
            return Ok(None);
        }
        if let Some(raw) = self.land_fractions.get(model_version) {
            return Ok(raw.clone());
        }

        let raw = match self.masks.get() {
            Some(cache) => cache.get(model_version).and_then(|info| info.raw.clone()),
            None => match sftlf::load_version(self.parameter, self.reader, model_version) {
                Ok(info) => info.raw,
                Err(e) => {
                    debug!(model = %model_version, error = %e, "Land fraction unreadable");
                    None
                }
            },
        };
        if raw.is_none() {
            debug!(model = %model_version, "No land fraction, mode computed unweighted");
        }
        self.land_fractions.insert(model_version.to_string(), raw.clone());
        Ok(raw)
    }
}
