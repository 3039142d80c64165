//! Variability-mode metrics.
//!
//! - [`parameter`]: run parameters loaded from YAML
//! - [`sftlf`]: land/sea mask cache shared by the observation resolvers
//! - [`observation`]: resolves one (variable, region, observation) request
//!   into a configured dataset
//! - [`modes`], [`analysis`]: mode definitions, EOF extraction and
//!   model-versus-observation statistics
//! - [`pipeline`]: one run of a mode over observations and models
//! - [`results`]: the results summary written at the end of a run

pub mod analysis;
pub mod error;
pub mod modes;
pub mod observation;
pub mod parameter;
pub mod pipeline;
pub mod results;
pub mod sftlf;

pub use analysis::{compare, model_mode, obs_mode};
pub use error::{MetricsError, Result};
pub use modes::VariabilityMode;
pub use observation::{observation_list, use_omon, ObservationResolver};
pub use parameter::Parameter;
pub use pipeline::{model_descriptor, ModePipeline};
pub use results::{ModeStatistics, ResultsSummary};
pub use sftlf::{LandSeaMaskCache, LandSeaMaskGenerator, MaskCacheSlot, MaskInfo, RegriddedMaskGenerator};
