// [libs/infra/store/src/repositories/mod.rs]
pub mod alerts;
pub mod baselines;
pub mod vitals;

pub use alerts::AlertRepository;
pub use baselines::BaselineRepository;
pub use vitals::VitalsRepository;
