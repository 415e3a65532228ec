pub mod corrector;
pub mod estimator;
pub mod matcher;
