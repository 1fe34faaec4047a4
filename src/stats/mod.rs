// Statistics — paired aggregation and bootstrap effect sizes.

pub mod effect_size;
pub mod estimator;
pub mod normal;
pub mod paired;
