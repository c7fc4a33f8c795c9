pub mod evaluator;

pub use evaluator::{
    apply, apply_url_param, rewrite_url_param, select_max_numeric, select_max_option,
    ApplyOutcome,
};
