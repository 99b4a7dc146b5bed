pub mod ltsv;

pub use ltsv::{parse_ltsv, LtsvConfig, LtsvStage, STAGE_TYPE_LTSV};
