/// sysmast解析和DT表格生成

pub mod sysmast;
pub mod dt_generator;

pub use sysmast::{parse_master_counts, ISvConverter, KconvarsConverter, MASTER_COUNT_LEN};
pub use dt_generator::{IDtGenerator, XlsxDtGenerator};
