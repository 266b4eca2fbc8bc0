/// 工单文件和BOM表格查找

pub mod lookup;
pub mod bom;

pub use lookup::{FsWorkOrderLookup, IWorkOrderLookup};
pub use bom::BomLocator;
