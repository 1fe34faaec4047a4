// Token score matrix storage and vocabulary subsetting.

pub mod sparse;
pub mod subset;
