pub(crate) mod migrate;
pub(crate) mod refresh;
pub(crate) mod track;

#[cfg(feature = "github")]
pub(crate) mod sync;
