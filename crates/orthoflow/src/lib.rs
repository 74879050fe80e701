#![doc = env!("CARGO_PKG_DESCRIPTION")]

#[doc(inline)]
pub use orthoflow_core as core;

#[doc(inline)]
pub use orthoflow_dem as dem;

#[doc(inline)]
pub use orthoflow_georef as georef;

#[doc(inline)]
pub use orthoflow_io as io;

#[doc(inline)]
pub use orthoflow_pipeline as pipeline;

#[doc(inline)]
pub use orthoflow_rectify as rectify;
